//! Output entities: inferred prescriptions and their field metadata.
//!
//! A `Prescription` is created once by the synthesizer and never mutated;
//! every derived value is computed fresh and attached at construction.

use serde::{Deserialize, Serialize};

use crate::pipeline::ExtractionWarning;

/// Product strength selected on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strength {
    #[serde(rename = "75mg")]
    Mg75,
    #[serde(rename = "150mg")]
    Mg150,
    #[serde(rename = "300mg")]
    Mg300,
}

impl Strength {
    /// Compact label used for the product and dosage fields.
    pub fn label(self) -> &'static str {
        match self {
            Strength::Mg75 => "75mg",
            Strength::Mg150 => "150mg",
            Strength::Mg300 => "300mg",
        }
    }

    pub fn milligrams(self) -> u32 {
        match self {
            Strength::Mg75 => 75,
            Strength::Mg150 => 150,
            Strength::Mg300 => 300,
        }
    }
}

/// Injection device column of the product tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    SensoreadyPen,
    UnoreadyPen,
    PrefilledSyringe,
}

impl Device {
    /// Canonical display name as printed on the form.
    pub fn display_name(self) -> &'static str {
        match self {
            Device::SensoreadyPen => "Sensoready Pen",
            Device::UnoreadyPen => "UnoReady Pen",
            Device::PrefilledSyringe => "Prefilled Syringe",
        }
    }
}

/// Dosing schedule column of the product tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoseType {
    Loading,
    Maintenance,
    MaintenanceIncrease,
}

impl DoseType {
    pub fn as_str(self) -> &'static str {
        match self {
            DoseType::Loading => "Loading",
            DoseType::Maintenance => "Maintenance",
            DoseType::MaintenanceIncrease => "Maintenance Increase",
        }
    }
}

/// Which of the form's two product tables a section belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatientClass {
    Adult,
    Pediatric,
}

impl PatientClass {
    pub fn as_str(self) -> &'static str {
        match self {
            PatientClass::Adult => "Adult",
            PatientClass::Pediatric => "Pediatric",
        }
    }
}

/// Where a field value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    /// Read (via classification) from marks and text on the page.
    Form,
    /// Derived from a static lookup table keyed by the classification.
    Lookup,
}

/// One output field with provenance metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionField {
    pub value: Option<String>,
    pub source: FieldSource,
    pub confidence: f32,
    pub validated: bool,
}

impl PrescriptionField {
    pub fn from_form(value: impl Into<String>, confidence: f32) -> Self {
        Self {
            value: Some(value.into()),
            source: FieldSource::Form,
            confidence,
            validated: true,
        }
    }

    pub fn from_lookup(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            source: FieldSource::Lookup,
            confidence: 1.0,
            validated: true,
        }
    }

    /// True when the field holds a non-empty value.
    pub fn is_present(&self) -> bool {
        self.value.as_deref().is_some_and(|v| !v.trim().is_empty())
    }
}

/// One inferred prescription: a single (device, dosing) selection pair with
/// its derived quantity, instructions, and refill count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub product: PrescriptionField,
    pub dosage: PrescriptionField,
    pub form: PrescriptionField,
    pub dose_type: PrescriptionField,
    pub patient_type: PrescriptionField,
    pub quantity: PrescriptionField,
    pub sig: PrescriptionField,
    pub refills: PrescriptionField,
}

impl Prescription {
    /// A prescription is dispensable when every identity field and the
    /// quantity are populated. Sig and refills are always filled by
    /// construction and do not gate validity.
    pub fn is_valid(&self) -> bool {
        self.product.is_present()
            && self.dosage.is_present()
            && self.form.is_present()
            && self.dose_type.is_present()
            && self.quantity.is_present()
    }

    /// Human-readable identity, e.g. "COSENTYX 150mg Sensoready Pen (1x150 mg/mL) Loading".
    pub fn display_name(&self) -> String {
        [
            self.product.value.as_deref().unwrap_or("COSENTYX"),
            self.form.value.as_deref().unwrap_or_default(),
            self.dose_type.value.as_deref().unwrap_or_default(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Lowercased duplicate-detection key consumed by the downstream router.
    pub fn signature(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.product.value.as_deref().unwrap_or_default(),
            self.dosage.value.as_deref().unwrap_or_default(),
            self.form.value.as_deref().unwrap_or_default(),
            self.dose_type.value.as_deref().unwrap_or_default(),
        )
        .to_lowercase()
    }
}

/// Full result of one extraction run.
///
/// Invalid prescriptions are kept alongside valid ones for traceability;
/// `warnings` is the side channel for every non-fatal condition absorbed
/// during inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionExtraction {
    pub prescriptions: Vec<Prescription>,
    pub valid_count: usize,
    pub is_valid: bool,
    pub warnings: Vec<ExtractionWarning>,
}
