//! Cartesian synthesis of prescriptions from section marks.
//!
//! Every (device, dosing) pair in a section becomes one prescription,
//! deliberately not deduplicated: multiple selections in one section are a
//! real form-filling pattern the caller wants to see. Quantities,
//! instructions, and unit annotations come from static lookup tables keyed
//! by the classification; none of them are read off the page.

use tracing::debug;

use crate::config::ExtractorConfig;
use crate::models::{Device, DoseType, Prescription, PrescriptionField, Strength};

use super::classify::{ClassifiedMark, MarkRole};
use super::refills::{resolve_refills, RefillEntry};
use super::sections::{Section, SectionKey};
use super::spatial::SpatialIndex;
use super::ExtractionWarning;

/// Injections per 28-day cycle for each dosing schedule.
const DOSES_PER_CYCLE: &[(DoseType, u32)] = &[
    (DoseType::Loading, 4),
    (DoseType::Maintenance, 1),
    (DoseType::MaintenanceIncrease, 2),
];

/// (strength, device) pairs dispensed as two units per dose: the 300mg dose
/// is drawn from two 150mg units in these devices.
const DOUBLE_UNIT_FORMS: &[(Strength, Device)] = &[
    (Strength::Mg300, Device::SensoreadyPen),
    (Strength::Mg300, Device::PrefilledSyringe),
];

const MAINTENANCE_INCREASE_SIG: &str = "Inject 300 mg subcutaneously every 2 weeks (For patients currently taking COSENTYX every 4 weeks as per label. Loading dose already completed.)";

/// Fixed dosing instructions keyed by (strength, dose type). The
/// maintenance-increase schedule is only defined at 300 mg; its instruction
/// text is the same whichever section it is reached from.
const SIG_TABLE: &[((Strength, DoseType), &str)] = &[
    (
        (Strength::Mg75, DoseType::Loading),
        "Inject 75 mg subcutaneously on Weeks 0, 1, 2, 3",
    ),
    (
        (Strength::Mg150, DoseType::Loading),
        "Inject 150 mg subcutaneously on Weeks 0, 1, 2, 3",
    ),
    (
        (Strength::Mg300, DoseType::Loading),
        "Inject 300 mg subcutaneously on Weeks 0, 1, 2, 3",
    ),
    (
        (Strength::Mg75, DoseType::Maintenance),
        "Inject 75 mg subcutaneously on Week 4, then every 4 weeks thereafter",
    ),
    (
        (Strength::Mg150, DoseType::Maintenance),
        "Inject 150 mg subcutaneously on Week 4, then every 4 weeks thereafter",
    ),
    (
        (Strength::Mg300, DoseType::Maintenance),
        "Inject 300 mg subcutaneously on Week 4, then every 4 weeks thereafter",
    ),
    ((Strength::Mg75, DoseType::MaintenanceIncrease), MAINTENANCE_INCREASE_SIG),
    ((Strength::Mg150, DoseType::MaintenanceIncrease), MAINTENANCE_INCREASE_SIG),
    ((Strength::Mg300, DoseType::MaintenanceIncrease), MAINTENANCE_INCREASE_SIG),
];

/// Injections per 28-day cycle for a dosing schedule.
pub fn doses_per_cycle(dose_type: DoseType) -> u32 {
    DOSES_PER_CYCLE
        .iter()
        .find(|(d, _)| *d == dose_type)
        .map(|&(_, n)| n)
        .unwrap_or(1)
}

/// Units dispensed per injection for a (strength, device) pair.
pub fn units_per_dose(strength: Strength, device: Device) -> u32 {
    if DOUBLE_UNIT_FORMS.contains(&(strength, device)) {
        2
    } else {
        1
    }
}

/// Dispensed quantity per 28-day cycle. A pure function of the
/// classification: recomputing from the same inputs always agrees.
pub fn quantity(strength: Strength, device: Device, dose_type: DoseType) -> u32 {
    doses_per_cycle(dose_type) * units_per_dose(strength, device)
}

/// Dosing instruction text for a (strength, dose type) pair.
pub fn sig_for(strength: Strength, dose_type: DoseType) -> &'static str {
    SIG_TABLE
        .iter()
        .find(|((s, d), _)| *s == strength && *d == dose_type)
        .map(|&(_, sig)| sig)
        .unwrap_or("Use as directed")
}

/// Device display name with its unit annotation for the given strength.
pub fn form_display(device: Device, strength: Strength) -> String {
    let annotation = match (device, strength) {
        (Device::UnoreadyPen, Strength::Mg300) => "(1x300 mg/2 mL)".to_string(),
        (_, Strength::Mg300) => "(2x150 mg/mL)".to_string(),
        (_, strength) => format!("(1x{} mg/mL)", strength.milligrams()),
    };
    format!("{} {}", device.display_name(), annotation)
}

/// Build one prescription per (device, dosing) pair of a section.
///
/// A one-sided section synthesizes nothing: a device without a schedule (or
/// the reverse) is not a prescription.
pub fn synthesize_section(
    section: &Section,
    refill_entries: &[RefillEntry],
    index: &SpatialIndex<'_>,
    config: &ExtractorConfig,
    warnings: &mut Vec<ExtractionWarning>,
) -> Vec<Prescription> {
    if section.devices.is_empty() || section.dosings.is_empty() {
        debug!(
            section = %section.key,
            devices = section.devices.len(),
            dosings = section.dosings.len(),
            "one-sided section; nothing to synthesize"
        );
        warnings.push(ExtractionWarning::OneSidedSection {
            section: section.key,
            devices: section.devices.len(),
            dosings: section.dosings.len(),
        });
        return Vec::new();
    }

    // Refills depend only on the dosing row, so resolve once per dosing mark
    // and reuse across every device pairing.
    let mut dosing_rows: Vec<(&ClassifiedMark, DoseType, String)> = Vec::new();
    for dosing_mark in &section.dosings {
        if let MarkRole::Dosing(dose_type) = dosing_mark.role {
            let refill_text = resolve_refills(
                dosing_mark,
                dose_type,
                section.key,
                refill_entries,
                index,
                config,
                warnings,
            );
            dosing_rows.push((dosing_mark, dose_type, refill_text));
        }
    }

    let mut prescriptions = Vec::new();
    for device_mark in &section.devices {
        if let MarkRole::Device(device) = device_mark.role {
            for &(dosing_mark, dose_type, ref refill_text) in &dosing_rows {
                prescriptions.push(build_prescription(
                    section.key,
                    device,
                    dose_type,
                    device_mark,
                    dosing_mark,
                    refill_text,
                ));
            }
        }
    }

    debug!(
        section = %section.key,
        count = prescriptions.len(),
        "synthesized section prescriptions"
    );
    prescriptions
}

fn build_prescription(
    key: SectionKey,
    device: Device,
    dose_type: DoseType,
    device_mark: &ClassifiedMark,
    dosing_mark: &ClassifiedMark,
    refill_text: &str,
) -> Prescription {
    let strength = key.strength;
    // Form-sourced fields inherit the weaker of the two contributing marks.
    let mark_confidence = device_mark.confidence.min(dosing_mark.confidence);

    Prescription {
        product: PrescriptionField::from_form(
            format!("COSENTYX {}", strength.label()),
            mark_confidence,
        ),
        dosage: PrescriptionField::from_form(strength.label(), mark_confidence),
        form: PrescriptionField::from_form(form_display(device, strength), mark_confidence),
        dose_type: PrescriptionField::from_form(dose_type.as_str(), mark_confidence),
        patient_type: PrescriptionField::from_form(key.patient_class.as_str(), mark_confidence),
        quantity: PrescriptionField::from_lookup(
            quantity(strength, device, dose_type).to_string(),
        ),
        sig: PrescriptionField::from_lookup(sig_for(strength, dose_type)),
        refills: PrescriptionField::from_lookup(refill_text),
    }
}
