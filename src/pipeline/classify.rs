//! Checkbox classification against nearby printed text.
//!
//! A selected mark means nothing on its own; its meaning lives in the printed
//! labels sharing its row. Classification recovers the role (device vs
//! dosing), the strength, and the patient class from case-insensitive
//! keyword containment over the row band. The keyword rules are ordered
//! const tables, not nested conditionals, so priority ("maintenance
//! increase" before "maintenance") is visible and testable in isolation.

use tracing::{debug, warn};

use crate::config::ExtractorConfig;
use crate::models::{Device, DoseType, PatientClass, SelectionMark, Strength, TextFragment};

use super::spatial::SpatialIndex;
use super::ExtractionWarning;

/// What a selected checkbox turned out to mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkRole {
    Device(Device),
    Dosing(DoseType),
}

/// A selected mark with its recovered meaning.
///
/// Ephemeral: produced per mark, consumed by the section grouper, never kept
/// past one extraction run.
#[derive(Debug, Clone)]
pub struct ClassifiedMark {
    pub source_id: String,
    pub page: u32,
    pub top: f64,
    pub left: f64,
    pub role: MarkRole,
    pub strength: Strength,
    pub patient_class: PatientClass,
    /// OCR confidence of the underlying mark, with the configured default
    /// substituted when the OCR layer reports none.
    pub confidence: f32,
}

/// Device keywords in priority order. First containment match wins.
const DEVICE_RULES: &[(&str, Device)] = &[
    ("sensoready", Device::SensoreadyPen),
    ("unoready", Device::UnoreadyPen),
    ("syringe", Device::PrefilledSyringe),
];

/// Dosing keywords in priority order. "maintenance increase" must precede
/// "maintenance", which is its substring; the "every N weeks" phrases catch
/// fragments the OCR split away from the row label.
const DOSING_RULES: &[(&str, DoseType)] = &[
    ("maintenance increase", DoseType::MaintenanceIncrease),
    ("every 2 weeks", DoseType::MaintenanceIncrease),
    ("loading", DoseType::Loading),
    ("maintenance", DoseType::Maintenance),
    ("every 4 weeks", DoseType::Maintenance),
];

/// Printed annotation inside the maintenance-increase instructions. A
/// fragment carrying it is not loading-row evidence.
const LOADING_EXCLUSION: &str = "loading dose already completed";

/// Column headers that sit inside row bands but carry no dosing meaning.
const HEADER_MARKERS: &[&str] = &["dosage/quantity", "product information", "refills"];

/// Strength cascade. "(2x150" is the printed capacity annotation of the
/// 300mg device rows and must precede the bare "150 mg" test; the "(1xN"
/// and "inject N" forms catch fragments split away from the product name.
const STRENGTH_RULES: &[(&str, Strength)] = &[
    ("(2x150", Strength::Mg300),
    ("75 mg", Strength::Mg75),
    ("300 mg", Strength::Mg300),
    ("150 mg", Strength::Mg150),
    ("(1x75", Strength::Mg75),
    ("(1x300", Strength::Mg300),
    ("(1x150", Strength::Mg150),
    ("inject 75", Strength::Mg75),
    ("inject 300", Strength::Mg300),
    ("inject 150", Strength::Mg150),
];

/// Markers that place a row in the pediatric table. Both printed weight
/// bands route to Pediatric: the pediatric table spans wt <50kg and ≥50kg.
const PEDIATRIC_MARKERS: &[&str] = &[
    "pediatric", "wt <50", "wt<50", "wt ≥50", "wt≥50", "wt >=50", "wt>=50",
];

/// Consent/attestation phrases. A mark surrounded by these and none of the
/// prescription vocabulary belongs to the signature blocks.
const NON_PRESCRIPTION_MARKERS: &[&str] = &[
    "i have read and agree",
    "terms and conditions",
    "patient signature",
    "prescriber signature",
    "authorized representative signature",
    "consent is not required",
    "hereby authorize",
    "by signing below",
];

const PRESCRIPTION_MARKERS: &[&str] = &[
    "sensoready",
    "unoready",
    "syringe",
    "prefilled",
    "loading dose",
    "maintenance",
    "inject",
    "75 mg",
    "150 mg",
    "300 mg",
    "cosentyx",
    "refill",
];

/// First device keyword contained in `text`, if any.
pub fn device_keyword(text: &str) -> Option<Device> {
    DEVICE_RULES
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|&(_, device)| device)
}

/// First dosing keyword contained in `text`, if any. Header fragments and
/// the printed loading-completed annotation never count as evidence.
pub fn dosing_keyword(text: &str) -> Option<DoseType> {
    if HEADER_MARKERS.iter().any(|marker| text.contains(marker)) {
        return None;
    }
    for &(keyword, dose_type) in DOSING_RULES {
        if text.contains(keyword) {
            if dose_type == DoseType::Loading && text.contains(LOADING_EXCLUSION) {
                continue;
            }
            return Some(dose_type);
        }
    }
    None
}

/// First strength keyword contained in `text`, if any.
pub fn strength_keyword(text: &str) -> Option<Strength> {
    STRENGTH_RULES
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|&(_, strength)| strength)
}

fn is_pediatric_context(text: &str) -> bool {
    PEDIATRIC_MARKERS.iter().any(|marker| text.contains(marker))
}

fn is_non_prescription_context(text: &str) -> bool {
    NON_PRESCRIPTION_MARKERS.iter().any(|marker| text.contains(marker))
        && !PRESCRIPTION_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Classify one selected mark against its row band.
///
/// Returns `None` (with a warning recorded) when the surrounding text cannot
/// support both a role and a strength. Expected for decorative or unrelated
/// marks, never an error.
pub fn classify_mark(
    mark: &SelectionMark,
    index: &SpatialIndex<'_>,
    config: &ExtractorConfig,
    warnings: &mut Vec<ExtractionWarning>,
) -> Option<ClassifiedMark> {
    let band = index.fragments_near(mark.page, mark.top, config.row_band_tolerance);
    let context = concatenated_lowercase(&band);

    if is_non_prescription_context(&context) {
        debug!(id = %mark.id, page = mark.page, "skipping attestation/consent mark");
        warnings.push(ExtractionWarning::NonPrescriptionMark {
            id: mark.id.clone(),
            page: mark.page,
        });
        return None;
    }

    let role = resolve_role(mark, &band);
    let strength = strength_keyword(&context);

    let (Some(role), Some(strength)) = (role, strength) else {
        warn!(
            id = %mark.id,
            page = mark.page,
            top = mark.top,
            left = mark.left,
            "dropping unclassifiable mark"
        );
        warnings.push(ExtractionWarning::UnclassifiableMark {
            id: mark.id.clone(),
            page: mark.page,
            top: mark.top,
            left: mark.left,
        });
        return None;
    };

    let patient_class = resolve_patient_class(&context, strength);
    debug!(
        id = %mark.id,
        ?role,
        strength = strength.label(),
        patient_class = patient_class.as_str(),
        "classified mark"
    );

    Some(ClassifiedMark {
        source_id: mark.id.clone(),
        page: mark.page,
        top: mark.top,
        left: mark.left,
        role,
        strength,
        patient_class,
        confidence: mark.confidence.unwrap_or(config.default_mark_confidence),
    })
}

/// Pick the mark's role from the nearest keyword-bearing fragment.
///
/// Device and dosing labels sit in separate columns of the same row, so the
/// whole band contains both vocabularies; the fragment closest to the mark
/// decides which column the mark belongs to. Within a single fragment the
/// two never co-occur. Ties go to the device column.
fn resolve_role(mark: &SelectionMark, band: &[&TextFragment]) -> Option<MarkRole> {
    let mut best_device: Option<(Device, f64)> = None;
    let mut best_dosing: Option<(DoseType, f64)> = None;

    for fragment in band {
        let text = fragment.text.to_lowercase();
        // Vertical offsets weigh double: a label one row off is a worse
        // match than one the same distance away horizontally.
        let distance =
            (fragment.left - mark.left).abs() + 2.0 * (fragment.top - mark.top).abs();

        if let Some(device) = device_keyword(&text) {
            if best_device.map_or(true, |(_, d)| distance < d) {
                best_device = Some((device, distance));
            }
        } else if let Some(dose_type) = dosing_keyword(&text) {
            if best_dosing.map_or(true, |(_, d)| distance < d) {
                best_dosing = Some((dose_type, distance));
            }
        }
    }

    match (best_device, best_dosing) {
        (Some((device, device_distance)), Some((_, dosing_distance)))
            if device_distance <= dosing_distance =>
        {
            Some(MarkRole::Device(device))
        }
        (_, Some((dose_type, _))) => Some(MarkRole::Dosing(dose_type)),
        (Some((device, _)), None) => Some(MarkRole::Device(device)),
        (None, None) => None,
    }
}

/// 75mg only prints in the pediatric table and 300mg only in the adult one,
/// so those strengths fix the class outright; 150mg appears in both and is
/// disambiguated by the row's weight-band or section text, defaulting Adult.
fn resolve_patient_class(context: &str, strength: Strength) -> PatientClass {
    match strength {
        Strength::Mg75 => PatientClass::Pediatric,
        Strength::Mg300 => PatientClass::Adult,
        Strength::Mg150 => {
            if is_pediatric_context(context) {
                PatientClass::Pediatric
            } else {
                PatientClass::Adult
            }
        }
    }
}

fn concatenated_lowercase(band: &[&TextFragment]) -> String {
    let mut text = String::new();
    for fragment in band {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(fragment.text.trim());
    }
    text.to_lowercase()
}
