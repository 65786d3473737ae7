//! Refill-count recovery.
//!
//! The refill count is handwritten into a pre-printed "12 refills, or ___
//! refills" cell at the right edge of each maintenance row. OCR detects the
//! handwriting as a disconnected token, so the count has to be re-associated
//! with its logical row. Two strategies run in order: a table-row pattern
//! scan, then a spatial lookup in the refill column. Loading doses carry no
//! refills by business rule, whatever the page says.

use regex::Regex;
use tracing::{debug, warn};

use crate::config::ExtractorConfig;
use crate::models::{DoseType, PatientClass, Strength, TableGrid};

use super::classify::ClassifiedMark;
use super::sections::SectionKey;
use super::spatial::SpatialIndex;
use super::ExtractionWarning;

/// Default refill text when no table row or handwritten digit is found.
pub const DEFAULT_REFILL_TEXT: &str = "12 or 0";

/// Refill text forced for loading doses.
pub const LOADING_REFILL_TEXT: &str = "0";

/// The pre-printed anchor value in the refill cell; an all-digit fragment
/// equal to it is the printed "12", not the handwritten count.
const PRINTED_REFILL_ANCHOR: &str = "12";

/// A refill count recovered from a table row, keyed to its section and
/// dosing row.
#[derive(Debug, Clone, PartialEq)]
pub struct RefillEntry {
    pub section: SectionKey,
    pub dose_type: DoseType,
    pub text: String,
}

/// Scans table grids for filled-in refill cells.
pub struct RefillScanner {
    pattern: Regex,
}

impl Default for RefillScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl RefillScanner {
    pub fn new() -> Self {
        // "12 refills, or 5 refills" with optional comma and plural s.
        Self {
            pattern: Regex::new(r"12\s*refills?,?\s*or\s*(\d+)\s*refills?").unwrap(),
        }
    }

    /// Scan every table row for the refill pattern and attribute each hit to
    /// a (section, dose type). At most one entry survives per key: the first
    /// encountered wins and later ones record a warning.
    ///
    /// A pattern row without section evidence of its own inherits the nearest
    /// preceding attributed row: the handwritten cell sometimes lands on a
    /// continuation row below the printed product text.
    pub fn scan(
        &self,
        tables: &[TableGrid],
        warnings: &mut Vec<ExtractionWarning>,
    ) -> Vec<RefillEntry> {
        let mut entries: Vec<RefillEntry> = Vec::new();

        for (table_index, table) in tables.iter().enumerate() {
            let header_class = table
                .rows
                .first()
                .and_then(|row| header_patient_class(&joined_lowercase(row)));

            let mut carried: Option<(SectionKey, DoseType)> = None;

            for (row_index, row) in table.rows.iter().enumerate() {
                let text = joined_lowercase(row);

                let strength = row_strength(&text);
                let dose_type = row_dose_type(&text);
                let attribution = match (strength, dose_type) {
                    (Some(strength), Some(dose_type)) => {
                        let patient_class = row_patient_class(&text, strength, header_class);
                        let key = SectionKey::new(patient_class, strength);
                        carried = Some((key, dose_type));
                        Some((key, dose_type))
                    }
                    _ => carried,
                };

                let Some(capture) = self.pattern.captures(&text) else {
                    continue;
                };
                let handwritten = &capture[1];

                let Some((section, dose_type)) = attribution else {
                    warn!(
                        table = table_index,
                        row = row_index,
                        "refill row matched but could not be attributed to a section"
                    );
                    warnings.push(ExtractionWarning::UnattributedRefillRow {
                        table: table_index,
                        row: row_index,
                    });
                    continue;
                };

                if entries
                    .iter()
                    .any(|e| e.section == section && e.dose_type == dose_type)
                {
                    warn!(
                        %section,
                        dose_type = dose_type.as_str(),
                        "duplicate refill row; keeping the first"
                    );
                    warnings.push(ExtractionWarning::DuplicateRefillRow { section, dose_type });
                    continue;
                }

                debug!(
                    %section,
                    dose_type = dose_type.as_str(),
                    handwritten,
                    "refill count recovered from table row"
                );
                entries.push(RefillEntry {
                    section,
                    dose_type,
                    text: format!("12 or {handwritten}"),
                });
            }
        }

        entries
    }
}

/// Spatial fallback: the first all-digit fragment in the refill column of
/// the mark's row that is not the pre-printed anchor is the handwritten
/// count.
pub fn handwritten_refill(
    index: &SpatialIndex<'_>,
    mark: &ClassifiedMark,
    config: &ExtractorConfig,
) -> Option<String> {
    index
        .fragments_near_right_of(
            mark.page,
            mark.top,
            config.refill_band_tolerance,
            config.refill_column_min_left,
        )
        .iter()
        .map(|fragment| fragment.text.trim())
        .filter(|text| !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()))
        .find(|text| *text != PRINTED_REFILL_ANCHOR)
        .map(|digits| format!("12 or {digits}"))
}

/// Resolve the refill text for one dosing row: table entry first, then the
/// handwritten fallback, then the documented default. The loading override
/// is applied before anything else; loading doses never carry refills.
pub fn resolve_refills(
    dosing_mark: &ClassifiedMark,
    dose_type: DoseType,
    section: SectionKey,
    entries: &[RefillEntry],
    index: &SpatialIndex<'_>,
    config: &ExtractorConfig,
    warnings: &mut Vec<ExtractionWarning>,
) -> String {
    if dose_type == DoseType::Loading {
        return LOADING_REFILL_TEXT.to_string();
    }

    if let Some(entry) = entries
        .iter()
        .find(|e| e.section == section && e.dose_type == dose_type)
    {
        return entry.text.clone();
    }

    if let Some(text) = handwritten_refill(index, dosing_mark, config) {
        return text;
    }

    debug!(%section, dose_type = dose_type.as_str(), "no refill evidence; using default");
    warnings.push(ExtractionWarning::UnresolvedRefill { section, dose_type });
    DEFAULT_REFILL_TEXT.to_string()
}

fn joined_lowercase(row: &[String]) -> String {
    row.join(" ").to_lowercase()
}

/// Strength evidence in a table row. The "(2x150" capacity annotation and
/// the bare "300 mg" both mark the 300mg section and are checked first.
fn row_strength(text: &str) -> Option<Strength> {
    if text.contains("(2x150") || text.contains("300 mg") {
        Some(Strength::Mg300)
    } else if text.contains("75 mg") {
        Some(Strength::Mg75)
    } else if text.contains("150 mg") {
        Some(Strength::Mg150)
    } else {
        None
    }
}

/// Dosing-row evidence in a table row. The loading test wants the printed
/// "loading dose:" label; a bare "loading" also appears inside the
/// maintenance-increase annotation text.
fn row_dose_type(text: &str) -> Option<DoseType> {
    if text.contains("maintenance increase")
        || (text.contains("every 2 weeks") && text.contains("maintenance"))
    {
        Some(DoseType::MaintenanceIncrease)
    } else if text.contains("loading dose:") {
        Some(DoseType::Loading)
    } else if text.contains("maintenance") || text.contains("every 4 weeks") {
        Some(DoseType::Maintenance)
    } else {
        None
    }
}

/// Patient class printed in a table header row.
fn header_patient_class(text: &str) -> Option<PatientClass> {
    if text.contains("product information (adult)") {
        Some(PatientClass::Adult)
    } else if text.contains("product information (pediatric)") {
        Some(PatientClass::Pediatric)
    } else {
        None
    }
}

/// Patient class for a data row: the table header decides when present,
/// then the row's own pediatric markers, then the strength.
fn row_patient_class(
    text: &str,
    strength: Strength,
    header_class: Option<PatientClass>,
) -> PatientClass {
    if let Some(class) = header_class {
        return class;
    }
    let pediatric_markers = ["pediatric", "wt<50", "wt <50", "wt≥50", "wt ≥50", "wt>=50"];
    if pediatric_markers.iter().any(|marker| text.contains(marker)) {
        return PatientClass::Pediatric;
    }
    match strength {
        Strength::Mg75 => PatientClass::Pediatric,
        Strength::Mg150 | Strength::Mg300 => PatientClass::Adult,
    }
}
