//! End-to-end orchestration of the inference pipeline.

use tracing::{debug, info};

use crate::config::ExtractorConfig;
use crate::models::{OcrDocument, PrescriptionExtraction};

use super::classify::{classify_mark, ClassifiedMark};
use super::refills::RefillScanner;
use super::sections::group_sections;
use super::spatial::SpatialIndex;
use super::synthesize::synthesize_section;
use super::validate::summarize;
use super::ExtractError;

/// One-document prescription extractor.
///
/// Stateless across documents: every invocation works only on the document
/// it is given, so callers may share one instance behind a reference and run
/// extractions in parallel. There is no interior mutability.
pub struct PrescriptionExtractor {
    config: ExtractorConfig,
    scanner: RefillScanner,
}

impl PrescriptionExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            scanner: RefillScanner::new(),
        }
    }

    /// Run the full pipeline over one normalized OCR document.
    ///
    /// Only structural contract violations (marks or fragments without a
    /// usable position) produce an error; every expected imperfection of the
    /// source form is absorbed into the result's warning list.
    pub fn extract(
        &self,
        document: &OcrDocument,
    ) -> Result<PrescriptionExtraction, ExtractError> {
        document.ensure_well_formed()?;

        let index = SpatialIndex::new(&document.fragments);
        let mut warnings = Vec::new();

        let selected = document.selected_marks().count();
        let classified: Vec<ClassifiedMark> = document
            .selected_marks()
            .filter_map(|mark| classify_mark(mark, &index, &self.config, &mut warnings))
            .collect();
        debug!(selected, classified = classified.len(), "classified selection marks");

        let refill_entries = self.scanner.scan(&document.tables, &mut warnings);
        let sections = group_sections(classified);

        let mut prescriptions = Vec::new();
        for section in &sections {
            prescriptions.extend(synthesize_section(
                section,
                &refill_entries,
                &index,
                &self.config,
                &mut warnings,
            ));
        }

        let (valid_count, is_valid) = summarize(&prescriptions);
        info!(
            prescriptions = prescriptions.len(),
            valid = valid_count,
            warnings = warnings.len(),
            "prescription extraction complete"
        );

        Ok(PrescriptionExtraction {
            prescriptions,
            valid_count,
            is_valid,
            warnings,
        })
    }
}

impl Default for PrescriptionExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}
