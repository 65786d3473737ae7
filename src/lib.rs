//! Prescription inference from fixed-layout pharmaceutical intake forms.
//!
//! The input is the normalized output of an OCR pass over one intake form:
//! spatial text fragments, checkbox-like selection marks, and table grids.
//! None of these carry a "prescription" entity. The form author's intent has
//! to be reconstructed from the spatial co-occurrence of marks and printed
//! labels, and the derived fields (quantity, dosing instructions, refill
//! count) are looked up from the recovered classification rather than read
//! off the page.

pub mod config;
pub mod models;
pub mod pipeline;

pub use config::ExtractorConfig;
pub use models::{
    OcrDocument, Prescription, PrescriptionExtraction, SelectionMark, TableGrid, TextFragment,
};
pub use pipeline::{ExtractError, ExtractionWarning, PrescriptionExtractor};

/// Extract prescriptions from one document with the default configuration.
pub fn extract_prescriptions(
    document: &OcrDocument,
) -> Result<PrescriptionExtraction, ExtractError> {
    PrescriptionExtractor::default().extract(document)
}
