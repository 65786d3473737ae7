//! Spatial tolerances and defaults for the extraction pipeline.
//!
//! Every proximity join between a selection mark and printed text goes
//! through these values. They are configuration, not algorithm: a reprint of
//! the form with different row spacing is a data change here, not a code
//! change in the pipeline.

use serde::{Deserialize, Serialize};

/// Tunable parameters for prescription extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Vertical band (fraction of page height) around a mark that counts as
    /// "the same row" when gathering classification context.
    pub row_band_tolerance: f64,

    /// Widened vertical band for refill-column lookups. Handwritten digits
    /// sit noticeably off the printed row baseline.
    pub refill_band_tolerance: f64,

    /// Left edge (fraction of page width) of the refills column. Fragments
    /// starting right of this line belong to the rightmost column of the row.
    pub refill_column_min_left: f64,

    /// Confidence substituted for a mark when the OCR layer reports none.
    pub default_mark_confidence: f32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            row_band_tolerance: 0.03,
            refill_band_tolerance: 0.035,
            refill_column_min_left: 0.70,
            default_mark_confidence: 0.95,
        }
    }
}
