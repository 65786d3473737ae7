//! The prescription-inference pipeline.
//!
//! Stages run synchronously over one document: spatial index → mark
//! classification → section grouping → refill resolution → cartesian
//! synthesis → validation. Everything expected-but-missing is absorbed as a
//! warning on the result; only upstream contract violations are errors.

pub mod classify;
pub mod extractor;
pub mod refills;
pub mod sections;
pub mod spatial;
pub mod synthesize;
pub mod validate;

pub use classify::{ClassifiedMark, MarkRole};
pub use extractor::PrescriptionExtractor;
pub use refills::{RefillEntry, RefillScanner};
pub use sections::{Section, SectionKey};
pub use spatial::SpatialIndex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::DoseType;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("selection mark {id} has no usable page/position")]
    MalformedMark { id: String },

    #[error("text fragment on page {page} has no usable position: {snippet:?}")]
    MalformedFragment { page: u32, snippet: String },

    #[error("OCR payload parsing failed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Non-fatal conditions absorbed during inference.
///
/// These reduce coverage, not correctness. A partially useful result is
/// strictly preferred to an aborted one, because the source forms are full of
/// real-world author mistakes (multiple devices checked, missing refills).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtractionWarning {
    /// Selected mark without enough nearby text to assign a role and strength.
    UnclassifiableMark {
        id: String,
        page: u32,
        top: f64,
        left: f64,
    },
    /// Selected mark inside a consent/attestation block, not a product table.
    NonPrescriptionMark { id: String, page: u32 },
    /// Table row matched the refill pattern but could not be attributed to a
    /// section and dosing row.
    UnattributedRefillRow { table: usize, row: usize },
    /// Second refill row for the same section and dose type; the first wins.
    DuplicateRefillRow {
        section: SectionKey,
        dose_type: DoseType,
    },
    /// Section with devices but no dosings (or vice versa); nothing synthesized.
    OneSidedSection {
        section: SectionKey,
        devices: usize,
        dosings: usize,
    },
    /// No table row or handwritten digit found; the documented default applied.
    UnresolvedRefill {
        section: SectionKey,
        dose_type: DoseType,
    },
}
