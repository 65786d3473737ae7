//! Aggregate validation of synthesized prescriptions.
//!
//! The per-prescription rule lives on `Prescription::is_valid`; this module
//! folds it into the extraction-level verdict. Invalid prescriptions stay in
//! the output so the caller sees what was synthesized and why the document
//! did or did not pass.

use crate::models::Prescription;

/// Count the dispensable prescriptions and decide the aggregate verdict:
/// an extraction is usable when at least one prescription is valid.
pub fn summarize(prescriptions: &[Prescription]) -> (usize, bool) {
    let valid_count = prescriptions.iter().filter(|p| p.is_valid()).count();
    (valid_count, valid_count > 0)
}
