//! Normalized OCR input for one intake form document.
//!
//! Produced by the upstream OCR acquisition layer and passed in read-only.
//! All geometry is page-relative, expressed as fractions of page size in
//! [0, 1] with the origin at the top-left corner.

use serde::{Deserialize, Serialize};

use crate::pipeline::ExtractError;

/// A single OCR-detected line of text with its bounding box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub page: u32,
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// An OCR-detected checkbox with its selection state.
///
/// Only selected marks participate in inference; unselected marks are kept
/// so diagnostics can prove a section was genuinely left blank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionMark {
    /// Opaque block id assigned by the OCR layer.
    pub id: String,
    pub page: u32,
    pub top: f64,
    pub left: f64,
    pub selected: bool,
    /// Per-mark OCR confidence in [0, 1], when the OCR layer reports one.
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// One detected table as an order-preserving grid of cell text.
///
/// Row order is semantically meaningful: it encodes section and dosing-row
/// identity on the printed form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableGrid {
    pub rows: Vec<Vec<String>>,
}

/// The full normalized OCR output for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrDocument {
    pub fragments: Vec<TextFragment>,
    pub marks: Vec<SelectionMark>,
    pub tables: Vec<TableGrid>,
}

impl OcrDocument {
    /// Parse the normalized document from the upstream JSON payload.
    pub fn from_json(payload: &str) -> Result<Self, ExtractError> {
        let document: Self = serde_json::from_str(payload)?;
        document.ensure_well_formed()?;
        Ok(document)
    }

    /// Reject structurally malformed input.
    ///
    /// A zero page number or non-finite geometry means the OCR layer failed
    /// to attach a position at all, an upstream contract violation that
    /// fails the whole extraction rather than being skipped silently.
    pub fn ensure_well_formed(&self) -> Result<(), ExtractError> {
        for mark in &self.marks {
            if mark.page == 0 || !mark.top.is_finite() || !mark.left.is_finite() {
                return Err(ExtractError::MalformedMark {
                    id: mark.id.clone(),
                });
            }
        }
        for fragment in &self.fragments {
            if fragment.page == 0
                || !fragment.top.is_finite()
                || !fragment.left.is_finite()
                || !fragment.width.is_finite()
                || !fragment.height.is_finite()
            {
                return Err(ExtractError::MalformedFragment {
                    page: fragment.page,
                    snippet: fragment.text.chars().take(40).collect(),
                });
            }
        }
        Ok(())
    }

    /// Marks the form author actually checked.
    pub fn selected_marks(&self) -> impl Iterator<Item = &SelectionMark> {
        self.marks.iter().filter(|m| m.selected)
    }
}
