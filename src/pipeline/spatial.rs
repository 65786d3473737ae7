//! Proximity queries over OCR text fragments.
//!
//! Checkboxes and their printed labels are detected independently by the OCR
//! layer; the only join key between them is page position. This module turns
//! that implicit join into explicit queries with injectable tolerances so
//! tuning is a configuration change.

use crate::models::TextFragment;

/// Read-only proximity index over a document's text fragments.
///
/// Queries are linear scans: a document carries at most a few thousand
/// fragments, far below the point where a real spatial structure pays off.
pub struct SpatialIndex<'a> {
    fragments: &'a [TextFragment],
}

impl<'a> SpatialIndex<'a> {
    pub fn new(fragments: &'a [TextFragment]) -> Self {
        Self { fragments }
    }

    /// All fragments on `page` within `max_vertical` of `top`.
    ///
    /// No order is guaranteed; callers treat the result as a bag.
    pub fn fragments_near(
        &self,
        page: u32,
        top: f64,
        max_vertical: f64,
    ) -> Vec<&'a TextFragment> {
        self.fragments
            .iter()
            .filter(|f| f.page == page && (f.top - top).abs() < max_vertical)
            .collect()
    }

    /// Same band, restricted to fragments starting at or right of `min_left`.
    /// Used to isolate the refills column at the right edge of a row.
    pub fn fragments_near_right_of(
        &self,
        page: u32,
        top: f64,
        max_vertical: f64,
        min_left: f64,
    ) -> Vec<&'a TextFragment> {
        self.fragments
            .iter()
            .filter(|f| {
                f.page == page && (f.top - top).abs() < max_vertical && f.left >= min_left
            })
            .collect()
    }

    /// Concatenated lowercased text of the row band around (`page`, `top`).
    pub fn band_text(&self, page: u32, top: f64, max_vertical: f64) -> String {
        let mut text = String::new();
        for fragment in self.fragments_near(page, top, max_vertical) {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(fragment.text.trim());
        }
        text.to_lowercase()
    }
}
