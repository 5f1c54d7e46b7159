//! Body-text and column detection.
//!
//! Body text is the dominant population of block widths in a document. The
//! blocks of that population are then clustered by their left edge, and each
//! left-edge cluster becomes a column spanning the x-extent of its members.

use super::cluster::{group_by_label, Dbscan};
use crate::error::{Error, Result};
use crate::model::{Range, Rect};
use serde::{Deserialize, Serialize};

/// Tuning for [`ColumnDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnDetectorOptions {
    /// Clustering radius for block widths
    pub width_eps: f64,
    /// Clustering radius for block left edges
    pub x0_eps: f64,
    /// Minimum cluster neighbourhood size
    pub min_samples: usize,
    /// Body-text share below which a warning is logged
    pub body_text_threshold: f64,
    /// Relative tolerance when matching blocks against the body-text ranges
    pub tolerance: f64,
    /// Word count a text block must exceed to take part in width clustering
    pub min_words: usize,
}

impl Default for ColumnDetectorOptions {
    fn default() -> Self {
        Self {
            width_eps: 5.0,
            x0_eps: 30.0,
            min_samples: 5,
            body_text_threshold: 0.6,
            tolerance: 0.1,
            min_words: 50,
        }
    }
}

impl ColumnDetectorOptions {
    /// Set the width clustering radius.
    pub fn with_width_eps(mut self, eps: f64) -> Self {
        self.width_eps = eps;
        self
    }

    /// Set the left-edge clustering radius.
    pub fn with_x0_eps(mut self, eps: f64) -> Self {
        self.x0_eps = eps;
        self
    }

    /// Set the minimum cluster neighbourhood size.
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// Set the candidate word-count threshold.
    pub fn with_min_words(mut self, min_words: usize) -> Self {
        self.min_words = min_words;
        self
    }
}

/// Document-wide body-text layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    /// Width range of the body-text blocks
    pub width_range: Range,
    /// Columns ordered left to right
    pub columns: Vec<Range>,
    /// Fraction of the candidate blocks that belong to the body-text class
    pub body_share: f64,
}

impl ColumnLayout {
    /// Check if a block box matches the body-text width and starts in a column.
    pub fn is_big_block(&self, bbox: &Rect, tolerance: f64) -> bool {
        is_big_block(bbox, self.width_range, &self.columns, tolerance)
    }

    /// Index of the column that fully contains the box horizontally.
    pub fn column_of(&self, bbox: &Rect) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| bbox.x0 >= c.min && bbox.x1 <= c.max)
    }
}

/// Check if a block box is a body-text ("big") block.
///
/// The block width must lie inside the body-text width range and its left
/// edge inside at least one column, both widened by `tolerance`.
pub fn is_big_block(bbox: &Rect, width_range: Range, columns: &[Range], tolerance: f64) -> bool {
    width_range.contains_with_tolerance(bbox.width(), tolerance)
        && columns
            .iter()
            .any(|c| c.contains_with_tolerance(bbox.x0, tolerance))
}

/// Detects the body-text width class and the columns it forms.
#[derive(Debug, Clone, Default)]
pub struct ColumnDetector {
    options: ColumnDetectorOptions,
}

impl ColumnDetector {
    /// Create a detector.
    pub fn new(options: ColumnDetectorOptions) -> Self {
        Self { options }
    }

    /// Detector options.
    pub fn options(&self) -> &ColumnDetectorOptions {
        &self.options
    }

    /// Detect the body-text layout from the candidate block boxes of a whole document.
    ///
    /// Returns [`Error::NoBodyTextFound`] when the widths form no cluster, or
    /// when the body-text blocks form no left-edge cluster.
    pub fn detect(&self, boxes: &[Rect]) -> Result<ColumnLayout> {
        let widths: Vec<f64> = boxes.iter().map(Rect::width).collect();
        let width_groups = group_by_label(
            &Dbscan::new(self.options.width_eps, self.options.min_samples).fit(&widths),
        );

        // Largest cluster wins; on a tie the narrower cluster (lower id).
        let body = width_groups
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.len().cmp(&b.len()).then(ib.cmp(ia)))
            .map(|(_, members)| members)
            .ok_or_else(|| {
                Error::NoBodyTextFound(format!(
                    "{} candidate blocks form no width cluster",
                    boxes.len()
                ))
            })?;

        let body_share = body.len() as f64 / boxes.len() as f64;
        if body_share < self.options.body_text_threshold {
            log::warn!(
                "Body text covers only {:.1}% of {} candidate blocks",
                body_share * 100.0,
                boxes.len()
            );
        }

        let body_boxes: Vec<Rect> = body.iter().map(|&i| boxes[i]).collect();
        let width_range = Range::spanning(body_boxes.iter().map(Rect::width))
            .ok_or_else(|| Error::NoBodyTextFound("empty body-text class".into()))?;

        let x0s: Vec<f64> = body_boxes.iter().map(|b| b.x0).collect();
        let x0_groups = group_by_label(
            &Dbscan::new(self.options.x0_eps, self.options.min_samples).fit(&x0s),
        );

        let mut columns: Vec<Range> = x0_groups
            .iter()
            .filter_map(|members| {
                let min = Range::spanning(members.iter().map(|&i| body_boxes[i].x0))?.min;
                let max = Range::spanning(members.iter().map(|&i| body_boxes[i].x1))?.max;
                Some(Range::new(min, max))
            })
            .collect();
        columns.sort_by(|a, b| a.min.total_cmp(&b.min));

        if columns.is_empty() {
            return Err(Error::NoBodyTextFound(format!(
                "{} body-text blocks form no column",
                body_boxes.len()
            )));
        }

        log::debug!(
            "Body text width {:.1}..{:.1} in {} column(s)",
            width_range.min,
            width_range.max,
            columns.len()
        );

        Ok(ColumnLayout {
            width_range,
            columns,
            body_share,
        })
    }
}
