//! Document-level types.

use serde::{Deserialize, Serialize};

/// One table-of-contents entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Nesting level (1 = top level)
    pub level: u32,
    /// Entry title
    pub title: String,
    /// Destination page (1-indexed)
    pub page: u32,
}

impl TocEntry {
    /// Create a new entry.
    pub fn new(level: u32, title: impl Into<String>, page: u32) -> Self {
        Self {
            level,
            title: title.into(),
            page,
        }
    }
}

/// Deepest nesting level of the table of contents (0 if empty).
pub fn toc_depth(entries: &[TocEntry]) -> u32 {
    entries.iter().map(|e| e.level).max().unwrap_or(0)
}
