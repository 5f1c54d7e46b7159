//! Regression comparison of body-block indexes between two output trees.

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-document body index file name.
pub const BODY_INDEX_FILE: &str = "big_blocks_id.json";

/// Body-block differences on one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDiff {
    /// Page index (0-based)
    pub page: usize,
    /// Block numbers selected now but not in the reference
    pub added: Vec<usize>,
    /// Block numbers selected in the reference but not now
    pub removed: Vec<usize>,
}

/// Result of comparing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// Reference index file does not exist
    MissingTarget(PathBuf),
    /// Indexes are identical
    Same,
    /// Indexes differ on the listed pages
    Changed(Vec<PageDiff>),
}

/// Compare two per-page body indexes.
///
/// Pages present on only one side compare against an empty page.
pub fn diff_body_index(current: &[Vec<usize>], expected: &[Vec<usize>]) -> Vec<PageDiff> {
    let empty = Vec::new();
    (0..current.len().max(expected.len()))
        .filter_map(|page| {
            let cur = current.get(page).unwrap_or(&empty);
            let exp = expected.get(page).unwrap_or(&empty);
            if cur == exp {
                return None;
            }
            Some(PageDiff {
                page,
                added: cur.iter().filter(|n| !exp.contains(*n)).copied().collect(),
                removed: exp.iter().filter(|n| !cur.contains(*n)).copied().collect(),
            })
        })
        .collect()
}

fn read_index(path: &Path) -> Result<Vec<Vec<usize>>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Compare `<output_dir>/big_blocks_id.json` with
/// `<target_root>/<output_dir name>/big_blocks_id.json`.
pub fn compare_output(output_dir: &Path, target_root: &Path) -> Result<Comparison> {
    let name = output_dir.file_name().unwrap_or_default();
    let target = target_root.join(name).join(BODY_INDEX_FILE);
    if !target.exists() {
        log::warn!("Target file not found: {}", target.display());
        return Ok(Comparison::MissingTarget(target));
    }

    let current = read_index(&output_dir.join(BODY_INDEX_FILE))?;
    let expected = read_index(&target)?;
    let diffs = diff_body_index(&current, &expected);
    if diffs.is_empty() {
        return Ok(Comparison::Same);
    }

    log::debug!("{} changed", output_dir.display());
    for diff in &diffs {
        log::debug!(
            "page {}, add: {:?}, del: {:?}",
            diff.page,
            diff.added,
            diff.removed
        );
    }
    Ok(Comparison::Changed(diffs))
}
