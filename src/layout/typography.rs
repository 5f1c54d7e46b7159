//! Dominant typography vote.
//!
//! Characters are counted per (font, size) pair; the dominant font and the
//! dominant size are then picked independently from the two marginals.

use crate::model::{RawBlock, Span};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Font sizes are compared at 0.01 pt precision.
fn size_key(size: f64) -> i64 {
    (size * 100.0).round() as i64
}

/// The dominant font and size of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Typography {
    /// Most common font name by character count
    pub font: String,
    /// Most common font size by character count
    pub size: f64,
}

impl Typography {
    /// Check if a span is set in the dominant font at the dominant size.
    pub fn matches(&self, span: &Span) -> bool {
        span.font == self.font && size_key(span.size) == size_key(self.size)
    }
}

/// Character counts per (font, size) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontCounter {
    counts: BTreeMap<String, BTreeMap<i64, usize>>,
}

impl FontCounter {
    /// Create an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `chars` characters set in `font` at `size`.
    pub fn add(&mut self, font: &str, size: f64, chars: usize) {
        if chars == 0 {
            return;
        }
        *self
            .counts
            .entry(font.to_string())
            .or_default()
            .entry(size_key(size))
            .or_insert(0) += chars;
    }

    /// Count every span of a block.
    pub fn add_block(&mut self, block: &RawBlock) {
        for span in block.lines.iter().flat_map(|l| &l.spans) {
            self.add(&span.font, span.size, span.char_count());
        }
    }

    /// Fold another counter into this one.
    pub fn merge(&mut self, other: &FontCounter) {
        for (font, sizes) in &other.counts {
            let entry = self.counts.entry(font.clone()).or_default();
            for (size, count) in sizes {
                *entry.entry(*size).or_insert(0) += count;
            }
        }
    }

    /// Total characters counted.
    pub fn total(&self) -> usize {
        self.counts.values().flat_map(|s| s.values()).sum()
    }

    /// Check if nothing was counted.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Characters counted per font.
    pub fn font_totals(&self) -> BTreeMap<&str, usize> {
        self.counts
            .iter()
            .map(|(font, sizes)| (font.as_str(), sizes.values().sum()))
            .collect()
    }

    /// Characters counted per size key (hundredths of a point).
    fn size_totals(&self) -> BTreeMap<i64, usize> {
        let mut totals = BTreeMap::new();
        for sizes in self.counts.values() {
            for (size, count) in sizes {
                *totals.entry(*size).or_insert(0) += count;
            }
        }
        totals
    }

    /// Dominant font and size, or `None` if nothing was counted.
    ///
    /// Ties go to the lexicographically smallest font and the smallest size.
    pub fn dominant(&self) -> Option<Typography> {
        let font = first_max(self.font_totals())?.to_string();
        let size = first_max(self.size_totals())? as f64 / 100.0;
        Some(Typography { font, size })
    }
}

/// Key with the highest count; the first (smallest) key wins a tie.
fn first_max<K: Copy>(totals: BTreeMap<K, usize>) -> Option<K> {
    let mut best: Option<(K, usize)> = None;
    for (key, count) in totals {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Char, Rect};

    #[test]
    fn test_dominant_by_char_count() {
        let mut counter = FontCounter::new();
        counter.add("Times", 10.0, 500);
        counter.add("Times-Bold", 14.0, 40);
        counter.add("Helvetica", 10.0, 120);

        let typo = counter.dominant().unwrap();
        assert_eq!(typo.font, "Times");
        assert_eq!(typo.size, 10.0);
        assert_eq!(counter.total(), 660);
    }

    #[test]
    fn test_font_and_size_are_independent() {
        let mut counter = FontCounter::new();
        counter.add("A", 9.0, 60);
        counter.add("B", 11.0, 50);
        counter.add("B", 9.0, 30);

        // Font B wins with 80 chars, size 9 wins with 90 chars.
        let typo = counter.dominant().unwrap();
        assert_eq!(typo.font, "B");
        assert_eq!(typo.size, 9.0);
    }

    #[test]
    fn test_tie_breaks() {
        let mut counter = FontCounter::new();
        counter.add("Zeta", 12.0, 10);
        counter.add("Alpha", 8.0, 10);

        let typo = counter.dominant().unwrap();
        assert_eq!(typo.font, "Alpha");
        assert_eq!(typo.size, 8.0);
    }

    #[test]
    fn test_size_rounding() {
        let mut counter = FontCounter::new();
        counter.add("A", 9.96, 10);
        counter.add("A", 9.9600001, 10);
        counter.add("A", 12.0, 15);
        assert_eq!(counter.dominant().unwrap().size, 9.96);
    }

    #[test]
    fn test_empty_and_merge() {
        let mut a = FontCounter::new();
        assert!(a.dominant().is_none());
        a.add("A", 10.0, 0);
        assert!(a.is_empty());

        let mut b = FontCounter::new();
        b.add("B", 10.0, 5);
        a.add("A", 10.0, 3);
        a.merge(&b);
        a.merge(&b);
        assert_eq!(a.font_totals().get("B"), Some(&10));
        assert_eq!(a.dominant().unwrap().font, "B");
    }

    #[test]
    fn test_matches_span() {
        let typo = Typography {
            font: "Times".into(),
            size: 10.0,
        };
        let span = Span {
            font: "Times".into(),
            size: 10.001,
            bbox: Rect::default(),
            origin: [0.0, 0.0],
            ascender: 0.0,
            descender: 0.0,
            chars: vec![Char {
                c: 'x',
                bbox: Rect::default(),
                origin: [0.0, 0.0],
            }],
        };
        assert!(typo.matches(&span));
        assert!(!typo.matches(&Span {
            size: 11.0,
            ..span.clone()
        }));
    }
}
