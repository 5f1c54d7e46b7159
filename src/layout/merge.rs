//! Continuation merging.
//!
//! Body-text blocks that are really the tail of a sentence split off by the
//! decoder (a single unterminated line sitting right above the next block)
//! are folded into the block that follows them.

use crate::model::{Block, Line, RawBlock, Rect};
use serde::{Deserialize, Serialize};

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Tuning for [`merge_continuations`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Vertical distance to the next block from which a block stands alone
    pub line_distance_threshold: f64,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            line_distance_threshold: 5.0,
        }
    }
}

/// A block the continuation merger can work on.
pub trait Continuable {
    /// Block box.
    fn bbox(&self) -> Rect;

    /// Mutable block box.
    fn bbox_mut(&mut self) -> &mut Rect;

    /// Text of each line, in order.
    fn line_texts(&self) -> Vec<String>;

    /// Prepend the first non-blank line of `orphan` to this block.
    fn prepend_first_line(&mut self, orphan: Self)
    where
        Self: Sized;
}

impl Continuable for Block {
    fn bbox(&self) -> Rect {
        self.bbox
    }

    fn bbox_mut(&mut self) -> &mut Rect {
        &mut self.bbox
    }

    fn line_texts(&self) -> Vec<String> {
        self.text.split('\n').map(str::to_string).collect()
    }

    fn prepend_first_line(&mut self, orphan: Self) {
        let lines = orphan.line_texts();
        let line = first_content_index(&lines).map_or("", |i| lines[i].as_str());
        self.text = format!("{}\n{}", line, self.text);
    }
}

impl Continuable for RawBlock {
    fn bbox(&self) -> Rect {
        self.bbox
    }

    fn bbox_mut(&mut self) -> &mut Rect {
        &mut self.bbox
    }

    fn line_texts(&self) -> Vec<String> {
        self.lines.iter().map(Line::text).collect()
    }

    fn prepend_first_line(&mut self, mut orphan: Self) {
        let texts = orphan.line_texts();
        if let Some(i) = first_content_index(&texts) {
            self.lines.insert(0, orphan.lines.swap_remove(i));
        }
    }
}

fn first_content_index(lines: &[String]) -> Option<usize> {
    lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .or(if lines.is_empty() { None } else { Some(0) })
}

/// Check if block `i` stands on its own and must not be merged into block `i + 1`.
fn stands_alone<B: Continuable>(blocks: &[B], i: usize, options: &MergeOptions) -> bool {
    let Some(next) = blocks.get(i + 1) else {
        return true;
    };
    let block = &blocks[i];
    let lines = block.line_texts();

    if lines.iter().filter(|l| !l.trim().is_empty()).count() > 1 {
        return true;
    }

    let terminated = lines
        .first()
        .and_then(|l| l.trim_end().chars().last())
        .is_some_and(|c| SENTENCE_TERMINATORS.contains(&c));
    if terminated {
        return true;
    }

    next.bbox().y0 - block.bbox().y1 >= options.line_distance_threshold
}

/// Fold orphan first lines into the block that follows them.
///
/// A block is merged into its successor unless it has more than one
/// non-blank line, its first line ends a sentence, it is the last block, or
/// the next block starts at least `line_distance_threshold` below it. The
/// merged block takes the orphan's top edge and the wider right edge; the
/// scan then moves past it. Returns the number of merges.
pub fn merge_continuations<B: Continuable>(blocks: &mut Vec<B>, options: &MergeOptions) -> usize {
    let mut merged = 0;
    let mut i = 0;
    while i < blocks.len() {
        if stands_alone(blocks, i, options) {
            i += 1;
            continue;
        }

        let orphan = blocks.remove(i);
        let orphan_box = orphan.bbox();
        let next = &mut blocks[i];
        let bbox = next.bbox_mut();
        bbox.y0 = orphan_box.y0;
        bbox.x1 = bbox.x1.max(orphan_box.x1);
        next.prepend_first_line(orphan);
        merged += 1;
        i += 1;
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockKind, Char, Span};

    fn block(n: usize, bbox: [f64; 4], text: &str) -> Block {
        Block::new_text(n, bbox.into(), text)
    }

    fn non_ws_chars(blocks: &[Block]) -> usize {
        blocks
            .iter()
            .flat_map(|b| b.text.chars())
            .filter(|c| !c.is_whitespace())
            .count()
    }

    #[test]
    fn test_merges_unterminated_line() {
        let mut blocks = vec![
            block(0, [50.0, 100.0, 280.0, 112.0], "continued"),
            block(1, [50.0, 114.0, 300.0, 200.0], "body text"),
        ];
        let merged = merge_continuations(&mut blocks, &MergeOptions::default());

        assert_eq!(merged, 1);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "continued\nbody text");
        assert_eq!(blocks[0].bbox, Rect::new(50.0, 100.0, 300.0, 200.0));
    }

    #[test]
    fn test_terminated_line_stands_alone() {
        let mut blocks = vec![
            block(0, [50.0, 100.0, 280.0, 112.0], "The end. "),
            block(1, [50.0, 114.0, 300.0, 200.0], "body text"),
        ];
        assert_eq!(merge_continuations(&mut blocks, &MergeOptions::default()), 0);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_distant_and_multiline_blocks_stand_alone() {
        let mut blocks = vec![
            block(0, [50.0, 100.0, 280.0, 112.0], "far away"),
            block(1, [50.0, 117.0, 300.0, 200.0], "line one\nline two"),
            block(2, [50.0, 201.0, 300.0, 300.0], "last"),
        ];
        assert_eq!(merge_continuations(&mut blocks, &MergeOptions::default()), 0);
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn test_merged_block_is_skipped() {
        let mut blocks = vec![
            block(0, [0.0, 0.0, 10.0, 10.0], "a"),
            block(1, [0.0, 11.0, 10.0, 20.0], "b"),
            block(2, [0.0, 21.0, 10.0, 30.0], "c"),
        ];
        merge_continuations(&mut blocks, &MergeOptions::default());

        // "a" merges into "b"; the scan moves on to "c", the last block.
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "a\nb");
        assert_eq!(blocks[1].text, "c");
    }

    #[test]
    fn test_counts_are_monotone() {
        let mut blocks = vec![
            block(0, [0.0, 0.0, 10.0, 10.0], "x"),
            block(1, [0.0, 12.0, 10.0, 20.0], "\n  \ny"),
            block(2, [0.0, 21.0, 10.0, 30.0], "z!"),
            block(3, [0.0, 50.0, 10.0, 60.0], ""),
        ];
        let before_len = blocks.len();
        let before_chars = non_ws_chars(&blocks);

        merge_continuations(&mut blocks, &MergeOptions::default());
        assert!(blocks.len() <= before_len);
        assert!(non_ws_chars(&blocks) >= before_chars);
    }

    #[test]
    fn test_raw_block_merge_keeps_spans() {
        let line = |text: &str, y: f64| Line {
            bbox: Rect::new(0.0, y, 100.0, y + 10.0),
            spans: vec![Span {
                font: "Times".into(),
                size: 10.0,
                bbox: Rect::new(0.0, y, 100.0, y + 10.0),
                origin: [0.0, y + 8.0],
                ascender: 0.9,
                descender: -0.2,
                chars: text
                    .chars()
                    .map(|c| Char {
                        c,
                        bbox: Rect::default(),
                        origin: [0.0, 0.0],
                    })
                    .collect(),
            }],
        };
        let mut blocks = vec![
            RawBlock {
                number: 3,
                kind: BlockKind::Text,
                bbox: Rect::new(0.0, 0.0, 120.0, 10.0),
                lines: vec![line("tail of a", 0.0)],
            },
            RawBlock {
                number: 4,
                kind: BlockKind::Text,
                bbox: Rect::new(0.0, 12.0, 100.0, 40.0),
                lines: vec![line("sentence.", 12.0), line("More", 24.0)],
            },
        ];
        merge_continuations(&mut blocks, &MergeOptions::default());

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].number, 4);
        assert_eq!(blocks[0].text(), "tail of a\nsentence.\nMore");
        assert_eq!(blocks[0].bbox, Rect::new(0.0, 0.0, 120.0, 40.0));
    }
}
