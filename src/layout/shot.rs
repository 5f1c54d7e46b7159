//! Shot region synthesis.
//!
//! A shot is a page region captured as a picture instead of text: figures,
//! tables, formulas. Shots are found as the vertical gaps between body-text
//! blocks inside each column, merged across columns when they line up, and
//! kept only when some page element lies inside them.

use crate::model::{Range, Rect};
use serde::{Deserialize, Serialize};

/// Tuning for [`ShotSynthesizer`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotOptions {
    /// Inset applied before the support test; rects no taller than twice this are dropped
    pub border_width: f64,
    /// Maximum top and bottom edge distance for rects in adjacent columns to merge
    pub near_threshold: f64,
}

impl Default for ShotOptions {
    fn default() -> Self {
        Self {
            border_width: 4.0,
            near_threshold: 10.0,
        }
    }
}

/// Builds shot rectangles for one page.
#[derive(Debug, Clone, Default)]
pub struct ShotSynthesizer {
    options: ShotOptions,
}

impl ShotSynthesizer {
    /// Create a synthesizer.
    pub fn new(options: ShotOptions) -> Self {
        Self { options }
    }

    /// Synthesize the shot rectangles of a page.
    ///
    /// `body` holds the page's body-text block boxes, `core_y` the document's
    /// vertical body-text extent and `elements` the boxes of every block and
    /// drawing on the page. The result lists column 0's shots first.
    pub fn synthesize(
        &self,
        columns: &[Range],
        body: &[Rect],
        core_y: Range,
        elements: &[Rect],
    ) -> Vec<Rect> {
        let mut per_column: Vec<Vec<Rect>> = columns
            .iter()
            .map(|c| self.column_candidates(*c, body, core_y))
            .collect();

        self.merge_columns(&mut per_column);
        self.filter(&mut per_column, elements);
        self.extend_first(&mut per_column, elements);

        per_column.into_iter().flatten().collect()
    }

    /// Gaps between the body blocks of one column, from `core_y.min` to `core_y.max`.
    ///
    /// A block belongs to the column when it lies horizontally inside it.
    /// Gaps with no height are dropped.
    pub fn column_candidates(&self, column: Range, body: &[Rect], core_y: Range) -> Vec<Rect> {
        let mut blocks: Vec<&Rect> = body
            .iter()
            .filter(|b| b.x0 >= column.min && b.x1 <= column.max)
            .collect();
        blocks.sort_by(|a, b| a.y0.total_cmp(&b.y0));

        let mut candidates = Vec::new();
        let mut last_y = core_y.min;
        for block in blocks {
            push_gap(&mut candidates, Rect::new(column.min, last_y, column.max, block.y0));
            last_y = block.y1;
        }
        push_gap(&mut candidates, Rect::new(column.min, last_y, column.max, core_y.max));
        candidates
    }

    /// Check if two rects have both top and bottom edges within the near threshold.
    pub fn is_near(&self, a: &Rect, b: &Rect) -> bool {
        (a.y0 - b.y0).abs() < self.options.near_threshold
            && (a.y1 - b.y1).abs() < self.options.near_threshold
    }

    /// Merge rects that line up across adjacent columns.
    ///
    /// Each rect of a column is matched against the following columns in
    /// order. On a match the rect widens to the matched rect's right edge and
    /// the matched rect is removed; the walk stops at the first column
    /// without a match.
    pub fn merge_columns(&self, columns: &mut [Vec<Rect>]) {
        for i in 0..columns.len() {
            for j in 0..columns[i].len() {
                for other in i + 1..columns.len() {
                    let rect = columns[i][j];
                    let Some(k) = columns[other].iter().position(|r| self.is_near(&rect, r)) else {
                        break;
                    };
                    let matched = columns[other].remove(k);
                    columns[i][j].x1 = matched.x1;
                }
            }
        }
    }

    /// Keep rects that are tall enough and hold at least one page element.
    ///
    /// A rect is supported when its inset (by the border width) intersects
    /// or touches an element box.
    pub fn filter(&self, columns: &mut [Vec<Rect>], elements: &[Rect]) {
        let border = self.options.border_width;
        for rects in columns.iter_mut() {
            rects.retain(|rect| {
                if rect.height() <= border * 2.0 {
                    return false;
                }
                let inner = rect.shrink(border);
                elements
                    .iter()
                    .any(|e| inner.intersects(e) || inner.touches(e))
            });
        }
    }

    /// Stretch each column's first rect up to the topmost page element.
    pub fn extend_first(&self, columns: &mut [Vec<Rect>], elements: &[Rect]) {
        let Some(top) = elements.iter().map(|e| e.y0).min_by(f64::total_cmp) else {
            return;
        };
        for rects in columns.iter_mut() {
            if let Some(first) = rects.first_mut() {
                first.y0 = first.y0.min(top);
            }
        }
    }
}

fn push_gap(candidates: &mut Vec<Rect>, rect: Rect) {
    if rect.height() > 0.0 {
        candidates.push(rect);
    } else {
        log::warn!(
            "Skipping shot candidate with non-positive height: ({:.1}, {:.1}, {:.1}, {:.1})",
            rect.x0,
            rect.y0,
            rect.x1,
            rect.y1
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth() -> ShotSynthesizer {
        ShotSynthesizer::default()
    }

    #[test]
    fn test_column_candidates_between_blocks() {
        let body = vec![
            Rect::new(60.0, 300.0, 290.0, 340.0),
            Rect::new(60.0, 100.0, 290.0, 150.0),
            Rect::new(60.0, 500.0, 290.0, 560.0),
            // Other column
            Rect::new(360.0, 200.0, 590.0, 260.0),
        ];
        let candidates =
            synth().column_candidates(Range::new(50.0, 300.0), &body, Range::new(40.0, 750.0));

        assert_eq!(
            candidates,
            vec![
                Rect::new(50.0, 40.0, 300.0, 100.0),
                Rect::new(50.0, 150.0, 300.0, 300.0),
                Rect::new(50.0, 340.0, 300.0, 500.0),
                Rect::new(50.0, 560.0, 300.0, 750.0),
            ]
        );
    }

    #[test]
    fn test_column_candidates_skip_empty_gaps() {
        let body = vec![
            Rect::new(60.0, 40.0, 290.0, 100.0),
            Rect::new(60.0, 90.0, 290.0, 750.0),
        ];
        let candidates =
            synth().column_candidates(Range::new(50.0, 300.0), &body, Range::new(40.0, 750.0));
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_merge_across_columns() {
        let mut columns = vec![
            vec![Rect::new(50.0, 100.0, 300.0, 200.0)],
            vec![
                Rect::new(350.0, 400.0, 600.0, 450.0),
                Rect::new(350.0, 105.0, 600.0, 195.0),
            ],
        ];
        synth().merge_columns(&mut columns);

        assert_eq!(columns[0], vec![Rect::new(50.0, 100.0, 600.0, 200.0)]);
        assert_eq!(columns[1], vec![Rect::new(350.0, 400.0, 600.0, 450.0)]);
    }

    #[test]
    fn test_merge_stops_at_first_unmatched_column() {
        let mut columns = vec![
            vec![Rect::new(0.0, 100.0, 100.0, 200.0)],
            vec![Rect::new(110.0, 500.0, 200.0, 600.0)],
            vec![Rect::new(210.0, 100.0, 300.0, 200.0)],
        ];
        synth().merge_columns(&mut columns);
        assert_eq!(columns[0][0].x1, 100.0);
        assert_eq!(columns[2].len(), 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut columns = vec![
            vec![
                Rect::new(50.0, 40.0, 300.0, 100.0),
                Rect::new(50.0, 340.0, 300.0, 500.0),
            ],
            vec![
                Rect::new(350.0, 45.0, 600.0, 95.0),
                Rect::new(350.0, 600.0, 600.0, 700.0),
            ],
        ];
        synth().merge_columns(&mut columns);
        let once = columns.clone();
        synth().merge_columns(&mut columns);
        assert_eq!(columns, once);
    }

    #[test]
    fn test_filter_requires_support_and_height() {
        let mut columns = vec![vec![
            Rect::new(50.0, 40.0, 300.0, 100.0),
            Rect::new(50.0, 150.0, 300.0, 300.0),
            Rect::new(50.0, 310.0, 300.0, 318.0),
        ]];
        let elements = vec![Rect::new(100.0, 200.0, 200.0, 250.0)];
        synth().filter(&mut columns, &elements);
        assert_eq!(columns[0], vec![Rect::new(50.0, 150.0, 300.0, 300.0)]);
    }

    #[test]
    fn test_filter_accepts_touching_element() {
        // Element ends exactly on the inset edge (40 + 4).
        let mut columns = vec![vec![Rect::new(50.0, 40.0, 300.0, 100.0)]];
        let elements = vec![Rect::new(100.0, 10.0, 200.0, 44.0)];
        synth().filter(&mut columns, &elements);
        assert_eq!(columns[0].len(), 1);
    }

    #[test]
    fn test_extend_first_to_top_element() {
        let mut columns = vec![
            vec![
                Rect::new(50.0, 40.0, 300.0, 100.0),
                Rect::new(50.0, 150.0, 300.0, 300.0),
            ],
            vec![],
        ];
        let elements = vec![
            Rect::new(60.0, 20.0, 100.0, 30.0),
            Rect::new(60.0, 200.0, 100.0, 230.0),
        ];
        synth().extend_first(&mut columns, &elements);
        assert_eq!(columns[0][0].y0, 20.0);
        assert_eq!(columns[0][1].y0, 150.0);

        synth().extend_first(&mut columns, &[]);
        assert_eq!(columns[0][0].y0, 20.0);
    }

    #[test]
    fn test_synthesize_two_columns() {
        let columns = vec![Range::new(50.0, 300.0), Range::new(350.0, 600.0)];
        let body = vec![
            Rect::new(50.0, 40.0, 300.0, 200.0),
            Rect::new(50.0, 400.0, 300.0, 750.0),
            Rect::new(350.0, 40.0, 600.0, 205.0),
            Rect::new(350.0, 395.0, 600.0, 750.0),
        ];
        // A figure spanning both columns between the text blocks.
        let figure = Rect::new(80.0, 230.0, 570.0, 370.0);
        let mut elements = body.clone();
        elements.push(figure);

        let shots =
            synth().synthesize(&columns, &body, Range::new(40.0, 750.0), &elements);
        assert_eq!(shots, vec![Rect::new(50.0, 40.0, 600.0, 400.0)]);
    }

    #[test]
    fn test_every_shot_holds_an_element() {
        let columns = vec![Range::new(50.0, 300.0)];
        let body = vec![
            Rect::new(50.0, 100.0, 300.0, 150.0),
            Rect::new(50.0, 300.0, 300.0, 340.0),
        ];
        let elements = vec![Rect::new(60.0, 160.0, 280.0, 290.0)];
        let synth = synth();
        let shots = synth.synthesize(&columns, &body, Range::new(40.0, 750.0), &elements);

        assert_eq!(shots.len(), 1);
        for shot in &shots {
            let inner = shot.shrink(4.0);
            assert!(elements
                .iter()
                .any(|e| inner.intersects(e) || inner.touches(e)));
        }
    }

    #[test]
    fn test_resynthesis_merges_nothing() {
        let columns = vec![Range::new(50.0, 300.0), Range::new(350.0, 600.0)];
        let core_y = Range::new(40.0, 750.0);
        let pages = vec![
            // One figure spanning both columns.
            (
                vec![
                    Rect::new(50.0, 40.0, 300.0, 200.0),
                    Rect::new(50.0, 400.0, 300.0, 750.0),
                    Rect::new(350.0, 40.0, 600.0, 205.0),
                    Rect::new(350.0, 395.0, 600.0, 750.0),
                ],
                vec![Rect::new(80.0, 230.0, 570.0, 370.0)],
            ),
            // One figure per column at different heights.
            (
                vec![
                    Rect::new(50.0, 40.0, 300.0, 200.0),
                    Rect::new(50.0, 400.0, 300.0, 750.0),
                    Rect::new(350.0, 40.0, 600.0, 100.0),
                    Rect::new(350.0, 600.0, 600.0, 750.0),
                ],
                vec![
                    Rect::new(60.0, 250.0, 290.0, 350.0),
                    Rect::new(360.0, 150.0, 590.0, 550.0),
                ],
            ),
        ];

        let synth = synth();
        for (body, figures) in pages {
            let mut elements = body.clone();
            elements.extend(figures);
            let shots = synth.synthesize(&columns, &body, core_y, &elements);
            assert!(!shots.is_empty());

            // Surviving shots become zero-width blocks at their left edge.
            let blocks: Vec<Rect> = shots
                .iter()
                .map(|s| Rect::new(s.x0, s.y0, s.x0, s.y1))
                .collect();
            let mut per_column: Vec<Vec<Rect>> = columns
                .iter()
                .map(|c| synth.column_candidates(*c, &blocks, core_y))
                .collect();
            let before = per_column.clone();
            synth.merge_columns(&mut per_column);
            assert_eq!(per_column, before);
        }
    }
}
