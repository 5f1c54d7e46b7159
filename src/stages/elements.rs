use super::SharedSource;
use crate::error::Result;
use crate::layout::Typography;
use crate::model::{Child, Element, Range, RawBlock, Rect, Span};
use crate::pipeline::PageWorker;
use crate::schema;
use std::fs;
use std::path::{Path, PathBuf};

schema! {
    pub struct ElementsDocIn {
        dir_output: PathBuf,
        big_text_columns: Vec<Range>,
        most_common_font: String,
        most_common_size: f64,
    }
}

schema! {
    pub struct ElementsPageIn {
        body_blocks: Vec<RawBlock>,
        big_blocks: Vec<RawBlock>,
        shot_rects: Vec<Rect>,
    }
}

schema! {
    pub struct ElementsOut {
        elements: Vec<Element>,
    }
}

schema! {
    pub struct ElementCountOut {
        element_count: usize,
    }
}

/// Builds the reading-order element list and writes the document outputs:
/// `output/elements.json`, `output/assets/` and `big_blocks_id.json`.
pub struct BuildElements {
    source: SharedSource,
    dpi: u32,
}

impl BuildElements {
    /// Create the stage; shot assets are rendered at `dpi`.
    pub fn new(source: SharedSource, dpi: u32) -> Self {
        Self { source, dpi }
    }

    fn write_shot(
        &self,
        page: usize,
        counter: &mut usize,
        clip: Rect,
        assets: &Path,
    ) -> Result<(String, bool)> {
        let name = format!("page_{}_shot_{}.png", page, counter);
        *counter += 1;

        let written = match self.source.rasterize(page, self.dpi, clip)? {
            Some(png) => {
                fs::write(assets.join(&name), png)?;
                true
            }
            None => false,
        };
        Ok((format!("./assets/{}", name), written))
    }
}

impl PageWorker for BuildElements {
    const NAME: &'static str = "elements";
    const VERSION: u32 = 1;

    type DocIn = ElementsDocIn;
    type PageIn = ElementsPageIn;
    type DocOut = ElementCountOut;
    type PageOut = ElementsOut;

    fn cache_enabled(&self) -> bool {
        false
    }

    fn run_page(
        &self,
        page_index: usize,
        doc_in: &ElementsDocIn,
        page_in: &ElementsPageIn,
    ) -> Result<ElementsOut> {
        let assets = doc_in.dir_output.join("output").join("assets");
        fs::create_dir_all(&assets)?;

        let typography = Typography {
            font: doc_in.most_common_font.clone(),
            size: doc_in.most_common_size,
        };
        let in_column = |r: &Rect, c: &Range| r.x0 >= c.min && r.x1 <= c.max;

        let mut counter = 0;
        let mut missing = 0;
        let mut elements = Vec::new();
        for (index, column) in doc_in.big_text_columns.iter().enumerate() {
            let mut column_elements: Vec<(f64, Element)> = Vec::new();

            for block in page_in.body_blocks.iter().filter(|b| in_column(&b.bbox, column)) {
                let mut childs = Vec::new();
                for line in &block.lines {
                    for (is_text, run) in span_runs(&line.spans, |s| typography.matches(s)) {
                        if is_text {
                            childs.push(Child::Text {
                                text: run.iter().map(Span::text).collect(),
                            });
                        } else {
                            let (path, written) =
                                self.write_shot(page_index, &mut counter, run_box(run), &assets)?;
                            missing += usize::from(!written);
                            childs.push(Child::Shot { path });
                        }
                    }
                }
                column_elements.push((block.bbox.y0, Element::Block { childs }));
            }

            let shots = page_in
                .shot_rects
                .iter()
                .filter(|r| shot_column(r, &doc_in.big_text_columns) == Some(index));
            for rect in shots {
                let (path, written) = self.write_shot(page_index, &mut counter, *rect, &assets)?;
                missing += usize::from(!written);
                column_elements.push((rect.y0, Element::Shot { path }));
            }

            column_elements.sort_by(|a, b| a.0.total_cmp(&b.0));
            elements.extend(column_elements.into_iter().map(|(_, e)| e));
        }

        if missing > 0 {
            log::warn!(
                "Page {}: source cannot rasterize, {} shot asset(s) not written",
                page_index,
                missing
            );
        }
        Ok(ElementsOut { elements })
    }

    fn after_run_page(
        &self,
        doc_in: &ElementsDocIn,
        page_in: &[ElementsPageIn],
        page_out: &[ElementsOut],
    ) -> Result<ElementCountOut> {
        let elements: Vec<&Element> = page_out.iter().flat_map(|p| &p.elements).collect();
        let output = doc_in.dir_output.join("output");
        fs::create_dir_all(&output)?;
        fs::write(
            output.join("elements.json"),
            serde_json::to_string_pretty(&elements)?,
        )?;

        let body_index: Vec<Vec<usize>> = page_in
            .iter()
            .map(|p| p.big_blocks.iter().map(|b| b.number).collect())
            .collect();
        fs::write(
            doc_in.dir_output.join("big_blocks_id.json"),
            serde_json::to_string(&body_index)?,
        )?;

        log::info!("Wrote {} elements", elements.len());
        Ok(ElementCountOut {
            element_count: elements.len(),
        })
    }
}

/// Column owning a shot: the first one holding its left edge.
///
/// Shots merged across columns extend past their own column, so only `x0`
/// is tested.
fn shot_column(rect: &Rect, columns: &[Range]) -> Option<usize> {
    columns.iter().position(|c| c.contains(rect.x0))
}

/// Split spans into maximal runs of equal kind (`true` = body text).
fn span_runs(spans: &[Span], is_text: impl Fn(&Span) -> bool) -> Vec<(bool, &[Span])> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=spans.len() {
        if i == spans.len() || is_text(&spans[i]) != is_text(&spans[start]) {
            runs.push((is_text(&spans[start]), &spans[start..i]));
            start = i;
        }
    }
    runs
}

/// Crop box of an inline run: first span's left edge to last span's right
/// edge, spanning every span vertically.
fn run_box(run: &[Span]) -> Rect {
    let y0 = run.iter().map(|s| s.bbox.y0).fold(f64::INFINITY, f64::min);
    let y1 = run.iter().map(|s| s.bbox.y1).fold(f64::NEG_INFINITY, f64::max);
    let x0 = run.first().map_or(0.0, |s| s.bbox.x0);
    let x1 = run.last().map_or(0.0, |s| s.bbox.x1);
    Rect::new(x0, y0, x1, y1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockKind, Char, DocumentGeometry, Line};
    use crate::pipeline::Schema;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn span(text: &str, font: &str, size: f64, bbox: [f64; 4]) -> Span {
        Span {
            font: font.into(),
            size,
            bbox: bbox.into(),
            origin: [bbox[0], bbox[3]],
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
        }
    }

    #[test]
    fn test_span_runs() {
        let spans = vec![
            span("a", "T", 10.0, [0.0, 0.0, 1.0, 1.0]),
            span("b", "T", 10.0, [1.0, 0.0, 2.0, 1.0]),
            span("x", "M", 10.0, [2.0, 0.0, 3.0, 1.0]),
            span("c", "T", 10.0, [3.0, 0.0, 4.0, 1.0]),
        ];
        let runs = span_runs(&spans, |s| s.font == "T");
        let shape: Vec<(bool, usize)> = runs.iter().map(|(t, r)| (*t, r.len())).collect();
        assert_eq!(shape, vec![(true, 2), (false, 1), (true, 1)]);
        assert!(span_runs(&[], |_| true).is_empty());
    }

    #[test]
    fn test_run_box() {
        let run = vec![
            span("x", "M", 8.0, [10.0, 5.0, 20.0, 15.0]),
            span("y", "M", 8.0, [20.0, 3.0, 30.0, 14.0]),
        ];
        assert_eq!(run_box(&run), Rect::new(10.0, 3.0, 30.0, 15.0));
    }

    #[test]
    fn test_page_elements_in_column_order() {
        let dir = TempDir::new().unwrap();
        let stage = BuildElements::new(Arc::new(DocumentGeometry::default()), 288);

        let block = |number: usize, y0: f64, spans: Vec<Span>| RawBlock {
            number,
            kind: BlockKind::Text,
            bbox: Rect::new(60.0, y0, 290.0, y0 + 20.0),
            lines: vec![Line {
                bbox: Rect::new(60.0, y0, 290.0, y0 + 20.0),
                spans,
            }],
        };
        let doc_in = ElementsDocIn {
            dir_output: dir.path().to_path_buf(),
            big_text_columns: vec![Range::new(50.0, 300.0), Range::new(350.0, 600.0)],
            most_common_font: "Times".into(),
            most_common_size: 10.0,
        };
        let body_blocks = vec![
            block(0, 300.0, vec![span("late", "Times", 10.0, [60.0, 300.0, 100.0, 310.0])]),
            block(
                1,
                100.0,
                vec![
                    span("E = ", "Times", 10.0, [60.0, 100.0, 80.0, 110.0]),
                    span("mc2", "Math", 10.0, [80.0, 98.0, 100.0, 112.0]),
                ],
            ),
        ];
        let page_in = ElementsPageIn {
            big_blocks: body_blocks.clone(),
            body_blocks,
            shot_rects: vec![
                Rect::new(50.0, 150.0, 300.0, 250.0),
                Rect::new(350.0, 40.0, 600.0, 90.0),
            ],
        };

        let out = stage.run_page(0, &doc_in, &page_in).unwrap();
        let expected = vec![
            Element::Block {
                childs: vec![
                    Child::Text { text: "E = ".into() },
                    Child::Shot {
                        path: "./assets/page_0_shot_0.png".into(),
                    },
                ],
            },
            Element::Shot {
                path: "./assets/page_0_shot_1.png".into(),
            },
            Element::Block {
                childs: vec![Child::Text { text: "late".into() }],
            },
            Element::Shot {
                path: "./assets/page_0_shot_2.png".into(),
            },
        ];
        assert_eq!(out.elements, expected);

        let doc_out = stage
            .after_run_page(&doc_in, &[page_in], &[out])
            .unwrap();
        assert_eq!(doc_out.element_count, 4);
        assert!(dir.path().join("output/elements.json").exists());
        let index = fs::read_to_string(dir.path().join("big_blocks_id.json")).unwrap();
        assert_eq!(index, "[[0,1]]");
        assert_eq!(ElementCountOut::fields()[0].name, "element_count");
    }

    #[test]
    fn test_shot_spanning_columns_is_kept() {
        let dir = TempDir::new().unwrap();
        let stage = BuildElements::new(Arc::new(DocumentGeometry::default()), 288);
        let columns = vec![Range::new(50.0, 300.0), Range::new(350.0, 600.0)];

        let body = vec![
            Rect::new(50.0, 40.0, 300.0, 200.0),
            Rect::new(50.0, 400.0, 300.0, 750.0),
            Rect::new(350.0, 40.0, 600.0, 205.0),
            Rect::new(350.0, 395.0, 600.0, 750.0),
        ];
        let mut elements = body.clone();
        elements.push(Rect::new(80.0, 230.0, 570.0, 370.0));
        let shot_rects = crate::layout::ShotSynthesizer::default().synthesize(
            &columns,
            &body,
            Range::new(40.0, 750.0),
            &elements,
        );
        assert_eq!(shot_rects, vec![Rect::new(50.0, 40.0, 600.0, 400.0)]);

        let doc_in = ElementsDocIn {
            dir_output: dir.path().to_path_buf(),
            big_text_columns: columns,
            most_common_font: "Times".into(),
            most_common_size: 10.0,
        };
        let page_in = ElementsPageIn {
            body_blocks: Vec::new(),
            big_blocks: Vec::new(),
            shot_rects,
        };
        let out = stage.run_page(0, &doc_in, &page_in).unwrap();
        assert_eq!(
            out.elements,
            vec![Element::Shot {
                path: "./assets/page_0_shot_0.png".into(),
            }]
        );
    }

    #[test]
    fn test_shot_column() {
        let columns = vec![Range::new(50.0, 300.0), Range::new(350.0, 600.0)];
        assert_eq!(shot_column(&Rect::new(50.0, 0.0, 600.0, 10.0), &columns), Some(0));
        assert_eq!(shot_column(&Rect::new(350.0, 0.0, 600.0, 10.0), &columns), Some(1));
        assert_eq!(shot_column(&Rect::new(320.0, 0.0, 340.0, 10.0), &columns), None);
    }
}
