//! Page-level geometry types supplied by the decoding collaborator.

use super::{Rect, TocEntry};
use serde::{Deserialize, Serialize};

/// Semantic type of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// A block of text lines
    #[default]
    Text,
    /// A raster image block
    Image,
}

/// A single glyph with its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Char {
    /// The character
    pub c: char,
    /// Glyph box
    pub bbox: Rect,
    /// Baseline origin
    #[serde(default)]
    pub origin: [f64; 2],
}

/// A run of glyphs sharing one font and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Font name (e.g., "Times-Roman")
    pub font: String,
    /// Font size in points
    pub size: f64,
    /// Span box
    pub bbox: Rect,
    /// Baseline origin of the first glyph
    #[serde(default)]
    pub origin: [f64; 2],
    /// Font ascender (relative to size)
    #[serde(default)]
    pub ascender: f64,
    /// Font descender (relative to size, usually negative)
    #[serde(default)]
    pub descender: f64,
    /// Glyphs in reading order
    #[serde(default)]
    pub chars: Vec<Char>,
}

impl Span {
    /// Text of the span.
    pub fn text(&self) -> String {
        self.chars.iter().map(|c| c.c).collect()
    }

    /// Number of characters, the unit the typography vote counts in.
    pub fn char_count(&self) -> usize {
        self.chars.len()
    }
}

/// A text line composed of spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Line box
    pub bbox: Rect,
    /// Spans in reading order
    #[serde(default)]
    pub spans: Vec<Span>,
}

impl Line {
    /// Text of the line.
    pub fn text(&self) -> String {
        self.spans.iter().map(Span::text).collect()
    }
}

/// A block as delivered by the geometry source, with its full line/span tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    /// Block number within the page
    pub number: usize,
    /// Block type
    #[serde(rename = "type", default)]
    pub kind: BlockKind,
    /// Block box
    pub bbox: Rect,
    /// Lines (empty for image blocks)
    #[serde(default)]
    pub lines: Vec<Line>,
}

impl RawBlock {
    /// Check if this is a text block.
    pub fn is_text(&self) -> bool {
        self.kind == BlockKind::Text
    }

    /// Text of the block, one line per `\n`.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(Line::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of whitespace-separated words.
    pub fn word_count(&self) -> usize {
        self.text().split_whitespace().count()
    }

    /// Flatten into a [`Block`].
    pub fn to_block(&self) -> Block {
        Block {
            number: self.number,
            kind: self.kind,
            bbox: self.bbox,
            text: self.text(),
        }
    }
}

/// A flat text run: box, raw line text, index and type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Block number within the page
    pub number: usize,
    /// Block type
    #[serde(rename = "type", default)]
    pub kind: BlockKind,
    /// Block box
    pub bbox: Rect,
    /// Line text, lines separated by `\n`
    pub text: String,
}

impl Block {
    /// Create a text block.
    pub fn new_text(number: usize, bbox: Rect, text: impl Into<String>) -> Self {
        Self {
            number,
            kind: BlockKind::Text,
            bbox,
            text: text.into(),
        }
    }

    /// Width of the block box.
    pub fn width(&self) -> f64 {
        self.bbox.width()
    }
}

impl From<&RawBlock> for Block {
    fn from(raw: &RawBlock) -> Self {
        raw.to_block()
    }
}

/// A vector drawing path.
///
/// Only `rect` takes part in layout analysis; the style attributes and draw
/// commands are carried through untouched for re-rendering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Drawing {
    /// Bounding box of the path
    pub rect: Rect,
    /// Fill colour (RGB, 0..1)
    #[serde(default)]
    pub fill: Option<[f64; 3]>,
    /// Stroke colour (RGB, 0..1)
    #[serde(default)]
    pub color: Option<[f64; 3]>,
    /// Stroke width
    #[serde(default)]
    pub width: Option<f64>,
    /// Dash pattern
    #[serde(default)]
    pub dashes: Option<String>,
    /// Whether the path is closed
    #[serde(default)]
    pub close_path: bool,
    /// Line join style
    #[serde(default)]
    pub line_join: Option<f64>,
    /// Line cap styles
    #[serde(default)]
    pub line_cap: Vec<f64>,
    /// Stroke opacity
    #[serde(default)]
    pub stroke_opacity: Option<f64>,
    /// Fill opacity
    #[serde(default)]
    pub fill_opacity: Option<f64>,
    /// Draw commands, opaque
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

impl Drawing {
    /// Create a drawing with only a bounding box.
    pub fn with_rect(rect: Rect) -> Self {
        Self {
            rect,
            ..Default::default()
        }
    }
}

/// A raster image region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Image number within the page
    #[serde(default)]
    pub number: usize,
    /// Placement box
    pub bbox: Rect,
}

/// Everything the decoder reports about one page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Page width in points
    #[serde(default)]
    pub width: f64,
    /// Page height in points
    #[serde(default)]
    pub height: f64,
    /// Block tree (text and image blocks)
    #[serde(default)]
    pub blocks: Vec<RawBlock>,
    /// Vector drawings
    #[serde(default)]
    pub drawings: Vec<Drawing>,
    /// Raster image regions
    #[serde(default)]
    pub images: Vec<ImageInfo>,
}

impl PageGeometry {
    /// Text blocks only.
    pub fn text_blocks(&self) -> impl Iterator<Item = &RawBlock> {
        self.blocks.iter().filter(|b| b.is_text())
    }

    /// Fix swapped box edges throughout the page.
    ///
    /// Returns how many boxes were inverted.
    pub fn normalize(&mut self) -> usize {
        let mut fixed = 0;
        let mut fix = |rect: &mut Rect| {
            if rect.is_inverted() {
                *rect = rect.normalized();
                fixed += 1;
            }
        };
        for block in &mut self.blocks {
            fix(&mut block.bbox);
            for line in &mut block.lines {
                fix(&mut line.bbox);
                for span in &mut line.spans {
                    fix(&mut span.bbox);
                    for c in &mut span.chars {
                        fix(&mut c.bbox);
                    }
                }
            }
        }
        for drawing in &mut self.drawings {
            fix(&mut drawing.rect);
        }
        for image in &mut self.images {
            fix(&mut image.bbox);
        }
        fixed
    }

    /// Boxes of every page element: all blocks plus all drawings.
    pub fn element_rects(&self) -> Vec<Rect> {
        self.blocks
            .iter()
            .map(|b| b.bbox)
            .chain(self.drawings.iter().map(|d| d.rect))
            .collect()
    }
}

/// A whole decoded document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentGeometry {
    /// Pages in order
    pub pages: Vec<PageGeometry>,
    /// Table of contents
    #[serde(default)]
    pub toc: Vec<TocEntry>,
}
