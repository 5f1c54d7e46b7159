//! Document model types.
//!
//! Input side: the decoded page geometry (blocks with their line/span/char
//! tree, drawings, images) supplied by the geometry source. Output side: the
//! reading-order elements written to `elements.json`.

mod document;
mod element;
mod geometry;
mod page;

pub use document::{toc_depth, TocEntry};
pub use element::{Child, Element};
pub use geometry::{classify, contains, intersects, merge_intervals, Range, Rect, Relation};
pub use page::{
    Block, BlockKind, Char, DocumentGeometry, Drawing, ImageInfo, Line, PageGeometry, RawBlock,
    Span,
};
