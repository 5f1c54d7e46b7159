//! The layout stages and the default pipeline that chains them.
//!
//! | stage                | scope | reads                                  | writes                                         |
//! |----------------------|-------|----------------------------------------|------------------------------------------------|
//! | `read_pages`         | page  | source                                 | `raw_blocks`, `drawings`, `images`             |
//! | `detect_columns`     | page  | `raw_blocks`                           | `big_text_width_range`, `big_text_columns`     |
//! | `select_body_blocks` | page  | `raw_blocks`, columns                  | `big_blocks`, `core_y`                         |
//! | `typography`         | page  | `raw_blocks`                           | `most_common_font`, `most_common_size`         |
//! | `merge_continuations`| page  | `big_blocks`                           | `body_blocks`                                  |
//! | `shots`              | page  | `body_blocks`, `raw_blocks`, `drawings`| `shot_rects`                                   |
//! | `toc`                | doc   | source                                 | `toc.json`                                     |
//! | `elements`           | page  | everything above                       | `elements.json`, assets, `big_blocks_id.json`  |

mod body;
mod columns;
mod combine;
mod elements;
mod read;
mod shots;
mod toc;
mod typography;

pub use body::SelectBodyBlocks;
pub use columns::DetectColumns;
pub use combine::MergeContinuations;
pub use elements::BuildElements;
pub use read::ReadPages;
pub use shots::SynthesizeShots;
pub use toc::WriteToc;
pub use typography::VoteTypography;

use crate::error::Result;
use crate::model::{Range, RawBlock};
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::schema;
use crate::source::GeometrySource;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared handle to the document being processed.
pub type SharedSource = Arc<dyn GeometrySource>;

schema! {
    /// The decoded block tree of a page.
    pub struct RawBlocksIn {
        raw_blocks: Vec<RawBlock>,
    }
}

schema! {
    /// Document-wide body-text layout.
    pub struct BodyText {
        big_text_width_range: Range,
        big_text_columns: Vec<Range>,
    }
}

schema! {
    /// Output directory of the run.
    pub struct OutputDirIn {
        dir_output: PathBuf,
    }
}

/// Build the default layout pipeline over `source`.
pub fn default_pipeline(source: SharedSource, options: &PipelineOptions) -> Result<Pipeline> {
    Pipeline::builder()
        .page_worker(ReadPages::new(source.clone()))
        .page_worker(DetectColumns::new(options.columns))
        .page_worker(SelectBodyBlocks::new(options.columns.tolerance))
        .page_worker(VoteTypography)
        .page_worker(MergeContinuations::new(options.merge))
        .page_worker(SynthesizeShots::new(options.shots))
        .worker(WriteToc::new(source.clone()))
        .page_worker(BuildElements::new(source, options.shot_dpi))
        .build()
}
