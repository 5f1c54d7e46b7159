use crate::error::Result;
use crate::layout::{merge_continuations, MergeOptions};
use crate::model::RawBlock;
use crate::pipeline::{Empty, PageWorker};
use crate::schema;

schema! {
    pub struct BigBlocksIn {
        big_blocks: Vec<RawBlock>,
    }
}

schema! {
    pub struct BodyBlocksOut {
        body_blocks: Vec<RawBlock>,
    }
}

/// Folds orphaned first lines into the body block below them.
pub struct MergeContinuations {
    options: MergeOptions,
}

impl MergeContinuations {
    /// Create the stage.
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }
}

impl PageWorker for MergeContinuations {
    const NAME: &'static str = "merge_continuations";
    const VERSION: u32 = 1;

    type DocIn = Empty;
    type PageIn = BigBlocksIn;
    type DocOut = Empty;
    type PageOut = BodyBlocksOut;

    fn settings(&self) -> String {
        self.options.line_distance_threshold.to_string()
    }

    fn run_page(
        &self,
        page_index: usize,
        _doc_in: &Empty,
        page_in: &BigBlocksIn,
    ) -> Result<BodyBlocksOut> {
        let mut body_blocks = page_in.big_blocks.clone();
        let merged = merge_continuations(&mut body_blocks, &self.options);
        if merged > 0 {
            log::debug!("Page {}: merged {} continuation line(s)", page_index, merged);
        }
        Ok(BodyBlocksOut { body_blocks })
    }

    fn after_run_page(
        &self,
        _doc_in: &Empty,
        _page_in: &[BigBlocksIn],
        _page_out: &[BodyBlocksOut],
    ) -> Result<Empty> {
        Ok(Empty {})
    }
}
