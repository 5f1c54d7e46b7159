use super::{BodyText, RawBlocksIn};
use crate::error::{Error, Result};
use crate::layout::is_big_block;
use crate::model::{Range, RawBlock};
use crate::pipeline::PageWorker;
use crate::schema;

schema! {
    pub struct BigBlocksOut {
        big_blocks: Vec<RawBlock>,
    }
}

schema! {
    pub struct CoreYOut {
        core_y: Range,
    }
}

/// Selects the body-text blocks of every page and the document's
/// vertical body-text extent.
pub struct SelectBodyBlocks {
    tolerance: f64,
}

impl SelectBodyBlocks {
    /// Create the stage with the relative matching tolerance.
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl PageWorker for SelectBodyBlocks {
    const NAME: &'static str = "select_body_blocks";
    const VERSION: u32 = 1;

    type DocIn = BodyText;
    type PageIn = RawBlocksIn;
    type DocOut = CoreYOut;
    type PageOut = BigBlocksOut;

    fn settings(&self) -> String {
        self.tolerance.to_string()
    }

    fn run_page(
        &self,
        _page_index: usize,
        doc_in: &BodyText,
        page_in: &RawBlocksIn,
    ) -> Result<BigBlocksOut> {
        let big_blocks = page_in
            .raw_blocks
            .iter()
            .filter(|b| {
                b.is_text()
                    && is_big_block(
                        &b.bbox,
                        doc_in.big_text_width_range,
                        &doc_in.big_text_columns,
                        self.tolerance,
                    )
            })
            .cloned()
            .collect();
        Ok(BigBlocksOut { big_blocks })
    }

    fn after_run_page(
        &self,
        _doc_in: &BodyText,
        _page_in: &[RawBlocksIn],
        page_out: &[BigBlocksOut],
    ) -> Result<CoreYOut> {
        let blocks = || page_out.iter().flat_map(|p| &p.big_blocks);
        let top = Range::spanning(blocks().map(|b| b.bbox.y0));
        let bottom = Range::spanning(blocks().map(|b| b.bbox.y1));
        match (top, bottom) {
            (Some(top), Some(bottom)) => Ok(CoreYOut {
                core_y: Range::new(top.min, bottom.max),
            }),
            _ => Err(Error::NoBodyTextFound(
                "no block matches the body-text layout".into(),
            )),
        }
    }
}
