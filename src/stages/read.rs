use super::SharedSource;
use crate::error::Result;
use crate::model::{Drawing, ImageInfo, RawBlock};
use crate::pipeline::{Empty, PageWorker};
use crate::schema;

schema! {
    pub struct ReadDocIn {
        page_count: usize,
    }
}

schema! {
    pub struct PageGeometryOut {
        raw_blocks: Vec<RawBlock>,
        drawings: Vec<Drawing>,
        images: Vec<ImageInfo>,
    }
}

/// Loads every page's geometry from the source into the store, with
/// swapped box edges put right.
///
/// Never cached: downstream stages key their cache entries on the page
/// data this stage reads fresh on every run.
pub struct ReadPages {
    source: SharedSource,
}

impl ReadPages {
    /// Create the stage.
    pub fn new(source: SharedSource) -> Self {
        Self { source }
    }
}

impl PageWorker for ReadPages {
    const NAME: &'static str = "read_pages";
    const VERSION: u32 = 1;

    type DocIn = ReadDocIn;
    type PageIn = Empty;
    type DocOut = Empty;
    type PageOut = PageGeometryOut;

    fn cache_enabled(&self) -> bool {
        false
    }

    fn run_page(
        &self,
        page_index: usize,
        _doc_in: &ReadDocIn,
        _page_in: &Empty,
    ) -> Result<PageGeometryOut> {
        let mut page = self.source.page(page_index)?;
        let fixed = page.normalize();
        if fixed > 0 {
            log::warn!("Page {}: normalized {} inverted box(es)", page_index, fixed);
        }
        Ok(PageGeometryOut {
            raw_blocks: page.blocks,
            drawings: page.drawings,
            images: page.images,
        })
    }

    fn after_run_page(
        &self,
        doc_in: &ReadDocIn,
        _page_in: &[Empty],
        page_out: &[PageGeometryOut],
    ) -> Result<Empty> {
        let blocks: usize = page_out.iter().map(|p| p.raw_blocks.len()).sum();
        log::debug!("Read {} blocks from {} pages", blocks, doc_in.page_count);
        Ok(Empty {})
    }
}
