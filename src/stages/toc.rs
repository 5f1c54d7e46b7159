use super::{OutputDirIn, SharedSource};
use crate::error::Result;
use crate::model::{toc_depth, TocEntry};
use crate::pipeline::{Empty, Worker};
use crate::schema;
use std::fs;

schema! {
    pub struct TocOut {
        toc: Vec<TocEntry>,
    }
}

/// Writes the table of contents to `<out>/toc.json`.
pub struct WriteToc {
    source: SharedSource,
}

impl WriteToc {
    /// Create the stage.
    pub fn new(source: SharedSource) -> Self {
        Self { source }
    }
}

impl Worker for WriteToc {
    const NAME: &'static str = "toc";
    const VERSION: u32 = 1;

    type DocIn = OutputDirIn;
    type PageIn = Empty;
    type DocOut = TocOut;
    type PageOut = Empty;

    fn cache_enabled(&self) -> bool {
        false
    }

    fn run(&self, doc_in: &OutputDirIn, _page_in: &[Empty]) -> Result<(TocOut, Vec<Empty>)> {
        let toc = self.source.toc()?;
        fs::create_dir_all(&doc_in.dir_output)?;
        fs::write(
            doc_in.dir_output.join("toc.json"),
            serde_json::to_string_pretty(&toc)?,
        )?;
        log::debug!("Wrote {} TOC entries (depth {})", toc.len(), toc_depth(&toc));
        Ok((TocOut { toc }, Vec::new()))
    }
}
