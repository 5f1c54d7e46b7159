use super::{BodyText, RawBlocksIn};
use crate::error::Result;
use crate::layout::{ColumnDetector, ColumnDetectorOptions};
use crate::model::Rect;
use crate::pipeline::{Empty, PageWorker};
use crate::schema;

schema! {
    pub struct WidthCandidatesOut {
        width_candidates: Vec<Rect>,
    }
}

/// Finds the body-text width class and its columns across the document.
///
/// Only text blocks with more than `min_words` words take part.
pub struct DetectColumns {
    detector: ColumnDetector,
}

impl DetectColumns {
    /// Create the stage.
    pub fn new(options: ColumnDetectorOptions) -> Self {
        Self {
            detector: ColumnDetector::new(options),
        }
    }
}

impl PageWorker for DetectColumns {
    const NAME: &'static str = "detect_columns";
    const VERSION: u32 = 1;

    type DocIn = Empty;
    type PageIn = RawBlocksIn;
    type DocOut = BodyText;
    type PageOut = WidthCandidatesOut;

    fn settings(&self) -> String {
        serde_json::to_string(self.detector.options()).unwrap_or_default()
    }

    fn run_page(
        &self,
        _page_index: usize,
        _doc_in: &Empty,
        page_in: &RawBlocksIn,
    ) -> Result<WidthCandidatesOut> {
        let min_words = self.detector.options().min_words;
        let width_candidates = page_in
            .raw_blocks
            .iter()
            .filter(|b| b.is_text() && b.word_count() > min_words)
            .map(|b| b.bbox)
            .collect();
        Ok(WidthCandidatesOut { width_candidates })
    }

    fn after_run_page(
        &self,
        _doc_in: &Empty,
        _page_in: &[RawBlocksIn],
        page_out: &[WidthCandidatesOut],
    ) -> Result<BodyText> {
        let candidates: Vec<Rect> = page_out
            .iter()
            .flat_map(|p| p.width_candidates.iter().copied())
            .collect();
        let layout = self.detector.detect(&candidates)?;
        log::info!(
            "Detected {} column(s), body text share {:.1}%",
            layout.columns.len(),
            layout.body_share * 100.0
        );
        Ok(BodyText {
            big_text_width_range: layout.width_range,
            big_text_columns: layout.columns,
        })
    }
}
