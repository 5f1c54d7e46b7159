use crate::error::Result;
use crate::layout::{ShotOptions, ShotSynthesizer};
use crate::model::{Drawing, Range, RawBlock, Rect};
use crate::pipeline::{Empty, PageWorker};
use crate::schema;

schema! {
    pub struct ShotDocIn {
        big_text_columns: Vec<Range>,
        core_y: Range,
    }
}

schema! {
    pub struct ShotPageIn {
        body_blocks: Vec<RawBlock>,
        raw_blocks: Vec<RawBlock>,
        drawings: Vec<Drawing>,
    }
}

schema! {
    pub struct ShotRectsOut {
        shot_rects: Vec<Rect>,
    }
}

/// Synthesizes the shot regions of every page.
pub struct SynthesizeShots {
    synthesizer: ShotSynthesizer,
    options: ShotOptions,
}

impl SynthesizeShots {
    /// Create the stage.
    pub fn new(options: ShotOptions) -> Self {
        Self {
            synthesizer: ShotSynthesizer::new(options),
            options,
        }
    }
}

impl PageWorker for SynthesizeShots {
    const NAME: &'static str = "shots";
    const VERSION: u32 = 1;

    type DocIn = ShotDocIn;
    type PageIn = ShotPageIn;
    type DocOut = Empty;
    type PageOut = ShotRectsOut;

    fn settings(&self) -> String {
        serde_json::to_string(&self.options).unwrap_or_default()
    }

    fn run_page(
        &self,
        _page_index: usize,
        doc_in: &ShotDocIn,
        page_in: &ShotPageIn,
    ) -> Result<ShotRectsOut> {
        let body: Vec<Rect> = page_in.body_blocks.iter().map(|b| b.bbox).collect();
        let elements: Vec<Rect> = page_in
            .raw_blocks
            .iter()
            .map(|b| b.bbox)
            .chain(page_in.drawings.iter().map(|d| d.rect))
            .collect();

        let shot_rects =
            self.synthesizer
                .synthesize(&doc_in.big_text_columns, &body, doc_in.core_y, &elements);
        Ok(ShotRectsOut { shot_rects })
    }

    fn after_run_page(
        &self,
        _doc_in: &ShotDocIn,
        _page_in: &[ShotPageIn],
        page_out: &[ShotRectsOut],
    ) -> Result<Empty> {
        let total: usize = page_out.iter().map(|p| p.shot_rects.len()).sum();
        log::debug!("Synthesized {} shot region(s)", total);
        Ok(Empty {})
    }
}
