use super::RawBlocksIn;
use crate::error::{Error, Result};
use crate::layout::FontCounter;
use crate::pipeline::{Empty, PageWorker};
use crate::schema;

schema! {
    pub struct FontCountsOut {
        font_counts: FontCounter,
    }
}

schema! {
    pub struct TypographyOut {
        most_common_font: String,
        most_common_size: f64,
    }
}

/// Votes the document's dominant font and size over every text block.
pub struct VoteTypography;

impl PageWorker for VoteTypography {
    const NAME: &'static str = "typography";
    const VERSION: u32 = 1;

    type DocIn = Empty;
    type PageIn = RawBlocksIn;
    type DocOut = TypographyOut;
    type PageOut = FontCountsOut;

    fn run_page(
        &self,
        _page_index: usize,
        _doc_in: &Empty,
        page_in: &RawBlocksIn,
    ) -> Result<FontCountsOut> {
        let mut font_counts = FontCounter::new();
        for block in page_in.raw_blocks.iter().filter(|b| b.is_text()) {
            font_counts.add_block(block);
        }
        Ok(FontCountsOut { font_counts })
    }

    fn after_run_page(
        &self,
        _doc_in: &Empty,
        _page_in: &[RawBlocksIn],
        page_out: &[FontCountsOut],
    ) -> Result<TypographyOut> {
        let mut total = FontCounter::new();
        for page in page_out {
            total.merge(&page.font_counts);
        }
        let typo = total
            .dominant()
            .ok_or_else(|| Error::NoBodyTextFound("document has no text spans".into()))?;
        log::debug!("Dominant typography: {} at {}pt", typo.font, typo.size);
        Ok(TypographyOut {
            most_common_font: typo.font,
            most_common_size: typo.size,
        })
    }
}
