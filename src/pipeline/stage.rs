//! Stage traits.
//!
//! A stage is written as either a [`Worker`] (one call for the whole
//! document) or a [`PageWorker`] (one call per page, fanned out in parallel,
//! then one aggregation call). Both are wrapped into the object-safe
//! [`Stage`] trait the executer drives.

use super::cache::{CacheKey, StageCache};
use super::schema::{FieldSpec, Schema};
use super::store::ParamsStore;
use crate::error::{Error, Result};
use rayon::prelude::*;

/// A stage that processes the whole document in one call.
pub trait Worker: Send + Sync {
    /// Stage name, unique within a pipeline.
    const NAME: &'static str;
    /// Bumped whenever the stage's output for a given input changes.
    const VERSION: u32;

    /// Document-scope inputs.
    type DocIn: Schema;
    /// Page-scope inputs.
    type PageIn: Schema;
    /// Document-scope outputs.
    type DocOut: Schema;
    /// Page-scope outputs.
    type PageOut: Schema;

    /// Whether results may be served from the stage cache.
    fn cache_enabled(&self) -> bool {
        true
    }

    /// Settings that change the output, folded into the cache signature.
    fn settings(&self) -> String {
        String::new()
    }

    /// Run the stage.
    ///
    /// The page output must hold one record per page, or be empty when
    /// `PageOut` has no fields.
    fn run(
        &self,
        doc_in: &Self::DocIn,
        page_in: &[Self::PageIn],
    ) -> Result<(Self::DocOut, Vec<Self::PageOut>)>;
}

/// A stage that processes pages independently, then aggregates.
pub trait PageWorker: Send + Sync {
    /// Stage name, unique within a pipeline.
    const NAME: &'static str;
    /// Bumped whenever the stage's output for a given input changes.
    const VERSION: u32;

    /// Document-scope inputs.
    type DocIn: Schema;
    /// Page-scope inputs.
    type PageIn: Schema;
    /// Document-scope outputs.
    type DocOut: Schema;
    /// Page-scope outputs.
    type PageOut: Schema;

    /// Whether results may be served from the stage cache.
    fn cache_enabled(&self) -> bool {
        true
    }

    /// Settings that change the output, folded into the cache signature.
    fn settings(&self) -> String {
        String::new()
    }

    /// Process one page. Called concurrently for different pages.
    fn run_page(
        &self,
        page_index: usize,
        doc_in: &Self::DocIn,
        page_in: &Self::PageIn,
    ) -> Result<Self::PageOut>;

    /// Aggregate once every page has finished.
    fn after_run_page(
        &self,
        doc_in: &Self::DocIn,
        page_in: &[Self::PageIn],
        page_out: &[Self::PageOut],
    ) -> Result<Self::DocOut>;
}

/// Everything a stage needs from the executer besides the store.
pub struct StageContext<'a> {
    /// Pool running page tasks
    pub pool: &'a rayon::ThreadPool,
    /// Stage cache, if enabled for this run
    pub cache: Option<&'a StageCache>,
    /// Document identity used in cache keys
    pub doc_id: &'a str,
}

/// Object-safe view of a stage.
pub trait Stage: Send + Sync {
    /// Stage name.
    fn name(&self) -> &'static str;

    /// Stage version.
    fn version(&self) -> u32;

    /// Whether results may be served from the stage cache.
    fn cache_enabled(&self) -> bool;

    /// Document-scope inputs.
    fn doc_inputs(&self) -> Vec<FieldSpec>;

    /// Page-scope inputs.
    fn page_inputs(&self) -> Vec<FieldSpec>;

    /// Document-scope outputs.
    fn doc_outputs(&self) -> Vec<FieldSpec>;

    /// Page-scope outputs.
    fn page_outputs(&self) -> Vec<FieldSpec>;

    /// Load inputs, run (or hit the cache) and write outputs.
    ///
    /// Returns whether the result came from the cache.
    fn execute(&self, store: &mut ParamsStore, ctx: &StageContext<'_>) -> Result<bool>;
}

/// [`Stage`] adapter for a [`Worker`].
pub struct WorkerStage<W>(pub W);

/// [`Stage`] adapter for a [`PageWorker`].
pub struct PageWorkerStage<W>(pub W);

impl<W: Worker> Stage for WorkerStage<W> {
    fn name(&self) -> &'static str {
        W::NAME
    }

    fn version(&self) -> u32 {
        W::VERSION
    }

    fn cache_enabled(&self) -> bool {
        self.0.cache_enabled()
    }

    fn doc_inputs(&self) -> Vec<FieldSpec> {
        W::DocIn::fields()
    }

    fn page_inputs(&self) -> Vec<FieldSpec> {
        W::PageIn::fields()
    }

    fn doc_outputs(&self) -> Vec<FieldSpec> {
        W::DocOut::fields()
    }

    fn page_outputs(&self) -> Vec<FieldSpec> {
        W::PageOut::fields()
    }

    fn execute(&self, store: &mut ParamsStore, ctx: &StageContext<'_>) -> Result<bool> {
        let signature = signature(W::VERSION, &self.0.settings());
        run_cached(
            W::NAME,
            signature,
            self.0.cache_enabled(),
            store,
            ctx,
            |doc_in: &W::DocIn, page_in: &[W::PageIn]| self.0.run(doc_in, page_in),
        )
    }
}

impl<W: PageWorker> Stage for PageWorkerStage<W> {
    fn name(&self) -> &'static str {
        W::NAME
    }

    fn version(&self) -> u32 {
        W::VERSION
    }

    fn cache_enabled(&self) -> bool {
        self.0.cache_enabled()
    }

    fn doc_inputs(&self) -> Vec<FieldSpec> {
        W::DocIn::fields()
    }

    fn page_inputs(&self) -> Vec<FieldSpec> {
        W::PageIn::fields()
    }

    fn doc_outputs(&self) -> Vec<FieldSpec> {
        W::DocOut::fields()
    }

    fn page_outputs(&self) -> Vec<FieldSpec> {
        W::PageOut::fields()
    }

    fn execute(&self, store: &mut ParamsStore, ctx: &StageContext<'_>) -> Result<bool> {
        let signature = signature(W::VERSION, &self.0.settings());
        let worker = &self.0;
        run_cached(
            W::NAME,
            signature,
            worker.cache_enabled(),
            store,
            ctx,
            |doc_in: &W::DocIn, page_in: &[W::PageIn]| {
                // Collected in page order regardless of completion order.
                let page_out = ctx.pool.install(|| {
                    page_in
                        .par_iter()
                        .enumerate()
                        .map(|(i, input)| {
                            worker
                                .run_page(i, doc_in, input)
                                .map_err(|e| Error::PageTask {
                                    stage: W::NAME.to_string(),
                                    page: i,
                                    source: Box::new(e),
                                })
                        })
                        .collect::<Result<Vec<_>>>()
                })?;
                let doc_out = worker.after_run_page(doc_in, page_in, &page_out)?;
                Ok((doc_out, page_out))
            },
        )
    }
}

fn signature(version: u32, settings: &str) -> String {
    if settings.is_empty() {
        version.to_string()
    } else {
        format!("{}:{}", version, settings)
    }
}

/// Load a stage's inputs, produce its outputs from the cache or by running
/// it, and write them back to the store.
fn run_cached<DI, PI, DO, PO, F>(
    name: &'static str,
    signature: String,
    cache_enabled: bool,
    store: &mut ParamsStore,
    ctx: &StageContext<'_>,
    run: F,
) -> Result<bool>
where
    DI: Schema,
    PI: Schema,
    DO: Schema,
    PO: Schema,
    F: FnOnce(&DI, &[PI]) -> Result<(DO, Vec<PO>)>,
{
    let page_count = store.page_count();
    let doc_in = DI::load(store.doc())?;
    let page_in = (0..page_count)
        .map(|i| PI::load(store.page(i)?))
        .collect::<Result<Vec<_>>>()?;

    let cache = ctx.cache.filter(|_| cache_enabled);
    let key = match cache {
        Some(_) => Some(CacheKey::new(ctx.doc_id, name, signature, &doc_in, &page_in)?),
        None => None,
    };

    let cached = match (cache, &key) {
        (Some(cache), Some(key)) => cache.load::<DO, PO>(key),
        _ => None,
    };
    let hit = cached.is_some();

    let (doc_out, page_out) = match cached {
        Some(outputs) => {
            log::debug!("Stage {} served from cache", name);
            outputs
        }
        None => {
            let (doc_out, page_out) = run(&doc_in, &page_in)?;
            if let (Some(cache), Some(key)) = (cache, &key) {
                if let Err(e) = cache.save(key, &doc_out, &page_out) {
                    log::warn!("Failed to cache stage {}: {}", name, e);
                }
            }
            (doc_out, page_out)
        }
    };

    if page_out.len() != page_count && !(page_out.is_empty() && PO::fields().is_empty()) {
        return Err(Error::Other(format!(
            "Stage {} produced {} page outputs for {} pages",
            name,
            page_out.len(),
            page_count
        )));
    }

    doc_out.store(store.doc_mut(), name)?;
    for (i, out) in page_out.into_iter().enumerate() {
        out.store(store.page_mut(i)?, name)?;
    }
    Ok(hit)
}
