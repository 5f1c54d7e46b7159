//! Pipeline assembly and execution.

use super::cache::StageCache;
use super::options::PipelineOptions;
use super::schema::FieldSpec;
use super::stage::{PageWorker, PageWorkerStage, Stage, StageContext, Worker, WorkerStage};
use super::store::{ParamsStore, SEED_PRODUCER};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Field scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// One value per document
    Doc,
    /// One value per page
    Page,
}

/// Document fields present before the first stage runs.
pub fn seed_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::of::<PathBuf>("file_input"),
        FieldSpec::of::<PathBuf>("dir_output"),
        FieldSpec::of::<usize>("page_count"),
    ]
}

/// Builder for a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineBuilder {
    /// Append a document-level stage.
    pub fn worker<W: Worker + 'static>(mut self, worker: W) -> Self {
        self.stages.push(Box::new(WorkerStage(worker)));
        self
    }

    /// Append a page-level stage.
    pub fn page_worker<W: PageWorker + 'static>(mut self, worker: W) -> Self {
        self.stages.push(Box::new(PageWorkerStage(worker)));
        self
    }

    /// Append an already wrapped stage.
    pub fn stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Validate the stage chain and build the pipeline.
    ///
    /// Every input must be produced by the seed or an earlier stage, in the
    /// same scope and with the same type. Every output must be new.
    pub fn build(self) -> Result<Pipeline> {
        let mut produced: BTreeMap<&'static str, (Scope, FieldSpec, &'static str)> =
            BTreeMap::new();
        for field in seed_fields() {
            produced.insert(field.name, (Scope::Doc, field, SEED_PRODUCER));
        }

        let mut names = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            if names.contains(&stage.name()) {
                return Err(Error::InvalidConfig(format!(
                    "stage name {} is used twice",
                    stage.name()
                )));
            }
            names.push(stage.name());

            let inputs = stage
                .doc_inputs()
                .into_iter()
                .map(|f| (Scope::Doc, f))
                .chain(stage.page_inputs().into_iter().map(|f| (Scope::Page, f)));
            for (scope, field) in inputs {
                match produced.get(field.name) {
                    Some((s, spec, _)) if *s == scope => {
                        if spec.type_id != field.type_id {
                            return Err(Error::FieldTypeMismatch {
                                field: field.name.to_string(),
                                expected: field.type_name.to_string(),
                                found: spec.type_name.to_string(),
                            });
                        }
                    }
                    _ => {
                        return Err(Error::UnresolvedField {
                            stage: stage.name().to_string(),
                            field: field.name.to_string(),
                        })
                    }
                }
            }

            let outputs = stage
                .doc_outputs()
                .into_iter()
                .map(|f| (Scope::Doc, f))
                .chain(stage.page_outputs().into_iter().map(|f| (Scope::Page, f)));
            for (scope, field) in outputs {
                if let Some((_, _, producer)) = produced.get(field.name) {
                    return Err(Error::DuplicateField {
                        stage: stage.name().to_string(),
                        field: field.name.to_string(),
                        producer: producer.to_string(),
                    });
                }
                produced.insert(field.name, (scope, field, stage.name()));
            }
        }

        Ok(Pipeline {
            stages: self.stages,
        })
    }
}

/// A validated, ordered chain of stages.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Start building a pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Timing and cache outcome of one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    /// Stage name
    pub name: &'static str,
    /// Wall time spent in the stage
    pub elapsed: Duration,
    /// Whether the outputs came from the cache
    pub cache_hit: bool,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    /// Per-stage reports in execution order
    pub stages: Vec<StageReport>,
}

impl ExecutionReport {
    /// Total wall time across stages.
    pub fn total_elapsed(&self) -> Duration {
        self.stages.iter().map(|s| s.elapsed).sum()
    }

    /// Number of stages served from the cache.
    pub fn cache_hits(&self) -> usize {
        self.stages.iter().filter(|s| s.cache_hit).count()
    }
}

/// Runs a [`Pipeline`] over one document.
pub struct Executer {
    pipeline: Pipeline,
    store: ParamsStore,
    doc_id: String,
    pool: rayon::ThreadPool,
    cache: Option<StageCache>,
}

impl Executer {
    /// Prepare a run: seed the store and set up the page pool and cache.
    pub fn new(
        pipeline: Pipeline,
        file_input: &Path,
        dir_output: &Path,
        page_count: usize,
        options: &PipelineOptions,
    ) -> Result<Self> {
        let mut store = ParamsStore::new(page_count)?;
        store.doc_set("file_input", file_input.to_path_buf(), SEED_PRODUCER)?;
        store.doc_set("dir_output", dir_output.to_path_buf(), SEED_PRODUCER)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.threads)
            .thread_name(|i| format!("flowpdf-page-{}", i))
            .build()
            .map_err(|e| Error::Other(format!("Failed to build page pool: {}", e)))?;

        let cache = options
            .cache_enabled
            .then(|| StageCache::new(options.cache_root()));

        let doc_id = file_input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        Ok(Self {
            pipeline,
            store,
            doc_id,
            pool,
            cache,
        })
    }

    /// Run every stage in order. The first failing stage aborts the run.
    pub fn execute(&mut self) -> Result<ExecutionReport> {
        let ctx = StageContext {
            pool: &self.pool,
            cache: self.cache.as_ref(),
            doc_id: &self.doc_id,
        };

        let mut report = ExecutionReport::default();
        for stage in &self.pipeline.stages {
            let start = Instant::now();
            log::debug!("Running stage {}", stage.name());
            let cache_hit = stage.execute(&mut self.store, &ctx)?;
            let elapsed = start.elapsed();
            log::info!(
                "Stage {} finished in {:.2?}{}",
                stage.name(),
                elapsed,
                if cache_hit { " (cached)" } else { "" }
            );
            report.stages.push(StageReport {
                name: stage.name(),
                elapsed,
                cache_hit,
            });
        }
        Ok(report)
    }

    /// The store, holding every field written so far.
    pub fn store(&self) -> &ParamsStore {
        &self.store
    }

    /// Consume the executer, returning its store.
    pub fn into_store(self) -> ParamsStore {
        self.store
    }

    /// Stage cache, if enabled.
    pub fn cache(&self) -> Option<&StageCache> {
        self.cache.as_ref()
    }
}
