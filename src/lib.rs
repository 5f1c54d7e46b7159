//! # flowpdf
//!
//! Reading-order document model from decoded PDF page geometry.
//!
//! A geometry source supplies, per page, the block tree (blocks, lines,
//! spans, chars), vector drawings and image placements. A fixed pipeline of
//! layout stages then finds the body-text columns, selects and merges body
//! blocks, votes the dominant typography, and synthesizes screenshot regions
//! for everything that is not body text. The result is written as
//! `output/elements.json` with its `output/assets/` images.
//!
//! ## Quick Start
//!
//! ```no_run
//! use flowpdf::{process_file, PipelineOptions};
//!
//! fn main() -> flowpdf::Result<()> {
//!     let options = PipelineOptions::new().with_threads(4);
//!     let report = process_file("paper.json", "out/paper", &options)?;
//!     println!("{} stages, {} cached", report.stages.len(), report.cache_hits());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Typed stage pipeline**: field wiring is checked before any page work starts
//! - **Parallel pages**: page-level stage work fans out over Rayon
//! - **Stage cache**: unchanged stage inputs reuse stored outputs
//! - **Batch and ingestion runners**: YAML-configured batches, storage events

pub mod compare;
pub mod config;
pub mod error;
pub mod ingest;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod source;
pub mod stages;
pub mod task;

// Re-export commonly used types
pub use compare::{compare_output, Comparison, PageDiff};
pub use config::Config;
pub use error::{Error, Result};
pub use ingest::{IngestEvent, IngestOutcome, LocalStorage, TaskStatus};
pub use layout::{ColumnDetectorOptions, MergeOptions, ShotOptions};
pub use model::{Child, DocumentGeometry, Element, PageGeometry, Range, Rect, TocEntry};
pub use pipeline::{
    ExecutionReport, Executer, PageWorker, Pipeline, PipelineOptions, Schema, Worker,
};
pub use source::{GeometrySource, JsonGeometrySource};
pub use stages::{default_pipeline, SharedSource};
pub use task::{process_document, run_batch, run_task, TaskReport};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Library version, recorded in ingestion status files.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Process a geometry file into `dir_output`.
///
/// # Example
///
/// ```no_run
/// use flowpdf::{process_file, PipelineOptions};
///
/// process_file("paper.json", "out/paper", &PipelineOptions::new()).unwrap();
/// ```
pub fn process_file<P: AsRef<Path>, Q: AsRef<Path>>(
    path: P,
    dir_output: Q,
    options: &PipelineOptions,
) -> Result<ExecutionReport> {
    process_document(path.as_ref(), dir_output.as_ref(), options)
}

/// Builder for processing documents.
///
/// # Example
///
/// ```no_run
/// use flowpdf::FlowPdf;
///
/// let report = FlowPdf::new()
///     .with_threads(2)
///     .with_cache_dir("/tmp/flowpdf-cache")
///     .process("paper.json", "out/paper")?;
/// # Ok::<(), flowpdf::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FlowPdf {
    options: PipelineOptions,
}

impl FlowPdf {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page fan-out thread count (0 = one per CPU).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.options = self.options.with_threads(threads);
        self
    }

    /// Run page work on the calling thread only.
    pub fn sequential(mut self) -> Self {
        self.options = self.options.sequential();
        self
    }

    /// Set the stage cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options = self.options.with_cache_dir(dir);
        self
    }

    /// Disable the stage cache.
    pub fn without_cache(mut self) -> Self {
        self.options = self.options.without_cache();
        self
    }

    /// Set the resolution of shot assets.
    pub fn with_shot_dpi(mut self, dpi: u32) -> Self {
        self.options = self.options.with_shot_dpi(dpi);
        self
    }

    /// Current options.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Process a geometry file.
    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        path: P,
        dir_output: Q,
    ) -> Result<ExecutionReport> {
        process_file(path, dir_output, &self.options)
    }

    /// Process an already opened source.
    ///
    /// `file_input` names the document for caching; it is not read.
    pub fn process_source<S: GeometrySource + 'static>(
        &self,
        source: S,
        file_input: impl AsRef<Path>,
        dir_output: impl AsRef<Path>,
    ) -> Result<ExecutionReport> {
        std::fs::create_dir_all(dir_output.as_ref())?;
        task::run_pipeline(
            Arc::new(source),
            file_input.as_ref(),
            dir_output.as_ref(),
            &self.options,
        )
    }
}
