//! Pipeline options and configuration.

use crate::layout::{ColumnDetectorOptions, MergeOptions, ShotOptions};
use std::path::PathBuf;

/// Options for running the layout pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Worker threads for page fan-out (0 = one per CPU)
    pub threads: usize,

    /// Stage cache directory (`None` = system temp directory)
    pub cache_dir: Option<PathBuf>,

    /// Whether cacheable stages may reuse earlier results
    pub cache_enabled: bool,

    /// Raster resolution of shot assets
    pub shot_dpi: u32,

    /// Body-text and column detection tuning
    pub columns: ColumnDetectorOptions,

    /// Shot synthesis tuning
    pub shots: ShotOptions,

    /// Continuation merge tuning
    pub merge: MergeOptions,
}

impl PipelineOptions {
    /// Create new pipeline options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page fan-out thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Run page tasks one at a time.
    pub fn sequential(mut self) -> Self {
        self.threads = 1;
        self
    }

    /// Set the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Enable or disable the stage cache.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Disable the stage cache.
    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }

    /// Set the shot raster resolution.
    pub fn with_shot_dpi(mut self, dpi: u32) -> Self {
        self.shot_dpi = dpi;
        self
    }

    /// Set column detection options.
    pub fn with_columns(mut self, columns: ColumnDetectorOptions) -> Self {
        self.columns = columns;
        self
    }

    /// Set shot synthesis options.
    pub fn with_shots(mut self, shots: ShotOptions) -> Self {
        self.shots = shots;
        self
    }

    /// Set continuation merge options.
    pub fn with_merge(mut self, merge: MergeOptions) -> Self {
        self.merge = merge;
        self
    }

    /// Resolved cache directory.
    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(super::cache::default_cache_dir)
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            threads: 0,
            cache_dir: None,
            cache_enabled: true,
            shot_dpi: 288,
            columns: ColumnDetectorOptions::default(),
            shots: ShotOptions::default(),
            merge: MergeOptions::default(),
        }
    }
}
