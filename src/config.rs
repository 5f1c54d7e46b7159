//! Batch configuration loaded from YAML.
//!
//! ```yaml
//! path:
//!   input: ./data/input
//!   output: ./data/output
//! files: [paper-a, paper-b]
//! processbar:
//!   enabled: true
//! compare:
//!   enabled: false
//!   target: ./data/reference
//! pipeline:
//!   threads: 8
//!   documents: 12
//!   cache: true
//! ```

use crate::error::{Error, Result};
use crate::pipeline::PipelineOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Input and output roots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathConfig {
    /// Directory holding `<name>.json` geometry files
    pub input: PathBuf,
    /// Directory receiving one `<name>/` output directory per document
    pub output: PathBuf,
}

/// Progress bar settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Show a progress bar instead of per-document log lines
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Comparison mode settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Compare body-block indexes after the batch
    #[serde(default)]
    pub enabled: bool,
    /// Reference output root
    #[serde(default)]
    pub target: Option<PathBuf>,
}

/// Pipeline execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Page fan-out threads per document (0 = one per CPU)
    #[serde(default)]
    pub threads: usize,
    /// Documents processed at once
    #[serde(default = "default_documents")]
    pub documents: usize,
    /// Stage cache directory
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Enable the stage cache
    #[serde(default = "default_true")]
    pub cache: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            documents: default_documents(),
            cache_dir: None,
            cache: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_documents() -> usize {
    12
}

/// Batch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Input and output roots
    pub path: PathConfig,
    /// Document names, without extension
    #[serde(default)]
    pub files: Vec<String>,
    /// Progress bar settings
    #[serde(default)]
    pub processbar: ProgressConfig,
    /// Comparison mode settings
    #[serde(default)]
    pub compare: CompareConfig,
    /// Pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline.documents == 0 {
            return Err(Error::InvalidConfig(
                "pipeline.documents must be at least 1".into(),
            ));
        }
        if self.compare.enabled && self.compare.target.is_none() {
            return Err(Error::InvalidConfig(
                "compare.target is required when compare.enabled is set".into(),
            ));
        }
        if let Some(name) = self.files.iter().find(|f| f.trim().is_empty()) {
            return Err(Error::InvalidConfig(format!("invalid file name {:?}", name)));
        }
        Ok(())
    }

    /// `(geometry file, output directory)` for every listed document.
    pub fn documents(&self) -> Vec<(PathBuf, PathBuf)> {
        self.files
            .iter()
            .map(|name| {
                (
                    self.path.input.join(format!("{}.json", name)),
                    self.path.output.join(name),
                )
            })
            .collect()
    }

    /// Pipeline options described by this configuration.
    pub fn pipeline_options(&self) -> PipelineOptions {
        let mut options = PipelineOptions::new()
            .with_threads(self.pipeline.threads)
            .with_cache(self.pipeline.cache);
        if let Some(dir) = &self.pipeline.cache_dir {
            options = options.with_cache_dir(dir);
        }
        options
    }
}
