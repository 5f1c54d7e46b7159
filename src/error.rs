//! Error types for flowpdf library.

use std::io;
use thiserror::Error;

/// Result type alias for flowpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building or running a pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration could not be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A field was read from the store before anything wrote it.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// A stage declares an output that an earlier stage (or the seed) already produced.
    #[error("Stage {stage} declares output `{field}` which is already produced by {producer}")]
    DuplicateField {
        /// Stage declaring the output
        stage: String,
        /// Field name
        field: String,
        /// Stage (or seed) that produced it first
        producer: String,
    },

    /// A stage declares an input that no earlier stage produces.
    #[error("Stage {stage} reads `{field}` which no earlier stage produces")]
    UnresolvedField {
        /// Stage declaring the input
        stage: String,
        /// Field name
        field: String,
    },

    /// A field is produced with one type and read with another.
    #[error("Field `{field}` holds {found}, expected {expected}")]
    FieldTypeMismatch {
        /// Field name
        field: String,
        /// Type the reader asked for
        expected: String,
        /// Type stored in the slot
        found: String,
    },

    /// Page index is outside the document.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageIndexOutOfRange(usize, usize),

    /// No body-text cluster could be found in the document.
    #[error("No body text found: {0}")]
    NoBodyTextFound(String),

    /// A page task failed; the owning stage fails as a whole.
    #[error("Stage {stage} failed on page {page}: {source}")]
    PageTask {
        /// Stage name
        stage: String,
        /// Page index (0-based)
        page: usize,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// The geometry source could not supply a page, the TOC or a raster.
    #[error("Geometry source error: {0}")]
    Source(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Object-storage event payload is malformed.
    #[error("Invalid ingestion event: {0}")]
    InvalidEvent(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error is a pipeline configuration error.
    ///
    /// Configuration errors are raised before any page work starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::DuplicateField { .. }
                | Error::UnresolvedField { .. }
                | Error::FieldTypeMismatch { .. }
                | Error::InvalidConfig(_)
        )
    }

    /// Render the error with its full source chain, one cause per line.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str("\ncaused by: ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}
