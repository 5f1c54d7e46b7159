//! Object-storage ingestion.
//!
//! An upload event names `(bucket, key)` pairs. Each referenced document is
//! processed and its outputs are mirrored to `output/<stem>/` in the same
//! bucket, next to a `task.json` status record. Buckets are directories
//! under a local storage root.

use crate::error::{Error, Result};
use crate::pipeline::{ExecutionReport, PipelineOptions};
use crate::task::process_document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable carrying the event payload.
pub const EVENT_ENV: &str = "FC_CUSTOM_CONTAINER_EVENT";

/// Status file name inside a document's output prefix.
pub const STATUS_FILE: &str = "task.json";

/// An object named by an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// Bucket name
    pub bucket: String,
    /// Object key within the bucket
    pub key: String,
}

impl ObjectRef {
    /// Document name: the key's file stem.
    pub fn stem(&self) -> Result<String> {
        Path::new(&self.key)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::InvalidEvent(format!("object key {:?} has no file name", self.key))
            })
    }
}

#[derive(Deserialize)]
struct RawEvents {
    events: Vec<RawEvent>,
}

#[derive(Deserialize)]
struct RawEvent {
    oss: RawOss,
}

#[derive(Deserialize)]
struct RawOss {
    bucket: RawBucket,
    object: RawObject,
}

#[derive(Deserialize)]
struct RawBucket {
    name: String,
}

#[derive(Deserialize)]
struct RawObject {
    key: String,
}

/// A parsed upload event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestEvent {
    /// Objects to process, in event order
    pub objects: Vec<ObjectRef>,
}

impl IngestEvent {
    /// Parse an event payload.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawEvents =
            serde_json::from_str(text).map_err(|e| Error::InvalidEvent(e.to_string()))?;
        Ok(Self {
            objects: raw
                .events
                .into_iter()
                .map(|e| ObjectRef {
                    bucket: e.oss.bucket.name,
                    key: e.oss.object.key,
                })
                .collect(),
        })
    }

    /// Read the payload from [`EVENT_ENV`].
    pub fn from_env() -> Result<Self> {
        let text = std::env::var(EVENT_ENV)
            .map_err(|_| Error::InvalidEvent(format!("{} is not set", EVENT_ENV)))?;
        Self::from_json(&text)
    }
}

/// Processing state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Pipeline is running
    Executing,
    /// Outputs are complete
    Done,
    /// Pipeline failed
    Error,
}

/// Contents of `task.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// Processing state
    pub status: TaskState,
    /// Error message when failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Library version that wrote the outputs
    #[serde(default)]
    pub version: String,
    /// Time of the last state change
    pub updated_at: DateTime<Utc>,
}

impl TaskStatus {
    fn new(status: TaskState, error: Option<String>) -> Self {
        Self {
            status,
            error,
            version: crate::VERSION.to_string(),
            updated_at: Utc::now(),
        }
    }

    /// Status for a running task.
    pub fn executing() -> Self {
        Self::new(TaskState::Executing, None)
    }

    /// Status for a finished task.
    pub fn done() -> Self {
        Self::new(TaskState::Done, None)
    }

    /// Status for a failed task.
    pub fn failed(error: impl Into<String>) -> Self {
        Self::new(TaskState::Error, Some(error.into()))
    }

    /// Check if the outputs are complete and were written by this version.
    pub fn is_current(&self) -> bool {
        self.status == TaskState::Done && self.version == crate::VERSION
    }
}

/// What happened to one object.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// Outputs from this version already exist
    Skipped,
    /// Processed and mirrored
    Done(ExecutionReport),
    /// Pipeline failed; the error chain
    Failed(String),
}

/// Buckets stored as directories under a root.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    work_dir: PathBuf,
}

impl LocalStorage {
    /// Storage rooted at `root`; documents are processed under the system temp directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            work_dir: std::env::temp_dir().join("flowpdf-ingest"),
        }
    }

    /// Set the local working directory.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Path of an object.
    pub fn object_path(&self, object: &ObjectRef) -> PathBuf {
        self.root.join(&object.bucket).join(&object.key)
    }

    /// Output prefix of a document: `<bucket>/output/<stem>`.
    pub fn output_prefix(&self, bucket: &str, stem: &str) -> PathBuf {
        self.root.join(bucket).join("output").join(stem)
    }

    /// Read a document's status record, if any.
    pub fn read_status(&self, bucket: &str, stem: &str) -> Result<Option<TaskStatus>> {
        let path = self.output_prefix(bucket, stem).join(STATUS_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn write_status(&self, bucket: &str, stem: &str, status: &TaskStatus) -> Result<()> {
        let prefix = self.output_prefix(bucket, stem);
        fs::create_dir_all(&prefix)?;
        fs::write(prefix.join(STATUS_FILE), serde_json::to_string(status)?)?;
        Ok(())
    }

    /// Process one object and mirror its outputs.
    ///
    /// Pipeline failures are recorded in `task.json` and returned as
    /// [`IngestOutcome::Failed`]; only storage failures are errors.
    pub fn handle(&self, object: &ObjectRef, options: &PipelineOptions) -> Result<IngestOutcome> {
        let stem = object.stem()?;
        if self
            .read_status(&object.bucket, &stem)?
            .is_some_and(|s| s.is_current())
        {
            log::info!("Skip {}, outputs are current", object.key);
            return Ok(IngestOutcome::Skipped);
        }

        log::info!("Start {}", object.key);
        self.write_status(&object.bucket, &stem, &TaskStatus::executing())?;

        let work = self.work_dir.join(&stem);
        match process_document(&self.object_path(object), &work, options) {
            Ok(report) => {
                let prefix = self.output_prefix(&object.bucket, &stem);
                let copied = copy_tree(&work, &prefix)?;
                log::debug!("Mirrored {} files to {}", copied, prefix.display());
                self.write_status(&object.bucket, &stem, &TaskStatus::done())?;
                log::info!("End {}", object.key);
                Ok(IngestOutcome::Done(report))
            }
            Err(e) => {
                log::error!("{} failed: {}", object.key, e);
                self.write_status(&object.bucket, &stem, &TaskStatus::failed(e.to_string()))?;
                Ok(IngestOutcome::Failed(e.chain()))
            }
        }
    }

    /// Process every object of an event, one after another.
    pub fn handle_event(
        &self,
        event: &IngestEvent,
        options: &PipelineOptions,
    ) -> Vec<(ObjectRef, Result<IngestOutcome>)> {
        event
            .objects
            .iter()
            .map(|object| (object.clone(), self.handle(object, options)))
            .collect()
    }
}

/// Copy every file under `from` into `to`, keeping relative paths.
fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    fs::create_dir_all(to)?;
    let mut copied = 0;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copied += copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}
