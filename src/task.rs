//! Document and batch task runners.

use crate::error::{Error, Result};
use crate::pipeline::{ExecutionReport, Executer, PipelineOptions};
use crate::source::JsonGeometrySource;
use crate::stages::{default_pipeline, SharedSource};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// File written to a document's output directory when its run fails.
pub const ERROR_FILE: &str = "error.txt";

/// Outcome of one document task.
#[derive(Debug, Clone)]
pub struct TaskReport {
    /// Geometry file
    pub input: PathBuf,
    /// Output directory
    pub output: PathBuf,
    /// Wall time of the task
    pub elapsed: Duration,
    /// Stage report, or the rendered error chain
    pub outcome: std::result::Result<ExecutionReport, String>,
}

impl TaskReport {
    /// Check if the document was processed successfully.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Document name (input file stem).
    pub fn name(&self) -> String {
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Run the default pipeline over an already opened source.
pub fn run_pipeline(
    source: SharedSource,
    file_input: &Path,
    dir_output: &Path,
    options: &PipelineOptions,
) -> Result<ExecutionReport> {
    let page_count = source.page_count();
    let pipeline = default_pipeline(source, options)?;
    let mut executer = Executer::new(pipeline, file_input, dir_output, page_count, options)?;
    executer.execute()
}

/// Process one geometry file into `dir_output`.
///
/// The output directory is emptied first.
pub fn process_document(
    file_input: &Path,
    dir_output: &Path,
    options: &PipelineOptions,
) -> Result<ExecutionReport> {
    prepare_output(dir_output)?;
    let source: SharedSource = Arc::new(JsonGeometrySource::open(file_input)?);
    run_pipeline(source, file_input, dir_output, options)
}

fn prepare_output(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Process one document, recording a failure in `<out>/error.txt`
/// instead of returning it.
pub fn run_task(file_input: &Path, dir_output: &Path, options: &PipelineOptions) -> TaskReport {
    let start = Instant::now();
    log::info!("Start {}", file_input.display());

    let outcome = process_document(file_input, dir_output, options).map_err(|e| {
        let chain = e.chain();
        log::error!("{} failed: {}", file_input.display(), e);
        if let Err(write_err) = write_error_file(dir_output, &chain) {
            log::warn!(
                "Cannot write {} for {}: {}",
                ERROR_FILE,
                file_input.display(),
                write_err
            );
        }
        chain
    });

    let elapsed = start.elapsed();
    log::info!("End {}, time = {:.2?}", file_input.display(), elapsed);
    TaskReport {
        input: file_input.to_path_buf(),
        output: dir_output.to_path_buf(),
        elapsed,
        outcome,
    }
}

fn write_error_file(dir_output: &Path, chain: &str) -> Result<()> {
    fs::create_dir_all(dir_output)?;
    fs::write(dir_output.join(ERROR_FILE), chain)?;
    Ok(())
}

/// Process documents concurrently, at most `parallel` at a time.
///
/// `on_done` is called from worker threads as each document finishes.
/// Reports come back in input order; one failure never stops the others.
pub fn run_batch<F>(
    documents: &[(PathBuf, PathBuf)],
    options: &PipelineOptions,
    parallel: usize,
    on_done: F,
) -> Result<Vec<TaskReport>>
where
    F: Fn(&TaskReport) + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallel.max(1))
        .thread_name(|i| format!("flowpdf-doc-{}", i))
        .build()
        .map_err(|e| Error::Other(format!("Failed to build document pool: {}", e)))?;

    Ok(pool.install(|| {
        documents
            .par_iter()
            .map(|(input, output)| {
                let report = run_task(input, output, options);
                on_done(&report);
                report
            })
            .collect()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_failed_task_writes_error_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out");
        let report = run_task(
            &dir.path().join("missing.json"),
            &output,
            &PipelineOptions::new().without_cache(),
        );

        assert!(!report.is_success());
        assert_eq!(report.name(), "missing");
        let text = fs::read_to_string(output.join(ERROR_FILE)).unwrap();
        assert!(text.contains("Geometry source error"));
    }

    #[test]
    fn test_output_dir_is_recreated() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out");
        fs::create_dir_all(&output).unwrap();
        fs::write(output.join("stale.txt"), "old").unwrap();

        prepare_output(&output).unwrap();
        assert!(output.exists());
        assert!(!output.join("stale.txt").exists());
    }

    #[test]
    fn test_batch_isolates_failures() {
        let dir = TempDir::new().unwrap();
        let documents: Vec<(PathBuf, PathBuf)> = (0..3)
            .map(|i| {
                (
                    dir.path().join(format!("doc{}.json", i)),
                    dir.path().join(format!("out{}", i)),
                )
            })
            .collect();
        // Only the middle document is valid JSON; it has no text, so it fails too,
        // but with a different error.
        fs::write(&documents[1].0, r#"{"pages": [{}]}"#).unwrap();

        let done = std::sync::atomic::AtomicUsize::new(0);
        let reports = run_batch(&documents, &PipelineOptions::new().without_cache(), 2, |_| {
            done.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })
        .unwrap();

        assert_eq!(reports.len(), 3);
        assert_eq!(done.into_inner(), 3);
        assert_eq!(reports[1].input, documents[1].0);
        for report in &reports {
            assert!(report.output.join(ERROR_FILE).exists());
        }
        let middle = reports[1].outcome.as_ref().unwrap_err();
        assert!(middle.contains("No body text found"));
    }
}
