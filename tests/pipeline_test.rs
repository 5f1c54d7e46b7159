//! Integration tests for the stage pipeline engine.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flowpdf::error::{Error, Result};
use flowpdf::pipeline::{Empty, Executer, PageWorker, Pipeline, PipelineOptions, Worker};
use flowpdf::schema;
use tempfile::TempDir;

schema! {
    struct PageCountIn {
        page_count: usize,
    }
}

schema! {
    struct SquareOut {
        square: usize,
    }
}

schema! {
    struct SquareIn {
        square: usize,
    }
}

schema! {
    struct NarrowSquareIn {
        square: u32,
    }
}

schema! {
    struct MissingIn {
        missing: usize,
    }
}

schema! {
    struct PageTotal {
        page_total: usize,
    }
}

schema! {
    struct SumOut {
        sum: usize,
    }
}

/// Squares each page index and counts how many pages it ran.
struct Squares {
    calls: Arc<AtomicUsize>,
    fail_on: Option<usize>,
}

impl Squares {
    fn new(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            fail_on: None,
        }
    }
}

impl PageWorker for Squares {
    const NAME: &'static str = "squares";
    const VERSION: u32 = 1;

    type DocIn = PageCountIn;
    type PageIn = Empty;
    type DocOut = PageTotal;
    type PageOut = SquareOut;

    fn run_page(
        &self,
        page_index: usize,
        _doc_in: &PageCountIn,
        _page_in: &Empty,
    ) -> Result<SquareOut> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(page_index) {
            return Err(Error::Source(format!("page {} is unreadable", page_index)));
        }
        // Early pages finish last.
        std::thread::sleep(Duration::from_millis(((8 - page_index.min(8)) * 3) as u64));
        Ok(SquareOut {
            square: page_index * page_index,
        })
    }

    fn after_run_page(
        &self,
        doc_in: &PageCountIn,
        _page_in: &[Empty],
        page_out: &[SquareOut],
    ) -> Result<PageTotal> {
        assert_eq!(page_out.len(), doc_in.page_count);
        Ok(PageTotal {
            page_total: page_out.len(),
        })
    }
}

/// Sums the per-page squares.
struct Sum;

impl Worker for Sum {
    const NAME: &'static str = "sum";
    const VERSION: u32 = 1;

    type DocIn = Empty;
    type PageIn = SquareIn;
    type DocOut = SumOut;
    type PageOut = Empty;

    fn run(&self, _doc_in: &Empty, page_in: &[SquareIn]) -> Result<(SumOut, Vec<Empty>)> {
        Ok((
            SumOut {
                sum: page_in.iter().map(|p| p.square).sum(),
            },
            Vec::new(),
        ))
    }
}

/// Reads `square` with the wrong type.
struct Narrow;

impl Worker for Narrow {
    const NAME: &'static str = "narrow";
    const VERSION: u32 = 1;

    type DocIn = Empty;
    type PageIn = NarrowSquareIn;
    type DocOut = Empty;
    type PageOut = Empty;

    fn run(&self, _doc_in: &Empty, _page_in: &[NarrowSquareIn]) -> Result<(Empty, Vec<Empty>)> {
        Ok((Empty {}, Vec::new()))
    }
}

/// Reads a field nobody writes.
struct Orphan;

impl Worker for Orphan {
    const NAME: &'static str = "orphan";
    const VERSION: u32 = 1;

    type DocIn = MissingIn;
    type PageIn = Empty;
    type DocOut = Empty;
    type PageOut = Empty;

    fn run(&self, _doc_in: &MissingIn, _page_in: &[Empty]) -> Result<(Empty, Vec<Empty>)> {
        Ok((Empty {}, Vec::new()))
    }
}

/// Writes `square` a second time.
struct Rewrite;

impl Worker for Rewrite {
    const NAME: &'static str = "rewrite";
    const VERSION: u32 = 1;

    type DocIn = Empty;
    type PageIn = Empty;
    type DocOut = Empty;
    type PageOut = SquareOut;

    fn run(&self, _doc_in: &Empty, page_in: &[Empty]) -> Result<(Empty, Vec<SquareOut>)> {
        Ok((
            Empty {},
            page_in.iter().map(|_| SquareOut { square: 0 }).collect(),
        ))
    }
}

fn run(
    pipeline: Pipeline,
    page_count: usize,
    options: &PipelineOptions,
) -> Result<(Executer, flowpdf::ExecutionReport)> {
    let mut executer = Executer::new(
        pipeline,
        Path::new("input/paper.json"),
        Path::new("out/paper"),
        page_count,
        options,
    )?;
    let report = executer.execute()?;
    Ok((executer, report))
}

fn squares_and_sum(calls: &Arc<AtomicUsize>) -> Pipeline {
    Pipeline::builder()
        .page_worker(Squares::new(calls.clone()))
        .worker(Sum)
        .build()
        .unwrap()
}

#[test]
fn test_page_outputs_in_page_order() {
    let calls = Arc::new(AtomicUsize::new(0));
    let options = PipelineOptions::new().with_threads(4).without_cache();
    let (executer, report) = run(squares_and_sum(&calls), 8, &options).unwrap();

    let store = executer.store();
    for i in 0..8 {
        assert_eq!(store.page_get::<usize>("square", i).unwrap(), i * i);
    }
    assert_eq!(store.doc_get::<usize>("page_total").unwrap(), 8);
    assert_eq!(store.doc_get::<usize>("sum").unwrap(), 140);
    assert_eq!(report.stages.len(), 2);
    assert_eq!(report.cache_hits(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}

#[test]
fn test_cache_hit_skips_page_work() {
    let cache = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let options = PipelineOptions::new().with_cache_dir(cache.path());

    let (_, first) = run(squares_and_sum(&calls), 4, &options).unwrap();
    assert_eq!(first.cache_hits(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let (executer, second) = run(squares_and_sum(&calls), 4, &options).unwrap();
    assert_eq!(second.cache_hits(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(executer.store().doc_get::<usize>("sum").unwrap(), 14);
    assert_eq!(executer.store().page_get::<usize>("square", 3).unwrap(), 9);

    let stats = executer.cache().unwrap().stats();
    assert_eq!(stats.hits, 2);
}

#[test]
fn test_changed_input_misses_cache() {
    let cache = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let options = PipelineOptions::new().with_cache_dir(cache.path());

    run(squares_and_sum(&calls), 4, &options).unwrap();
    let (executer, report) = run(squares_and_sum(&calls), 5, &options).unwrap();

    assert_eq!(report.cache_hits(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 9);
    assert_eq!(executer.store().doc_get::<usize>("sum").unwrap(), 30);
}

#[test]
fn test_disabled_cache_always_runs() {
    let cache = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let options = PipelineOptions::new()
        .with_cache_dir(cache.path())
        .without_cache();

    run(squares_and_sum(&calls), 3, &options).unwrap();
    let (executer, report) = run(squares_and_sum(&calls), 3, &options).unwrap();

    assert_eq!(report.cache_hits(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 6);
    assert!(executer.cache().is_none());
}

#[test]
fn test_page_failure_fails_stage() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = Pipeline::builder()
        .page_worker(Squares {
            calls,
            fail_on: Some(2),
        })
        .worker(Sum)
        .build()
        .unwrap();

    let err = run(pipeline, 4, &PipelineOptions::new().without_cache())
        .err()
        .unwrap();
    match err {
        Error::PageTask { stage, page, source } => {
            assert_eq!(stage, "squares");
            assert_eq!(page, 2);
            assert!(matches!(*source, Error::Source(_)));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_unresolved_field() {
    let err = Pipeline::builder().worker(Orphan).build().err().unwrap();
    assert!(err.is_configuration());
    assert!(matches!(
        err,
        Error::UnresolvedField { ref stage, ref field } if stage == "orphan" && field == "missing"
    ));
}

#[test]
fn test_read_before_write_is_unresolved() {
    let calls = Arc::new(AtomicUsize::new(0));
    let err = Pipeline::builder()
        .worker(Sum)
        .page_worker(Squares::new(calls))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, Error::UnresolvedField { .. }));
}

#[test]
fn test_field_type_mismatch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let err = Pipeline::builder()
        .page_worker(Squares::new(calls))
        .worker(Narrow)
        .build()
        .err()
        .unwrap();
    assert!(err.is_configuration());
    assert!(matches!(err, Error::FieldTypeMismatch { ref field, .. } if field == "square"));
}

#[test]
fn test_duplicate_output() {
    let calls = Arc::new(AtomicUsize::new(0));
    let err = Pipeline::builder()
        .page_worker(Squares::new(calls))
        .worker(Rewrite)
        .build()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::DuplicateField { ref producer, .. } if producer == "squares"
    ));
}

#[test]
fn test_duplicate_stage_name() {
    let err = Pipeline::builder()
        .worker(Rewrite)
        .worker(Rewrite)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, Error::InvalidConfig(_)));
}
