//! Stage pipeline engine.
//!
//! Stages read and write named, typed fields in a [`ParamsStore`]. A
//! [`Pipeline`] checks up front that every field a stage reads is written
//! earlier with the same type; the [`Executer`] then runs the stages in
//! order, fanning page-level work out over a thread pool and reusing cached
//! stage results when inputs are unchanged.

mod cache;
mod executer;
mod options;
mod schema;
mod stage;
mod store;

pub use cache::{default_cache_dir, CacheKey, CacheStats, StageCache};
pub use executer::{
    seed_fields, ExecutionReport, Executer, Pipeline, PipelineBuilder, Scope, StageReport,
};
pub use options::PipelineOptions;
pub use schema::{Empty, FieldSpec, Schema};
pub use stage::{PageWorker, PageWorkerStage, Stage, StageContext, Worker, WorkerStage};
pub use store::{ParamsStore, Slots, SEED_PRODUCER};
