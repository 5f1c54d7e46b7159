//! Layout analysis: body-text columns, dominant typography, shot regions and
//! continuation merging.

pub mod cluster;
mod columns;
mod merge;
mod shot;
mod typography;

pub use cluster::Dbscan;
pub use columns::{is_big_block, ColumnDetector, ColumnDetectorOptions, ColumnLayout};
pub use merge::{merge_continuations, Continuable, MergeOptions};
pub use shot::{ShotOptions, ShotSynthesizer};
pub use typography::{FontCounter, Typography};
