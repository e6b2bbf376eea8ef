//! Workers of a map-reduce-lite job.
//!
//! A worker asks the coordinator for a task, runs the map or reduce step
//! against files in its working directory, reports completion, and repeats
//! until the coordinator says the job is done.

mod config;
mod core;
pub mod map;
pub mod reduce;

pub use crate::config::{WorkerConfig, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SORT_BUFFER};
pub use crate::core::{ExitReason, MRWorker, WorkerID, WorkerReport, WorkerState};
