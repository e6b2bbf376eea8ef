//! The coordinator of a map-reduce-lite job.
//!
//! It owns every task queue and completion counter, hands out map tasks
//! first, creates the reduce tasks once every map task has been reported,
//! and reports when the whole job is done.

mod core;
mod error;
mod jobs;
mod task_queue;

pub use crate::core::{MRCoordinator, TaskResponse};
pub use crate::error::CoordinatorError;
pub use crate::jobs::{JobState, JobStatus};
