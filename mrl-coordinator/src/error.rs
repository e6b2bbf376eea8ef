use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorError {
    /// A job needs at least one reduce partition.
    #[error("the number of reduce partitions must be positive")]
    InvalidPartitionCount,

    /// The coordinator was shut down while the caller waited for a task.
    #[error("interrupted while waiting for a task")]
    Interrupted,
}
