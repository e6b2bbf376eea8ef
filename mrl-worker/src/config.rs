use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;

/// Default bound on a single task request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default number of records held in memory per external sort chunk.
pub const DEFAULT_SORT_BUFFER: usize = 1_000_000;

/// Settings shared by every worker of a job.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory holding the intermediate and output files.
    pub work_dir: PathBuf,

    /// How long one task request may wait for work.
    pub request_timeout: Duration,

    /// Records sorted in memory before a chunk is spilled to disk.
    pub sort_buffer: usize,

    /// Auxiliary arguments passed to the map and reduce functions.
    pub aux: Bytes,
}

impl WorkerConfig {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            sort_buffer: DEFAULT_SORT_BUFFER,
            aux: Bytes::new(),
        }
    }
}
