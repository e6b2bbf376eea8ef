//! Runs a MapReduce job in one process: discovers the input files, starts a
//! coordinator and a pool of workers, and waits for them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Error};
use bytes::Bytes;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use common::codec::{is_intermediate_file_name, output_file_name};
use common::Workload;
use mrl_coordinator::{JobStatus, MRCoordinator};
use mrl_worker::{MRWorker, WorkerConfig, WorkerReport, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SORT_BUFFER};

pub mod args;

/// Everything needed to run one job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub input_files: Vec<String>,
    pub workload: Workload,
    pub n_reduce: u32,
    pub n_workers: usize,
    pub work_dir: PathBuf,
    pub request_timeout: Duration,
    pub sort_buffer: usize,
    pub aux: Bytes,
}

impl JobConfig {
    pub fn new(input_files: Vec<String>, workload: Workload, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_files,
            workload,
            n_reduce: 3,
            n_workers: 4,
            work_dir: work_dir.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            sort_buffer: DEFAULT_SORT_BUFFER,
            aux: Bytes::new(),
        }
    }
}

/// Outcome of a completed job.
#[derive(Debug)]
pub struct JobReport {
    /// One output file per reduce partition, in partition order.
    pub outputs: Vec<PathBuf>,
    pub status: JobStatus,
    pub workers: Vec<WorkerReport>,
}

/// Expand an input glob into a sorted list of files.
///
/// Fails when the pattern is invalid or matches no file.
pub fn discover_inputs(pattern: &str) -> Result<Vec<String>, Error> {
    let paths = glob::glob(pattern).with_context(|| format!("invalid input glob `{}`", pattern))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path.to_string_lossy().into_owned()),
            Ok(path) => debug!("Skipping non-file input {}", path.display()),
            Err(e) => warn!("Skipping unreadable input: {}", e),
        }
    }
    files.sort();

    if files.is_empty() {
        bail!("no input files match `{}`", pattern);
    }
    Ok(files)
}

/// Start a coordinator and `n_workers` workers, and wait for every worker
/// to exit.
///
/// The coordinator is returned through `on_start` so callers can shut it
/// down, for example on Ctrl-C.
pub async fn run_job(
    config: JobConfig,
    on_start: impl FnOnce(Arc<MRCoordinator>),
) -> Result<JobReport, Error> {
    if config.n_workers == 0 {
        bail!("at least one worker is required");
    }
    fs::create_dir_all(&config.work_dir).with_context(|| {
        format!(
            "failed to create working directory {}",
            config.work_dir.display()
        )
    })?;

    let n_reduce = config.n_reduce;
    let coordinator = Arc::new(MRCoordinator::new(config.input_files, n_reduce)?);
    on_start(coordinator.clone());

    let worker_config = Arc::new(WorkerConfig {
        work_dir: config.work_dir.clone(),
        request_timeout: config.request_timeout,
        sort_buffer: config.sort_buffer,
        aux: config.aux,
    });

    let mut workers = JoinSet::new();
    for id in 0..config.n_workers {
        let worker = MRWorker::new(id, coordinator.clone(), config.workload, worker_config.clone());
        workers.spawn(worker.run());
    }
    info!("Started {} workers", config.n_workers);

    let mut reports = Vec::with_capacity(config.n_workers);
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(report)) => reports.push(report),
            Ok(Err(e)) => error!("Worker exited with an error: {:#}", e),
            Err(e) => error!("Worker task failed: {}", e),
        }
    }

    let status = coordinator.status().await;
    if !coordinator.is_job_done() {
        return Err(anyhow!("job did not complete ({})", status));
    }

    let outputs = (0..n_reduce)
        .map(|id| config.work_dir.join(output_file_name(id)))
        .collect();

    Ok(JobReport {
        outputs,
        status,
        workers: reports,
    })
}

/// Remove the `mr-<map>-<partition>` intermediate files in `work_dir`.
///
/// Other files, including ones that merely start with `mr-`, are left alone.
///
/// Returns the number of files removed.
pub fn cleanup_intermediate(work_dir: &Path) -> Result<usize, Error> {
    let mut removed = 0;
    for entry in WalkDir::new(work_dir).max_depth(1) {
        let entry = entry?;
        let is_intermediate = entry.file_type().is_file()
            && is_intermediate_file_name(&entry.file_name().to_string_lossy());
        if is_intermediate {
            fs::remove_file(entry.path())
                .with_context(|| format!("failed to remove {}", entry.path().display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}
