use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Context, Error};
use tracing::{debug, error, info};

use common::{MapTask, ReduceTask, Task, Workload};
use mrl_coordinator::{CoordinatorError, MRCoordinator, TaskResponse};

use crate::config::WorkerConfig;
use crate::map::perform_map;
use crate::reduce::perform_reduce;

pub type WorkerID = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Mapping,
    Reducing,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Idle => f.write_str("idle"),
            WorkerState::Mapping => f.write_str("mapping"),
            WorkerState::Reducing => f.write_str("reducing"),
        }
    }
}

/// Why a worker's loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The coordinator reported the job done.
    JobDone,

    /// The coordinator was shut down.
    Interrupted,
}

/// What a worker did before its loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub id: WorkerID,
    pub maps_completed: usize,
    pub reduces_completed: usize,
    pub exit: ExitReason,
}

/// A worker pulling tasks from a coordinator in the same process.
#[derive(Debug)]
pub struct MRWorker {
    id: WorkerID,
    state: WorkerState,
    coordinator: Arc<MRCoordinator>,
    workload: Workload,
    config: Arc<WorkerConfig>,
    maps_completed: usize,
    reduces_completed: usize,
}

impl MRWorker {
    pub fn new(
        id: WorkerID,
        coordinator: Arc<MRCoordinator>,
        workload: Workload,
        config: Arc<WorkerConfig>,
    ) -> MRWorker {
        MRWorker {
            id,
            state: WorkerState::Idle,
            coordinator,
            workload,
            config,
            maps_completed: 0,
            reduces_completed: 0,
        }
    }

    pub fn id(&self) -> WorkerID {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Request, execute and report tasks until the job is done.
    ///
    /// A failed task ends the loop with its error. The task is not reported,
    /// so the coordinator never hands it out again.
    pub async fn run(mut self) -> Result<WorkerReport, Error> {
        info!("Worker {} started", self.id);

        let exit = loop {
            if self.coordinator.is_job_done() {
                break ExitReason::JobDone;
            }

            let response = match self.coordinator.request_task(self.config.request_timeout).await {
                Ok(response) => response,
                Err(CoordinatorError::Interrupted) => {
                    info!("Worker {} interrupted while waiting for a task", self.id);
                    break ExitReason::Interrupted;
                }
                Err(e) => return Err(e.into()),
            };

            match response {
                TaskResponse::Assigned(task) => {
                    if let Err(e) = self.execute(task).await {
                        error!("Worker {} failed: {:#}", self.id, e);
                        self.state = WorkerState::Idle;
                        return Err(e);
                    }
                }
                TaskResponse::NoTaskAvailable => {
                    debug!("Worker {} found no task, retrying", self.id);
                }
                TaskResponse::JobDone => break ExitReason::JobDone,
            }
        };

        info!(
            "Worker {} exiting ({:?}) after {} map and {} reduce tasks",
            self.id, exit, self.maps_completed, self.reduces_completed
        );

        Ok(WorkerReport {
            id: self.id,
            maps_completed: self.maps_completed,
            reduces_completed: self.reduces_completed,
            exit,
        })
    }

    async fn execute(&mut self, task: Task) -> Result<(), Error> {
        match task {
            Task::Map(task) => {
                self.state = WorkerState::Mapping;
                let id = task.id;
                let files = self.run_map(task).await?;
                self.coordinator.report_map_complete(id, files).await;
                self.maps_completed += 1;
            }
            Task::Reduce(task) => {
                self.state = WorkerState::Reducing;
                let id = task.id;
                self.run_reduce(task).await?;
                self.coordinator.report_reduce_complete(id).await;
                self.reduces_completed += 1;
            }
        }
        self.state = WorkerState::Idle;
        Ok(())
    }

    async fn run_map(&self, task: MapTask) -> Result<Vec<String>, Error> {
        let workload = self.workload;
        let config = self.config.clone();
        let id = task.id;

        tokio::task::spawn_blocking(move || {
            perform_map(&task, &workload, config.aux.clone(), &config.work_dir)
        })
        .await
        .map_err(|e| anyhow!("map task {} panicked: {}", id, e))?
        .with_context(|| format!("map task {} failed", id))
    }

    async fn run_reduce(&self, task: ReduceTask) -> Result<String, Error> {
        let workload = self.workload;
        let config = self.config.clone();
        let id = task.id;

        tokio::task::spawn_blocking(move || {
            perform_reduce(
                &task,
                &workload,
                config.aux.clone(),
                &config.work_dir,
                config.sort_buffer,
            )
        })
        .await
        .map_err(|e| anyhow!("reduce task {} panicked: {}", id, e))?
        .with_context(|| format!("reduce task {} failed", id))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    fn config(dir: &TempDir) -> Arc<WorkerConfig> {
        let mut config = WorkerConfig::new(dir.path());
        config.request_timeout = Duration::from_millis(100);
        config.sort_buffer = 16;
        Arc::new(config)
    }

    fn wc() -> Workload {
        workload::try_named("wc").unwrap()
    }

    fn write_input(dir: &TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn single_worker_runs_the_whole_job() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "input.txt", "the quick fox the lazy fox");
        let coordinator = Arc::new(MRCoordinator::new(vec![input], 1).unwrap());

        let worker = MRWorker::new(0, coordinator.clone(), wc(), config(&dir));
        assert_eq!(worker.state(), WorkerState::Idle);
        let report = worker.run().await.unwrap();

        assert_eq!(report.exit, ExitReason::JobDone);
        assert_eq!(report.maps_completed, 1);
        assert_eq!(report.reduces_completed, 1);
        assert!(coordinator.is_job_done());
        assert_eq!(
            fs::read_to_string(dir.path().join("output-0")).unwrap(),
            "fox\t2\nlazy\t1\nquick\t1\nthe\t2\n"
        );
    }

    #[tokio::test]
    async fn failed_map_ends_the_loop_without_reporting() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.txt").to_string_lossy().into_owned();
        let coordinator = Arc::new(MRCoordinator::new(vec![missing], 1).unwrap());

        let worker = MRWorker::new(3, coordinator.clone(), wc(), config(&dir));
        let err = worker.run().await.unwrap_err();
        assert!(format!("{err:#}").contains("failed to read input file"));

        let status = coordinator.status().await;
        assert_eq!(status.maps_completed, 0);
        assert_eq!(status.tasks_in_flight(), 1);
        assert!(!coordinator.is_job_done());
    }

    #[tokio::test]
    async fn shutdown_stops_an_idle_worker() {
        let dir = TempDir::new().unwrap();
        let coordinator = Arc::new(MRCoordinator::new(vec!["unused".to_string()], 1).unwrap());
        coordinator.shutdown();

        let report = MRWorker::new(1, coordinator, wc(), config(&dir))
            .run()
            .await
            .unwrap();
        assert_eq!(report.exit, ExitReason::Interrupted);
        assert_eq!(report.maps_completed, 0);
    }
}
