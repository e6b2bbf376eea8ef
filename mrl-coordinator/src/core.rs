use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use common::{Task, TaskId};

use crate::error::CoordinatorError;
use crate::jobs::{Completion, Job, JobState, JobStatus, NextTask};

/// Answer to a task request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResponse {
    /// A task for the caller to execute and report.
    Assigned(Task),

    /// Nothing could be handed out before the timeout. Ask again.
    NoTaskAvailable,

    /// Every task has completed.
    JobDone,
}

/// Hands out map and reduce tasks to workers in the same process and
/// sequences the map to reduce transition.
///
/// Every request and report takes one lock on the job, so the report that
/// completes the last map task is the only one that creates reduce tasks.
#[derive(Debug)]
pub struct MRCoordinator {
    job: Mutex<Job>,

    /// Woken on every recorded completion and on shutdown.
    progress: Notify,

    /// Set once, when the job completes. Readable without the lock.
    done: AtomicBool,

    shutdown: CancellationToken,
}

impl MRCoordinator {
    /// Create a coordinator with one map task per input file.
    pub fn new(input_files: Vec<String>, n_reduce: u32) -> Result<Self, CoordinatorError> {
        if n_reduce == 0 {
            return Err(CoordinatorError::InvalidPartitionCount);
        }

        info!(
            "Coordinator created with {} map tasks and {} reduce partitions",
            input_files.len(),
            n_reduce
        );

        Ok(Self {
            job: Mutex::new(Job::new(input_files, n_reduce)),
            progress: Notify::new(),
            done: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        })
    }

    /// Wait up to `timeout` for a task.
    ///
    /// Map tasks are served first; reduce tasks only after every map task
    /// has been reported complete. While work remains but none can be handed
    /// out, the request sleeps until another worker reports progress.
    pub async fn request_task(&self, timeout: Duration) -> Result<TaskResponse, CoordinatorError> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(CoordinatorError::Interrupted),
            response = tokio::time::timeout(timeout, self.wait_for_task()) => {
                Ok(response.unwrap_or(TaskResponse::NoTaskAvailable))
            }
        }
    }

    async fn wait_for_task(&self) -> TaskResponse {
        loop {
            // Register before looking at the job so a report landing between
            // the check and the await still wakes us.
            let mut notified = pin!(self.progress.notified());
            notified.as_mut().enable();

            {
                let mut job = self.job.lock().await;
                match job.next_task() {
                    NextTask::Assigned(task) => {
                        debug!("Handing out {}", task);
                        return TaskResponse::Assigned(task);
                    }
                    NextTask::Done => {
                        self.mark_done();
                        return TaskResponse::JobDone;
                    }
                    NextTask::Wait => {}
                }
            }

            notified.await;
        }
    }

    /// Record the intermediate files of a completed map task.
    ///
    /// `files[p]` names the file holding partition `p`.
    pub async fn report_map_complete(&self, task_id: TaskId, files: Vec<String>) {
        let completion = {
            let mut job = self.job.lock().await;
            job.complete_map(task_id, files)
        };
        debug!("Map task {} reported complete: {:?}", task_id, completion);
        self.progress.notify_waiters();
    }

    /// Record a completed reduce task.
    pub async fn report_reduce_complete(&self, task_id: TaskId) {
        let completion = {
            let mut job = self.job.lock().await;
            job.complete_reduce(task_id)
        };
        debug!("Reduce task {} reported complete: {:?}", task_id, completion);
        if completion == Completion::Advanced(JobState::Completed) {
            self.mark_done();
        }
        self.progress.notify_waiters();
    }

    /// Whether every task has completed. Does not wait for the lock.
    pub fn is_job_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Snapshot of the job's progress.
    pub async fn status(&self) -> JobStatus {
        self.job.lock().await.status()
    }

    /// Interrupt every current and future [`MRCoordinator::request_task`].
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Coordinator shutting down");
        }
        self.shutdown.cancel();
        self.progress.notify_waiters();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn mark_done(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            info!("All reduce tasks complete, job finished");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use common::codec::intermediate_file_name;
    use common::{MapTask, ReduceTask};

    use super::*;

    const SHORT: Duration = Duration::from_millis(50);
    const LONG: Duration = Duration::from_secs(5);

    fn inputs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("input-{i}.txt")).collect()
    }

    fn files_for(map_id: TaskId, n_reduce: u32) -> Vec<String> {
        (0..n_reduce)
            .map(|p| intermediate_file_name(map_id, p))
            .collect()
    }

    async fn take_map(coordinator: &MRCoordinator) -> MapTask {
        match coordinator.request_task(SHORT).await {
            Ok(TaskResponse::Assigned(Task::Map(task))) => task,
            other => panic!("expected a map task, got {other:?}"),
        }
    }

    async fn take_reduce(coordinator: &MRCoordinator) -> ReduceTask {
        match coordinator.request_task(SHORT).await {
            Ok(TaskResponse::Assigned(Task::Reduce(task))) => task,
            other => panic!("expected a reduce task, got {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_partitions() {
        let err = MRCoordinator::new(inputs(1), 0).unwrap_err();
        assert_eq!(err, CoordinatorError::InvalidPartitionCount);
    }

    #[tokio::test]
    async fn times_out_while_maps_are_in_flight() {
        let coordinator = MRCoordinator::new(inputs(1), 1).unwrap();
        take_map(&coordinator).await;

        let response = coordinator.request_task(SHORT).await.unwrap();
        assert_eq!(response, TaskResponse::NoTaskAvailable);
        assert!(!coordinator.is_job_done());
    }

    #[tokio::test]
    async fn full_job_in_order() {
        let coordinator = MRCoordinator::new(inputs(2), 2).unwrap();
        let m0 = take_map(&coordinator).await;
        let m1 = take_map(&coordinator).await;
        coordinator.report_map_complete(m0.id, files_for(m0.id, 2)).await;
        coordinator.report_map_complete(m1.id, files_for(m1.id, 2)).await;

        let r0 = take_reduce(&coordinator).await;
        assert_eq!(r0.partition_files, ["mr-0-0", "mr-1-0"]);
        let r1 = take_reduce(&coordinator).await;
        assert_eq!(r1.partition_files, ["mr-0-1", "mr-1-1"]);

        coordinator.report_reduce_complete(r0.id).await;
        assert!(!coordinator.is_job_done());
        coordinator.report_reduce_complete(r1.id).await;
        assert!(coordinator.is_job_done());

        let response = coordinator.request_task(SHORT).await.unwrap();
        assert_eq!(response, TaskResponse::JobDone);
        assert_eq!(coordinator.status().await.state, JobState::Completed);
    }

    #[tokio::test]
    async fn zero_inputs_serve_empty_reduce_tasks() {
        let coordinator = MRCoordinator::new(vec![], 2).unwrap();
        let r0 = take_reduce(&coordinator).await;
        let r1 = take_reduce(&coordinator).await;
        assert!(r0.partition_files.is_empty() && r1.partition_files.is_empty());

        coordinator.report_reduce_complete(r0.id).await;
        coordinator.report_reduce_complete(r1.id).await;
        assert_eq!(
            coordinator.request_task(SHORT).await.unwrap(),
            TaskResponse::JobDone
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn waiting_request_wakes_when_the_last_map_completes() {
        let coordinator = Arc::new(MRCoordinator::new(inputs(1), 1).unwrap());
        let map = take_map(&coordinator).await;

        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.request_task(LONG).await })
        };
        tokio::time::sleep(SHORT).await;
        coordinator.report_map_complete(map.id, files_for(map.id, 1)).await;

        let response = tokio::time::timeout(LONG, waiter)
            .await
            .expect("waiter was not woken")
            .unwrap()
            .unwrap();
        match response {
            TaskResponse::Assigned(Task::Reduce(task)) => {
                assert_eq!(task.partition_files, ["mr-0-0"])
            }
            other => panic!("expected a reduce task, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_interrupts_waiting_requests() {
        let coordinator = Arc::new(MRCoordinator::new(inputs(1), 1).unwrap());
        take_map(&coordinator).await;

        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.request_task(LONG).await })
        };
        tokio::time::sleep(SHORT).await;
        coordinator.shutdown();

        let result = waiter.await.unwrap();
        assert_eq!(result, Err(CoordinatorError::Interrupted));
        assert!(coordinator.is_shut_down());
        assert_eq!(
            coordinator.request_task(SHORT).await,
            Err(CoordinatorError::Interrupted)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_workers_create_reduce_tasks_once() {
        const N_MAP: usize = 64;
        const N_REDUCE: u32 = 5;
        const N_WORKERS: usize = 16;

        let coordinator = Arc::new(MRCoordinator::new(inputs(N_MAP), N_REDUCE).unwrap());
        let mut handles = Vec::new();

        for _ in 0..N_WORKERS {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                loop {
                    match coordinator.request_task(LONG).await.unwrap() {
                        TaskResponse::Assigned(Task::Map(task)) => {
                            tokio::task::yield_now().await;
                            coordinator
                                .report_map_complete(task.id, files_for(task.id, N_REDUCE))
                                .await;
                            seen.push(Task::Map(task));
                        }
                        TaskResponse::Assigned(Task::Reduce(task)) => {
                            coordinator.report_reduce_complete(task.id).await;
                            seen.push(Task::Reduce(task));
                        }
                        TaskResponse::NoTaskAvailable => {}
                        TaskResponse::JobDone => return seen,
                    }
                }
            }));
        }

        let mut maps = HashSet::new();
        let mut reduces = Vec::new();
        for handle in handles {
            for task in handle.await.unwrap() {
                match task {
                    Task::Map(task) => assert!(maps.insert(task.id)),
                    Task::Reduce(task) => reduces.push(task),
                }
            }
        }

        assert_eq!(maps.len(), N_MAP);
        assert_eq!(reduces.len(), N_REDUCE as usize);
        let ids = reduces.iter().map(|t| t.id).collect::<HashSet<_>>();
        assert_eq!(ids, (0..N_REDUCE).collect::<HashSet<_>>());
        for task in &reduces {
            assert_eq!(task.partition_files.len(), N_MAP);
            let expected = (0..N_MAP as TaskId)
                .map(|m| intermediate_file_name(m, task.id))
                .collect::<Vec<_>>();
            assert_eq!(task.partition_files, expected);
        }
        assert!(coordinator.is_job_done());
    }
}
