use std::collections::{BTreeMap, HashSet};
use std::fmt;

use tracing::{info, warn};

use common::{MapTask, ReduceTask, Task, TaskId};

use crate::task_queue::TaskQueue;

/// State of the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Mapping phase. Reduce tasks do not exist yet.
    Mapping,

    /// Reducing phase. Every map task has completed.
    Reducing,

    /// Job completed.
    Completed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Mapping => f.write_str("mapping"),
            JobState::Reducing => f.write_str("reducing"),
            JobState::Completed => f.write_str("completed"),
        }
    }
}

/// What the coordinator should answer to a task request right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextTask {
    /// Hand this task to the caller.
    Assigned(Task),

    /// Work remains but none of it can be handed out yet.
    Wait,

    /// Every map and reduce task has completed.
    Done,
}

/// Result of recording a completion report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The report was counted.
    Recorded,

    /// The report was counted and moved the job to its next state.
    Advanced(JobState),

    /// Duplicate, unknown or never handed out task id; nothing changed.
    Ignored,
}

/// Point-in-time view of a job's progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub state: JobState,
    pub maps_pending: usize,
    pub maps_completed: usize,
    pub maps_total: usize,
    pub reduces_pending: usize,
    pub reduces_completed: usize,
    pub reduces_total: usize,
}

impl JobStatus {
    /// Tasks handed out but never reported complete.
    pub fn tasks_in_flight(&self) -> usize {
        let maps_in_flight = self
            .maps_total
            .saturating_sub(self.maps_pending + self.maps_completed);
        let reduces_in_flight = match self.state {
            JobState::Mapping => 0,
            _ => self
                .reduces_total
                .saturating_sub(self.reduces_pending + self.reduces_completed),
        };
        maps_in_flight + reduces_in_flight
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: map {}/{} done ({} pending), reduce {}/{} done ({} pending)",
            self.state,
            self.maps_completed,
            self.maps_total,
            self.maps_pending,
            self.reduces_completed,
            self.reduces_total,
            self.reduces_pending,
        )
    }
}

/// A job context: every task queue and completion counter of one run.
///
/// All methods are synchronous. The coordinator calls them under a single
/// lock, which is what makes the map to reduce transition happen once.
#[derive(Debug)]
pub struct Job {
    /// The current state of the job.
    state: JobState,

    /// Number of map tasks, one per input file.
    n_map: usize,

    /// Number of reduce partitions.
    n_reduce: u32,

    map_tasks: TaskQueue<MapTask>,

    reduce_tasks: TaskQueue<ReduceTask>,

    /// Intermediate files reported by each completed map task, indexed by
    /// partition.
    intermediate_files: BTreeMap<TaskId, Vec<String>>,

    completed_reduces: HashSet<TaskId>,
}

impl Job {
    /// Create one map task per input file. With no input files the map
    /// phase is already over and the reduce tasks are created right away.
    ///
    /// `n_reduce` must be positive.
    pub fn new(input_files: Vec<String>, n_reduce: u32) -> Self {
        let n_map = input_files.len();
        let map_tasks = input_files
            .into_iter()
            .enumerate()
            .map(|(index, input_file)| MapTask {
                id: index as TaskId,
                input_file,
                n_reduce,
            })
            .collect();

        let mut job = Self {
            state: JobState::Mapping,
            n_map,
            n_reduce,
            map_tasks,
            reduce_tasks: TaskQueue::new(),
            intermediate_files: BTreeMap::new(),
            completed_reduces: HashSet::new(),
        };

        if n_map == 0 {
            job.create_reduce_tasks();
        }

        job
    }

    pub fn all_maps_completed(&self) -> bool {
        self.intermediate_files.len() == self.n_map
    }

    pub fn all_reduces_completed(&self) -> bool {
        self.completed_reduces.len() == self.n_reduce as usize
    }

    /// Decide what to hand out next.
    ///
    /// Map tasks go first. Reduce tasks go only once every map task has
    /// completed. When everything has completed the job moves to
    /// [`JobState::Completed`].
    pub fn next_task(&mut self) -> NextTask {
        if let Some(task) = self.map_tasks.pop_task() {
            return NextTask::Assigned(Task::Map(task));
        }

        if self.all_maps_completed() {
            if let Some(task) = self.reduce_tasks.pop_task() {
                return NextTask::Assigned(Task::Reduce(task));
            }

            if self.all_reduces_completed() {
                self.state = JobState::Completed;
                return NextTask::Done;
            }
        }

        NextTask::Wait
    }

    /// Record the intermediate files of a completed map task.
    ///
    /// `files[p]` must name the file holding partition `p`. The report that
    /// completes the last map task creates the reduce tasks. Only tasks that
    /// were handed out can complete.
    pub fn complete_map(&mut self, task_id: TaskId, files: Vec<String>) -> Completion {
        if task_id as usize >= self.n_map {
            warn!("Ignoring completion of unknown map task {}", task_id);
            return Completion::Ignored;
        }
        if !self.map_tasks.was_handed_out(task_id) {
            warn!("Ignoring completion of map task {} that was never handed out", task_id);
            return Completion::Ignored;
        }
        if self.intermediate_files.contains_key(&task_id) {
            warn!("Ignoring duplicate completion of map task {}", task_id);
            return Completion::Ignored;
        }

        self.intermediate_files.insert(task_id, files);

        if self.all_maps_completed() {
            self.create_reduce_tasks();
            return Completion::Advanced(JobState::Reducing);
        }

        Completion::Recorded
    }

    /// Record a completed reduce task.
    pub fn complete_reduce(&mut self, task_id: TaskId) -> Completion {
        if self.state == JobState::Mapping || task_id >= self.n_reduce {
            warn!("Ignoring completion of unknown reduce task {}", task_id);
            return Completion::Ignored;
        }
        if !self.reduce_tasks.was_handed_out(task_id) {
            warn!("Ignoring completion of reduce task {} that was never handed out", task_id);
            return Completion::Ignored;
        }
        if !self.completed_reduces.insert(task_id) {
            warn!("Ignoring duplicate completion of reduce task {}", task_id);
            return Completion::Ignored;
        }

        if self.all_reduces_completed() {
            self.state = JobState::Completed;
            return Completion::Advanced(JobState::Completed);
        }

        Completion::Recorded
    }

    pub fn status(&self) -> JobStatus {
        JobStatus {
            state: self.state,
            maps_pending: self.map_tasks.number_of_tasks_pending(),
            maps_completed: self.intermediate_files.len(),
            maps_total: self.n_map,
            reduces_pending: self.reduce_tasks.number_of_tasks_pending(),
            reduces_completed: self.completed_reduces.len(),
            reduces_total: self.n_reduce as usize,
        }
    }

    /// Build one reduce task per partition from the files every map task
    /// produced for it, in map task order.
    fn create_reduce_tasks(&mut self) {
        for partition in 0..self.n_reduce {
            let partition_files = self
                .intermediate_files
                .values()
                .filter_map(|files| files.get(partition as usize).cloned())
                .collect();

            self.reduce_tasks.push_task(ReduceTask {
                id: partition,
                partition_files,
            });
        }

        self.state = JobState::Reducing;
        info!(
            "All {} map tasks complete, created {} reduce tasks",
            self.n_map, self.n_reduce
        );
    }
}
