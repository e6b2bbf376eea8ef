//! Units of work handed from the coordinator to workers.

use std::fmt;

/// Identity of a task, unique within its kind.
///
/// Map task ids are the input file's position; reduce task ids are the
/// partition index.
pub type TaskId = u32;

/// The kind of a task, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Map,
    Reduce,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Map => f.write_str("map"),
            TaskKind::Reduce => f.write_str("reduce"),
        }
    }
}

/// Apply the map function to one input file and partition its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapTask {
    pub id: TaskId,

    /// Path of the input file, as supplied to the coordinator.
    pub input_file: String,

    /// Number of partitions to split the output into.
    pub n_reduce: u32,
}

/// Sort, group and reduce every intermediate record of one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceTask {
    pub id: TaskId,

    /// Intermediate file names, one per map task, in map task order.
    pub partition_files: Vec<String>,
}

/// A task handed out by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Map(MapTask),
    Reduce(ReduceTask),
}

impl Task {
    pub fn id(&self) -> TaskId {
        match self {
            Task::Map(task) => task.id,
            Task::Reduce(task) => task.id,
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Map(_) => TaskKind::Map,
            Task::Reduce(_) => TaskKind::Reduce,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} task {}", self.kind(), self.id())
    }
}
