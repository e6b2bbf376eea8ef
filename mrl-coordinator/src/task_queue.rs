use std::collections::{HashSet, VecDeque};

use common::{MapTask, ReduceTask, TaskId};

/// A task the queue can tell apart from its siblings.
pub trait Identified {
    fn id(&self) -> TaskId;
}

impl Identified for MapTask {
    fn id(&self) -> TaskId {
        self.id
    }
}

impl Identified for ReduceTask {
    fn id(&self) -> TaskId {
        self.id
    }
}

#[derive(Debug)]
/// Pending task queue.
///
/// Tasks are handed out at most once: a popped task is gone from the queue
/// whether or not it is ever completed.
pub struct TaskQueue<T> {
    /// Tasks not yet handed out.
    tasks: VecDeque<T>,

    /// Ids of the tasks popped so far.
    handed_out: HashSet<TaskId>,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self {
            tasks: VecDeque::new(),
            handed_out: HashSet::new(),
        }
    }
}

impl<T: Identified> TaskQueue<T> {
    /// Default Ctor.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of tasks waiting to be handed out.
    pub fn number_of_tasks_pending(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the task with this id has left the queue.
    pub fn was_handed_out(&self, id: TaskId) -> bool {
        self.handed_out.contains(&id)
    }

    /// Push new task.
    pub fn push_task(&mut self, task: T) {
        self.tasks.push_back(task);
    }

    /// Return the oldest pending task.
    pub fn pop_task(&mut self) -> Option<T> {
        let task = self.tasks.pop_front()?;
        self.handed_out.insert(task.id());
        Some(task)
    }
}

impl<T> FromIterator<T> for TaskQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().collect(),
            handed_out: HashSet::new(),
        }
    }
}
