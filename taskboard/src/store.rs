//! Ordered in-memory view of the active project's tasks.
//!
//! The [`TaskStore`] is the client's local copy of the board. It is only
//! mutated through the sync coordinator (optimistic local changes and
//! inbound broadcast events) and never holds two tasks with the same id.

use taskboard_proto::{Task, TaskId};

/// Ordered task list of the active project.
#[derive(Debug, Default, Clone)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Replaces the whole list, e.g. with a fresh reconciliation baseline.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks.clear();
        for task in tasks {
            self.insert(task);
        }
    }

    /// Appends a task. A task whose id is already present replaces the
    /// existing entry in place.
    pub fn insert(&mut self, task: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
        } else {
            self.tasks.push(task);
        }
    }

    /// Inserts a task at `index` (clamped to the list length). Used to put a
    /// task back where it was after a failed delete.
    pub fn insert_at(&mut self, index: usize, task: Task) {
        if self.tasks.iter().any(|t| t.id == task.id) {
            self.insert(task);
            return;
        }
        let index = index.min(self.tasks.len());
        self.tasks.insert(index, task);
    }

    /// Replaces the task with the same id, returning the previous value.
    /// Returns `None` and leaves the store unchanged if the id is unknown.
    pub fn replace(&mut self, task: Task) -> Option<Task> {
        let slot = self.tasks.iter_mut().find(|t| t.id == task.id)?;
        Some(std::mem::replace(slot, task))
    }

    /// Removes a task by id, returning it.
    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let index = self.position(id)?;
        Some(self.tasks.remove(index))
    }

    /// Position of a task in the list.
    #[must_use]
    pub fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| &t.id == id)
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// All tasks in display order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the store holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Removes every task.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}
