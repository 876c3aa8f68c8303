//! Per-project undo/redo stacks and their durable storage.
//!
//! The [`ActionLog`] keeps, for every project, a History stack (tail = most
//! recent) and a Future stack (head = next redo). Both are bounded: when
//! History grows past its capacity the oldest entry is evicted.
//!
//! Snapshots of the log are written through the [`UndoLogStore`] trait after
//! every change so the stacks survive a restart. Implementations:
//! - [`file::FileUndoLogStore`] — JSON file on local disk
//! - [`memory::InMemoryUndoLogStore`] — in-memory store for testing

pub mod file;
pub mod memory;

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use taskboard_proto::{Action, ProjectId};

/// Default number of actions retained per project.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Errors that can occur while loading or saving the undo log.
#[derive(Debug, thiserror::Error)]
pub enum UndoLogError {
    /// Reading or writing the backing storage failed.
    #[error("undo log I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored log could not be parsed or serialized.
    #[error("undo log is malformed: {0}")]
    Format(#[from] serde_json::Error),

    /// The storage refused the operation.
    #[error("undo log unavailable: {0}")]
    Unavailable(String),
}

/// History and Future of one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectStacks {
    /// Applied actions, oldest first.
    pub history: VecDeque<Action>,
    /// Undone actions, next redo first.
    pub future: VecDeque<Action>,
}

impl ProjectStacks {
    fn is_empty(&self) -> bool {
        self.history.is_empty() && self.future.is_empty()
    }

    fn truncate_to(&mut self, capacity: usize) {
        while self.history.len() > capacity {
            self.history.pop_front();
        }
        self.future.truncate(capacity);
    }
}

/// Serializable image of the whole log.
///
/// JSON shape: `{"projects": {"<id>": {"history": [...], "future": [...]}}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoLogSnapshot {
    /// Stacks keyed by project.
    pub projects: BTreeMap<ProjectId, ProjectStacks>,
}

/// Durable storage for undo log snapshots.
pub trait UndoLogStore: Send + Sync {
    /// Load the last saved snapshot. An absent log loads as empty.
    fn load(&self) -> impl std::future::Future<Output = Result<UndoLogSnapshot, UndoLogError>> + Send;

    /// Replace the stored snapshot.
    fn save(
        &self,
        snapshot: &UndoLogSnapshot,
    ) -> impl std::future::Future<Output = Result<(), UndoLogError>> + Send;
}

/// Bounded per-project undo/redo stacks.
#[derive(Debug, Clone)]
pub struct ActionLog {
    projects: BTreeMap<ProjectId, ProjectStacks>,
    capacity: usize,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ActionLog {
    /// Creates an empty log retaining at most `capacity` actions per stack.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            projects: BTreeMap::new(),
            capacity,
        }
    }

    /// Rebuilds a log from a stored snapshot, trimming stacks that exceed
    /// `capacity`.
    #[must_use]
    pub fn from_snapshot(snapshot: UndoLogSnapshot, capacity: usize) -> Self {
        let mut projects = snapshot.projects;
        projects.retain(|_, stacks| {
            stacks.truncate_to(capacity);
            !stacks.is_empty()
        });
        Self { projects, capacity }
    }

    /// Copies the current state into a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> UndoLogSnapshot {
        UndoLogSnapshot {
            projects: self.projects.clone(),
        }
    }

    /// Maximum actions retained per stack.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a freshly applied action to its project's History and clears
    /// that project's Future.
    pub fn record(&mut self, action: Action) {
        let stacks = self.projects.entry(action.project_id().clone()).or_default();
        stacks.history.push_back(action);
        stacks.future.clear();
        stacks.truncate_to(self.capacity);
    }

    /// Moves the most recent History entry to the head of Future and returns
    /// it. `None` if History is empty.
    pub fn take_undo(&mut self, project: &ProjectId) -> Option<Action> {
        let stacks = self.projects.get_mut(project)?;
        let action = stacks.history.pop_back()?;
        stacks.future.push_front(action.clone());
        stacks.truncate_to(self.capacity);
        Some(action)
    }

    /// Moves the head of Future to the tail of History and returns it.
    /// `None` if Future is empty.
    pub fn take_redo(&mut self, project: &ProjectId) -> Option<Action> {
        let stacks = self.projects.get_mut(project)?;
        let action = stacks.future.pop_front()?;
        stacks.history.push_back(action.clone());
        stacks.truncate_to(self.capacity);
        Some(action)
    }

    /// Drops the head of Future without moving it anywhere.
    pub fn discard_redo(&mut self, project: &ProjectId) -> Option<Action> {
        self.projects.get_mut(project)?.future.pop_front()
    }

    /// Drops the tail of History without moving it anywhere.
    pub fn discard_undo(&mut self, project: &ProjectId) -> Option<Action> {
        self.projects.get_mut(project)?.history.pop_back()
    }

    /// History of a project, oldest first.
    #[must_use]
    pub fn history(&self, project: &ProjectId) -> Vec<Action> {
        self.projects
            .get(project)
            .map(|s| s.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Future of a project, next redo first.
    #[must_use]
    pub fn future(&self, project: &ProjectId) -> Vec<Action> {
        self.projects
            .get(project)
            .map(|s| s.future.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether the project has anything to undo.
    #[must_use]
    pub fn can_undo(&self, project: &ProjectId) -> bool {
        self.projects
            .get(project)
            .is_some_and(|s| !s.history.is_empty())
    }

    /// Whether the project has anything to redo.
    #[must_use]
    pub fn can_redo(&self, project: &ProjectId) -> bool {
        self.projects
            .get(project)
            .is_some_and(|s| !s.future.is_empty())
    }

    /// Drops both stacks of a project.
    pub fn remove_project(&mut self, project: &ProjectId) -> bool {
        self.projects.remove(project).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_proto::{Task, TaskConfiguration, TaskId};

    fn create(project: &str, id: &str) -> Action {
        Action::Create {
            task: Task {
                id: TaskId::from_string(id),
                project_id: ProjectId::from_string(project),
                title: id.to_string(),
                configuration: TaskConfiguration::default(),
            },
        }
    }

    fn pid(s: &str) -> ProjectId {
        ProjectId::from_string(s)
    }

    #[test]
    fn record_appends_to_history() {
        let mut log = ActionLog::default();
        log.record(create("p1", "a"));
        log.record(create("p1", "b"));
        assert_eq!(log.history(&pid("p1")), vec![create("p1", "a"), create("p1", "b")]);
        assert!(log.future(&pid("p1")).is_empty());
    }

    #[test]
    fn undo_moves_tail_to_future_head() {
        let mut log = ActionLog::default();
        log.record(create("p1", "a"));
        log.record(create("p1", "b"));

        assert_eq!(log.take_undo(&pid("p1")), Some(create("p1", "b")));
        assert_eq!(log.take_undo(&pid("p1")), Some(create("p1", "a")));
        assert_eq!(log.future(&pid("p1")), vec![create("p1", "a"), create("p1", "b")]);
        assert!(!log.can_undo(&pid("p1")));
    }

    #[test]
    fn redo_moves_future_head_back() {
        let mut log = ActionLog::default();
        log.record(create("p1", "a"));
        log.take_undo(&pid("p1"));

        assert_eq!(log.take_redo(&pid("p1")), Some(create("p1", "a")));
        assert_eq!(log.history(&pid("p1")), vec![create("p1", "a")]);
        assert!(!log.can_redo(&pid("p1")));
    }

    #[test]
    fn discard_drops_without_moving() {
        let mut log = ActionLog::default();
        log.record(create("p1", "a"));
        log.record(create("p1", "b"));
        log.take_undo(&pid("p1"));

        assert_eq!(log.discard_redo(&pid("p1")), Some(create("p1", "b")));
        assert_eq!(log.history(&pid("p1")), vec![create("p1", "a")]);
        assert_eq!(log.discard_undo(&pid("p1")), Some(create("p1", "a")));
        assert!(!log.can_undo(&pid("p1")));
        assert!(!log.can_redo(&pid("p1")));
    }

    #[test]
    fn empty_stacks_return_none() {
        let mut log = ActionLog::default();
        assert_eq!(log.take_undo(&pid("p1")), None);
        assert_eq!(log.take_redo(&pid("p1")), None);
        assert_eq!(log.discard_undo(&pid("p1")), None);
        assert_eq!(log.discard_redo(&pid("p1")), None);
    }

    #[test]
    fn new_record_clears_future() {
        let mut log = ActionLog::default();
        log.record(create("p1", "a"));
        log.take_undo(&pid("p1"));
        assert!(log.can_redo(&pid("p1")));

        log.record(create("p1", "b"));
        assert!(!log.can_redo(&pid("p1")));
    }

    #[test]
    fn projects_are_isolated() {
        let mut log = ActionLog::default();
        log.record(create("p1", "a"));
        log.record(create("p2", "b"));

        assert_eq!(log.take_undo(&pid("p2")), Some(create("p2", "b")));
        assert_eq!(log.history(&pid("p1")), vec![create("p1", "a")]);
        assert!(!log.can_redo(&pid("p1")));
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut log = ActionLog::new(3);
        for id in ["a", "b", "c", "d", "e"] {
            log.record(create("p1", id));
        }
        assert_eq!(
            log.history(&pid("p1")),
            vec![create("p1", "c"), create("p1", "d"), create("p1", "e")]
        );
    }

    #[test]
    fn snapshot_round_trip_trims_to_capacity() {
        let mut log = ActionLog::new(10);
        for id in ["a", "b", "c", "d"] {
            log.record(create("p1", id));
        }
        log.take_undo(&pid("p1"));

        let restored = ActionLog::from_snapshot(log.snapshot(), 2);
        assert_eq!(
            restored.history(&pid("p1")),
            vec![create("p1", "b"), create("p1", "c")]
        );
        assert_eq!(restored.future(&pid("p1")), vec![create("p1", "d")]);
    }

    #[test]
    fn snapshot_json_shape() {
        let mut log = ActionLog::default();
        log.record(create("p1", "a"));
        let value = serde_json::to_value(log.snapshot()).unwrap();
        assert_eq!(value["projects"]["p1"]["history"][0]["type"], "create");
        assert!(value["projects"]["p1"]["future"].as_array().unwrap().is_empty());
    }

    #[test]
    fn remove_project_drops_stacks() {
        let mut log = ActionLog::default();
        log.record(create("p1", "a"));
        assert!(log.remove_project(&pid("p1")));
        assert!(!log.can_undo(&pid("p1")));
        assert!(!log.remove_project(&pid("p1")));
    }
}
