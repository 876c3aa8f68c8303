//! Reversible records of task mutations.
//!
//! An [`Action`] holds enough state to replay a mutation forward or to
//! invert it. Actions are serialized to JSON as
//! `{"type": "create" | "update" | "delete", "task"?, "before"?, "after"?}`.

use serde::{Deserialize, Serialize};

use crate::event::BroadcastEvent;
use crate::task::{ProjectId, Task, TaskId};

/// A reversible task mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// A task was inserted.
    Create {
        /// The inserted task.
        task: Task,
    },
    /// A task was removed.
    Delete {
        /// Full snapshot of the task at deletion time.
        task: Task,
    },
    /// A task's title or configuration changed.
    Update {
        /// Task state before the change.
        before: Task,
        /// Task state after the change.
        after: Task,
    },
}

impl Action {
    /// Project the mutated task belongs to.
    #[must_use]
    pub fn project_id(&self) -> &ProjectId {
        match self {
            Self::Create { task } | Self::Delete { task } => &task.project_id,
            Self::Update { after, .. } => &after.project_id,
        }
    }

    /// Id of the mutated task.
    #[must_use]
    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::Create { task } | Self::Delete { task } => &task.id,
            Self::Update { after, .. } => &after.id,
        }
    }

    /// Short lowercase kind, matching the serialized `type` tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Delete { .. } => "delete",
            Self::Update { .. } => "update",
        }
    }

    /// The action whose forward effect undoes this one.
    ///
    /// `Create(t)` inverts to `Delete(t)`, `Delete(t)` to `Create(t)` (same id
    /// and content), and `Update(b, a)` to `Update(a, b)`.
    #[must_use]
    pub fn inverse(&self) -> Self {
        match self {
            Self::Create { task } => Self::Delete { task: task.clone() },
            Self::Delete { task } => Self::Create { task: task.clone() },
            Self::Update { before, after } => Self::Update {
                before: after.clone(),
                after: before.clone(),
            },
        }
    }

    /// Broadcast event announcing this action's forward effect.
    #[must_use]
    pub fn to_event(&self) -> BroadcastEvent {
        match self {
            Self::Create { task } => BroadcastEvent::TaskCreate(task.clone()),
            Self::Update { after, .. } => BroadcastEvent::TaskUpdate(after.clone()),
            Self::Delete { task } => BroadcastEvent::TaskDelete {
                id: task.id.clone(),
                project_id: task.project_id.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Priority, TaskConfiguration};

    fn task(title: &str) -> Task {
        Task {
            id: TaskId::from_string("t1"),
            project_id: ProjectId::from_string("p1"),
            title: title.to_string(),
            configuration: TaskConfiguration::default(),
        }
    }

    #[test]
    fn create_serializes_with_type_tag() {
        let action = Action::Create { task: task("A") };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "create");
        assert_eq!(value["task"]["title"], "A");
        assert!(value.get("before").is_none());
    }

    #[test]
    fn update_serializes_before_and_after() {
        let action = Action::Update {
            before: task("A"),
            after: task("B"),
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "update");
        assert_eq!(value["before"]["title"], "A");
        assert_eq!(value["after"]["title"], "B");
    }

    #[test]
    fn decodes_record_without_configuration() {
        let json = r#"{"type":"delete","task":{"id":"t1","project_id":"p1","title":"A"}}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action, Action::Delete { task: task("A") });
    }

    #[test]
    fn inverse_of_create_is_delete_of_same_snapshot() {
        let action = Action::Create { task: task("A") };
        assert_eq!(action.inverse(), Action::Delete { task: task("A") });
    }

    #[test]
    fn inverse_of_update_swaps_states() {
        let mut after = task("B");
        after.configuration = TaskConfiguration::new(Priority::High, "x");
        let action = Action::Update {
            before: task("A"),
            after: after.clone(),
        };
        assert_eq!(
            action.inverse(),
            Action::Update {
                before: after,
                after: task("A"),
            }
        );
    }

    #[test]
    fn inverse_is_an_involution() {
        let actions = [
            Action::Create { task: task("A") },
            Action::Delete { task: task("A") },
            Action::Update {
                before: task("A"),
                after: task("B"),
            },
        ];
        for action in &actions {
            assert_eq!(&action.inverse().inverse(), action);
        }
    }

    #[test]
    fn to_event_uses_forward_payload() {
        let update = Action::Update {
            before: task("A"),
            after: task("B"),
        };
        assert_eq!(update.to_event(), BroadcastEvent::TaskUpdate(task("B")));

        let delete = Action::Delete { task: task("A") };
        assert_eq!(
            delete.to_event(),
            BroadcastEvent::TaskDelete {
                id: TaskId::from_string("t1"),
                project_id: ProjectId::from_string("p1"),
            }
        );
    }

    #[test]
    fn scope_accessors() {
        let action = Action::Update {
            before: task("A"),
            after: task("B"),
        };
        assert_eq!(action.project_id().as_str(), "p1");
        assert_eq!(action.task_id().as_str(), "t1");
        assert_eq!(action.kind(), "update");
    }
}
