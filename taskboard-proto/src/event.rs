//! Broadcast events exchanged inside a project room.
//!
//! Every [`EventFrame`] optionally carries an [`OriginTag`] minted by the
//! publishing client. A client recognises its own echo by matching the tag
//! against the tags it is still awaiting, so several in-flight mutations can
//! be told apart.

use serde::{Deserialize, Serialize};

use crate::task::{ProjectId, Task, TaskId};

/// Identifies one locally initiated mutation: the publishing client, the
/// session it runs in, and a per-session monotonic sequence number.
///
/// `client_id` is a display name and may be shared by several sessions.
/// `session` is minted fresh by every running client, so `(session, seq)`
/// alone decides whether a frame is an echo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginTag {
    /// Configured name of the publishing client.
    pub client_id: String,
    /// Per-process session nonce.
    pub session: String,
    /// Monotonic sequence number within that session.
    pub seq: u64,
}

impl std::fmt::Display for OriginTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}#{}", self.client_id, self.session, self.seq)
    }
}

/// A task mutation announced to a project room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastEvent {
    /// `task:create` — carries the full new task.
    TaskCreate(Task),
    /// `task:update` — carries the full updated task.
    TaskUpdate(Task),
    /// `task:delete` — carries only the id and its project.
    TaskDelete {
        /// Deleted task.
        id: TaskId,
        /// Project the task belonged to.
        project_id: ProjectId,
    },
}

impl BroadcastEvent {
    /// Wire event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TaskCreate(_) => "task:create",
            Self::TaskUpdate(_) => "task:update",
            Self::TaskDelete { .. } => "task:delete",
        }
    }

    /// Project whose room this event belongs to.
    #[must_use]
    pub fn project_id(&self) -> &ProjectId {
        match self {
            Self::TaskCreate(task) | Self::TaskUpdate(task) => &task.project_id,
            Self::TaskDelete { project_id, .. } => project_id,
        }
    }

    /// Id of the task the event concerns.
    #[must_use]
    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::TaskCreate(task) | Self::TaskUpdate(task) => &task.id,
            Self::TaskDelete { id, .. } => id,
        }
    }
}

/// One event as carried on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFrame {
    /// Tag of the mutation that produced this event, if the publisher set one.
    pub origin: Option<OriginTag>,
    /// The event itself.
    pub event: BroadcastEvent,
}

impl EventFrame {
    /// Frame published on behalf of the mutation identified by `origin`.
    #[must_use]
    pub const fn tagged(origin: OriginTag, event: BroadcastEvent) -> Self {
        Self {
            origin: Some(origin),
            event,
        }
    }

    /// Frame without an origin tag (never treated as an echo).
    #[must_use]
    pub const fn untagged(event: BroadcastEvent) -> Self {
        Self {
            origin: None,
            event,
        }
    }
}
