//! JSON request and response bodies of the persistence HTTP API.
//!
//! | Method | Path | Request | Response |
//! |---|---|---|---|
//! | GET | `/api/projects` | — | `[Project]` |
//! | POST | `/api/projects` | [`CreateProjectRequest`] | `Project` |
//! | PUT | `/api/projects/{id}` | [`UpdateProjectRequest`] | [`SuccessResponse`] |
//! | DELETE | `/api/projects/{id}` | — | [`SuccessResponse`] |
//! | GET | `/api/projects/{id}/tasks` | — | `[Task]` |
//! | POST | `/api/projects/{id}/tasks` | [`CreateTaskRequest`] | `Task` |
//! | PUT | `/api/tasks/{id}` | [`UpdateTaskRequest`] | `Task` |
//! | DELETE | `/api/tasks/{id}` | — | [`SuccessResponse`] |
//! | GET | `/api/events` | — | `[BoardEvent]` |

use serde::{Deserialize, Serialize};

use crate::task::{TaskConfiguration, TaskId};

/// Body of `POST /api/projects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    /// Project name.
    pub description: String,
}

/// Body of `PUT /api/projects/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    /// New project name.
    pub description: String,
}

/// Body of `POST /api/projects/{id}/tasks`.
///
/// `id` is optional: the server mints one when absent, and keeps a
/// client-supplied one verbatim (used when re-creating a deleted task).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    /// Client-chosen task id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    /// Task title.
    pub title: String,
    /// Priority and description.
    #[serde(default)]
    pub configuration: TaskConfiguration,
}

/// Body of `PUT /api/tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    /// New title.
    pub title: String,
    /// New priority and description.
    #[serde(default)]
    pub configuration: TaskConfiguration,
}

/// `{ "success": true }` acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    /// Whether the operation succeeded.
    pub success: bool,
}

impl SuccessResponse {
    /// A successful acknowledgment.
    #[must_use]
    pub const fn ok() -> Self {
        Self { success: true }
    }
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error description.
    pub error: String,
}

/// Kind of a server-side event log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardEventKind {
    /// A task was created.
    Create,
    /// A task was updated.
    Update,
    /// A task was deleted.
    Delete,
}
