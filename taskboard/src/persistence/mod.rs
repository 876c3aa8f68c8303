//! Persistence service abstraction.
//!
//! Defines the [`PersistenceService`] trait through which the client reads
//! and writes projects and tasks. Concrete implementations:
//! - [`http::HttpPersistence`] — JSON HTTP client for `taskboard-server`
//! - [`memory::InMemoryPersistence`] — shared in-process backend for testing

pub mod http;
pub mod memory;

use taskboard_proto::{Project, ProjectId, Task, TaskId};

/// Errors returned by a persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// The request could not be sent or no response arrived.
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with an unexpected status.
    #[error("service returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error text from the response body.
        message: String,
    },

    /// The addressed project or task does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Async access to the remote record of projects and tasks.
///
/// The remote system is the source of truth. Task mutations carry the full
/// task, including a client-chosen id, so re-creating a deleted task keeps
/// its identity.
pub trait PersistenceService: Send + Sync {
    /// List every project.
    fn list_projects(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Project>, PersistenceError>> + Send;

    /// Create a project and return it with its assigned id.
    fn create_project(
        &self,
        description: &str,
    ) -> impl std::future::Future<Output = Result<Project, PersistenceError>> + Send;

    /// Rename a project.
    fn update_project(
        &self,
        id: &ProjectId,
        description: &str,
    ) -> impl std::future::Future<Output = Result<(), PersistenceError>> + Send;

    /// Delete a project and its tasks.
    fn delete_project(
        &self,
        id: &ProjectId,
    ) -> impl std::future::Future<Output = Result<(), PersistenceError>> + Send;

    /// List a project's tasks in display order.
    fn list_tasks(
        &self,
        project: &ProjectId,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, PersistenceError>> + Send;

    /// Create `task` in its project, keeping its id.
    fn create_task(
        &self,
        task: &Task,
    ) -> impl std::future::Future<Output = Result<Task, PersistenceError>> + Send;

    /// Overwrite the title and configuration of `task`.
    fn update_task(
        &self,
        task: &Task,
    ) -> impl std::future::Future<Output = Result<Task, PersistenceError>> + Send;

    /// Delete a task.
    fn delete_task(
        &self,
        id: &TaskId,
    ) -> impl std::future::Future<Output = Result<(), PersistenceError>> + Send;
}
