//! Shared data model and wire formats for the task board.
//!
//! - [`task`] and [`project`]: records persisted by the server.
//! - [`action`]: reversible mutation records kept in undo/redo stacks.
//! - [`event`] and [`channel`]: broadcast frames and the room protocol.
//! - [`api`]: JSON bodies of the persistence HTTP API.

pub mod action;
pub mod api;
pub mod channel;
pub mod codec;
pub mod event;
pub mod project;
pub mod task;

pub use action::Action;
pub use event::{BroadcastEvent, EventFrame, OriginTag};
pub use project::Project;
pub use task::{Priority, ProjectId, Task, TaskConfiguration, TaskId, ValidationError};
