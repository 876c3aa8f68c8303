//! Optimistic task synchronisation with undo/redo.
//!
//! [`SyncCoordinator`] is the single path through which the board changes.
//! Its behaviour is split across three files:
//! - [`coordinator`]: local mutations and project passthroughs
//! - [`listener`]: opening projects and applying inbound broadcasts
//! - [`undo`]: walking the per-project History and Future stacks

pub mod coordinator;
pub mod listener;
pub mod undo;

pub use coordinator::SyncCoordinator;

use taskboard_proto::ValidationError;

use crate::channel::ChannelError;
use crate::persistence::PersistenceError;

/// Errors surfaced by board operations.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// The remote call failed; the local change was rolled back.
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    /// Joining or leaving a project room failed.
    #[error("broadcast channel failed: {0}")]
    Channel(#[from] ChannelError),

    /// The addressed task is not on the board.
    #[error("task not found: {0}")]
    NotFound(String),

    /// Nothing to do, e.g. undo with an empty History.
    #[error("{0}")]
    NoOp(&'static str),

    /// The input was rejected before any change was made.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The operation needs an open project.
    #[error("no project is open")]
    NoActiveProject,
}

/// What [`SyncCoordinator::handle_event`] did with an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Our own mutation coming back; already applied, so skipped.
    Echo,
    /// Another client's mutation, now applied to the Task Store.
    Foreign,
    /// Not for the open project.
    Ignored,
}
