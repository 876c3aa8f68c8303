//! Undo and redo over the open project's History and Future.
//!
//! Undo issues the inverse of the most recent action, redo re-issues the
//! forward effect of the most recently undone one. Both go through the same
//! optimistic apply and announce steps as a fresh mutation, but move actions
//! between the two stacks instead of recording new ones.
//!
//! An action whose task no longer exists remotely (a peer deleted it) can
//! never succeed again. It is dropped from the stacks instead of being put
//! back, so older entries stay reachable.

use taskboard_proto::Action;

use super::{BoardError, SyncCoordinator};
use crate::persistence::PersistenceError;
use crate::channel::BroadcastChannel;
use crate::history::UndoLogStore;
use crate::persistence::PersistenceService;

impl<P, C, L> SyncCoordinator<P, C, L>
where
    P: PersistenceService,
    C: BroadcastChannel,
    L: UndoLogStore,
{
    /// Reverts the most recent action of the open project and returns it.
    ///
    /// # Errors
    ///
    /// [`BoardError::NoOp`] if History is empty,
    /// [`BoardError::NoActiveProject`], [`BoardError::NotFound`] if the task
    /// is gone remotely (the action is dropped), or
    /// [`BoardError::Persistence`], in which case the action goes back onto
    /// History.
    pub async fn undo(&mut self) -> Result<Action, BoardError> {
        let project = self.require_active()?.clone();
        let action = self
            .log
            .take_undo(&project)
            .ok_or(BoardError::NoOp("nothing to undo"))?;
        self.persist_log().await;

        let inverse = action.inverse();
        if let Err(e) = self.apply(&inverse).await {
            if let Some(stale) = stale_target(&e) {
                self.log.discard_redo(&project);
                tracing::warn!(
                    kind = action.kind(),
                    task_id = %action.task_id(),
                    "undo target gone, action dropped"
                );
                self.persist_log().await;
                return Err(BoardError::NotFound(stale));
            }
            self.log.take_redo(&project);
            self.persist_log().await;
            return Err(e);
        }
        tracing::info!(kind = action.kind(), task_id = %action.task_id(), "undone");
        self.announce(&inverse).await;
        Ok(action)
    }

    /// Re-applies the most recently undone action of the open project and
    /// returns it.
    ///
    /// # Errors
    ///
    /// [`BoardError::NoOp`] if Future is empty,
    /// [`BoardError::NoActiveProject`], [`BoardError::NotFound`] if the task
    /// is gone remotely (the action is dropped), or
    /// [`BoardError::Persistence`], in which case the action goes back onto
    /// Future.
    pub async fn redo(&mut self) -> Result<Action, BoardError> {
        let project = self.require_active()?.clone();
        let action = self
            .log
            .take_redo(&project)
            .ok_or(BoardError::NoOp("nothing to redo"))?;
        self.persist_log().await;

        if let Err(e) = self.apply(&action).await {
            if let Some(stale) = stale_target(&e) {
                self.log.discard_undo(&project);
                tracing::warn!(
                    kind = action.kind(),
                    task_id = %action.task_id(),
                    "redo target gone, action dropped"
                );
                self.persist_log().await;
                return Err(BoardError::NotFound(stale));
            }
            self.log.take_undo(&project);
            self.persist_log().await;
            return Err(e);
        }
        tracing::info!(kind = action.kind(), task_id = %action.task_id(), "redone");
        self.announce(&action).await;
        Ok(action)
    }
}

/// The missing resource, if the remote rejected the call because it no
/// longer exists.
fn stale_target(error: &BoardError) -> Option<String> {
    match error {
        BoardError::Persistence(PersistenceError::NotFound(what)) => Some(what.clone()),
        _ => None,
    }
}
