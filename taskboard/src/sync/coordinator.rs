//! Local task mutations and project passthroughs.
//!
//! Each mutation runs the same pipeline: optimistic Task Store change,
//! persistence call, Action Log record, echo arm, broadcast publish. A failed
//! persistence call rolls the optimistic change back and stops the pipeline.

use taskboard_proto::task::validate_content;
use taskboard_proto::{
    Action, EventFrame, Project, ProjectId, Task, TaskConfiguration, TaskId, ValidationError,
};

use super::BoardError;
use crate::channel::BroadcastChannel;
use crate::echo::EchoSuppressor;
use crate::history::{ActionLog, UndoLogStore};
use crate::persistence::{PersistenceError, PersistenceService};
use crate::store::TaskStore;

/// Orchestrates one client session against its persistence, broadcast and
/// undo-log services.
pub struct SyncCoordinator<P, C, L> {
    pub(super) persistence: P,
    pub(super) channel: C,
    pub(super) undo_store: L,
    pub(super) store: TaskStore,
    pub(super) echo: EchoSuppressor,
    pub(super) log: ActionLog,
    pub(super) active: Option<ProjectId>,
}

impl<P, C, L> SyncCoordinator<P, C, L>
where
    P: PersistenceService,
    C: BroadcastChannel,
    L: UndoLogStore,
{
    /// Creates a session and reloads the undo log from `undo_store`.
    ///
    /// An unreadable log is logged and replaced with an empty one: the
    /// remote board is unaffected, only undo depth is lost.
    pub async fn new(
        persistence: P,
        channel: C,
        undo_store: L,
        client_id: impl Into<String>,
        history_capacity: usize,
    ) -> Self {
        let log = match undo_store.load().await {
            Ok(snapshot) => ActionLog::from_snapshot(snapshot, history_capacity),
            Err(e) => {
                tracing::warn!(error = %e, "undo log unreadable, starting empty");
                ActionLog::new(history_capacity)
            }
        };
        let echo = EchoSuppressor::new(client_id);
        tracing::debug!(client_id = echo.client_id(), "sync session created");
        Self {
            persistence,
            channel,
            undo_store,
            store: TaskStore::new(),
            echo,
            log,
            active: None,
        }
    }

    // --- task mutations ---

    /// Creates a task in the open project.
    ///
    /// # Errors
    ///
    /// [`BoardError::NoActiveProject`], [`BoardError::Validation`] for a bad
    /// title, or [`BoardError::Persistence`] after rolling back.
    pub async fn create_task(
        &mut self,
        title: &str,
        configuration: TaskConfiguration,
    ) -> Result<Task, BoardError> {
        let project = self.require_active()?.clone();
        validate_content(title, &configuration)?;
        let task = Task::new(project, title, configuration);
        self.commit(Action::Create { task: task.clone() }).await?;
        Ok(task)
    }

    /// Replaces the title and configuration of a task on the board.
    ///
    /// # Errors
    ///
    /// [`BoardError::NoActiveProject`], [`BoardError::NotFound`] if `id` is
    /// not on the board, [`BoardError::Validation`], or
    /// [`BoardError::Persistence`] after rolling back.
    pub async fn update_task(
        &mut self,
        id: &TaskId,
        title: &str,
        configuration: TaskConfiguration,
    ) -> Result<Task, BoardError> {
        self.require_active()?;
        validate_content(title, &configuration)?;
        let before = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| BoardError::NotFound(id.to_string()))?;
        let after = before.with_content(title, configuration);
        self.commit(Action::Update {
            before,
            after: after.clone(),
        })
        .await?;
        Ok(after)
    }

    /// Deletes a task from the board and returns it.
    ///
    /// # Errors
    ///
    /// [`BoardError::NoActiveProject`], [`BoardError::NotFound`], or
    /// [`BoardError::Persistence`] after rolling back.
    pub async fn delete_task(&mut self, id: &TaskId) -> Result<Task, BoardError> {
        self.require_active()?;
        let before = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| BoardError::NotFound(id.to_string()))?;
        self.commit(Action::Delete {
            task: before.clone(),
        })
        .await?;
        Ok(before)
    }

    /// Applies a new user action and, once persisted, records and announces it.
    async fn commit(&mut self, action: Action) -> Result<(), BoardError> {
        self.apply(&action).await?;
        tracing::info!(
            kind = action.kind(),
            task_id = %action.task_id(),
            project_id = %action.project_id(),
            "task mutation persisted"
        );
        self.log.record(action.clone());
        self.persist_log().await;
        self.announce(&action).await;
        Ok(())
    }

    /// Performs the forward effect of `action` on the Task Store and the
    /// persistence service, undoing the local part if the remote call fails.
    pub(super) async fn apply(&mut self, action: &Action) -> Result<(), BoardError> {
        match action {
            Action::Create { task } => {
                self.store.insert(task.clone());
                if let Err(e) = self.persistence.create_task(task).await {
                    self.store.remove(&task.id);
                    return Err(self.rolled_back(action, e));
                }
            }
            Action::Update { after, .. } => {
                let previous = self.store.replace(after.clone());
                if previous.is_none() {
                    self.store.insert(after.clone());
                }
                if let Err(e) = self.persistence.update_task(after).await {
                    match previous {
                        Some(prev) => {
                            self.store.replace(prev);
                        }
                        None => {
                            self.store.remove(&after.id);
                        }
                    }
                    return Err(self.rolled_back(action, e));
                }
            }
            Action::Delete { task } => {
                let position = self.store.position(&task.id);
                let removed = self.store.remove(&task.id);
                if let Err(e) = self.persistence.delete_task(&task.id).await {
                    if let (Some(index), Some(prev)) = (position, removed) {
                        self.store.insert_at(index, prev);
                    }
                    return Err(self.rolled_back(action, e));
                }
            }
        }
        Ok(())
    }

    fn rolled_back(&self, action: &Action, error: PersistenceError) -> BoardError {
        tracing::warn!(
            kind = action.kind(),
            task_id = %action.task_id(),
            error = %error,
            tasks = self.store.len(),
            "persistence failed, optimistic change rolled back"
        );
        BoardError::Persistence(error)
    }

    /// Arms the echo suppressor and publishes the action's event to its
    /// project room. A failed publish is logged and disarms the tag.
    pub(super) async fn announce(&mut self, action: &Action) {
        let tag = self.echo.arm();
        let event = action.to_event();
        let name = event.name();
        let frame = EventFrame::tagged(tag.clone(), event);
        match self.channel.publish(action.project_id().room(), &frame).await {
            Ok(()) => tracing::debug!(event = name, origin = %tag, "published"),
            Err(e) => {
                tracing::warn!(event = name, origin = %tag, error = %e, "publish failed");
                self.echo.disarm(&tag);
            }
        }
    }

    /// Saves the Action Log. Failure only costs undo depth after a restart,
    /// so it is logged and otherwise ignored.
    pub(super) async fn persist_log(&self) {
        if let Err(e) = self.undo_store.save(&self.log.snapshot()).await {
            tracing::warn!(error = %e, "failed to save undo log");
        }
    }

    pub(super) fn require_active(&self) -> Result<&ProjectId, BoardError> {
        self.active.as_ref().ok_or(BoardError::NoActiveProject)
    }

    // --- projects ---

    /// Lists every project.
    ///
    /// # Errors
    ///
    /// [`BoardError::Persistence`] if the listing fails.
    pub async fn list_projects(&self) -> Result<Vec<Project>, BoardError> {
        Ok(self.persistence.list_projects().await?)
    }

    /// Creates a project.
    ///
    /// # Errors
    ///
    /// [`BoardError::Validation`] for an empty description, or
    /// [`BoardError::Persistence`].
    pub async fn create_project(&self, description: &str) -> Result<Project, BoardError> {
        if description.is_empty() {
            return Err(ValidationError::DescriptionEmpty.into());
        }
        let project = self.persistence.create_project(description).await?;
        tracing::info!(project_id = %project.id, "project created");
        Ok(project)
    }

    /// Renames a project.
    ///
    /// # Errors
    ///
    /// [`BoardError::Validation`] for an empty description, or
    /// [`BoardError::Persistence`].
    pub async fn rename_project(&self, id: &ProjectId, description: &str) -> Result<(), BoardError> {
        if description.is_empty() {
            return Err(ValidationError::DescriptionEmpty.into());
        }
        self.persistence.update_project(id, description).await?;
        Ok(())
    }

    /// Deletes a project. If it is open it is closed first, and its undo
    /// stacks are dropped.
    ///
    /// # Errors
    ///
    /// [`BoardError::Persistence`] if the remote delete fails; nothing local
    /// changes in that case.
    pub async fn delete_project(&mut self, id: &ProjectId) -> Result<(), BoardError> {
        self.persistence.delete_project(id).await?;
        if self.active.as_ref() == Some(id) {
            self.close_project().await;
        }
        if self.log.remove_project(id) {
            self.persist_log().await;
        }
        tracing::info!(project_id = %id, "project deleted");
        Ok(())
    }

    // --- accessors ---

    /// Tasks of the open project, in display order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    /// The Task Store of the open project.
    #[must_use]
    pub const fn store(&self) -> &TaskStore {
        &self.store
    }

    /// The echo suppressor of this session.
    #[must_use]
    pub const fn echo(&self) -> &EchoSuppressor {
        &self.echo
    }

    /// The Action Log of this session.
    #[must_use]
    pub const fn action_log(&self) -> &ActionLog {
        &self.log
    }

    /// The open project, if any.
    #[must_use]
    pub const fn active_project(&self) -> Option<&ProjectId> {
        self.active.as_ref()
    }

    /// History of the open project, oldest first. Empty if none is open.
    #[must_use]
    pub fn history(&self) -> Vec<Action> {
        self.active
            .as_ref()
            .map(|p| self.log.history(p))
            .unwrap_or_default()
    }

    /// Future of the open project, next redo first. Empty if none is open.
    #[must_use]
    pub fn future(&self) -> Vec<Action> {
        self.active
            .as_ref()
            .map(|p| self.log.future(p))
            .unwrap_or_default()
    }

    /// The broadcast channel of this session.
    #[must_use]
    pub const fn channel(&self) -> &C {
        &self.channel
    }
}
