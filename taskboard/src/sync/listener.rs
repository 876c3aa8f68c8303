//! Opening projects and applying inbound broadcast events.

use taskboard_proto::{BroadcastEvent, EventFrame, ProjectId};

use super::{Applied, BoardError, SyncCoordinator};
use crate::channel::BroadcastChannel;
use crate::history::UndoLogStore;
use crate::persistence::PersistenceService;

impl<P, C, L> SyncCoordinator<P, C, L>
where
    P: PersistenceService,
    C: BroadcastChannel,
    L: UndoLogStore,
{
    /// Makes `project` the open project.
    ///
    /// Leaves the previous room, joins the new one and loads the task list
    /// as the baseline. The room is joined before the list is read so that
    /// no event published after the read is missed.
    ///
    /// # Errors
    ///
    /// [`BoardError::Channel`] if the room cannot be joined, or
    /// [`BoardError::Persistence`] if the task list cannot be read. Either
    /// way no project is open afterwards.
    pub async fn open_project(&mut self, project: &ProjectId) -> Result<(), BoardError> {
        self.close_project().await;

        self.channel.join(project.room()).await?;
        let tasks = match self.persistence.list_tasks(project).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(project_id = %project, error = %e, "failed to load tasks");
                if let Err(e) = self.channel.leave(project.room()).await {
                    tracing::debug!(project_id = %project, error = %e, "leave after failed open");
                }
                return Err(e.into());
            }
        };

        self.store.replace_all(tasks);
        self.active = Some(project.clone());
        tracing::info!(
            project_id = %project,
            tasks = self.store.len(),
            undo = self.log.history(project).len(),
            redo = self.log.future(project).len(),
            "project opened"
        );
        Ok(())
    }

    /// Closes the open project, if any: leaves its room and clears the
    /// Task Store. Its undo stacks are kept for when it is reopened.
    pub async fn close_project(&mut self) {
        let Some(project) = self.active.take() else {
            return;
        };
        if let Err(e) = self.channel.leave(project.room()).await {
            tracing::warn!(project_id = %project, error = %e, "failed to leave project room");
        }
        self.store.clear();
        tracing::info!(project_id = %project, "project closed");
    }

    /// Routes one inbound frame.
    ///
    /// Our own echoes are consumed and skipped. Frames for any room other
    /// than the open project's are ignored. Everything else is applied to
    /// the Task Store by id and never touches the Action Log.
    pub fn handle_event(&mut self, room: &str, frame: &EventFrame) -> Applied {
        if self.echo.try_consume(frame) {
            tracing::trace!(room = %room, event = frame.event.name(), "own echo consumed");
            return Applied::Echo;
        }

        let Some(active) = self.active.as_ref() else {
            return Applied::Ignored;
        };
        if room != active.room() || frame.event.project_id() != active {
            tracing::debug!(room = %room, event = frame.event.name(), "event for another project ignored");
            return Applied::Ignored;
        }

        match &frame.event {
            BroadcastEvent::TaskCreate(task) => self.store.insert(task.clone()),
            BroadcastEvent::TaskUpdate(task) => {
                if self.store.replace(task.clone()).is_none() {
                    self.store.insert(task.clone());
                }
            }
            BroadcastEvent::TaskDelete { id, .. } => {
                self.store.remove(id);
            }
        }
        tracing::debug!(
            event = frame.event.name(),
            task_id = %frame.event.task_id(),
            origin = ?frame.origin,
            "applied foreign event"
        );
        Applied::Foreign
    }

    /// Waits for the next inbound frame and routes it through
    /// [`handle_event`](Self::handle_event).
    ///
    /// # Errors
    ///
    /// [`BoardError::Channel`] once the broadcast channel is closed.
    pub async fn next_event(&mut self) -> Result<Applied, BoardError> {
        let (room, frame) = self.channel.recv().await?;
        Ok(self.handle_event(&room, &frame))
    }
}
