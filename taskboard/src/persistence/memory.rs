//! In-memory persistence backend for tests.
//!
//! Clones share one backing store, so two sessions built from clones of the
//! same [`InMemoryPersistence`] observe each other's writes the way two
//! clients of one server would.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use taskboard_proto::task::validate_content;
use taskboard_proto::{Project, ProjectId, Task, TaskId};

use super::{PersistenceError, PersistenceService};

#[derive(Debug, Default)]
struct Backend {
    projects: Vec<Project>,
    tasks: Vec<Task>,
}

#[derive(Debug, Default)]
struct Inner {
    backend: Mutex<Backend>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

/// [`PersistenceService`] holding everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    inner: Arc<Inner>,
}

impl InMemoryPersistence {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a request error (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.inner.failing.store(fail, Ordering::Relaxed);
    }

    /// Number of calls that reached the backend, failed ones included.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::Relaxed)
    }

    /// Tasks currently stored for `project`, in insertion order.
    #[must_use]
    pub fn tasks_of(&self, project: &ProjectId) -> Vec<Task> {
        self.inner
            .backend
            .lock()
            .tasks
            .iter()
            .filter(|t| &t.project_id == project)
            .cloned()
            .collect()
    }

    /// Inserts a project with a known id, bypassing the service API.
    pub fn seed_project(&self, project: Project) {
        self.inner.backend.lock().projects.push(project);
    }

    /// Inserts a task directly, bypassing the service API.
    pub fn seed_task(&self, task: Task) {
        self.inner.backend.lock().tasks.push(task);
    }

    fn enter(&self) -> Result<(), PersistenceError> {
        self.inner.calls.fetch_add(1, Ordering::Relaxed);
        if self.inner.failing.load(Ordering::Relaxed) {
            return Err(PersistenceError::Request("backend unavailable".into()));
        }
        Ok(())
    }
}

fn invalid(e: &taskboard_proto::ValidationError) -> PersistenceError {
    PersistenceError::Status {
        status: 400,
        message: e.to_string(),
    }
}

impl PersistenceService for InMemoryPersistence {
    async fn list_projects(&self) -> Result<Vec<Project>, PersistenceError> {
        self.enter()?;
        Ok(self.inner.backend.lock().projects.clone())
    }

    async fn create_project(&self, description: &str) -> Result<Project, PersistenceError> {
        self.enter()?;
        let project = Project::new(description);
        self.inner.backend.lock().projects.push(project.clone());
        Ok(project)
    }

    async fn update_project(&self, id: &ProjectId, description: &str) -> Result<(), PersistenceError> {
        self.enter()?;
        let mut backend = self.inner.backend.lock();
        let project = backend
            .projects
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| PersistenceError::NotFound(format!("project {id}")))?;
        project.description = description.to_string();
        Ok(())
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<(), PersistenceError> {
        self.enter()?;
        let mut backend = self.inner.backend.lock();
        let before = backend.projects.len();
        backend.projects.retain(|p| &p.id != id);
        if backend.projects.len() == before {
            return Err(PersistenceError::NotFound(format!("project {id}")));
        }
        backend.tasks.retain(|t| &t.project_id != id);
        Ok(())
    }

    async fn list_tasks(&self, project: &ProjectId) -> Result<Vec<Task>, PersistenceError> {
        self.enter()?;
        if !self.inner.backend.lock().projects.iter().any(|p| &p.id == project) {
            return Err(PersistenceError::NotFound(format!("project {project}")));
        }
        Ok(self.tasks_of(project))
    }

    async fn create_task(&self, task: &Task) -> Result<Task, PersistenceError> {
        self.enter()?;
        validate_content(&task.title, &task.configuration).map_err(|e| invalid(&e))?;
        let mut backend = self.inner.backend.lock();
        if !backend.projects.iter().any(|p| p.id == task.project_id) {
            return Err(PersistenceError::NotFound(format!("project {}", task.project_id)));
        }
        if backend.tasks.iter().any(|t| t.id == task.id) {
            return Err(PersistenceError::Status {
                status: 409,
                message: format!("task {} already exists", task.id),
            });
        }
        backend.tasks.push(task.clone());
        Ok(task.clone())
    }

    async fn update_task(&self, task: &Task) -> Result<Task, PersistenceError> {
        self.enter()?;
        validate_content(&task.title, &task.configuration).map_err(|e| invalid(&e))?;
        let mut backend = self.inner.backend.lock();
        let stored = backend
            .tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or_else(|| PersistenceError::NotFound(format!("task {}", task.id)))?;
        stored.title.clone_from(&task.title);
        stored.configuration = task.configuration.clone();
        Ok(stored.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), PersistenceError> {
        self.enter()?;
        let mut backend = self.inner.backend.lock();
        let index = backend
            .tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| PersistenceError::NotFound(format!("task {id}")))?;
        backend.tasks.remove(index);
        Ok(())
    }
}
