//! Durable board state: projects, tasks, and the task event log in SQLite.
//!
//! The [`BoardStore`] owns all persisted records. Tasks keep insertion order
//! within a project, and deleting a project cascades to its tasks through a
//! foreign key. Every task mutation appends a [`BoardEvent`] to a bounded,
//! append-only log that is exposed for diagnostics and never replayed.
//!
//! A store opened on a file survives restarts. [`BoardStore::in_memory`] is
//! the same schema on a private in-memory database.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use taskboard_proto::api::{BoardEventKind, CreateTaskRequest, UpdateTaskRequest};
use taskboard_proto::task::{self, ValidationError};
use taskboard_proto::{Project, ProjectId, Task, TaskConfiguration, TaskId};
use tokio::sync::Mutex;

/// Default maximum number of retained event log entries before FIFO eviction.
pub const DEFAULT_MAX_EVENT_LOG: usize = 10_000;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS projects (
  id TEXT PRIMARY KEY,
  description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
  id TEXT PRIMARY KEY,
  project_id TEXT NOT NULL,
  title TEXT NOT NULL,
  configuration TEXT NOT NULL,
  FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);

CREATE TABLE IF NOT EXISTS events (
  seq INTEGER PRIMARY KEY AUTOINCREMENT,
  id TEXT NOT NULL UNIQUE,
  type TEXT NOT NULL,
  task_id TEXT NOT NULL,
  project_id TEXT NOT NULL,
  payload TEXT NOT NULL,
  created_at TEXT NOT NULL
);
";

/// Errors returned by [`BoardStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No project with the given id.
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),
    /// No task with the given id.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// A task with the client-supplied id already exists.
    #[error("task already exists: {0}")]
    DuplicateTask(TaskId),
    /// Request body failed validation.
    #[error("invalid input: {0}")]
    Invalid(#[from] ValidationError),
    /// The database rejected a statement or holds an unreadable row.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// The database file's directory could not be created.
    #[error("cannot prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// One entry of the task event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardEvent {
    /// Unique event id (UUID v7).
    pub id: String,
    /// Mutation kind.
    #[serde(rename = "type")]
    pub kind: BoardEventKind,
    /// Task the event concerns.
    pub task_id: TaskId,
    /// Project the task belongs to.
    pub project_id: ProjectId,
    /// JSON snapshot of the task after a create or update, before a delete.
    pub payload: serde_json::Value,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

/// SQLite-backed project and task store.
///
/// One connection guarded by an async mutex; every operation is a short
/// statement or transaction.
pub struct BoardStore {
    conn: Mutex<Connection>,
    max_event_log: usize,
}

impl BoardStore {
    /// Opens (or creates) the database at `path` and installs the schema.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] if the parent directory cannot be created, or
    /// [`StoreError::Database`] if the file cannot be opened as SQLite.
    pub fn open(path: impl AsRef<Path>, max_event_log: usize) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        tracing::info!(path = %path.display(), "board database opened");
        Self::with_connection(conn, max_event_log)
    }

    /// A fresh store on a private in-memory database.
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`] if SQLite cannot allocate the database.
    pub fn in_memory(max_event_log: usize) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, max_event_log)
    }

    fn with_connection(conn: Connection, max_event_log: usize) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            max_event_log,
        })
    }

    // --- projects ---

    /// Returns all projects in creation order.
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`] on a failed query.
    pub async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id, description FROM projects ORDER BY rowid")?;
        let projects = stmt
            .query_map([], |row| {
                Ok(Project {
                    id: ProjectId::from_string(row.get::<_, String>(0)?),
                    description: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    /// Creates a project with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] if `description` is empty.
    pub async fn create_project(&self, description: &str) -> Result<Project, StoreError> {
        if description.is_empty() {
            return Err(ValidationError::DescriptionEmpty.into());
        }
        let project = Project::new(description);
        self.conn.lock().await.execute(
            "INSERT INTO projects (id, description) VALUES (?1, ?2)",
            params![project.id.as_str(), project.description],
        )?;
        Ok(project)
    }

    /// Renames a project.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for an empty description or
    /// [`StoreError::ProjectNotFound`] for an unknown id.
    pub async fn update_project(&self, id: &ProjectId, description: &str) -> Result<(), StoreError> {
        if description.is_empty() {
            return Err(ValidationError::DescriptionEmpty.into());
        }
        let changed = self.conn.lock().await.execute(
            "UPDATE projects SET description = ?2 WHERE id = ?1",
            params![id.as_str(), description],
        )?;
        if changed == 0 {
            return Err(StoreError::ProjectNotFound(id.clone()));
        }
        Ok(())
    }

    /// Deletes a project and all of its tasks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProjectNotFound`] for an unknown id.
    pub async fn delete_project(&self, id: &ProjectId) -> Result<(), StoreError> {
        let changed = self
            .conn
            .lock()
            .await
            .execute("DELETE FROM projects WHERE id = ?1", params![id.as_str()])?;
        if changed == 0 {
            return Err(StoreError::ProjectNotFound(id.clone()));
        }
        Ok(())
    }

    // --- tasks ---

    /// Returns the tasks of a project in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProjectNotFound`] for an unknown project.
    pub async fn list_tasks(&self, project_id: &ProjectId) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn.lock().await;
        if !has_project(&conn, project_id)? {
            return Err(StoreError::ProjectNotFound(project_id.clone()));
        }
        let mut stmt = conn.prepare(
            "SELECT id, project_id, title, configuration FROM tasks
             WHERE project_id = ?1 ORDER BY rowid",
        )?;
        let tasks = stmt
            .query_map(params![project_id.as_str()], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Creates a task in a project, keeping a client-supplied id verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProjectNotFound`], [`StoreError::Invalid`] for a
    /// bad title or description, or [`StoreError::DuplicateTask`] if the id
    /// is taken.
    pub async fn create_task(
        &self,
        project_id: &ProjectId,
        req: CreateTaskRequest,
    ) -> Result<Task, StoreError> {
        task::validate_content(&req.title, &req.configuration)?;
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        if !has_project(&tx, project_id)? {
            return Err(StoreError::ProjectNotFound(project_id.clone()));
        }
        let id = req.id.unwrap_or_default();
        if find_task(&tx, &id)?.is_some() {
            return Err(StoreError::DuplicateTask(id));
        }
        let task = Task {
            id,
            project_id: project_id.clone(),
            title: req.title,
            configuration: req.configuration,
        };
        tx.execute(
            "INSERT INTO tasks (id, project_id, title, configuration) VALUES (?1, ?2, ?3, ?4)",
            params![
                task.id.as_str(),
                task.project_id.as_str(),
                task.title,
                encode_configuration(&task.configuration),
            ],
        )?;
        push_event(&tx, BoardEventKind::Create, &task, self.max_event_log)?;
        tx.commit()?;
        drop(conn);
        tracing::debug!(task_id = %task.id, project_id = %task.project_id, "task created");
        Ok(task)
    }

    /// Replaces a task's title and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for a bad title or description, or
    /// [`StoreError::TaskNotFound`] for an unknown id.
    pub async fn update_task(&self, id: &TaskId, req: UpdateTaskRequest) -> Result<Task, StoreError> {
        task::validate_content(&req.title, &req.configuration)?;
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let current = find_task(&tx, id)?.ok_or_else(|| StoreError::TaskNotFound(id.clone()))?;
        let updated = current.with_content(req.title, req.configuration);
        tx.execute(
            "UPDATE tasks SET title = ?2, configuration = ?3 WHERE id = ?1",
            params![
                id.as_str(),
                updated.title,
                encode_configuration(&updated.configuration),
            ],
        )?;
        push_event(&tx, BoardEventKind::Update, &updated, self.max_event_log)?;
        tx.commit()?;
        drop(conn);
        tracing::debug!(task_id = %id, "task updated");
        Ok(updated)
    }

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] for an unknown id.
    pub async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let removed = find_task(&tx, id)?.ok_or_else(|| StoreError::TaskNotFound(id.clone()))?;
        tx.execute("DELETE FROM tasks WHERE id = ?1", params![id.as_str()])?;
        push_event(&tx, BoardEventKind::Delete, &removed, self.max_event_log)?;
        tx.commit()?;
        drop(conn);
        tracing::debug!(task_id = %id, "task deleted");
        Ok(())
    }

    // --- event log ---

    /// Returns the retained event log, oldest first.
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`] on a failed query or an unreadable row.
    pub async fn events(&self) -> Result<Vec<BoardEvent>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, type, task_id, project_id, payload, created_at FROM events ORDER BY seq",
        )?;
        let events = stmt
            .query_map([], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}

fn has_project(conn: &Connection, id: &ProjectId) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)",
        params![id.as_str()],
        |row| row.get(0),
    )
}

fn find_task(conn: &Connection, id: &TaskId) -> rusqlite::Result<Option<Task>> {
    conn.query_row(
        "SELECT id, project_id, title, configuration FROM tasks WHERE id = ?1",
        params![id.as_str()],
        task_from_row,
    )
    .optional()
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let configuration: String = row.get(3)?;
    Ok(Task {
        id: TaskId::from_string(row.get::<_, String>(0)?),
        project_id: ProjectId::from_string(row.get::<_, String>(1)?),
        title: row.get(2)?,
        configuration: serde_json::from_str(&configuration).map_err(|e| bad_column(3, e))?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<BoardEvent> {
    let kind: String = row.get(1)?;
    let payload: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(BoardEvent {
        id: row.get(0)?,
        kind: event_kind_from_str(&kind).ok_or_else(|| bad_column(1, UnknownEventKind(kind)))?,
        task_id: TaskId::from_string(row.get::<_, String>(2)?),
        project_id: ProjectId::from_string(row.get::<_, String>(3)?),
        payload: serde_json::from_str(&payload).map_err(|e| bad_column(4, e))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| bad_column(5, e))?
            .with_timezone(&Utc),
    })
}

fn encode_configuration(configuration: &TaskConfiguration) -> String {
    serde_json::to_string(configuration).unwrap_or_else(|_| "{}".to_string())
}

fn push_event(
    conn: &Connection,
    kind: BoardEventKind,
    task: &Task,
    max: usize,
) -> rusqlite::Result<()> {
    let payload = serde_json::to_string(task).unwrap_or_else(|_| "null".to_string());
    conn.execute(
        "INSERT INTO events (id, type, task_id, project_id, payload, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            uuid::Uuid::now_v7().to_string(),
            event_kind_str(kind),
            task.id.as_str(),
            task.project_id.as_str(),
            payload,
            Utc::now().to_rfc3339(),
        ],
    )?;
    conn.execute(
        "DELETE FROM events WHERE seq NOT IN (SELECT seq FROM events ORDER BY seq DESC LIMIT ?1)",
        params![i64::try_from(max).unwrap_or(i64::MAX)],
    )?;
    Ok(())
}

const fn event_kind_str(kind: BoardEventKind) -> &'static str {
    match kind {
        BoardEventKind::Create => "create",
        BoardEventKind::Update => "update",
        BoardEventKind::Delete => "delete",
    }
}

fn event_kind_from_str(s: &str) -> Option<BoardEventKind> {
    match s {
        "create" => Some(BoardEventKind::Create),
        "update" => Some(BoardEventKind::Update),
        "delete" => Some(BoardEventKind::Delete),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown event type {0:?}")]
struct UnknownEventKind(String);

fn bad_column(
    index: usize,
    error: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
}
