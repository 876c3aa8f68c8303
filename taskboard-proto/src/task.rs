//! Task data model shared by the client, the server and the wire protocol.
//!
//! A [`Task`] always carries a [`TaskConfiguration`]; both configuration
//! fields default when absent so `{}` and a missing `configuration` decode
//! to the same value.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Maximum allowed task description length in characters.
///
/// A task at both limits still encodes well below
/// [`DEFAULT_MAX_FRAME_SIZE`](crate::codec::DEFAULT_MAX_FRAME_SIZE).
pub const MAX_TASK_DESCRIPTION_LENGTH: usize = 4096;

/// Unique identifier for a task.
///
/// Fresh ids are UUID v7 strings, but any string supplied by a client is
/// accepted verbatim (re-creating a deleted task keeps its id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wraps an existing identifier string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a project. Doubles as the broadcast room name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(String);

impl ProjectId {
    /// Creates a new time-ordered project identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wraps an existing identifier string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the broadcast room scoped to this project.
    #[must_use]
    pub fn room(&self) -> &str {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task priority. `Unset` serializes as the empty string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// No priority chosen.
    #[default]
    #[serde(rename = "")]
    Unset,
    /// Low priority.
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => write!(f, ""),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "-" | "none" => Ok(Self::Unset),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ValidationError::UnknownPriority(other.to_string())),
        }
    }
}

/// Per-task settings. Both fields default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfiguration {
    /// Task priority.
    pub priority: Priority,
    /// Free-form description.
    pub description: String,
}

impl TaskConfiguration {
    /// Creates a configuration with the given priority and description.
    pub fn new(priority: Priority, description: impl Into<String>) -> Self {
        Self {
            priority,
            description: description.into(),
        }
    }
}

/// A task on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Project this task belongs to.
    pub project_id: ProjectId,
    /// Task title.
    pub title: String,
    /// Priority and description.
    #[serde(default)]
    pub configuration: TaskConfiguration,
}

impl Task {
    /// Creates a task with a fresh id.
    pub fn new(
        project_id: ProjectId,
        title: impl Into<String>,
        configuration: TaskConfiguration,
    ) -> Self {
        Self {
            id: TaskId::new(),
            project_id,
            title: title.into(),
            configuration,
        }
    }

    /// Returns a copy of this task with a new title and configuration.
    #[must_use]
    pub fn with_content(&self, title: impl Into<String>, configuration: TaskConfiguration) -> Self {
        Self {
            id: self.id.clone(),
            project_id: self.project_id.clone(),
            title: title.into(),
            configuration,
        }
    }
}

/// Input validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds [`MAX_TASK_TITLE_LENGTH`].
    #[error("task title too long (max {MAX_TASK_TITLE_LENGTH} characters)")]
    TitleTooLong,
    /// Task description exceeds [`MAX_TASK_DESCRIPTION_LENGTH`].
    #[error("task description too long (max {MAX_TASK_DESCRIPTION_LENGTH} characters)")]
    TaskDescriptionTooLong,
    /// Project description cannot be empty.
    #[error("project description cannot be empty")]
    DescriptionEmpty,
    /// Priority string not one of `Low`, `Medium`, `High` or empty.
    #[error("unknown priority: {0}")]
    UnknownPriority(String),
}

/// Checks a task title against the length rules.
///
/// # Errors
///
/// Returns [`ValidationError::TitleEmpty`] or [`ValidationError::TitleTooLong`].
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.is_empty() {
        return Err(ValidationError::TitleEmpty);
    }
    if title.chars().count() > MAX_TASK_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(())
}

/// Checks a title and configuration before they are stored or announced.
///
/// # Errors
///
/// Any error of [`validate_title`], or
/// [`ValidationError::TaskDescriptionTooLong`].
pub fn validate_content(
    title: &str,
    configuration: &TaskConfiguration,
) -> Result<(), ValidationError> {
    validate_title(title)?;
    if configuration.description.chars().count() > MAX_TASK_DESCRIPTION_LENGTH {
        return Err(ValidationError::TaskDescriptionTooLong);
    }
    Ok(())
}
