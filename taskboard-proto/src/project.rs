//! Project records.

use serde::{Deserialize, Serialize};

use crate::task::ProjectId;

/// A project groups tasks and names the broadcast room they sync through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier.
    pub id: ProjectId,
    /// Human-readable project name.
    pub description: String,
}

impl Project {
    /// Creates a project with a fresh id.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(),
            description: description.into(),
        }
    }
}
