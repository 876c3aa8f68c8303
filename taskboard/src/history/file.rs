//! JSON file backed undo log store.

use std::path::{Path, PathBuf};

use super::{UndoLogError, UndoLogSnapshot, UndoLogStore};

/// Stores the undo log as a single JSON document on disk.
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so a crash mid-write never leaves a truncated log behind.
#[derive(Debug, Clone)]
pub struct FileUndoLogStore {
    path: PathBuf,
}

impl FileUndoLogStore {
    /// Creates a store writing to `path`. Nothing is touched until the first
    /// load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl UndoLogStore for FileUndoLogStore {
    async fn load(&self) -> Result<UndoLogSnapshot, UndoLogError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no undo log yet");
                Ok(UndoLogSnapshot::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, snapshot: &UndoLogSnapshot) -> Result<(), UndoLogError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir).await?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}
