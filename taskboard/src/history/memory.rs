//! In-memory undo log store for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{UndoLogError, UndoLogSnapshot, UndoLogStore};

/// Keeps the last saved snapshot in memory.
///
/// Clones share the same slot, so a test can hand one clone to a session
/// and inspect or reload it through another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUndoLogStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    snapshot: Mutex<UndoLogSnapshot>,
    failing: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryUndoLogStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.inner.failing.store(fail, Ordering::Relaxed);
    }

    /// The most recently saved snapshot.
    #[must_use]
    pub fn stored(&self) -> UndoLogSnapshot {
        self.inner.snapshot.lock().clone()
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.inner.saves.load(Ordering::Relaxed)
    }
}

impl UndoLogStore for InMemoryUndoLogStore {
    async fn load(&self) -> Result<UndoLogSnapshot, UndoLogError> {
        Ok(self.inner.snapshot.lock().clone())
    }

    async fn save(&self, snapshot: &UndoLogSnapshot) -> Result<(), UndoLogError> {
        if self.inner.failing.load(Ordering::Relaxed) {
            return Err(UndoLogError::Unavailable("simulated failure".into()));
        }
        *self.inner.snapshot.lock() = snapshot.clone();
        self.inner.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
