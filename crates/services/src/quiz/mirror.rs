use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use quiz_core::model::{AnswerStore, ContentKey, Question};

/// Complete, restorable state of one quiz instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub key: ContentKey,
    pub questions: Vec<Question>,
    pub answers: AnswerStore,
    pub completed: bool,
}

/// Host-owned copy of the latest session state.
///
/// Survives the session itself, so a remount of the same logical instance
/// can pick up where the previous one stopped.
#[derive(Debug, Clone, Default)]
pub struct LiveMirror {
    inner: Arc<Mutex<Option<SessionSnapshot>>>,
}

impl LiveMirror {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: SessionSnapshot) {
        match self.inner.lock() {
            Ok(mut guard) => *guard = Some(snapshot),
            Err(err) => tracing::warn!(error = %err, "live mirror lock poisoned"),
        }
    }

    /// Latest snapshot for `key`; snapshots of other instances are ignored.
    #[must_use]
    pub fn get(&self, key: &ContentKey) -> Option<SessionSnapshot> {
        let guard = self.inner.lock().ok()?;
        guard.as_ref().filter(|snapshot| &snapshot.key == key).cloned()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = None;
        }
    }
}

/// Mounted flag checked after every await; results arriving after the
/// owner went away are discarded.
#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
}

impl Liveness {
    #[must_use]
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Mark the owner as gone. Idempotent.
    pub fn release(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}
