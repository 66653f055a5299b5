use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use crate::adaptive::session::SessionCoordinator;
use crate::adaptive::types::SessionMode;

/// One registered session. Operations on the coordinator are serialized by
/// its own async lock, so concurrent requests for the same id apply in turn.
pub struct SessionHandle {
    mode: SessionMode,
    coordinator: AsyncMutex<SessionCoordinator>,
    last_access: Mutex<Instant>,
}

impl SessionHandle {
    fn new(coordinator: SessionCoordinator) -> Self {
        Self {
            mode: coordinator.mode(),
            coordinator: AsyncMutex::new(coordinator),
            last_access: Mutex::new(Instant::now()),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub async fn lock(&self) -> MutexGuard<'_, SessionCoordinator> {
        self.touch();
        self.coordinator.lock().await
    }

    pub fn idle_for(&self) -> Duration {
        self.last_access.lock().elapsed()
    }

    fn touch(&self) {
        *self.last_access.lock() = Instant::now();
    }

    fn is_busy(&self) -> bool {
        self.coordinator.try_lock().is_err()
    }
}

/// Process-wide map from session id to its coordinator.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `coordinator` under `id`, replacing any previous session.
    pub fn create(&self, id: impl Into<String>, coordinator: SessionCoordinator) -> Arc<SessionHandle> {
        let id = id.into();
        let handle = Arc::new(SessionHandle::new(coordinator));
        let previous = self.sessions.write().insert(id.clone(), Arc::clone(&handle));
        if previous.is_some() {
            tracing::warn!(session_id = %id, "session id reused, previous session replaced");
        }
        handle
    }

    pub fn get(&self, id: &str) -> Option<Arc<SessionHandle>> {
        let handle = self.sessions.read().get(id).cloned();
        if let Some(ref handle) = handle {
            handle.touch();
        }
        handle
    }

    #[cfg(test)]
    pub(crate) fn remove(&self, id: &str) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Drops sessions idle for at least `ttl`. Sessions with an operation in
    /// flight are kept.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, handle| handle.is_busy() || handle.idle_for() < ttl);
        before - sessions.len()
    }
}
