use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::adaptive::SessionRegistry;

pub fn evict_idle_sessions(registry: Arc<SessionRegistry>, ttl: Duration) -> usize {
    let started = Instant::now();
    let evicted = registry.evict_idle(ttl);

    if evicted > 0 {
        info!(
            evicted,
            remaining = registry.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "idle sessions evicted"
        );
    } else {
        debug!(remaining = registry.len(), "no idle sessions to evict");
    }

    evicted
}
