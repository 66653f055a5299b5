mod session_cleanup;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use crate::adaptive::SessionRegistry;

pub use session_cleanup::evict_idle_sessions;

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    registry: Arc<SessionRegistry>,
}

impl WorkerManager {
    pub async fn new(registry: Arc<SessionRegistry>) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            registry,
        })
    }

    /// Schedules idle-session eviction on `schedule` (six-field cron) and
    /// starts the scheduler. Each run is a short synchronous sweep; `stop`
    /// halts scheduling of further runs.
    pub async fn start(&self, schedule: &str, ttl: Duration) -> Result<(), WorkerError> {
        let scheduler = self.scheduler.lock().await;

        let registry = Arc::clone(&self.registry);
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let registry = Arc::clone(&registry);
            Box::pin(async move {
                evict_idle_sessions(registry, ttl);
            })
        })?;
        scheduler.add(job).await?;
        info!(schedule = %schedule, ttl_secs = ttl.as_secs(), "session cleanup worker scheduled");

        scheduler.start().await?;
        info!("workers started");
        Ok(())
    }

    pub async fn stop(&self) {
        info!("stopping workers");
        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "error shutting down scheduler");
        }

        info!("workers stopped");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptive::{BktParams, SessionCoordinator};
    use crate::content::{Item, ItemRepository, StaticItemBank};

    fn bank() -> Arc<dyn ItemRepository> {
        Arc::new(
            StaticItemBank::new(vec![Item {
                id: 1,
                prompt: "p".into(),
                answer: "a".into(),
                options: Vec::new(),
                difficulty: 0.5,
                tags: Vec::new(),
                feedback: None,
            }])
            .unwrap(),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scheduled_job_evicts_idle_sessions() {
        let registry = Arc::new(SessionRegistry::new());
        registry.create("idle", SessionCoordinator::deterministic(bank(), BktParams::default()));

        let manager = WorkerManager::new(Arc::clone(&registry)).await.unwrap();
        manager.start("* * * * * *", Duration::ZERO).await.unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !registry.is_empty() && std::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        manager.stop().await;

        assert!(registry.is_empty());
    }
}
