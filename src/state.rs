use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::adaptive::{DecisionProvider, SessionRegistry};
use crate::config::Config;
use crate::content::{ContentError, ItemRepository, StaticItemBank};
use crate::services::{LlmDecisionProvider, SessionOptions, SessionService};

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    sessions: Arc<SessionService>,
}

impl AppState {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        provider: Option<Arc<dyn DecisionProvider>>,
        options: SessionOptions,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            sessions: Arc::new(SessionService::new(items, provider, options)),
        }
    }

    /// Loads the item bank and, when credentials are present, the LLM-backed
    /// decision provider.
    pub fn from_config(config: &Config) -> Result<Self, ContentError> {
        let items: Arc<dyn ItemRepository> = Arc::new(StaticItemBank::from_path(&config.item_bank_path)?);

        let provider = match LlmDecisionProvider::from_env() {
            Some(provider) => {
                tracing::info!("decision provider configured, advisory mode available");
                Some(Arc::new(provider) as Arc<dyn DecisionProvider>)
            }
            None => {
                tracing::warn!("LLM_API_KEY not set, advisory mode disabled");
                None
            }
        };

        Ok(Self::new(items, provider, config.session_options()))
    }

    pub fn sessions(&self) -> Arc<SessionService> {
        Arc::clone(&self.sessions)
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.sessions.registry()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }
}
