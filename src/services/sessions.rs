use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adaptive::{
    BktParams, DecisionProvider, SessionCoordinator, SessionError, SessionHandle, SessionMetrics,
    SessionMode, SessionRegistry,
};
use crate::content::{Item, ItemId, ItemRepository};

pub const DEFAULT_MAX_ITEMS_PER_SESSION: usize = 10;
pub const DEFAULT_ADVISOR_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartSessionRequest {
    pub mode: String,
    #[serde(default)]
    pub l0: Option<f64>,
    #[serde(default)]
    pub t: Option<f64>,
    #[serde(default)]
    pub s: Option<f64>,
    #[serde(default)]
    pub g: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub mode: SessionMode,
}

/// Item as shown to the learner; the canonical answer stays server-side.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub id: ItemId,
    pub prompt: String,
    pub options: Vec<String>,
    pub difficulty: f64,
    pub tags: Vec<String>,
}

impl From<Item> for ItemView {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            prompt: item.prompt,
            options: item.options,
            difficulty: item.difficulty,
            tags: item.tags,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NextItemResponse {
    pub item: ItemView,
    pub feedback: String,
    pub selection_reasoning: String,
    pub current_mastery: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswerRequest {
    pub session_id: String,
    #[serde(alias = "question_id")]
    pub item_id: ItemId,
    pub user_answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitAnswerResponse {
    pub correct: bool,
    pub correct_answer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub feedback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub current_mastery: f64,
    pub session_complete: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Answer count at which the caller reports the session complete.
    pub max_items_per_session: usize,
    pub advisor_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_items_per_session: DEFAULT_MAX_ITEMS_PER_SESSION,
            advisor_timeout: DEFAULT_ADVISOR_TIMEOUT,
        }
    }
}

/// Request-facing operations over the session registry.
pub struct SessionService {
    registry: Arc<SessionRegistry>,
    items: Arc<dyn ItemRepository>,
    provider: Option<Arc<dyn DecisionProvider>>,
    options: SessionOptions,
}

impl SessionService {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        provider: Option<Arc<dyn DecisionProvider>>,
        options: SessionOptions,
    ) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            items,
            provider,
            options,
        }
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn advisory_available(&self) -> bool {
        self.provider.is_some()
    }

    pub fn start_session(
        &self,
        req: StartSessionRequest,
    ) -> Result<StartSessionResponse, SessionError> {
        let mode: SessionMode = req.mode.parse().map_err(SessionError::InvalidRequest)?;
        let params = BktParams::with_defaults(req.l0, req.t, req.s, req.g);
        params.validate()?;

        let coordinator = match mode {
            SessionMode::Deterministic => {
                SessionCoordinator::deterministic(Arc::clone(&self.items), params)
            }
            SessionMode::Advisory => {
                let provider = self.provider.as_ref().ok_or_else(|| {
                    SessionError::invalid("advisory mode unavailable: no decision provider configured")
                })?;
                SessionCoordinator::advisory(
                    Arc::clone(&self.items),
                    Arc::clone(provider),
                    params,
                    self.options.advisor_timeout,
                )
            }
        };

        let session_id = uuid::Uuid::new_v4().to_string();
        self.registry.create(session_id.clone(), coordinator);
        info!(session_id = %session_id, mode = %mode, "session started");

        Ok(StartSessionResponse { session_id, mode })
    }

    pub async fn next_item(&self, session_id: &str) -> Result<NextItemResponse, SessionError> {
        let handle = self.session(session_id)?;
        let mut session = handle.lock().await;
        let next = session.next_item().await?;

        Ok(NextItemResponse {
            item: next.item.into(),
            feedback: next.feedback,
            selection_reasoning: next.reasoning,
            current_mastery: next.current_mastery,
        })
    }

    /// Grades the answer by exact comparison (surrounding whitespace ignored,
    /// case-sensitive) and records it.
    pub async fn submit_answer(
        &self,
        req: SubmitAnswerRequest,
    ) -> Result<SubmitAnswerResponse, SessionError> {
        let handle = self.session(&req.session_id)?;
        let item = self.items.get(req.item_id)?;
        let correct = req.user_answer.trim() == item.answer;

        let mut session = handle.lock().await;
        let outcome = session.submit_answer(item.id, correct).await?;
        let session_complete = session.answered_count() >= self.options.max_items_per_session;

        Ok(SubmitAnswerResponse {
            correct,
            correct_answer: item.answer,
            feedback: outcome.feedback,
            explanation: item.feedback,
            current_mastery: outcome.current_mastery,
            session_complete,
        })
    }

    pub async fn metrics(&self, session_id: &str) -> Result<SessionMetrics, SessionError> {
        let handle = self.session(session_id)?;
        let session = handle.lock().await;
        Ok(session.metrics())
    }

    fn session(&self, session_id: &str) -> Result<Arc<SessionHandle>, SessionError> {
        if session_id.trim().is_empty() {
            return Err(SessionError::invalid("session_id required"));
        }
        self.registry
            .get(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))
    }
}
