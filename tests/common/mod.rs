#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;

use adaptive_tutor::adaptive::{
    AnswerRecord, ConfidenceSignals, DecisionProvider, ProviderDecision, ProviderError,
};
use adaptive_tutor::content::{Item, ItemRepository, StaticItemBank};
use adaptive_tutor::services::{SessionOptions, SessionService};
use adaptive_tutor::state::AppState;

pub const ITEM_COUNT: i64 = 12;

/// Items 1..=12 with difficulty rising in steps of 0.08; answer is `answer-{id}`.
pub fn test_items() -> Vec<Item> {
    (1..=ITEM_COUNT)
        .map(|id| Item {
            id,
            prompt: format!("question {id}"),
            answer: format!("answer-{id}"),
            options: vec![format!("answer-{id}"), "wrong".to_string()],
            difficulty: 0.04 + 0.08 * (id - 1) as f64,
            tags: vec!["test".to_string()],
            feedback: Some(format!("explanation {id}")),
        })
        .collect()
}

pub fn test_bank() -> Arc<dyn ItemRepository> {
    Arc::new(StaticItemBank::new(test_items()).unwrap())
}

/// Picks the lowest unanswered id and reports how many answers it saw.
#[derive(Default)]
pub struct LowestIdProvider {
    pub calls: AtomicUsize,
}

impl LowestIdProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecisionProvider for LowestIdProvider {
    async fn decide(
        &self,
        items: &[Item],
        history: &[AnswerRecord],
    ) -> Result<ProviderDecision, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answered: HashSet<_> = history.iter().map(|r| r.item_id).collect();
        let item = items
            .iter()
            .find(|item| !answered.contains(&item.id))
            .ok_or_else(|| ProviderError::Parse("nothing left".into()))?;

        Ok(ProviderDecision {
            item_id: item.id,
            feedback: format!("seen {} answers", history.len()),
            reasoning: "lowest id first".to_string(),
            confidence: Some(ConfidenceSignals {
                knowledge_level: 0.6,
                confidence: 0.7,
                learning_rate: 0.5,
                pattern_consistency: 0.4,
                difficulty_tolerance: 0.3,
            }),
        })
    }
}

pub struct FailingProvider;

#[async_trait]
impl DecisionProvider for FailingProvider {
    async fn decide(
        &self,
        _items: &[Item],
        _history: &[AnswerRecord],
    ) -> Result<ProviderDecision, ProviderError> {
        Err(ProviderError::Request("connection refused".into()))
    }
}

pub fn create_service(provider: Option<Arc<dyn DecisionProvider>>) -> SessionService {
    SessionService::new(test_bank(), provider, SessionOptions::default())
}

pub fn create_test_state(provider: Option<Arc<dyn DecisionProvider>>) -> AppState {
    AppState::new(test_bank(), provider, SessionOptions::default())
}

pub fn create_test_app() -> Router {
    adaptive_tutor::create_app(create_test_state(None))
}

pub fn create_advisory_test_app() -> Router {
    let provider: Arc<dyn DecisionProvider> = Arc::new(LowestIdProvider::default());
    adaptive_tutor::create_app(create_test_state(Some(provider)))
}
