use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::adaptive::types::{AnswerRecord, ConfidenceSignals};
use crate::content::{Item, ItemId};

/// Raw choice returned by a decision provider, before the item id is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDecision {
    pub item_id: ItemId,
    pub feedback: String,
    pub reasoning: String,
    pub confidence: Option<ConfidenceSignals>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unparsable response: {0}")]
    Parse(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("chose unknown item {0}")]
    UnknownItem(ItemId),
}

/// Remote advisor that picks the next item from the full bank and the
/// learner's answer history. Calls are not retried by the caller.
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    async fn decide(
        &self,
        items: &[Item],
        history: &[AnswerRecord],
    ) -> Result<ProviderDecision, ProviderError>;
}
