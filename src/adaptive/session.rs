use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::adaptive::decision::{
    AdvisorySelector, DecisionProvider, HeuristicSelector, SelectionStrategy,
};
use crate::adaptive::error::SessionError;
use crate::adaptive::tracker::{BktParams, KnowledgeTracker};
use crate::adaptive::types::{
    AnswerRecord, ConfidenceSignals, SelectionContext, SessionMode,
};
use crate::content::{Item, ItemId, ItemRepository};

#[derive(Debug, Clone)]
pub struct NextItem {
    pub item: Item,
    pub feedback: String,
    pub reasoning: String,
    pub current_mastery: f64,
}

#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub current_mastery: f64,
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionMetrics {
    pub difficulty_history: Vec<f64>,
    pub mode: SessionMode,
    #[serde(flatten)]
    pub detail: ModeMetrics,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ModeMetrics {
    Deterministic {
        mastery_history: Vec<f64>,
        answer_history: Vec<bool>,
        current_mastery: f64,
        parameters: BktParams,
    },
    Advisory {
        answer_history: Vec<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_model: Option<ConfidenceSignals>,
    },
}

/// Per-learner state: sequences tracker updates and strategy calls.
///
/// Answers are committed before the strategy is asked to prepare the next
/// decision, so a provider failure never loses history or mastery. Session
/// length is not enforced here.
pub struct SessionCoordinator {
    mode: SessionMode,
    tracker: KnowledgeTracker,
    strategy: SelectionStrategy,
    items: Arc<dyn ItemRepository>,
    answered: Vec<ItemId>,
    history: Vec<AnswerRecord>,
    last_confidence: Option<ConfidenceSignals>,
}

impl SessionCoordinator {
    pub fn deterministic(items: Arc<dyn ItemRepository>, params: BktParams) -> Self {
        let strategy = SelectionStrategy::Heuristic(HeuristicSelector::new(Arc::clone(&items)));
        Self::new(strategy, items, params)
    }

    pub fn advisory(
        items: Arc<dyn ItemRepository>,
        provider: Arc<dyn DecisionProvider>,
        params: BktParams,
        provider_timeout: Duration,
    ) -> Self {
        let strategy = SelectionStrategy::Advisory(AdvisorySelector::new(
            Arc::clone(&items),
            provider,
            provider_timeout,
        ));
        Self::new(strategy, items, params)
    }

    fn new(strategy: SelectionStrategy, items: Arc<dyn ItemRepository>, params: BktParams) -> Self {
        Self {
            mode: strategy.mode(),
            tracker: KnowledgeTracker::new(params),
            strategy,
            items,
            answered: Vec::new(),
            history: Vec::new(),
            last_confidence: None,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn answered_count(&self) -> usize {
        self.answered.len()
    }

    pub fn answered_ids(&self) -> &[ItemId] {
        &self.answered
    }

    pub fn history(&self) -> &[AnswerRecord] {
        &self.history
    }

    pub fn last_confidence(&self) -> Option<ConfidenceSignals> {
        self.last_confidence
    }

    /// Mastery as reported to callers; the tracker is not consulted in
    /// advisory mode, which reports zero.
    pub fn current_mastery(&self) -> f64 {
        match self.mode {
            SessionMode::Deterministic => self.tracker.current_mastery(),
            SessionMode::Advisory => 0.0,
        }
    }

    pub async fn next_item(&mut self) -> Result<NextItem, SessionError> {
        let ctx = SelectionContext {
            current_mastery: self.tracker.current_mastery(),
            answered: &self.answered,
            history: &self.history,
        };
        let decision = self.strategy.select(&ctx).await?;

        debug!(
            item_id = decision.item.id,
            difficulty = decision.item.difficulty,
            mode = %self.mode,
            "item selected"
        );

        Ok(NextItem {
            item: decision.item,
            feedback: decision.feedback,
            reasoning: decision.reasoning,
            current_mastery: self.current_mastery(),
        })
    }

    pub async fn submit_answer(
        &mut self,
        item_id: ItemId,
        correct: bool,
    ) -> Result<AnswerOutcome, SessionError> {
        if self.mode == SessionMode::Deterministic {
            self.tracker.update(correct);
        }
        self.answered.push(item_id);
        self.history.push(AnswerRecord { item_id, correct });

        info!(
            item_id,
            correct,
            answered = self.answered.len(),
            mastery = self.current_mastery(),
            mode = %self.mode,
            "answer recorded"
        );

        let ctx = SelectionContext {
            current_mastery: self.tracker.current_mastery(),
            answered: &self.answered,
            history: &self.history,
        };
        self.strategy.prepare_next(&ctx).await?;

        let feedback = match self.strategy.peek_cached() {
            Some(prepared) => {
                if prepared.confidence.is_some() {
                    self.last_confidence = prepared.confidence;
                }
                prepared.feedback.clone()
            }
            None => String::new(),
        };

        Ok(AnswerOutcome {
            current_mastery: self.current_mastery(),
            feedback,
        })
    }

    pub fn metrics(&self) -> SessionMetrics {
        let difficulty_history = self
            .answered
            .iter()
            .filter_map(|id| self.items.get(*id).ok())
            .map(|item| item.difficulty)
            .collect();

        let detail = match self.mode {
            SessionMode::Deterministic => ModeMetrics::Deterministic {
                mastery_history: self.tracker.mastery_history().to_vec(),
                answer_history: self.tracker.answer_history().to_vec(),
                current_mastery: self.tracker.current_mastery(),
                parameters: self.tracker.params(),
            },
            SessionMode::Advisory => ModeMetrics::Advisory {
                answer_history: self.history.iter().map(|record| record.correct).collect(),
                user_model: self.last_confidence,
            },
        };

        SessionMetrics {
            difficulty_history,
            mode: self.mode,
            detail,
        }
    }
}
