mod advisory;
mod heuristic;
mod provider;

pub use advisory::{AdvisoryCache, AdvisorySelector};
pub use heuristic::HeuristicSelector;
pub use provider::{DecisionProvider, ProviderDecision, ProviderError};

use crate::adaptive::error::SessionError;
use crate::adaptive::types::{Decision, SelectionContext, SessionMode};

/// Item selection policy, fixed when the session is created.
pub enum SelectionStrategy {
    Heuristic(HeuristicSelector),
    Advisory(AdvisorySelector),
}

impl SelectionStrategy {
    pub fn mode(&self) -> SessionMode {
        match self {
            SelectionStrategy::Heuristic(_) => SessionMode::Deterministic,
            SelectionStrategy::Advisory(_) => SessionMode::Advisory,
        }
    }

    pub async fn select(&mut self, ctx: &SelectionContext<'_>) -> Result<Decision, SessionError> {
        match self {
            SelectionStrategy::Heuristic(selector) => selector.select(ctx),
            SelectionStrategy::Advisory(selector) => selector.select(ctx).await,
        }
    }

    /// Warms the next selection. The heuristic has nothing to precompute.
    pub async fn prepare_next(&mut self, ctx: &SelectionContext<'_>) -> Result<(), SessionError> {
        match self {
            SelectionStrategy::Heuristic(_) => Ok(()),
            SelectionStrategy::Advisory(selector) => selector.prepare_next(ctx).await,
        }
    }

    pub fn peek_cached(&self) -> Option<&Decision> {
        match self {
            SelectionStrategy::Heuristic(_) => None,
            SelectionStrategy::Advisory(selector) => selector.peek_cached(),
        }
    }
}
