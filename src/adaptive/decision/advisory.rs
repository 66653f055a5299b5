use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::heuristic::{easiest, unanswered};
use super::provider::{DecisionProvider, ProviderError};
use crate::adaptive::error::SessionError;
use crate::adaptive::types::{Decision, SelectionContext};
use crate::content::{ContentError, ItemRepository};

/// Holds at most one prepared decision. `take` always leaves the cache empty,
/// so a decision is handed out once.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AdvisoryCache {
    #[default]
    Empty,
    Ready(Decision),
}

impl AdvisoryCache {
    /// Stores `decision`, returning any unconsumed decision it displaced.
    pub fn store(&mut self, decision: Decision) -> Option<Decision> {
        match std::mem::replace(self, AdvisoryCache::Ready(decision)) {
            AdvisoryCache::Ready(previous) => Some(previous),
            AdvisoryCache::Empty => None,
        }
    }

    pub fn take(&mut self) -> Option<Decision> {
        match std::mem::take(self) {
            AdvisoryCache::Ready(decision) => Some(decision),
            AdvisoryCache::Empty => None,
        }
    }

    pub fn peek(&self) -> Option<&Decision> {
        match self {
            AdvisoryCache::Ready(decision) => Some(decision),
            AdvisoryCache::Empty => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, AdvisoryCache::Ready(_))
    }
}

/// Selection backed by a remote decision provider. The coordinator prepares the
/// next decision right after each answer so `select` normally just drains the
/// cache.
pub struct AdvisorySelector {
    items: Arc<dyn ItemRepository>,
    provider: Arc<dyn DecisionProvider>,
    cache: AdvisoryCache,
    timeout: Duration,
}

impl AdvisorySelector {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        provider: Arc<dyn DecisionProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            items,
            provider,
            cache: AdvisoryCache::Empty,
            timeout,
        }
    }

    pub async fn select(&mut self, ctx: &SelectionContext<'_>) -> Result<Decision, SessionError> {
        if let Some(decision) = self.cache.take() {
            debug!(item_id = decision.item.id, "advisory decision consumed from cache");
            return Ok(decision);
        }

        if ctx.history.is_empty() {
            let candidates = unanswered(self.items.all()?, ctx.answered);
            let item = easiest(candidates).ok_or(SessionError::Exhausted)?;
            debug!(item_id = item.id, "no answers yet, starting from the easiest item");
            return Ok(Decision::local(item));
        }

        warn!(
            answered = ctx.history.len(),
            "advisory cache empty, requesting decision directly"
        );
        self.request_decision(ctx).await
    }

    /// Replaces any outstanding decision. The cache is cleared before the
    /// provider call, so a failure leaves it empty.
    pub async fn prepare_next(&mut self, ctx: &SelectionContext<'_>) -> Result<(), SessionError> {
        if let Some(stale) = self.cache.take() {
            debug!(stale_item_id = stale.item.id, "discarded unconsumed advisory decision");
        }

        let decision = self.request_decision(ctx).await?;
        let item_id = decision.item.id;
        self.cache.store(decision);
        debug!(item_id, "advisory decision cached");
        Ok(())
    }

    pub fn peek_cached(&self) -> Option<&Decision> {
        self.cache.peek()
    }

    async fn request_decision(&self, ctx: &SelectionContext<'_>) -> Result<Decision, SessionError> {
        let items = self.items.all()?;
        let started = Instant::now();

        let outcome = tokio::time::timeout(self.timeout, self.provider.decide(&items, ctx.history))
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))
            .and_then(|result| result);

        let chosen = match outcome {
            Ok(chosen) => chosen,
            Err(err) => {
                warn!(
                    error = %err,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "decision provider call failed"
                );
                return Err(err.into());
            }
        };

        let item = match self.items.get(chosen.item_id) {
            Ok(item) => item,
            Err(ContentError::NotFound(id)) => return Err(ProviderError::UnknownItem(id).into()),
            Err(err) => return Err(err.into()),
        };

        info!(
            item_id = item.id,
            has_confidence = chosen.confidence.is_some(),
            duration_ms = started.elapsed().as_millis() as u64,
            "decision provider answered"
        );

        Ok(Decision {
            item,
            feedback: chosen.feedback,
            reasoning: chosen.reasoning,
            confidence: chosen.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::adaptive::decision::ProviderDecision;
    use crate::adaptive::types::{AnswerRecord, ConfidenceSignals};
    use crate::content::{Item, ItemId, StaticItemBank};

    struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<ProviderDecision, ProviderError>>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<ProviderDecision, ProviderError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DecisionProvider for ScriptedProvider {
        async fn decide(
            &self,
            _items: &[Item],
            _history: &[AnswerRecord],
        ) -> Result<ProviderDecision, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Request("script exhausted".into())))
        }
    }

    fn choice(item_id: ItemId, feedback: &str) -> Result<ProviderDecision, ProviderError> {
        Ok(ProviderDecision {
            item_id,
            feedback: feedback.to_string(),
            reasoning: format!("because {item_id}"),
            confidence: Some(ConfidenceSignals {
                knowledge_level: 0.4,
                confidence: 0.6,
                learning_rate: 0.5,
                pattern_consistency: 0.7,
                difficulty_tolerance: 0.3,
            }),
        })
    }

    fn bank() -> Arc<dyn ItemRepository> {
        let items = [(1, 0.5), (2, 0.2), (3, 0.8), (4, 0.2)]
            .iter()
            .map(|(id, difficulty)| Item {
                id: *id,
                prompt: format!("q{id}"),
                answer: format!("a{id}"),
                options: Vec::new(),
                difficulty: *difficulty,
                tags: Vec::new(),
                feedback: None,
            })
            .collect();
        Arc::new(StaticItemBank::new(items).unwrap())
    }

    fn selector(provider: Arc<ScriptedProvider>) -> AdvisorySelector {
        AdvisorySelector::new(bank(), provider, Duration::from_secs(5))
    }

    const ONE_ANSWER: [AnswerRecord; 1] = [AnswerRecord {
        item_id: 2,
        correct: true,
    }];

    fn after_first_answer() -> SelectionContext<'static> {
        SelectionContext {
            current_mastery: 0.0,
            answered: &[2],
            history: &ONE_ANSWER,
        }
    }

    #[test]
    fn test_cache_state_machine() {
        let mut cache = AdvisoryCache::default();
        assert!(!cache.is_ready());
        assert!(cache.take().is_none());

        let first = Decision::local(Item {
            id: 1,
            prompt: String::new(),
            answer: String::new(),
            options: Vec::new(),
            difficulty: 0.1,
            tags: Vec::new(),
            feedback: None,
        });
        let mut second = first.clone();
        second.item.id = 2;

        assert!(cache.store(first.clone()).is_none());
        assert_eq!(cache.peek().map(|d| d.item.id), Some(1));
        assert_eq!(cache.store(second).map(|d| d.item.id), Some(1));
        assert_eq!(cache.take().map(|d| d.item.id), Some(2));
        assert_eq!(cache, AdvisoryCache::Empty);
    }

    #[tokio::test]
    async fn test_first_selection_skips_provider() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let mut selector = selector(Arc::clone(&provider));

        let ctx = SelectionContext {
            current_mastery: 0.0,
            answered: &[],
            history: &[],
        };
        let decision = selector.select(&ctx).await.unwrap();

        assert_eq!(decision.item.id, 2);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_prepared_decision_consumed_once() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            choice(3, "nice work"),
            choice(1, "fallback"),
        ]));
        let mut selector = selector(Arc::clone(&provider));
        let ctx = after_first_answer();

        selector.prepare_next(&ctx).await.unwrap();
        assert_eq!(selector.peek_cached().map(|d| d.feedback.as_str()), Some("nice work"));

        let first = selector.select(&ctx).await.unwrap();
        assert_eq!(first.item.id, 3);
        assert_eq!(first.reasoning, "because 3");
        assert!(selector.peek_cached().is_none());
        assert_eq!(provider.calls(), 1);

        let second = selector.select(&ctx).await.unwrap();
        assert_eq!(second.item.id, 1);
        assert_eq!(provider.calls(), 2);
        assert!(selector.peek_cached().is_none());
    }

    #[tokio::test]
    async fn test_prepare_overwrites_unconsumed_decision() {
        let provider = Arc::new(ScriptedProvider::new(vec![choice(3, "old"), choice(4, "new")]));
        let mut selector = selector(provider);
        let ctx = after_first_answer();

        selector.prepare_next(&ctx).await.unwrap();
        selector.prepare_next(&ctx).await.unwrap();

        let decision = selector.select(&ctx).await.unwrap();
        assert_eq!(decision.item.id, 4);
        assert_eq!(decision.feedback, "new");
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_cache_empty() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Parse(
            "no id".into(),
        ))]));
        let mut selector = selector(provider);

        let err = selector.prepare_next(&after_first_answer()).await.unwrap_err();
        assert!(matches!(err, SessionError::Provider(ProviderError::Parse(_))));
        assert!(selector.peek_cached().is_none());
    }

    #[tokio::test]
    async fn test_failed_prepare_discards_older_decision() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            choice(3, "stale"),
            Err(ProviderError::Request("down".into())),
            choice(1, "fresh"),
        ]));
        let mut selector = selector(Arc::clone(&provider));

        selector.prepare_next(&after_first_answer()).await.unwrap();
        assert!(selector.prepare_next(&after_first_answer()).await.is_err());
        assert!(selector.peek_cached().is_none());

        let decision = selector.select(&after_first_answer()).await.unwrap();
        assert_eq!(decision.item.id, 1);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_unknown_item_is_provider_failure() {
        let provider = Arc::new(ScriptedProvider::new(vec![choice(99, "?")]));
        let mut selector = selector(provider);

        let err = selector.prepare_next(&after_first_answer()).await.unwrap_err();
        assert!(matches!(err, SessionError::Provider(ProviderError::UnknownItem(99))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out() {
        let provider = Arc::new(ScriptedProvider {
            delay: Some(Duration::from_secs(60)),
            ..ScriptedProvider::new(vec![choice(3, "late")])
        });
        let mut selector = AdvisorySelector::new(bank(), provider, Duration::from_secs(1));

        let err = selector.prepare_next(&after_first_answer()).await.unwrap_err();
        assert!(matches!(err, SessionError::Provider(ProviderError::Timeout(_))));
    }
}
