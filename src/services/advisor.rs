use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::adaptive::decision::{DecisionProvider, ProviderDecision, ProviderError};
use crate::adaptive::types::{AnswerRecord, ConfidenceSignals};
use crate::content::{Item, ItemId};
use crate::services::llm_provider::{LLMError, LLMProvider};

const ADVISOR_SYSTEM_PROMPT: &str = r#"You are the item-selection engine of an adaptive assessment. You will receive an item bank and a learner's answer history and must choose the single best next item, keeping the learner challenged but not overwhelmed.

The bank arrives inside <question_bank></question_bank> as JSON. Every item has an id, prompt, answer, difficulty (0.0 easiest to 1.0 hardest) and tags.
The history arrives inside <answer_history></answer_history> as JSON records of item_id and correct, oldest first.

Work through the following before answering:
1. Estimate mastery: overall accuracy, accuracy by difficulty band and by tag, and the recent trend.
2. Choose the next item: aim slightly above demonstrated mastery. Raise difficulty by 0.1-0.2 after consistent success (about 70% or better), lower it by 0.1-0.2 when accuracy falls below about 50%. Prefer items not yet answered and revisit tags the learner struggles with.
3. Write feedback on the most recent answer: why it was right or wrong, the likely misconception if wrong, and encouragement matched to the trajectory. Keep it short when the learner is doing well.

Respond using exactly these sections:

<analysis>Short summary of mastery, strengths and gaps.</analysis>
<feedback>Feedback on the most recent answer, addressed to the learner.</feedback>
<next_question_id>The numeric id of the chosen item and nothing else.</next_question_id>
<selection_reasoning>Why this item fits the learner now.</selection_reasoning>
<user_model>{"knowledge_level": 0.0, "confidence": 0.0, "learning_rate": 0.0, "pattern_consistency": 0.0, "difficulty_tolerance": 0.0}</user_model>

Every user_model value is a number between 0 and 1."#;

static NEXT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<next_question_id>\s*(-?\d+)\s*</next_question_id>").expect("valid regex")
});

#[derive(Serialize)]
struct PromptItem<'a> {
    id: ItemId,
    prompt: &'a str,
    answer: &'a str,
    difficulty: f64,
    tags: &'a [String],
}

/// Decision provider backed by a chat-completions model.
pub struct LlmDecisionProvider {
    llm: LLMProvider,
}

impl LlmDecisionProvider {
    pub fn new(llm: LLMProvider) -> Self {
        Self { llm }
    }

    /// Returns a provider only when the underlying client has credentials.
    pub fn from_env() -> Option<Self> {
        let llm = LLMProvider::from_env();
        if llm.is_available() {
            Some(Self::new(llm))
        } else {
            None
        }
    }
}

#[async_trait]
impl DecisionProvider for LlmDecisionProvider {
    async fn decide(
        &self,
        items: &[Item],
        history: &[AnswerRecord],
    ) -> Result<ProviderDecision, ProviderError> {
        let prompt = build_prompt(items, history)?;
        debug!(model = %self.llm.model(), answered = history.len(), "requesting next item decision");

        let raw = self.llm.complete_with_system(ADVISOR_SYSTEM_PROMPT, &prompt).await?;
        parse_decision(&raw)
    }
}

impl From<LLMError> for ProviderError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::Json(e) => ProviderError::Parse(e.to_string()),
            LLMError::EmptyChoices => ProviderError::Parse("empty completion".to_string()),
            other => ProviderError::Request(other.to_string()),
        }
    }
}

fn build_prompt(items: &[Item], history: &[AnswerRecord]) -> Result<String, ProviderError> {
    let bank: Vec<PromptItem<'_>> = items
        .iter()
        .map(|item| PromptItem {
            id: item.id,
            prompt: &item.prompt,
            answer: &item.answer,
            difficulty: item.difficulty,
            tags: &item.tags,
        })
        .collect();

    let bank = serde_json::to_string_pretty(&bank)
        .map_err(|e| ProviderError::Request(format!("failed to encode item bank: {e}")))?;
    let history = serde_json::to_string_pretty(history)
        .map_err(|e| ProviderError::Request(format!("failed to encode answer history: {e}")))?;

    Ok(format!(
        "<question_bank>\n{bank}\n</question_bank>\n\n<answer_history>\n{history}\n</answer_history>\n\nSelect the next question ID."
    ))
}

/// Parses a tagged completion. Only the item id is mandatory; the other
/// sections fall back to empty text or no snapshot.
pub fn parse_decision(raw: &str) -> Result<ProviderDecision, ProviderError> {
    let item_id = NEXT_ID_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<ItemId>().ok())
        .ok_or_else(|| ProviderError::Parse("no <next_question_id> in response".to_string()))?;

    Ok(ProviderDecision {
        item_id,
        feedback: extract_section(raw, "feedback").unwrap_or_default(),
        reasoning: extract_section(raw, "selection_reasoning").unwrap_or_default(),
        confidence: parse_user_model(raw),
    })
}

fn extract_section(raw: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = raw.find(&open)? + open.len();
    let end = raw[start..].find(&close)? + start;
    let text = raw[start..end].trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn parse_user_model(raw: &str) -> Option<ConfidenceSignals> {
    let block = extract_section(raw, "user_model")?;
    let json = block
        .strip_prefix("```json")
        .and_then(|s| s.strip_suffix("```"))
        .or_else(|| block.strip_prefix("```").and_then(|s| s.strip_suffix("```")))
        .unwrap_or(&block);

    match serde_json::from_str::<ConfidenceSignals>(json.trim()) {
        Ok(signals) => Some(signals.clamped()),
        Err(e) => {
            warn!(error = %e, "ignoring malformed user_model block");
            None
        }
    }
}
