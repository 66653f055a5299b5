use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::content::{Item, ItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[serde(alias = "bkt")]
    Deterministic,
    #[serde(alias = "llm")]
    Advisory,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Deterministic => "deterministic",
            SessionMode::Advisory => "advisory",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deterministic" | "bkt" => Ok(SessionMode::Deterministic),
            "advisory" | "llm" => Ok(SessionMode::Advisory),
            other => Err(format!("unknown session mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub item_id: ItemId,
    pub correct: bool,
}

/// Read-only view of a session handed to a strategy for one selection call.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub current_mastery: f64,
    pub answered: &'a [ItemId],
    pub history: &'a [AnswerRecord],
}

/// Learner model reported by the decision provider alongside its choice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSignals {
    pub knowledge_level: f64,
    pub confidence: f64,
    pub learning_rate: f64,
    pub pattern_consistency: f64,
    pub difficulty_tolerance: f64,
}

impl ConfidenceSignals {
    /// Clamps every signal into [0, 1]; non-finite values become 0.
    pub fn clamped(self) -> Self {
        fn unit(value: f64) -> f64 {
            if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                0.0
            }
        }

        Self {
            knowledge_level: unit(self.knowledge_level),
            confidence: unit(self.confidence),
            learning_rate: unit(self.learning_rate),
            pattern_consistency: unit(self.pattern_consistency),
            difficulty_tolerance: unit(self.difficulty_tolerance),
        }
    }
}

/// A chosen item plus whatever rationale produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub item: Item,
    pub feedback: String,
    pub reasoning: String,
    pub confidence: Option<ConfidenceSignals>,
}

impl Decision {
    pub fn local(item: Item) -> Self {
        Self {
            item,
            feedback: String::new(),
            reasoning: String::new(),
            confidence: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing_accepts_aliases() {
        assert_eq!("bkt".parse::<SessionMode>().unwrap(), SessionMode::Deterministic);
        assert_eq!("LLM".parse::<SessionMode>().unwrap(), SessionMode::Advisory);
        assert_eq!(" advisory ".parse::<SessionMode>().unwrap(), SessionMode::Advisory);
        assert!("random".parse::<SessionMode>().is_err());
    }

    #[test]
    fn test_mode_serializes_canonical_name() {
        let json = serde_json::to_string(&SessionMode::Advisory).unwrap();
        assert_eq!(json, "\"advisory\"");
        let parsed: SessionMode = serde_json::from_str("\"bkt\"").unwrap();
        assert_eq!(parsed, SessionMode::Deterministic);
    }

    #[test]
    fn test_confidence_clamped() {
        let signals = ConfidenceSignals {
            knowledge_level: 1.4,
            confidence: -0.2,
            learning_rate: f64::NAN,
            pattern_consistency: 0.5,
            difficulty_tolerance: 1.0,
        }
        .clamped();

        assert_eq!(signals.knowledge_level, 1.0);
        assert_eq!(signals.confidence, 0.0);
        assert_eq!(signals.learning_rate, 0.0);
        assert_eq!(signals.pattern_consistency, 0.5);
        assert_eq!(signals.difficulty_tolerance, 1.0);
    }
}
