mod static_bank;

pub use static_bank::StaticItemBank;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ItemId = i64;

/// A single assessment item. Immutable once loaded into a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub prompt: String,
    pub answer: String,
    #[serde(default)]
    pub options: Vec<String>,
    /// 0.0 (easiest) to 1.0 (hardest).
    pub difficulty: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("item {0} not found")]
    NotFound(ItemId),
    #[error("failed to read item bank {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse item bank: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid item bank: {0}")]
    Invalid(String),
}

/// Read-only source of items. Iteration order of `all` must be stable because
/// selection tie-breaks depend on it.
pub trait ItemRepository: Send + Sync {
    fn all(&self) -> Result<Vec<Item>, ContentError>;

    fn get(&self, id: ItemId) -> Result<Item, ContentError>;
}
