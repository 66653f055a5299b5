use std::collections::HashSet;
use std::path::Path;

use super::{ContentError, Item, ItemId, ItemRepository};

#[derive(Debug, Clone)]
pub struct StaticItemBank {
    items: Vec<Item>,
}

impl StaticItemBank {
    pub fn new(items: Vec<Item>) -> Result<Self, ContentError> {
        if items.is_empty() {
            return Err(ContentError::Invalid("item bank is empty".to_string()));
        }

        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id) {
                return Err(ContentError::Invalid(format!("duplicate item id {}", item.id)));
            }
            if !item.difficulty.is_finite() || !(0.0..=1.0).contains(&item.difficulty) {
                return Err(ContentError::Invalid(format!(
                    "item {} has difficulty {} outside [0, 1]",
                    item.id, item.difficulty
                )));
            }
        }

        Ok(Self { items })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ContentError> {
        let items: Vec<Item> = serde_json::from_str(raw)?;
        Self::new(items)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let bank = Self::from_json_str(&raw)?;
        tracing::info!(path = %path.display(), items = bank.len(), "item bank loaded");
        Ok(bank)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ItemRepository for StaticItemBank {
    fn all(&self) -> Result<Vec<Item>, ContentError> {
        Ok(self.items.clone())
    }

    fn get(&self, id: ItemId) -> Result<Item, ContentError> {
        self.items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or(ContentError::NotFound(id))
    }
}
