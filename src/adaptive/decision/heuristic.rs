use std::collections::HashSet;
use std::sync::Arc;

use crate::adaptive::error::SessionError;
use crate::adaptive::types::{Decision, SelectionContext};
use crate::content::{Item, ItemId, ItemRepository};

/// Picks the unanswered item whose difficulty is nearest the current mastery.
pub struct HeuristicSelector {
    items: Arc<dyn ItemRepository>,
}

impl HeuristicSelector {
    pub fn new(items: Arc<dyn ItemRepository>) -> Self {
        Self { items }
    }

    pub fn select(&self, ctx: &SelectionContext<'_>) -> Result<Decision, SessionError> {
        let candidates = unanswered(self.items.all()?, ctx.answered);
        let item = closest_difficulty(candidates, ctx.current_mastery).ok_or(SessionError::Exhausted)?;
        Ok(Decision::local(item))
    }
}

pub(crate) fn unanswered(items: Vec<Item>, answered: &[ItemId]) -> Vec<Item> {
    let answered: HashSet<ItemId> = answered.iter().copied().collect();
    items
        .into_iter()
        .filter(|item| !answered.contains(&item.id))
        .collect()
}

/// First item in iteration order wins ties.
pub(crate) fn closest_difficulty(items: Vec<Item>, target: f64) -> Option<Item> {
    let mut best: Option<(f64, Item)> = None;
    for item in items {
        let distance = (item.difficulty - target).abs();
        let closer = match &best {
            Some((best_distance, _)) => distance < *best_distance,
            None => true,
        };
        if closer {
            best = Some((distance, item));
        }
    }
    best.map(|(_, item)| item)
}

pub(crate) fn easiest(items: Vec<Item>) -> Option<Item> {
    let mut best: Option<Item> = None;
    for item in items {
        let easier = best
            .as_ref()
            .map_or(true, |current| item.difficulty < current.difficulty);
        if easier {
            best = Some(item);
        }
    }
    best
}
