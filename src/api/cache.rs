use crate::model::Recipe;
use std::time::Duration;
use tokio::time::Instant;

struct Entry {
    recipes: Vec<Recipe>,
    captured_at: Instant,
}

/// Time-bounded cache for the featured recipe list.
///
/// Holds at most one entry. An entry is served while
/// `now - captured_at < validity`; storing replaces it wholesale.
pub struct FeaturedCache {
    entry: Option<Entry>,
    validity: Duration,
}

impl FeaturedCache {
    pub fn new(validity: Duration) -> Self {
        Self {
            entry: None,
            validity,
        }
    }

    /// Cached recipes and their age, if the entry is still fresh
    pub fn get(&self) -> Option<(Vec<Recipe>, Duration)> {
        let entry = self.entry.as_ref()?;
        let age = entry.captured_at.elapsed();
        (age < self.validity).then(|| (entry.recipes.clone(), age))
    }

    pub fn store(&mut self, recipes: Vec<Recipe>) {
        self.entry = Some(Entry {
            recipes,
            captured_at: Instant::now(),
        });
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
