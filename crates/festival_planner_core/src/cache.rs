//! crates/festival_planner_core/src/cache.rs
//!
//! Session memoization of fetched event lists, keyed by period and category.
//! Entries are never invalidated or evicted.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::{Category, Event};

/// Identifies one Event Data Source response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub year: i32,
    /// Zero-based.
    pub month: u32,
    pub category: Category,
}

impl CacheKey {
    pub fn new(year: i32, month: u32, category: Category) -> Self {
        Self { year, month, category }
    }
}

/// Renders the composite `year-month-CATEGORY` form.
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.year, self.month, self.category)
    }
}

#[derive(Debug, Default)]
pub struct EventCache {
    entries: HashMap<CacheKey, Arc<Vec<Event>>>,
}

impl EventCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, year: i32, month: u32, category: Category) -> Option<Arc<Vec<Event>>> {
        self.lookup(&CacheKey::new(year, month, category))
    }

    pub fn lookup(&self, key: &CacheKey) -> Option<Arc<Vec<Event>>> {
        self.entries.get(key).cloned()
    }

    pub fn put(
        &mut self,
        year: i32,
        month: u32,
        category: Category,
        events: Vec<Event>,
    ) -> Arc<Vec<Event>> {
        self.store(CacheKey::new(year, month, category), events)
    }

    /// Writes an entry, replacing any previous list for the same key.
    pub fn store(&mut self, key: CacheKey, events: Vec<Event>) -> Arc<Vec<Event>> {
        let shared = Arc::new(events);
        self.entries.insert(key, shared.clone());
        shared
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
