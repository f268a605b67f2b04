//! Recently viewed cities.
//!
//! The history is a bounded list of at most [`MAX_HISTORY`] items, unique by
//! case-insensitive city name. Cities the user removed go into an exclusion
//! set and are skipped by [`HistoryManager::record`] until
//! [`HistoryManager::allow_readdition`] lifts them again.

use std::{collections::BTreeSet, sync::Arc};

use crate::{
    clock::Clock,
    model::{CurrentWeather, HistoryItem},
    storage::{self, EXCLUSIONS_KEY, HISTORY_KEY, KeyValueStore},
};

pub const MAX_HISTORY: usize = 10;
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug)]
pub struct HistoryManager {
    items: Vec<HistoryItem>,
    excluded: BTreeSet<String>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

fn key_of(city: &str) -> String {
    city.to_lowercase()
}

impl HistoryManager {
    /// Empty manager; call [`load`](Self::load) to pick up persisted state.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { items: Vec::new(), excluded: BTreeSet::new(), store, clock }
    }

    /// Replaces in-memory state with what is persisted. Missing or corrupt
    /// records load as empty. Entries naming the same city keep only the
    /// newest one.
    pub fn load(&mut self) {
        let stored: Vec<HistoryItem> =
            storage::load_record(self.store.as_ref(), HISTORY_KEY).unwrap_or_default();

        let mut items: Vec<HistoryItem> = Vec::with_capacity(stored.len());
        for item in stored {
            let key = key_of(&item.city);
            match items.iter_mut().find(|kept| key_of(&kept.city) == key) {
                Some(kept) if item.timestamp > kept.timestamp => *kept = item,
                Some(_) => {}
                None => items.push(item),
            }
        }
        items.truncate(MAX_HISTORY);

        let excluded: BTreeSet<String> =
            storage::load_record(self.store.as_ref(), EXCLUSIONS_KEY).unwrap_or_default();

        tracing::debug!(items = items.len(), excluded = excluded.len(), "loaded search history");

        self.items = items;
        self.excluded = excluded.iter().map(|c| key_of(c)).collect();
    }

    /// Records a view of `city`. No-op for excluded cities.
    ///
    /// An existing entry with the same case-insensitive name is replaced in
    /// place; otherwise the city is pushed to the front and the oldest
    /// insertions beyond [`MAX_HISTORY`] are dropped.
    pub fn record(&mut self, city: &str, weather: Option<CurrentWeather>) {
        let key = key_of(city);
        if self.excluded.contains(&key) {
            tracing::debug!(city, "skipping excluded city");
            return;
        }

        let item = HistoryItem { city: city.to_string(), timestamp: self.clock.now(), weather };

        match self.items.iter_mut().find(|existing| key_of(&existing.city) == key) {
            Some(existing) => *existing = item,
            None => {
                self.items.insert(0, item);
                self.items.truncate(MAX_HISTORY);
            }
        }

        self.save_items();
    }

    /// Tombstones `city` and drops every matching item.
    ///
    /// Returns the lower-cased key that was excluded, so the caller can
    /// compare it with whatever location is on screen.
    pub fn remove(&mut self, city: &str) -> String {
        let key = key_of(city);

        self.excluded.insert(key.clone());
        self.save_excluded();

        let before = self.items.len();
        self.items.retain(|item| key_of(&item.city) != key);
        tracing::debug!(city, removed = before - self.items.len(), "removed city from history");
        self.save_items();

        key
    }

    /// Lifts the tombstone for `city`. History itself is left untouched.
    pub fn allow_readdition(&mut self, city: &str) {
        self.excluded.remove(&key_of(city));
        self.save_excluded();
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.save_items();
    }

    /// Up to [`RECENT_LIMIT`] items, newest first.
    pub fn recent_first(&self) -> Vec<HistoryItem> {
        let mut items = self.items.clone();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        items.truncate(RECENT_LIMIT);
        items
    }

    /// The item with the latest timestamp.
    pub fn most_recent(&self) -> Option<&HistoryItem> {
        self.items.iter().max_by_key(|item| item.timestamp)
    }

    /// Items in storage order.
    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_excluded(&self, city: &str) -> bool {
        self.excluded.contains(&key_of(city))
    }

    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(String::as_str)
    }

    fn save_items(&self) {
        storage::persist(self.store.as_ref(), HISTORY_KEY, &self.items);
    }

    fn save_excluded(&self) {
        storage::persist(self.store.as_ref(), EXCLUSIONS_KEY, &self.excluded);
    }
}
