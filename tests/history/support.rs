//! Shared fixtures: a store over in-memory storage with a manual clock.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use feed_history::{CardSnapshot, Clock, FeedHistoryConfig, HistoryStore, InMemoryStorage, ManualClock};

pub struct Harness {
    pub storage: InMemoryStorage,
    pub clock: ManualClock,
    pub store: HistoryStore,
}

impl Harness {
    pub fn new() -> Self {
        Self::over(InMemoryStorage::new())
    }

    /// A fresh store over existing storage, as after a page reload.
    pub fn over(storage: InMemoryStorage) -> Self {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        let store = HistoryStore::new(Arc::new(storage.clone()), &FeedHistoryConfig::default())
            .with_clock(Arc::new(clock.clone()));
        Harness {
            storage,
            clock,
            store,
        }
    }

    /// `over`, hydrated.
    pub async fn reload(storage: InMemoryStorage) -> Self {
        let harness = Self::over(storage);
        harness.store.hydrate().await.unwrap();
        harness
    }

    pub fn snapshot(&self, id: &str) -> CardSnapshot {
        let markup = format!(r#"<div class="feed-card" data-id="{}"></div>"#, id);
        let snapshot = CardSnapshot::new(id, markup, self.clock.now());
        self.clock.advance(Duration::seconds(1));
        snapshot
    }

    pub fn ids(&self) -> Vec<String> {
        self.store.ids().unwrap()
    }

    /// Ids in the persisted blob, once queued writes have landed.
    pub async fn persisted_ids(&self) -> Vec<String> {
        self.store.flush().await;
        match self.storage.peek("feedHistory").unwrap() {
            Some(blob) => blob
                .as_array()
                .unwrap()
                .iter()
                .map(|item| item["id"].as_str().unwrap().to_string())
                .collect(),
            None => Vec::new(),
        }
    }
}
