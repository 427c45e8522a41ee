use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use feed_history::{
    FeedHistoryConfig, HistoryStore, HydrateOutcome, InMemoryStorage, KvStorage, StorageError,
};
use serde_json::{json, Value};

use crate::support::Harness;

#[tokio::test]
async fn reload_restores_sequence_and_limit() {
    let first = Harness::reload(InMemoryStorage::new()).await;
    first.store.set_limit(3).unwrap();
    for id in ["A", "B", "C", "D"] {
        first.store.append(first.snapshot(id)).unwrap();
    }
    let before = first.store.snapshots().unwrap();
    first.store.flush().await;

    let second = Harness::over(first.storage.clone());
    assert_eq!(
        second.store.hydrate().await.unwrap(),
        HydrateOutcome::Hydrated {
            restored: 3,
            discarded: 0,
            evicted: 0
        }
    );
    assert_eq!(second.store.limit().unwrap().get(), 3);
    assert_eq!(second.store.snapshots().unwrap(), before);
}

#[tokio::test]
async fn persisted_blob_has_wire_shape() {
    let h = Harness::reload(InMemoryStorage::new()).await;
    h.store.append(h.snapshot("card_BV1")).unwrap();
    h.store.flush().await;
    let blob = h.storage.peek("feedHistory").unwrap().unwrap();
    assert_eq!(
        blob,
        json!([{
            "id": "card_BV1",
            "html": r#"<div class="feed-card" data-id="card_BV1"></div>"#,
            "timestamp": "2024-05-01T08:00:00.000Z"
        }])
    );
}

#[tokio::test]
async fn unparseable_limit_falls_back_to_default() {
    let storage = InMemoryStorage::new();
    storage.seed("feedHistoryLimit", json!("lots")).unwrap();
    let h = Harness::reload(storage).await;
    assert_eq!(h.store.limit().unwrap().get(), 1000);
}

#[tokio::test]
async fn missing_blob_hydrates_empty() {
    let h = Harness::new();
    assert_eq!(
        h.store.hydrate().await.unwrap(),
        HydrateOutcome::Hydrated {
            restored: 0,
            discarded: 0,
            evicted: 0
        }
    );
    assert!(h.store.is_empty().unwrap());
    assert!(h.store.is_hydrated().unwrap());
}

#[tokio::test]
async fn failed_writes_leave_memory_authoritative() {
    let h = Harness::reload(InMemoryStorage::new()).await;
    h.store.append(h.snapshot("A")).unwrap();
    h.store.flush().await;

    h.storage.fail_writes(true);
    h.store.append(h.snapshot("B")).unwrap();
    assert_eq!(h.ids(), vec!["A", "B"]);
    assert_eq!(h.persisted_ids().await, vec!["A"]);

    // next successful write carries everything
    h.storage.fail_writes(false);
    h.store.append(h.snapshot("C")).unwrap();
    assert_eq!(h.persisted_ids().await, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn clear_then_reload_is_empty() {
    let h = Harness::reload(InMemoryStorage::new()).await;
    h.store.append(h.snapshot("A")).unwrap();
    h.store.clear().unwrap();
    h.store.flush().await;

    let reloaded = Harness::reload(h.storage.clone()).await;
    assert!(reloaded.store.is_empty().unwrap());
}

#[tokio::test]
async fn captures_before_hydration_never_replace_stored_history() {
    let previous = Harness::reload(InMemoryStorage::new()).await;
    for id in ["A", "B"] {
        previous.store.append(previous.snapshot(id)).unwrap();
    }
    previous.store.flush().await;

    let page_load = Harness::over(previous.storage.clone());
    page_load.store.append(page_load.snapshot("C")).unwrap();
    page_load.store.set_limit(50).unwrap();
    assert_eq!(page_load.persisted_ids().await, vec!["A", "B"]);

    page_load.store.hydrate().await.unwrap();
    assert_eq!(page_load.ids(), vec!["A", "B", "C"]);
    assert_eq!(page_load.persisted_ids().await, vec!["A", "B", "C"]);

    let next = Harness::reload(previous.storage.clone()).await;
    assert_eq!(next.ids(), vec!["A", "B", "C"]);
}

/// Storage whose writes take longer the earlier they are issued, and which
/// records the length of every blob it stores.
#[derive(Clone)]
struct SlowStorage {
    inner: InMemoryStorage,
    delays: Arc<Mutex<VecDeque<Duration>>>,
    stored_lengths: Arc<Mutex<Vec<usize>>>,
}

impl SlowStorage {
    fn new(delays: &[u64]) -> Self {
        SlowStorage {
            inner: InMemoryStorage::new(),
            delays: Arc::new(Mutex::new(
                delays.iter().copied().map(Duration::from_millis).collect(),
            )),
            stored_lengths: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl KvStorage for SlowStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let delay = self.delays.lock().unwrap().pop_front().unwrap_or_default();
        tokio::time::sleep(delay).await;
        if let Some(items) = value.as_array() {
            self.stored_lengths.lock().unwrap().push(items.len());
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.remove(key).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.inner.clear().await
    }
}

#[tokio::test(start_paused = true)]
async fn a_slow_early_write_never_lands_after_a_newer_one() {
    let storage = SlowStorage::new(&[300, 200, 100, 0]);
    let store = HistoryStore::new(Arc::new(storage.clone()), &FeedHistoryConfig::default());
    store.hydrate().await.unwrap();
    let harness = Harness::new();

    store.append(harness.snapshot("A")).unwrap();
    tokio::task::yield_now().await;
    store.append(harness.snapshot("B")).unwrap();
    tokio::task::yield_now().await;
    store.append(harness.snapshot("C")).unwrap();
    store.flush().await;

    let lengths = storage.stored_lengths.lock().unwrap().clone();
    assert!(lengths.windows(2).all(|pair| pair[0] < pair[1]), "{:?}", lengths);
    assert_eq!(lengths.last(), Some(&3));
    let blob = storage.inner.peek("feedHistory").unwrap().unwrap();
    let ids: Vec<&str> = blob
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
}
