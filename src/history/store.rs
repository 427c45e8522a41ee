use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{FeedHistoryConfig, StorageKeys};
use crate::dom::Element;
use crate::error::HistoryError;
use crate::identity::IdentityRules;
use crate::sanitize::sanitize;
use crate::storage::{SharedStorage, StorageWriter};

use super::limit::RetentionLimit;
use super::snapshot::{CardSnapshot, SnapshotRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    Inserted,
    Duplicate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    Stored(String),
    Duplicate(String),
    /// No identity could be derived; nothing was stored.
    Unidentifiable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HydrateOutcome {
    Hydrated {
        restored: usize,
        discarded: usize,
        evicted: usize,
    },
    AlreadyHydrated,
}

#[derive(Debug)]
struct HistoryState {
    entries: VecDeque<CardSnapshot>,
    ids: HashSet<String>,
    limit: RetentionLimit,
    hydrated: bool,
}

impl HistoryState {
    fn new(limit: RetentionLimit) -> Self {
        HistoryState {
            entries: VecDeque::new(),
            ids: HashSet::new(),
            limit,
            hydrated: false,
        }
    }

    fn insert(&mut self, snapshot: CardSnapshot) -> AppendOutcome {
        if !self.ids.insert(snapshot.id().to_string()) {
            return AppendOutcome::Duplicate;
        }
        self.entries.push_back(snapshot);
        AppendOutcome::Inserted
    }

    /// Evicts from the head until the limit holds. Returns how many went.
    fn trim(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.limit.get() {
            match self.entries.pop_front() {
                Some(oldest) => {
                    self.ids.remove(oldest.id());
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.ids.clear();
    }
}

/// The bounded, ordered, deduplicated capture history.
///
/// Clone-friendly: clones share the same in-memory sequence, so the watcher
/// and the panel can each hold a handle. Every mutating call runs to
/// completion (dedup, insert, trim, persist) under one write lock, which
/// keeps appends serialized however bursty the callers are.
///
/// Persistence is whole-blob, fire-and-forget and best effort. Writes are
/// queued in mutation order and applied in the background; a failed write is
/// logged and otherwise ignored. The in-memory sequence stays authoritative
/// and the next successful write reconciles storage. Nothing is written
/// before `hydrate`, so early captures never replace the persisted history.
#[derive(Clone)]
pub struct HistoryStore {
    state: Arc<RwLock<HistoryState>>,
    storage: SharedStorage,
    writer: StorageWriter,
    clock: Arc<dyn Clock>,
    keys: StorageKeys,
    default_limit: RetentionLimit,
    identity: Arc<IdentityRules>,
}

impl HistoryStore {
    pub fn new(storage: SharedStorage, config: &FeedHistoryConfig) -> Self {
        HistoryStore {
            state: Arc::new(RwLock::new(HistoryState::new(config.default_limit))),
            writer: StorageWriter::new(Arc::clone(&storage)),
            storage,
            clock: Arc::new(SystemClock),
            keys: config.storage_keys.clone(),
            default_limit: config.default_limit,
            identity: Arc::new(config.identity.clone()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Loads the limit and the persisted sequence, then applies the limit.
    ///
    /// Runs once; later calls report `AlreadyHydrated`. Anything captured
    /// before hydration is kept and ordered after the persisted entries.
    pub async fn hydrate(&self) -> Result<HydrateOutcome, HistoryError> {
        if self.is_hydrated()? {
            return Ok(HydrateOutcome::AlreadyHydrated);
        }

        let persisted_limit = match self.storage.get(&self.keys.limit).await {
            Ok(value) => Some(RetentionLimit::from_persisted(value.as_ref(), self.default_limit)),
            Err(err) => {
                warn!(error = %err, "could not read retention limit, using default");
                None
            }
        };
        let (persisted, mut discarded) = match self.storage.get(&self.keys.history).await {
            Ok(Some(blob)) => decode_history(blob),
            Ok(None) => (Vec::new(), 0),
            Err(err) => {
                warn!(error = %err, "could not read feed history, starting empty");
                (Vec::new(), 0)
            }
        };

        let mut state = self.write("hydrate")?;
        if state.hydrated {
            return Ok(HydrateOutcome::AlreadyHydrated);
        }
        state.hydrated = true;
        state.limit = persisted_limit.unwrap_or(self.default_limit);

        let captured_early: Vec<CardSnapshot> = state.entries.drain(..).collect();
        state.ids.clear();

        let mut restored = 0;
        for snapshot in persisted {
            match state.insert(snapshot) {
                AppendOutcome::Inserted => restored += 1,
                AppendOutcome::Duplicate => discarded += 1,
            }
        }
        let early = captured_early.len();
        for snapshot in captured_early {
            state.insert(snapshot);
        }

        let evicted = state.trim();
        if evicted > 0 || early > 0 {
            self.persist(&state);
        }

        info!(
            restored,
            discarded,
            evicted,
            limit = %state.limit,
            "feed history hydrated"
        );
        Ok(HydrateOutcome::Hydrated {
            restored,
            discarded,
            evicted,
        })
    }

    /// Appends at the tail unless the id is already present, trims from the
    /// head to the limit, and persists.
    pub fn append(&self, snapshot: CardSnapshot) -> Result<AppendOutcome, HistoryError> {
        let mut state = self.write("append")?;
        let id = snapshot.id().to_string();
        if state.insert(snapshot) == AppendOutcome::Duplicate {
            debug!(%id, "card already in history");
            return Ok(AppendOutcome::Duplicate);
        }
        let evicted = state.trim();
        debug!(%id, evicted, len = state.entries.len(), "card appended to history");
        self.persist(&state);
        Ok(AppendOutcome::Inserted)
    }

    /// Resolves identity, sanitizes and appends a card that is leaving the page.
    pub fn capture(&self, card: &Element) -> Result<CaptureOutcome, HistoryError> {
        let Some(id) = self.identity.resolve(card) else {
            debug!("card has no usable identity, skipped");
            return Ok(CaptureOutcome::Unidentifiable);
        };
        if self.contains(&id)? {
            return Ok(CaptureOutcome::Duplicate(id));
        }
        let markup = sanitize(card).outer_html();
        let snapshot = CardSnapshot::new(id.clone(), markup, self.clock.now());
        Ok(match self.append(snapshot)? {
            AppendOutcome::Inserted => CaptureOutcome::Stored(id),
            AppendOutcome::Duplicate => CaptureOutcome::Duplicate(id),
        })
    }

    /// Clamps and persists a new limit, evicting the oldest entries if the
    /// history is now over it. Returns the limit actually applied.
    pub fn set_limit(&self, requested: i64) -> Result<RetentionLimit, HistoryError> {
        let limit = RetentionLimit::clamped(requested);
        let mut state = self.write("set_limit")?;
        state.limit = limit;
        if state.hydrated {
            self.writer.set(&self.keys.limit, limit.to_persisted());
        }
        let evicted = state.trim();
        if evicted > 0 {
            self.persist(&state);
        }
        info!(%limit, evicted, "retention limit changed");
        Ok(limit)
    }

    pub fn clear(&self) -> Result<(), HistoryError> {
        let mut state = self.write("clear")?;
        state.clear();
        self.persist(&state);
        info!("feed history cleared");
        Ok(())
    }

    /// Drops in-memory state without touching storage. A later `hydrate`
    /// reloads from storage.
    pub fn teardown(&self) -> Result<(), HistoryError> {
        let mut state = self.write("teardown")?;
        state.clear();
        state.limit = self.default_limit;
        state.hydrated = false;
        Ok(())
    }

    /// Oldest first.
    pub fn snapshots(&self) -> Result<Vec<CardSnapshot>, HistoryError> {
        let state = self.read("snapshots")?;
        Ok(state.entries.iter().cloned().collect())
    }

    pub fn newest_first(&self) -> Result<Vec<CardSnapshot>, HistoryError> {
        let state = self.read("newest_first")?;
        Ok(state.entries.iter().rev().cloned().collect())
    }

    pub fn ids(&self) -> Result<Vec<String>, HistoryError> {
        let state = self.read("ids")?;
        Ok(state.entries.iter().map(|s| s.id().to_string()).collect())
    }

    pub fn contains(&self, id: &str) -> Result<bool, HistoryError> {
        Ok(self.read("contains")?.ids.contains(id))
    }

    pub fn len(&self) -> Result<usize, HistoryError> {
        Ok(self.read("len")?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, HistoryError> {
        Ok(self.len()? == 0)
    }

    pub fn limit(&self) -> Result<RetentionLimit, HistoryError> {
        Ok(self.read("limit")?.limit)
    }

    pub fn is_hydrated(&self) -> Result<bool, HistoryError> {
        Ok(self.read("is_hydrated")?.hydrated)
    }

    /// Waits for every queued write to reach storage.
    pub async fn flush(&self) {
        self.writer.flush().await
    }

    fn persist(&self, state: &HistoryState) {
        if !state.hydrated {
            debug!("history not hydrated yet, write deferred to hydration");
            return;
        }
        let records: Vec<SnapshotRecord> = state.entries.iter().map(CardSnapshot::to_record).collect();
        match serde_json::to_value(&records) {
            Ok(blob) => {
                self.writer.set(&self.keys.history, blob);
                debug!(count = records.len(), "feed history write queued");
            }
            Err(err) => warn!(error = %err, "failed to encode feed history"),
        }
    }

    fn read(&self, operation: &'static str) -> Result<RwLockReadGuard<'_, HistoryState>, HistoryError> {
        self.state
            .read()
            .map_err(|_| HistoryError::LockPoisoned(operation))
    }

    fn write(&self, operation: &'static str) -> Result<RwLockWriteGuard<'_, HistoryState>, HistoryError> {
        self.state
            .write()
            .map_err(|_| HistoryError::LockPoisoned(operation))
    }
}

/// Decodes the persisted blob, skipping entries that do not parse.
/// Returns the snapshots and how many entries were skipped.
fn decode_history(blob: Value) -> (Vec<CardSnapshot>, usize) {
    let Value::Array(items) = blob else {
        warn!("persisted feed history is not an array, ignoring it");
        return (Vec::new(), 0);
    };
    let mut snapshots = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for item in items {
        let decoded = serde_json::from_value::<SnapshotRecord>(item)
            .ok()
            .and_then(|record| CardSnapshot::try_from(record).ok());
        match decoded {
            Some(snapshot) => snapshots.push(snapshot),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, "skipped malformed history entries");
    }
    (snapshots, skipped)
}
