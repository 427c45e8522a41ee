use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;

use super::KvStorage;

/// In-memory key/value store backed by `Arc<RwLock<HashMap>>`.
///
/// Clone-friendly (cloning shares the same underlying storage). Reads and
/// writes can be made to fail on demand, which is how persistence failures
/// are exercised.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    values: Arc<RwLock<HashMap<String, Value>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful `set`, `remove` and `clear` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        let values = self
            .values
            .read()
            .map_err(|_| StorageError::LockPoisoned("keys"))?;
        let mut keys: Vec<String> = values.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Reads a value directly, ignoring injected read failures.
    pub fn peek(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let values = self
            .values
            .read()
            .map_err(|_| StorageError::LockPoisoned("peek"))?;
        Ok(values.get(key).cloned())
    }

    /// Stores a value directly, ignoring injected write failures. Not
    /// counted as a write.
    pub fn seed(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| StorageError::LockPoisoned("seed"))?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn check_write(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected {
                key: key.to_string(),
                reason: "quota exceeded".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KvStorage for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::ReadFailed {
                key: key.to_string(),
                reason: "storage unavailable".to_string(),
            });
        }
        let values = self
            .values
            .read()
            .map_err(|_| StorageError::LockPoisoned("get"))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.check_write(key)?;
        let mut values = self
            .values
            .write()
            .map_err(|_| StorageError::LockPoisoned("set"))?;
        values.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.check_write(key)?;
        let mut values = self
            .values
            .write()
            .map_err(|_| StorageError::LockPoisoned("remove"))?;
        let existed = values.remove(key).is_some();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(existed)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::ClearFailed("quota exceeded".to_string()));
        }
        let mut values = self
            .values
            .write()
            .map_err(|_| StorageError::LockPoisoned("clear"))?;
        values.clear();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
