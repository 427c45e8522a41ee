//! The persistent key/value backend, seen as a whole-blob store.
//!
//! Browser extension storage has no transactions and no partial updates:
//! every key is read whole and written whole, and every call completes
//! asynchronously. Implementations may fail any call; callers in this crate
//! log and carry on.

mod in_memory;
mod writer;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;

pub use in_memory::InMemoryStorage;
pub use writer::StorageWriter;

#[async_trait]
pub trait KvStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Replaces the value stored under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Removes `key`. Returns true if it existed.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Removes every key in the namespace.
    async fn clear(&self) -> Result<(), StorageError>;
}

#[async_trait]
impl<S: KvStorage + ?Sized> KvStorage for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        (**self).clear().await
    }
}

pub type SharedStorage = Arc<dyn KvStorage>;
