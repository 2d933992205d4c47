//! Client-local key-value storage
//!
//! Values are JSON blobs with no schema versioning. `RocksDbStore` persists to
//! disk; `InMemoryStore` backs tests and ephemeral sessions.

use crate::{FlowboardError, Result};
use dashmap::DashMap;
use rocksdb::{Options, DB};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tracing::info;

/// Byte-level store interface; typed access lives in [`KeyValueStoreExt`]
pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn put_raw(&self, key: &str, value: Vec<u8>) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;
}

/// JSON helpers available on every store, including trait objects
pub trait KeyValueStoreExt: KeyValueStore {
    fn get_json<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>> {
        match self.get_raw(key)? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn put_json<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Result<()> {
        let serialized = serde_json::to_vec(value)?;
        self.put_raw(key, serialized)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}

/// Persistent storage using RocksDB
pub struct RocksDbStore {
    db: DB,
}

impl RocksDbStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path).map_err(|e| FlowboardError::StorageError(e.to_string()))?;

        info!(target: "storage", "RocksDB store initialized");
        Ok(Self { db })
    }
}

impl KeyValueStore for RocksDbStore {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| FlowboardError::StorageError(e.to_string()))
    }

    fn put_raw(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.db
            .put(key, value)
            .map_err(|e| FlowboardError::StorageError(e.to_string()))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.db
            .delete(key)
            .map_err(|e| FlowboardError::StorageError(e.to_string()))
    }
}

/// Volatile store; contents are lost on drop
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<String, Vec<u8>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    fn put_raw(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
