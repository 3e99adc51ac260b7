// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key-value state shared with the status UI.
//!
//! Values are JSON. Every write publishes one [`StoreChange`] per key so
//! observers outside the agent, such as the status UI, can follow state changes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

pub type StoreMap = serde_json::Map<String, Value>;

const CHANGE_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A single key change. `new_value` is `None` on removal.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: String,
    pub new_value: Option<Value>,
}

#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Values for the requested keys; missing keys are absent from the map.
    async fn get(&self, keys: &[&str]) -> Result<StoreMap, StoreError>;

    async fn set(&self, entries: StoreMap) -> Result<(), StoreError>;

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;

    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Shared map + change feed used by both store implementations.
struct Entries {
    map: Mutex<StoreMap>,
    changes: broadcast::Sender<StoreChange>,
}

impl Entries {
    fn new(map: StoreMap) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self { map: Mutex::new(map), changes }
    }

    fn get(&self, keys: &[&str]) -> StoreMap {
        let map = self.map.lock();
        keys.iter().filter_map(|k| map.get(*k).map(|v| (k.to_string(), v.clone()))).collect()
    }

    /// Apply and return the changes that actually altered the map.
    fn set(&self, entries: StoreMap) -> Vec<StoreChange> {
        let mut map = self.map.lock();
        let mut changed = Vec::new();
        for (key, value) in entries {
            if map.get(&key) != Some(&value) {
                map.insert(key.clone(), value.clone());
                changed.push(StoreChange { key, new_value: Some(value) });
            }
        }
        changed
    }

    fn remove(&self, keys: &[&str]) -> Vec<StoreChange> {
        let mut map = self.map.lock();
        keys.iter()
            .filter(|k| map.remove(**k).is_some())
            .map(|k| StoreChange { key: k.to_string(), new_value: None })
            .collect()
    }

    fn snapshot(&self) -> StoreMap {
        self.map.lock().clone()
    }

    fn publish(&self, changes: Vec<StoreChange>) {
        for change in changes {
            // No subscribers is fine
            let _ = self.changes.send(change);
        }
    }
}

/// JSON-file backed store. Writes go to a temp file and are renamed into place.
#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: Arc<Entries>,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let map = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => StoreMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            entries: Arc::new(Entries::new(map)),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let bytes = serde_json::to_vec_pretty(&self.entries.snapshot())?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreMap, StoreError> {
        Ok(self.entries.get(keys))
    }

    async fn set(&self, entries: StoreMap) -> Result<(), StoreError> {
        let changes = self.entries.set(entries);
        if changes.is_empty() {
            return Ok(());
        }
        self.flush().await?;
        self.entries.publish(changes);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let changes = self.entries.remove(keys);
        if changes.is_empty() {
            return Ok(());
        }
        self.flush().await?;
        self.entries.publish(changes);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.entries.changes.subscribe()
    }
}

/// Volatile store. Nothing survives the process.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<Entries>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self { entries: Arc::new(Entries::new(StoreMap::new())) }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(map: StoreMap) -> Self {
        Self { entries: Arc::new(Entries::new(map)) }
    }

    /// Synchronous peek for assertions.
    pub fn value(&self, key: &str) -> Option<Value> {
        self.entries.map.lock().get(key).cloned()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreMap, StoreError> {
        Ok(self.entries.get(keys))
    }

    async fn set(&self, entries: StoreMap) -> Result<(), StoreError> {
        let changes = self.entries.set(entries);
        self.entries.publish(changes);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let changes = self.entries.remove(keys);
        self.entries.publish(changes);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.entries.changes.subscribe()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
