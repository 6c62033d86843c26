//! Persistence module
//!
//! Timers and history are kept as two JSON collections in an opaque key-value
//! store. [`TimerStore`] and [`HistoryStore`] own all merge logic: the store
//! itself only ever sees whole-collection overwrites.

pub mod file;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{
    error::StoreError,
    state::{HistoryEntry, Timer},
};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Key of the persisted timer collection
pub const TIMERS_KEY: &str = "timers";
/// Key of the persisted completion history
pub const HISTORY_KEY: &str = "history";

/// Async string-blob storage addressed by fixed keys
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `None` when the key was never written
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value stored under `key`
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Decode a persisted collection.
///
/// Absent or unparseable data reads as empty. Inside a well-formed array each
/// record is decoded on its own, so one bad record is skipped without taking
/// the valid ones with it.
fn decode_collection<T: DeserializeOwned>(key: &str, raw: Option<String>) -> Vec<T> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let records: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(e) => {
            warn!("Discarding malformed '{}' collection: {}", key, e);
            return Vec::new();
        }
    };

    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value(record) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping malformed '{}' record #{}: {}", key, index, e);
                None
            }
        })
        .collect()
}

fn encode_collection<T: Serialize>(key: &str, items: &[T]) -> Result<String, StoreError> {
    serde_json::to_string(items).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })
}

/// Sole authority over the persisted timer collection.
///
/// Every write is a read-modify-write performed by [`TimerStore::update`]
/// while holding one async mutex, so two writers can never interleave
/// between read and write.
pub struct TimerStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl TimerStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> Result<Vec<Timer>, StoreError> {
        let raw = self.kv.get(TIMERS_KEY).await?;
        Ok(decode_collection(TIMERS_KEY, raw))
    }

    /// Snapshot of all timers. Read failures degrade to an empty list.
    pub async fn load(&self) -> Vec<Timer> {
        match self.read().await {
            Ok(timers) => timers,
            Err(e) => {
                warn!("Failed to load timers, treating as empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Fetch one timer without taking the write lock
    pub async fn find(&self, id: &str) -> Result<Option<Timer>, StoreError> {
        Ok(self.read().await?.into_iter().find(|t| t.id == id))
    }

    /// Lock the collection and read it for a read-modify-write.
    ///
    /// The lock is held until the returned transaction is committed or
    /// dropped; dropping without [`TimerTransaction::commit`] writes nothing.
    /// A read failure aborts here, so an unreadable store is never
    /// overwritten with a partial view.
    pub async fn begin(&self) -> Result<TimerTransaction<'_>, StoreError> {
        let guard = self.write_lock.lock().await;
        let timers = self.read().await?;
        Ok(TimerTransaction {
            store: self,
            _guard: guard,
            timers,
        })
    }

    /// Run `f` over the full collection and persist the result as one write
    pub async fn update<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Vec<Timer>) -> R,
    {
        let mut tx = self.begin().await?;
        let out = f(&mut tx.timers);
        tx.commit().await?;
        Ok(out)
    }
}

/// Exclusive view of the timer collection between read and write
pub struct TimerTransaction<'a> {
    store: &'a TimerStore,
    _guard: MutexGuard<'a, ()>,
    pub timers: Vec<Timer>,
}

impl TimerTransaction<'_> {
    pub fn find_mut(&mut self, id: &str) -> Option<&mut Timer> {
        self.timers.iter_mut().find(|t| t.id == id)
    }

    /// Persist the collection but keep holding the lock.
    ///
    /// Lets callers bring state that mirrors the stored timers (such as the
    /// countdown registry) in line before another writer can get in.
    pub async fn save(&mut self) -> Result<(), StoreError> {
        let encoded = encode_collection(TIMERS_KEY, &self.timers)?;
        self.store.kv.set(TIMERS_KEY, encoded).await?;
        debug!("Persisted {} timers", self.timers.len());
        Ok(())
    }

    /// Persist the collection and release the lock
    pub async fn commit(mut self) -> Result<(), StoreError> {
        self.save().await
    }
}

/// Sole authority over the append-only completion history
pub struct HistoryStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    /// All entries in completion order. Read failures degrade to an empty list.
    pub async fn load(&self) -> Vec<HistoryEntry> {
        match self.kv.get(HISTORY_KEY).await {
            Ok(raw) => decode_collection(HISTORY_KEY, raw),
            Err(e) => {
                warn!("Failed to load history, treating as empty: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn append(&self, entry: HistoryEntry) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let raw = self.kv.get(HISTORY_KEY).await?;
        let mut entries: Vec<HistoryEntry> = decode_collection(HISTORY_KEY, raw);
        entries.push(entry);
        let encoded = encode_collection(HISTORY_KEY, &entries)?;
        self.kv.set(HISTORY_KEY, encoded).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.kv.remove(HISTORY_KEY).await
    }
}
