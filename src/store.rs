use std::collections::{hash_map::Entry, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};
use uuid::Uuid;

use crate::fetch::Batch;
use crate::parse::Record;
use crate::{info_time, Error, Result, StoreError, TRANSACTION_COLLECTION, TRANSACTION_GROUP};

/// Where a record lives: a collection, the group it is filed under and its own generated id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub collection: String,
    pub parent: String,
    pub id: Uuid,
}

impl RecordKey {
    /// New key with a freshly generated id.
    pub fn generate(collection: &str, parent: &str) -> Self {
        Self {
            collection: collection.to_string(),
            parent: parent.to_string(),
            id: Uuid::new_v4(),
        }
    }
}

/// Persists single records. A failed insert leaves nothing behind.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, key: &RecordKey, record: &Record) -> core::result::Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub written: usize,
}

/// Writes every record of the batch under the transaction collection, one insert per record.
/// Stops at the first failed insert.
pub async fn forward<S>(store: &S, batch: &Batch) -> Result<Ack>
where
    S: RecordStore + ?Sized,
{
    let start_time = Local::now();
    let mut written = 0;
    for record in batch.records() {
        let key = RecordKey::generate(TRANSACTION_COLLECTION, TRANSACTION_GROUP);
        store
            .insert(&key, record)
            .await
            .map_err(|source| Error::StorageWrite {
                written,
                next_cursor: None,
                source,
            })?;
        written += 1;
    }
    info_time!(start_time, "Stored {} records", written);
    Ok(Ack { written })
}

/// Keeps records in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<(RecordKey, Record)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<(RecordKey, Record)> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, key: &RecordKey, record: &Record) -> core::result::Result<(), StoreError> {
        self.entries.lock().await.push((key.clone(), record.clone()));
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonlEntry<'a> {
    key: &'a RecordKey,
    record: &'a Record,
}

/// Appends records as JSON lines to `<dir>/<collection>.jsonl`.
/// Each collection file is opened once and kept for the lifetime of the store.
#[derive(Debug)]
pub struct JsonlStore {
    dir: PathBuf,
    // Also serializes appends so lines never interleave.
    files: Mutex<HashMap<String, File>>,
}

impl JsonlStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.jsonl"))
    }

    async fn open_collection(&self, collection: &str) -> std::io::Result<File> {
        tokio::fs::create_dir_all(&self.dir).await?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.collection_path(collection))
            .await
    }
}

#[async_trait]
impl RecordStore for JsonlStore {
    async fn insert(&self, key: &RecordKey, record: &Record) -> core::result::Result<(), StoreError> {
        // Serialize first so a bad record never produces a partial line.
        let mut line = serde_json::to_vec(&JsonlEntry { key, record })?;
        line.push(b'\n');

        let mut files = self.files.lock().await;
        let file = match files.entry(key.collection.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(self.open_collection(&key.collection).await?),
        };
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
