//! # Storage port.
//!
//! [`TaskStore`] is the contract the external persistence engine fulfils.
//! Writes overwrite on duplicate key; there is no multi-record transaction.
//!
//! [`MemoryStore`] is a process-local implementation used by tests and demos.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::TaskError;

/// Record that can be stored under a string key.
pub trait StoreRecord: Clone + Send + Sync + 'static {
    fn record_key(&self) -> &str;
}

/// Key-indexed persistence for records of type `R`.
#[async_trait]
pub trait TaskStore<R>: Send + Sync + 'static {
    /// Insert or overwrite.
    async fn save(&self, record: &R) -> Result<(), TaskError>;

    /// Overwrite an existing record.
    async fn update(&self, record: &R) -> Result<(), TaskError>;

    /// Delete by key; returns how many records were removed.
    async fn delete(&self, ids: &[String]) -> Result<usize, TaskError>;

    async fn get_all(&self) -> Result<Vec<R>, TaskError>;

    /// `Ok(None)` when nothing is stored under `id`.
    async fn get(&self, id: &str) -> Result<Option<R>, TaskError>;
}

/// In-memory [`TaskStore`] ordered by key.
pub struct MemoryStore<R> {
    records: RwLock<BTreeMap<String, R>>,
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<R> MemoryStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl<R: StoreRecord> TaskStore<R> for MemoryStore<R> {
    async fn save(&self, record: &R) -> Result<(), TaskError> {
        self.records
            .write()
            .await
            .insert(record.record_key().to_owned(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &R) -> Result<(), TaskError> {
        let mut records = self.records.write().await;
        match records.get_mut(record.record_key()) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(TaskError::NotFound {
                reason: format!("no record stored under {}", record.record_key()),
            }),
        }
    }

    async fn delete(&self, ids: &[String]) -> Result<usize, TaskError> {
        let mut records = self.records.write().await;
        Ok(ids.iter().filter(|id| records.remove(*id).is_some()).count())
    }

    async fn get_all(&self) -> Result<Vec<R>, TaskError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<R>, TaskError> {
        Ok(self.records.read().await.get(id).cloned())
    }
}
