//! In-memory implementation of the ShareStore trait.
//!
//! Same semantics as SQLite, nothing persisted. The compare-and-swap in
//! `conditional_update` runs under the write lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use oxshare_core::{BlobRef, ShareId, ShareRecord};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Orphan, ShareStore, UpdateResult};

/// In-memory share store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    records: HashMap<ShareId, ShareRecord>,
    /// Orphaned blobs, keyed by reference.
    orphans: BTreeMap<BlobRef, i64>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShareStore for MemoryStore {
    async fn insert(&self, record: &ShareRecord) -> Result<InsertResult> {
        let mut inner = self.inner.write().map_err(StoreError::poisoned)?;

        if inner.records.contains_key(&record.id) {
            return Ok(InsertResult::AlreadyExists);
        }

        inner.records.insert(record.id, record.clone());
        Ok(InsertResult::Inserted)
    }

    async fn get(&self, id: &ShareId) -> Result<Option<ShareRecord>> {
        let inner = self.inner.read().map_err(StoreError::poisoned)?;
        Ok(inner.records.get(id).cloned())
    }

    async fn conditional_update(
        &self,
        id: &ShareId,
        expected: u32,
        new_view_count: u32,
        consume: bool,
    ) -> Result<UpdateResult> {
        let mut inner = self.inner.write().map_err(StoreError::poisoned)?;

        let Some(record) = inner.records.get_mut(id) else {
            return Ok(UpdateResult::Missing);
        };

        if record.view_count != expected || record.consumed {
            return Ok(UpdateResult::Conflict {
                current_view_count: record.view_count,
                consumed: record.consumed,
            });
        }

        record.view_count = new_view_count;
        record.consumed = consume;
        Ok(UpdateResult::Applied)
    }

    async fn delete(&self, id: &ShareId) -> Result<bool> {
        let mut inner = self.inner.write().map_err(StoreError::poisoned)?;
        Ok(inner.records.remove(id).is_some())
    }

    async fn sweepable(&self, now: i64) -> Result<Vec<ShareRecord>> {
        let inner = self.inner.read().map_err(StoreError::poisoned)?;

        let mut due: Vec<ShareRecord> = inner
            .records
            .values()
            .filter(|r| r.consumed || r.is_expired(now))
            .cloned()
            .collect();
        due.sort_by_key(|r| r.expires_at);
        Ok(due)
    }

    async fn count(&self) -> Result<u64> {
        let inner = self.inner.read().map_err(StoreError::poisoned)?;
        Ok(inner.records.len() as u64)
    }

    async fn record_orphan(&self, blob: &BlobRef, at: i64) -> Result<()> {
        let mut inner = self.inner.write().map_err(StoreError::poisoned)?;
        inner.orphans.entry(blob.clone()).or_insert(at);
        Ok(())
    }

    async fn orphans(&self) -> Result<Vec<Orphan>> {
        let inner = self.inner.read().map_err(StoreError::poisoned)?;

        let mut orphans: Vec<Orphan> = inner
            .orphans
            .iter()
            .map(|(blob, &recorded_at)| Orphan {
                blob: blob.clone(),
                recorded_at,
            })
            .collect();
        orphans.sort_by_key(|o| o.recorded_at);
        Ok(orphans)
    }

    async fn clear_orphan(&self, blob: &BlobRef) -> Result<()> {
        let mut inner = self.inner.write().map_err(StoreError::poisoned)?;
        inner.orphans.remove(blob);
        Ok(())
    }
}
