//! Storage port: the abstract interface for share and blob persistence.
//!
//! The lifecycle manager only ever talks to these traits. Implementations
//! include SQLite and in-memory row stores, and filesystem and in-memory blob
//! stores.

use std::sync::Arc;

use async_trait::async_trait;
use oxshare_core::{BlobRef, ShareId, ShareRecord};

use crate::error::Result;

/// Result of inserting a share record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    Inserted,
    /// A record with this id already exists; nothing was written.
    AlreadyExists,
}

/// Result of a conditional view update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// The update was applied.
    Applied,
    /// The stored record no longer matches the expected view count, or was
    /// already consumed. Nothing was written.
    Conflict {
        current_view_count: u32,
        consumed: bool,
    },
    /// No record with this id exists.
    Missing,
}

/// A blob whose row is gone but whose own deletion failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orphan {
    pub blob: BlobRef,
    /// When the failure was recorded (Unix ms).
    pub recorded_at: i64,
}

/// Row store for share records.
///
/// # Design Notes
///
/// - **No plaintext, no keys**: records only carry sealed bytes and a key hint.
/// - **Compare-and-swap**: [`ShareStore::conditional_update`] is the only way a
///   record mutates after insert, and it is atomic per record.
/// - **Idempotent deletes**: [`ShareStore::delete`] returns `false` for an
///   absent record instead of failing.
#[async_trait]
pub trait ShareStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Record Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new record.
    async fn insert(&self, record: &ShareRecord) -> Result<InsertResult>;

    /// Fetch a record by id.
    async fn get(&self, id: &ShareId) -> Result<Option<ShareRecord>>;

    /// Record a view.
    ///
    /// Sets `view_count = new_view_count` and, if `consume`, marks the record
    /// consumed, but only when the stored `view_count` equals `expected` and
    /// the record is not already consumed.
    async fn conditional_update(
        &self,
        id: &ShareId,
        expected: u32,
        new_view_count: u32,
        consume: bool,
    ) -> Result<UpdateResult>;

    /// Delete a record. Returns whether a record was removed.
    async fn delete(&self, id: &ShareId) -> Result<bool>;

    /// Records that a sweep must destroy: expired at `now`, or consumed.
    ///
    /// A backend that finds a due row it cannot decode deletes that row
    /// itself, moving its blob to the orphan log, and leaves it out of the
    /// result.
    async fn sweepable(&self, now: i64) -> Result<Vec<ShareRecord>>;

    /// Number of stored records.
    async fn count(&self) -> Result<u64>;

    // ─────────────────────────────────────────────────────────────────────────
    // Orphan Log
    // ─────────────────────────────────────────────────────────────────────────

    /// Remember a blob that could not be deleted. Recording twice is a no-op.
    async fn record_orphan(&self, blob: &BlobRef, at: i64) -> Result<()>;

    /// All recorded orphans, oldest first.
    async fn orphans(&self) -> Result<Vec<Orphan>>;

    /// Forget an orphan once its blob is gone.
    async fn clear_orphan(&self, blob: &BlobRef) -> Result<()>;
}

/// Blob store for sealed file payloads.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store sealed bytes under a fresh reference stamped with `now`.
    async fn put(&self, data: &[u8], now: i64) -> Result<BlobRef>;

    /// Fetch sealed bytes. `None` if the blob does not exist.
    async fn get(&self, blob: &BlobRef) -> Result<Option<Vec<u8>>>;

    /// Delete a blob. Deleting an absent blob is not an error.
    async fn delete(&self, blob: &BlobRef) -> Result<()>;
}

#[async_trait]
impl<S: ShareStore + ?Sized> ShareStore for Arc<S> {
    async fn insert(&self, record: &ShareRecord) -> Result<InsertResult> {
        (**self).insert(record).await
    }

    async fn get(&self, id: &ShareId) -> Result<Option<ShareRecord>> {
        (**self).get(id).await
    }

    async fn conditional_update(
        &self,
        id: &ShareId,
        expected: u32,
        new_view_count: u32,
        consume: bool,
    ) -> Result<UpdateResult> {
        (**self)
            .conditional_update(id, expected, new_view_count, consume)
            .await
    }

    async fn delete(&self, id: &ShareId) -> Result<bool> {
        (**self).delete(id).await
    }

    async fn sweepable(&self, now: i64) -> Result<Vec<ShareRecord>> {
        (**self).sweepable(now).await
    }

    async fn count(&self) -> Result<u64> {
        (**self).count().await
    }

    async fn record_orphan(&self, blob: &BlobRef, at: i64) -> Result<()> {
        (**self).record_orphan(blob, at).await
    }

    async fn orphans(&self) -> Result<Vec<Orphan>> {
        (**self).orphans().await
    }

    async fn clear_orphan(&self, blob: &BlobRef) -> Result<()> {
        (**self).clear_orphan(blob).await
    }
}

#[async_trait]
impl<B: BlobStore + ?Sized> BlobStore for Arc<B> {
    async fn put(&self, data: &[u8], now: i64) -> Result<BlobRef> {
        (**self).put(data, now).await
    }

    async fn get(&self, blob: &BlobRef) -> Result<Option<Vec<u8>>> {
        (**self).get(blob).await
    }

    async fn delete(&self, blob: &BlobRef) -> Result<()> {
        (**self).delete(blob).await
    }
}
