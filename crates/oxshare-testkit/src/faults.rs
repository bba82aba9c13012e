//! Fault-injecting store wrappers.
//!
//! Each wrapper delegates to a real store but fails the next N calls of a
//! given operation with [`StoreError::Unavailable`]. Arming with
//! [`ALWAYS`] fails every call until disarmed.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;

use oxshare_core::{BlobRef, ShareId, ShareRecord};
use oxshare_store::{
    BlobStore, InsertResult, Orphan, Result, ShareStore, StoreError, UpdateResult,
};

/// Arm value that never runs out.
pub const ALWAYS: u32 = u32::MAX;

#[derive(Debug, Default)]
struct FailCounter(AtomicU32);

impl FailCounter {
    fn arm(&self, n: u32) {
        self.0.store(n, Ordering::SeqCst);
    }

    /// Consume one armed failure. True if this call must fail.
    fn take(&self) -> bool {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                ALWAYS => Some(ALWAYS),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

fn injected(op: &str) -> StoreError {
    StoreError::Unavailable(format!("injected fault: {}", op))
}

/// A share store that fails on demand.
#[derive(Debug)]
pub struct FlakyStore<S> {
    inner: S,
    inserts: FailCounter,
    gets: FailCounter,
    deletes: FailCounter,
    updates: FailCounter,
    conflicts: FailCounter,
    orphan_writes: FailCounter,
    operations: AtomicUsize,
}

impl<S: ShareStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            inserts: FailCounter::default(),
            gets: FailCounter::default(),
            deletes: FailCounter::default(),
            updates: FailCounter::default(),
            conflicts: FailCounter::default(),
            orphan_writes: FailCounter::default(),
            operations: AtomicUsize::new(0),
        }
    }

    /// Underlying store, for checking state after faults.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn fail_inserts(&self, n: u32) {
        self.inserts.arm(n);
    }

    pub fn fail_gets(&self, n: u32) {
        self.gets.arm(n);
    }

    pub fn fail_deletes(&self, n: u32) {
        self.deletes.arm(n);
    }

    pub fn fail_updates(&self, n: u32) {
        self.updates.arm(n);
    }

    pub fn fail_orphan_writes(&self, n: u32) {
        self.orphan_writes.arm(n);
    }

    /// Make the next `n` view updates report a conflict without writing.
    pub fn force_conflicts(&self, n: u32) {
        self.conflicts.arm(n);
    }

    /// Total store calls attempted.
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: ShareStore> ShareStore for FlakyStore<S> {
    async fn insert(&self, record: &ShareRecord) -> Result<InsertResult> {
        self.tick();
        if self.inserts.take() {
            return Err(injected("insert"));
        }
        self.inner.insert(record).await
    }

    async fn get(&self, id: &ShareId) -> Result<Option<ShareRecord>> {
        self.tick();
        if self.gets.take() {
            return Err(injected("get"));
        }
        self.inner.get(id).await
    }

    async fn conditional_update(
        &self,
        id: &ShareId,
        expected: u32,
        new_view_count: u32,
        consume: bool,
    ) -> Result<UpdateResult> {
        self.tick();
        if self.updates.take() {
            return Err(injected("conditional_update"));
        }
        if self.conflicts.take() {
            return Ok(match self.inner.get(id).await? {
                Some(record) => UpdateResult::Conflict {
                    current_view_count: record.view_count,
                    consumed: record.consumed,
                },
                None => UpdateResult::Missing,
            });
        }
        self.inner
            .conditional_update(id, expected, new_view_count, consume)
            .await
    }

    async fn delete(&self, id: &ShareId) -> Result<bool> {
        self.tick();
        if self.deletes.take() {
            return Err(injected("delete"));
        }
        self.inner.delete(id).await
    }

    async fn sweepable(&self, now: i64) -> Result<Vec<ShareRecord>> {
        self.tick();
        self.inner.sweepable(now).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }

    async fn record_orphan(&self, blob: &BlobRef, at: i64) -> Result<()> {
        self.tick();
        if self.orphan_writes.take() {
            return Err(injected("record_orphan"));
        }
        self.inner.record_orphan(blob, at).await
    }

    async fn orphans(&self) -> Result<Vec<Orphan>> {
        self.tick();
        self.inner.orphans().await
    }

    async fn clear_orphan(&self, blob: &BlobRef) -> Result<()> {
        self.tick();
        self.inner.clear_orphan(blob).await
    }
}

/// A blob store that fails on demand.
#[derive(Debug)]
pub struct FlakyBlobStore<B> {
    inner: B,
    puts: FailCounter,
    gets: FailCounter,
    deletes: FailCounter,
    delete_attempts: AtomicUsize,
}

impl<B: BlobStore> FlakyBlobStore<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            puts: FailCounter::default(),
            gets: FailCounter::default(),
            deletes: FailCounter::default(),
            delete_attempts: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn fail_puts(&self, n: u32) {
        self.puts.arm(n);
    }

    pub fn fail_gets(&self, n: u32) {
        self.gets.arm(n);
    }

    pub fn fail_deletes(&self, n: u32) {
        self.deletes.arm(n);
    }

    /// Delete calls seen, failed or not.
    pub fn delete_attempts(&self) -> usize {
        self.delete_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<B: BlobStore> BlobStore for FlakyBlobStore<B> {
    async fn put(&self, data: &[u8], now: i64) -> Result<BlobRef> {
        if self.puts.take() {
            return Err(injected("put"));
        }
        self.inner.put(data, now).await
    }

    async fn get(&self, blob: &BlobRef) -> Result<Option<Vec<u8>>> {
        if self.gets.take() {
            return Err(injected("get"));
        }
        self.inner.get(blob).await
    }

    async fn delete(&self, blob: &BlobRef) -> Result<()> {
        self.delete_attempts.fetch_add(1, Ordering::SeqCst);
        if self.deletes.take() {
            return Err(injected("delete"));
        }
        self.inner.delete(blob).await
    }
}
