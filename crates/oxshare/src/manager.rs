//! The ShareManager: create, open, inspect, and sweep shares.
//!
//! The manager owns no mutable state. Every durable fact lives behind the
//! storage port, and the only mutation after creation is a compare-and-swap
//! on the view counter. Destruction removes the row first, then the blob;
//! a blob that cannot be deleted is recorded as an orphan for the sweep.

use std::fmt;

use bytes::Bytes;
use tracing::{debug, warn};

use oxshare_core::{
    gate, seal, validate_payload, BlobRef, KeyString, Payload, PayloadKind, RawKey, SealedBlob,
    SealedPayload, ShareId, ShareLink, SharePolicy, ShareRecord, ShareState,
};
use oxshare_store::{BlobStore, InsertResult, ShareStore, StoreError, UpdateResult};

use crate::clock::{Clock, SystemClock};
use crate::config::ShareConfig;
use crate::error::{Result, ShareError};

/// What the creator gets back. Hand `link` to the recipient.
#[derive(Clone)]
pub struct CreatedShare {
    pub id: ShareId,
    pub key: KeyString,
    /// `{origin}/#/{id}/{key}`.
    pub link: String,
    pub expires_at: i64,
}

impl fmt::Debug for CreatedShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatedShare")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Decrypted content of a share.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretContent {
    Text(String),
    File { file_name: String, data: Bytes },
}

impl SecretContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SecretContent::Text(text) => Some(text),
            SecretContent::File { .. } => None,
        }
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            SecretContent::Text(_) => PayloadKind::Text,
            SecretContent::File { .. } => PayloadKind::File,
        }
    }
}

impl fmt::Debug for SecretContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretContent::Text(text) => write!(f, "Text({} bytes)", text.len()),
            SecretContent::File { file_name, data } => f
                .debug_struct("File")
                .field("file_name", file_name)
                .field("size", &data.len())
                .finish(),
        }
    }
}

/// A successful open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedShare {
    pub id: ShareId,
    pub content: SecretContent,
    /// The view count after this open.
    pub view_count: u32,
    /// This was the final view; the share has been destroyed.
    pub destroyed: bool,
}

/// Metadata of a live share, readable without consuming a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareStatus {
    pub id: ShareId,
    pub kind: PayloadKind,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub expires_at: i64,
    pub requires_password: bool,
    pub views_remaining: Option<u32>,
    /// The next successful open destroys the share.
    pub final_view: bool,
    pub state: ShareState,
}

/// What a sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired or consumed records removed.
    pub deleted: usize,
    /// Blobs newly recorded as orphans during this sweep.
    pub orphaned: usize,
    /// Previously orphaned blobs now deleted.
    pub orphans_purged: usize,
    /// Orphaned blobs that still could not be deleted.
    pub deferred: usize,
}

/// Outcome of destroying one record.
#[derive(Debug, Clone, Copy)]
struct Destruction {
    removed: bool,
    orphaned: bool,
}

/// The share lifecycle manager.
///
/// Shared across tasks by `Arc`; all methods take `&self`.
pub struct ShareManager<S, B, C = SystemClock> {
    shares: S,
    blobs: B,
    clock: C,
    config: ShareConfig,
}

impl<S: ShareStore, B: BlobStore> ShareManager<S, B> {
    /// Create a manager on the system clock.
    pub fn new(shares: S, blobs: B, config: ShareConfig) -> Self {
        Self::with_clock(shares, blobs, SystemClock, config)
    }
}

impl<S: ShareStore, B: BlobStore, C: Clock> ShareManager<S, B, C> {
    pub fn with_clock(shares: S, blobs: B, clock: C, config: ShareConfig) -> Self {
        Self {
            shares,
            blobs,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ShareConfig {
        &self.config
    }

    pub fn shares(&self) -> &S {
        &self.shares
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Create
    // ─────────────────────────────────────────────────────────────────────────

    /// Seal a payload and store it under `policy`.
    ///
    /// Nothing is encrypted or stored if the payload or policy is rejected.
    /// The returned key exists nowhere else.
    pub async fn create(&self, payload: Payload, policy: SharePolicy) -> Result<CreatedShare> {
        let limits = self.config.limits();
        validate_payload(&payload, &limits)?;

        let now = self.clock.now_millis();
        let resolved = policy.resolve(now, &limits)?;

        let key = RawKey::generate();
        let exported = key.export();
        let id = ShareId::generate();
        let link = ShareLink::new(id, exported.clone()).compose(&self.config.origin)?;

        let sealed = seal(payload.as_bytes(), &key)?;
        let sealed_payload = match payload {
            Payload::Text(_) => SealedPayload::Text { sealed },
            Payload::File { name, data } => SealedPayload::File {
                blob: self.blobs.put(sealed.as_bytes(), now).await?,
                file_name: name,
                file_size: data.len() as u64,
            },
        };

        let record = ShareRecord {
            id,
            payload: sealed_payload,
            key_hint: exported.hint(self.config.key_hint_len),
            created_at: now,
            expires_at: resolved.expires_at,
            burn_after_read: resolved.burn_after_read,
            max_views: resolved.max_views,
            view_count: 0,
            consumed: false,
            password_digest: resolved.password_digest,
        };

        let inserted = match self.shares.insert(&record).await {
            Ok(InsertResult::Inserted) => Ok(()),
            Ok(InsertResult::AlreadyExists) => Err(ShareError::StorageFailure(
                StoreError::InvalidData(format!("share id {} already exists", id)),
            )),
            Err(e) => Err(e.into()),
        };

        if let Err(e) = inserted {
            if let Some(blob) = record.payload.blob_ref() {
                self.delete_blob(blob).await;
            }
            return Err(e);
        }

        debug!(
            share = %id,
            kind = %record.kind(),
            expires_at = record.expires_at,
            "share created"
        );

        Ok(CreatedShare {
            id,
            key: exported,
            link,
            expires_at: record.expires_at,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Open
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a share with the key from its link.
    ///
    /// A failed password check, a malformed key, or a failed decryption
    /// leaves the view count untouched.
    pub async fn open(
        &self,
        id: &ShareId,
        key: &str,
        password: Option<&str>,
    ) -> Result<OpenedShare> {
        let mut record = self.admit(id, self.clock.now_millis()).await?;

        if let Some(digest) = &record.password_digest {
            match password {
                Some(candidate) if gate::verify(candidate, digest) => {}
                _ => return Err(ShareError::IncorrectPassword),
            }
        }

        let key = RawKey::import(key)?;
        let content = self.decrypt(&record, &key).await?;

        let mut conflicts = 0u32;
        loop {
            let transition = record.next_view();
            let result = self
                .shares
                .conditional_update(
                    id,
                    transition.expected,
                    transition.view_count,
                    transition.consume,
                )
                .await?;

            match result {
                UpdateResult::Applied => {
                    if transition.consume {
                        self.destroy(&record).await;
                    }

                    debug!(
                        share = %id,
                        view_count = transition.view_count,
                        destroyed = transition.consume,
                        "share viewed"
                    );

                    return Ok(OpenedShare {
                        id: *id,
                        content,
                        view_count: transition.view_count,
                        destroyed: transition.consume,
                    });
                }
                UpdateResult::Missing => return Err(ShareError::Expired),
                UpdateResult::Conflict { .. } => {
                    conflicts += 1;
                    if conflicts > self.config.update_retries {
                        warn!(share = %id, conflicts, "view update retries exhausted");
                        return Err(ShareError::StorageFailure(StoreError::Unavailable(
                            format!("view update for share {} kept conflicting", id),
                        )));
                    }

                    record = match self.admit(id, self.clock.now_millis()).await {
                        Err(ShareError::NotFound) => return Err(ShareError::Expired),
                        other => other?,
                    };
                }
            }
        }
    }

    /// Parse a full link and open the share it points at.
    pub async fn open_link(&self, link: &str, password: Option<&str>) -> Result<OpenedShare> {
        let link = ShareLink::parse(link)?;
        self.open(&link.id, link.key.as_str(), password).await
    }

    /// Describe a live share without consuming a view or touching the key.
    pub async fn inspect(&self, id: &ShareId) -> Result<ShareStatus> {
        let now = self.clock.now_millis();
        let record = self.admit(id, now).await?;

        let (file_name, file_size) = match &record.payload {
            SealedPayload::File {
                file_name,
                file_size,
                ..
            } => (Some(file_name.clone()), Some(*file_size)),
            SealedPayload::Text { .. } => (None, None),
        };

        Ok(ShareStatus {
            id: record.id,
            kind: record.kind(),
            file_name,
            file_size,
            expires_at: record.expires_at,
            requires_password: record.requires_password(),
            views_remaining: record.views_remaining(),
            final_view: record.next_view_is_final(),
            state: record.state(now),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sweep
    // ─────────────────────────────────────────────────────────────────────────

    /// Destroy every expired or consumed share and retry orphaned blobs.
    ///
    /// Idempotent; safe to run concurrently with opens.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let now = self.clock.now_millis();
        let mut report = SweepReport::default();

        for record in self.shares.sweepable(now).await? {
            let destruction = self.destroy(&record).await;
            if destruction.removed {
                report.deleted += 1;
            }
            if destruction.orphaned {
                report.orphaned += 1;
            }
        }

        for orphan in self.shares.orphans().await? {
            match self.blobs.delete(&orphan.blob).await {
                Ok(()) => {
                    self.shares.clear_orphan(&orphan.blob).await?;
                    report.orphans_purged += 1;
                }
                Err(e) => {
                    warn!(blob = %orphan.blob, error = %e, "orphaned blob still not deletable");
                    report.deferred += 1;
                }
            }
        }

        if report != SweepReport::default() {
            debug!(
                deleted = report.deleted,
                orphaned = report.orphaned,
                orphans_purged = report.orphans_purged,
                deferred = report.deferred,
                "sweep finished"
            );
        }

        Ok(report)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch a record that may still be opened at `now`.
    ///
    /// Expired and used-up records are destroyed on the spot.
    async fn admit(&self, id: &ShareId, now: i64) -> Result<ShareRecord> {
        let Some(record) = self.shares.get(id).await? else {
            return Err(ShareError::unavailable(ShareState::Deleted));
        };

        let state = record.state(now);
        if state.is_terminal() {
            self.destroy(&record).await;
            return Err(ShareError::unavailable(state));
        }

        Ok(record)
    }

    async fn decrypt(&self, record: &ShareRecord, key: &RawKey) -> Result<SecretContent> {
        match &record.payload {
            SealedPayload::Text { sealed } => {
                let plaintext = sealed.open(key)?;
                String::from_utf8(plaintext)
                    .map(SecretContent::Text)
                    .map_err(|_| ShareError::DecryptionFailed)
            }
            SealedPayload::File {
                blob, file_name, ..
            } => {
                // The row outlived its blob: a concurrent destroy is under way.
                let sealed = self.blobs.get(blob).await?.ok_or(ShareError::Expired)?;
                let plaintext = SealedBlob::from_bytes(sealed).open(key)?;
                Ok(SecretContent::File {
                    file_name: file_name.clone(),
                    data: Bytes::from(plaintext),
                })
            }
        }
    }

    /// Remove a record's row, then its blob.
    ///
    /// Never fails: a row that cannot be deleted stays sweepable, a blob that
    /// cannot be deleted is logged as an orphan.
    async fn destroy(&self, record: &ShareRecord) -> Destruction {
        let removed = match self.shares.delete(&record.id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(share = %record.id, error = %e, "failed to delete share row");
                return Destruction {
                    removed: false,
                    orphaned: false,
                };
            }
        };

        let orphaned = match record.payload.blob_ref() {
            Some(blob) => !self.delete_blob(blob).await,
            None => false,
        };

        if removed {
            debug!(share = %record.id, "share destroyed");
        }

        Destruction { removed, orphaned }
    }

    /// Delete a blob with retries. Returns false if it had to be orphaned.
    async fn delete_blob(&self, blob: &BlobRef) -> bool {
        let attempts = self.config.blob_delete_attempts.max(1);
        let mut last_error = None;

        for _ in 0..attempts {
            match self.blobs.delete(blob).await {
                Ok(()) => return true,
                Err(e) => last_error = Some(e),
            }
        }

        if let Err(e) = self
            .shares
            .record_orphan(blob, self.clock.now_millis())
            .await
        {
            warn!(blob = %blob, error = %e, "failed to record orphaned blob");
        }

        warn!(
            blob = %blob,
            attempts,
            error = ?last_error,
            "blob deletion failed, recorded as orphan"
        );
        false
    }
}
