//! The share record and its lifecycle state.
//!
//! A record is the only persisted entity. It never contains the key. Its
//! payload is a sum type: inline sealed text, or a reference to a sealed
//! blob in the blob store.

use crate::envelope::SealedBlob;
use crate::gate::PasswordDigest;
use crate::types::{BlobRef, PayloadKind, ShareId};

/// Where a record's ciphertext lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SealedPayload {
    Text {
        sealed: SealedBlob,
    },
    File {
        blob: BlobRef,
        file_name: String,
        /// Plaintext size in bytes.
        file_size: u64,
    },
}

impl SealedPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            SealedPayload::Text { .. } => PayloadKind::Text,
            SealedPayload::File { .. } => PayloadKind::File,
        }
    }

    pub fn blob_ref(&self) -> Option<&BlobRef> {
        match self {
            SealedPayload::File { blob, .. } => Some(blob),
            SealedPayload::Text { .. } => None,
        }
    }
}

/// Lifecycle state of a share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShareState {
    /// Created, never opened, no password.
    Active,
    /// Created, never opened, a password is required.
    PasswordPending,
    /// Opened at least once and still has views left.
    Open,
    /// View limit reached or burned; awaiting destruction.
    Exhausted,
    /// Past `expires_at`; awaiting destruction.
    Expired,
    /// No record exists for the id.
    Deleted,
}

impl ShareState {
    /// True for states from which no further open can succeed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ShareState::Exhausted | ShareState::Expired | ShareState::Deleted
        )
    }
}

/// A stored share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRecord {
    pub id: ShareId,
    pub payload: SealedPayload,
    /// First characters of the exported key. Not enough to decrypt.
    pub key_hint: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub burn_after_read: bool,
    pub max_views: Option<u32>,
    pub view_count: u32,
    pub consumed: bool,
    pub password_digest: Option<PasswordDigest>,
}

/// The counter update a successful open applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTransition {
    pub expected: u32,
    pub view_count: u32,
    /// The record is used up after this view and must be destroyed.
    pub consume: bool,
}

impl ShareRecord {
    pub fn kind(&self) -> PayloadKind {
        self.payload.kind()
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// True once no further view can be granted.
    pub fn is_exhausted(&self) -> bool {
        self.consumed || self.max_views.is_some_and(|max| self.view_count >= max)
    }

    pub fn requires_password(&self) -> bool {
        self.password_digest.is_some()
    }

    /// Views left before destruction, if the record has a view limit.
    pub fn views_remaining(&self) -> Option<u32> {
        if self.consumed {
            return Some(0);
        }
        self.max_views.map(|max| max.saturating_sub(self.view_count))
    }

    /// True if the next successful open will destroy the record.
    pub fn next_view_is_final(&self) -> bool {
        self.next_view().consume
    }

    /// Derive the state of this record at `now`.
    ///
    /// Expiry wins over exhaustion: both lead to destruction, but expiry is
    /// what a sweep would report.
    pub fn state(&self, now: i64) -> ShareState {
        if self.is_expired(now) {
            ShareState::Expired
        } else if self.is_exhausted() {
            ShareState::Exhausted
        } else if self.view_count > 0 {
            ShareState::Open
        } else if self.requires_password() {
            ShareState::PasswordPending
        } else {
            ShareState::Active
        }
    }

    /// The transition one more successful view would apply.
    pub fn next_view(&self) -> ViewTransition {
        let view_count = self.view_count.saturating_add(1);
        let consume =
            self.burn_after_read || self.max_views.is_some_and(|max| view_count >= max);
        ViewTransition {
            expected: self.view_count,
            view_count,
            consume,
        }
    }
}
