//! Error types for the share manager.

use oxshare_core::{CryptoError, LinkError, PolicyError, ShareState};
use oxshare_store::StoreError;
use thiserror::Error;

/// Errors that can occur during share operations.
///
/// `NotFound` and `Expired` render the same message, so a recipient cannot
/// tell a share that never existed from one that was destroyed.
#[derive(Debug, Error)]
pub enum ShareError {
    /// No share exists for the id.
    #[error("this link is no longer available")]
    NotFound,

    /// The share expired, hit its view limit, or was burned.
    #[error("this link is no longer available")]
    Expired,

    /// A password is required and the candidate was missing or wrong.
    #[error("incorrect password")]
    IncorrectPassword,

    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("malformed link: {0}")]
    MalformedLink(#[from] LinkError),

    /// The key does not open the ciphertext, or the ciphertext is corrupted.
    #[error("decryption failed: invalid key or corrupted data")]
    DecryptionFailed,

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("storage failure: {0}")]
    StorageFailure(#[from] StoreError),

    #[error("policy rejected: {0}")]
    PolicyRejected(#[from] PolicyError),
}

impl From<CryptoError> for ShareError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::MalformedKey(msg) => ShareError::MalformedKey(msg),
            CryptoError::DecryptionFailed => ShareError::DecryptionFailed,
            CryptoError::EncryptionFailed(msg) => ShareError::EncryptionFailed(msg),
        }
    }
}

impl ShareError {
    /// True if the same request may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ShareError::IncorrectPassword | ShareError::StorageFailure(_))
    }

    /// The error a recipient sees for a share in a terminal state.
    ///
    /// `Deleted` means no row exists; every other terminal state is `Expired`.
    pub fn unavailable(state: ShareState) -> Self {
        match state {
            ShareState::Deleted => ShareError::NotFound,
            _ => ShareError::Expired,
        }
    }

    /// True if the share is gone for good, whatever the reason.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ShareError::NotFound | ShareError::Expired)
    }
}

/// Result type for share operations.
pub type Result<T> = std::result::Result<T, ShareError>;
