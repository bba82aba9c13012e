//! Error types for OxShare Core.

use thiserror::Error;

/// Errors from the key codec and the crypto envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The key string is not base64url or does not decode to 256 bits.
    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// Tag verification failed: wrong key, or the blob was corrupted.
    #[error("decryption failed: invalid key or corrupted data")]
    DecryptionFailed,

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
}

/// A creation request that the policy rejects before any encryption work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("payload is empty")]
    EmptyPayload,

    #[error("file is {size} bytes, maximum accepted size is {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("expiry of {requested_secs}s exceeds the maximum of {max_secs}s")]
    ExpiryTooLong { requested_secs: u64, max_secs: u64 },

    #[error("expiry must be greater than zero")]
    ExpiryNotPositive,

    #[error("max views must be at least 1")]
    ZeroMaxViews,
}

/// Errors from parsing or composing a share link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("link has no fragment")]
    MissingFragment,

    #[error("expected fragment of the form /{{id}}/{{key}}, got {0:?}")]
    MalformedFragment(String),

    #[error("invalid share id: {0}")]
    InvalidId(String),

    #[error("origin must not carry a query or fragment: {0}")]
    InvalidOrigin(String),
}
