//! Access gate: the optional password check in front of a share.
//!
//! The digest is a fast, unsalted, domain-separated BLAKE3 hash. It keeps the
//! password out of the store in plain form, nothing more: it is NOT
//! credential-grade password storage and does not resist offline guessing.

use std::fmt;

/// Context string for BLAKE3 `derive_key` mode.
const PASSWORD_CONTEXT: &str = "oxshare 2024 share password v1";

/// One-way digest of a share password.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PasswordDigest([u8; 32]);

impl PasswordDigest {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PasswordDigest({}..)", &self.to_hex()[..8])
    }
}

/// Digest a candidate password.
pub fn challenge(candidate: &str) -> PasswordDigest {
    PasswordDigest(blake3::derive_key(PASSWORD_CONTEXT, candidate.as_bytes()))
}

/// Check a candidate against a stored digest in constant time.
pub fn verify(candidate: &str, expected: &PasswordDigest) -> bool {
    // blake3::Hash equality is constant time.
    blake3::Hash::from(challenge(candidate).0) == blake3::Hash::from(expected.0)
}
