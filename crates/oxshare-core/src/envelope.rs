//! Sealed envelope: ChaCha20-Poly1305 over a share payload.
//!
//! A sealed blob is self-contained: `nonce (12) || ciphertext || tag (16)`.
//! The key is never part of it. Every seal draws a fresh random nonce.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;
use std::fmt;

use crate::error::CryptoError;
use crate::key::RawKey;

/// Nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Poly1305 tag length in bytes.
pub const TAG_LEN: usize = 16;

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionNonce(pub [u8; NONCE_LEN]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

/// Envelope output: `nonce || ciphertext_with_tag`.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedBlob(Vec<u8>);

impl SealedBlob {
    /// Encrypt `plaintext` under `key` with a fresh nonce.
    pub fn seal(plaintext: &[u8], key: &RawKey) -> Result<Self, CryptoError> {
        let nonce = EncryptionNonce::generate();
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(nonce.as_bytes()), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(nonce.as_bytes());
        blob.extend_from_slice(&ciphertext);
        Ok(Self(blob))
    }

    /// Decrypt with `key`.
    ///
    /// Fails without returning any data if the tag does not verify.
    pub fn open(&self, key: &RawKey) -> Result<Vec<u8>, CryptoError> {
        if self.0.len() < Self::overhead() {
            return Err(CryptoError::DecryptionFailed);
        }

        let (nonce, ciphertext) = self.0.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)
    }

    /// Wrap bytes read back from storage. Not validated until opened.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bytes added on top of the plaintext length.
    pub const fn overhead() -> usize {
        NONCE_LEN + TAG_LEN
    }
}

impl fmt::Debug for SealedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealedBlob({} bytes)", self.0.len())
    }
}

/// Seal `plaintext` under `key`. See [`SealedBlob::seal`].
pub fn seal(plaintext: &[u8], key: &RawKey) -> Result<SealedBlob, CryptoError> {
    SealedBlob::seal(plaintext, key)
}

/// Open a sealed blob with `key`. See [`SealedBlob::open`].
pub fn open(blob: &SealedBlob, key: &RawKey) -> Result<Vec<u8>, CryptoError> {
    blob.open(key)
}
