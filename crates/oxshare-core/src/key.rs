//! Key codec: the share key and its URL-transportable form.
//!
//! A share key is 256 random bits. It is exported as base64url without
//! padding (43 characters) so it fits in a URL fragment unescaped.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::CryptoError;

/// Length of a raw share key in bytes.
pub const KEY_LEN: usize = 32;

/// A 256-bit symmetric share key.
///
/// Never persisted. Zeroized on drop; `Debug` does not print it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RawKey([u8; KEY_LEN]);

impl RawKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; KEY_LEN];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Export as URL-safe, padding-free text.
    pub fn export(&self) -> KeyString {
        KeyString(URL_SAFE_NO_PAD.encode(self.0))
    }

    /// Import from the exported text form.
    ///
    /// Trailing `=` padding is tolerated. Anything that does not decode to
    /// exactly 256 bits is `MalformedKey`.
    pub fn import(key: &str) -> Result<Self, CryptoError> {
        let decoded = Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(key.trim_end_matches('='))
                .map_err(|e| CryptoError::MalformedKey(e.to_string()))?,
        );

        if decoded.len() != KEY_LEN {
            return Err(CryptoError::MalformedKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                decoded.len()
            )));
        }

        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }
}

impl fmt::Debug for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawKey(..)")
    }
}

/// The exported text form of a [`RawKey`].
///
/// Travels only inside the link fragment. No `Display` impl; use
/// [`KeyString::as_str`] where the full key is needed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyString(String);

impl KeyString {
    /// Wrap key text received from a link. Not validated until imported.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first `len` characters, stored as an operator-facing hint.
    pub fn hint(&self, len: usize) -> String {
        self.0.chars().take(len).collect()
    }
}

impl fmt::Debug for KeyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyString({}..)", self.hint(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_import_roundtrip() {
        let key = RawKey::generate();
        let exported = key.export();
        assert_eq!(exported.as_str().len(), 43);

        let imported = RawKey::import(exported.as_str()).unwrap();
        assert_eq!(imported.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_export_is_url_safe() {
        for _ in 0..64 {
            let exported = RawKey::generate().export();
            assert!(exported
                .as_str()
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
        }
    }

    #[test]
    fn test_import_tolerates_padding() {
        let key = RawKey::from_bytes([0x5a; KEY_LEN]);
        let padded = format!("{}=", key.export().as_str());
        let imported = RawKey::import(&padded).unwrap();
        assert_eq!(imported.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_import_wrong_length_fails() {
        let short = URL_SAFE_NO_PAD.encode([0u8; 16]);
        assert!(matches!(
            RawKey::import(&short),
            Err(CryptoError::MalformedKey(_))
        ));

        let long = URL_SAFE_NO_PAD.encode([0u8; 33]);
        assert!(matches!(
            RawKey::import(&long),
            Err(CryptoError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_import_invalid_alphabet_fails() {
        assert!(matches!(
            RawKey::import("not base64 at all!"),
            Err(CryptoError::MalformedKey(_))
        ));
        assert!(matches!(RawKey::import(""), Err(CryptoError::MalformedKey(_))));
    }

    #[test]
    fn test_hint_is_prefix() {
        let exported = RawKey::generate().export();
        let hint = exported.hint(8);
        assert_eq!(hint.len(), 8);
        assert!(exported.as_str().starts_with(&hint));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = RawKey::generate();
        let exported = key.export();
        assert_eq!(format!("{:?}", key), "RawKey(..)");
        assert!(!format!("{:?}", exported).contains(exported.as_str()));
    }
}
