//! # OxShare Core
//!
//! Pure primitives for OxShare: one-recipient secret sharing through an
//! untrusted store.
//!
//! This crate contains no I/O, no storage, no networking. It covers the
//! envelope protocol and the data model that the lifecycle manager drives.
//!
//! ## Key Types
//!
//! - [`RawKey`] / [`KeyString`] - 256-bit share key and its URL-safe text form
//! - [`SealedBlob`] - `nonce || ciphertext || tag`, produced by [`seal`]
//! - [`PasswordDigest`] - one-way digest checked by the access gate
//! - [`ShareRecord`] - the persisted, non-secret description of one share
//! - [`ShareLink`] - `{origin}/#/{id}/{key}`; the key lives only in the fragment
//!
//! ## Usage
//!
//! ```rust
//! use oxshare_core::{open, seal, RawKey};
//!
//! let key = RawKey::generate();
//! let sealed = seal(b"hello", &key).unwrap();
//!
//! let exported = key.export();
//! let imported = RawKey::import(exported.as_str()).unwrap();
//! assert_eq!(open(&sealed, &imported).unwrap(), b"hello");
//! ```

pub mod envelope;
pub mod error;
pub mod gate;
pub mod key;
pub mod link;
pub mod policy;
pub mod record;
pub mod types;

pub use envelope::{open, seal, EncryptionNonce, SealedBlob, NONCE_LEN, TAG_LEN};
pub use error::{CryptoError, LinkError, PolicyError};
pub use gate::{challenge, verify, PasswordDigest};
pub use key::{KeyString, RawKey, KEY_LEN};
pub use link::ShareLink;
pub use policy::{validate_payload, Payload, PolicyLimits, ResolvedPolicy, SharePolicy};
pub use record::{SealedPayload, ShareRecord, ShareState, ViewTransition};
pub use types::{unix_millis, BlobRef, PayloadKind, ShareId};
