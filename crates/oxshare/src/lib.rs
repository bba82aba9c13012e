//! # OxShare
//!
//! One-recipient secret sharing through an untrusted store. A secret is
//! sealed under a fresh key, the ciphertext is stored, and the key travels
//! only in the fragment of the link handed to the recipient.
//!
//! ## Overview
//!
//! - **Envelope**: ChaCha20-Poly1305 with a random nonce per share
//! - **Policy**: expiry, view limit, burn-after-read, optional password
//! - **Lifecycle**: a view is recorded with compare-and-swap; the view that
//!   uses a share up destroys it
//! - **Sweep**: expired shares and orphaned blobs are removed on demand
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use oxshare::{Payload, ShareConfig, ShareManager, SharePolicy};
//! use oxshare::store::{LocalBlobStore, SqliteStore};
//!
//! async fn example() {
//!     let shares = SqliteStore::open("oxshare.db").unwrap();
//!     let blobs = LocalBlobStore::new("/var/lib/oxshare").await.unwrap();
//!     let manager = ShareManager::new(shares, blobs, ShareConfig::default());
//!
//!     let created = manager
//!         .create(
//!             Payload::text("the launch code is 0000"),
//!             SharePolicy::new()
//!                 .expires_in(Duration::from_secs(600))
//!                 .burn_after_read(),
//!         )
//!         .await
//!         .unwrap();
//!
//!     // The recipient opens the link exactly once.
//!     let opened = manager.open_link(&created.link, None).await.unwrap();
//!     assert!(opened.destroyed);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `oxshare::core` - envelope, key codec, record and policy model
//! - `oxshare::store` - storage port and backends

pub mod clock;
pub mod config;
pub mod error;
pub mod manager;

pub use oxshare_core as core;
pub use oxshare_store as store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ShareConfig;
pub use error::{Result, ShareError};
pub use manager::{
    CreatedShare, OpenedShare, SecretContent, ShareManager, ShareStatus, SweepReport,
};

pub use oxshare_core::{
    KeyString, Payload, PayloadKind, ShareId, ShareLink, SharePolicy, ShareState,
};
