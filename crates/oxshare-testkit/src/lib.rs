//! # OxShare Testkit
//!
//! Testing utilities for OxShare.
//!
//! ## Overview
//!
//! - **Fixtures**: a [`ShareManager`](oxshare::ShareManager) over in-memory
//!   stores and a manual clock
//! - **Generators**: proptest strategies for payloads and policies
//! - **Faults**: store wrappers that fail on demand
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use oxshare::{Payload, SharePolicy};
//! use oxshare_testkit::TestFixture;
//!
//! async fn example() {
//!     let fx = TestFixture::new();
//!     let created = fx
//!         .manager
//!         .create(Payload::text("hi"), SharePolicy::new().burn_after_read())
//!         .await
//!         .unwrap();
//!     let opened = fx.manager.open_link(&created.link, None).await.unwrap();
//!     assert!(opened.destroyed);
//! }
//! ```
//!
//! ## Fault Injection
//!
//! ```rust
//! use oxshare_store::MemoryBlobStore;
//! use oxshare_testkit::FlakyBlobStore;
//!
//! let blobs = FlakyBlobStore::new(MemoryBlobStore::new());
//! blobs.fail_deletes(3);
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;

pub use faults::{FlakyBlobStore, FlakyStore, ALWAYS};
pub use fixtures::{FixtureManager, TestFixture};
pub use generators::{policy, text_payload, PolicyParams};
