//! # OxShare Store
//!
//! Storage port for OxShare. Share records go through the [`ShareStore`]
//! trait, sealed file blobs through the [`BlobStore`] trait.
//!
//! ## Key Types
//!
//! - [`ShareStore`] - async row store: insert, fetch, compare-and-swap views, delete
//! - [`BlobStore`] - async blob store: put, get, delete
//! - [`SqliteStore`] / [`MemoryStore`] - row store backends
//! - [`LocalBlobStore`] / [`MemoryBlobStore`] - blob store backends
//! - [`UpdateResult`] - outcome of a conditional view update
//!
//! ## Usage
//!
//! ```rust,no_run
//! use oxshare_store::{LocalBlobStore, ShareStore, SqliteStore};
//!
//! async fn example() {
//!     let shares = SqliteStore::open("oxshare.db").unwrap();
//!     let blobs = LocalBlobStore::new("/var/lib/oxshare").await.unwrap();
//!
//!     // Or in memory for tests
//!     let shares = SqliteStore::open_memory().unwrap();
//!     assert_eq!(shares.count().await.unwrap(), 0);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent deletes**: deleting an absent record or blob is not an error
//! - **Compare-and-swap views**: a view is only recorded against the count it was read at
//! - **Orphan log**: blobs whose row is gone but whose delete failed are recorded for the sweep

pub mod blob;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use blob::{LocalBlobStore, MemoryBlobStore};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{BlobStore, InsertResult, Orphan, ShareStore, UpdateResult};
