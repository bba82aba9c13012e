//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;
use std::time::Duration;

use oxshare::{CreatedShare, ManualClock, Payload, ShareConfig, ShareManager, SharePolicy};
use oxshare_store::{MemoryBlobStore, MemoryStore};

use crate::faults::{FlakyBlobStore, FlakyStore};

/// Manager type used by [`TestFixture`].
pub type FixtureManager = ShareManager<
    Arc<FlakyStore<MemoryStore>>,
    Arc<FlakyBlobStore<MemoryBlobStore>>,
    ManualClock,
>;

/// Fixed start time for fixtures: 2023-11-14T22:13:20Z.
pub const FIXTURE_START: i64 = 1_700_000_000_000;

/// A manager over in-memory stores that can fail on demand, on a manual clock.
pub struct TestFixture {
    pub manager: FixtureManager,
    pub shares: Arc<FlakyStore<MemoryStore>>,
    pub blobs: Arc<FlakyBlobStore<MemoryBlobStore>>,
    pub clock: ManualClock,
}

impl TestFixture {
    /// Create a fixture with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ShareConfig::default())
    }

    pub fn with_config(config: ShareConfig) -> Self {
        let shares = Arc::new(FlakyStore::new(MemoryStore::new()));
        let blobs = Arc::new(FlakyBlobStore::new(MemoryBlobStore::new()));
        let clock = ManualClock::new(FIXTURE_START);

        Self {
            manager: ShareManager::with_clock(
                shares.clone(),
                blobs.clone(),
                clock.clone(),
                config,
            ),
            shares,
            blobs,
            clock,
        }
    }

    /// Move the fixture clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Create a text share, panicking on failure.
    pub async fn text_share(&self, text: &str, policy: SharePolicy) -> CreatedShare {
        self.manager
            .create(Payload::text(text), policy)
            .await
            .expect("create text share")
    }

    /// Create a file share, panicking on failure.
    pub async fn file_share(&self, name: &str, data: &[u8], policy: SharePolicy) -> CreatedShare {
        self.manager
            .create(Payload::file(name, data), policy)
            .await
            .expect("create file share")
    }

    /// Number of rows in the underlying share store.
    pub async fn row_count(&self) -> u64 {
        use oxshare_store::ShareStore;
        self.shares.inner().count().await.unwrap_or(0)
    }

    /// Number of blobs in the underlying blob store.
    pub fn blob_count(&self) -> usize {
        self.blobs.inner().len()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
