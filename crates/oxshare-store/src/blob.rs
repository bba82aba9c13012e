//! Blob store backends for sealed file payloads.
//!
//! Blobs are opaque sealed bytes. A blob is only ever reachable through the
//! share record that references it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::fs;

use oxshare_core::BlobRef;

use crate::error::{Result, StoreError};
use crate::traits::BlobStore;

/// In-memory blob store.
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<BlobRef, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `blob` is stored.
    pub fn contains(&self, blob: &BlobRef) -> bool {
        self.blobs
            .read()
            .map(|b| b.contains_key(blob))
            .unwrap_or(false)
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: &[u8], now: i64) -> Result<BlobRef> {
        let blob = BlobRef::generate(now);
        let mut blobs = self.blobs.write().map_err(StoreError::poisoned)?;
        blobs.insert(blob.clone(), data.to_vec());
        Ok(blob)
    }

    async fn get(&self, blob: &BlobRef) -> Result<Option<Vec<u8>>> {
        let blobs = self.blobs.read().map_err(StoreError::poisoned)?;
        Ok(blobs.get(blob).cloned())
    }

    async fn delete(&self, blob: &BlobRef) -> Result<()> {
        let mut blobs = self.blobs.write().map_err(StoreError::poisoned)?;
        blobs.remove(blob);
        Ok(())
    }
}

/// Local filesystem blob store.
///
/// Structure: `{root}/blobs/{blob_ref}`. Writes go to a temporary file that
/// is renamed into place, so a reader never sees a partial blob.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create storage at the given root directory.
    ///
    /// Creates the directory structure if it doesn't exist.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("blobs")).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, blob: &BlobRef) -> Result<PathBuf> {
        if !blob.is_well_formed() {
            return Err(StoreError::InvalidData(format!(
                "malformed blob reference: {:?}",
                blob.as_str()
            )));
        }
        Ok(self.root.join("blobs").join(blob.as_str()))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, data: &[u8], now: i64) -> Result<BlobRef> {
        let blob = BlobRef::generate(now);
        let path = self.blob_path(&blob)?;
        let tmp = path.with_extension("tmp");

        fs::write(&tmp, data).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        Ok(blob)
    }

    async fn get(&self, blob: &BlobRef) -> Result<Option<Vec<u8>>> {
        let path = self.blob_path(blob)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, blob: &BlobRef) -> Result<()> {
        let path = self.blob_path(blob)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
