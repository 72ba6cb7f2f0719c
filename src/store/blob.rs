//! Blob storage: durable named byte storage for image assets.
//!
//! The [`BlobStore`] trait is the boundary to whatever holds the actual
//! bytes. Its contract is small on purpose: `put` refuses to overwrite an
//! existing name (names are unique by construction, so an overwrite means
//! something has gone wrong upstream) and `get` fails on absence.
//!
//! Two implementations ship with the crate:
//! - [`MemoryBlobStore`] for tests and throwaway deployments
//! - [`FsBlobStore`] persisting each blob as a file under a root directory

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::StoreError;

// =============================================================================
// BlobStore Trait
// =============================================================================

/// Durable named byte storage.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Persist `bytes` under `name`. Fails with [`StoreError::AlreadyExists`]
    /// when the name is taken; blobs are write-once.
    async fn put(&self, name: &str, bytes: Bytes) -> Result<(), StoreError>;

    /// Retrieve the bytes stored under `name`. Fails with
    /// [`StoreError::NotFound`] when absent.
    async fn get(&self, name: &str) -> Result<Bytes, StoreError>;

    /// Whether a blob with that name exists.
    async fn contains(&self, name: &str) -> Result<bool, StoreError>;
}

// =============================================================================
// MemoryBlobStore
// =============================================================================

/// In-memory [`BlobStore`] backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, name: &str, bytes: Bytes) -> Result<(), StoreError> {
        let mut blobs = self.blobs.write().await;
        if blobs.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        blobs.insert(name.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Bytes, StoreError> {
        let blobs = self.blobs.read().await;
        blobs
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn contains(&self, name: &str) -> Result<bool, StoreError> {
        let blobs = self.blobs.read().await;
        Ok(blobs.contains_key(name))
    }
}

// =============================================================================
// FsBlobStore
// =============================================================================

/// Filesystem-backed [`BlobStore`]. Each blob is one file directly under
/// the root directory; asset names never contain path separators, and
/// anything that does is rejected before touching the filesystem.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| StoreError::Unavailable(format!("create {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    fn blob_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, name: &str, bytes: Bytes) -> Result<(), StoreError> {
        let path = self.blob_path(name)?;
        // create_new gives the write-once guarantee atomically at the
        // filesystem level.
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(name.to_string()));
            }
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "open {}: {e}",
                    path.display()
                )));
            }
        };
        file.write_all(&bytes)
            .await
            .map_err(|e| StoreError::Unavailable(format!("write {}: {e}", path.display())))?;
        file.flush()
            .await
            .map_err(|e| StoreError::Unavailable(format!("flush {}: {e}", path.display())))?;
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Bytes, StoreError> {
        let path = self.blob_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(StoreError::Unavailable(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn contains(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.blob_path(name)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }
}

// =============================================================================
// Tests
// =============================================================================
