//! Image asset lifecycle.
//!
//! Images are created at upload time and never mutated afterwards, except
//! to attach the stored-bytes reference once. Whether the original bytes
//! are retained is decided by the caller from the owner's policy *at the
//! moment of creation* — that permission is captured here and deliberately
//! never re-evaluated later, unlike thumbnail and link permissions which
//! are always re-read live.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::{AssetError, StoreError};
use crate::store::{AccountId, BlobStore, ImageRecord, MetaStore};

use super::naming::{image_name, unix_now, ImageExt};

/// Creates and looks up image assets.
pub struct ImageLibrary<M: MetaStore, B: BlobStore> {
    meta: Arc<M>,
    blobs: Arc<B>,
}

impl<M: MetaStore, B: BlobStore> ImageLibrary<M, B> {
    pub fn new(meta: Arc<M>, blobs: Arc<B>) -> Self {
        Self { meta, blobs }
    }

    /// Create an image for `owner`.
    ///
    /// `original` carries the upload bytes when the owner's current policy
    /// allows original storage; pass `None` otherwise. The decision is the
    /// caller's and is taken exactly once, here.
    ///
    /// # Errors
    ///
    /// [`AssetError::UnsupportedExtension`] unless the extension is `.jpg`
    /// or `.png`. A unique-name violation from the store propagates as a
    /// storage error — the name recipe makes collisions negligible, and a
    /// hit means something is wrong enough that retrying would hide it.
    pub async fn create(
        &self,
        owner: AccountId,
        extension: &str,
        original: Option<Bytes>,
    ) -> Result<ImageRecord, AssetError> {
        let ext = ImageExt::parse(extension)?;
        self.create_at(owner, ext, original, unix_now()).await
    }

    /// [`Self::create`] with the creation instant injected, for callers
    /// that already parsed the extension and for deterministic tests.
    pub async fn create_at(
        &self,
        owner: AccountId,
        ext: ImageExt,
        original: Option<Bytes>,
        now: u64,
    ) -> Result<ImageRecord, AssetError> {
        let count = self.meta.image_count_of(owner).await?;
        let name = image_name(owner, now, count, ext);

        let record = self
            .meta
            .insert_image(ImageRecord {
                name: name.clone(),
                owner,
                blob: None,
            })
            .await?;

        match original {
            Some(bytes) => {
                self.blobs.put(&name, bytes).await?;
                Ok(self.meta.attach_image_blob(&name, &name).await?)
            }
            None => Ok(record),
        }
    }

    /// Look up an image by name, regardless of owner.
    pub async fn get(&self, name: &str) -> Result<ImageRecord, AssetError> {
        match self.meta.image(name).await {
            Ok(record) => Ok(record),
            Err(StoreError::NotFound(_)) => Err(AssetError::NotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up an image by name, visible only to its owner. A foreign
    /// image reports the same absence as a missing one.
    pub async fn get_owned(
        &self,
        owner: AccountId,
        name: &str,
    ) -> Result<ImageRecord, AssetError> {
        let record = self.get(name).await?;
        if record.owner != owner {
            return Err(AssetError::NotFound {
                name: name.to_string(),
            });
        }
        Ok(record)
    }

    /// The owner's images, newest first.
    pub async fn list(&self, owner: AccountId) -> Result<Vec<ImageRecord>, AssetError> {
        Ok(self.meta.images_of(owner).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================
