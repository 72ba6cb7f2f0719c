//! Thumbnail asset derivation.
//!
//! Unlike original storage — which is captured once at image creation —
//! the permission to derive a thumbnail is re-checked against the owner's
//! *current* policy every time. The two refusal reasons ("height not in
//! the current policy" and "this (image, height) thumbnail already
//! exists") are reported as the same [`AssetError::NotPermitted`]: both
//! mean this derived asset may not be created now. The exact-name check
//! is an independent, defensive second gate.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::{AssetError, StoreError};
use crate::store::{
    index, BlobStore, ImageRecord, MetaStore, PolicyRecord, SizeRecord, ThumbnailRecord,
};
use crate::thumb::ThumbnailEncoder;

use super::naming::{thumbnail_name, ImageExt};

/// Derives and persists thumbnail assets.
pub struct ThumbnailFactory<M: MetaStore, B: BlobStore> {
    meta: Arc<M>,
    blobs: Arc<B>,
    encoder: ThumbnailEncoder,
}

impl<M: MetaStore, B: BlobStore> ThumbnailFactory<M, B> {
    pub fn new(meta: Arc<M>, blobs: Arc<B>) -> Self {
        Self {
            meta,
            blobs,
            encoder: ThumbnailEncoder::new(),
        }
    }

    /// Derive the `size` thumbnail of `image` from `source` bytes.
    ///
    /// `policy` must be the owner's policy as of *now* — the caller looks
    /// it up immediately before this call, never from an earlier snapshot.
    ///
    /// # Errors
    ///
    /// - [`AssetError::NotPermitted`] when the height is not in `policy`'s
    ///   size set, or a thumbnail for this (image, height) already exists
    /// - [`AssetError::NameCollision`] when the derived name is taken
    ///   (defensive, independent of the pair check)
    /// - [`AssetError::Resize`] when the source bytes cannot be decoded
    pub async fn create(
        &self,
        image: &ImageRecord,
        size: &SizeRecord,
        policy: &PolicyRecord,
        source: &Bytes,
    ) -> Result<ThumbnailRecord, AssetError> {
        if !policy.sizes.contains(&size.height) {
            return Err(AssetError::NotPermitted {
                height: size.height,
            });
        }
        if self.meta.thumbnail_exists(&image.name, size.height).await? {
            return Err(AssetError::NotPermitted {
                height: size.height,
            });
        }

        let name = thumbnail_name(&image.name, size.height);
        let format = ImageExt::from_name(&image.name);
        let bytes = self.encoder.resize(source, size.height, format)?;

        // The store's unique indexes stay authoritative under concurrent
        // requests; the pre-checks above only produce friendlier errors.
        let record = match self
            .meta
            .insert_thumbnail(ThumbnailRecord {
                name: name.clone(),
                image: image.name.clone(),
                height: size.height,
                blob: name.clone(),
            })
            .await
        {
            Ok(record) => record,
            Err(StoreError::UniqueViolation { index: idx, key })
                if idx == index::THUMBNAIL_NAME =>
            {
                return Err(AssetError::NameCollision { name: key });
            }
            Err(StoreError::UniqueViolation { index: idx, .. })
                if idx == index::THUMBNAIL_PAIR =>
            {
                return Err(AssetError::NotPermitted {
                    height: size.height,
                });
            }
            Err(e) => return Err(e.into()),
        };

        match self.blobs.put(&name, bytes).await {
            Ok(()) => Ok(record),
            Err(StoreError::AlreadyExists(name)) => Err(AssetError::NameCollision { name }),
            Err(e) => Err(e.into()),
        }
    }

    /// Thumbnails of one image, in creation order.
    pub async fn list(&self, image: &str) -> Result<Vec<ThumbnailRecord>, AssetError> {
        Ok(self.meta.thumbnails_of(image).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================
