//! Host service: the orchestration layer over tiers, assets and links.
//!
//! [`HostService`] is the entry point the HTTP handlers call. It wires the
//! tier directory, the asset libraries, the link issuer, and the blob
//! read cache into the operations the API exposes, and funnels every
//! domain error into one response-facing [`ServiceError`].
//!
//! # Upload pipeline
//!
//! ```text
//! upload(account, content_type, bytes)
//!   1. subscription lookup            — the policy gate (403 when unbound)
//!   2. image creation                 — original stored iff the gate
//!                                       policy allows it *right now*;
//!                                       that decision is never revisited
//!   3. thumbnail fan-out              — the gate policy's heights,
//!                                       descending; each step re-reads
//!                                       the *current* policy
//! ```
//!
//! Each step's failure is terminal for the whole request. Assets created
//! by earlier steps stay in place — at-least-once, no compensation. A
//! tier change landing mid-upload therefore changes which thumbnails that
//! upload produces.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

use crate::asset::{naming, ImageExt, ImageLibrary, ThumbnailFactory};
use crate::error::{
    AssetError, CatalogError, ErrorClass, LinkError, PolicyError, StoreError, SubscriptionError,
};
use crate::link::LinkIssuer;
use crate::store::{
    AccountId, BlobCache, BlobStore, ImageRecord, LinkRecord, MetaStore, PolicyRecord, SizeRecord,
    SubscriptionRecord, ThumbnailRecord,
};
use crate::tier::{PolicyDirectory, PolicyId, SizeCatalog, Subscriptions};

// =============================================================================
// Service Error
// =============================================================================

/// Umbrella error for every service operation.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The account's current tier does not grant expiring links. Checked
    /// live at issuance, never captured earlier.
    #[error("not allowed to generate expiring links")]
    LinkNotAllowed,

    /// The upload's declared content type is not an accepted image type.
    #[error("unsupported media type: {content_type:?} (valid: image/jpeg, image/png)")]
    UnsupportedMediaType { content_type: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ServiceError::LinkNotAllowed | ServiceError::UnsupportedMediaType { .. } => {
                ErrorClass::ValidationFailed
            }
            ServiceError::Catalog(e) => e.class(),
            ServiceError::Policy(e) => e.class(),
            ServiceError::Subscription(e) => e.class(),
            ServiceError::Asset(e) => e.class(),
            ServiceError::Link(e) => e.class(),
            ServiceError::Store(e) => e.class(),
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// What an upload produced.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub image: ImageRecord,
    /// Derived thumbnails, tallest first.
    pub thumbnails: Vec<ThumbnailRecord>,
}

/// An asset resolved for serving: its bytes and content type.
#[derive(Debug, Clone)]
pub struct ServedAsset {
    pub name: String,
    pub media_type: &'static str,
    pub bytes: Bytes,
}

// =============================================================================
// Host Service
// =============================================================================

/// The tiered image-hosting core, one façade over all components.
pub struct HostService<M: MetaStore, B: BlobStore> {
    sizes: SizeCatalog<M>,
    policies: PolicyDirectory<M>,
    subscriptions: Subscriptions<M>,
    images: ImageLibrary<M, B>,
    thumbnails: ThumbnailFactory<M, B>,
    links: LinkIssuer<M>,
    meta: Arc<M>,
    blobs: Arc<B>,
    cache: BlobCache,
}

impl<M: MetaStore, B: BlobStore> HostService<M, B> {
    /// Create a service over the given stores with the default read-cache
    /// capacity.
    pub fn new(meta: Arc<M>, blobs: Arc<B>) -> Self {
        Self::with_cache_capacity(meta, blobs, crate::store::DEFAULT_BLOB_CACHE_CAPACITY)
    }

    /// Create a service with a custom read-cache capacity in bytes.
    pub fn with_cache_capacity(meta: Arc<M>, blobs: Arc<B>, cache_capacity: usize) -> Self {
        Self {
            sizes: SizeCatalog::new(meta.clone()),
            policies: PolicyDirectory::new(meta.clone()),
            subscriptions: Subscriptions::new(meta.clone()),
            images: ImageLibrary::new(meta.clone(), blobs.clone()),
            thumbnails: ThumbnailFactory::new(meta.clone(), blobs.clone()),
            links: LinkIssuer::new(meta.clone()),
            meta,
            blobs,
            cache: BlobCache::with_capacity(cache_capacity),
        }
    }

    // -------------------------------------------------------------------------
    // Tier administration
    // -------------------------------------------------------------------------

    /// Register a thumbnail height, idempotently.
    pub async fn get_or_create_size(&self, height: u32) -> Result<SizeRecord, ServiceError> {
        Ok(self.sizes.get_or_create(height).await?)
    }

    /// All registered sizes, ascending.
    pub async fn list_sizes(&self) -> Result<Vec<SizeRecord>, ServiceError> {
        Ok(self.sizes.list().await?)
    }

    /// Create a tier policy from heights; each height is registered in the
    /// catalog first.
    pub async fn create_policy(
        &self,
        name: &str,
        heights: &[u32],
        allow_original: bool,
        allow_expiring_link: bool,
    ) -> Result<PolicyRecord, ServiceError> {
        let mut sizes = Vec::with_capacity(heights.len());
        for &height in heights {
            sizes.push(self.sizes.get_or_create(height).await?);
        }
        Ok(self
            .policies
            .create(name, &sizes, allow_original, allow_expiring_link)
            .await?)
    }

    pub async fn policy(&self, id: PolicyId) -> Result<PolicyRecord, ServiceError> {
        Ok(self.policies.get(id).await?)
    }

    pub async fn list_policies(&self) -> Result<Vec<PolicyRecord>, ServiceError> {
        Ok(self.policies.list().await?)
    }

    /// Administrative deletion; cascades to subscriptions.
    pub async fn delete_policy(&self, id: PolicyId) -> Result<(), ServiceError> {
        Ok(self.policies.delete(id).await?)
    }

    /// Bind an account to a policy (1:1).
    pub async fn bind_subscription(
        &self,
        account: AccountId,
        policy: PolicyId,
    ) -> Result<SubscriptionRecord, ServiceError> {
        let policy = self.policies.get(policy).await?;
        Ok(self.subscriptions.bind(&policy, account).await?)
    }

    /// Replace an account's bound policy; rejects a no-op change.
    pub async fn change_subscription_tier(
        &self,
        account: AccountId,
        policy: PolicyId,
    ) -> Result<SubscriptionRecord, ServiceError> {
        let policy = self.policies.get(policy).await?;
        Ok(self.subscriptions.change_tier(account, &policy).await?)
    }

    /// Remove an account's subscription, revoking its permissions
    /// immediately.
    pub async fn cancel_subscription(&self, account: AccountId) -> Result<(), ServiceError> {
        Ok(self.subscriptions.cancel(account).await?)
    }

    // -------------------------------------------------------------------------
    // Upload
    // -------------------------------------------------------------------------

    /// Ingest an upload: create the image (retaining the original iff the
    /// account's policy allows it right now) and derive one thumbnail per
    /// granted height, tallest first.
    pub async fn upload(
        &self,
        account: AccountId,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<UploadOutcome, ServiceError> {
        let ext = ImageExt::from_media_type(content_type).ok_or_else(|| {
            ServiceError::UnsupportedMediaType {
                content_type: content_type.to_string(),
            }
        })?;

        // The policy gate. Failing here means the account may not upload
        // at all.
        let gate_policy = self.subscriptions.current_policy(account).await?;

        // Original-storage decision: captured at this exact moment and
        // never revisited, even if the tier changes later.
        let original = gate_policy.allow_original.then(|| bytes.clone());
        let image = self
            .images
            .create_at(account, ext, original, naming::unix_now())
            .await?;

        debug!(image = %image.name, account = %account, "image created");

        // Thumbnail fan-out over the gate policy's heights, tallest first.
        // Each step re-reads the current policy — no snapshot isolation —
        // and any failure is terminal; already-created assets stay.
        let mut thumbnails = Vec::with_capacity(gate_policy.sizes.len());
        for &height in gate_policy.sizes.iter().rev() {
            let size = self.sizes.get_or_create(height).await?;
            let current = self.subscriptions.current_policy(account).await?;
            let thumbnail = self
                .thumbnails
                .create(&image, &size, &current, &bytes)
                .await?;
            thumbnails.push(thumbnail);
        }

        Ok(UploadOutcome { image, thumbnails })
    }

    // -------------------------------------------------------------------------
    // Image lookup
    // -------------------------------------------------------------------------

    /// The account's images, newest first.
    pub async fn list_images(
        &self,
        account: AccountId,
    ) -> Result<Vec<ImageRecord>, ServiceError> {
        Ok(self.images.list(account).await?)
    }

    /// The thumbnails derived from one image.
    pub async fn thumbnails_of(
        &self,
        image: &str,
    ) -> Result<Vec<ThumbnailRecord>, ServiceError> {
        Ok(self.thumbnails.list(image).await?)
    }

    /// Look up one of the account's images by name.
    ///
    /// # Errors
    ///
    /// [`AssetError::InvalidName`] for a name that is not `.jpg`/`.png`
    /// shaped; [`AssetError::NotFound`] when absent (or owned by someone
    /// else — the two are indistinguishable).
    pub async fn image_details(
        &self,
        account: AccountId,
        name: &str,
    ) -> Result<ImageRecord, ServiceError> {
        if !naming::is_valid_image_name(name) {
            return Err(AssetError::InvalidName {
                name: name.to_string(),
            }
            .into());
        }
        Ok(self.images.get_owned(account, name).await?)
    }

    // -------------------------------------------------------------------------
    // Expiring links
    // -------------------------------------------------------------------------

    /// Mint an expiring link over one of the account's images.
    ///
    /// The `allow_expiring_link` permission is re-evaluated here against
    /// the *current* subscription — deliberately unlike original-image
    /// storage, which is captured at creation time. The issuer itself
    /// never checks it.
    pub async fn generate_link(
        &self,
        account: AccountId,
        image_name: &str,
        seconds: i64,
    ) -> Result<LinkRecord, ServiceError> {
        let policy = self.subscriptions.current_policy(account).await?;
        if !policy.allow_expiring_link {
            return Err(ServiceError::LinkNotAllowed);
        }
        let image = self.images.get_owned(account, image_name).await?;
        Ok(self.links.generate(&image, seconds).await?)
    }

    /// Resolve a public link to servable bytes. Expired and absent links
    /// are the same `NotFound`; content type is decided by the asset
    /// extension.
    pub async fn resolve_link(&self, name: &str) -> Result<ServedAsset, ServiceError> {
        let link = self.links.resolve(name).await?;
        let image = self.images.get(&link.image).await?;
        let blob = image.blob.as_deref().ok_or_else(|| LinkError::NotFound {
            name: name.to_string(),
        })?;
        let bytes = self.fetch_blob(blob, name).await?;
        Ok(ServedAsset {
            media_type: ImageExt::from_name(&image.name).media_type(),
            name: image.name,
            bytes,
        })
    }

    // -------------------------------------------------------------------------
    // Owner asset serving
    // -------------------------------------------------------------------------

    /// Serve a stored asset (original or thumbnail) to its owner. Foreign
    /// and missing assets report the same absence.
    pub async fn serve_asset(
        &self,
        account: AccountId,
        name: &str,
    ) -> Result<ServedAsset, ServiceError> {
        let not_found = || AssetError::NotFound {
            name: name.to_string(),
        };

        // Originals and thumbnails live in distinct record spaces; try
        // the image name first, then the thumbnail name.
        let blob = match self.images.get(name).await {
            Ok(image) => {
                if image.owner != account {
                    return Err(not_found().into());
                }
                image.blob.ok_or_else(not_found)?
            }
            Err(AssetError::NotFound { .. }) => {
                let thumbnail = match self.thumbnail_by_name(name).await? {
                    Some(thumbnail) => thumbnail,
                    None => return Err(not_found().into()),
                };
                let parent = self.images.get(&thumbnail.image).await?;
                if parent.owner != account {
                    return Err(not_found().into());
                }
                thumbnail.blob
            }
            Err(e) => return Err(e.into()),
        };

        let bytes = self.fetch_blob(&blob, name).await?;
        Ok(ServedAsset {
            name: name.to_string(),
            media_type: ImageExt::from_name(name).media_type(),
            bytes,
        })
    }

    async fn thumbnail_by_name(
        &self,
        name: &str,
    ) -> Result<Option<ThumbnailRecord>, ServiceError> {
        match self.meta.thumbnail(name).await {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read blob bytes through the LRU cache. A missing blob behind an
    /// otherwise valid reference surfaces as link/asset absence upstream.
    async fn fetch_blob(&self, blob: &str, requested: &str) -> Result<Bytes, ServiceError> {
        if let Some(bytes) = self.cache.get(blob).await {
            return Ok(bytes);
        }
        let bytes = match self.blobs.get(blob).await {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound(_)) => {
                return Err(AssetError::NotFound {
                    name: requested.to_string(),
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        };
        self.cache.put(blob.to_string(), bytes.clone()).await;
        Ok(bytes)
    }
}

// =============================================================================
// Tests
// =============================================================================
