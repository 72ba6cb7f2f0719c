//! Expiring public links.
//!
//! A link is a time-bounded public alias for one stored image. Its state
//! machine is minimal and one-way: `Active` (expiry in the future) →
//! `Expired` (expiry not in the future), never reactivated. Expiry is
//! lazy — nothing deletes expired links; resolution just compares
//! `now >= expires_at` and reports an expired link exactly like a name
//! that never existed.
//!
//! Issuance deliberately does **not** check the owning account's
//! `allow_expiring_link` permission. That check belongs to the API
//! boundary, re-evaluated against the *current* subscription at call time
//! (see [`crate::service::HostService::generate_link`]) — the opposite of
//! original-image storage, whose permission is captured once at creation.

use std::sync::Arc;

use crate::asset::naming::{link_name, unix_now};
use crate::error::{LinkError, StoreError};
use crate::store::{ImageRecord, LinkRecord, MetaStore};

/// Minimum link lifetime in seconds.
pub const MIN_LINK_SECONDS: u64 = 300;

/// Maximum link lifetime in seconds.
pub const MAX_LINK_SECONDS: u64 = 30_000;

/// The two states of a link's lifecycle. Monotonic: once `Expired`,
/// always `Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Active,
    Expired,
}

impl LinkRecord {
    /// The link's state at `now` (unix seconds). A link whose expiry is
    /// not in the future is already `Expired`.
    pub fn state(&self, now: u64) -> LinkState {
        if now >= self.expires_at {
            LinkState::Expired
        } else {
            LinkState::Active
        }
    }
}

/// Mints and resolves expiring links.
pub struct LinkIssuer<M: MetaStore> {
    store: Arc<M>,
}

impl<M: MetaStore> LinkIssuer<M> {
    pub fn new(store: Arc<M>) -> Self {
        Self { store }
    }

    /// Mint a link to `image` valid for `seconds` from now.
    pub async fn generate(
        &self,
        image: &ImageRecord,
        seconds: i64,
    ) -> Result<LinkRecord, LinkError> {
        self.generate_at(image, seconds, unix_now()).await
    }

    /// [`Self::generate`] with the issuance instant injected.
    ///
    /// # Errors
    ///
    /// - [`LinkError::SecondsOutOfRange`] outside
    ///   [`MIN_LINK_SECONDS`]..=[`MAX_LINK_SECONDS`]
    /// - [`LinkError::NotLinkable`] when `image` has no stored bytes — an
    ///   image without a retained original cannot be linked
    pub async fn generate_at(
        &self,
        image: &ImageRecord,
        seconds: i64,
        now: u64,
    ) -> Result<LinkRecord, LinkError> {
        if seconds < MIN_LINK_SECONDS as i64 || seconds > MAX_LINK_SECONDS as i64 {
            return Err(LinkError::SecondsOutOfRange {
                seconds,
                min: MIN_LINK_SECONDS,
                max: MAX_LINK_SECONDS,
            });
        }
        if image.blob.is_none() {
            return Err(LinkError::NotLinkable {
                image: image.name.clone(),
            });
        }

        // Names draw on a global sequence, unlike per-owner image names.
        let count = self.store.link_count().await?;
        let record = LinkRecord {
            name: link_name(count, now, &image.name),
            image: image.name.clone(),
            expires_at: now + seconds as u64,
        };
        Ok(self.store.insert_link(record).await?)
    }

    /// Resolve a link name to its record.
    pub async fn resolve(&self, name: &str) -> Result<LinkRecord, LinkError> {
        self.resolve_at(name, unix_now()).await
    }

    /// [`Self::resolve`] with the read instant injected.
    ///
    /// # Errors
    ///
    /// [`LinkError::NotFound`] when no link with that name exists, or one
    /// exists but is `Expired` at `now` — callers cannot tell the two
    /// apart.
    pub async fn resolve_at(&self, name: &str, now: u64) -> Result<LinkRecord, LinkError> {
        let record = match self.store.link(name).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                return Err(LinkError::NotFound {
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        match record.state(now) {
            LinkState::Active => Ok(record),
            LinkState::Expired => Err(LinkError::NotFound {
                name: name.to_string(),
            }),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
