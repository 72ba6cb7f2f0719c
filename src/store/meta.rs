//! Metadata store: records and the [`MetaStore`] trait.
//!
//! The trait is the single seam between the core and whatever persists
//! metadata. Every uniqueness rule in the system (size heights, policy
//! names, policy bundles, one subscription per account, image names,
//! thumbnail names, (image, height) pairs, link names) is enforced *here*,
//! atomically per call, and violations are reported as
//! [`StoreError::UniqueViolation`] naming one of the [`index`] constants.
//! Callers map those constants to domain errors; they never check-then-act
//! across an await point for a decision they rely on.
//!
//! [`MemoryMetaStore`] keeps everything in one `RwLock`-guarded state; the
//! single writer section per call is the in-memory stand-in for a
//! database's unique indexes and compare-and-swap inserts.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::tier::PolicyId;

/// Names of the unique indexes a [`MetaStore`] enforces.
///
/// `UniqueViolation { index }` carries one of these so the core can tell
/// which constraint rejected a write.
pub mod index {
    pub const POLICY_NAME: &str = "policy_name";
    pub const POLICY_BUNDLE: &str = "policy_bundle";
    pub const SUBSCRIPTION_ACCOUNT: &str = "subscription_account";
    pub const IMAGE_NAME: &str = "image_name";
    pub const IMAGE_BLOB: &str = "image_blob";
    pub const THUMBNAIL_NAME: &str = "thumbnail_name";
    pub const THUMBNAIL_PAIR: &str = "thumbnail_pair";
    pub const LINK_NAME: &str = "link_name";
}

// =============================================================================
// Records
// =============================================================================

/// Opaque authenticated account identity, supplied by the external session
/// resolver. The core never authenticates accounts, only authorizes them
/// through their subscription.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered thumbnail height. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeRecord {
    pub id: u64,
    pub height: u32,
}

/// A tier policy: the permission bundle granted to subscribed accounts.
///
/// Immutable after creation except administrative deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyRecord {
    pub id: PolicyId,
    pub name: String,
    /// Granted thumbnail heights (set semantics; ordering never matters).
    pub sizes: std::collections::BTreeSet<u32>,
    /// Whether uploads by subscribed accounts retain the original bytes.
    pub allow_original: bool,
    /// Whether subscribed accounts may mint expiring public links.
    /// Normalized at creation: never true without `allow_original`.
    pub allow_expiring_link: bool,
    /// Normalized (sizes, flags) key backing the bundle unique index.
    #[serde(skip)]
    pub fingerprint: String,
}

/// Input to [`MetaStore::insert_policy`]; the store assigns the id.
#[derive(Debug, Clone)]
pub struct PolicyDraft {
    pub name: String,
    pub sizes: std::collections::BTreeSet<u32>,
    pub allow_original: bool,
    pub allow_expiring_link: bool,
    pub fingerprint: String,
}

/// The 1:1 binding of an account to a tier policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscriptionRecord {
    pub account: AccountId,
    pub policy: PolicyId,
}

/// An uploaded image. `blob` is set at creation when the owner's policy at
/// that instant allowed original storage, and attached at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub name: String,
    pub owner: AccountId,
    /// Stored-bytes reference; `None` when the original was not retained.
    pub blob: Option<String>,
}

/// A derived thumbnail. Always has stored bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRecord {
    pub name: String,
    /// Name of the parent image.
    pub image: String,
    pub height: u32,
    pub blob: String,
}

/// A time-bounded public alias for one image. Never deleted on expiry;
/// expiry is checked at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub name: String,
    /// Name of the target image.
    pub image: String,
    /// Absolute expiry instant, unix seconds.
    pub expires_at: u64,
}

// =============================================================================
// MetaStore Trait
// =============================================================================

/// Atomic metadata persistence.
///
/// Implementations must make each method atomic with respect to the unique
/// constraints it touches: two concurrent inserts of the same key must
/// yield exactly one success and one [`StoreError::UniqueViolation`].
#[async_trait]
pub trait MetaStore: Send + Sync + 'static {
    // --- thumbnail size catalog ---

    /// Return the existing entry for `height` or create one. Idempotent;
    /// never fails on repetition. Height validation is the caller's job.
    async fn get_or_create_size(&self, height: u32) -> Result<SizeRecord, StoreError>;

    /// All registered sizes, ascending by height.
    async fn list_sizes(&self) -> Result<Vec<SizeRecord>, StoreError>;

    // --- tier policies ---

    /// Insert a policy. Fails with `UniqueViolation` on
    /// [`index::POLICY_NAME`] or [`index::POLICY_BUNDLE`].
    async fn insert_policy(&self, draft: PolicyDraft) -> Result<PolicyRecord, StoreError>;

    async fn policy(&self, id: PolicyId) -> Result<PolicyRecord, StoreError>;

    async fn list_policies(&self) -> Result<Vec<PolicyRecord>, StoreError>;

    /// Administrative deletion. Cascades to subscriptions bound to the
    /// policy, revoking their permissions immediately.
    async fn delete_policy(&self, id: PolicyId) -> Result<(), StoreError>;

    // --- subscriptions ---

    /// Bind an account to a policy. Fails with `UniqueViolation` on
    /// [`index::SUBSCRIPTION_ACCOUNT`] if the account is already bound.
    async fn insert_subscription(
        &self,
        account: AccountId,
        policy: PolicyId,
    ) -> Result<SubscriptionRecord, StoreError>;

    async fn subscription(&self, account: AccountId) -> Result<SubscriptionRecord, StoreError>;

    /// Replace the bound policy. Fails with `NotFound` when unbound.
    async fn update_subscription(
        &self,
        account: AccountId,
        policy: PolicyId,
    ) -> Result<SubscriptionRecord, StoreError>;

    /// Remove the binding, closing the account's upload and link paths.
    async fn delete_subscription(&self, account: AccountId) -> Result<(), StoreError>;

    // --- images ---

    /// Insert an image. Fails with `UniqueViolation` on
    /// [`index::IMAGE_NAME`]; that is a fatal storage condition for
    /// callers, never a retry path.
    async fn insert_image(&self, record: ImageRecord) -> Result<ImageRecord, StoreError>;

    async fn image(&self, name: &str) -> Result<ImageRecord, StoreError>;

    /// The owner's images, newest first.
    async fn images_of(&self, owner: AccountId) -> Result<Vec<ImageRecord>, StoreError>;

    /// Running count of the owner's images (feeds the naming scheme).
    async fn image_count_of(&self, owner: AccountId) -> Result<u64, StoreError>;

    /// Attach the stored-bytes reference, once. Fails with
    /// `UniqueViolation` on [`index::IMAGE_BLOB`] when already attached.
    async fn attach_image_blob(&self, name: &str, blob: &str)
        -> Result<ImageRecord, StoreError>;

    // --- thumbnails ---

    /// Insert a thumbnail. Fails with `UniqueViolation` on
    /// [`index::THUMBNAIL_NAME`] or [`index::THUMBNAIL_PAIR`].
    async fn insert_thumbnail(
        &self,
        record: ThumbnailRecord,
    ) -> Result<ThumbnailRecord, StoreError>;

    async fn thumbnail(&self, name: &str) -> Result<ThumbnailRecord, StoreError>;

    /// Thumbnails of one image, in creation order.
    async fn thumbnails_of(&self, image: &str) -> Result<Vec<ThumbnailRecord>, StoreError>;

    async fn thumbnail_exists(&self, image: &str, height: u32) -> Result<bool, StoreError>;

    // --- expiring links ---

    /// Insert a link. Fails with `UniqueViolation` on [`index::LINK_NAME`].
    async fn insert_link(&self, record: LinkRecord) -> Result<LinkRecord, StoreError>;

    async fn link(&self, name: &str) -> Result<LinkRecord, StoreError>;

    /// Total links ever created (the global naming sequence). Links are
    /// never deleted, so this equals the stored count.
    async fn link_count(&self) -> Result<u64, StoreError>;
}

// =============================================================================
// MemoryMetaStore
// =============================================================================

#[derive(Default)]
struct MetaState {
    sizes: BTreeMap<u32, SizeRecord>,
    next_size_id: u64,

    policies: HashMap<PolicyId, PolicyRecord>,
    policy_names: HashMap<String, PolicyId>,
    policy_bundles: HashMap<String, PolicyId>,
    next_policy_id: u64,

    subscriptions: HashMap<AccountId, SubscriptionRecord>,

    images: HashMap<String, ImageRecord>,
    owner_images: HashMap<AccountId, Vec<String>>,

    thumbnails: HashMap<String, ThumbnailRecord>,
    image_thumbnails: HashMap<String, Vec<String>>,
    thumbnail_pairs: HashSet<(String, u32)>,

    links: HashMap<String, LinkRecord>,
}

/// In-memory [`MetaStore`].
///
/// One `RwLock` guards the whole state; each trait method takes the lock
/// once, so unique checks and inserts are atomic exactly like a database
/// unique index would make them.
#[derive(Default)]
pub struct MemoryMetaStore {
    state: RwLock<MetaState>,
}

impl MemoryMetaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetaStore for MemoryMetaStore {
    async fn get_or_create_size(&self, height: u32) -> Result<SizeRecord, StoreError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.sizes.get(&height) {
            return Ok(*existing);
        }
        let record = SizeRecord {
            id: state.next_size_id,
            height,
        };
        state.next_size_id += 1;
        state.sizes.insert(height, record);
        Ok(record)
    }

    async fn list_sizes(&self) -> Result<Vec<SizeRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.sizes.values().copied().collect())
    }

    async fn insert_policy(&self, draft: PolicyDraft) -> Result<PolicyRecord, StoreError> {
        let mut state = self.state.write().await;
        if state.policy_names.contains_key(&draft.name) {
            return Err(StoreError::UniqueViolation {
                index: index::POLICY_NAME,
                key: draft.name,
            });
        }
        if state.policy_bundles.contains_key(&draft.fingerprint) {
            return Err(StoreError::UniqueViolation {
                index: index::POLICY_BUNDLE,
                key: draft.fingerprint,
            });
        }
        let record = PolicyRecord {
            id: PolicyId(state.next_policy_id),
            name: draft.name,
            sizes: draft.sizes,
            allow_original: draft.allow_original,
            allow_expiring_link: draft.allow_expiring_link,
            fingerprint: draft.fingerprint,
        };
        state.next_policy_id += 1;
        state.policy_names.insert(record.name.clone(), record.id);
        state
            .policy_bundles
            .insert(record.fingerprint.clone(), record.id);
        state.policies.insert(record.id, record.clone());
        Ok(record)
    }

    async fn policy(&self, id: PolicyId) -> Result<PolicyRecord, StoreError> {
        let state = self.state.read().await;
        state
            .policies
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("policy {id}")))
    }

    async fn list_policies(&self) -> Result<Vec<PolicyRecord>, StoreError> {
        let state = self.state.read().await;
        let mut policies: Vec<_> = state.policies.values().cloned().collect();
        policies.sort_by_key(|p| p.id);
        Ok(policies)
    }

    async fn delete_policy(&self, id: PolicyId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let record = state
            .policies
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("policy {id}")))?;
        state.policy_names.remove(&record.name);
        state.policy_bundles.remove(&record.fingerprint);
        state.subscriptions.retain(|_, sub| sub.policy != id);
        Ok(())
    }

    async fn insert_subscription(
        &self,
        account: AccountId,
        policy: PolicyId,
    ) -> Result<SubscriptionRecord, StoreError> {
        let mut state = self.state.write().await;
        if state.subscriptions.contains_key(&account) {
            return Err(StoreError::UniqueViolation {
                index: index::SUBSCRIPTION_ACCOUNT,
                key: account.to_string(),
            });
        }
        let record = SubscriptionRecord { account, policy };
        state.subscriptions.insert(account, record);
        Ok(record)
    }

    async fn subscription(&self, account: AccountId) -> Result<SubscriptionRecord, StoreError> {
        let state = self.state.read().await;
        state
            .subscriptions
            .get(&account)
            .copied()
            .ok_or_else(|| StoreError::NotFound(format!("subscription for account {account}")))
    }

    async fn update_subscription(
        &self,
        account: AccountId,
        policy: PolicyId,
    ) -> Result<SubscriptionRecord, StoreError> {
        let mut state = self.state.write().await;
        let record = state
            .subscriptions
            .get_mut(&account)
            .ok_or_else(|| StoreError::NotFound(format!("subscription for account {account}")))?;
        record.policy = policy;
        Ok(*record)
    }

    async fn delete_subscription(&self, account: AccountId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state
            .subscriptions
            .remove(&account)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("subscription for account {account}")))
    }

    async fn insert_image(&self, record: ImageRecord) -> Result<ImageRecord, StoreError> {
        let mut state = self.state.write().await;
        if state.images.contains_key(&record.name) {
            return Err(StoreError::UniqueViolation {
                index: index::IMAGE_NAME,
                key: record.name,
            });
        }
        state
            .owner_images
            .entry(record.owner)
            .or_default()
            .push(record.name.clone());
        state.images.insert(record.name.clone(), record.clone());
        Ok(record)
    }

    async fn image(&self, name: &str) -> Result<ImageRecord, StoreError> {
        let state = self.state.read().await;
        state
            .images
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("image {name}")))
    }

    async fn images_of(&self, owner: AccountId) -> Result<Vec<ImageRecord>, StoreError> {
        let state = self.state.read().await;
        let names = match state.owner_images.get(&owner) {
            Some(names) => names,
            None => return Ok(Vec::new()),
        };
        Ok(names
            .iter()
            .rev()
            .filter_map(|name| state.images.get(name).cloned())
            .collect())
    }

    async fn image_count_of(&self, owner: AccountId) -> Result<u64, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .owner_images
            .get(&owner)
            .map_or(0, |names| names.len() as u64))
    }

    async fn attach_image_blob(
        &self,
        name: &str,
        blob: &str,
    ) -> Result<ImageRecord, StoreError> {
        let mut state = self.state.write().await;
        let record = state
            .images
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(format!("image {name}")))?;
        if record.blob.is_some() {
            return Err(StoreError::UniqueViolation {
                index: index::IMAGE_BLOB,
                key: name.to_string(),
            });
        }
        record.blob = Some(blob.to_string());
        Ok(record.clone())
    }

    async fn insert_thumbnail(
        &self,
        record: ThumbnailRecord,
    ) -> Result<ThumbnailRecord, StoreError> {
        let mut state = self.state.write().await;
        if state.thumbnails.contains_key(&record.name) {
            return Err(StoreError::UniqueViolation {
                index: index::THUMBNAIL_NAME,
                key: record.name,
            });
        }
        let pair = (record.image.clone(), record.height);
        if state.thumbnail_pairs.contains(&pair) {
            return Err(StoreError::UniqueViolation {
                index: index::THUMBNAIL_PAIR,
                key: format!("{}:{}", record.image, record.height),
            });
        }
        state.thumbnail_pairs.insert(pair);
        state
            .image_thumbnails
            .entry(record.image.clone())
            .or_default()
            .push(record.name.clone());
        state.thumbnails.insert(record.name.clone(), record.clone());
        Ok(record)
    }

    async fn thumbnail(&self, name: &str) -> Result<ThumbnailRecord, StoreError> {
        let state = self.state.read().await;
        state
            .thumbnails
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("thumbnail {name}")))
    }

    async fn thumbnails_of(&self, image: &str) -> Result<Vec<ThumbnailRecord>, StoreError> {
        let state = self.state.read().await;
        let names = match state.image_thumbnails.get(image) {
            Some(names) => names,
            None => return Ok(Vec::new()),
        };
        Ok(names
            .iter()
            .filter_map(|name| state.thumbnails.get(name).cloned())
            .collect())
    }

    async fn thumbnail_exists(&self, image: &str, height: u32) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .thumbnail_pairs
            .contains(&(image.to_string(), height)))
    }

    async fn insert_link(&self, record: LinkRecord) -> Result<LinkRecord, StoreError> {
        let mut state = self.state.write().await;
        if state.links.contains_key(&record.name) {
            return Err(StoreError::UniqueViolation {
                index: index::LINK_NAME,
                key: record.name,
            });
        }
        state.links.insert(record.name.clone(), record.clone());
        Ok(record)
    }

    async fn link(&self, name: &str) -> Result<LinkRecord, StoreError> {
        let state = self.state.read().await;
        state
            .links
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("link {name}")))
    }

    async fn link_count(&self) -> Result<u64, StoreError> {
        let state = self.state.read().await;
        Ok(state.links.len() as u64)
    }
}

// =============================================================================
// Tests
// =============================================================================
