//! Error types for the pixtier core.
//!
//! Errors are grouped per domain (storage, size catalog, tier policies,
//! subscriptions, assets, resizing, expiring links) and every enum can
//! report which of the five error classes it belongs to via [`ErrorClass`]:
//!
//! - `InvalidArgument` — wrong shape, rejected before any state mutation
//! - `ValidationFailed` — right shape, semantically rejected value
//! - `NotFound` — referenced entity absent (or, for links, expired)
//! - `Conflict` — resource exists in a state incompatible with the request
//! - `UpstreamUnavailable` — storage / backing-service failure
//!
//! Validation and not-found errors always surface to the caller; nothing is
//! swallowed or retried in-core. The HTTP mapping lives in
//! [`crate::server::handlers`].

use thiserror::Error;

use crate::store::AccountId;
use crate::tier::PolicyId;

/// The five error classes surfaced to callers.
///
/// Each class maps to one HTTP status family at the API boundary, with a
/// small number of permission-shaped overrides (see `server::handlers`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Wrong type or shape; checked before any state mutation.
    InvalidArgument,
    /// Well-formed but semantically rejected value or action.
    ValidationFailed,
    /// Referenced entity absent, or an expired link (indistinguishable).
    NotFound,
    /// Resource exists in a state incompatible with the request.
    Conflict,
    /// Storage or backing-service failure; propagated unmodified.
    UpstreamUnavailable,
}

/// Errors raised by the storage layer (metadata and blob stores).
///
/// Uniqueness is enforced here, not in the core: a [`StoreError::UniqueViolation`]
/// names the violated index so callers can map it to a domain error. The
/// index names live in [`crate::store::index`].
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Named record or blob does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A blob with that name is already stored.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A unique index rejected the write.
    #[error("unique index {index} violated by key {key:?}")]
    UniqueViolation { index: &'static str, key: String },

    /// The backing store could not serve the request.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            StoreError::NotFound(_) => ErrorClass::NotFound,
            StoreError::AlreadyExists(_) | StoreError::UniqueViolation { .. } => {
                ErrorClass::Conflict
            }
            StoreError::Unavailable(_) => ErrorClass::UpstreamUnavailable,
        }
    }
}

/// Errors from the thumbnail size catalog.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// Heights are strictly positive pixel counts.
    #[error("invalid thumbnail height: {height} (must be positive)")]
    InvalidHeight { height: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CatalogError::InvalidHeight { .. } => ErrorClass::ValidationFailed,
            CatalogError::Store(e) => e.class(),
        }
    }
}

/// Errors from tier policy creation and deletion.
#[derive(Debug, Clone, Error)]
pub enum PolicyError {
    /// Policy names are non-empty.
    #[error("policy name must not be empty")]
    EmptyName,

    /// Policy names are at most 50 characters.
    #[error("policy name too long: {len} characters (max {max})")]
    NameTooLong { len: usize, max: usize },

    /// A policy grants at least one thumbnail size.
    #[error("policy requires a non-empty set of thumbnail sizes")]
    EmptySizes,

    /// Another policy already uses this name.
    #[error("policy name already taken: {name:?}")]
    DuplicateName { name: String },

    /// Another policy already grants the identical permission bundle
    /// (same size set and flags after normalization), regardless of name.
    #[error("a policy with the identical size set and flags already exists")]
    DuplicateBundle,

    /// No policy with that id.
    #[error("policy not found: {id}")]
    NotFound { id: PolicyId },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PolicyError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PolicyError::EmptyName
            | PolicyError::NameTooLong { .. }
            | PolicyError::EmptySizes => ErrorClass::InvalidArgument,
            PolicyError::DuplicateName { .. } | PolicyError::DuplicateBundle => {
                ErrorClass::ValidationFailed
            }
            PolicyError::NotFound { .. } => ErrorClass::NotFound,
            PolicyError::Store(e) => e.class(),
        }
    }
}

/// Errors from account subscription management.
#[derive(Debug, Clone, Error)]
pub enum SubscriptionError {
    /// An account holds exactly one subscription at a time.
    #[error("account {account} already has a subscription")]
    AlreadyBound { account: AccountId },

    /// Changing to the currently bound policy is rejected.
    #[error("account is already on that tier")]
    NoOpChange,

    /// The account has no subscription; upload and link paths are closed.
    #[error("account {account} has no subscription")]
    NotSubscribed { account: AccountId },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SubscriptionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SubscriptionError::AlreadyBound { .. }
            | SubscriptionError::NoOpChange
            | SubscriptionError::NotSubscribed { .. } => ErrorClass::ValidationFailed,
            SubscriptionError::Store(e) => e.class(),
        }
    }
}

/// Errors from the pure resize/re-encode step.
#[derive(Debug, Clone, Error)]
pub enum ResizeError {
    /// Input bytes are not a decodable image.
    #[error("failed to decode image: {message}")]
    Decode { message: String },

    /// Re-encoding the resized image failed.
    #[error("failed to encode image: {message}")]
    Encode { message: String },
}

impl ResizeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ResizeError::Decode { .. } => ErrorClass::ValidationFailed,
            ResizeError::Encode { .. } => ErrorClass::UpstreamUnavailable,
        }
    }
}

/// Errors from image and thumbnail asset creation and lookup.
#[derive(Debug, Clone, Error)]
pub enum AssetError {
    /// Only `.jpg` and `.png` uploads are supported.
    #[error("unsupported extension: {extension:?} (supported: .jpg, .png)")]
    UnsupportedExtension { extension: String },

    /// The requested name is not a well-formed image name.
    #[error("invalid image name: {name:?}")]
    InvalidName { name: String },

    /// The derived asset may not be created now: the height is outside the
    /// owner's current policy, or a thumbnail for this (image, height)
    /// pair already exists. Both are the same refusal by design.
    #[error("thumbnail of height {height} may not be created for this image")]
    NotPermitted { height: u32 },

    /// Defensive check independent of the (image, height) pair gate.
    #[error("asset name already taken: {name:?}")]
    NameCollision { name: String },

    /// No image with that name (for this owner, where scoped).
    #[error("image not found: {name:?}")]
    NotFound { name: String },

    #[error(transparent)]
    Resize(#[from] ResizeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AssetError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AssetError::InvalidName { .. } => ErrorClass::InvalidArgument,
            AssetError::UnsupportedExtension { .. } | AssetError::NotPermitted { .. } => {
                ErrorClass::ValidationFailed
            }
            AssetError::NameCollision { .. } => ErrorClass::Conflict,
            AssetError::NotFound { .. } => ErrorClass::NotFound,
            AssetError::Resize(e) => e.class(),
            AssetError::Store(e) => e.class(),
        }
    }
}

/// Errors from expiring link issuance and resolution.
#[derive(Debug, Clone, Error)]
pub enum LinkError {
    /// Lifetimes are bounded to [300, 30000] seconds.
    #[error("link lifetime out of range: {seconds}s (allowed: {min}..={max})")]
    SecondsOutOfRange { seconds: i64, min: u64, max: u64 },

    /// The target image has no stored original, so a link over it would
    /// dangle; the image exists but cannot be linked.
    #[error("image {image:?} has no stored original to link to")]
    NotLinkable { image: String },

    /// No active link with that name. Expired links are reported exactly
    /// like names that never existed.
    #[error("link not found: {name:?}")]
    NotFound { name: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LinkError {
    pub fn class(&self) -> ErrorClass {
        match self {
            LinkError::SecondsOutOfRange { .. } => ErrorClass::ValidationFailed,
            LinkError::NotLinkable { .. } => ErrorClass::Conflict,
            LinkError::NotFound { .. } => ErrorClass::NotFound,
            LinkError::Store(e) => e.class(),
        }
    }
}
