//! # pixtier
//!
//! A tiered image-hosting core. Accounts are bound to tier policies that
//! decide which thumbnail heights their uploads derive, whether the
//! original image is retained, and whether time-limited public links may
//! be minted over otherwise-private assets.
//!
//! ## Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`tier`] - Size catalog, tier policies and account subscriptions
//! - [`asset`] - Image and thumbnail assets with the naming scheme
//! - [`thumb`] - The pure resize/re-encode transformation
//! - [`link`] - Expiring public links with lazy, compare-at-read expiry
//! - [`store`] - Storage seams: metadata records, blob bytes, read cache
//! - [`service`] - The orchestration façade the HTTP layer calls
//! - [`server`] - Axum-based HTTP surface
//! - [`config`] - CLI and configuration types
//!
//! ## Permission model
//!
//! Two deliberately different rules coexist:
//!
//! - **Captured**: whether an upload's original bytes are stored is
//!   decided from the owner's policy at the moment of image creation and
//!   never revisited.
//! - **Live**: thumbnail derivation and link issuance re-read the owner's
//!   *current* subscription at every check.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pixtier::{create_router, HostService, RouterConfig};
//! use pixtier::store::{MemoryBlobStore, MemoryMetaStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = HostService::new(
//!         Arc::new(MemoryMetaStore::new()),
//!         Arc::new(MemoryBlobStore::new()),
//!     );
//!     let router = create_router(service, RouterConfig::new());
//!
//!     // Bind and serve...
//! }
//! ```

pub mod asset;
pub mod config;
pub mod error;
pub mod link;
pub mod server;
pub mod service;
pub mod store;
pub mod thumb;
pub mod tier;

// Re-export commonly used types
pub use asset::{ImageExt, ImageLibrary, ThumbnailFactory};
pub use config::Config;
pub use error::{
    AssetError, CatalogError, ErrorClass, LinkError, PolicyError, ResizeError, StoreError,
    SubscriptionError,
};
pub use link::{LinkIssuer, LinkState, MAX_LINK_SECONDS, MIN_LINK_SECONDS};
pub use server::{create_router, AppState, RouterConfig};
pub use service::{HostService, ServedAsset, ServiceError, UploadOutcome};
pub use store::{
    AccountId, BlobCache, BlobStore, FsBlobStore, ImageRecord, LinkRecord, MemoryBlobStore,
    MemoryMetaStore, MetaStore, PolicyRecord, SizeRecord, SubscriptionRecord, ThumbnailRecord,
};
pub use thumb::{ThumbnailEncoder, DEFAULT_JPEG_QUALITY};
pub use tier::{PolicyDirectory, PolicyId, SizeCatalog, Subscriptions, MAX_POLICY_NAME_LEN};
