//! Storage layer: metadata records and blob bytes.
//!
//! Two seams, both trait-shaped so the core never depends on a concrete
//! backend:
//!
//! - [`MetaStore`] — records (sizes, policies, subscriptions, images,
//!   thumbnails, links) with *atomic* uniqueness guarantees. Uniqueness is
//!   a storage concern: requests may be served by independent processes,
//!   so the core relies on the store's unique indexes rather than
//!   in-process locking.
//! - [`BlobStore`] — durable named byte storage (`put` refuses to
//!   overwrite, `get` fails on absence).
//!
//! [`MemoryMetaStore`] and [`MemoryBlobStore`] back tests and single-node
//! deployments; [`FsBlobStore`] persists blobs to a directory. A
//! size-bounded [`BlobCache`] sits in front of blob reads on the public
//! serving path.

mod blob;
mod cache;
mod meta;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use cache::{BlobCache, DEFAULT_BLOB_CACHE_CAPACITY};
pub use meta::{
    index, AccountId, ImageRecord, LinkRecord, MemoryMetaStore, MetaStore, PolicyDraft,
    PolicyRecord, SizeRecord, SubscriptionRecord, ThumbnailRecord,
};
