//! Read cache for served asset bytes.
//!
//! Public link resolution and owner asset serving hit the blob store on
//! every request; this LRU keeps the hottest assets in memory. Entries
//! are keyed by asset name (names are immutable and write-once, so a
//! cached entry can never go stale) and evicted by total byte size.

use std::sync::Arc;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;

/// Default cache capacity: 64MB.
pub const DEFAULT_BLOB_CACHE_CAPACITY: usize = 64 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead).
const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// LRU cache for asset bytes with size-based capacity.
///
/// Thread-safe; share across tasks via `Arc`.
pub struct BlobCache {
    cache: RwLock<LruCache<Arc<str>, Bytes>>,
    max_size: usize,
    current_size: RwLock<usize>,
}

impl BlobCache {
    /// Create a cache with the default capacity (64MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BLOB_CACHE_CAPACITY)
    }

    /// Create a cache with the given capacity in bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self {
            cache: RwLock::new(LruCache::new(
                std::num::NonZeroUsize::new(DEFAULT_MAX_ENTRIES).unwrap(),
            )),
            max_size,
            current_size: RwLock::new(0),
        }
    }

    /// Get cached bytes, marking the entry as recently used.
    pub async fn get(&self, name: &str) -> Option<Bytes> {
        let mut cache = self.cache.write().await;
        cache.get(name).cloned()
    }

    /// Store bytes. Evicts least-recently-used entries until the cache is
    /// back within capacity.
    pub async fn put(&self, name: impl Into<Arc<str>>, data: Bytes) {
        let key = name.into();
        let data_size = data.len();
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        if let Some(old) = cache.peek(&key) {
            *current_size = current_size.saturating_sub(old.len());
        }

        cache.put(key, data);
        *current_size += data_size;

        while *current_size > self.max_size {
            if let Some((_, evicted)) = cache.pop_lru() {
                *current_size = current_size.saturating_sub(evicted.len());
            } else {
                break;
            }
        }
    }

    /// Current number of cached assets.
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }

    pub async fn is_empty(&self) -> bool {
        let cache = self.cache.read().await;
        cache.is_empty()
    }

    /// Current total size of cached bytes.
    pub async fn size(&self) -> usize {
        *self.current_size.read().await
    }

    /// Maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl Default for BlobCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
