//! The thumbnail size catalog.
//!
//! Heights are registered on first request and never change afterwards;
//! repeated requests for the same height return the same entry without
//! side effects.

use std::sync::Arc;

use crate::error::CatalogError;
use crate::store::{MetaStore, SizeRecord};

/// Canonical registry of distinct thumbnail heights.
pub struct SizeCatalog<M: MetaStore> {
    store: Arc<M>,
}

impl<M: MetaStore> SizeCatalog<M> {
    pub fn new(store: Arc<M>) -> Self {
        Self { store }
    }

    /// Return the catalog entry for `height`, creating it on first request.
    ///
    /// # Errors
    ///
    /// [`CatalogError::InvalidHeight`] for a zero height; heights are
    /// strictly positive pixel counts.
    pub async fn get_or_create(&self, height: u32) -> Result<SizeRecord, CatalogError> {
        if height == 0 {
            return Err(CatalogError::InvalidHeight { height });
        }
        Ok(self.store.get_or_create_size(height).await?)
    }

    /// All registered sizes, ascending by height.
    pub async fn list(&self) -> Result<Vec<SizeRecord>, CatalogError> {
        Ok(self.store.list_sizes().await?)
    }
}
