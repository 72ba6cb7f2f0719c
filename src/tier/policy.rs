//! Tier policy directory.
//!
//! A policy is a named permission bundle: the set of thumbnail heights an
//! account may derive, whether its uploads retain the original bytes, and
//! whether it may mint expiring public links. Two rules shape creation:
//!
//! - `allow_expiring_link` implies `allow_original` — a link is only
//!   meaningful over a stored original, so the flag is normalized to
//!   `allow_expiring_link && allow_original` before anything else.
//! - No two policies may grant the identical bundle. The normalized
//!   (sizes, flags) triple is flattened into a fingerprint string and
//!   guarded by a unique index, so duplicate detection is one lookup
//!   instead of a scan-and-compare over size sets.
//!
//! Policies are immutable after creation; the only mutation is
//! administrative deletion, which cascades to subscriptions bound to the
//! policy.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{PolicyError, StoreError};
use crate::store::{index, MetaStore, PolicyDraft, PolicyRecord, SizeRecord};

use super::PolicyId;

/// Maximum policy name length, in characters.
pub const MAX_POLICY_NAME_LEN: usize = 50;

/// Flatten a normalized permission bundle into its unique-index key.
///
/// Heights are emitted in ascending order, so set equality collapses to
/// string equality regardless of the order sizes were supplied in.
pub fn bundle_fingerprint(
    sizes: &BTreeSet<u32>,
    allow_original: bool,
    allow_expiring_link: bool,
) -> String {
    let heights: Vec<String> = sizes.iter().map(u32::to_string).collect();
    format!(
        "{}|original={}|link={}",
        heights.join(","),
        allow_original,
        allow_expiring_link
    )
}

/// Directory of tier policies.
pub struct PolicyDirectory<M: MetaStore> {
    store: Arc<M>,
}

impl<M: MetaStore> PolicyDirectory<M> {
    pub fn new(store: Arc<M>) -> Self {
        Self { store }
    }

    /// Create a policy from catalog entries and permission flags.
    ///
    /// # Errors
    ///
    /// - [`PolicyError::EmptyName`] / [`PolicyError::NameTooLong`] /
    ///   [`PolicyError::EmptySizes`] — rejected before any state mutation
    /// - [`PolicyError::DuplicateName`] — the name is taken
    /// - [`PolicyError::DuplicateBundle`] — an existing policy grants the
    ///   identical (sizes, flags) triple after normalization
    pub async fn create(
        &self,
        name: &str,
        sizes: &[SizeRecord],
        allow_original: bool,
        allow_expiring_link: bool,
    ) -> Result<PolicyRecord, PolicyError> {
        if name.is_empty() {
            return Err(PolicyError::EmptyName);
        }
        let len = name.chars().count();
        if len > MAX_POLICY_NAME_LEN {
            return Err(PolicyError::NameTooLong {
                len,
                max: MAX_POLICY_NAME_LEN,
            });
        }
        if sizes.is_empty() {
            return Err(PolicyError::EmptySizes);
        }

        // A link permission without original retention would grant nothing.
        let allow_expiring_link = allow_expiring_link && allow_original;

        let heights: BTreeSet<u32> = sizes.iter().map(|s| s.height).collect();
        let fingerprint = bundle_fingerprint(&heights, allow_original, allow_expiring_link);

        let draft = PolicyDraft {
            name: name.to_string(),
            sizes: heights,
            allow_original,
            allow_expiring_link,
            fingerprint,
        };

        match self.store.insert_policy(draft).await {
            Ok(record) => Ok(record),
            Err(StoreError::UniqueViolation { index: idx, key }) if idx == index::POLICY_NAME => {
                Err(PolicyError::DuplicateName { name: key })
            }
            Err(StoreError::UniqueViolation { index: idx, .. })
                if idx == index::POLICY_BUNDLE =>
            {
                Err(PolicyError::DuplicateBundle)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a policy by id.
    pub async fn get(&self, id: PolicyId) -> Result<PolicyRecord, PolicyError> {
        match self.store.policy(id).await {
            Ok(record) => Ok(record),
            Err(StoreError::NotFound(_)) => Err(PolicyError::NotFound { id }),
            Err(e) => Err(e.into()),
        }
    }

    /// All policies, oldest first.
    pub async fn list(&self) -> Result<Vec<PolicyRecord>, PolicyError> {
        Ok(self.store.list_policies().await?)
    }

    /// Administrative deletion. Subscriptions bound to the policy are
    /// removed with it, revoking their permissions immediately.
    pub async fn delete(&self, id: PolicyId) -> Result<(), PolicyError> {
        match self.store.delete_policy(id).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound(_)) => Err(PolicyError::NotFound { id }),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
