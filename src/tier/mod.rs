//! Tier layer: who is allowed to produce and see what.
//!
//! Three components, leaves first:
//!
//! - [`SizeCatalog`] — the registry of distinct thumbnail heights
//! - [`PolicyDirectory`] — named permission bundles (granted heights,
//!   original retention, expiring links)
//! - [`Subscriptions`] — the 1:1 binding of accounts to policies; every
//!   permission question in the system is answered by looking up the
//!   account's *current* subscription

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod policy;
pub mod sizes;
pub mod subscription;

pub use policy::{bundle_fingerprint, PolicyDirectory, MAX_POLICY_NAME_LEN};
pub use sizes::SizeCatalog;
pub use subscription::Subscriptions;

/// Identifier of a tier policy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PolicyId(pub u64);

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
