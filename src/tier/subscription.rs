//! Account subscriptions.
//!
//! A subscription binds exactly one account to exactly one tier policy at
//! any instant. Everything downstream (upload gating, thumbnail sizes,
//! link permission) reads the *current* binding at the moment of the
//! check — there is no snapshot isolation across a multi-step request, so
//! a tier change lands immediately.

use std::sync::Arc;

use crate::error::{StoreError, SubscriptionError};
use crate::store::{index, AccountId, MetaStore, PolicyRecord, SubscriptionRecord};

/// Manages the 1:1 account-to-policy bindings.
pub struct Subscriptions<M: MetaStore> {
    store: Arc<M>,
}

impl<M: MetaStore> Subscriptions<M> {
    pub fn new(store: Arc<M>) -> Self {
        Self { store }
    }

    /// Bind `account` to `policy`.
    ///
    /// # Errors
    ///
    /// [`SubscriptionError::AlreadyBound`] when the account already has any
    /// subscription; accounts change tiers, they never hold two.
    pub async fn bind(
        &self,
        policy: &PolicyRecord,
        account: AccountId,
    ) -> Result<SubscriptionRecord, SubscriptionError> {
        match self.store.insert_subscription(account, policy.id).await {
            Ok(record) => Ok(record),
            Err(StoreError::UniqueViolation { index: idx, .. })
                if idx == index::SUBSCRIPTION_ACCOUNT =>
            {
                Err(SubscriptionError::AlreadyBound { account })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the account's bound policy with `new_policy`.
    ///
    /// # Errors
    ///
    /// - [`SubscriptionError::NotSubscribed`] when the account is unbound
    /// - [`SubscriptionError::NoOpChange`] when `new_policy` is the policy
    ///   already bound
    pub async fn change_tier(
        &self,
        account: AccountId,
        new_policy: &PolicyRecord,
    ) -> Result<SubscriptionRecord, SubscriptionError> {
        let current = self.get(account).await?;
        if current.policy == new_policy.id {
            return Err(SubscriptionError::NoOpChange);
        }
        Ok(self
            .store
            .update_subscription(account, new_policy.id)
            .await?)
    }

    /// Remove the account's subscription, revoking all derived permissions
    /// immediately: subsequent policy lookups fail, closing the upload and
    /// link paths.
    pub async fn cancel(&self, account: AccountId) -> Result<(), SubscriptionError> {
        match self.store.delete_subscription(account).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound(_)) => Err(SubscriptionError::NotSubscribed { account }),
            Err(e) => Err(e.into()),
        }
    }

    /// The account's subscription record.
    pub async fn get(
        &self,
        account: AccountId,
    ) -> Result<SubscriptionRecord, SubscriptionError> {
        match self.store.subscription(account).await {
            Ok(record) => Ok(record),
            Err(StoreError::NotFound(_)) => Err(SubscriptionError::NotSubscribed { account }),
            Err(e) => Err(e.into()),
        }
    }

    /// The account's current policy — the permission read every gated
    /// operation performs at the instant of its check.
    pub async fn current_policy(
        &self,
        account: AccountId,
    ) -> Result<PolicyRecord, SubscriptionError> {
        let subscription = self.get(account).await?;
        Ok(self.store.policy(subscription.policy).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================
