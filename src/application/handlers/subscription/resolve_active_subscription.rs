//! ResolveActiveSubscriptionHandler - Query handler for the user's current grant.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::subscription::{Subscription, SubscriptionError, UserEntitlement};
use crate::ports::{Clock, EntitlementRepository, SubscriptionRepository};

use super::{latest_active_grant, store_failure};

#[derive(Debug, Clone)]
pub struct ResolveActiveSubscriptionQuery {
    pub user_id: UserId,
}

/// The user's premium standing at query time.
#[derive(Debug, Clone)]
pub struct ResolveActiveSubscriptionResult {
    /// ACTIVE subscription with the latest future `end_date`, if any.
    pub active: Option<Subscription>,
    /// Whole days left on `active`, rounded up; 0 without one.
    pub days_remaining: u32,
    /// Stored entitlement; `None` if the user is unknown to the store.
    pub entitlement: Option<UserEntitlement>,
}

pub struct ResolveActiveSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    entitlements: Arc<dyn EntitlementRepository>,
    clock: Arc<dyn Clock>,
}

impl ResolveActiveSubscriptionHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        entitlements: Arc<dyn EntitlementRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscriptions,
            entitlements,
            clock,
        }
    }

    pub async fn handle(
        &self,
        query: ResolveActiveSubscriptionQuery,
    ) -> Result<ResolveActiveSubscriptionResult, SubscriptionError> {
        let now = self.clock.now();

        let active = latest_active_grant(self.subscriptions.as_ref(), &query.user_id, now)
            .await
            .map_err(store_failure)?;

        let entitlement = self
            .entitlements
            .get(&query.user_id)
            .await
            .map_err(store_failure)?;

        Ok(ResolveActiveSubscriptionResult {
            days_remaining: active.as_ref().map_or(0, |s| s.days_remaining(now)),
            active,
            entitlement,
        })
    }
}
