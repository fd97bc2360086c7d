//! Premium entitlement view of a user.
//!
//! The engine owns exactly two fields of the user record: the premium flag and
//! the expiry. Identity fields belong to the account system.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

use super::Subscription;

/// The user's premium flag and expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntitlement {
    pub user_id: UserId,
    pub is_premium: bool,
    pub subscription_expiry: Option<Timestamp>,
}

impl UserEntitlement {
    /// Entitlement of a user with no grant.
    pub fn none(user_id: UserId) -> Self {
        Self {
            user_id,
            is_premium: false,
            subscription_expiry: None,
        }
    }

    /// Premium until `expiry`.
    pub fn granted(user_id: UserId, expiry: Timestamp) -> Self {
        Self {
            user_id,
            is_premium: true,
            subscription_expiry: Some(expiry),
        }
    }

    /// Entitlement an approved subscription should produce.
    ///
    /// Returns `None` if the subscription carries no period end.
    pub fn from_grant(subscription: &Subscription) -> Option<Self> {
        subscription
            .end_date
            .map(|end| Self::granted(subscription.user_id.clone(), end))
    }

    /// Premium flag set and expiry still ahead of `now`.
    pub fn has_active_premium(&self, now: Timestamp) -> bool {
        self.is_premium
            && self
                .subscription_expiry
                .map_or(false, |expiry| expiry.is_after(&now))
    }

    /// Whole days of premium left, truncated; 0 once lapsed.
    pub fn days_remaining(&self, now: Timestamp) -> u32 {
        if !self.has_active_premium(now) {
            return 0;
        }
        self.subscription_expiry
            .map(|expiry| expiry.duration_since(&now).num_days().max(0) as u32)
            .unwrap_or(0)
    }

    /// True when this entitlement already reflects `grant`'s period.
    pub fn matches_grant(&self, grant: &Subscription) -> bool {
        self.is_premium
            && self.subscription_expiry.is_some()
            && self.subscription_expiry == grant.end_date
    }
}
