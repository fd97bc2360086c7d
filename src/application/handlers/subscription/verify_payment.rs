//! VerifyPaymentHandler - Command handler for a verifier's approve/reject decision.
//!
//! Approval is two writes: the subscription first, then the user's entitlement.
//! There is no transaction spanning both. If the second write fails the
//! subscription stays ACTIVE, the call reports `InconsistentState`, and
//! `ReconcileEntitlementsHandler` repairs the entitlement later.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::foundation::{SubscriptionId, UserId};
use crate::domain::subscription::{Subscription, SubscriptionError, UserEntitlement};
use crate::ports::{Clock, EntitlementRepository, SubscriptionRepository};

use super::record_failure;

/// Command carrying a verification decision.
#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    pub subscription_id: SubscriptionId,
    pub verified_by: UserId,
    pub approved: bool,
    pub notes: Option<String>,
}

/// Result of a verification decision.
#[derive(Debug, Clone)]
pub struct VerifyPaymentResult {
    pub subscription: Subscription,
    /// The entitlement written on approval; `None` on rejection.
    pub entitlement: Option<UserEntitlement>,
}

pub struct VerifyPaymentHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    entitlements: Arc<dyn EntitlementRepository>,
    clock: Arc<dyn Clock>,
}

impl VerifyPaymentHandler {
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
        cmd: VerifyPaymentCommand,
    ) -> Result<VerifyPaymentResult, SubscriptionError> {
        let on_error = record_failure(cmd.subscription_id);

        // 1. Load the target record
        let mut subscription = self
            .subscriptions
            .find_by_id(&cmd.subscription_id)
            .await
            .map_err(&on_error)?
            .ok_or_else(|| SubscriptionError::not_found(cmd.subscription_id))?;

        // 2. Only PENDING accepts a decision
        if !subscription.status.accepts_verification() {
            warn!(
                subscription_id = %subscription.id,
                status = %subscription.status,
                verified_by = %cmd.verified_by,
                "verification attempted on decided subscription"
            );
            return Err(SubscriptionError::already_decided(
                subscription.id,
                subscription.status,
            ));
        }

        // 3. Apply the decision and persist the subscription
        let now = self.clock.now();
        if cmd.approved {
            subscription.approve(cmd.verified_by.clone(), cmd.notes, now)?;
        } else {
            subscription.reject(cmd.verified_by.clone(), cmd.notes, now)?;
        }
        self.subscriptions
            .update(&subscription)
            .await
            .map_err(&on_error)?;

        if !cmd.approved {
            info!(
                subscription_id = %subscription.id,
                user_id = %subscription.user_id,
                verified_by = %cmd.verified_by,
                "payment rejected"
            );
            return Ok(VerifyPaymentResult {
                subscription,
                entitlement: None,
            });
        }

        // 4. Grant the entitlement; a failure here leaves the record ACTIVE
        let entitlement = UserEntitlement::from_grant(&subscription).ok_or_else(|| {
            SubscriptionError::inconsistent_state(
                subscription.id,
                subscription.user_id.clone(),
                "approved subscription has no end date",
            )
        })?;

        if let Err(err) = self.entitlements.write(&entitlement).await {
            error!(
                subscription_id = %subscription.id,
                user_id = %subscription.user_id,
                error = %err,
                "subscription approved but entitlement write failed"
            );
            return Err(SubscriptionError::inconsistent_state(
                subscription.id,
                subscription.user_id.clone(),
                err.to_string(),
            ));
        }

        info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            verified_by = %cmd.verified_by,
            end_date = ?subscription.end_date,
            "payment approved, premium granted"
        );

        Ok(VerifyPaymentResult {
            subscription,
            entitlement: Some(entitlement),
        })
    }
}
