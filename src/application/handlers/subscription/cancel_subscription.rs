//! CancelSubscriptionHandler - Command handler for forcing a subscription closed.
//!
//! Cancellation is driven from outside the engine (support, refunds). When the
//! cancelled record was the user's live grant, the entitlement is recomputed
//! from whatever else the user still holds.

use std::sync::Arc;

use tracing::{error, info};

use crate::domain::foundation::SubscriptionId;
use crate::domain::subscription::{Subscription, SubscriptionError, UserEntitlement};
use crate::ports::{Clock, EntitlementRepository, SubscriptionRepository};

use super::{latest_active_grant, record_failure};

#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub subscription_id: SubscriptionId,
}

#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    pub subscription: Subscription,
    /// Recomputed entitlement, when the cancelled record was a live grant.
    pub entitlement: Option<UserEntitlement>,
}

pub struct CancelSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    entitlements: Arc<dyn EntitlementRepository>,
    clock: Arc<dyn Clock>,
}

impl CancelSubscriptionHandler {
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
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, SubscriptionError> {
        let on_error = record_failure(cmd.subscription_id);
        let now = self.clock.now();

        let mut subscription = self
            .subscriptions
            .find_by_id(&cmd.subscription_id)
            .await
            .map_err(&on_error)?
            .ok_or_else(|| SubscriptionError::not_found(cmd.subscription_id))?;

        let was_live_grant = subscription.is_active_at(now);
        let previous_status = subscription.status;

        subscription.cancel(now)?;
        self.subscriptions
            .update(&subscription)
            .await
            .map_err(&on_error)?;

        info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            previous_status = %previous_status,
            "subscription cancelled"
        );

        if !was_live_grant {
            return Ok(CancelSubscriptionResult {
                subscription,
                entitlement: None,
            });
        }

        // The record is already CANCELLED, so failures from here on are
        // repaired by reconciliation rather than a retry
        let lookup =
            latest_active_grant(self.subscriptions.as_ref(), &subscription.user_id, now).await;
        let fallback = match lookup {
            Ok(fallback) => fallback,
            Err(err) => {
                error!(
                    subscription_id = %subscription.id,
                    user_id = %subscription.user_id,
                    error = %err,
                    "subscription cancelled but remaining grants could not be read"
                );
                return Err(SubscriptionError::inconsistent_state(
                    subscription.id,
                    subscription.user_id.clone(),
                    err.to_string(),
                ));
            }
        };

        // Fall back to any other live grant, else revoke
        let entitlement = fallback
            .and_then(|grant| UserEntitlement::from_grant(&grant))
            .unwrap_or_else(|| UserEntitlement::none(subscription.user_id.clone()));

        if let Err(err) = self.entitlements.write(&entitlement).await {
            error!(
                subscription_id = %subscription.id,
                user_id = %subscription.user_id,
                error = %err,
                "subscription cancelled but entitlement was not recomputed"
            );
            return Err(SubscriptionError::inconsistent_state(
                subscription.id,
                subscription.user_id.clone(),
                err.to_string(),
            ));
        }

        Ok(CancelSubscriptionResult {
            subscription,
            entitlement: Some(entitlement),
        })
    }
}
