//! SubmitPaymentRequestHandler - Command handler for payment requests.
//!
//! A user has at most one PENDING subscription. A new request for a user who
//! already has one is folded into it; otherwise a fresh PENDING record is
//! created. If a concurrent request wins the insert, this one merges into the
//! winner once.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::foundation::{ErrorCode, SubscriptionId, UserId};
use crate::domain::subscription::{
    Currency, Money, PaymentReference, PlanType, Subscription, SubscriptionError,
    TransactionNumber,
};
use crate::ports::{Clock, SubscriptionRepository};

use super::{record_failure, store_failure};

const DEFAULT_REFERENCE_PREFIX: &str = "PRED";

/// Command to request (or re-request) a premium subscription.
#[derive(Debug, Clone)]
pub struct SubmitPaymentRequestCommand {
    pub user_id: UserId,
    pub plan_type: PlanType,
    pub amount_cents: i64,
    pub currency: String,
    /// Generated when absent.
    pub payment_reference: Option<String>,
    /// Empty or blank is treated as absent.
    pub transaction_number: Option<String>,
}

/// Result of a payment request.
#[derive(Debug, Clone)]
pub struct SubmitPaymentRequestResult {
    pub subscription: Subscription,
    /// True when an existing PENDING record was reused.
    pub merged: bool,
}

#[derive(Debug, Clone)]
struct RequestTerms {
    plan_type: PlanType,
    payment_reference: PaymentReference,
    amount: Money,
    transaction_number: Option<TransactionNumber>,
}

/// Handler for payment requests.
pub struct SubmitPaymentRequestHandler {
    repository: Arc<dyn SubscriptionRepository>,
    clock: Arc<dyn Clock>,
    reference_prefix: String,
}

impl SubmitPaymentRequestHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            reference_prefix: DEFAULT_REFERENCE_PREFIX.to_string(),
        }
    }

    /// Prefix for generated payment references.
    pub fn with_reference_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reference_prefix = prefix.into();
        self
    }

    pub async fn handle(
        &self,
        cmd: SubmitPaymentRequestCommand,
    ) -> Result<SubmitPaymentRequestResult, SubscriptionError> {
        // 1. Validate before touching the store
        let terms = self.validate(&cmd)?;
        let user_id = cmd.user_id;
        let now = self.clock.now();

        // 2. Reuse the outstanding request if there is one
        if let Some(existing) = self
            .repository
            .find_pending_by_user(&user_id)
            .await
            .map_err(store_failure)?
        {
            return self.merge_into(existing, terms).await;
        }

        // 3. Otherwise create a new PENDING record
        let subscription = Subscription::request(
            SubscriptionId::new(),
            user_id.clone(),
            terms.plan_type,
            terms.payment_reference.clone(),
            terms.amount.clone(),
            terms.transaction_number.clone(),
            now,
        );

        match self.repository.save(&subscription).await {
            Ok(()) => {
                info!(
                    subscription_id = %subscription.id,
                    user_id = %user_id,
                    plan_type = %subscription.plan_type,
                    amount = %subscription.amount,
                    "payment request created"
                );
                Ok(SubmitPaymentRequestResult {
                    subscription,
                    merged: false,
                })
            }
            Err(err) if err.code == ErrorCode::PendingSubscriptionExists => {
                // 4. A concurrent request won the insert; fold into it
                warn!(user_id = %user_id, "concurrent payment request detected, merging into pending record");
                let winner = self
                    .repository
                    .find_pending_by_user(&user_id)
                    .await
                    .map_err(store_failure)?
                    .ok_or_else(|| {
                        SubscriptionError::store_unavailable(format!(
                            "Pending subscription for user {} disappeared during merge",
                            user_id
                        ))
                    })?;
                self.merge_into(winner, terms).await
            }
            Err(err) => Err(store_failure(err)),
        }
    }

    fn validate(&self, cmd: &SubmitPaymentRequestCommand) -> Result<RequestTerms, SubscriptionError> {
        let currency = Currency::new(cmd.currency.clone())?;
        let amount = Money::new(cmd.amount_cents, currency)?;
        let payment_reference = match &cmd.payment_reference {
            Some(reference) => PaymentReference::new(reference.clone())?,
            None => PaymentReference::generate(&self.reference_prefix),
        };

        Ok(RequestTerms {
            plan_type: cmd.plan_type,
            payment_reference,
            amount,
            transaction_number: TransactionNumber::from_optional(cmd.transaction_number.clone()),
        })
    }

    async fn merge_into(
        &self,
        mut subscription: Subscription,
        terms: RequestTerms,
    ) -> Result<SubmitPaymentRequestResult, SubscriptionError> {
        subscription.merge_resubmission(
            terms.plan_type,
            terms.payment_reference,
            terms.amount,
            terms.transaction_number,
            self.clock.now(),
        )?;

        self.repository
            .update(&subscription)
            .await
            .map_err(record_failure(subscription.id))?;

        info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            plan_type = %subscription.plan_type,
            "payment request merged into pending subscription"
        );

        Ok(SubmitPaymentRequestResult {
            subscription,
            merged: true,
        })
    }
}
