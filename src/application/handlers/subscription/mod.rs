//! Subscription handlers.
//!
//! The lifecycle engine: command and query handlers that move a subscription
//! from payment request through verification to an entitlement.
//!
//! ## Commands
//! - Submitting (or re-submitting) a payment request
//! - Attaching a transaction number
//! - Approving or rejecting a payment
//! - Cancelling a subscription
//! - Reconciling entitlements with active subscriptions
//!
//! ## Queries
//! - Resolve the active subscription
//! - Verification queue
//! - Single subscription, pending request, history

mod cancel_subscription;
mod get_pending_subscription;
mod get_subscription;
mod get_subscription_history;
mod list_pending_for_verification;
mod reconcile_entitlements;
mod resolve_active_subscription;
mod submit_payment_request;
mod submit_transaction_number;
mod verify_payment;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{Subscription, SubscriptionError, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use reconcile_entitlements::{
    ReconcileEntitlementsCommand, ReconcileEntitlementsHandler, ReconcileReport,
};
pub use submit_payment_request::{
    SubmitPaymentRequestCommand, SubmitPaymentRequestHandler, SubmitPaymentRequestResult,
};
pub use submit_transaction_number::{
    SubmitTransactionNumberCommand, SubmitTransactionNumberHandler,
};
pub use verify_payment::{VerifyPaymentCommand, VerifyPaymentHandler, VerifyPaymentResult};

// Queries
pub use get_pending_subscription::{GetPendingSubscriptionHandler, GetPendingSubscriptionQuery};
pub use get_subscription::{GetSubscriptionHandler, GetSubscriptionQuery};
pub use get_subscription_history::{GetSubscriptionHistoryHandler, GetSubscriptionHistoryQuery};
pub use list_pending_for_verification::{
    ListPendingForVerificationHandler, ListPendingForVerificationQuery,
};
pub use resolve_active_subscription::{
    ResolveActiveSubscriptionHandler, ResolveActiveSubscriptionQuery,
    ResolveActiveSubscriptionResult,
};

/// Maps a port failure that is not tied to a specific record.
fn store_failure(err: DomainError) -> SubscriptionError {
    tracing::error!(code = %err.code, error = %err.message, "subscription store call failed");
    SubscriptionError::from(err)
}

/// Maps a port failure for an operation on subscription `id`.
fn record_failure(id: SubscriptionId) -> impl Fn(DomainError) -> SubscriptionError {
    move |err| match err.code {
        ErrorCode::SubscriptionNotFound => SubscriptionError::not_found(id),
        _ => store_failure(err),
    }
}

/// The user's ACTIVE subscription with the latest `end_date` still after `now`.
async fn latest_active_grant(
    repository: &dyn SubscriptionRepository,
    user_id: &UserId,
    now: Timestamp,
) -> Result<Option<Subscription>, DomainError> {
    Ok(repository
        .find_by_user_and_status(user_id, SubscriptionStatus::Active)
        .await?
        .into_iter()
        .filter(|s| s.is_active_at(now))
        .max_by_key(|s| s.end_date))
}
