//! Axum router configuration for subscription endpoints.
//!
//! This module defines the route structure for the subscription and
//! verification API and wires them to their corresponding handlers.

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    cancel_subscription, decide_payment, get_active_subscription, get_subscription, health,
    list_subscriptions, reconcile_entitlements, submit_payment, submit_transaction_number,
    verification_queue, SubscriptionAppState,
};

/// Routes for subscribers acting on their own requests.
///
/// # Routes
/// - `POST /` - Submit or re-submit a payment request
/// - `GET /` - History plus the outstanding request
/// - `GET /active` - Live grant and entitlement
/// - `GET /:id` - One subscription (owner or verifier)
/// - `PUT /:id/transaction-number` - Attach proof of payment
pub fn subscription_routes() -> Router<SubscriptionAppState> {
    Router::new()
        .route("/", post(submit_payment).get(list_subscriptions))
        .route("/active", get(get_active_subscription))
        .route("/:id", get(get_subscription))
        .route("/:id/transaction-number", put(submit_transaction_number))
}

/// Routes for verifiers (require verifier privilege).
///
/// # Routes
/// - `GET /queue` - Pending payments with proof attached
/// - `POST /reconcile` - Repair entitlements from subscription records
/// - `POST /:id/decision` - Approve or reject
/// - `POST /:id/cancel` - Force-cancel
pub fn verification_routes() -> Router<SubscriptionAppState> {
    Router::new()
        .route("/queue", get(verification_queue))
        .route("/reconcile", post(reconcile_entitlements))
        .route("/:id/decision", post(decide_payment))
        .route("/:id/cancel", post(cancel_subscription))
}

/// Create the complete subscription module router, mounted under `/api`.
///
/// # Example
///
/// ```ignore
/// let app = subscription_router().with_state(app_state);
/// ```
pub fn subscription_router() -> Router<SubscriptionAppState> {
    Router::new()
        .route("/api/health", get(health))
        .nest("/api/subscriptions", subscription_routes())
        .nest("/api/verification", verification_routes())
}
