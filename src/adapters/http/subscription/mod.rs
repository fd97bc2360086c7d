//! HTTP adapter for the subscription module.
//!
//! # Endpoints
//!
//! - `POST /api/subscriptions` - Submit or re-submit a payment request
//! - `GET /api/subscriptions` - Caller's history and pending request
//! - `GET /api/subscriptions/active` - Caller's live grant and entitlement
//! - `GET /api/subscriptions/{id}` - One subscription
//! - `PUT /api/subscriptions/{id}/transaction-number` - Attach proof of payment
//! - `GET /api/verification/queue` - Verifier work queue
//! - `POST /api/verification/{id}/decision` - Approve or reject
//! - `POST /api/verification/{id}/cancel` - Force-cancel
//! - `POST /api/verification/reconcile` - Repair entitlements

pub mod dto;
pub mod handlers;
pub mod routes;

// Re-export commonly used types
pub use handlers::SubscriptionAppState;
pub use routes::subscription_router;
