//! Subscription domain module.
//!
//! Premium subscription lifecycle: payment requests, verification decisions,
//! calendar periods and the entitlement they grant.
//!
//! # Module Structure
//!
//! - `aggregate` - Subscription aggregate entity
//! - `status` - SubscriptionStatus state machine
//! - `plan` - PlanType and calendar durations
//! - `payment` - Money, currency and payment proof value objects
//! - `entitlement` - User premium flag/expiry view
//! - `errors` - SubscriptionError taxonomy

mod aggregate;
mod entitlement;
mod errors;
mod payment;
mod plan;
mod status;

pub use aggregate::Subscription;
pub use entitlement::UserEntitlement;
pub use errors::SubscriptionError;
pub use payment::{Currency, Money, PaymentReference, TransactionNumber};
pub use plan::PlanType;
pub use status::SubscriptionStatus;
