//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresSubscriptionRepository` - Subscription records
//! - `PostgresEntitlementRepository` - Premium flag/expiry on `users`
//! - `PostgresVerifierDirectory` - Verifier privilege lookup

mod entitlement_repository;
mod subscription_repository;
mod verifier_directory;

pub use entitlement_repository::PostgresEntitlementRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use verifier_directory::PostgresVerifierDirectory;
