//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `Clock` - Current time
//! - `SubscriptionRepository` - Subscription records
//! - `EntitlementRepository` - User premium flag/expiry
//! - `VerifierDirectory` - Who may verify payments

mod clock;
mod entitlement_repository;
mod subscription_repository;
mod verifier_directory;

pub use clock::Clock;
pub use entitlement_repository::EntitlementRepository;
pub use subscription_repository::SubscriptionRepository;
pub use verifier_directory::VerifierDirectory;
