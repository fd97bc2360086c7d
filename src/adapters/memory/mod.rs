//! In-memory adapters.
//!
//! Thread-safe, non-persistent implementations of the storage ports for tests,
//! local development and demos.

mod entitlement_repository;
mod subscription_repository;
mod verifier_directory;

pub use entitlement_repository::InMemoryEntitlementRepository;
pub use subscription_repository::InMemorySubscriptionRepository;
pub use verifier_directory::InMemoryVerifierDirectory;
