//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `clock` - System and fixed clocks
//! - `memory` - In-memory stores for tests and local runs
//! - `postgres` - PostgreSQL-backed stores
//! - `http` - Axum REST API

pub mod clock;
pub mod http;
pub mod memory;
pub mod postgres;

pub use clock::{FixedClock, SystemClock};
pub use memory::{
    InMemoryEntitlementRepository, InMemorySubscriptionRepository, InMemoryVerifierDirectory,
};
pub use postgres::{
    PostgresEntitlementRepository, PostgresSubscriptionRepository, PostgresVerifierDirectory,
};
