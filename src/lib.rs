//! pred-premium - Subscription lifecycle and payment verification engine.
//!
//! Users submit manual payment requests for a premium plan; verifiers
//! approve or reject them; approved subscriptions run for a calendar period
//! and drive the user's premium entitlement.
//!
//! # Layers
//!
//! - `domain` - Subscription aggregate, value objects and errors
//! - `ports` - Storage, clock and verifier interfaces
//! - `application` - Command and query handlers
//! - `adapters` - PostgreSQL, in-memory and HTTP implementations
//! - `config` - Environment-driven configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
