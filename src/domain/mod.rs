//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `subscription` - Premium subscription lifecycle and entitlement

pub mod foundation;
pub mod subscription;
