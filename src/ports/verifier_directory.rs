//! Verifier directory port.
//!
//! Answers whether a user may approve or reject payments (admins/experts).

use crate::domain::foundation::{DomainError, UserId};
use async_trait::async_trait;

#[async_trait]
pub trait VerifierDirectory: Send + Sync {
    /// True if the user holds the verifier privilege.
    async fn is_verifier(&self, user_id: &UserId) -> Result<bool, DomainError>;
}
