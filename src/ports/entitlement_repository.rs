//! Entitlement repository port.
//!
//! Stores the user's premium flag and expiry, which live on the user record
//! owned by the account system. Implementations write only those two fields.

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::subscription::UserEntitlement;
use async_trait::async_trait;

/// Repository port for the user entitlement view.
#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// Current entitlement; `None` if the user is unknown to the store.
    async fn get(&self, user_id: &UserId) -> Result<Option<UserEntitlement>, DomainError>;

    /// Write `is_premium` and `subscription_expiry` for the user.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the user record doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn write(&self, entitlement: &UserEntitlement) -> Result<(), DomainError>;

    /// One page of users currently flagged premium, ascending by user id in
    /// byte order, starting after `after`, at most `limit`.
    async fn find_premium(
        &self,
        after: Option<&UserId>,
        limit: u32,
    ) -> Result<Vec<UserEntitlement>, DomainError>;
}
