//! Subscription repository port.
//!
//! Durable keyed storage for subscription records, queryable by user and status.
//!
//! # Design
//!
//! - **Per-record atomicity only**: no multi-record transactions are assumed
//! - **One pending per user**: `save` of a second PENDING record for a user
//!   should fail with `PendingSubscriptionExists` where the backend can enforce it
//! - **Never deletes**: records are retained for audit
//!
//! # Example
//!
//! ```ignore
//! async fn outstanding_request(
//!     repo: &dyn SubscriptionRepository,
//!     user_id: &UserId,
//! ) -> Result<Option<TransactionNumber>, DomainError> {
//!     Ok(repo
//!         .find_pending_by_user(user_id)
//!         .await?
//!         .and_then(|s| s.transaction_number))
//! }
//! ```

use crate::domain::foundation::{DomainError, SubscriptionId, UserId};
use crate::domain::subscription::{Subscription, SubscriptionStatus};
use async_trait::async_trait;

/// Repository port for Subscription persistence.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Insert a new subscription.
    ///
    /// # Errors
    ///
    /// - `PendingSubscriptionExists` if the record is PENDING and the user
    ///   already has a PENDING record
    /// - `DatabaseError` on persistence failure
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Overwrite an existing subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the record doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Find a subscription by its ID.
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// The user's PENDING subscription, newest first if several exist.
    async fn find_pending_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// All subscriptions of a user in the given status.
    async fn find_by_user_and_status(
        &self,
        user_id: &UserId,
        status: SubscriptionStatus,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// All subscriptions of a user, newest `created_at` first.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError>;

    /// PENDING subscriptions carrying a transaction number, ordered by
    /// transaction number then `created_at`, both ascending.
    async fn find_pending_for_verification(&self) -> Result<Vec<Subscription>, DomainError>;

    /// One page of subscriptions in `status`, ascending by id, starting after
    /// `after` (from the beginning when `None`), at most `limit`.
    ///
    /// A page shorter than `limit` is the last one.
    async fn find_by_status(
        &self,
        status: SubscriptionStatus,
        after: Option<SubscriptionId>,
        limit: u32,
    ) -> Result<Vec<Subscription>, DomainError>;
}
