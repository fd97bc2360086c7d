//! In-memory subscription repository.
//!
//! Backs the engine in tests and single-process demos. The one-pending-per-user
//! rule is checked under the same lock as the insert, so two racing requests
//! cannot both create a PENDING record.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, UserId};
use crate::domain::subscription::{Subscription, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

/// In-memory implementation of the SubscriptionRepository port.
#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    records: Mutex<HashMap<SubscriptionId, Subscription>>,
    unavailable: AtomicBool,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `DatabaseError` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of all stored records, unordered.
    pub fn all(&self) -> Vec<Subscription> {
        self.records
            .lock()
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<SubscriptionId, Subscription>>, DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("Subscription store is unavailable"));
        }
        self.records
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "Subscription store lock poisoned"))
    }
}

fn other_pending_exists(
    records: &HashMap<SubscriptionId, Subscription>,
    subscription: &Subscription,
) -> bool {
    subscription.is_pending()
        && records.values().any(|existing| {
            existing.id != subscription.id
                && existing.user_id == subscription.user_id
                && existing.is_pending()
        })
}

fn pending_conflict(user_id: &UserId) -> DomainError {
    DomainError::new(
        ErrorCode::PendingSubscriptionExists,
        format!("User {} already has a pending subscription", user_id),
    )
    .with_detail("user_id", user_id.as_str())
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut records = self.records()?;
        if records.contains_key(&subscription.id) {
            return Err(DomainError::database(format!(
                "Subscription {} already exists",
                subscription.id
            )));
        }
        if other_pending_exists(&records, subscription) {
            return Err(pending_conflict(&subscription.user_id));
        }
        records.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut records = self.records()?;
        if !records.contains_key(&subscription.id) {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription not found: {}", subscription.id),
            ));
        }
        if other_pending_exists(&records, subscription) {
            return Err(pending_conflict(&subscription.user_id));
        }
        records.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.records()?.get(id).cloned())
    }

    async fn find_pending_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .records()?
            .values()
            .filter(|s| &s.user_id == user_id && s.is_pending())
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn find_by_user_and_status(
        &self,
        user_id: &UserId,
        status: SubscriptionStatus,
    ) -> Result<Vec<Subscription>, DomainError> {
        let mut found: Vec<Subscription> = self
            .records()?
            .values()
            .filter(|s| &s.user_id == user_id && s.status == status)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError> {
        let mut found: Vec<Subscription> = self
            .records()?
            .values()
            .filter(|s| &s.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_pending_for_verification(&self) -> Result<Vec<Subscription>, DomainError> {
        let mut queue: Vec<Subscription> = self
            .records()?
            .values()
            .filter(|s| s.is_ready_for_verification())
            .cloned()
            .collect();
        queue.sort_by(|a, b| {
            a.transaction_number
                .cmp(&b.transaction_number)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(queue)
    }

    async fn find_by_status(
        &self,
        status: SubscriptionStatus,
        after: Option<SubscriptionId>,
        limit: u32,
    ) -> Result<Vec<Subscription>, DomainError> {
        let mut found: Vec<Subscription> = self
            .records()?
            .values()
            .filter(|s| s.status == status)
            .filter(|s| after.map_or(true, |cursor| s.id > cursor))
            .cloned()
            .collect();
        found.sort_by_key(|s| s.id);
        found.truncate(limit as usize);
        Ok(found)
    }
}
