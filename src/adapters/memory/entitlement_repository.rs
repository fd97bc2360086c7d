//! In-memory entitlement repository.
//!
//! Mirrors the users table: a user must be registered before an entitlement
//! can be written, and only the premium flag and expiry are touched.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::domain::subscription::UserEntitlement;
use crate::ports::EntitlementRepository;

/// In-memory implementation of the EntitlementRepository port.
#[derive(Default)]
pub struct InMemoryEntitlementRepository {
    users: Mutex<HashMap<UserId, UserEntitlement>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryEntitlementRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository with the given users registered, none of them premium.
    pub fn with_users<I>(users: I) -> Self
    where
        I: IntoIterator<Item = UserId>,
    {
        let repo = Self::new();
        for user in users {
            repo.register_user(user);
        }
        repo
    }

    /// Register a user with no premium grant. Existing users are left alone.
    pub fn register_user(&self, user_id: UserId) {
        if let Ok(mut users) = self.users.lock() {
            users
                .entry(user_id.clone())
                .or_insert_with(|| UserEntitlement::none(user_id));
        }
    }

    /// Make `write` fail with `DatabaseError` until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn users(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<UserId, UserEntitlement>>, DomainError> {
        self.users
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "Entitlement store lock poisoned"))
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryEntitlementRepository {
    async fn get(&self, user_id: &UserId) -> Result<Option<UserEntitlement>, DomainError> {
        Ok(self.users()?.get(user_id).cloned())
    }

    async fn write(&self, entitlement: &UserEntitlement) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("Entitlement store rejected the write"));
        }

        let mut users = self.users()?;
        let slot = users.get_mut(&entitlement.user_id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::UserNotFound,
                format!("User not found: {}", entitlement.user_id),
            )
        })?;
        *slot = entitlement.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_premium(
        &self,
        after: Option<&UserId>,
        limit: u32,
    ) -> Result<Vec<UserEntitlement>, DomainError> {
        let mut premium: Vec<UserEntitlement> = self
            .users()?
            .values()
            .filter(|e| e.is_premium)
            .filter(|e| after.map_or(true, |cursor| e.user_id.as_str() > cursor.as_str()))
            .cloned()
            .collect();
        premium.sort_by(|a, b| a.user_id.as_str().cmp(b.user_id.as_str()));
        premium.truncate(limit as usize);
        Ok(premium)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    #[tokio::test]
    async fn registered_user_starts_without_premium() {
        let repo = InMemoryEntitlementRepository::with_users([alice()]);
        assert_eq!(
            repo.get(&alice()).await.unwrap(),
            Some(UserEntitlement::none(alice()))
        );
    }

    #[tokio::test]
    async fn write_to_unknown_user_is_user_not_found() {
        let repo = InMemoryEntitlementRepository::new();
        let expiry = Timestamp::from_ymd(2024, 2, 29).unwrap();
        let err = repo
            .write(&UserEntitlement::granted(alice(), expiry))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UserNotFound);
        assert_eq!(repo.write_count(), 0);
    }

    #[tokio::test]
    async fn write_then_find_premium() {
        let repo = InMemoryEntitlementRepository::with_users([alice()]);
        let expiry = Timestamp::from_ymd(2024, 2, 29).unwrap();
        repo.write(&UserEntitlement::granted(alice(), expiry))
            .await
            .unwrap();

        let premium = repo.find_premium(None, 10).await.unwrap();
        assert_eq!(premium.len(), 1);
        assert_eq!(premium[0].subscription_expiry, Some(expiry));
        assert_eq!(repo.write_count(), 1);
    }

    #[tokio::test]
    async fn find_premium_pages_in_byte_order() {
        let users = ["bob", "Zed", "alice"].map(|u| UserId::new(u).unwrap());
        let repo = InMemoryEntitlementRepository::with_users(users.clone());
        let expiry = Timestamp::from_ymd(2024, 2, 29).unwrap();
        for user in users {
            repo.write(&UserEntitlement::granted(user, expiry))
                .await
                .unwrap();
        }

        let first = repo.find_premium(None, 2).await.unwrap();
        let second = repo
            .find_premium(first.last().map(|e| &e.user_id), 2)
            .await
            .unwrap();

        let ids: Vec<&str> = first
            .iter()
            .chain(second.iter())
            .map(|e| e.user_id.as_str())
            .collect();
        assert_eq!(ids, vec!["Zed", "alice", "bob"]);
    }

    #[tokio::test]
    async fn failing_writes_leave_state_untouched() {
        let repo = InMemoryEntitlementRepository::with_users([alice()]);
        repo.set_fail_writes(true);
        let expiry = Timestamp::from_ymd(2024, 2, 29).unwrap();

        let err = repo
            .write(&UserEntitlement::granted(alice(), expiry))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!repo.get(&alice()).await.unwrap().unwrap().is_premium);
    }

    #[test]
    fn register_is_idempotent() {
        let repo = InMemoryEntitlementRepository::new();
        repo.register_user(alice());
        repo.register_user(alice());
        assert_eq!(repo.users.lock().unwrap().len(), 1);
    }
}
