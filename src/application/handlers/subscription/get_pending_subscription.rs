//! GetPendingSubscriptionHandler - Query handler for the user's outstanding request.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::subscription::{Subscription, SubscriptionError};
use crate::ports::SubscriptionRepository;

use super::store_failure;

#[derive(Debug, Clone)]
pub struct GetPendingSubscriptionQuery {
    pub user_id: UserId,
}

pub struct GetPendingSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl GetPendingSubscriptionHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        query: GetPendingSubscriptionQuery,
    ) -> Result<Option<Subscription>, SubscriptionError> {
        self.repository
            .find_pending_by_user(&query.user_id)
            .await
            .map_err(store_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::domain::foundation::{SubscriptionId, Timestamp};
    use crate::domain::subscription::{Currency, Money, PaymentReference, PlanType};

    #[tokio::test]
    async fn returns_pending_request_only() {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let alice = UserId::new("alice").unwrap();
        let handler = GetPendingSubscriptionHandler::new(repo.clone());

        let none = handler
            .handle(GetPendingSubscriptionQuery {
                user_id: alice.clone(),
            })
            .await
            .unwrap();
        assert!(none.is_none());

        let sub = Subscription::request(
            SubscriptionId::new(),
            alice.clone(),
            PlanType::Quarterly,
            PaymentReference::new("PRED-P").unwrap(),
            Money::new(2700, Currency::new("USD").unwrap()).unwrap(),
            None,
            Timestamp::from_ymd(2024, 1, 1).unwrap(),
        );
        repo.save(&sub).await.unwrap();

        let found = handler
            .handle(GetPendingSubscriptionQuery { user_id: alice })
            .await
            .unwrap();
        assert_eq!(found.map(|s| s.id), Some(sub.id));
    }
}
