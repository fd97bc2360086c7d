//! GetSubscriptionHistoryHandler - Query handler for a user's subscriptions.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::subscription::{Subscription, SubscriptionError};
use crate::ports::SubscriptionRepository;

use super::store_failure;

#[derive(Debug, Clone)]
pub struct GetSubscriptionHistoryQuery {
    pub user_id: UserId,
}

/// Returns every subscription the user ever requested, newest first.
pub struct GetSubscriptionHistoryHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl GetSubscriptionHistoryHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionHistoryQuery,
    ) -> Result<Vec<Subscription>, SubscriptionError> {
        self.repository
            .find_by_user(&query.user_id)
            .await
            .map_err(store_failure)
    }
}
