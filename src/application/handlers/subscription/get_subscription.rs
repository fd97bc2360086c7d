//! GetSubscriptionHandler - Query handler for a single subscription.

use std::sync::Arc;

use crate::domain::foundation::SubscriptionId;
use crate::domain::subscription::{Subscription, SubscriptionError};
use crate::ports::SubscriptionRepository;

use super::record_failure;

#[derive(Debug, Clone)]
pub struct GetSubscriptionQuery {
    pub subscription_id: SubscriptionId,
}

pub struct GetSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl GetSubscriptionHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: GetSubscriptionQuery) -> Result<Subscription, SubscriptionError> {
        self.repository
            .find_by_id(&query.subscription_id)
            .await
            .map_err(record_failure(query.subscription_id))?
            .ok_or_else(|| SubscriptionError::not_found(query.subscription_id))
    }
}
