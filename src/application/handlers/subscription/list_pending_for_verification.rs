//! ListPendingForVerificationHandler - Query handler for the verifier work queue.

use std::sync::Arc;

use crate::domain::subscription::{Subscription, SubscriptionError};
use crate::ports::SubscriptionRepository;

use super::store_failure;

/// Query for the verification queue.
#[derive(Debug, Clone, Default)]
pub struct ListPendingForVerificationQuery;

/// Returns PENDING subscriptions that carry a transaction number, ordered by
/// transaction number and then by age.
pub struct ListPendingForVerificationHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl ListPendingForVerificationHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        _query: ListPendingForVerificationQuery,
    ) -> Result<Vec<Subscription>, SubscriptionError> {
        self.repository
            .find_pending_for_verification()
            .await
            .map_err(store_failure)
    }
}
