//! SubmitTransactionNumberHandler - Command handler for attaching proof of payment.
//!
//! The engine does not check status or ownership here; the API layer decides
//! whether the caller may touch the record.

use std::sync::Arc;

use tracing::info;

use crate::domain::foundation::SubscriptionId;
use crate::domain::subscription::{Subscription, SubscriptionError, TransactionNumber};
use crate::ports::{Clock, SubscriptionRepository};

use super::record_failure;

/// Command to attach a transaction number to a subscription.
#[derive(Debug, Clone)]
pub struct SubmitTransactionNumberCommand {
    pub subscription_id: SubscriptionId,
    pub transaction_number: String,
}

pub struct SubmitTransactionNumberHandler {
    repository: Arc<dyn SubscriptionRepository>,
    clock: Arc<dyn Clock>,
}

impl SubmitTransactionNumberHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn handle(
        &self,
        cmd: SubmitTransactionNumberCommand,
    ) -> Result<Subscription, SubscriptionError> {
        let number = TransactionNumber::new(cmd.transaction_number)?;
        let on_error = record_failure(cmd.subscription_id);

        let mut subscription = self
            .repository
            .find_by_id(&cmd.subscription_id)
            .await
            .map_err(&on_error)?
            .ok_or_else(|| SubscriptionError::not_found(cmd.subscription_id))?;

        subscription.record_transaction_number(number, self.clock.now());
        self.repository
            .update(&subscription)
            .await
            .map_err(&on_error)?;

        info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            "transaction number submitted"
        );
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::FixedClock;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::domain::foundation::{Timestamp, UserId};
    use crate::domain::subscription::{Currency, Money, PaymentReference, PlanType};

    fn t0() -> Timestamp {
        Timestamp::from_ymd(2024, 5, 1).unwrap()
    }

    async fn setup() -> (
        Arc<InMemorySubscriptionRepository>,
        SubmitTransactionNumberHandler,
        Subscription,
    ) {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let sub = Subscription::request(
            SubscriptionId::new(),
            UserId::new("alice").unwrap(),
            PlanType::Quarterly,
            PaymentReference::new("PRED-1").unwrap(),
            Money::new(2500, Currency::new("USD").unwrap()).unwrap(),
            None,
            t0(),
        );
        repo.save(&sub).await.unwrap();
        let clock = Arc::new(FixedClock::at(t0().add_days(1)));
        let handler = SubmitTransactionNumberHandler::new(repo.clone(), clock);
        (repo, handler, sub)
    }

    #[tokio::test]
    async fn sets_transaction_number_and_bumps_updated_at() {
        let (repo, handler, sub) = setup().await;

        let updated = handler
            .handle(SubmitTransactionNumberCommand {
                subscription_id: sub.id,
                transaction_number: " TX-778 ".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(updated.transaction_number.unwrap().as_str(), "TX-778");
        assert_eq!(updated.updated_at, t0().add_days(1));
        let stored = repo.find_by_id(&sub.id).await.unwrap().unwrap();
        assert!(stored.is_ready_for_verification());
    }

    #[tokio::test]
    async fn blank_number_is_invalid_input() {
        let (_repo, handler, sub) = setup().await;

        let err = handler
            .handle(SubmitTransactionNumberCommand {
                subscription_id: sub.id,
                transaction_number: "  ".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubscriptionError::InvalidInput { ref field, .. } if field == "transaction_number"
        ));
    }

    #[tokio::test]
    async fn unknown_subscription_is_not_found() {
        let (_repo, handler, _sub) = setup().await;
        let missing = SubscriptionId::new();

        let err = handler
            .handle(SubmitTransactionNumberCommand {
                subscription_id: missing,
                transaction_number: "TX-1".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err, SubscriptionError::not_found(missing));
    }
}
