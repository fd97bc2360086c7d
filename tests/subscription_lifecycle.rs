//! Integration tests for the subscription lifecycle.
//!
//! These tests drive the application handlers end to end over the in-memory
//! adapters:
//! 1. Re-submissions collapse into one pending request
//! 2. Approval grants premium for the exact calendar period
//! 3. Rejection and re-verification leave state untouched
//! 4. Failed entitlement writes are repaired by reconciliation

use std::sync::Arc;

use proptest::prelude::*;

use pred_premium::adapters::{
    FixedClock, InMemoryEntitlementRepository, InMemorySubscriptionRepository,
};
use pred_premium::application::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, ListPendingForVerificationHandler,
    ListPendingForVerificationQuery, ReconcileEntitlementsCommand, ReconcileEntitlementsHandler,
    ResolveActiveSubscriptionHandler, ResolveActiveSubscriptionQuery, SubmitPaymentRequestCommand,
    SubmitPaymentRequestHandler, SubmitTransactionNumberCommand, SubmitTransactionNumberHandler,
    VerifyPaymentCommand, VerifyPaymentHandler,
};
use pred_premium::domain::foundation::{SubscriptionId, Timestamp, UserId};
use pred_premium::domain::subscription::{
    PlanType, Subscription, SubscriptionError, SubscriptionStatus,
};
use pred_premium::ports::{Clock, EntitlementRepository, SubscriptionRepository};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn ymd(year: i32, month: u32, day: u32) -> Timestamp {
    Timestamp::from_ymd(year, month, day).unwrap()
}

struct Engine {
    subs: Arc<InMemorySubscriptionRepository>,
    ents: Arc<InMemoryEntitlementRepository>,
    clock: Arc<FixedClock>,
}

impl Engine {
    fn new(users: &[&str]) -> Self {
        Self {
            subs: Arc::new(InMemorySubscriptionRepository::new()),
            ents: Arc::new(InMemoryEntitlementRepository::with_users(
                users.iter().map(|u| user(u)),
            )),
            clock: Arc::new(FixedClock::at(ymd(2024, 1, 31))),
        }
    }

    async fn submit(
        &self,
        owner: &str,
        plan: PlanType,
        amount_cents: i64,
        tx: Option<&str>,
    ) -> Result<Subscription, SubscriptionError> {
        SubmitPaymentRequestHandler::new(self.subs.clone(), self.clock.clone())
            .handle(SubmitPaymentRequestCommand {
                user_id: user(owner),
                plan_type: plan,
                amount_cents,
                currency: "USD".to_string(),
                payment_reference: None,
                transaction_number: tx.map(str::to_string),
            })
            .await
            .map(|r| r.subscription)
    }

    async fn decide(
        &self,
        id: SubscriptionId,
        approved: bool,
    ) -> Result<Subscription, SubscriptionError> {
        VerifyPaymentHandler::new(self.subs.clone(), self.ents.clone(), self.clock.clone())
            .handle(VerifyPaymentCommand {
                subscription_id: id,
                verified_by: user("admin"),
                approved,
                notes: None,
            })
            .await
            .map(|r| r.subscription)
    }

    async fn pending_count(&self, owner: &str) -> usize {
        self.subs
            .find_by_user_and_status(&user(owner), SubscriptionStatus::Pending)
            .await
            .unwrap()
            .len()
    }

    async fn resolve(&self, owner: &str) -> Option<Subscription> {
        ResolveActiveSubscriptionHandler::new(
            self.subs.clone(),
            self.ents.clone(),
            self.clock.clone(),
        )
        .handle(ResolveActiveSubscriptionQuery {
            user_id: user(owner),
        })
        .await
        .unwrap()
        .active
    }

    fn reconciler(&self) -> ReconcileEntitlementsHandler {
        ReconcileEntitlementsHandler::new(self.subs.clone(), self.ents.clone(), self.clock.clone())
    }
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn resubmission_merges_into_one_pending_request() {
    let engine = Engine::new(&["alice"]);

    let first = engine
        .submit("alice", PlanType::Monthly, 1000, None)
        .await
        .unwrap();
    engine.clock.advance_days(1);
    let second = engine
        .submit("alice", PlanType::Yearly, 9000, Some("TX-1"))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.plan_type, PlanType::Yearly);
    assert_eq!(second.amount.amount_cents, 9000);
    assert_eq!(engine.pending_count("alice").await, 1);
}

#[tokio::test]
async fn blank_resubmission_keeps_transaction_number() {
    let engine = Engine::new(&["alice"]);

    engine
        .submit("alice", PlanType::Monthly, 1000, Some("TX-KEEP"))
        .await
        .unwrap();
    let merged = engine
        .submit("alice", PlanType::Monthly, 1200, None)
        .await
        .unwrap();
    let blank = engine
        .submit("alice", PlanType::Monthly, 1200, Some("   "))
        .await
        .unwrap();

    assert_eq!(merged.transaction_number.unwrap().as_str(), "TX-KEEP");
    assert_eq!(blank.transaction_number.unwrap().as_str(), "TX-KEEP");
}

#[tokio::test]
async fn concurrent_submissions_leave_one_pending_request() {
    let engine = Engine::new(&["alice"]);

    let mut tasks = Vec::new();
    for i in 0..8 {
        let handler = SubmitPaymentRequestHandler::new(engine.subs.clone(), engine.clock.clone());
        tasks.push(tokio::spawn(async move {
            handler
                .handle(SubmitPaymentRequestCommand {
                    user_id: user("alice"),
                    plan_type: PlanType::Monthly,
                    amount_cents: 1000 + i,
                    currency: "USD".to_string(),
                    payment_reference: None,
                    transaction_number: Some(format!("TX-{}", i)),
                })
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(engine.pending_count("alice").await, 1);
    assert_eq!(engine.subs.len(), 1);
}

#[tokio::test]
async fn invalid_submission_writes_nothing() {
    let engine = Engine::new(&["alice"]);

    let err = engine
        .submit("alice", PlanType::Monthly, 0, None)
        .await
        .unwrap_err();

    assert!(matches!(err, SubscriptionError::InvalidInput { .. }));
    assert!(engine.subs.is_empty());
}

#[tokio::test]
async fn unavailable_store_is_retryable() {
    let engine = Engine::new(&["alice"]);
    engine.subs.set_unavailable(true);

    let err = engine
        .submit("alice", PlanType::Monthly, 1000, None)
        .await
        .unwrap_err();

    assert!(matches!(err, SubscriptionError::StoreUnavailable(_)));
    assert!(err.is_retryable());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_submission_sequence_leaves_exactly_one_pending(
        steps in prop::collection::vec(
            (0u8..3, 1i64..100_000, prop::option::of("[A-Z0-9]{1,8}")),
            1..12,
        )
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let engine = Engine::new(&["alice"]);
            let mut last_tx: Option<String> = None;

            for (plan, amount, tx) in steps {
                let plan = match plan {
                    0 => PlanType::Monthly,
                    1 => PlanType::Quarterly,
                    _ => PlanType::Yearly,
                };
                let sub = engine.submit("alice", plan, amount, tx.as_deref()).await.unwrap();
                if tx.is_some() {
                    last_tx = tx;
                }
                prop_assert_eq!(
                    sub.transaction_number.map(|t| t.as_str().to_string()),
                    last_tx.clone()
                );
                engine.clock.advance_days(1);
            }

            prop_assert_eq!(engine.pending_count("alice").await, 1);
            Ok::<(), TestCaseError>(())
        })?;
    }
}

// =============================================================================
// Verification
// =============================================================================

#[tokio::test]
async fn approval_grants_premium_until_end_date() {
    let engine = Engine::new(&["alice"]);
    let sub = engine
        .submit("alice", PlanType::Monthly, 1000, Some("TX-1"))
        .await
        .unwrap();

    let approved = engine.decide(sub.id, true).await.unwrap();

    assert_eq!(approved.status, SubscriptionStatus::Active);
    assert_eq!(approved.end_date, Some(ymd(2024, 2, 29)));

    let active = engine.resolve("alice").await.unwrap();
    assert_eq!(active.id, sub.id);

    let ent = engine.ents.get(&user("alice")).await.unwrap().unwrap();
    assert!(ent.is_premium);
    assert_eq!(ent.subscription_expiry, approved.end_date);
}

#[tokio::test]
async fn plan_periods_follow_the_calendar() {
    let cases = [
        (ymd(2024, 1, 31), PlanType::Monthly, ymd(2024, 2, 29)),
        (ymd(2023, 1, 31), PlanType::Monthly, ymd(2023, 2, 28)),
        (ymd(2024, 2, 29), PlanType::Yearly, ymd(2025, 2, 28)),
        (ymd(2024, 11, 30), PlanType::Quarterly, ymd(2025, 2, 28)),
    ];

    for (start, plan, expected_end) in cases {
        let engine = Engine::new(&["alice"]);
        engine.clock.set(start);
        let sub = engine
            .submit("alice", plan, 1000, Some("TX-1"))
            .await
            .unwrap();

        let approved = engine.decide(sub.id, true).await.unwrap();

        assert_eq!(approved.start_date, Some(start));
        assert_eq!(approved.end_date, Some(expected_end), "{} from {}", plan, start);
    }
}

#[tokio::test]
async fn rejection_keeps_terms_and_skips_entitlement() {
    let engine = Engine::new(&["alice"]);
    let sub = engine
        .submit("alice", PlanType::Quarterly, 2500, Some("TX-R"))
        .await
        .unwrap();

    let rejected = engine.decide(sub.id, false).await.unwrap();

    assert_eq!(rejected.status, SubscriptionStatus::Rejected);
    assert_eq!(rejected.transaction_number, sub.transaction_number);
    assert_eq!(rejected.amount, sub.amount);
    assert_eq!(engine.ents.write_count(), 0);
    assert!(engine.resolve("alice").await.is_none());
}

#[tokio::test]
async fn decided_subscription_cannot_be_verified_again() {
    let engine = Engine::new(&["alice"]);
    let sub = engine
        .submit("alice", PlanType::Monthly, 1000, Some("TX-1"))
        .await
        .unwrap();
    let approved = engine.decide(sub.id, true).await.unwrap();
    engine.clock.advance_days(5);

    let err = engine.decide(sub.id, true).await.unwrap_err();

    assert!(matches!(err, SubscriptionError::AlreadyDecided { .. }));
    let stored = engine.subs.find_by_id(&sub.id).await.unwrap().unwrap();
    assert_eq!(stored.end_date, approved.end_date);
    assert_eq!(engine.ents.write_count(), 1);
}

#[tokio::test]
async fn unknown_subscription_is_not_found() {
    let engine = Engine::new(&["alice"]);

    let err = engine.decide(SubscriptionId::new(), true).await.unwrap_err();

    assert!(matches!(err, SubscriptionError::NotFound(_)));
}

#[tokio::test]
async fn late_proof_enters_the_verification_queue() {
    let engine = Engine::new(&["alice"]);
    let sub = engine
        .submit("alice", PlanType::Monthly, 1000, None)
        .await
        .unwrap();
    let queue = ListPendingForVerificationHandler::new(engine.subs.clone());

    assert!(queue
        .handle(ListPendingForVerificationQuery)
        .await
        .unwrap()
        .is_empty());

    SubmitTransactionNumberHandler::new(engine.subs.clone(), engine.clock.clone())
        .handle(SubmitTransactionNumberCommand {
            subscription_id: sub.id,
            transaction_number: "TX-LATE".to_string(),
        })
        .await
        .unwrap();

    let pending = queue.handle(ListPendingForVerificationQuery).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, sub.id);
}

#[tokio::test]
async fn verification_queue_orders_by_transaction_then_age() {
    let engine = Engine::new(&["u1", "u2", "u3"]);
    let b = engine
        .submit("u1", PlanType::Monthly, 1000, Some("B"))
        .await
        .unwrap();
    engine.clock.advance_days(1);
    let a_old = engine
        .submit("u2", PlanType::Monthly, 1000, Some("A"))
        .await
        .unwrap();
    engine.clock.advance_days(1);
    let a_new = engine
        .submit("u3", PlanType::Monthly, 1000, Some("A"))
        .await
        .unwrap();

    let queue = ListPendingForVerificationHandler::new(engine.subs.clone())
        .handle(ListPendingForVerificationQuery)
        .await
        .unwrap();

    let ids: Vec<SubscriptionId> = queue.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![a_old.id, a_new.id, b.id]);
}

// =============================================================================
// Expiry, cancellation and repair
// =============================================================================

#[tokio::test]
async fn lapsed_grant_reads_as_zero_days() {
    let engine = Engine::new(&["alice"]);
    let sub = engine
        .submit("alice", PlanType::Monthly, 1000, Some("TX-1"))
        .await
        .unwrap();
    let approved = engine.decide(sub.id, true).await.unwrap();

    engine.clock.advance_days(45);

    assert_eq!(approved.days_remaining(engine.clock.now()), 0);
    assert!(engine.resolve("alice").await.is_none());
}

#[tokio::test]
async fn failed_entitlement_write_is_repaired_by_reconcile() {
    let engine = Engine::new(&["alice"]);
    let sub = engine
        .submit("alice", PlanType::Monthly, 1000, Some("TX-1"))
        .await
        .unwrap();
    engine.ents.set_fail_writes(true);

    let err = engine.decide(sub.id, true).await.unwrap_err();

    assert!(matches!(err, SubscriptionError::InconsistentState { .. }));
    assert!(!err.is_retryable());
    let stored = engine.subs.find_by_id(&sub.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Active);
    assert!(!engine.ents.get(&user("alice")).await.unwrap().unwrap().is_premium);

    engine.ents.set_fail_writes(false);
    let report = engine
        .reconciler()
        .handle(ReconcileEntitlementsCommand)
        .await
        .unwrap();

    assert_eq!(report.granted, 1);
    let ent = engine.ents.get(&user("alice")).await.unwrap().unwrap();
    assert!(ent.matches_grant(&stored));
}

#[tokio::test]
async fn reconcile_revokes_and_expires_lapsed_premium() {
    let engine = Engine::new(&["alice"]);
    let sub = engine
        .submit("alice", PlanType::Monthly, 1000, Some("TX-1"))
        .await
        .unwrap();
    engine.decide(sub.id, true).await.unwrap();
    engine.clock.advance_days(40);

    let report = engine
        .reconciler()
        .handle(ReconcileEntitlementsCommand)
        .await
        .unwrap();

    assert_eq!(report.revoked, 1);
    assert_eq!(report.expired, 1);
    let stored = engine.subs.find_by_id(&sub.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Expired);
    assert!(!engine.ents.get(&user("alice")).await.unwrap().unwrap().is_premium);
}

#[tokio::test]
async fn cancelling_the_live_grant_revokes_premium() {
    let engine = Engine::new(&["alice"]);
    let sub = engine
        .submit("alice", PlanType::Yearly, 9000, Some("TX-1"))
        .await
        .unwrap();
    engine.decide(sub.id, true).await.unwrap();

    let result = CancelSubscriptionHandler::new(
        engine.subs.clone(),
        engine.ents.clone(),
        engine.clock.clone(),
    )
    .handle(CancelSubscriptionCommand {
        subscription_id: sub.id,
    })
    .await
    .unwrap();

    assert_eq!(result.subscription.status, SubscriptionStatus::Cancelled);
    assert!(!result.entitlement.unwrap().is_premium);
    assert!(engine.resolve("alice").await.is_none());
}

#[tokio::test]
async fn new_request_allowed_after_decision() {
    let engine = Engine::new(&["alice"]);
    let first = engine
        .submit("alice", PlanType::Monthly, 1000, Some("TX-1"))
        .await
        .unwrap();
    engine.decide(first.id, false).await.unwrap();

    let second = engine
        .submit("alice", PlanType::Monthly, 1000, Some("TX-2"))
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(engine.pending_count("alice").await, 1);
}
