//! Subscription aggregate entity.
//!
//! A Subscription is one premium-entitlement request and, once approved, the
//! grant itself. A user accumulates many of them over time.
//!
//! # Design Decisions
//!
//! - **One pending per user**: the request path merges into the outstanding
//!   PENDING record instead of creating a second one
//! - **Sticky proof of payment**: a re-submission never blanks out an already
//!   supplied transaction number
//! - **Calendar periods**: `end_date` comes from `PlanType::end_date_from`
//! - **Time is injected**: every mutation takes `now` so callers own the clock

use crate::domain::foundation::{
    DomainError, ErrorCode, StateMachine, SubscriptionId, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

use super::{Money, PaymentReference, PlanType, SubscriptionStatus, TransactionNumber};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Subscription aggregate.
///
/// # Invariants
///
/// - `start_date` and `end_date` are set together, only on approval,
///   and `end_date = plan_type.end_date_from(start_date)`
/// - `verified_by` / `verified_at` are set only by a verification decision
/// - `updated_at` moves on every mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub status: SubscriptionStatus,
    pub plan_type: PlanType,
    pub payment_reference: PaymentReference,
    pub transaction_number: Option<TransactionNumber>,
    pub amount: Money,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub verified_by: Option<UserId>,
    pub verified_at: Option<Timestamp>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub cancelled_at: Option<Timestamp>,
}

impl Subscription {
    /// Create a new PENDING payment request.
    pub fn request(
        id: SubscriptionId,
        user_id: UserId,
        plan_type: PlanType,
        payment_reference: PaymentReference,
        amount: Money,
        transaction_number: Option<TransactionNumber>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            status: SubscriptionStatus::Pending,
            plan_type,
            payment_reference,
            transaction_number,
            amount,
            start_date: None,
            end_date: None,
            verified_by: None,
            verified_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        }
    }

    /// Fold a re-submitted request into this pending record.
    ///
    /// Terms are overwritten; the transaction number only when a new one is given.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the record is no longer pending.
    pub fn merge_resubmission(
        &mut self,
        plan_type: PlanType,
        payment_reference: PaymentReference,
        amount: Money,
        transaction_number: Option<TransactionNumber>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        if !self.is_pending() {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot merge a new request into a {} subscription",
                    self.status
                ),
            ));
        }

        self.plan_type = plan_type;
        self.payment_reference = payment_reference;
        self.amount = amount;
        if let Some(number) = transaction_number {
            self.transaction_number = Some(number);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Attach proof of payment. Status is not checked here.
    pub fn record_transaction_number(&mut self, number: TransactionNumber, now: Timestamp) {
        self.transaction_number = Some(number);
        self.updated_at = now;
    }

    /// Approve the payment and open the premium period at `now`.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` if the record is not pending
    /// - `InternalError` if the period end is not representable
    pub fn approve(
        &mut self,
        verified_by: UserId,
        notes: Option<String>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let end_date = self.plan_type.end_date_from(now).ok_or_else(|| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Period end overflows for plan {}", self.plan_type),
            )
        })?;

        self.transition_to(SubscriptionStatus::Active)?;
        self.start_date = Some(now);
        self.end_date = Some(end_date);
        self.record_decision(verified_by, notes, now);
        Ok(())
    }

    /// Reject the payment proof. Payment terms are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the record is not pending.
    pub fn reject(
        &mut self,
        verified_by: UserId,
        notes: Option<String>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Rejected)?;
        self.record_decision(verified_by, notes, now);
        Ok(())
    }

    /// Force the record closed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if already cancelled.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Cancelled)?;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Persistable form of a lapsed grant.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` unless ACTIVE with `end_date` at or
    /// before `now`.
    pub fn mark_expired(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if self.is_active_at(now) {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Subscription period has not ended",
            ));
        }
        self.transition_to(SubscriptionStatus::Expired)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == SubscriptionStatus::Pending
    }

    /// Pending with proof attached, i.e. a verifier can act on it.
    pub fn is_ready_for_verification(&self) -> bool {
        self.is_pending() && self.transaction_number.is_some()
    }

    /// ACTIVE and `end_date` strictly after `now`.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active
            && self.end_date.map_or(false, |end| end.is_after(&now))
    }

    /// Status as seen at `now`: an ACTIVE record past its end reads as EXPIRED.
    pub fn effective_status(&self, now: Timestamp) -> SubscriptionStatus {
        match self.status {
            SubscriptionStatus::Active if !self.is_active_at(now) => SubscriptionStatus::Expired,
            status => status,
        }
    }

    /// Whole days left in the premium period, rounded up.
    ///
    /// Returns 0 when not ACTIVE, when no end date is set, or once expired.
    pub fn days_remaining(&self, now: Timestamp) -> u32 {
        if self.status != SubscriptionStatus::Active {
            return 0;
        }
        let Some(end) = self.end_date else {
            return 0;
        };

        let millis = end.duration_since(&now).num_milliseconds();
        if millis <= 0 {
            return 0;
        }
        ((millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY) as u32
    }

    /// Whole days between start and end (0 if not yet approved).
    pub fn duration_in_days(&self) -> i64 {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => end.duration_since(&start).num_days(),
            _ => 0,
        }
    }

    fn record_decision(&mut self, verified_by: UserId, notes: Option<String>, now: Timestamp) {
        self.verified_by = Some(verified_by);
        self.verified_at = Some(now);
        self.notes = notes.filter(|n| !n.trim().is_empty());
        self.updated_at = now;
    }

    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {} to {}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
