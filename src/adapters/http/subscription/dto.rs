//! HTTP DTOs (Data Transfer Objects) for subscription endpoints.
//!
//! These types define the JSON request/response structure for the subscription
//! and verification API. Timestamps are RFC 3339 strings; amounts are minor units.

use serde::{Deserialize, Serialize};

use crate::application::ReconcileReport;
use crate::domain::foundation::Timestamp;
use crate::domain::subscription::{PlanType, Subscription, SubscriptionStatus, UserEntitlement};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to submit (or re-submit) a payment for a plan.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitPaymentRequest {
    pub plan_type: PlanType,
    /// Amount in minor units (cents).
    pub amount_cents: i64,
    /// Three-letter code; the configured default when omitted.
    #[serde(default)]
    pub currency: Option<String>,
    /// Generated when omitted.
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub transaction_number: Option<String>,
}

/// Request to attach proof of payment.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitTransactionNumberRequest {
    pub transaction_number: String,
}

/// A verifier's decision on a pending payment.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationDecisionRequest {
    pub approved: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Subscription as seen by API clients at request time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub user_id: String,
    /// Status at request time; ACTIVE past its end date reads as `expired`.
    pub status: SubscriptionStatus,
    pub plan_type: PlanType,
    pub plan_name: String,
    pub payment_reference: String,
    pub transaction_number: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub days_remaining: u32,
    pub verified_by: Option<String>,
    pub verified_at: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub cancelled_at: Option<String>,
}

impl SubscriptionResponse {
    pub fn at(subscription: &Subscription, now: Timestamp) -> Self {
        Self {
            id: subscription.id.to_string(),
            user_id: subscription.user_id.to_string(),
            status: subscription.effective_status(now),
            plan_type: subscription.plan_type,
            plan_name: subscription.plan_type.display_name().to_string(),
            payment_reference: subscription.payment_reference.to_string(),
            transaction_number: subscription
                .transaction_number
                .as_ref()
                .map(|t| t.to_string()),
            amount_cents: subscription.amount.amount_cents,
            currency: subscription.amount.currency.to_string(),
            start_date: subscription.start_date.map(|t| t.to_string()),
            end_date: subscription.end_date.map(|t| t.to_string()),
            days_remaining: subscription.days_remaining(now),
            verified_by: subscription.verified_by.as_ref().map(|u| u.to_string()),
            verified_at: subscription.verified_at.map(|t| t.to_string()),
            notes: subscription.notes.clone(),
            created_at: subscription.created_at.to_string(),
            updated_at: subscription.updated_at.to_string(),
            cancelled_at: subscription.cancelled_at.map(|t| t.to_string()),
        }
    }
}

/// Response to a payment submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitPaymentResponse {
    pub subscription: SubscriptionResponse,
    /// True when an outstanding request was updated instead of created.
    pub merged: bool,
}

/// The user's premium flag and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementResponse {
    pub user_id: String,
    pub is_premium: bool,
    pub subscription_expiry: Option<String>,
    pub has_active_premium: bool,
}

impl EntitlementResponse {
    pub fn at(entitlement: &UserEntitlement, now: Timestamp) -> Self {
        Self {
            user_id: entitlement.user_id.to_string(),
            is_premium: entitlement.is_premium,
            subscription_expiry: entitlement.subscription_expiry.map(|t| t.to_string()),
            has_active_premium: entitlement.has_active_premium(now),
        }
    }
}

/// Current premium standing of the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSubscriptionResponse {
    pub subscription: Option<SubscriptionResponse>,
    pub days_remaining: u32,
    pub entitlement: Option<EntitlementResponse>,
}

/// The caller's subscriptions, newest first, plus the outstanding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionHistoryResponse {
    pub subscriptions: Vec<SubscriptionResponse>,
    pub pending: Option<SubscriptionResponse>,
}

/// Verifier work queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationQueueResponse {
    pub pending: Vec<SubscriptionResponse>,
    pub count: usize,
}

/// Outcome of a decision or cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionChangeResponse {
    pub subscription: SubscriptionResponse,
    pub entitlement: Option<EntitlementResponse>,
}

/// Outcome counts of a reconcile pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileResponse {
    pub examined: u32,
    pub granted: u32,
    pub revoked: u32,
    pub expired: u32,
    pub failed: u32,
}

impl From<ReconcileReport> for ReconcileResponse {
    fn from(report: ReconcileReport) -> Self {
        Self {
            examined: report.examined,
            granted: report.granted,
            revoked: report.revoked,
            expired: report.expired,
            failed: report.failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SubscriptionId, UserId};
    use crate::domain::subscription::{Currency, Money, PaymentReference, TransactionNumber};

    fn approved() -> Subscription {
        let t0 = Timestamp::from_ymd(2024, 1, 31).unwrap();
        let mut sub = Subscription::request(
            SubscriptionId::new(),
            UserId::new("alice").unwrap(),
            PlanType::Monthly,
            PaymentReference::new("PRED-DTO").unwrap(),
            Money::new(1250, Currency::new("usd").unwrap()).unwrap(),
            Some(TransactionNumber::new("TX-9").unwrap()),
            t0,
        );
        sub.approve(UserId::new("admin").unwrap(), None, t0).unwrap();
        sub
    }

    #[test]
    fn submit_request_defaults_optional_fields() {
        let json = r#"{"plan_type": "quarterly", "amount_cents": 2500}"#;
        let request: SubmitPaymentRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.plan_type, PlanType::Quarterly);
        assert!(request.currency.is_none());
        assert!(request.payment_reference.is_none());
        assert!(request.transaction_number.is_none());
    }

    #[test]
    fn unknown_plan_is_rejected_by_deserializer() {
        let json = r#"{"plan_type": "weekly", "amount_cents": 2500}"#;
        assert!(serde_json::from_str::<SubmitPaymentRequest>(json).is_err());
    }

    #[test]
    fn subscription_response_reports_effective_status() {
        let sub = approved();
        let active = SubscriptionResponse::at(&sub, sub.start_date.unwrap());
        assert_eq!(active.status, SubscriptionStatus::Active);
        assert_eq!(active.plan_name, "Monthly Plan");
        assert_eq!(active.currency, "USD");
        assert_eq!(active.days_remaining, 29);

        let lapsed = SubscriptionResponse::at(&sub, sub.end_date.unwrap().add_days(1));
        assert_eq!(lapsed.status, SubscriptionStatus::Expired);
        assert_eq!(lapsed.days_remaining, 0);
    }

    #[test]
    fn subscription_response_serializes_snake_case_enums() {
        let sub = approved();
        let json = serde_json::to_value(SubscriptionResponse::at(&sub, sub.start_date.unwrap()))
            .unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["plan_type"], "monthly");
        assert_eq!(json["amount_cents"], 1250);
    }

    #[test]
    fn error_response_omits_empty_details() {
        let json = serde_json::to_value(ErrorResponse::new("NOT_FOUND", "missing")).unwrap();
        assert!(json.get("details").is_none());

        let with = ErrorResponse::with_details(
            "VALIDATION_FAILED",
            "bad",
            serde_json::json!({"field": "amount"}),
        );
        assert_eq!(with.details.unwrap()["field"], "amount");
    }
}
