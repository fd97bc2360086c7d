//! Subscription status state machine.
//!
//! ```text
//! PENDING ──approve──▶ ACTIVE ──end_date passes──▶ EXPIRED
//!    │
//!    └────reject─────▶ REJECTED
//!
//! any non-cancelled state ──external──▶ CANCELLED
//! ```

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Status of a subscription record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Payment submitted, awaiting a verifier's decision.
    Pending,

    /// Approved; premium access until `end_date`.
    Active,

    /// Active period has ended.
    Expired,

    /// Forced closed by an operator.
    Cancelled,

    /// Verifier refused the payment proof.
    Rejected,
}

impl SubscriptionStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [SubscriptionStatus; 5] = [
        SubscriptionStatus::Pending,
        SubscriptionStatus::Active,
        SubscriptionStatus::Expired,
        SubscriptionStatus::Cancelled,
        SubscriptionStatus::Rejected,
    ];

    /// Only PENDING records may receive an approve/reject decision.
    pub fn accepts_verification(&self) -> bool {
        matches!(self, SubscriptionStatus::Pending)
    }

    /// Stable lower-case name, used for storage and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SubscriptionStatus::Pending),
            "active" => Ok(SubscriptionStatus::Active),
            "expired" => Ok(SubscriptionStatus::Expired),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            "rejected" => Ok(SubscriptionStatus::Rejected),
            other => Err(format!("unknown subscription status: {}", other)),
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (Pending, Active)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Active, Expired)
                | (Active, Cancelled)
                | (Expired, Cancelled)
                | (Rejected, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Pending => vec![Active, Rejected, Cancelled],
            Active => vec![Expired, Cancelled],
            Expired => vec![Cancelled],
            Rejected => vec![Cancelled],
            Cancelled => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_be_approved_or_rejected() {
        let status = SubscriptionStatus::Pending;
        assert_eq!(
            status.transition_to(SubscriptionStatus::Active),
            Ok(SubscriptionStatus::Active)
        );
        assert_eq!(
            status.transition_to(SubscriptionStatus::Rejected),
            Ok(SubscriptionStatus::Rejected)
        );
    }

    #[test]
    fn active_cannot_be_rejected() {
        assert!(SubscriptionStatus::Active
            .transition_to(SubscriptionStatus::Rejected)
            .is_err());
    }

    #[test]
    fn active_cannot_be_reactivated() {
        assert!(!SubscriptionStatus::Active.can_transition_to(&SubscriptionStatus::Active));
    }

    #[test]
    fn rejected_cannot_become_active() {
        assert!(SubscriptionStatus::Rejected
            .transition_to(SubscriptionStatus::Active)
            .is_err());
    }

    #[test]
    fn every_state_but_cancelled_can_be_cancelled() {
        for status in SubscriptionStatus::ALL {
            let expected = status != SubscriptionStatus::Cancelled;
            assert_eq!(
                status.can_transition_to(&SubscriptionStatus::Cancelled),
                expected,
                "{:?} -> Cancelled",
                status
            );
        }
    }

    #[test]
    fn only_cancelled_is_terminal() {
        assert!(SubscriptionStatus::Cancelled.is_terminal());
        assert!(!SubscriptionStatus::Rejected.is_terminal());
    }

    #[test]
    fn only_pending_accepts_verification() {
        for status in SubscriptionStatus::ALL {
            assert_eq!(
                status.accepts_verification(),
                status == SubscriptionStatus::Pending
            );
        }
    }

    #[test]
    fn valid_transitions_are_consistent_with_can_transition_to() {
        for status in SubscriptionStatus::ALL {
            for target in status.valid_transitions() {
                assert!(status.can_transition_to(&target));
            }
        }
    }

    #[test]
    fn parses_storage_names_case_insensitively() {
        for status in SubscriptionStatus::ALL {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>(), Ok(status));
        }
        assert_eq!(
            "PENDING".parse::<SubscriptionStatus>(),
            Ok(SubscriptionStatus::Pending)
        );
        assert!("paused".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::Rejected).unwrap();
        assert_eq!(json, "\"rejected\"");
    }
}
