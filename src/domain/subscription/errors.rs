//! Subscription-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | InvalidInput | 400 |
//! | AlreadyDecided | 409 |
//! | Forbidden | 403 |
//! | StoreUnavailable | 503 |
//! | InconsistentState | 500 |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, UserId, ValidationError};

use super::SubscriptionStatus;

/// Errors surfaced by the subscription lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// Subscription id is unknown.
    #[error("Subscription not found: {0}")]
    NotFound(SubscriptionId),

    /// Request failed validation. Nothing was written.
    #[error("Invalid input for '{field}': {message}")]
    InvalidInput { field: String, message: String },

    /// A verification decision was already applied to this subscription.
    #[error("Subscription {id} is already {status}; no further decision can be applied")]
    AlreadyDecided {
        id: SubscriptionId,
        status: SubscriptionStatus,
    },

    /// Caller is not allowed to perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Transient infrastructure failure.
    #[error("Subscription store unavailable: {0}")]
    StoreUnavailable(String),

    /// Subscription was activated but the entitlement write failed.
    #[error("Subscription {subscription_id} is active but entitlement for user {user_id} was not applied: {reason}")]
    InconsistentState {
        subscription_id: SubscriptionId,
        user_id: UserId,
        reason: String,
    },
}

impl SubscriptionError {
    pub fn not_found(id: SubscriptionId) -> Self {
        SubscriptionError::NotFound(id)
    }

    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        SubscriptionError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn already_decided(id: SubscriptionId, status: SubscriptionStatus) -> Self {
        SubscriptionError::AlreadyDecided { id, status }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        SubscriptionError::Forbidden(message.into())
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        SubscriptionError::StoreUnavailable(message.into())
    }

    pub fn inconsistent_state(
        subscription_id: SubscriptionId,
        user_id: UserId,
        reason: impl Into<String>,
    ) -> Self {
        SubscriptionError::InconsistentState {
            subscription_id,
            user_id,
            reason: reason.into(),
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::NotFound(_) => ErrorCode::SubscriptionNotFound,
            SubscriptionError::InvalidInput { .. } => ErrorCode::ValidationFailed,
            SubscriptionError::AlreadyDecided { .. } => ErrorCode::InvalidStateTransition,
            SubscriptionError::Forbidden(_) => ErrorCode::Forbidden,
            SubscriptionError::StoreUnavailable(_) => ErrorCode::DatabaseError,
            SubscriptionError::InconsistentState { .. } => ErrorCode::InconsistentState,
        }
    }

    /// Returns true if the caller may retry the same request.
    ///
    /// An inconsistent approval is not retried by the caller; the
    /// reconciliation pass repairs it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubscriptionError::StoreUnavailable(_))
    }
}

impl From<ValidationError> for SubscriptionError {
    fn from(err: ValidationError) -> Self {
        SubscriptionError::InvalidInput {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed | ErrorCode::InvalidStateTransition => {
                let field = err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "status".to_string());
                SubscriptionError::InvalidInput {
                    field,
                    message: err.message,
                }
            }
            ErrorCode::Unauthorized | ErrorCode::Forbidden => {
                SubscriptionError::Forbidden(err.message)
            }
            _ => SubscriptionError::StoreUnavailable(err.message),
        }
    }
}
