//! HTTP handlers for subscription and verification endpoints.
//!
//! These handlers connect Axum routes to the application layer handlers and
//! enforce who may call what: owners act on their own requests, verifiers
//! decide payments.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Json, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::warn;

use crate::application::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, GetPendingSubscriptionHandler,
    GetPendingSubscriptionQuery, GetSubscriptionHandler, GetSubscriptionHistoryHandler,
    GetSubscriptionHistoryQuery, GetSubscriptionQuery, ListPendingForVerificationHandler,
    ListPendingForVerificationQuery, ReconcileEntitlementsCommand, ReconcileEntitlementsHandler,
    ResolveActiveSubscriptionHandler, ResolveActiveSubscriptionQuery, SubmitPaymentRequestCommand,
    SubmitPaymentRequestHandler, SubmitTransactionNumberCommand, SubmitTransactionNumberHandler,
    VerifyPaymentCommand, VerifyPaymentHandler,
};
use crate::config::SubscriptionConfig;
use crate::domain::foundation::{SubscriptionId, UserId};
use crate::domain::subscription::{Subscription, SubscriptionError};
use crate::ports::{Clock, EntitlementRepository, SubscriptionRepository, VerifierDirectory};

use super::dto::{
    ActiveSubscriptionResponse, EntitlementResponse, ErrorResponse, HealthResponse,
    ReconcileResponse, SubmitPaymentRequest, SubmitPaymentResponse,
    SubmitTransactionNumberRequest, SubscriptionChangeResponse, SubscriptionHistoryResponse,
    SubscriptionResponse, VerificationDecisionRequest, VerificationQueueResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the subscription routes.
///
/// Cloned per request; every dependency is Arc-wrapped.
#[derive(Clone)]
pub struct SubscriptionAppState {
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub entitlements: Arc<dyn EntitlementRepository>,
    pub verifiers: Arc<dyn VerifierDirectory>,
    pub clock: Arc<dyn Clock>,
    pub settings: SubscriptionConfig,
}

impl SubscriptionAppState {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        entitlements: Arc<dyn EntitlementRepository>,
        verifiers: Arc<dyn VerifierDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscriptions,
            entitlements,
            verifiers,
            clock,
            settings: SubscriptionConfig::default(),
        }
    }

    pub fn with_settings(mut self, settings: SubscriptionConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn submit_payment_handler(&self) -> SubmitPaymentRequestHandler {
        SubmitPaymentRequestHandler::new(self.subscriptions.clone(), self.clock.clone())
            .with_reference_prefix(self.settings.payment_reference_prefix.clone())
    }

    pub fn submit_transaction_number_handler(&self) -> SubmitTransactionNumberHandler {
        SubmitTransactionNumberHandler::new(self.subscriptions.clone(), self.clock.clone())
    }

    pub fn verify_payment_handler(&self) -> VerifyPaymentHandler {
        VerifyPaymentHandler::new(
            self.subscriptions.clone(),
            self.entitlements.clone(),
            self.clock.clone(),
        )
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(
            self.subscriptions.clone(),
            self.entitlements.clone(),
            self.clock.clone(),
        )
    }

    pub fn reconcile_handler(&self) -> ReconcileEntitlementsHandler {
        ReconcileEntitlementsHandler::new(
            self.subscriptions.clone(),
            self.entitlements.clone(),
            self.clock.clone(),
        )
        .with_batch_limit(self.settings.reconcile_batch_limit)
    }

    pub fn resolve_active_handler(&self) -> ResolveActiveSubscriptionHandler {
        ResolveActiveSubscriptionHandler::new(
            self.subscriptions.clone(),
            self.entitlements.clone(),
            self.clock.clone(),
        )
    }

    pub fn get_subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(self.subscriptions.clone())
    }

    pub fn history_handler(&self) -> GetSubscriptionHistoryHandler {
        GetSubscriptionHistoryHandler::new(self.subscriptions.clone())
    }

    pub fn pending_handler(&self) -> GetPendingSubscriptionHandler {
        GetPendingSubscriptionHandler::new(self.subscriptions.clone())
    }

    pub fn verification_queue_handler(&self) -> ListPendingForVerificationHandler {
        ListPendingForVerificationHandler::new(self.subscriptions.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context (would come from auth middleware in production)
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from the `X-User-Id` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s.trim()).ok())
            .ok_or(AuthenticationRequired)?;

        Ok(AuthenticatedUser { user_id })
    }
}

async fn is_verifier(
    state: &SubscriptionAppState,
    user: &AuthenticatedUser,
) -> Result<bool, SubscriptionApiError> {
    Ok(state
        .verifiers
        .is_verifier(&user.user_id)
        .await
        .map_err(SubscriptionError::from)?)
}

async fn require_verifier(
    state: &SubscriptionAppState,
    user: &AuthenticatedUser,
) -> Result<(), SubscriptionApiError> {
    if is_verifier(state, user).await? {
        return Ok(());
    }
    warn!(user_id = %user.user_id, "verification endpoint called without verifier privilege");
    Err(SubscriptionError::forbidden("Verifier privilege is required").into())
}

fn parse_subscription_id(raw: &str) -> Result<SubscriptionId, SubscriptionApiError> {
    raw.parse().map_err(|_| {
        SubscriptionError::invalid_input("subscription_id", "Invalid subscription ID format").into()
    })
}

fn ensure_owner(
    subscription: &Subscription,
    user: &AuthenticatedUser,
) -> Result<(), SubscriptionApiError> {
    if subscription.user_id == user.user_id {
        return Ok(());
    }
    warn!(
        subscription_id = %subscription.id,
        user_id = %user.user_id,
        "caller does not own subscription"
    );
    Err(SubscriptionError::forbidden("Subscription belongs to another user").into())
}

// ════════════════════════════════════════════════════════════════════════════════
// User Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/subscriptions - Submit or re-submit a payment request
pub async fn submit_payment(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
    Json(request): Json<SubmitPaymentRequest>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let cmd = SubmitPaymentRequestCommand {
        user_id: user.user_id,
        plan_type: request.plan_type,
        amount_cents: request.amount_cents,
        currency: request
            .currency
            .unwrap_or_else(|| state.settings.default_currency.clone()),
        payment_reference: request.payment_reference,
        transaction_number: request.transaction_number,
    };

    let result = state.submit_payment_handler().handle(cmd).await?;

    let status = if result.merged {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let response = SubmitPaymentResponse {
        subscription: SubscriptionResponse::at(&result.subscription, state.clock.now()),
        merged: result.merged,
    };
    Ok((status, Json(response)))
}

/// PUT /api/subscriptions/:id/transaction-number - Attach proof of payment
///
/// Only the owner may call this, and only while the request is pending.
pub async fn submit_transaction_number(
    State(state): State<SubscriptionAppState>,
    Path(id): Path<String>,
    user: AuthenticatedUser,
    Json(request): Json<SubmitTransactionNumberRequest>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let subscription_id = parse_subscription_id(&id)?;

    let existing = state
        .get_subscription_handler()
        .handle(GetSubscriptionQuery { subscription_id })
        .await?;
    ensure_owner(&existing, &user)?;
    if !existing.is_pending() {
        return Err(SubscriptionError::already_decided(existing.id, existing.status).into());
    }

    let updated = state
        .submit_transaction_number_handler()
        .handle(SubmitTransactionNumberCommand {
            subscription_id,
            transaction_number: request.transaction_number,
        })
        .await?;

    Ok(Json(SubscriptionResponse::at(&updated, state.clock.now())))
}

/// GET /api/subscriptions - Caller's subscription history and pending request
pub async fn list_subscriptions(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let history = state
        .history_handler()
        .handle(GetSubscriptionHistoryQuery {
            user_id: user.user_id.clone(),
        })
        .await?;
    let pending = state
        .pending_handler()
        .handle(GetPendingSubscriptionQuery {
            user_id: user.user_id,
        })
        .await?;

    let now = state.clock.now();
    Ok(Json(SubscriptionHistoryResponse {
        subscriptions: history
            .iter()
            .map(|s| SubscriptionResponse::at(s, now))
            .collect(),
        pending: pending.as_ref().map(|s| SubscriptionResponse::at(s, now)),
    }))
}

/// GET /api/subscriptions/active - Caller's live grant and entitlement
pub async fn get_active_subscription(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let result = state
        .resolve_active_handler()
        .handle(ResolveActiveSubscriptionQuery {
            user_id: user.user_id,
        })
        .await?;

    let now = state.clock.now();
    Ok(Json(ActiveSubscriptionResponse {
        subscription: result
            .active
            .as_ref()
            .map(|s| SubscriptionResponse::at(s, now)),
        days_remaining: result.days_remaining,
        entitlement: result
            .entitlement
            .as_ref()
            .map(|e| EntitlementResponse::at(e, now)),
    }))
}

/// GET /api/subscriptions/:id - One subscription (owner or verifier)
pub async fn get_subscription(
    State(state): State<SubscriptionAppState>,
    Path(id): Path<String>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let subscription_id = parse_subscription_id(&id)?;

    let subscription = state
        .get_subscription_handler()
        .handle(GetSubscriptionQuery { subscription_id })
        .await?;
    if subscription.user_id != user.user_id && !is_verifier(&state, &user).await? {
        return Err(SubscriptionError::forbidden("Subscription belongs to another user").into());
    }

    Ok(Json(SubscriptionResponse::at(&subscription, state.clock.now())))
}

// ════════════════════════════════════════════════════════════════════════════════
// Verifier Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/verification/queue - Pending payments with proof attached
pub async fn verification_queue(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    require_verifier(&state, &user).await?;

    let queue = state
        .verification_queue_handler()
        .handle(ListPendingForVerificationQuery)
        .await?;

    let now = state.clock.now();
    Ok(Json(VerificationQueueResponse {
        count: queue.len(),
        pending: queue
            .iter()
            .map(|s| SubscriptionResponse::at(s, now))
            .collect(),
    }))
}

/// POST /api/verification/:id/decision - Approve or reject a payment
pub async fn decide_payment(
    State(state): State<SubscriptionAppState>,
    Path(id): Path<String>,
    user: AuthenticatedUser,
    Json(request): Json<VerificationDecisionRequest>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    require_verifier(&state, &user).await?;
    let subscription_id = parse_subscription_id(&id)?;

    let result = state
        .verify_payment_handler()
        .handle(VerifyPaymentCommand {
            subscription_id,
            verified_by: user.user_id,
            approved: request.approved,
            notes: request.notes,
        })
        .await?;

    let now = state.clock.now();
    Ok(Json(SubscriptionChangeResponse {
        subscription: SubscriptionResponse::at(&result.subscription, now),
        entitlement: result
            .entitlement
            .as_ref()
            .map(|e| EntitlementResponse::at(e, now)),
    }))
}

/// POST /api/verification/:id/cancel - Force a subscription closed
pub async fn cancel_subscription(
    State(state): State<SubscriptionAppState>,
    Path(id): Path<String>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    require_verifier(&state, &user).await?;
    let subscription_id = parse_subscription_id(&id)?;

    let result = state
        .cancel_subscription_handler()
        .handle(CancelSubscriptionCommand { subscription_id })
        .await?;

    let now = state.clock.now();
    Ok(Json(SubscriptionChangeResponse {
        subscription: SubscriptionResponse::at(&result.subscription, now),
        entitlement: result
            .entitlement
            .as_ref()
            .map(|e| EntitlementResponse::at(e, now)),
    }))
}

/// POST /api/verification/reconcile - Repair entitlements from subscriptions
pub async fn reconcile_entitlements(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    require_verifier(&state, &user).await?;

    let report = state
        .reconcile_handler()
        .handle(ReconcileEntitlementsCommand)
        .await?;

    Ok(Json(ReconcileResponse::from(report)))
}

/// GET /api/health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts engine errors to HTTP responses.
#[derive(Debug)]
pub struct SubscriptionApiError(SubscriptionError);

impl From<SubscriptionError> for SubscriptionApiError {
    fn from(err: SubscriptionError) -> Self {
        Self(err)
    }
}

impl SubscriptionApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            SubscriptionError::NotFound(_) => (StatusCode::NOT_FOUND, "SUBSCRIPTION_NOT_FOUND"),
            SubscriptionError::InvalidInput { .. } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_FAILED")
            }
            SubscriptionError::AlreadyDecided { .. } => (StatusCode::CONFLICT, "ALREADY_DECIDED"),
            SubscriptionError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            SubscriptionError::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
            }
            SubscriptionError::InconsistentState { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INCONSISTENT_STATE")
            }
        }
    }
}

impl IntoResponse for SubscriptionApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = self.status_and_code();
        let message = self.0.to_string();
        let body = match &self.0 {
            SubscriptionError::InvalidInput { field, .. } => ErrorResponse::with_details(
                error_code,
                message,
                serde_json::json!({ "field": field }),
            ),
            _ => ErrorResponse::new(error_code, message),
        };
        (status, Json(body)).into_response()
    }
}
