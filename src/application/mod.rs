//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::subscription::{
    // Commands
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
    ReconcileEntitlementsCommand, ReconcileEntitlementsHandler, ReconcileReport,
    SubmitPaymentRequestCommand, SubmitPaymentRequestHandler, SubmitPaymentRequestResult,
    SubmitTransactionNumberCommand, SubmitTransactionNumberHandler,
    VerifyPaymentCommand, VerifyPaymentHandler, VerifyPaymentResult,
    // Queries
    GetPendingSubscriptionHandler, GetPendingSubscriptionQuery,
    GetSubscriptionHandler, GetSubscriptionQuery,
    GetSubscriptionHistoryHandler, GetSubscriptionHistoryQuery,
    ListPendingForVerificationHandler, ListPendingForVerificationQuery,
    ResolveActiveSubscriptionHandler, ResolveActiveSubscriptionQuery,
    ResolveActiveSubscriptionResult,
};
