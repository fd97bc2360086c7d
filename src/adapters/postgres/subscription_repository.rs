//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Provides persistent storage for Subscription records using PostgreSQL.
//! The one-pending-per-user rule is enforced by the partial unique index
//! `subscriptions_one_pending_per_user`.

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{
    Currency, Money, PaymentReference, PlanType, Subscription, SubscriptionStatus,
    TransactionNumber,
};
use crate::ports::SubscriptionRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const PENDING_PER_USER_CONSTRAINT: &str = "subscriptions_one_pending_per_user";

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, status, plan_type, payment_reference, transaction_number,
           amount_cents, currency, start_date, end_date, verified_by, verified_at,
           notes, created_at, updated_at, cancelled_at
    FROM subscriptions
"#;

/// PostgreSQL implementation of the SubscriptionRepository port.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    /// Creates a new PostgresSubscriptionRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    status: String,
    plan_type: String,
    payment_reference: String,
    transaction_number: Option<String>,
    amount_cents: i64,
    currency: String,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    verified_by: Option<String>,
    verified_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let currency = Currency::new(row.currency).map_err(corrupt_column("currency"))?;
        let amount = Money::new(row.amount_cents, currency).map_err(corrupt_column("amount"))?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(corrupt_column("user_id"))?,
            status: parse_status(&row.status)?,
            plan_type: parse_plan(&row.plan_type)?,
            payment_reference: PaymentReference::new(row.payment_reference)
                .map_err(corrupt_column("payment_reference"))?,
            transaction_number: row
                .transaction_number
                .map(TransactionNumber::new)
                .transpose()
                .map_err(corrupt_column("transaction_number"))?,
            amount,
            start_date: row.start_date.map(Timestamp::from_datetime),
            end_date: row.end_date.map(Timestamp::from_datetime),
            verified_by: row
                .verified_by
                .map(UserId::new)
                .transpose()
                .map_err(corrupt_column("verified_by"))?,
            verified_at: row.verified_at.map(Timestamp::from_datetime),
            notes: row.notes,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
        })
    }
}

fn corrupt_column<E: std::fmt::Display>(column: &'static str) -> impl Fn(E) -> DomainError {
    move |e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid {}: {}", column, e))
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    s.parse().map_err(|e: String| DomainError::new(ErrorCode::DatabaseError, e))
}

fn parse_plan(s: &str) -> Result<PlanType, DomainError> {
    s.parse().map_err(corrupt_column("plan_type"))
}

fn is_pending_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint() == Some(PENDING_PER_USER_CONSTRAINT),
        _ => false,
    }
}

fn pending_conflict(user_id: &UserId) -> DomainError {
    DomainError::new(
        ErrorCode::PendingSubscriptionExists,
        format!("User {} already has a pending subscription", user_id),
    )
    .with_detail("user_id", user_id.as_str())
}

fn as_datetime(ts: Option<Timestamp>) -> Option<DateTime<Utc>> {
    ts.map(|t| *t.as_datetime())
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, status, plan_type, payment_reference, transaction_number,
                amount_cents, currency, start_date, end_date, verified_by, verified_at,
                notes, created_at, updated_at, cancelled_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_str())
        .bind(subscription.status.as_str())
        .bind(subscription.plan_type.as_str())
        .bind(subscription.payment_reference.as_str())
        .bind(subscription.transaction_number.as_ref().map(|t| t.as_str()))
        .bind(subscription.amount.amount_cents)
        .bind(subscription.amount.currency.as_str())
        .bind(as_datetime(subscription.start_date))
        .bind(as_datetime(subscription.end_date))
        .bind(subscription.verified_by.as_ref().map(|u| u.as_str()))
        .bind(as_datetime(subscription.verified_at))
        .bind(&subscription.notes)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .bind(as_datetime(subscription.cancelled_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_pending_conflict(&e) {
                return pending_conflict(&subscription.user_id);
            }
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to save subscription: {}", e),
            )
        })?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $2,
                plan_type = $3,
                payment_reference = $4,
                transaction_number = $5,
                amount_cents = $6,
                currency = $7,
                start_date = $8,
                end_date = $9,
                verified_by = $10,
                verified_at = $11,
                notes = $12,
                updated_at = $13,
                cancelled_at = $14
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.status.as_str())
        .bind(subscription.plan_type.as_str())
        .bind(subscription.payment_reference.as_str())
        .bind(subscription.transaction_number.as_ref().map(|t| t.as_str()))
        .bind(subscription.amount.amount_cents)
        .bind(subscription.amount.currency.as_str())
        .bind(as_datetime(subscription.start_date))
        .bind(as_datetime(subscription.end_date))
        .bind(subscription.verified_by.as_ref().map(|u| u.as_str()))
        .bind(as_datetime(subscription.verified_at))
        .bind(&subscription.notes)
        .bind(subscription.updated_at.as_datetime())
        .bind(as_datetime(subscription.cancelled_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_pending_conflict(&e) {
                return pending_conflict(&subscription.user_id);
            }
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update subscription: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription not found: {}", subscription.id),
            ));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to find subscription: {}", e),
                    )
                })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_pending_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 AND status = 'pending' ORDER BY created_at DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find pending subscription: {}", e),
            )
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_user_and_status(
        &self,
        user_id: &UserId,
        status: SubscriptionStatus,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 AND status = $2 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find subscriptions by status: {}", e),
            )
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find subscription history: {}", e),
            )
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn find_pending_for_verification(&self) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE status = 'pending' AND transaction_number IS NOT NULL
            ORDER BY transaction_number COLLATE "C" ASC, created_at ASC
            "#,
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load verification queue: {}", e),
            )
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn find_by_status(
        &self,
        status: SubscriptionStatus,
        after: Option<SubscriptionId>,
        limit: u32,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE status = $1 AND ($2::uuid IS NULL OR id > $2)
            ORDER BY id ASC
            LIMIT $3
            "#,
            SELECT_COLUMNS
        ))
        .bind(status.as_str())
        .bind(after.map(|id| *id.as_uuid()))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to scan subscriptions: {}", e),
            )
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}
