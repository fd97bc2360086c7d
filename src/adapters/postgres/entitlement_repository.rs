//! PostgreSQL implementation of EntitlementRepository.
//!
//! The premium flag and expiry live on the `users` table, which is owned by
//! the account system. Only those two columns (and `updated_at`) are written.

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::subscription::UserEntitlement;
use crate::ports::EntitlementRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// PostgreSQL implementation of the EntitlementRepository port.
pub struct PostgresEntitlementRepository {
    pool: PgPool,
}

impl PostgresEntitlementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EntitlementRow {
    id: String,
    is_premium: bool,
    subscription_expiry: Option<DateTime<Utc>>,
}

impl TryFrom<EntitlementRow> for UserEntitlement {
    type Error = DomainError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        Ok(UserEntitlement {
            user_id: UserId::new(row.id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user id: {}", e))
            })?,
            is_premium: row.is_premium,
            subscription_expiry: row.subscription_expiry.map(Timestamp::from_datetime),
        })
    }
}

#[async_trait]
impl EntitlementRepository for PostgresEntitlementRepository {
    async fn get(&self, user_id: &UserId) -> Result<Option<UserEntitlement>, DomainError> {
        let row: Option<EntitlementRow> = sqlx::query_as(
            r#"
            SELECT id, is_premium, subscription_expiry
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to read entitlement: {}", e))
        })?;

        row.map(UserEntitlement::try_from).transpose()
    }

    async fn write(&self, entitlement: &UserEntitlement) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                is_premium = $2,
                subscription_expiry = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(entitlement.user_id.as_str())
        .bind(entitlement.is_premium)
        .bind(entitlement.subscription_expiry.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to write entitlement: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::UserNotFound,
                format!("User not found: {}", entitlement.user_id),
            ));
        }

        Ok(())
    }

    async fn find_premium(
        &self,
        after: Option<&UserId>,
        limit: u32,
    ) -> Result<Vec<UserEntitlement>, DomainError> {
        let rows: Vec<EntitlementRow> = sqlx::query_as(
            r#"
            SELECT id, is_premium, subscription_expiry
            FROM users
            WHERE is_premium = TRUE
              AND ($1::text IS NULL OR id COLLATE "C" > $1)
            ORDER BY id COLLATE "C" ASC
            LIMIT $2
            "#,
        )
        .bind(after.map(|id| id.as_str()))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to scan premium users: {}", e),
            )
        })?;

        rows.into_iter().map(UserEntitlement::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_converts_to_entitlement() {
        let expiry = Utc::now();
        let entitlement = UserEntitlement::try_from(EntitlementRow {
            id: "alice".to_string(),
            is_premium: true,
            subscription_expiry: Some(expiry),
        })
        .unwrap();

        assert!(entitlement.is_premium);
        assert_eq!(
            entitlement.subscription_expiry,
            Some(Timestamp::from_datetime(expiry))
        );
    }

    #[test]
    fn row_with_blank_id_is_rejected() {
        let result = UserEntitlement::try_from(EntitlementRow {
            id: "  ".to_string(),
            is_premium: false,
            subscription_expiry: None,
        });
        assert!(result.is_err());
    }
}
