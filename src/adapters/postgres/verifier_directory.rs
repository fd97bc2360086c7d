//! PostgreSQL implementation of VerifierDirectory.
//!
//! Verifiers are users flagged `is_expert` on the `users` table.

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::VerifierDirectory;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresVerifierDirectory {
    pool: PgPool,
}

impl PostgresVerifierDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerifierDirectory for PostgresVerifierDirectory {
    async fn is_verifier(&self, user_id: &UserId) -> Result<bool, DomainError> {
        let flag: Option<bool> = sqlx::query_scalar("SELECT is_expert FROM users WHERE id = $1")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to look up verifier: {}", e),
                )
            })?;

        Ok(flag.unwrap_or(false))
    }
}
