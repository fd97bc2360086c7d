//! In-memory verifier directory.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::VerifierDirectory;

/// Fixed set of users allowed to verify payments.
#[derive(Default)]
pub struct InMemoryVerifierDirectory {
    verifiers: RwLock<HashSet<UserId>>,
}

impl InMemoryVerifierDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verifiers<I>(verifiers: I) -> Self
    where
        I: IntoIterator<Item = UserId>,
    {
        Self {
            verifiers: RwLock::new(verifiers.into_iter().collect()),
        }
    }

    pub fn grant(&self, user_id: UserId) {
        if let Ok(mut verifiers) = self.verifiers.write() {
            verifiers.insert(user_id);
        }
    }
}

#[async_trait]
impl VerifierDirectory for InMemoryVerifierDirectory {
    async fn is_verifier(&self, user_id: &UserId) -> Result<bool, DomainError> {
        self.verifiers
            .read()
            .map(|v| v.contains(user_id))
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "Verifier directory lock poisoned"))
    }
}
