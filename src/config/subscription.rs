//! Subscription engine configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Policy knobs of the subscription engine
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    /// Currency applied when a request omits one
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Prefix of generated payment references (`PRED-3F2A9C01B7DE`)
    #[serde(default = "default_reference_prefix")]
    pub payment_reference_prefix: String,

    /// Max records read per reconcile scan
    #[serde(default = "default_reconcile_batch_limit")]
    pub reconcile_batch_limit: u32,
}

impl SubscriptionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let currency = &self.default_currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency(currency.clone()));
        }

        let prefix = &self.payment_reference_prefix;
        if prefix.is_empty()
            || prefix.len() > 8
            || !prefix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            return Err(ValidationError::InvalidReferencePrefix(prefix.clone()));
        }

        if self.reconcile_batch_limit == 0 || self.reconcile_batch_limit > 10_000 {
            return Err(ValidationError::InvalidBatchLimit);
        }
        Ok(())
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            payment_reference_prefix: default_reference_prefix(),
            reconcile_batch_limit: default_reconcile_batch_limit(),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_reference_prefix() -> String {
    "PRED".to_string()
}

fn default_reconcile_batch_limit() -> u32 {
    500
}
