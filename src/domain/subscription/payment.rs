//! Payment value objects carried by a subscription request.
//!
//! Money is kept in integer minor units (cents), never floats.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::foundation::ValidationError;

/// Three-letter upper-case currency code (e.g. `USD`, `NGN`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Validates and normalizes a currency code to upper case.
    pub fn new(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into().trim().to_uppercase();
        if code.is_empty() {
            return Err(ValidationError::empty_field("currency"));
        }
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                format!("expected a three-letter code, got '{}'", code),
            ));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// Monetary terms of a request: positive amount in minor units plus currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount_cents: i64,
    pub currency: Currency,
}

impl Money {
    /// Creates money terms, rejecting zero and negative amounts.
    pub fn new(amount_cents: i64, currency: Currency) -> Result<Self, ValidationError> {
        if amount_cents <= 0 {
            return Err(ValidationError::not_positive("amount", amount_cents));
        }
        Ok(Self {
            amount_cents,
            currency,
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02} {}",
            self.amount_cents / 100,
            self.amount_cents % 100,
            self.currency
        )
    }
}

/// Correlation token a user quotes when paying out-of-band.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentReference(String);

impl PaymentReference {
    pub fn new(reference: impl Into<String>) -> Result<Self, ValidationError> {
        let reference = reference.into().trim().to_string();
        if reference.is_empty() {
            return Err(ValidationError::empty_field("payment_reference"));
        }
        Ok(Self(reference))
    }

    /// Generates a fresh reference such as `PRED-3F2A9C01B7DE`.
    pub fn generate(prefix: &str) -> Self {
        let token = Uuid::new_v4().simple().to_string().to_uppercase();
        Self(format!("{}-{}", prefix, &token[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PaymentReference {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PaymentReference> for String {
    fn from(reference: PaymentReference) -> Self {
        reference.0
    }
}

/// Proof-of-payment string supplied by the user (bank/mobile-money receipt).
///
/// Never empty: an absent transaction number is `Option::None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionNumber(String);

impl TransactionNumber {
    pub fn new(number: impl Into<String>) -> Result<Self, ValidationError> {
        let number = number.into().trim().to_string();
        if number.is_empty() {
            return Err(ValidationError::empty_field("transaction_number"));
        }
        Ok(Self(number))
    }

    /// Treats missing, empty and blank input alike as "not supplied".
    pub fn from_optional(number: Option<String>) -> Option<Self> {
        number.and_then(|n| Self::new(n).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TransactionNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TransactionNumber> for String {
    fn from(number: TransactionNumber) -> Self {
        number.0
    }
}
