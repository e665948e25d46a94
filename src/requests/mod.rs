pub mod chama;
pub mod contribution;
pub mod loan;
pub mod meeting;
pub mod register;
pub mod user;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Trims a free-text field and drops it when nothing is left.
pub fn clean_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Money amounts are stored as `NUMERIC(14,2)`.
pub fn is_whole_cents(amount: Decimal) -> bool {
    amount.normalize().scale() <= 2
}
