//! Errors raised while constructing domain values.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A rejected domain value.
///
/// Only constructors return this; a `DailySeries` or `BranchId` that exists is valid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input that can never form a value, such as a non-finite sale amount.
    #[error("invalid value: {0}")]
    Validation(String),

    /// Input that breaks a structural rule, such as series dates out of order.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid branch id: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
