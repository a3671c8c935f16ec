//! Domain error model.

use thiserror::Error;

use crate::money::Money;
use crate::quantity::Quantity;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error taxonomy.
///
/// Business-rule rejections carry the concrete numbers involved so callers
/// can render a precise message. Nothing partial is ever committed when an
/// error is returned; `ConcurrencyConflict` is the only variant worth
/// retrying.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced record does not exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// The operation is not valid for the record's current state
    /// (already cancelled, fiscal year closed, inactive article).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A value failed validation (e.g. malformed or empty input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The movement would take stock below zero under the active policy.
    #[error("insufficient stock: available {available}, required {required}")]
    InsufficientStock {
        available: Quantity,
        required: Quantity,
    },

    /// The member balance does not cover the sale total.
    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Money, required: Money },

    /// The unit of work could not be started in time. The caller may retry
    /// the whole operation from scratch.
    #[error("operation conflicted with a concurrent writer, please retry")]
    ConcurrencyConflict,

    /// The underlying store is unusable. Fatal for the current call.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::PersistenceFailure(msg.into())
    }

    /// Whether retrying the whole operation from scratch can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict)
    }
}
