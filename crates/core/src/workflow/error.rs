//! Workflow error types for the expense approval lifecycle.
//!
//! Every failure the lifecycle controller can surface is one of these
//! variants; adapters map their own errors into `Persistence`.

use thiserror::Error;

use claimflow_shared::types::{ExpenseApprovalId, ExpenseId};

/// Errors that can occur during workflow operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Input failed validation; nothing was persisted.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The caller may not perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The entity does not exist or is not visible to the caller.
    #[error("{entity} not found")]
    NotFound {
        /// Kind of entity that was looked up.
        entity: &'static str,
    },

    /// The approval step has already been decided.
    #[error("Approval step {0} has already been decided")]
    AlreadyDecided(ExpenseApprovalId),

    /// The expense already reached a terminal status.
    #[error("Expense {0} is already finalized")]
    ExpenseFinalized(ExpenseId),

    /// The currency converter could not produce a rate.
    #[error("Currency conversion unavailable: {0}")]
    ConversionUnavailable(String),

    /// The persistence store failed; nothing was partially committed.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl WorkflowError {
    /// Shorthand for [`WorkflowError::NotFound`].
    #[must_use]
    pub const fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound { .. } => 404,
            Self::AlreadyDecided(_) | Self::ExpenseFinalized(_) => 409,
            Self::ConversionUnavailable(_) => 502,
            Self::Persistence(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyDecided(_) => "ALREADY_DECIDED",
            Self::ExpenseFinalized(_) => "EXPENSE_FINALIZED",
            Self::ConversionUnavailable(_) => "CONVERSION_UNAVAILABLE",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }
}
