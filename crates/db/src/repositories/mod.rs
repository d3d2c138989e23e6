//! Repository implementations of the workflow ports.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod approval_rule;
pub mod directory;
pub mod expense;
mod mapping;

pub use approval_rule::ApprovalRuleRepository;
pub use directory::DirectoryRepository;
pub use expense::ExpenseRepository;

use claimflow_core::workflow::WorkflowError;
use sea_orm::DbErr;

/// Wraps a database failure as a workflow persistence error.
pub(crate) fn db_err(err: DbErr) -> WorkflowError {
    WorkflowError::Persistence(err.to_string())
}
