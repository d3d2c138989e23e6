//! Expense approval workflow.
//!
//! This module implements the approval chain construction, the decision
//! evaluator and the lifecycle controller that ties them to storage.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (roles, statuses, approval types)
//! - `error` - Workflow-specific error types
//! - `directory` - Companies, users and the manager tree
//! - `rule` - Approval rules, validation and active rule selection
//! - `chain` - Approval chain construction
//! - `evaluator` - Aggregate status evaluation
//! - `expense` - The expense aggregate and its approval ledger
//! - `ports` - Collaborator traits implemented by storage adapters
//! - `lifecycle` - Submission and decision orchestration
//! - `memory` - In-memory port implementations

pub mod chain;
pub mod directory;
pub mod error;
pub mod evaluator;
pub mod expense;
pub mod lifecycle;
pub mod memory;
pub mod ports;
pub mod rule;
pub mod types;

#[cfg(test)]
mod chain_props;
#[cfg(test)]
mod evaluator_props;

pub use chain::{ChainBuilder, ChainStep};
pub use directory::{Company, User, check_manager_assignment, creates_manager_cycle};
pub use error::WorkflowError;
pub use evaluator::{DecisionEvaluator, Tally};
pub use expense::{DecisionOutcome, Expense, ExpenseApproval, NewExpense};
pub use lifecycle::{ExpenseLifecycle, PendingApproval};
pub use memory::InMemoryStore;
pub use ports::{Directory, ExpenseScope, ExpenseStore, RuleStore};
pub use rule::{ApprovalPolicy, ApprovalRule, NewApprovalRule, RuleApprover, select_active_rule};
pub use types::{ApprovalStatus, ApprovalType, Decision, ExpenseStatus, UserRole};
