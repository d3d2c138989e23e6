//! Collaborator contracts of the lifecycle controller.
//!
//! The database crate implements these on PostgreSQL; [`crate::workflow::memory`]
//! implements them in memory for tests and local runs. The currency converter
//! port lives in [`crate::currency`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use claimflow_shared::types::{CompanyId, ExpenseApprovalId, ExpenseId, UserId};

use crate::workflow::directory::{Company, User};
use crate::workflow::error::WorkflowError;
use crate::workflow::expense::{DecisionOutcome, Expense};
use crate::workflow::rule::ApprovalRule;
use crate::workflow::types::Decision;

/// Users, roles and the manager tree.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Looks up a company.
    async fn get_company(&self, company_id: CompanyId) -> Result<Option<Company>, WorkflowError>;

    /// Looks up a user.
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, WorkflowError>;

    /// Returns the user's manager, if they have one and it still exists.
    async fn get_manager_of(&self, user_id: UserId) -> Result<Option<User>, WorkflowError>;

    /// Users whose manager is `manager_id`.
    async fn list_direct_reports(&self, manager_id: UserId) -> Result<Vec<User>, WorkflowError>;

    /// All users of a company.
    async fn list_company_users(&self, company_id: CompanyId) -> Result<Vec<User>, WorkflowError>;

    /// Users of a company that may be configured as rule approvers.
    async fn list_approval_eligible_users(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<User>, WorkflowError>;

    /// Sets or clears the manager of a user in `company_id`.
    ///
    /// The company's manager tree is locked while
    /// [`check_manager_assignment`] runs and the new link is written, so two
    /// concurrent assignments can never close a cycle between them.
    ///
    /// [`check_manager_assignment`]: crate::workflow::directory::check_manager_assignment
    async fn assign_manager(
        &self,
        company_id: CompanyId,
        user_id: UserId,
        manager_id: Option<UserId>,
    ) -> Result<User, WorkflowError>;
}

/// Durable approval rules.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Rules of a company, oldest first, with their approvers.
    async fn list_rules(&self, company_id: CompanyId) -> Result<Vec<ApprovalRule>, WorkflowError>;

    /// Stores a rule together with its approvers.
    async fn insert_rule(&self, rule: &ApprovalRule) -> Result<(), WorkflowError>;
}

/// Which expenses a listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseScope {
    /// Every expense of the company.
    Company(CompanyId),
    /// Expenses submitted by any of these employees.
    Employees(Vec<UserId>),
    /// Expenses where this user holds at least one step.
    Approver(UserId),
}

/// Durable expenses and their approval ledgers.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Stores the expense and all of its steps atomically.
    async fn insert_expense(&self, expense: &Expense) -> Result<(), WorkflowError>;

    /// Loads an expense with its steps.
    async fn find_expense(&self, expense_id: ExpenseId) -> Result<Option<Expense>, WorkflowError>;

    /// Loads the expense owning a step.
    async fn find_by_approval(
        &self,
        approval_id: ExpenseApprovalId,
    ) -> Result<Option<Expense>, WorkflowError>;

    /// Lists expenses in scope, newest first.
    async fn list_expenses(&self, scope: &ExpenseScope) -> Result<Vec<Expense>, WorkflowError>;

    /// Runs [`Expense::decide`] on the current state of the expense while
    /// holding its lock, and persists the step and status together.
    async fn apply_decision(
        &self,
        expense_id: ExpenseId,
        approval_id: ExpenseApprovalId,
        approver_id: UserId,
        decision: Decision,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<DecisionOutcome, WorkflowError>;
}
