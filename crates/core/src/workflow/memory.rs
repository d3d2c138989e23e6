//! In-memory implementations of the workflow ports.
//!
//! Used by tests and local runs without a database. Each expense lives in its
//! own map entry; [`ExpenseStore::apply_decision`] mutates it under the entry's
//! write lock, which serializes decisions per expense while leaving other
//! expenses free.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use claimflow_shared::types::{CompanyId, ExpenseApprovalId, ExpenseId, UserId};

use crate::workflow::directory::{Company, User, check_manager_assignment};
use crate::workflow::error::WorkflowError;
use crate::workflow::expense::{DecisionOutcome, Expense};
use crate::workflow::ports::{Directory, ExpenseScope, ExpenseStore, RuleStore};
use crate::workflow::rule::ApprovalRule;
use crate::workflow::types::Decision;

/// Directory, rule store and expense store backed by concurrent maps.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    companies: DashMap<CompanyId, Company>,
    users: DashMap<UserId, User>,
    rules: DashMap<CompanyId, Vec<ApprovalRule>>,
    expenses: DashMap<ExpenseId, Expense>,
    approval_index: DashMap<ExpenseApprovalId, ExpenseId>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a company.
    pub fn insert_company(&self, company: Company) {
        self.companies.insert(company.id, company);
    }

    /// Adds or replaces a user.
    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    fn company_users(&self, company_id: CompanyId) -> Vec<User> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| u.company_id == company_id)
            .map(|u| u.value().clone())
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        users
    }
}

#[async_trait]
impl Directory for InMemoryStore {
    async fn get_company(&self, company_id: CompanyId) -> Result<Option<Company>, WorkflowError> {
        Ok(self.companies.get(&company_id).map(|c| c.value().clone()))
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, WorkflowError> {
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }

    async fn get_manager_of(&self, user_id: UserId) -> Result<Option<User>, WorkflowError> {
        let Some((company_id, Some(manager_id))) = self
            .users
            .get(&user_id)
            .map(|u| (u.company_id, u.manager_id))
        else {
            return Ok(None);
        };

        Ok(self
            .users
            .get(&manager_id)
            .filter(|m| m.company_id == company_id)
            .map(|m| m.value().clone()))
    }

    async fn list_direct_reports(&self, manager_id: UserId) -> Result<Vec<User>, WorkflowError> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.manager_id == Some(manager_id))
            .map(|u| u.value().clone())
            .collect())
    }

    async fn list_company_users(&self, company_id: CompanyId) -> Result<Vec<User>, WorkflowError> {
        Ok(self.company_users(company_id))
    }

    async fn list_approval_eligible_users(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<User>, WorkflowError> {
        Ok(self
            .company_users(company_id)
            .into_iter()
            .filter(|u| u.role.is_approval_eligible())
            .collect())
    }

    async fn assign_manager(
        &self,
        company_id: CompanyId,
        user_id: UserId,
        manager_id: Option<UserId>,
    ) -> Result<User, WorkflowError> {
        // The company entry's write lock guards the whole manager tree
        let _company = self
            .companies
            .get_mut(&company_id)
            .ok_or(WorkflowError::not_found("company"))?;

        check_manager_assignment(&self.company_users(company_id), user_id, manager_id)?;

        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or(WorkflowError::not_found("user"))?;
        user.manager_id = manager_id;
        Ok(user.value().clone())
    }
}

#[async_trait]
impl RuleStore for InMemoryStore {
    async fn list_rules(&self, company_id: CompanyId) -> Result<Vec<ApprovalRule>, WorkflowError> {
        let mut rules = self
            .rules
            .get(&company_id)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        rules.sort_by_key(|r| (r.created_at, r.id));
        Ok(rules)
    }

    async fn insert_rule(&self, rule: &ApprovalRule) -> Result<(), WorkflowError> {
        self.rules
            .entry(rule.company_id)
            .or_default()
            .push(rule.clone());
        Ok(())
    }
}

#[async_trait]
impl ExpenseStore for InMemoryStore {
    async fn insert_expense(&self, expense: &Expense) -> Result<(), WorkflowError> {
        if self.expenses.contains_key(&expense.id) {
            return Err(WorkflowError::Persistence(format!(
                "expense {} already exists",
                expense.id
            )));
        }
        for approval in &expense.approvals {
            self.approval_index.insert(approval.id, expense.id);
        }
        self.expenses.insert(expense.id, expense.clone());
        Ok(())
    }

    async fn find_expense(&self, expense_id: ExpenseId) -> Result<Option<Expense>, WorkflowError> {
        Ok(self.expenses.get(&expense_id).map(|e| e.value().clone()))
    }

    async fn find_by_approval(
        &self,
        approval_id: ExpenseApprovalId,
    ) -> Result<Option<Expense>, WorkflowError> {
        let Some(expense_id) = self.approval_index.get(&approval_id).map(|e| *e.value()) else {
            return Ok(None);
        };
        self.find_expense(expense_id).await
    }

    async fn list_expenses(&self, scope: &ExpenseScope) -> Result<Vec<Expense>, WorkflowError> {
        let mut expenses: Vec<Expense> = self
            .expenses
            .iter()
            .filter(|e| match scope {
                ExpenseScope::Company(company_id) => e.company_id == *company_id,
                ExpenseScope::Employees(ids) => ids.contains(&e.employee_id),
                ExpenseScope::Approver(user_id) => e.has_approver(*user_id),
            })
            .map(|e| e.value().clone())
            .collect();
        expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(expenses)
    }

    async fn apply_decision(
        &self,
        expense_id: ExpenseId,
        approval_id: ExpenseApprovalId,
        approver_id: UserId,
        decision: Decision,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let mut expense = self
            .expenses
            .get_mut(&expense_id)
            .ok_or(WorkflowError::not_found("expense"))?;
        expense.decide(approval_id, approver_id, decision, comments, now)
    }
}
