//! Expense lifecycle controller.
//!
//! Orchestrates submission (convert, select rule, build chain, persist) and
//! decision intake (authorize, then hand over to the store's serialized
//! decision operation). Everything that touches I/O goes through the ports.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use claimflow_shared::types::{
    ApprovalRuleId, CurrencyCode, ExpenseApprovalId, ExpenseId, UserId,
};

use crate::currency::{
    CONVERTED_DECIMAL_PLACES, ConversionError, CurrencyConverter, round_amount,
};
use crate::workflow::directory::User;
use crate::workflow::error::WorkflowError;
use crate::workflow::expense::{Expense, ExpenseApproval, NewExpense, check_amount_range};
use crate::workflow::ports::{Directory, ExpenseScope, ExpenseStore, RuleStore};
use crate::workflow::rule::{ApprovalRule, NewApprovalRule, select_active_rule};
use crate::workflow::types::{ApprovalStatus, Decision, ExpenseStatus, UserRole};

/// Default upper bound for one currency conversion.
pub const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(3);

/// A step waiting on the caller, with the expense it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingApproval {
    /// The pending step.
    pub approval: ExpenseApproval,
    /// The expense, including its full chain.
    pub expense: Expense,
}

/// The expense lifecycle controller.
#[derive(Clone)]
pub struct ExpenseLifecycle {
    directory: Arc<dyn Directory>,
    rules: Arc<dyn RuleStore>,
    expenses: Arc<dyn ExpenseStore>,
    converter: Arc<dyn CurrencyConverter>,
    conversion_timeout: Duration,
}

impl std::fmt::Debug for ExpenseLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpenseLifecycle")
            .field("conversion_timeout", &self.conversion_timeout)
            .finish_non_exhaustive()
    }
}

impl ExpenseLifecycle {
    /// Creates a controller over the given collaborators.
    #[must_use]
    pub fn new(
        directory: Arc<dyn Directory>,
        rules: Arc<dyn RuleStore>,
        expenses: Arc<dyn ExpenseStore>,
        converter: Arc<dyn CurrencyConverter>,
    ) -> Self {
        Self {
            directory,
            rules,
            expenses,
            converter,
            conversion_timeout: DEFAULT_CONVERSION_TIMEOUT,
        }
    }

    /// Overrides the conversion timeout.
    #[must_use]
    pub const fn with_conversion_timeout(mut self, timeout: Duration) -> Self {
        self.conversion_timeout = timeout;
        self
    }

    async fn user(&self, user_id: UserId) -> Result<User, WorkflowError> {
        self.directory
            .get_user(user_id)
            .await?
            .ok_or(WorkflowError::not_found("user"))
    }

    async fn admin(&self, user_id: UserId) -> Result<User, WorkflowError> {
        let user = self.user(user_id).await?;
        match user.role {
            UserRole::Admin => Ok(user),
            UserRole::Employee
            | UserRole::Manager
            | UserRole::Director
            | UserRole::Cfo
            | UserRole::Finance => Err(WorkflowError::Forbidden(
                "only admins may perform this operation".into(),
            )),
        }
    }

    /// Runs the converter, turning an overrun of the conversion timeout into
    /// `ConversionError::Timeout`.
    async fn convert_with_timeout(
        &self,
        amount: Decimal,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<Decimal, ConversionError> {
        tokio::time::timeout(self.conversion_timeout, self.converter.convert(amount, from, to))
            .await
            .unwrap_or_else(|_| {
                let timeout_ms =
                    u64::try_from(self.conversion_timeout.as_millis()).unwrap_or(u64::MAX);
                Err(ConversionError::Timeout(timeout_ms))
            })
    }

    /// Submits an expense on behalf of `employee_id`.
    ///
    /// The amount is converted into the company default currency when the
    /// currencies differ. A failed or slow conversion never fails the
    /// submission: the entered amount is stored instead. A company without
    /// rules gets an expense with an empty chain that stays pending.
    ///
    /// # Errors
    ///
    /// - `Validation` for bad input, or a converted amount too large to
    ///   store, before anything is persisted
    /// - `NotFound` if the employee or their company is unknown
    /// - `Persistence` if the store fails; nothing is committed
    pub async fn submit_expense(
        &self,
        employee_id: UserId,
        input: NewExpense,
    ) -> Result<Expense, WorkflowError> {
        input.validate()?;

        let mut employee = self.user(employee_id).await?;
        let company = self
            .directory
            .get_company(employee.company_id)
            .await?
            .ok_or(WorkflowError::not_found("company"))?;

        let converted_amount = if input.currency == company.default_currency {
            round_amount(input.amount, CONVERTED_DECIMAL_PLACES)
        } else {
            let conversion = self
                .convert_with_timeout(input.amount, input.currency, company.default_currency)
                .await;

            match conversion {
                Ok(amount) => amount,
                Err(e) => {
                    warn!(
                        error = %e,
                        from = %input.currency,
                        to = %company.default_currency,
                        "Currency conversion failed, storing entered amount"
                    );
                    round_amount(input.amount, CONVERTED_DECIMAL_PLACES)
                }
            }
        };
        check_amount_range("converted amount", converted_amount)?;

        employee.manager_id = self
            .directory
            .get_manager_of(employee.id)
            .await?
            .map(|manager| manager.id);

        let rules = self.rules.list_rules(company.id).await?;
        let rule = select_active_rule(&rules);
        if rule.is_none() {
            warn!(
                company_id = %company.id,
                "No approval rules found for company, expense created without approvals"
            );
        }

        let expense = Expense::submit(&employee, input, Some(converted_amount), rule, Utc::now());
        self.expenses.insert_expense(&expense).await?;

        info!(
            expense_id = %expense.id,
            employee_id = %employee.id,
            amount = %expense.entered(),
            steps = expense.approvals.len(),
            "Expense submitted"
        );

        Ok(expense)
    }

    /// Lists the expenses `caller_id` may see, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown caller and `Persistence` on store failure.
    pub async fn list_expenses(&self, caller_id: UserId) -> Result<Vec<Expense>, WorkflowError> {
        let caller = self.user(caller_id).await?;

        let scope = match caller.role {
            UserRole::Admin => ExpenseScope::Company(caller.company_id),
            UserRole::Employee => ExpenseScope::Employees(vec![caller.id]),
            UserRole::Manager => {
                let mut ids: Vec<UserId> = self
                    .directory
                    .list_direct_reports(caller.id)
                    .await?
                    .into_iter()
                    .map(|u| u.id)
                    .collect();
                ids.push(caller.id);
                ExpenseScope::Employees(ids)
            }
            UserRole::Director | UserRole::Cfo | UserRole::Finance => {
                ExpenseScope::Approver(caller.id)
            }
        };

        let expenses = self.expenses.list_expenses(&scope).await?;
        Ok(expenses
            .into_iter()
            .filter(|e| e.company_id == caller.company_id)
            .collect())
    }

    async fn can_view(&self, caller: &User, expense: &Expense) -> Result<bool, WorkflowError> {
        if expense.company_id != caller.company_id {
            return Ok(false);
        }
        if expense.employee_id == caller.id || expense.has_approver(caller.id) {
            return Ok(true);
        }
        match caller.role {
            UserRole::Admin => Ok(true),
            UserRole::Manager => Ok(self
                .directory
                .get_manager_of(expense.employee_id)
                .await?
                .is_some_and(|m| m.id == caller.id)),
            UserRole::Employee | UserRole::Director | UserRole::Cfo | UserRole::Finance => {
                Ok(false)
            }
        }
    }

    /// Returns the ordered approval chain of one expense.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the expense does not exist or is not visible to
    /// the caller.
    pub async fn expense_chain(
        &self,
        caller_id: UserId,
        expense_id: ExpenseId,
    ) -> Result<Vec<ExpenseApproval>, WorkflowError> {
        let caller = self.user(caller_id).await?;
        let expense = self
            .expenses
            .find_expense(expense_id)
            .await?
            .ok_or(WorkflowError::not_found("expense"))?;

        if !self.can_view(&caller, &expense).await? {
            return Err(WorkflowError::not_found("expense"));
        }

        let mut chain = expense.approvals;
        chain.sort_by_key(|a| a.sequence_order);
        Ok(chain)
    }

    /// Steps assigned to the caller that still await a decision on expenses
    /// that are still pending.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown caller and `Persistence` on store failure.
    pub async fn list_pending_approvals(
        &self,
        caller_id: UserId,
    ) -> Result<Vec<PendingApproval>, WorkflowError> {
        let caller = self.user(caller_id).await?;
        let expenses = self
            .expenses
            .list_expenses(&ExpenseScope::Approver(caller.id))
            .await?;

        Ok(expenses
            .into_iter()
            .filter(|e| e.company_id == caller.company_id && e.status == ExpenseStatus::Pending)
            .flat_map(|expense| {
                expense
                    .approvals
                    .iter()
                    .filter(|a| a.approver_id == caller.id && a.status == ApprovalStatus::Pending)
                    .map(|approval| PendingApproval {
                        approval: approval.clone(),
                        expense: expense.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect())
    }

    /// Records the caller's decision on one approval step.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the step does not exist or belongs to another company
    /// - `Forbidden` if the caller is not the step's approver
    /// - `AlreadyDecided` if the step is terminal
    /// - `ExpenseFinalized` if the expense is terminal
    pub async fn decide_approval(
        &self,
        caller_id: UserId,
        approval_id: ExpenseApprovalId,
        decision: Decision,
        comments: Option<String>,
    ) -> Result<ExpenseApproval, WorkflowError> {
        let caller = self.user(caller_id).await?;
        let expense = self
            .expenses
            .find_by_approval(approval_id)
            .await?
            .filter(|e| e.company_id == caller.company_id)
            .ok_or(WorkflowError::not_found("approval step"))?;

        let designated = expense
            .approval(approval_id)
            .is_some_and(|a| a.approver_id == caller.id);
        if !designated {
            return Err(WorkflowError::Forbidden(
                "only the designated approver may decide this step".into(),
            ));
        }

        let outcome = self
            .expenses
            .apply_decision(expense.id, approval_id, caller.id, decision, comments, Utc::now())
            .await?;

        info!(
            expense_id = %expense.id,
            approval_id = %approval_id,
            approver_id = %caller.id,
            decision = %decision,
            status = %outcome.status,
            "Approval decided"
        );
        if outcome.status_changed() {
            info!(
                expense_id = %expense.id,
                from = %outcome.previous_status,
                to = %outcome.status,
                "Expense status changed"
            );
        }

        Ok(outcome.approval)
    }

    /// Creates an approval rule in the admin's company.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the caller is not an admin
    /// - `Validation` if the rule is malformed or names approvers that are
    ///   not approval-eligible members of the company
    pub async fn create_rule(
        &self,
        admin_id: UserId,
        input: NewApprovalRule,
    ) -> Result<ApprovalRule, WorkflowError> {
        let admin = self.admin(admin_id).await?;
        input.validate()?;

        let eligible = self
            .directory
            .list_approval_eligible_users(admin.company_id)
            .await?;
        if let Some(stranger) = input
            .approvers
            .iter()
            .find(|a| !eligible.iter().any(|u| u.id == a.user_id))
        {
            return Err(WorkflowError::Validation(format!(
                "approver {} is not an approval-eligible member of this company",
                stranger.user_id
            )));
        }

        let rule = ApprovalRule {
            id: ApprovalRuleId::new(),
            company_id: admin.company_id,
            name: input.name.trim().to_string(),
            is_manager_approver: input.is_manager_approver,
            approval_type: input.approval_type,
            percentage_required: input.percentage_required,
            specific_approver_id: input.specific_approver_id,
            approvers: input.approvers,
            created_at: Utc::now(),
        };
        self.rules.insert_rule(&rule).await?;

        info!(
            rule_id = %rule.id,
            company_id = %rule.company_id,
            approval_type = %rule.approval_type,
            approvers = rule.approvers.len(),
            "Approval rule created"
        );

        Ok(rule)
    }

    /// Lists the rules of the caller's company, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown caller and `Persistence` on store failure.
    pub async fn list_rules(&self, caller_id: UserId) -> Result<Vec<ApprovalRule>, WorkflowError> {
        let caller = self.user(caller_id).await?;
        self.rules.list_rules(caller.company_id).await
    }

    /// Sets or clears a user's manager.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the caller is not an admin
    /// - `NotFound` if either user is not in the admin's company
    /// - `Validation` if the assignment would create a cycle
    pub async fn assign_manager(
        &self,
        admin_id: UserId,
        user_id: UserId,
        manager_id: Option<UserId>,
    ) -> Result<User, WorkflowError> {
        let admin = self.admin(admin_id).await?;
        let user = self
            .directory
            .assign_manager(admin.company_id, user_id, manager_id)
            .await?;
        info!(
            user_id = %user.id,
            manager_id = ?user.manager_id,
            "Manager assigned"
        );
        Ok(user)
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
