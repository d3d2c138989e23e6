//! The expense aggregate and its approval ledger.
//!
//! An [`Expense`] owns its ordered [`ExpenseApproval`] steps and the policy
//! snapshot it is evaluated against. [`Expense::decide`] is the only place a
//! step or the expense status changes; stores call it while holding the
//! expense's lock.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use claimflow_shared::types::{
    CompanyId, CurrencyCode, ExpenseApprovalId, ExpenseId, Money, UserId,
};

use crate::workflow::chain::ChainBuilder;
use crate::workflow::directory::User;
use crate::workflow::error::WorkflowError;
use crate::workflow::evaluator::DecisionEvaluator;
use crate::workflow::rule::{ApprovalPolicy, ApprovalRule};
use crate::workflow::types::{ApprovalStatus, Decision, ExpenseStatus};

/// Decimal places an entered amount may carry.
pub const AMOUNT_SCALE: u32 = 4;

/// Exclusive upper bound for stored amounts (`NUMERIC(19, 4)`).
pub const AMOUNT_LIMIT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Checks that an amount fits the stored precision.
///
/// # Errors
///
/// Returns `WorkflowError::Validation` naming `field` if the amount has more
/// than [`AMOUNT_SCALE`] decimal places or reaches [`AMOUNT_LIMIT`].
pub fn check_amount_range(field: &str, amount: Decimal) -> Result<(), WorkflowError> {
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(WorkflowError::Validation(format!(
            "{field} may have at most {AMOUNT_SCALE} decimal places"
        )));
    }
    if amount.abs() >= AMOUNT_LIMIT {
        return Err(WorkflowError::Validation(format!(
            "{field} must be below {AMOUNT_LIMIT}"
        )));
    }
    Ok(())
}

/// Submission input, as entered by the employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    /// Amount in `currency`.
    pub amount: Decimal,
    /// Currency the amount was spent in.
    pub currency: CurrencyCode,
    /// Free-form category.
    pub category: String,
    /// What the money was spent on.
    pub description: String,
    /// Day the expense was incurred.
    pub expense_date: NaiveDate,
}

impl NewExpense {
    /// Validates the submission before anything is persisted.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Validation` if the amount is not positive, does
    /// not fit the stored precision, or a text field is blank.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if !Money::new(self.amount, self.currency).is_positive() {
            return Err(WorkflowError::Validation("amount must be positive".into()));
        }
        check_amount_range("amount", self.amount)?;
        if self.category.trim().is_empty() {
            return Err(WorkflowError::Validation("category is required".into()));
        }
        if self.description.trim().is_empty() {
            return Err(WorkflowError::Validation("description is required".into()));
        }
        Ok(())
    }
}

/// One approval step of an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseApproval {
    /// Step ID.
    pub id: ExpenseApprovalId,
    /// Owning expense.
    pub expense_id: ExpenseId,
    /// The only user allowed to decide this step.
    pub approver_id: UserId,
    /// 1-based position in the chain.
    pub sequence_order: i32,
    /// Current status; leaves `Pending` at most once.
    pub status: ApprovalStatus,
    /// Approver's comments.
    pub comments: Option<String>,
    /// Set together with a terminal status.
    pub decided_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A submitted expense with its approval chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Expense ID.
    pub id: ExpenseId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Submitting employee.
    pub employee_id: UserId,
    /// Amount as entered.
    pub amount: Decimal,
    /// Currency as entered.
    pub currency: CurrencyCode,
    /// Amount in the company default currency, or the entered amount when
    /// conversion was unavailable.
    pub converted_amount: Option<Decimal>,
    /// Category.
    pub category: String,
    /// Description.
    pub description: String,
    /// Day the expense was incurred.
    pub expense_date: NaiveDate,
    /// Aggregate status.
    pub status: ExpenseStatus,
    /// Rule snapshot; `None` when the company had no rule at submission.
    pub policy: Option<ApprovalPolicy>,
    /// Ledger, ordered by `sequence_order`.
    pub approvals: Vec<ExpenseApproval>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Result of recording one decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionOutcome {
    /// The updated step.
    pub approval: ExpenseApproval,
    /// Expense status before the decision.
    pub previous_status: ExpenseStatus,
    /// Expense status after the decision.
    pub status: ExpenseStatus,
}

impl DecisionOutcome {
    /// Whether the decision moved the expense to a new status.
    #[must_use]
    pub fn status_changed(&self) -> bool {
        self.previous_status != self.status
    }
}

impl Expense {
    /// The amount as entered, in the currency it was spent in.
    #[must_use]
    pub const fn entered(&self) -> Money {
        Money::new(self.amount, self.currency)
    }

    /// Creates a pending expense for `employee` with the chain of `rule`.
    ///
    /// Without a rule the expense has no steps and no policy.
    #[must_use]
    pub fn submit(
        employee: &User,
        input: NewExpense,
        converted_amount: Option<Decimal>,
        rule: Option<&ApprovalRule>,
        now: DateTime<Utc>,
    ) -> Self {
        let id = ExpenseId::new();

        let approvals = rule
            .map(|rule| ChainBuilder::build_chain(rule, employee))
            .unwrap_or_default()
            .into_iter()
            .map(|step| ExpenseApproval {
                id: ExpenseApprovalId::new(),
                expense_id: id,
                approver_id: step.approver_id,
                sequence_order: step.sequence_order,
                status: ApprovalStatus::Pending,
                comments: None,
                decided_at: None,
                created_at: now,
            })
            .collect();

        Self {
            id,
            company_id: employee.company_id,
            employee_id: employee.id,
            amount: input.amount,
            currency: input.currency,
            converted_amount,
            category: input.category,
            description: input.description,
            expense_date: input.expense_date,
            status: ExpenseStatus::Pending,
            policy: rule.map(ApprovalRule::policy),
            approvals,
            created_at: now,
        }
    }

    /// Finds a step of this expense.
    #[must_use]
    pub fn approval(&self, approval_id: ExpenseApprovalId) -> Option<&ExpenseApproval> {
        self.approvals.iter().find(|a| a.id == approval_id)
    }

    /// Whether `user_id` holds any step of this expense.
    #[must_use]
    pub fn has_approver(&self, user_id: UserId) -> bool {
        self.approvals.iter().any(|a| a.approver_id == user_id)
    }

    /// Records `approver_id`'s decision on one step and re-evaluates the
    /// expense status.
    ///
    /// On error nothing is modified.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the step does not belong to this expense
    /// - `Forbidden` if `approver_id` is not the step's approver
    /// - `AlreadyDecided` if the step is terminal
    /// - `ExpenseFinalized` if the expense is terminal
    pub fn decide(
        &mut self,
        approval_id: ExpenseApprovalId,
        approver_id: UserId,
        decision: Decision,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let index = self
            .approvals
            .iter()
            .position(|a| a.id == approval_id)
            .ok_or(WorkflowError::not_found("approval step"))?;

        let step = &self.approvals[index];
        if step.approver_id != approver_id {
            return Err(WorkflowError::Forbidden(
                "only the designated approver may decide this step".into(),
            ));
        }
        if step.status.is_terminal() {
            return Err(WorkflowError::AlreadyDecided(approval_id));
        }
        if self.status.is_terminal() {
            return Err(WorkflowError::ExpenseFinalized(self.id));
        }

        let step = &mut self.approvals[index];
        step.status = decision.as_status();
        step.comments = comments.filter(|c| !c.trim().is_empty());
        step.decided_at = Some(now);
        let approval = step.clone();

        let previous_status = self.status;
        if let Some(policy) = &self.policy {
            self.status = DecisionEvaluator::evaluate(policy, &self.approvals);
        }

        Ok(DecisionOutcome {
            approval,
            previous_status,
            status: self.status,
        })
    }
}
