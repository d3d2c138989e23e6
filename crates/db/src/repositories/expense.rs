//! Expense repository: expenses and their approval ledgers.
//!
//! Decisions are applied inside a transaction that first takes a row lock on
//! the expense (`SELECT ... FOR UPDATE`), so concurrent decisions on the same
//! expense are evaluated one after another against committed state.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use claimflow_core::workflow::{
    Decision, DecisionOutcome, Expense, ExpenseScope, ExpenseStore, WorkflowError,
};
use claimflow_shared::types::{ExpenseApprovalId, ExpenseId, UserId};

use super::db_err;
use super::mapping::{expense_from_models, to_db_time};
use crate::entities::{expense_approvals, expenses};

/// PostgreSQL-backed [`ExpenseStore`].
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads the steps of the given expenses, grouped by expense.
    async fn load_steps<C: ConnectionTrait>(
        conn: &C,
        expense_ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, Vec<expense_approvals::Model>>, WorkflowError> {
        let steps = expense_approvals::Entity::find()
            .filter(expense_approvals::Column::ExpenseId.is_in(expense_ids))
            .order_by_asc(expense_approvals::Column::SequenceOrder)
            .all(conn)
            .await
            .map_err(db_err)?;

        let mut grouped: HashMap<Uuid, Vec<expense_approvals::Model>> = HashMap::new();
        for step in steps {
            grouped.entry(step.expense_id).or_default().push(step);
        }
        Ok(grouped)
    }

    async fn hydrate(&self, rows: Vec<expenses::Model>) -> Result<Vec<Expense>, WorkflowError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids = rows.iter().map(|e| e.id).collect();
        let mut steps = Self::load_steps(&self.db, ids).await?;

        rows.into_iter()
            .map(|row| {
                let approvals = steps.remove(&row.id).unwrap_or_default();
                expense_from_models(row, approvals)
            })
            .collect()
    }
}

fn expense_row(expense: &Expense) -> expenses::ActiveModel {
    let policy = expense.policy;
    let created_at = to_db_time(expense.created_at);

    expenses::ActiveModel {
        id: Set(expense.id.into_inner()),
        company_id: Set(expense.company_id.into_inner()),
        employee_id: Set(expense.employee_id.into_inner()),
        amount: Set(expense.amount),
        currency: Set(expense.currency.as_str().to_string()),
        converted_amount: Set(expense.converted_amount),
        category: Set(expense.category.clone()),
        description: Set(expense.description.clone()),
        expense_date: Set(expense.expense_date),
        status: Set(expense.status.into()),
        approval_rule_id: Set(policy.map(|p| p.rule_id.into_inner())),
        approval_type: Set(policy.map(|p| p.approval_type.into())),
        percentage_required: Set(policy.and_then(|p| p.percentage_required).map(i16::from)),
        specific_approver_id: Set(policy
            .and_then(|p| p.specific_approver_id)
            .map(UserId::into_inner)),
        created_at: Set(created_at),
        updated_at: Set(created_at),
    }
}

#[async_trait]
impl ExpenseStore for ExpenseRepository {
    async fn insert_expense(&self, expense: &Expense) -> Result<(), WorkflowError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        expense_row(expense).insert(&txn).await.map_err(db_err)?;

        if !expense.approvals.is_empty() {
            let steps = expense
                .approvals
                .iter()
                .map(|a| expense_approvals::ActiveModel {
                    id: Set(a.id.into_inner()),
                    expense_id: Set(a.expense_id.into_inner()),
                    approver_id: Set(a.approver_id.into_inner()),
                    sequence_order: Set(a.sequence_order),
                    status: Set(a.status.into()),
                    comments: Set(a.comments.clone()),
                    decided_at: Set(a.decided_at.map(to_db_time)),
                    created_at: Set(to_db_time(a.created_at)),
                });
            expense_approvals::Entity::insert_many(steps)
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_expense(&self, expense_id: ExpenseId) -> Result<Option<Expense>, WorkflowError> {
        let Some(row) = expenses::Entity::find_by_id(expense_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        Ok(self.hydrate(vec![row]).await?.pop())
    }

    async fn find_by_approval(
        &self,
        approval_id: ExpenseApprovalId,
    ) -> Result<Option<Expense>, WorkflowError> {
        let step = expense_approvals::Entity::find_by_id(approval_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?;

        match step {
            Some(step) => self.find_expense(step.expense_id.into()).await,
            None => Ok(None),
        }
    }

    async fn list_expenses(&self, scope: &ExpenseScope) -> Result<Vec<Expense>, WorkflowError> {
        let query = match scope {
            ExpenseScope::Company(company_id) => expenses::Entity::find()
                .filter(expenses::Column::CompanyId.eq(company_id.into_inner())),
            ExpenseScope::Employees(employee_ids) => {
                if employee_ids.is_empty() {
                    return Ok(Vec::new());
                }
                expenses::Entity::find().filter(
                    expenses::Column::EmployeeId
                        .is_in(employee_ids.iter().map(|id| id.into_inner())),
                )
            }
            ExpenseScope::Approver(approver_id) => {
                let expense_ids: Vec<Uuid> = expense_approvals::Entity::find()
                    .select_only()
                    .column(expense_approvals::Column::ExpenseId)
                    .filter(expense_approvals::Column::ApproverId.eq(approver_id.into_inner()))
                    .distinct()
                    .into_tuple()
                    .all(&self.db)
                    .await
                    .map_err(db_err)?;
                if expense_ids.is_empty() {
                    return Ok(Vec::new());
                }
                expenses::Entity::find().filter(expenses::Column::Id.is_in(expense_ids))
            }
        };

        let rows = query
            .order_by_desc(expenses::Column::CreatedAt)
            .order_by_desc(expenses::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        self.hydrate(rows).await
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
        let txn = self.db.begin().await.map_err(db_err)?;

        // Lock the expense row for the rest of the transaction
        let row = expenses::Entity::find_by_id(expense_id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::not_found("expense"))?;

        let mut steps = Self::load_steps(&txn, vec![row.id]).await?;
        let approvals = steps.remove(&row.id).unwrap_or_default();
        let mut expense = expense_from_models(row, approvals)?;

        // Validation errors drop the transaction, which rolls it back
        let outcome = expense.decide(approval_id, approver_id, decision, comments, now)?;
        let decided_at = to_db_time(now);

        expense_approvals::ActiveModel {
            id: Unchanged(outcome.approval.id.into_inner()),
            status: Set(outcome.approval.status.into()),
            comments: Set(outcome.approval.comments.clone()),
            decided_at: Set(Some(decided_at)),
            ..Default::default()
        }
        .update(&txn)
        .await
        .map_err(db_err)?;

        let mut status_update = expenses::ActiveModel {
            id: Unchanged(expense_id.into_inner()),
            updated_at: Set(decided_at),
            ..Default::default()
        };
        if outcome.status_changed() {
            status_update.status = Set(outcome.status.into());
        }
        status_update.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(outcome)
    }
}
