//! Conversions between database rows and workflow domain types.

use chrono::Utc;
use sea_orm::entity::prelude::DateTimeWithTimeZone;

use claimflow_core::workflow::{
    self as domain, ApprovalPolicy, ApprovalRule, Company, Expense, ExpenseApproval, RuleApprover,
    User, WorkflowError,
};
use claimflow_shared::types::CurrencyCode;

use crate::entities::{
    approval_rule_approvers, approval_rules, companies, expense_approvals, expenses,
    sea_orm_active_enums::{ApprovalStatus, ApprovalType, ExpenseStatus, UserRole},
    users,
};

impl From<UserRole> for domain::UserRole {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Admin => Self::Admin,
            UserRole::Employee => Self::Employee,
            UserRole::Manager => Self::Manager,
            UserRole::Director => Self::Director,
            UserRole::Cfo => Self::Cfo,
            UserRole::Finance => Self::Finance,
        }
    }
}

impl From<domain::UserRole> for UserRole {
    fn from(role: domain::UserRole) -> Self {
        match role {
            domain::UserRole::Admin => Self::Admin,
            domain::UserRole::Employee => Self::Employee,
            domain::UserRole::Manager => Self::Manager,
            domain::UserRole::Director => Self::Director,
            domain::UserRole::Cfo => Self::Cfo,
            domain::UserRole::Finance => Self::Finance,
        }
    }
}

impl From<ApprovalType> for domain::ApprovalType {
    fn from(kind: ApprovalType) -> Self {
        match kind {
            ApprovalType::Sequential => Self::Sequential,
            ApprovalType::Percentage => Self::Percentage,
            ApprovalType::Specific => Self::Specific,
            ApprovalType::Hybrid => Self::Hybrid,
        }
    }
}

impl From<domain::ApprovalType> for ApprovalType {
    fn from(kind: domain::ApprovalType) -> Self {
        match kind {
            domain::ApprovalType::Sequential => Self::Sequential,
            domain::ApprovalType::Percentage => Self::Percentage,
            domain::ApprovalType::Specific => Self::Specific,
            domain::ApprovalType::Hybrid => Self::Hybrid,
        }
    }
}

impl From<ExpenseStatus> for domain::ExpenseStatus {
    fn from(status: ExpenseStatus) -> Self {
        match status {
            ExpenseStatus::Pending => Self::Pending,
            ExpenseStatus::Approved => Self::Approved,
            ExpenseStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<domain::ExpenseStatus> for ExpenseStatus {
    fn from(status: domain::ExpenseStatus) -> Self {
        match status {
            domain::ExpenseStatus::Pending => Self::Pending,
            domain::ExpenseStatus::Approved => Self::Approved,
            domain::ExpenseStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<ApprovalStatus> for domain::ApprovalStatus {
    fn from(status: ApprovalStatus) -> Self {
        match status {
            ApprovalStatus::Pending => Self::Pending,
            ApprovalStatus::Approved => Self::Approved,
            ApprovalStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<domain::ApprovalStatus> for ApprovalStatus {
    fn from(status: domain::ApprovalStatus) -> Self {
        match status {
            domain::ApprovalStatus::Pending => Self::Pending,
            domain::ApprovalStatus::Approved => Self::Approved,
            domain::ApprovalStatus::Rejected => Self::Rejected,
        }
    }
}

fn currency(code: &str) -> Result<CurrencyCode, WorkflowError> {
    CurrencyCode::parse(code).map_err(WorkflowError::Persistence)
}

fn percentage(value: Option<i16>) -> Result<Option<u8>, WorkflowError> {
    value
        .map(|p| {
            u8::try_from(p)
                .map_err(|_| WorkflowError::Persistence(format!("percentage out of range: {p}")))
        })
        .transpose()
}

pub(crate) fn company_from_model(model: companies::Model) -> Result<Company, WorkflowError> {
    Ok(Company {
        id: model.id.into(),
        name: model.name,
        default_currency: currency(&model.default_currency)?,
    })
}

pub(crate) fn user_from_model(model: users::Model) -> User {
    User {
        id: model.id.into(),
        company_id: model.company_id.into(),
        email: model.email,
        name: model.name,
        role: model.role.into(),
        manager_id: model.manager_id.map(Into::into),
    }
}

pub(crate) fn rule_from_models(
    rule: approval_rules::Model,
    approvers: Vec<approval_rule_approvers::Model>,
) -> Result<ApprovalRule, WorkflowError> {
    Ok(ApprovalRule {
        id: rule.id.into(),
        company_id: rule.company_id.into(),
        name: rule.name,
        is_manager_approver: rule.is_manager_approver,
        approval_type: rule.approval_type.into(),
        percentage_required: percentage(rule.percentage_required)?,
        specific_approver_id: rule.specific_approver_id.map(Into::into),
        approvers: approvers
            .into_iter()
            .map(|a| RuleApprover {
                user_id: a.approver_id.into(),
                sequence_order: a.sequence_order,
            })
            .collect(),
        created_at: rule.created_at.with_timezone(&Utc),
    })
}

pub(crate) fn approval_from_model(model: expense_approvals::Model) -> ExpenseApproval {
    ExpenseApproval {
        id: model.id.into(),
        expense_id: model.expense_id.into(),
        approver_id: model.approver_id.into(),
        sequence_order: model.sequence_order,
        status: model.status.into(),
        comments: model.comments,
        decided_at: model.decided_at.map(|at| at.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn expense_from_models(
    expense: expenses::Model,
    approvals: Vec<expense_approvals::Model>,
) -> Result<Expense, WorkflowError> {
    let policy = match (expense.approval_rule_id, expense.approval_type) {
        (Some(rule_id), Some(approval_type)) => Some(ApprovalPolicy {
            rule_id: rule_id.into(),
            approval_type: approval_type.into(),
            percentage_required: percentage(expense.percentage_required)?,
            specific_approver_id: expense.specific_approver_id.map(Into::into),
        }),
        _ => None,
    };

    let mut approvals: Vec<ExpenseApproval> =
        approvals.into_iter().map(approval_from_model).collect();
    approvals.sort_by_key(|a| a.sequence_order);

    Ok(Expense {
        id: expense.id.into(),
        company_id: expense.company_id.into(),
        employee_id: expense.employee_id.into(),
        amount: expense.amount,
        currency: currency(&expense.currency)?,
        converted_amount: expense.converted_amount,
        category: expense.category,
        description: expense.description,
        expense_date: expense.expense_date,
        status: expense.status.into(),
        policy,
        approvals,
        created_at: expense.created_at.with_timezone(&Utc),
    })
}

pub(crate) fn to_db_time(at: chrono::DateTime<Utc>) -> DateTimeWithTimeZone {
    at.fixed_offset()
}
