//! `SeaORM` entity definitions.
//!
//! Hand-written to match the initial migration.

pub mod approval_rule_approvers;
pub mod approval_rules;
pub mod companies;
pub mod expense_approvals;
pub mod expenses;
pub mod sea_orm_active_enums;
pub mod users;
