//! `SeaORM` Entity for expenses table.
//!
//! `approval_rule_id`, `approval_type`, `percentage_required` and
//! `specific_approver_id` hold the policy snapshot taken at submission.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{ApprovalType, ExpenseStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub currency: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub converted_amount: Option<Decimal>,
    pub category: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub expense_date: Date,
    pub status: ExpenseStatus,
    pub approval_rule_id: Option<Uuid>,
    pub approval_type: Option<ApprovalType>,
    pub percentage_required: Option<i16>,
    pub specific_approver_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id"
    )]
    Companies,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::EmployeeId",
        to = "super::users::Column::Id"
    )]
    Employee,
    #[sea_orm(has_many = "super::expense_approvals::Entity")]
    ExpenseApprovals,
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl Related<super::expense_approvals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseApprovals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
