//! `SeaORM` Entity for approval_rules table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ApprovalType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "approval_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub is_manager_approver: bool,
    pub approval_type: ApprovalType,
    pub percentage_required: Option<i16>,
    pub specific_approver_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id"
    )]
    Companies,
    #[sea_orm(has_many = "super::approval_rule_approvers::Entity")]
    ApprovalRuleApprovers,
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl Related<super::approval_rule_approvers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApprovalRuleApprovers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
