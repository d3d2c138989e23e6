//! Approval rule repository.
//!
//! Rules and their approver lists are written together in one transaction and
//! never updated afterwards; expenses keep a snapshot of the policy instead.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use claimflow_core::workflow::{ApprovalRule, RuleStore, WorkflowError};
use claimflow_shared::types::{CompanyId, UserId};

use super::db_err;
use super::mapping::{rule_from_models, to_db_time};
use crate::entities::{approval_rule_approvers, approval_rules};

/// PostgreSQL-backed [`RuleStore`].
#[derive(Debug, Clone)]
pub struct ApprovalRuleRepository {
    db: DatabaseConnection,
}

impl ApprovalRuleRepository {
    /// Creates a new approval rule repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RuleStore for ApprovalRuleRepository {
    async fn list_rules(&self, company_id: CompanyId) -> Result<Vec<ApprovalRule>, WorkflowError> {
        let rules = approval_rules::Entity::find()
            .filter(approval_rules::Column::CompanyId.eq(company_id.into_inner()))
            .order_by_asc(approval_rules::Column::CreatedAt)
            .order_by_asc(approval_rules::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        if rules.is_empty() {
            return Ok(Vec::new());
        }

        let rule_ids: Vec<Uuid> = rules.iter().map(|r| r.id).collect();
        let approvers = approval_rule_approvers::Entity::find()
            .filter(approval_rule_approvers::Column::ApprovalRuleId.is_in(rule_ids))
            .order_by_asc(approval_rule_approvers::Column::SequenceOrder)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut by_rule: HashMap<Uuid, Vec<approval_rule_approvers::Model>> = HashMap::new();
        for approver in approvers {
            by_rule
                .entry(approver.approval_rule_id)
                .or_default()
                .push(approver);
        }

        rules
            .into_iter()
            .map(|rule| {
                let approvers = by_rule.remove(&rule.id).unwrap_or_default();
                rule_from_models(rule, approvers)
            })
            .collect()
    }

    async fn insert_rule(&self, rule: &ApprovalRule) -> Result<(), WorkflowError> {
        let created_at = to_db_time(rule.created_at);
        let txn = self.db.begin().await.map_err(db_err)?;

        approval_rules::ActiveModel {
            id: Set(rule.id.into_inner()),
            company_id: Set(rule.company_id.into_inner()),
            name: Set(rule.name.clone()),
            is_manager_approver: Set(rule.is_manager_approver),
            approval_type: Set(rule.approval_type.into()),
            percentage_required: Set(rule.percentage_required.map(i16::from)),
            specific_approver_id: Set(rule.specific_approver_id.map(UserId::into_inner)),
            created_at: Set(created_at),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        if !rule.approvers.is_empty() {
            let approvers = rule
                .approvers
                .iter()
                .map(|a| approval_rule_approvers::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    approval_rule_id: Set(rule.id.into_inner()),
                    approver_id: Set(a.user_id.into_inner()),
                    sequence_order: Set(a.sequence_order),
                    created_at: Set(created_at),
                });
            approval_rule_approvers::Entity::insert_many(approvers)
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }
}
