//! Approval rules and the policy snapshot taken from them.
//!
//! A company may hold several rules; [`select_active_rule`] decides which one
//! governs new submissions. The fields that drive evaluation are copied onto
//! each expense as an [`ApprovalPolicy`] so later rule edits never change how
//! an in-flight expense is decided.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use claimflow_shared::types::{ApprovalRuleId, CompanyId, UserId};

use crate::workflow::error::WorkflowError;
use crate::workflow::types::ApprovalType;

/// One configured approver of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleApprover {
    /// The approving user.
    pub user_id: UserId,
    /// Sort key within the rule. Unique per rule, 1-based, gaps allowed.
    pub sequence_order: i32,
}

/// A stored approval rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRule {
    /// Rule ID.
    pub id: ApprovalRuleId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Human-readable name.
    pub name: String,
    /// Whether the employee's manager is prepended to the chain.
    pub is_manager_approver: bool,
    /// Aggregation type.
    pub approval_type: ApprovalType,
    /// Required share of approvals, 1..=100. Set iff the type uses it.
    pub percentage_required: Option<u8>,
    /// Designated approver. Set iff the type uses it.
    pub specific_approver_id: Option<UserId>,
    /// Configured approvers, in insertion order.
    pub approvers: Vec<RuleApprover>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ApprovalRule {
    /// Snapshot of the fields the evaluator needs.
    #[must_use]
    pub const fn policy(&self) -> ApprovalPolicy {
        ApprovalPolicy {
            rule_id: self.id,
            approval_type: self.approval_type,
            percentage_required: self.percentage_required,
            specific_approver_id: self.specific_approver_id,
        }
    }
}

/// Input for creating a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApprovalRule {
    /// Human-readable name.
    pub name: String,
    /// Whether the employee's manager is prepended to the chain.
    #[serde(default)]
    pub is_manager_approver: bool,
    /// Aggregation type.
    pub approval_type: ApprovalType,
    /// Required share of approvals for percentage and hybrid rules.
    #[serde(default)]
    pub percentage_required: Option<u8>,
    /// Designated approver for specific and hybrid rules.
    #[serde(default)]
    pub specific_approver_id: Option<UserId>,
    /// Configured approvers.
    #[serde(default)]
    pub approvers: Vec<RuleApprover>,
}

impl NewApprovalRule {
    /// Checks the shape of the rule on its own.
    ///
    /// Directory checks (approvers exist, same company) are done by the
    /// lifecycle controller.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Validation` describing the first violated constraint.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowError::Validation("rule name is required".into()));
        }

        match (self.approval_type.uses_percentage(), self.percentage_required) {
            (true, None) => {
                return Err(WorkflowError::Validation(format!(
                    "percentage_required is required for {} rules",
                    self.approval_type
                )));
            }
            (true, Some(pct)) if !(1..=100).contains(&pct) => {
                return Err(WorkflowError::Validation(
                    "percentage_required must be between 1 and 100".into(),
                ));
            }
            (false, Some(_)) => {
                return Err(WorkflowError::Validation(format!(
                    "percentage_required is not allowed for {} rules",
                    self.approval_type
                )));
            }
            _ => {}
        }

        match (
            self.approval_type.uses_specific_approver(),
            self.specific_approver_id,
        ) {
            (true, None) => {
                return Err(WorkflowError::Validation(format!(
                    "specific_approver_id is required for {} rules",
                    self.approval_type
                )));
            }
            (true, Some(specific)) => {
                if !self.approvers.iter().any(|a| a.user_id == specific) {
                    return Err(WorkflowError::Validation(format!(
                        "specific approver {specific} must be one of the rule's approvers: \
                         without a step of their own they could never resolve the expense"
                    )));
                }
            }
            (false, Some(_)) => {
                return Err(WorkflowError::Validation(format!(
                    "specific_approver_id is not allowed for {} rules",
                    self.approval_type
                )));
            }
            (false, None) => {}
        }

        let mut seen = HashSet::with_capacity(self.approvers.len());
        for approver in &self.approvers {
            if approver.sequence_order < 1 {
                return Err(WorkflowError::Validation(
                    "sequence_order must be at least 1".into(),
                ));
            }
            if !seen.insert(approver.sequence_order) {
                return Err(WorkflowError::Validation(format!(
                    "duplicate sequence_order {}",
                    approver.sequence_order
                )));
            }
        }

        Ok(())
    }
}

/// The rule fields an expense is evaluated against, frozen at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    /// Rule the snapshot was taken from.
    pub rule_id: ApprovalRuleId,
    /// Aggregation type.
    pub approval_type: ApprovalType,
    /// Required share of approvals.
    pub percentage_required: Option<u8>,
    /// Designated approver.
    pub specific_approver_id: Option<UserId>,
}

/// Picks the rule that governs new submissions: the first-created one.
///
/// Ties on the creation timestamp fall back to the ID, which is time-ordered.
#[must_use]
pub fn select_active_rule(rules: &[ApprovalRule]) -> Option<&ApprovalRule> {
    rules.iter().min_by_key(|r| (r.created_at, r.id))
}
