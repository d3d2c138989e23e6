//! Chain builder: turns the active rule into the ordered list of approval
//! steps for one expense.

use serde::{Deserialize, Serialize};

use claimflow_shared::types::UserId;

use crate::workflow::directory::User;
use crate::workflow::rule::ApprovalRule;

/// One required approval, before it is persisted as a ledger step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStep {
    /// Who must decide.
    pub approver_id: UserId,
    /// 1-based dense position in the chain.
    pub sequence_order: i32,
}

/// Stateless chain construction.
pub struct ChainBuilder;

impl ChainBuilder {
    /// Builds the approval chain for an expense submitted by `employee`.
    ///
    /// The manager comes first when the rule asks for it and the employee has
    /// one. Rule approvers follow sorted by their sequence value; the sort is
    /// stable so equal values keep insertion order. Positions are renumbered
    /// densely from 1. Nothing is deduplicated: a manager who is also a rule
    /// approver gets two steps.
    #[must_use]
    pub fn build_chain(rule: &ApprovalRule, employee: &User) -> Vec<ChainStep> {
        let manager = employee.manager_id.filter(|_| rule.is_manager_approver);

        let mut approvers = rule.approvers.clone();
        approvers.sort_by_key(|a| a.sequence_order);

        manager
            .into_iter()
            .chain(approvers.iter().map(|a| a.user_id))
            .zip(1..)
            .map(|(approver_id, sequence_order)| ChainStep {
                approver_id,
                sequence_order,
            })
            .collect()
    }
}
