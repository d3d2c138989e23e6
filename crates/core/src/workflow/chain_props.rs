//! Property-based tests for `ChainBuilder`.

use chrono::Utc;
use proptest::prelude::*;

use claimflow_shared::types::{ApprovalRuleId, CompanyId, UserId};

use crate::workflow::chain::ChainBuilder;
use crate::workflow::directory::User;
use crate::workflow::rule::{ApprovalRule, RuleApprover};
use crate::workflow::types::{ApprovalType, UserRole};

fn employee(manager_id: Option<UserId>) -> User {
    User {
        id: UserId::new(),
        company_id: CompanyId::new(),
        email: "emp@example.com".to_string(),
        name: "Emp".to_string(),
        role: UserRole::Employee,
        manager_id,
    }
}

fn rule(is_manager_approver: bool, sequence_values: &[i32]) -> ApprovalRule {
    ApprovalRule {
        id: ApprovalRuleId::new(),
        company_id: CompanyId::new(),
        name: "Generated".to_string(),
        is_manager_approver,
        approval_type: ApprovalType::Sequential,
        percentage_required: None,
        specific_approver_id: None,
        approvers: sequence_values
            .iter()
            .map(|&sequence_order| RuleApprover {
                user_id: UserId::new(),
                sequence_order,
            })
            .collect(),
        created_at: Utc::now(),
    }
}

/// Sequence values with gaps and duplicates.
fn arb_sequence_values() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(1i32..50, 0..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Positions are 1..=n whatever the rule's sequence values look like.
    #[test]
    fn prop_positions_are_dense(
        values in arb_sequence_values(),
        is_manager_approver in any::<bool>(),
        has_manager in any::<bool>(),
    ) {
        let manager = has_manager.then(UserId::new);
        let chain = ChainBuilder::build_chain(&rule(is_manager_approver, &values), &employee(manager));

        let expected_len = values.len() + usize::from(is_manager_approver && has_manager);
        prop_assert_eq!(chain.len(), expected_len);
        for (step, expected) in chain.iter().zip(1..) {
            prop_assert_eq!(step.sequence_order, expected);
        }
    }

    /// The manager leads the chain whenever they are requested and present.
    #[test]
    fn prop_manager_leads(values in arb_sequence_values()) {
        let manager = UserId::new();
        let chain = ChainBuilder::build_chain(&rule(true, &values), &employee(Some(manager)));

        prop_assert_eq!(chain[0].approver_id, manager);
        prop_assert_eq!(chain[0].sequence_order, 1);
    }

    /// Rule approvers appear in ascending sequence order, stable on ties.
    #[test]
    fn prop_rule_approvers_sorted(values in arb_sequence_values()) {
        let rule = rule(false, &values);
        let chain = ChainBuilder::build_chain(&rule, &employee(None));

        let mut expected: Vec<_> = rule.approvers.clone();
        expected.sort_by_key(|a| a.sequence_order);
        let expected: Vec<_> = expected.iter().map(|a| a.user_id).collect();
        let actual: Vec<_> = chain.iter().map(|s| s.approver_id).collect();
        prop_assert_eq!(actual, expected);
    }
}
