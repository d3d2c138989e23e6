//! Property-based tests for `DecisionEvaluator`.

use chrono::Utc;
use proptest::prelude::*;

use claimflow_shared::types::{ApprovalRuleId, ExpenseApprovalId, ExpenseId, UserId};

use crate::workflow::evaluator::{DecisionEvaluator, Tally};
use crate::workflow::expense::ExpenseApproval;
use crate::workflow::rule::ApprovalPolicy;
use crate::workflow::types::{ApprovalStatus, ApprovalType, ExpenseStatus};

fn arb_status() -> impl Strategy<Value = ApprovalStatus> {
    prop_oneof![
        Just(ApprovalStatus::Pending),
        Just(ApprovalStatus::Approved),
        Just(ApprovalStatus::Rejected),
    ]
}

fn arb_statuses() -> impl Strategy<Value = Vec<ApprovalStatus>> {
    prop::collection::vec(arb_status(), 1..10)
}

fn chain(statuses: &[ApprovalStatus]) -> Vec<ExpenseApproval> {
    let expense_id = ExpenseId::new();
    statuses
        .iter()
        .zip(1..)
        .map(|(&status, sequence_order)| ExpenseApproval {
            id: ExpenseApprovalId::new(),
            expense_id,
            approver_id: UserId::new(),
            sequence_order,
            status,
            comments: None,
            decided_at: status.is_terminal().then(Utc::now),
            created_at: Utc::now(),
        })
        .collect()
}

fn policy(approval_type: ApprovalType, pct: Option<u8>, specific: Option<UserId>) -> ApprovalPolicy {
    ApprovalPolicy {
        rule_id: ApprovalRuleId::new(),
        approval_type,
        percentage_required: pct,
        specific_approver_id: specific,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Sequential: approved iff every step approved, rejected iff any rejected.
    #[test]
    fn prop_sequential(statuses in arb_statuses()) {
        let steps = chain(&statuses);
        let status = DecisionEvaluator::evaluate(&policy(ApprovalType::Sequential, None, None), &steps);

        let any_rejected = statuses.contains(&ApprovalStatus::Rejected);
        let all_approved = statuses.iter().all(|s| *s == ApprovalStatus::Approved);
        let expected = if any_rejected {
            ExpenseStatus::Rejected
        } else if all_approved {
            ExpenseStatus::Approved
        } else {
            ExpenseStatus::Pending
        };
        prop_assert_eq!(status, expected);
    }

    /// Percentage: approved exactly when the integer threshold holds,
    /// rejected exactly when it can no longer be reached.
    #[test]
    fn prop_percentage_threshold(statuses in arb_statuses(), pct in 1u8..=100) {
        let steps = chain(&statuses);
        let tally = Tally::of(&steps);
        let status = DecisionEvaluator::evaluate(&policy(ApprovalType::Percentage, Some(pct), None), &steps);

        let total = u32::try_from(statuses.len()).unwrap();
        let approved = u32::try_from(
            statuses.iter().filter(|s| **s == ApprovalStatus::Approved).count(),
        ).unwrap();
        prop_assert_eq!(tally.total, total);
        prop_assert_eq!(status == ExpenseStatus::Approved, approved * 100 >= u32::from(pct) * total);
        prop_assert_eq!(
            status == ExpenseStatus::Rejected,
            !tally.meets(pct) && tally.unreachable(pct)
        );
    }

    /// Another approval never takes a percentage expense out of `Approved`
    /// and never rejects a pending one.
    #[test]
    fn prop_percentage_monotonic(statuses in arb_statuses(), pct in 1u8..=100, index in any::<prop::sample::Index>()) {
        let mut steps = chain(&statuses);
        let p = policy(ApprovalType::Percentage, Some(pct), None);
        let before = DecisionEvaluator::evaluate(&p, &steps);

        let i = index.index(steps.len());
        if steps[i].status == ApprovalStatus::Pending {
            steps[i].status = ApprovalStatus::Approved;
            let after = DecisionEvaluator::evaluate(&p, &steps);
            match before {
                ExpenseStatus::Approved => {
                    prop_assert_eq!(after, ExpenseStatus::Approved);
                }
                ExpenseStatus::Pending => {
                    prop_assert_ne!(after, ExpenseStatus::Rejected);
                }
                ExpenseStatus::Rejected => {}
            }
        }
    }

    /// Specific: once the designated approver decided, nobody else matters.
    #[test]
    fn prop_specific_decides_alone(statuses in arb_statuses(), index in any::<prop::sample::Index>(), approve in any::<bool>()) {
        let mut steps = chain(&statuses);
        let i = index.index(steps.len());
        steps[i].status = if approve { ApprovalStatus::Approved } else { ApprovalStatus::Rejected };
        let specific = steps[i].approver_id;

        for approval_type in [ApprovalType::Specific, ApprovalType::Hybrid] {
            let pct = approval_type.uses_percentage().then_some(50);
            let status = DecisionEvaluator::evaluate(&policy(approval_type, pct, Some(specific)), &steps);
            if approve {
                prop_assert_eq!(status, ExpenseStatus::Approved);
            } else {
                prop_assert_eq!(status, ExpenseStatus::Rejected);
            }
        }
    }

    /// An untouched chain is pending under every policy.
    #[test]
    fn prop_fresh_chain_is_pending(len in 1usize..10, pct in 1u8..=100) {
        let steps = chain(&vec![ApprovalStatus::Pending; len]);
        let specific = Some(steps[0].approver_id);
        for approval_type in [ApprovalType::Sequential, ApprovalType::Percentage, ApprovalType::Specific, ApprovalType::Hybrid] {
            let status = DecisionEvaluator::evaluate(&policy(approval_type, Some(pct), specific), &steps);
            prop_assert_eq!(status, ExpenseStatus::Pending);
        }
    }
}
