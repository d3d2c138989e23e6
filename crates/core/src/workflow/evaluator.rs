//! Decision evaluator: derives an expense's aggregate status from its steps.
//!
//! Evaluation is a pure function of the policy snapshot and the current step
//! statuses. It is re-run after every recorded decision; the first terminal
//! result freezes the expense.

use claimflow_shared::types::UserId;

use crate::workflow::expense::ExpenseApproval;
use crate::workflow::rule::ApprovalPolicy;
use crate::workflow::types::{ApprovalStatus, ApprovalType, ExpenseStatus};

/// Step counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// All steps.
    pub total: u32,
    /// Approved steps.
    pub approved: u32,
    /// Rejected steps.
    pub rejected: u32,
}

impl Tally {
    /// Counts the given steps.
    #[must_use]
    pub fn of(steps: &[ExpenseApproval]) -> Self {
        steps.iter().fold(Self::default(), |mut tally, step| {
            tally.total += 1;
            match step.status {
                ApprovalStatus::Approved => tally.approved += 1,
                ApprovalStatus::Rejected => tally.rejected += 1,
                ApprovalStatus::Pending => {}
            }
            tally
        })
    }

    /// Steps still awaiting a decision.
    #[must_use]
    pub const fn pending(&self) -> u32 {
        self.total - self.approved - self.rejected
    }

    /// `approved / total >= pct / 100`, in integer arithmetic.
    #[must_use]
    pub fn meets(&self, pct: u8) -> bool {
        self.total > 0 && self.approved * 100 >= u32::from(pct) * self.total
    }

    /// True once the threshold can no longer be met even if every pending
    /// step approves.
    #[must_use]
    pub fn unreachable(&self, pct: u8) -> bool {
        (self.approved + self.pending()) * 100 < u32::from(pct) * self.total
    }
}

/// Where the designated approver stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecificVerdict {
    Approved,
    Rejected,
    /// At least one of their steps is still pending.
    Waiting,
    /// They hold no pending step and never decided (not in the chain).
    Absent,
}

fn specific_verdict(steps: &[ExpenseApproval], specific: Option<UserId>) -> SpecificVerdict {
    let Some(specific) = specific else {
        return SpecificVerdict::Absent;
    };

    let mut waiting = false;
    let mut approved = false;
    for step in steps.iter().filter(|s| s.approver_id == specific) {
        match step.status {
            ApprovalStatus::Rejected => return SpecificVerdict::Rejected,
            ApprovalStatus::Approved => approved = true,
            ApprovalStatus::Pending => waiting = true,
        }
    }

    if approved {
        SpecificVerdict::Approved
    } else if waiting {
        SpecificVerdict::Waiting
    } else {
        SpecificVerdict::Absent
    }
}

/// Stateless evaluator.
pub struct DecisionEvaluator;

impl DecisionEvaluator {
    /// Computes the aggregate status of an expense.
    ///
    /// An empty chain stays pending under every policy.
    #[must_use]
    pub fn evaluate(policy: &ApprovalPolicy, steps: &[ExpenseApproval]) -> ExpenseStatus {
        let tally = Tally::of(steps);
        if tally.total == 0 {
            return ExpenseStatus::Pending;
        }

        let pct = policy.percentage_required.unwrap_or(100);

        match policy.approval_type {
            ApprovalType::Sequential => {
                if tally.rejected > 0 {
                    ExpenseStatus::Rejected
                } else if tally.approved == tally.total {
                    ExpenseStatus::Approved
                } else {
                    ExpenseStatus::Pending
                }
            }
            ApprovalType::Percentage => {
                if tally.meets(pct) {
                    ExpenseStatus::Approved
                } else if tally.unreachable(pct) {
                    ExpenseStatus::Rejected
                } else {
                    ExpenseStatus::Pending
                }
            }
            ApprovalType::Specific => match specific_verdict(steps, policy.specific_approver_id) {
                SpecificVerdict::Approved => ExpenseStatus::Approved,
                SpecificVerdict::Rejected => ExpenseStatus::Rejected,
                SpecificVerdict::Waiting | SpecificVerdict::Absent => ExpenseStatus::Pending,
            },
            ApprovalType::Hybrid => match specific_verdict(steps, policy.specific_approver_id) {
                SpecificVerdict::Rejected => ExpenseStatus::Rejected,
                SpecificVerdict::Approved => ExpenseStatus::Approved,
                _ if tally.meets(pct) => ExpenseStatus::Approved,
                SpecificVerdict::Absent if tally.unreachable(pct) => ExpenseStatus::Rejected,
                SpecificVerdict::Waiting | SpecificVerdict::Absent => ExpenseStatus::Pending,
            },
        }
    }
}
