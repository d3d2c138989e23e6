//! Workflow domain types for expense approval.
//!
//! Roles, approval types and statuses are closed sets; everything that
//! branches on them matches exhaustively instead of comparing strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a user inside their company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Manages users and approval rules; sees every expense of the company.
    Admin,
    /// Submits expenses; sees only their own.
    Employee,
    /// Approves for direct reports; sees own and direct reports' expenses.
    Manager,
    /// Sees expenses whose chain they sit on.
    Director,
    /// Sees expenses whose chain they sit on.
    Cfo,
    /// Sees expenses whose chain they sit on.
    Finance,
}

impl UserRole {
    /// All roles, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Admin,
        Self::Employee,
        Self::Manager,
        Self::Director,
        Self::Cfo,
        Self::Finance,
    ];

    /// Parses a role from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "employee" => Some(Self::Employee),
            "manager" => Some(Self::Manager),
            "director" => Some(Self::Director),
            "cfo" => Some(Self::Cfo),
            "finance" => Some(Self::Finance),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Employee => "employee",
            Self::Manager => "manager",
            Self::Director => "director",
            Self::Cfo => "cfo",
            Self::Finance => "finance",
        }
    }

    /// Returns true if users with this role may be configured as approvers.
    ///
    /// Plain employees only ever approve as someone's manager, never by rule.
    #[must_use]
    pub const fn is_approval_eligible(&self) -> bool {
        match self {
            Self::Admin | Self::Manager | Self::Director | Self::Cfo | Self::Finance => true,
            Self::Employee => false,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the steps of a chain are aggregated into the expense status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalType {
    /// Every step must approve; any rejection rejects.
    Sequential,
    /// A share of the steps must approve.
    Percentage,
    /// One designated approver decides.
    Specific,
    /// Either the percentage or the designated approver suffices.
    Hybrid,
}

impl ApprovalType {
    /// Parses an approval type from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sequential" => Some(Self::Sequential),
            "percentage" => Some(Self::Percentage),
            "specific" => Some(Self::Specific),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }

    /// Returns the string representation of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Percentage => "percentage",
            Self::Specific => "specific",
            Self::Hybrid => "hybrid",
        }
    }

    /// Whether rules of this type carry a `percentage_required`.
    #[must_use]
    pub const fn uses_percentage(&self) -> bool {
        matches!(self, Self::Percentage | Self::Hybrid)
    }

    /// Whether rules of this type carry a `specific_approver_id`.
    #[must_use]
    pub const fn uses_specific_approver(&self) -> bool {
        matches!(self, Self::Specific | Self::Hybrid)
    }
}

impl fmt::Display for ApprovalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate status of an expense.
///
/// Valid transitions:
/// - Pending → Approved
/// - Pending → Rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    /// Waiting on its approval chain.
    Pending,
    /// Reimbursable.
    Approved,
    /// Turned down.
    Rejected,
}

impl ExpenseStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true once no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one approval step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Awaiting the approver.
    Pending,
    /// The approver approved.
    Approved,
    /// The approver rejected.
    Rejected,
}

impl ApprovalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Returns true once the step has been decided.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An approver's verdict on one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Approve the step.
    Approved,
    /// Reject the step.
    Rejected,
}

impl Decision {
    /// The step status this decision produces.
    #[must_use]
    pub const fn as_status(&self) -> ApprovalStatus {
        match self {
            Self::Approved => ApprovalStatus::Approved,
            Self::Rejected => ApprovalStatus::Rejected,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_status().as_str())
    }
}
