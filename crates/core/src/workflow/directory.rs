//! Directory records: companies, users and the manager tree.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use claimflow_shared::types::{CompanyId, CurrencyCode, UserId};

use crate::workflow::error::WorkflowError;
use crate::workflow::types::UserRole;

/// A tenant. Owns rules, users and expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Company ID.
    pub id: CompanyId,
    /// Display name.
    pub name: String,
    /// Currency every expense is converted into.
    pub default_currency: CurrencyCode,
}

/// A member of a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: UserId,
    /// Company the user belongs to.
    pub company_id: CompanyId,
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role inside the company.
    pub role: UserRole,
    /// Direct manager, if any.
    pub manager_id: Option<UserId>,
}

/// Returns true if making `manager_id` the manager of `user_id` would close a
/// loop in the manager tree described by `users`.
///
/// Self-management counts as a cycle. Links to users outside `users` end the walk.
#[must_use]
pub fn creates_manager_cycle(users: &[User], user_id: UserId, manager_id: UserId) -> bool {
    if user_id == manager_id {
        return true;
    }

    let managers: HashMap<UserId, Option<UserId>> =
        users.iter().map(|u| (u.id, u.manager_id)).collect();

    // Walk upwards from the proposed manager; bounded by the number of users
    // so a cycle already present in the data cannot spin forever.
    let mut current = Some(manager_id);
    for _ in 0..=users.len() {
        match current {
            Some(id) if id == user_id => return true,
            Some(id) => current = managers.get(&id).copied().flatten(),
            None => return false,
        }
    }
    true
}

/// Checks that `user_id` may report to `manager_id` given the company's
/// current users. `None` clears the manager and always passes once the user
/// is known.
///
/// Directories call this and write the result under one company-wide lock.
///
/// # Errors
///
/// - `NotFound` if either user is not among `users`
/// - `Validation` if the assignment would create a reporting cycle
pub fn check_manager_assignment(
    users: &[User],
    user_id: UserId,
    manager_id: Option<UserId>,
) -> Result<(), WorkflowError> {
    if !users.iter().any(|u| u.id == user_id) {
        return Err(WorkflowError::not_found("user"));
    }

    if let Some(manager_id) = manager_id {
        if !users.iter().any(|u| u.id == manager_id) {
            return Err(WorkflowError::not_found("manager"));
        }
        if creates_manager_cycle(users, user_id, manager_id) {
            return Err(WorkflowError::Validation(
                "manager assignment would create a reporting cycle".into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: UserId, manager_id: Option<UserId>) -> User {
        User {
            id,
            company_id: CompanyId::new(),
            email: format!("{id}@example.com"),
            name: "Test".to_string(),
            role: UserRole::Employee,
            manager_id,
        }
    }

    #[test]
    fn test_self_management_is_a_cycle() {
        let a = UserId::new();
        assert!(creates_manager_cycle(&[user(a, None)], a, a));
    }

    #[test]
    fn test_direct_cycle() {
        let a = UserId::new();
        let b = UserId::new();
        // b reports to a; making b manage a closes the loop.
        let users = vec![user(a, None), user(b, Some(a))];
        assert!(creates_manager_cycle(&users, a, b));
    }

    #[test]
    fn test_transitive_cycle() {
        let a = UserId::new();
        let b = UserId::new();
        let c = UserId::new();
        let users = vec![user(a, None), user(b, Some(a)), user(c, Some(b))];
        assert!(creates_manager_cycle(&users, a, c));
    }

    #[test]
    fn test_valid_assignment() {
        let a = UserId::new();
        let b = UserId::new();
        let c = UserId::new();
        let users = vec![user(a, None), user(b, Some(a)), user(c, None)];
        assert!(!creates_manager_cycle(&users, c, b));
        assert!(!creates_manager_cycle(&users, b, c));
    }

    #[test]
    fn test_existing_loop_terminates() {
        let a = UserId::new();
        let b = UserId::new();
        let c = UserId::new();
        let users = vec![user(a, Some(b)), user(b, Some(a)), user(c, None)];
        assert!(creates_manager_cycle(&users, c, a));
    }

    #[test]
    fn test_assignment_check_errors() {
        let a = UserId::new();
        let b = UserId::new();
        let users = vec![user(a, None), user(b, Some(a))];

        assert_eq!(check_manager_assignment(&users, b, None), Ok(()));
        assert_eq!(
            check_manager_assignment(&users, UserId::new(), Some(a)),
            Err(WorkflowError::not_found("user"))
        );
        assert_eq!(
            check_manager_assignment(&users, a, Some(UserId::new())),
            Err(WorkflowError::not_found("manager"))
        );
        assert!(matches!(
            check_manager_assignment(&users, a, Some(b)),
            Err(WorkflowError::Validation(_))
        ));
    }
}
