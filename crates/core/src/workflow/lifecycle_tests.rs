use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use claimflow_shared::types::{CompanyId, CurrencyCode, ExpenseApprovalId, UserId};

use super::*;
use crate::currency::{ConversionError, FixedRateConverter};
use crate::workflow::directory::Company;
use crate::workflow::memory::InMemoryStore;
use crate::workflow::rule::RuleApprover;
use crate::workflow::types::ApprovalType;

struct Fixture {
    store: Arc<InMemoryStore>,
    lifecycle: ExpenseLifecycle,
    admin: User,
    manager: User,
    employee: User,
    director: User,
    cfo: User,
    finance: User,
}

fn member(company_id: CompanyId, name: &str, role: UserRole, manager_id: Option<UserId>) -> User {
    User {
        id: UserId::new(),
        company_id,
        email: format!("{}@acme.test", name.to_lowercase()),
        name: name.to_string(),
        role,
        manager_id,
    }
}

fn fixture_with(converter: Arc<dyn CurrencyConverter>) -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let company = Company {
        id: CompanyId::new(),
        name: "Acme".to_string(),
        default_currency: CurrencyCode::EUR,
    };
    store.insert_company(company.clone());

    let admin = member(company.id, "Ada", UserRole::Admin, None);
    let manager = member(company.id, "Mona", UserRole::Manager, None);
    let employee = member(company.id, "Eve", UserRole::Employee, Some(manager.id));
    let director = member(company.id, "Dirk", UserRole::Director, None);
    let cfo = member(company.id, "Cleo", UserRole::Cfo, None);
    let finance = member(company.id, "Finn", UserRole::Finance, None);
    for user in [&admin, &manager, &employee, &director, &cfo, &finance] {
        store.insert_user(user.clone());
    }

    let lifecycle = ExpenseLifecycle::new(store.clone(), store.clone(), store.clone(), converter)
        .with_conversion_timeout(Duration::from_millis(200));

    Fixture {
        store,
        lifecycle,
        admin,
        manager,
        employee,
        director,
        cfo,
        finance,
    }
}

fn fixture() -> Fixture {
    fixture_with(Arc::new(FixedRateConverter::new().with_rate(
        CurrencyCode::USD,
        CurrencyCode::EUR,
        dec!(0.9),
    )))
}

fn claim(amount: Decimal, currency: CurrencyCode) -> NewExpense {
    NewExpense {
        amount,
        currency,
        category: "Travel".to_string(),
        description: "Client visit".to_string(),
        expense_date: NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
    }
}

fn approvers(users: &[&User]) -> Vec<RuleApprover> {
    users
        .iter()
        .zip(1..)
        .map(|(u, sequence_order)| RuleApprover {
            user_id: u.id,
            sequence_order,
        })
        .collect()
}

fn new_rule(
    approval_type: ApprovalType,
    is_manager_approver: bool,
    users: &[&User],
) -> NewApprovalRule {
    NewApprovalRule {
        name: format!("{approval_type} rule"),
        is_manager_approver,
        approval_type,
        percentage_required: None,
        specific_approver_id: None,
        approvers: approvers(users),
    }
}

impl Fixture {
    async fn add_rule(&self, input: NewApprovalRule) -> ApprovalRule {
        self.lifecycle.create_rule(self.admin.id, input).await.unwrap()
    }

    async fn submit(&self) -> Expense {
        self.lifecycle
            .submit_expense(self.employee.id, claim(dec!(250), CurrencyCode::USD))
            .await
            .unwrap()
    }

    /// Decides the step held by `approver` and returns the expense afterwards.
    async fn decide(&self, expense: &Expense, approver: &User, decision: Decision) -> Expense {
        let step = expense
            .approvals
            .iter()
            .find(|a| a.approver_id == approver.id && a.status == ApprovalStatus::Pending)
            .unwrap();
        self.lifecycle
            .decide_approval(approver.id, step.id, decision, None)
            .await
            .unwrap();
        self.reload(expense).await
    }

    async fn reload(&self, expense: &Expense) -> Expense {
        self.store.find_expense(expense.id).await.unwrap().unwrap()
    }
}

struct SlowConverter;

#[async_trait]
impl CurrencyConverter for SlowConverter {
    async fn convert(
        &self,
        amount: Decimal,
        _from: CurrencyCode,
        _to: CurrencyCode,
    ) -> Result<Decimal, ConversionError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(amount * dec!(2))
    }
}

// Submission

#[tokio::test]
async fn test_submission_converts_into_company_currency() {
    let f = fixture();
    f.add_rule(new_rule(ApprovalType::Sequential, true, &[&f.director]))
        .await;

    let expense = f.submit().await;

    assert_eq!(expense.amount, dec!(250));
    assert_eq!(expense.currency, CurrencyCode::USD);
    assert_eq!(expense.converted_amount, Some(dec!(225)));
    assert_eq!(expense.status, ExpenseStatus::Pending);
}

#[tokio::test]
async fn test_converter_failure_stores_entered_amount() {
    let f = fixture_with(Arc::new(FixedRateConverter::new()));

    let expense = f.submit().await;

    assert_eq!(expense.converted_amount, Some(dec!(250)));
    assert!(f.store.find_expense(expense.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_slow_converter_times_out() {
    let f = fixture_with(Arc::new(SlowConverter));

    let expense = f.submit().await;

    assert_eq!(expense.converted_amount, Some(dec!(250)));
}

#[tokio::test]
async fn test_timeout_is_reported_as_conversion_error() {
    let f = fixture_with(Arc::new(SlowConverter));

    let result = f
        .lifecycle
        .convert_with_timeout(dec!(1), CurrencyCode::USD, CurrencyCode::EUR)
        .await;

    assert_eq!(result, Err(ConversionError::Timeout(200)));
}

#[tokio::test]
async fn test_same_currency_skips_conversion() {
    let f = fixture_with(Arc::new(SlowConverter));

    let expense = f
        .lifecycle
        .submit_expense(f.employee.id, claim(dec!(99.95), CurrencyCode::EUR))
        .await
        .unwrap();

    assert_eq!(expense.converted_amount, Some(dec!(99.95)));
}

#[tokio::test]
async fn test_same_currency_amount_is_rounded_to_cents() {
    let f = fixture();

    let expense = f
        .lifecycle
        .submit_expense(f.employee.id, claim(dec!(10.1251), CurrencyCode::EUR))
        .await
        .unwrap();

    assert_eq!(expense.amount, dec!(10.1251));
    assert_eq!(expense.converted_amount, Some(dec!(10.13)));
}

#[tokio::test]
async fn test_excess_precision_is_rejected() {
    let f = fixture();

    let err = f
        .lifecycle
        .submit_expense(f.employee.id, claim(dec!(10.123456789), CurrencyCode::EUR))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Validation(_)));
}

#[tokio::test]
async fn test_huge_foreign_amount_is_a_validation_error() {
    let f = fixture_with(Arc::new(FixedRateConverter::new().with_rate(
        CurrencyCode::USD,
        CurrencyCode::EUR,
        dec!(2),
    )));

    let err = f
        .lifecycle
        .submit_expense(f.employee.id, claim(Decimal::MAX, CurrencyCode::USD))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Validation(_)));
    assert!(f.lifecycle.list_expenses(f.admin.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_converted_amount_beyond_storage_is_rejected() {
    let f = fixture_with(Arc::new(FixedRateConverter::new().with_rate(
        CurrencyCode::USD,
        CurrencyCode::EUR,
        dec!(2),
    )));

    let err = f
        .lifecycle
        .submit_expense(
            f.employee.id,
            claim(dec!(900000000000000), CurrencyCode::USD),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Validation(_)));
    assert!(f.lifecycle.list_expenses(f.admin.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_overflowing_conversion_falls_back_to_entered_amount() {
    let f = fixture_with(Arc::new(FixedRateConverter::new().with_rate(
        CurrencyCode::USD,
        CurrencyCode::EUR,
        dec!(1000000000000000),
    )));

    let expense = f
        .lifecycle
        .submit_expense(
            f.employee.id,
            claim(dec!(100000000000000), CurrencyCode::USD),
        )
        .await
        .unwrap();

    assert_eq!(expense.converted_amount, Some(dec!(100000000000000)));
}

#[tokio::test]
async fn test_zero_rules_gives_empty_pending_chain() {
    let f = fixture();

    let expense = f.submit().await;

    assert!(expense.approvals.is_empty());
    assert!(expense.policy.is_none());
    assert_eq!(f.reload(&expense).await.status, ExpenseStatus::Pending);
}

#[tokio::test]
async fn test_invalid_submission_persists_nothing() {
    let f = fixture();

    let err = f
        .lifecycle
        .submit_expense(f.employee.id, claim(dec!(-5), CurrencyCode::USD))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Validation(_)));
    assert!(
        f.lifecycle
            .list_expenses(f.admin.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_unknown_employee() {
    let f = fixture();
    let err = f
        .lifecycle
        .submit_expense(UserId::new(), claim(dec!(5), CurrencyCode::EUR))
        .await
        .unwrap_err();
    assert_eq!(err, WorkflowError::not_found("user"));
}

#[tokio::test]
async fn test_manager_is_first_step() {
    let f = fixture();
    f.add_rule(new_rule(ApprovalType::Sequential, true, &[&f.director, &f.cfo]))
        .await;

    let expense = f.submit().await;

    let chain: Vec<_> = expense
        .approvals
        .iter()
        .map(|a| (a.approver_id, a.sequence_order))
        .collect();
    assert_eq!(
        chain,
        vec![(f.manager.id, 1), (f.director.id, 2), (f.cfo.id, 3)]
    );
}

#[tokio::test]
async fn test_first_created_rule_stays_active() {
    let f = fixture();
    let first = f
        .add_rule(new_rule(ApprovalType::Sequential, false, &[&f.director]))
        .await;
    f.add_rule(new_rule(ApprovalType::Sequential, false, &[&f.cfo, &f.finance]))
        .await;

    let expense = f.submit().await;

    assert_eq!(expense.policy.map(|p| p.rule_id), Some(first.id));
    assert_eq!(expense.approvals.len(), 1);
}

// Decisions

#[tokio::test]
async fn test_sequential_approves_when_all_approve() {
    let f = fixture();
    f.add_rule(new_rule(ApprovalType::Sequential, true, &[&f.director]))
        .await;
    let expense = f.submit().await;

    let expense = f.decide(&expense, &f.manager, Decision::Approved).await;
    assert_eq!(expense.status, ExpenseStatus::Pending);

    let expense = f.decide(&expense, &f.director, Decision::Approved).await;
    assert_eq!(expense.status, ExpenseStatus::Approved);
}

#[tokio::test]
async fn test_sequential_ordering_is_advisory() {
    let f = fixture();
    f.add_rule(new_rule(ApprovalType::Sequential, true, &[&f.director]))
        .await;
    let expense = f.submit().await;

    // The second step may decide before the first.
    let expense = f.decide(&expense, &f.director, Decision::Rejected).await;
    assert_eq!(expense.status, ExpenseStatus::Rejected);
}

#[tokio::test]
async fn test_percentage_approves_on_second_approval_in_any_order() {
    let f = fixture();
    let mut rule = new_rule(
        ApprovalType::Percentage,
        false,
        &[&f.manager, &f.director, &f.cfo, &f.finance],
    );
    rule.percentage_required = Some(50);
    f.add_rule(rule).await;
    let expense = f.submit().await;

    let expense = f.decide(&expense, &f.finance, Decision::Approved).await;
    assert_eq!(expense.status, ExpenseStatus::Pending);
    let expense = f.decide(&expense, &f.manager, Decision::Rejected).await;
    assert_eq!(expense.status, ExpenseStatus::Pending);
    let expense = f.decide(&expense, &f.director, Decision::Approved).await;
    assert_eq!(expense.status, ExpenseStatus::Approved);
}

#[tokio::test]
async fn test_percentage_rejects_once_unreachable() {
    let f = fixture();
    let mut rule = new_rule(
        ApprovalType::Percentage,
        false,
        &[&f.manager, &f.director, &f.cfo, &f.finance],
    );
    rule.percentage_required = Some(75);
    f.add_rule(rule).await;
    let expense = f.submit().await;

    let expense = f.decide(&expense, &f.manager, Decision::Rejected).await;
    assert_eq!(expense.status, ExpenseStatus::Pending);
    let expense = f.decide(&expense, &f.cfo, Decision::Rejected).await;
    assert_eq!(expense.status, ExpenseStatus::Rejected);
}

#[tokio::test]
async fn test_specific_approver_decides_alone() {
    let f = fixture();
    let mut rule = new_rule(ApprovalType::Specific, true, &[&f.director, &f.cfo]);
    rule.specific_approver_id = Some(f.cfo.id);
    f.add_rule(rule).await;

    let approved = f.submit().await;
    let approved = f.decide(&approved, &f.manager, Decision::Rejected).await;
    assert_eq!(approved.status, ExpenseStatus::Pending);
    let approved = f.decide(&approved, &f.cfo, Decision::Approved).await;
    assert_eq!(approved.status, ExpenseStatus::Approved);

    let rejected = f.submit().await;
    let rejected = f.decide(&rejected, &f.cfo, Decision::Rejected).await;
    assert_eq!(rejected.status, ExpenseStatus::Rejected);
}

#[tokio::test]
async fn test_hybrid_either_condition_approves() {
    let f = fixture();
    let mut rule = new_rule(
        ApprovalType::Hybrid,
        false,
        &[&f.manager, &f.director, &f.cfo, &f.finance],
    );
    rule.percentage_required = Some(50);
    rule.specific_approver_id = Some(f.cfo.id);
    f.add_rule(rule).await;

    // Two of four.
    let by_share = f.submit().await;
    assert_eq!(by_share.approvals[2].approver_id, f.cfo.id);
    let by_share = f.decide(&by_share, &f.manager, Decision::Approved).await;
    assert_eq!(by_share.status, ExpenseStatus::Pending);
    let by_share = f.decide(&by_share, &f.finance, Decision::Approved).await;
    assert_eq!(by_share.status, ExpenseStatus::Approved);

    // Step 3 alone.
    let by_specific = f.submit().await;
    let by_specific = f.decide(&by_specific, &f.cfo, Decision::Approved).await;
    assert_eq!(by_specific.status, ExpenseStatus::Approved);

    // Specific rejection wins over an earlier approval.
    let vetoed = f.submit().await;
    let vetoed = f.decide(&vetoed, &f.director, Decision::Approved).await;
    let vetoed = f.decide(&vetoed, &f.cfo, Decision::Rejected).await;
    assert_eq!(vetoed.status, ExpenseStatus::Rejected);
}

#[tokio::test]
async fn test_second_decision_is_rejected_and_state_unchanged() {
    let f = fixture();
    f.add_rule(new_rule(ApprovalType::Sequential, true, &[&f.director]))
        .await;
    let expense = f.submit().await;
    let step = expense.approvals[0].id;

    let decided = f
        .lifecycle
        .decide_approval(f.manager.id, step, Decision::Approved, Some("fine".into()))
        .await
        .unwrap();
    assert_eq!(decided.status, ApprovalStatus::Approved);
    let before = f.reload(&expense).await;

    let err = f
        .lifecycle
        .decide_approval(f.manager.id, step, Decision::Rejected, None)
        .await
        .unwrap_err();

    assert_eq!(err, WorkflowError::AlreadyDecided(step));
    assert_eq!(f.reload(&expense).await, before);
}

#[tokio::test]
async fn test_decision_on_finalized_expense() {
    let f = fixture();
    f.add_rule(new_rule(ApprovalType::Sequential, true, &[&f.director]))
        .await;
    let expense = f.submit().await;
    f.decide(&expense, &f.manager, Decision::Rejected).await;

    let director_step = expense.approvals[1].id;
    let err = f
        .lifecycle
        .decide_approval(f.director.id, director_step, Decision::Approved, None)
        .await
        .unwrap_err();

    assert_eq!(err, WorkflowError::ExpenseFinalized(expense.id));
}

#[tokio::test]
async fn test_only_designated_approver_may_decide() {
    let f = fixture();
    f.add_rule(new_rule(ApprovalType::Sequential, true, &[&f.director]))
        .await;
    let expense = f.submit().await;

    let err = f
        .lifecycle
        .decide_approval(f.cfo.id, expense.approvals[0].id, Decision::Approved, None)
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Forbidden(_)));
    assert_eq!(
        f.reload(&expense).await.approvals[0].status,
        ApprovalStatus::Pending
    );
}

#[tokio::test]
async fn test_unknown_step_and_foreign_company() {
    let f = fixture();
    f.add_rule(new_rule(ApprovalType::Sequential, false, &[&f.director]))
        .await;
    let expense = f.submit().await;

    let err = f
        .lifecycle
        .decide_approval(f.director.id, ExpenseApprovalId::new(), Decision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));

    let stranger = member(CompanyId::new(), "Stan", UserRole::Director, None);
    f.store.insert_user(stranger.clone());
    let err = f
        .lifecycle
        .decide_approval(stranger.id, expense.approvals[0].id, Decision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_decisions_do_not_lose_updates() {
    let f = fixture();
    let mut rule = new_rule(
        ApprovalType::Percentage,
        false,
        &[&f.manager, &f.director, &f.cfo, &f.finance],
    );
    rule.percentage_required = Some(100);
    f.add_rule(rule).await;
    let expense = f.submit().await;
    let lifecycle = Arc::new(f.lifecycle.clone());

    let handles: Vec<_> = expense
        .approvals
        .iter()
        .map(|step| {
            let lifecycle = Arc::clone(&lifecycle);
            let (approver, id) = (step.approver_id, step.id);
            tokio::spawn(async move {
                lifecycle
                    .decide_approval(approver, id, Decision::Approved, None)
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let expense = f.reload(&expense).await;
    assert!(
        expense
            .approvals
            .iter()
            .all(|a| a.status == ApprovalStatus::Approved)
    );
    assert_eq!(expense.status, ExpenseStatus::Approved);
}

// Rules

#[tokio::test]
async fn test_only_admins_create_rules() {
    let f = fixture();
    let err = f
        .lifecycle
        .create_rule(f.manager.id, new_rule(ApprovalType::Sequential, true, &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));
}

#[tokio::test]
async fn test_rule_approvers_must_be_eligible_colleagues() {
    let f = fixture();

    let err = f
        .lifecycle
        .create_rule(f.admin.id, new_rule(ApprovalType::Sequential, false, &[&f.employee]))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));

    let outsider = member(CompanyId::new(), "Otto", UserRole::Cfo, None);
    f.store.insert_user(outsider.clone());
    let err = f
        .lifecycle
        .create_rule(f.admin.id, new_rule(ApprovalType::Sequential, false, &[&outsider]))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));

    assert!(f.lifecycle.list_rules(f.admin.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rules_listed_oldest_first() {
    let f = fixture();
    let first = f
        .add_rule(new_rule(ApprovalType::Sequential, true, &[&f.director]))
        .await;
    let second = f
        .add_rule(new_rule(ApprovalType::Sequential, false, &[&f.cfo]))
        .await;

    let rules = f.lifecycle.list_rules(f.employee.id).await.unwrap();
    let ids: Vec<_> = rules.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert_eq!(rules[0].approvers.len(), 1);
}

// Listings

#[tokio::test]
async fn test_list_expenses_scoped_by_role() {
    let f = fixture();
    f.add_rule(new_rule(ApprovalType::Sequential, true, &[&f.cfo]))
        .await;
    let from_employee = f.submit().await;
    let from_director = f
        .lifecycle
        .submit_expense(f.director.id, claim(dec!(40), CurrencyCode::EUR))
        .await
        .unwrap();

    let ids = |expenses: Vec<Expense>| expenses.into_iter().map(|e| e.id).collect::<Vec<_>>();

    assert_eq!(
        ids(f.lifecycle.list_expenses(f.employee.id).await.unwrap()),
        vec![from_employee.id]
    );
    assert_eq!(
        ids(f.lifecycle.list_expenses(f.manager.id).await.unwrap()),
        vec![from_employee.id]
    );
    assert_eq!(
        ids(f.lifecycle.list_expenses(f.admin.id).await.unwrap()),
        vec![from_director.id, from_employee.id]
    );
    // The CFO sits on both chains.
    assert_eq!(
        ids(f.lifecycle.list_expenses(f.cfo.id).await.unwrap()),
        vec![from_director.id, from_employee.id]
    );
    assert!(
        f.lifecycle
            .list_expenses(f.finance.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_pending_approvals_follow_decisions() {
    let f = fixture();
    f.add_rule(new_rule(ApprovalType::Sequential, true, &[&f.director]))
        .await;
    let expense = f.submit().await;

    let pending = f.lifecycle.list_pending_approvals(f.manager.id).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].expense.id, expense.id);
    assert_eq!(pending[0].approval.id, expense.approvals[0].id);

    f.decide(&expense, &f.manager, Decision::Rejected).await;

    assert!(
        f.lifecycle
            .list_pending_approvals(f.manager.id)
            .await
            .unwrap()
            .is_empty()
    );
    // The expense is rejected, so the director has nothing left to do.
    assert!(
        f.lifecycle
            .list_pending_approvals(f.director.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_expense_chain_visibility() {
    let f = fixture();
    f.add_rule(new_rule(ApprovalType::Sequential, true, &[&f.director]))
        .await;
    let expense = f.submit().await;

    for viewer in [&f.employee, &f.manager, &f.director, &f.admin] {
        let chain = f.lifecycle.expense_chain(viewer.id, expense.id).await.unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].sequence_order, 1);
    }

    let err = f
        .lifecycle
        .expense_chain(f.finance.id, expense.id)
        .await
        .unwrap_err();
    assert_eq!(err, WorkflowError::not_found("expense"));
}

// Directory

#[tokio::test]
async fn test_assign_manager_rejects_cycles() {
    let f = fixture();

    // Mona manages Eve, so Eve cannot manage Mona.
    let err = f
        .lifecycle
        .assign_manager(f.admin.id, f.manager.id, Some(f.employee.id))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));

    let err = f
        .lifecycle
        .assign_manager(f.admin.id, f.director.id, Some(f.director.id))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposite_assignments_never_form_a_cycle() {
    let f = fixture();
    let lifecycle = Arc::new(f.lifecycle.clone());

    for round in 0..50 {
        let a = member(f.admin.company_id, &format!("A{round}"), UserRole::Manager, None);
        let b = member(f.admin.company_id, &format!("B{round}"), UserRole::Manager, None);
        f.store.insert_user(a.clone());
        f.store.insert_user(b.clone());

        let handles: Vec<_> = [(a.id, b.id), (b.id, a.id)]
            .into_iter()
            .map(|(user, manager)| {
                let lifecycle = Arc::clone(&lifecycle);
                let admin = f.admin.id;
                tokio::spawn(async move {
                    lifecycle.assign_manager(admin, user, Some(manager)).await
                })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => applied += 1,
                Err(err) => assert!(matches!(err, WorkflowError::Validation(_))),
            }
        }
        assert_eq!(applied, 1);

        let a = f.store.get_user(a.id).await.unwrap().unwrap();
        let b = f.store.get_user(b.id).await.unwrap().unwrap();
        assert!(!(a.manager_id == Some(b.id) && b.manager_id == Some(a.id)));
    }
}

#[tokio::test]
async fn test_assign_manager_updates_chain() {
    let f = fixture();
    f.add_rule(new_rule(ApprovalType::Sequential, true, &[]))
        .await;

    let updated = f
        .lifecycle
        .assign_manager(f.admin.id, f.employee.id, Some(f.director.id))
        .await
        .unwrap();
    assert_eq!(updated.manager_id, Some(f.director.id));

    let expense = f.submit().await;
    assert_eq!(expense.approvals.len(), 1);
    assert_eq!(expense.approvals[0].approver_id, f.director.id);

    let cleared = f
        .lifecycle
        .assign_manager(f.admin.id, f.employee.id, None)
        .await
        .unwrap();
    assert_eq!(cleared.manager_id, None);
}

#[tokio::test]
async fn test_assign_manager_requires_admin_and_same_company() {
    let f = fixture();

    let err = f
        .lifecycle
        .assign_manager(f.manager.id, f.employee.id, Some(f.director.id))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));

    let outsider = member(CompanyId::new(), "Olga", UserRole::Manager, None);
    f.store.insert_user(outsider.clone());
    let err = f
        .lifecycle
        .assign_manager(f.admin.id, f.employee.id, Some(outsider.id))
        .await
        .unwrap_err();
    assert_eq!(err, WorkflowError::not_found("manager"));
}
