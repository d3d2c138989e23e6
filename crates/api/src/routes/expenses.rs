//! Expense submission and listing routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use claimflow_core::workflow::NewExpense;
use claimflow_shared::types::{CurrencyCode, ExpenseId};

use crate::error::{bad_request, workflow_error_response};
use crate::extract::{ApiJson, ApiPath};
use crate::{AppState, middleware::AuthUser};

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses).post(submit_expense))
        .route("/expenses/{expense_id}/approvals", get(expense_chain))
}

/// Request body for submitting an expense.
#[derive(Debug, Deserialize)]
pub struct SubmitExpenseRequest {
    /// Amount in the entered currency.
    pub amount: Decimal,
    /// Three-letter currency code of `amount`.
    pub currency: String,
    /// Expense category.
    pub category: String,
    /// Free-text description.
    pub description: String,
    /// Date the expense was incurred.
    pub expense_date: NaiveDate,
}

/// POST `/expenses` - Submit an expense for approval.
async fn submit_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<SubmitExpenseRequest>,
) -> impl IntoResponse {
    let currency = match CurrencyCode::parse(&payload.currency) {
        Ok(code) => code,
        Err(message) => return bad_request(message),
    };

    let input = NewExpense {
        amount: payload.amount,
        currency,
        category: payload.category,
        description: payload.description,
        expense_date: payload.expense_date,
    };

    match state.lifecycle.submit_expense(auth.user_id(), input).await {
        Ok(expense) => (StatusCode::CREATED, Json(expense)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

/// GET `/expenses` - Expenses visible to the caller, newest first.
async fn list_expenses(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    match state.lifecycle.list_expenses(auth.user_id()).await {
        Ok(expenses) => (StatusCode::OK, Json(json!({ "data": expenses }))).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

/// GET `/expenses/{expense_id}/approvals` - The approval chain of an expense.
async fn expense_chain(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(expense_id): ApiPath<ExpenseId>,
) -> impl IntoResponse {
    match state.lifecycle.expense_chain(auth.user_id(), expense_id).await {
        Ok(chain) => (StatusCode::OK, Json(json!({ "data": chain }))).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}
