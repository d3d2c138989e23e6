//! Approval rule management routes.

use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get,
};
use serde_json::json;

use claimflow_core::workflow::NewApprovalRule;

use crate::error::workflow_error_response;
use crate::extract::ApiJson;
use crate::{AppState, middleware::AuthUser};

/// Creates the approval rules routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/approval-rules",
        get(list_approval_rules).post(create_approval_rule),
    )
}

/// GET `/approval-rules` - Rules of the caller's company, oldest first.
///
/// The first rule is the one applied to new submissions.
async fn list_approval_rules(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    match state.lifecycle.list_rules(auth.user_id()).await {
        Ok(rules) => (StatusCode::OK, Json(json!({ "data": rules }))).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

/// POST `/approval-rules` - Create a rule (admins only).
async fn create_approval_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<NewApprovalRule>,
) -> impl IntoResponse {
    match state.lifecycle.create_rule(auth.user_id(), payload).await {
        Ok(rule) => (StatusCode::CREATED, Json(rule)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}
