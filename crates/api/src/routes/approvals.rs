//! Approval inbox and decision routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use serde::Deserialize;
use serde_json::json;

use claimflow_core::workflow::Decision;
use claimflow_shared::types::ExpenseApprovalId;

use crate::error::workflow_error_response;
use crate::extract::{ApiJson, ApiPath};
use crate::{AppState, middleware::AuthUser};

/// Creates the approval routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/approvals", get(list_pending_approvals))
        .route("/approvals/{approval_id}", patch(decide_approval))
}

/// Request body for deciding an approval step.
#[derive(Debug, Deserialize)]
pub struct DecideApprovalRequest {
    /// `approved` or `rejected`.
    pub decision: Decision,
    /// Optional note kept on the step.
    #[serde(default)]
    pub comments: Option<String>,
}

/// GET `/approvals` - Steps waiting on the caller.
async fn list_pending_approvals(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    match state.lifecycle.list_pending_approvals(auth.user_id()).await {
        Ok(pending) => (StatusCode::OK, Json(json!({ "data": pending }))).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

/// PATCH `/approvals/{approval_id}` - Approve or reject a step.
async fn decide_approval(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(approval_id): ApiPath<ExpenseApprovalId>,
    ApiJson(payload): ApiJson<DecideApprovalRequest>,
) -> impl IntoResponse {
    match state
        .lifecycle
        .decide_approval(
            auth.user_id(),
            approval_id,
            payload.decision,
            payload.comments,
        )
        .await
    {
        Ok(approval) => (StatusCode::OK, Json(approval)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}
