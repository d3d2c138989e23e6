//! User administration routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::patch,
};
use serde::Deserialize;

use claimflow_shared::types::UserId;

use crate::error::workflow_error_response;
use crate::extract::{ApiJson, ApiPath};
use crate::{AppState, middleware::AuthUser};

/// Creates the user routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/users/{user_id}/manager", patch(assign_manager))
}

/// Request body for setting a manager; `null` clears it.
#[derive(Debug, Deserialize)]
pub struct AssignManagerRequest {
    /// New manager, in the same company.
    pub manager_id: Option<UserId>,
}

/// PATCH `/users/{user_id}/manager` - Set or clear a user's manager (admins only).
async fn assign_manager(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(user_id): ApiPath<UserId>,
    ApiJson(payload): ApiJson<AssignManagerRequest>,
) -> impl IntoResponse {
    match state
        .lifecycle
        .assign_manager(auth.user_id(), user_id, payload.manager_id)
        .await
    {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}
