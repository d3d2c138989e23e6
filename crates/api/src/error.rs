//! HTTP responses for workflow and request failures.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use claimflow_core::workflow::WorkflowError;
use claimflow_shared::AppError;

/// Renders a workflow error as `{"error": CODE, "message": text}`.
///
/// Server-side failures are logged; client errors are not.
pub fn workflow_error_response(err: &WorkflowError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!(error = %err, code = err.error_code(), "Request failed");
    }

    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": err.to_string(),
        })),
    )
        .into_response()
}

/// Renders an [`AppError`] in the same shape as workflow errors.
///
/// Server-side details are logged and replaced with a generic message.
pub fn app_error_response(err: &AppError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = if err.is_client_error() {
        err.to_string()
    } else {
        error!(error = %err, code = err.error_code(), "Request failed");
        "Internal server error".to_string()
    };

    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": message,
        })),
    )
        .into_response()
}

/// Response for a request body the handler could not interpret.
pub fn bad_request(message: impl Into<String>) -> Response {
    app_error_response(&AppError::Validation(message.into()))
}
