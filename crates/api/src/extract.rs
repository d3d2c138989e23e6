//! Request extractors whose rejections use the API error shape.
//!
//! Axum's own `Json` and `Path` reject with plain-text bodies; these wrappers
//! turn the same failures into `{"error": "VALIDATION_ERROR", "message": ...}`.

use axum::{
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection},
    },
    response::{IntoResponse, Response},
};

use crate::error::bad_request;

/// A request body or path that could not be interpreted.
#[derive(Debug)]
pub struct InvalidRequest(Response);

impl From<JsonRejection> for InvalidRequest {
    fn from(rejection: JsonRejection) -> Self {
        Self(bad_request(rejection.body_text()))
    }
}

impl From<PathRejection> for InvalidRequest {
    fn from(rejection: PathRejection) -> Self {
        Self(bad_request(rejection.body_text()))
    }
}

impl IntoResponse for InvalidRequest {
    fn into_response(self) -> Response {
        self.0
    }
}

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(InvalidRequest))]
pub struct ApiJson<T>(pub T);

/// Typed path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(InvalidRequest))]
pub struct ApiPath<T>(pub T);
