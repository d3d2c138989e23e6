//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes over the expense lifecycle
//! - Bearer token authentication middleware
//! - Error responses for workflow failures and unreadable requests
//! - The HTTP exchange-rate converter

pub mod error;
pub mod exchange;
pub mod extract;
pub mod middleware;
pub mod routes;

use axum::{Router, http::header::AUTHORIZATION};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use claimflow_core::workflow::ExpenseLifecycle;
use claimflow_shared::JwtService;

/// Upper bound for handling one request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Expense workflow operations.
    pub lifecycle: Arc<ExpenseLifecycle>,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(SetSensitiveRequestHeadersLayer::new([AUTHORIZATION]))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
