//! Claimflow API Server
//!
//! Main entry point for the expense approval service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use claimflow_api::exchange::ExchangeRateApiClient;
use claimflow_api::{AppState, create_router};
use claimflow_core::workflow::ExpenseLifecycle;
use claimflow_db::{ApprovalRuleRepository, DirectoryRepository, ExpenseRepository, connect};
use claimflow_shared::{AppConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "claimflow=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to database
    let db = connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!("Connected to database");

    // Exchange rates
    let converter = ExchangeRateApiClient::new(&config.exchange)?;
    info!(
        base_url = %config.exchange.base_url,
        timeout_ms = config.exchange.timeout_ms,
        cache_ttl_secs = config.exchange.cache_ttl_secs,
        "Exchange rate provider configured"
    );

    let lifecycle = ExpenseLifecycle::new(
        Arc::new(DirectoryRepository::new(db.clone())),
        Arc::new(ApprovalRuleRepository::new(db.clone())),
        Arc::new(ExpenseRepository::new(db)),
        Arc::new(converter),
    )
    .with_conversion_timeout(Duration::from_millis(config.exchange.timeout_ms));

    // Create application state
    let state = AppState {
        lifecycle: Arc::new(lifecycle),
        jwt_service: Arc::new(JwtService::new(&config.jwt)),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
