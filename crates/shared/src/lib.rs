//! Shared types, errors, and configuration for Claimflow.
//!
//! This crate provides common types used across all other crates:
//! - Money and currency codes with decimal precision
//! - Typed IDs for type-safe entity references
//! - Application-wide error types
//! - Configuration management
//! - JWT claims and the token service backing the identity provider

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtError, JwtService};
