//! Core business logic for Claimflow.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage and exchange rates are reached through the traits in
//! `workflow::ports` and `currency::converter`.
//!
//! # Modules
//!
//! - `workflow` - Approval rules, chains, decision evaluation and the lifecycle controller
//! - `currency` - Currency conversion and rounding

pub mod currency;
pub mod workflow;
