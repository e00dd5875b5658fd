//! Shared types and configuration for Saldo.
//!
//! This crate provides common types used across all other crates:
//! - Money types with decimal precision
//! - Typed IDs for type-safe entity references
//! - Pagination types for list queries
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;
