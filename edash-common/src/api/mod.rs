//! Shared HTTP API functionality
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Shared types
//!
//! The service wraps these with axum middleware.

pub mod auth;

pub use auth::{
    calculate_hash, validate_hash, validate_timestamp, validate_timestamp_at, ApiAuthError,
    CallerIdentity,
};
