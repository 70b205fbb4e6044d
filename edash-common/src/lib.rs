//! # edash Common Library
//!
//! Shared code for the efficiency dashboard service including:
//! - Database schema initialization and row models
//! - Access policy (role evaluation and record scoping)
//! - Caller identity hash validation
//! - Configuration loading
//! - Time helpers for month bucketing

pub mod access;
pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod time;

pub use access::{Decision, Role, Scope};
pub use error::{Error, Result};
