//! Caller identity verification
//!
//! The upstream authentication layer resolves tokens and forwards the caller
//! as an opaque user id plus a set of access-group codes. When a shared
//! secret is configured, it also forwards a timestamp (Unix epoch ms) and a
//! SHA-256 hash binding identity, roles and timestamp to the secret:
//!
//! ```text
//! hash = hex(SHA-256("{user_id}:{roles joined by ','}:{timestamp}:{secret}"))
//! ```
//!
//! - Timestamp must be ≤1000ms in the past and ≤1ms in the future
//! - Shared secret 0 disables hash checking entirely

use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Maximum accepted age of a caller timestamp
pub const MAX_PAST_MS: i64 = 1000;

/// Maximum accepted clock drift into the future
pub const MAX_FUTURE_MS: i64 = 1;

/// Authenticated caller as supplied by the upstream layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: i64,
    /// Access group codes, as forwarded (order preserved)
    pub roles: Vec<String>,
}

impl CallerIdentity {
    pub fn new(user_id: i64, roles: Vec<String>) -> Self {
        Self { user_id, roles }
    }

    /// Parse a comma-separated role header value; blank entries are dropped
    pub fn parse_roles(header: &str) -> Vec<String> {
        header
            .split(',')
            .map(|r| r.trim().to_ascii_lowercase())
            .filter(|r| !r.is_empty())
            .collect()
    }

    fn canonical(&self, timestamp: i64) -> String {
        format!("{}:{}:{}", self.user_id, self.roles.join(","), timestamp)
    }
}

/// Authentication error types
#[derive(Debug, Clone, Error)]
pub enum ApiAuthError {
    /// Timestamp outside acceptable window
    #[error("Invalid timestamp: {reason}")]
    InvalidTimestamp {
        timestamp: i64,
        now: i64,
        reason: String,
    },

    /// Hash does not match calculated value
    #[error("Invalid hash")]
    InvalidHash { provided: String, calculated: String },

    /// Required identity header missing or malformed
    #[error("Missing or malformed header: {0}")]
    MissingHeader(&'static str),
}

/// Validate a caller timestamp against the current clock
pub fn validate_timestamp(timestamp: i64) -> Result<(), ApiAuthError> {
    validate_timestamp_at(timestamp, Utc::now().timestamp_millis())
}

/// Validate a caller timestamp against an explicit `now` (Unix ms)
pub fn validate_timestamp_at(timestamp: i64, now: i64) -> Result<(), ApiAuthError> {
    let diff = now - timestamp;

    if diff > MAX_PAST_MS {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!("Timestamp {}ms too old (max {}ms past)", diff, MAX_PAST_MS),
        });
    }

    if diff < -MAX_FUTURE_MS {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!(
                "Timestamp {}ms in future (max {}ms future)",
                diff.abs(),
                MAX_FUTURE_MS
            ),
        });
    }

    Ok(())
}

/// Calculate the identity hash as 64 lowercase hex characters
pub fn calculate_hash(identity: &CallerIdentity, timestamp: i64, shared_secret: i64) -> String {
    let to_hash = format!("{}:{}", identity.canonical(timestamp), shared_secret);

    let mut hasher = Sha256::new();
    hasher.update(to_hash.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Validate a provided hash against the calculated one
pub fn validate_hash(
    provided_hash: &str,
    identity: &CallerIdentity,
    timestamp: i64,
    shared_secret: i64,
) -> Result<(), ApiAuthError> {
    let calculated = calculate_hash(identity, timestamp, shared_secret);

    if !provided_hash.eq_ignore_ascii_case(&calculated) {
        return Err(ApiAuthError::InvalidHash {
            provided: provided_hash.to_string(),
            calculated,
        });
    }

    Ok(())
}
