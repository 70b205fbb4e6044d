//! Caller identity middleware and access helpers
//!
//! The upstream authentication layer forwards the caller in headers. This
//! middleware verifies them (hash + timestamp when a shared secret is set)
//! and stores a [`CallerIdentity`] in request extensions for handlers.
//!
//! Health endpoint (/health) does NOT use this middleware.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use edash_common::access::{evaluate, is_elevated};
use edash_common::api::{validate_hash, validate_timestamp, ApiAuthError, CallerIdentity};
use edash_common::{Role, Scope};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const CALLER_ID_HEADER: &str = "x-caller-id";
pub const CALLER_ROLES_HEADER: &str = "x-caller-roles";
pub const CALLER_TIMESTAMP_HEADER: &str = "x-caller-timestamp";
pub const CALLER_HASH_HEADER: &str = "x-caller-hash";

/// Identity middleware
///
/// Returns 401 Unauthorized if headers are missing or fail verification.
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = caller_from_headers(request.headers(), state.settings.shared_secret)?;
    debug!(user_id = identity.user_id, roles = ?identity.roles, "Caller identified");

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Read and verify the forwarded caller headers
pub fn caller_from_headers(headers: &HeaderMap, shared_secret: i64) -> ApiResult<CallerIdentity> {
    let user_id = header_str(headers, CALLER_ID_HEADER)
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or_else(|| unauthorized(ApiAuthError::MissingHeader(CALLER_ID_HEADER)))?;

    let roles = CallerIdentity::parse_roles(header_str(headers, CALLER_ROLES_HEADER).unwrap_or(""));
    let identity = CallerIdentity::new(user_id, roles);

    // Secret 0 disables verification
    if shared_secret == 0 {
        return Ok(identity);
    }

    let timestamp = header_str(headers, CALLER_TIMESTAMP_HEADER)
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or_else(|| unauthorized(ApiAuthError::MissingHeader(CALLER_TIMESTAMP_HEADER)))?;
    let hash = header_str(headers, CALLER_HASH_HEADER)
        .ok_or_else(|| unauthorized(ApiAuthError::MissingHeader(CALLER_HASH_HEADER)))?;

    validate_timestamp(timestamp).map_err(unauthorized)?;

    validate_hash(hash, &identity, timestamp, shared_secret).map_err(|e| {
        if let ApiAuthError::InvalidHash {
            ref provided,
            ref calculated,
        } = e
        {
            warn!(
                "Hash validation failed: provided={}, calculated={}",
                provided, calculated
            );
        }
        unauthorized(e)
    })?;

    Ok(identity)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn unauthorized(err: ApiAuthError) -> ApiError {
    ApiError::Unauthorized(err.to_string())
}

/// 403 unless the caller holds one of `required`
pub fn require_roles(caller: &CallerIdentity, required: &[Role]) -> ApiResult<()> {
    if evaluate(&caller.roles, required).is_allowed() {
        Ok(())
    } else {
        let codes: Vec<&str> = required.iter().map(|role| role.code()).collect();
        Err(ApiError::Forbidden(format!(
            "requires one of: {}",
            codes.join(", ")
        )))
    }
}

/// Records the caller may read.
///
/// Elevated callers skip the account lookup; everyone else must exist in
/// `users`, and sees only the employee linked there.
pub async fn resolve_scope(pool: &SqlitePool, caller: &CallerIdentity) -> ApiResult<Scope> {
    if is_elevated(&caller.roles) {
        return Ok(Scope::All);
    }

    let user = users::find_user(pool, caller.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(format!("unknown caller {}", caller.user_id)))?;

    Ok(Scope::for_caller(&caller.roles, user.employee_id))
}
