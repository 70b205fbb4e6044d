//! edash-api library interface
//!
//! Exposes the router and state so integration tests can drive the service
//! without binding a socket.

pub mod api;
pub mod db;
pub mod error;
pub mod ingest;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use edash_common::config::{ParseMode, TomlConfig};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Request-independent settings derived from configuration at startup
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub parse_mode: ParseMode,
    /// Directory for staged upload files
    pub temp_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// 0 disables caller hash verification
    pub shared_secret: i64,
    pub cors_origins: Vec<String>,
}

impl ServiceSettings {
    pub fn from_config(config: &TomlConfig, root_folder: &Path) -> Self {
        Self {
            parse_mode: config.ingest.parse_mode,
            temp_dir: config.temp_dir(root_folder),
            max_upload_bytes: config.ingest.max_upload_bytes,
            shared_secret: config.auth.shared_secret,
            cors_origins: config.server.cors_origins.clone(),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub settings: Arc<ServiceSettings>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, settings: ServiceSettings) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Everything under `/api` requires a caller identity; `/health` does not.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let upload_limit = DefaultBodyLimit::max(state.settings.max_upload_bytes);

    // Protected routes (require caller identity)
    let protected = Router::new()
        .merge(api::upload_routes().layer(upload_limit))
        .merge(api::dashboard_routes())
        .merge(api::dictionary_routes())
        .merge(api::employee_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::identity_middleware,
        ));

    // Public routes
    let public = Router::new().merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(cors_layer(&state.settings.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the browser dashboard; unparsable origins are skipped
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| origin.parse::<HeaderValue>().ok()))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            HeaderName::from_static(api::identity::CALLER_ID_HEADER),
            HeaderName::from_static(api::identity::CALLER_ROLES_HEADER),
            HeaderName::from_static(api::identity::CALLER_TIMESTAMP_HEADER),
            HeaderName::from_static(api::identity::CALLER_HASH_HEADER),
        ])
        .max_age(Duration::from_secs(12 * 60 * 60))
}
