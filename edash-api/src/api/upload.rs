//! Upload preview and confirm endpoints
//!
//! - POST /api/upload, /api/upload/confirm: shift layout
//! - POST /api/upload/snapshots, /api/upload/snapshots/confirm: snapshot
//!   layout, owned by the caller
//! - GET /api/upload/snapshots: the caller's stored snapshots

use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        State,
    },
    routing::post,
    Extension, Json, Router,
};
use edash_common::api::CallerIdentity;
use edash_common::{time, Role};
use serde::Serialize;

use super::identity::require_roles;
use crate::db::snapshots::{self, StoredSnapshot};
use crate::error::{ApiError, ApiResult};
use crate::ingest::{
    confirm_shifts, confirm_snapshots, preview_upload, stamp_owner, ConfirmOutcome,
    IngestOptions, Preview, ShiftRow, SnapshotRow, TabularRecord, Upload,
};
use crate::AppState;

/// Confirm response body
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub message: String,
    pub added: usize,
    pub errors: Vec<String>,
}

impl From<ConfirmOutcome> for ConfirmResponse {
    fn from(outcome: ConfirmOutcome) -> Self {
        Self {
            message: outcome.message(),
            added: outcome.added,
            errors: outcome.errors,
        }
    }
}

/// POST /api/upload
pub async fn upload_shifts(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Preview<ShiftRow>>> {
    require_roles(&caller, Role::ELEVATED)?;

    let upload = read_upload(multipart).await?;
    let preview = run_preview::<ShiftRow>(&state, upload).await?;
    Ok(Json(preview))
}

/// POST /api/upload/confirm
pub async fn confirm_shift_upload(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    rows: Result<Json<Vec<ShiftRow>>, JsonRejection>,
) -> ApiResult<Json<ConfirmResponse>> {
    require_roles(&caller, Role::ELEVATED)?;

    let Json(rows) = rows.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let outcome = confirm_shifts(&state.db, &rows).await;
    Ok(Json(outcome.into()))
}

/// POST /api/upload/snapshots
pub async fn upload_snapshots(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Preview<SnapshotRow>>> {
    require_roles(&caller, Role::ELEVATED)?;

    let upload = read_upload(multipart).await?;
    let mut preview = run_preview::<SnapshotRow>(&state, upload).await?;
    stamp_owner(&mut preview, caller.user_id);
    Ok(Json(preview))
}

/// POST /api/upload/snapshots/confirm
pub async fn confirm_snapshot_upload(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    rows: Result<Json<Vec<SnapshotRow>>, JsonRejection>,
) -> ApiResult<Json<ConfirmResponse>> {
    require_roles(&caller, Role::ELEVATED)?;

    let Json(rows) = rows.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let outcome = confirm_snapshots(&state.db, caller.user_id, &rows, time::now()).await;
    Ok(Json(outcome.into()))
}

/// GET /api/upload/snapshots
pub async fn list_snapshots(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<Json<Vec<StoredSnapshot>>> {
    let rows = snapshots::list_snapshots(&state.db, caller.user_id).await?;
    Ok(Json(rows))
}

/// Take the `file` field out of a multipart body
async fn read_upload(multipart: Result<Multipart, MultipartRejection>) -> ApiResult<Upload> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        return Ok(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::BadRequest("file is required".to_string()))
}

/// Decode and parse on the blocking pool
async fn run_preview<T>(state: &AppState, upload: Upload) -> ApiResult<Preview<T>>
where
    T: TabularRecord + Send + 'static,
{
    let options = IngestOptions {
        parse_mode: state.settings.parse_mode,
        temp_dir: state.settings.temp_dir.clone(),
    };

    let preview = tokio::task::spawn_blocking(move || preview_upload::<T>(&upload, &options))
        .await
        .map_err(|e| ApiError::Internal(format!("preview task failed: {}", e)))??;

    Ok(preview)
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload_shifts))
        .route("/api/upload/confirm", post(confirm_shift_upload))
        .route(
            "/api/upload/snapshots",
            post(upload_snapshots).get(list_snapshots),
        )
        .route(
            "/api/upload/snapshots/confirm",
            post(confirm_snapshot_upload),
        )
}
