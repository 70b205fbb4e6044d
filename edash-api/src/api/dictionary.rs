//! Dictionary CRUD endpoints
//!
//! `/api/dict/{departments|positions|access-groups}`; reads are open to any
//! caller, writes need `admin`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use edash_common::api::CallerIdentity;
use edash_common::db::DictionaryEntry;
use edash_common::Role;

use super::identity::require_roles;
use crate::db::dictionary::{self, DictionaryKind, DictionaryRequest};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

fn kind_from_path(segment: &str) -> ApiResult<DictionaryKind> {
    DictionaryKind::from_path_segment(segment)
        .ok_or_else(|| ApiError::NotFound(format!("dictionary {:?}", segment)))
}

fn json_body(body: Result<Json<DictionaryRequest>, JsonRejection>) -> ApiResult<DictionaryRequest> {
    body.map(|Json(request)| request)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// GET /api/dict/:kind
pub async fn list_entries(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<Vec<DictionaryEntry>>> {
    let kind = kind_from_path(&kind)?;
    Ok(Json(dictionary::list(&state.db, kind).await?))
}

/// POST /api/dict/:kind
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(kind): Path<String>,
    body: Result<Json<DictionaryRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DictionaryEntry>)> {
    let kind = kind_from_path(&kind)?;
    require_roles(&caller, &[Role::Admin])?;

    let request = json_body(body)?;
    let entry = dictionary::create(&state.db, kind, &request).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// PUT /api/dict/:kind/:id
pub async fn update_entry(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((kind, id)): Path<(String, i64)>,
    body: Result<Json<DictionaryRequest>, JsonRejection>,
) -> ApiResult<Json<DictionaryEntry>> {
    let kind = kind_from_path(&kind)?;
    require_roles(&caller, &[Role::Admin])?;

    let request = json_body(body)?;
    Ok(Json(dictionary::update(&state.db, kind, id, &request).await?))
}

/// DELETE /api/dict/:kind/:id
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((kind, id)): Path<(String, i64)>,
) -> ApiResult<StatusCode> {
    let kind = kind_from_path(&kind)?;
    require_roles(&caller, &[Role::Admin])?;

    dictionary::soft_delete(&state.db, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build dictionary routes
pub fn dictionary_routes() -> Router<AppState> {
    Router::new()
        .route("/api/dict/:kind", get(list_entries).post(create_entry))
        .route("/api/dict/:kind/:id", put(update_entry).delete(delete_entry))
}
