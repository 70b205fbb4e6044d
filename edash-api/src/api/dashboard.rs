//! Dashboard endpoint

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::NaiveDate;
use edash_common::api::CallerIdentity;
use edash_common::time;
use serde::Deserialize;
use tracing::debug;

use super::identity::resolve_scope;
use crate::db::dashboard::{dashboard_summary, DashboardFilter, DashboardSummary};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Optional inclusive `YYYY-MM-DD` window on shift start
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// GET /api/dashboard/summary
///
/// Any authenticated caller; non-elevated callers see only their own shifts.
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> ApiResult<Json<DashboardSummary>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if let (Some(from), Some(to)) = (query.date_from, query.date_to) {
        if from > to {
            return Err(ApiError::BadRequest(format!(
                "date_from {} is after date_to {}",
                from, to
            )));
        }
    }

    let scope = resolve_scope(&state.db, &caller).await?;
    debug!(user_id = caller.user_id, ?scope, "Computing dashboard");

    let filter = DashboardFilter {
        scope,
        date_from: query.date_from,
        date_to: query.date_to,
    };
    let summary = dashboard_summary(&state.db, &filter, time::now()).await?;
    Ok(Json(summary))
}

/// Build dashboard routes
pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/api/dashboard/summary", get(get_summary))
}
