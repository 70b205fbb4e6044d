//! Employee, work listing and profile endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use edash_common::api::CallerIdentity;
use edash_common::db::{EmployeeFull, WorkSummary};
use edash_common::Role;
use serde::Serialize;

use super::identity::{require_roles, resolve_scope};
use crate::db::employees::{self, EmployeeRequest};
use crate::db::users::{self, ProfileEmployee};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

fn json_body(body: Result<Json<EmployeeRequest>, JsonRejection>) -> ApiResult<EmployeeRequest> {
    body.map(|Json(request)| request)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// GET /api/employees
pub async fn list_employees(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<Json<Vec<EmployeeFull>>> {
    let scope = resolve_scope(&state.db, &caller).await?;
    Ok(Json(employees::list_employees(&state.db, scope).await?))
}

/// GET /api/employees/:id
pub async fn get_employee(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<Json<EmployeeFull>> {
    let scope = resolve_scope(&state.db, &caller).await?;
    if !scope.can_access(id) {
        return Err(ApiError::Forbidden(format!("employee {} is not yours", id)));
    }

    Ok(Json(employees::get_employee(&state.db, id).await?))
}

/// POST /api/employees
pub async fn create_employee(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    body: Result<Json<EmployeeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<EmployeeFull>)> {
    require_roles(&caller, Role::ELEVATED)?;

    let request = json_body(body)?;
    let employee = employees::create_employee(&state.db, &request).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

/// PUT /api/employees/:id
pub async fn update_employee(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<i64>,
    body: Result<Json<EmployeeRequest>, JsonRejection>,
) -> ApiResult<Json<EmployeeFull>> {
    require_roles(&caller, Role::ELEVATED)?;

    let request = json_body(body)?;
    Ok(Json(employees::update_employee(&state.db, id, &request).await?))
}

/// DELETE /api/employees/:id
pub async fn delete_employee(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    require_roles(&caller, Role::ELEVATED)?;

    employees::delete_employee(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/employees/work
pub async fn list_work(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<Json<Vec<WorkSummary>>> {
    let scope = resolve_scope(&state.db, &caller).await?;
    Ok(Json(employees::list_work(&state.db, scope).await?))
}

/// DELETE /api/employees/work/:employee_id
pub async fn delete_work(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(employee_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let scope = resolve_scope(&state.db, &caller).await?;
    if !scope.can_access(employee_id) {
        return Err(ApiError::Forbidden(format!(
            "work records of employee {} are not yours",
            employee_id
        )));
    }

    employees::delete_work(&state.db, employee_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Profile response
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub email: String,
    pub name: String,
    pub employee: Option<ProfileEmployee>,
}

/// GET /api/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = users::find_user(&state.db, caller.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {}", caller.user_id)))?;

    let employee = match user.employee_id {
        Some(id) => users::linked_employee(&state.db, id).await?,
        None => None,
    };

    Ok(Json(ProfileResponse {
        email: user.email,
        name: user.name,
        employee,
    }))
}

/// Build employee routes
pub fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/api/employees", get(list_employees).post(create_employee))
        .route("/api/employees/work", get(list_work))
        .route("/api/employees/work/:employee_id", delete(delete_work))
        .route(
            "/api/employees/:id",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route("/api/profile", get(get_profile))
}
