//! Employees, HR records and per-shift work listings

use crate::error::{is_foreign_key_violation, ApiError, ApiResult};
use chrono::NaiveDate;
use edash_common::db::{EmployeeFull, WorkSummary};
use edash_common::Scope;
use serde::Deserialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

/// Create/update payload: employee name plus HR fields
#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeRequest {
    pub last_name: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    pub department_id: i64,
    pub position_id: i64,
    #[serde(default)]
    pub is_remote: bool,
    /// `YYYY-MM-DD`
    pub birth_date: String,
    /// `YYYY-MM-DD`
    pub hire_date: String,
    #[serde(default)]
    pub salary: f64,
}

impl EmployeeRequest {
    /// Check names and normalize both dates to `YYYY-MM-DD`
    fn validated(&self) -> ApiResult<(String, String)> {
        if self.last_name.trim().is_empty() || self.first_name.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "last_name and first_name are required".to_string(),
            ));
        }
        let birth = parse_date("birth_date", &self.birth_date)?;
        let hire = parse_date("hire_date", &self.hire_date)?;
        Ok((birth, hire))
    }
}

fn parse_date(field: &str, value: &str) -> ApiResult<String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .map_err(|_| {
            ApiError::BadRequest(format!("invalid {field} format, expected YYYY-MM-DD"))
        })
}

fn map_hr_error(err: sqlx::Error) -> ApiError {
    if is_foreign_key_violation(&err) {
        ApiError::BadRequest("unknown department_id or position_id".to_string())
    } else {
        ApiError::Database(err)
    }
}

const EMPLOYEE_SELECT: &str = r#"
    SELECT
        e.id, e.last_name, e.first_name, e.middle_name,
        d.name AS department, p.name AS position,
        hr.is_remote, hr.birth_date, hr.hire_date, hr.fire_date, hr.salary,
        e.created_at
    FROM employee_hr hr
    JOIN employees e ON e.id = hr.employee_id AND e.deleted_at IS NULL
    JOIN departments d ON d.id = hr.department_id AND d.deleted_at IS NULL
    JOIN positions p ON p.id = hr.position_id AND p.deleted_at IS NULL
    WHERE hr.deleted_at IS NULL
"#;

/// Employees visible within `scope`, ordered by id
pub async fn list_employees(pool: &SqlitePool, scope: Scope) -> ApiResult<Vec<EmployeeFull>> {
    let (all, employee_id) = scope.sql_params();
    let sql = format!("{EMPLOYEE_SELECT} AND (? = 1 OR e.id = ?) ORDER BY e.id");

    Ok(sqlx::query_as(&sql)
        .bind(all)
        .bind(employee_id)
        .fetch_all(pool)
        .await?)
}

pub async fn get_employee(pool: &SqlitePool, id: i64) -> ApiResult<EmployeeFull> {
    let sql = format!("{EMPLOYEE_SELECT} AND e.id = ?");

    sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("employee {}", id)))
}

/// Create the employee and its HR record atomically
pub async fn create_employee(pool: &SqlitePool, request: &EmployeeRequest) -> ApiResult<EmployeeFull> {
    let (birth_date, hire_date) = request.validated()?;

    let mut tx = pool.begin().await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO employees (last_name, first_name, middle_name) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(request.last_name.trim())
    .bind(request.first_name.trim())
    .bind(request.middle_name.trim())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO employee_hr
            (employee_id, department_id, position_id, is_remote, birth_date, hire_date, salary)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(request.department_id)
    .bind(request.position_id)
    .bind(request.is_remote)
    .bind(&birth_date)
    .bind(&hire_date)
    .bind(request.salary)
    .execute(&mut *tx)
    .await
    .map_err(map_hr_error)?;

    tx.commit().await?;
    info!(employee_id = id, "Employee created");

    get_employee(pool, id).await
}

/// Replace name and HR fields of a live employee atomically
pub async fn update_employee(
    pool: &SqlitePool,
    id: i64,
    request: &EmployeeRequest,
) -> ApiResult<EmployeeFull> {
    let (birth_date, hire_date) = request.validated()?;

    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE employees
        SET last_name = ?, first_name = ?, middle_name = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
        WHERE id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(request.last_name.trim())
    .bind(request.first_name.trim())
    .bind(request.middle_name.trim())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("employee {}", id)));
    }

    sqlx::query(
        r#"
        UPDATE employee_hr
        SET department_id = ?, position_id = ?, is_remote = ?,
            birth_date = ?, hire_date = ?, salary = ?
        WHERE employee_id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(request.department_id)
    .bind(request.position_id)
    .bind(request.is_remote)
    .bind(&birth_date)
    .bind(&hire_date)
    .bind(request.salary)
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(map_hr_error)?;

    tx.commit().await?;
    info!(employee_id = id, "Employee updated");

    get_employee(pool, id).await
}

/// Tombstone an employee and its HR record atomically
pub async fn delete_employee(pool: &SqlitePool, id: i64) -> ApiResult<()> {
    let mut tx = pool.begin().await?;

    let deleted = tombstone(&mut tx, "employees", "id", id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound(format!("employee {}", id)));
    }
    tombstone(&mut tx, "employee_hr", "employee_id", id).await?;

    tx.commit().await?;
    info!(employee_id = id, "Employee deleted");
    Ok(())
}

/// Per-shift summaries within `scope`; only shifts with both child records
pub async fn list_work(pool: &SqlitePool, scope: Scope) -> ApiResult<Vec<WorkSummary>> {
    let (all, employee_id) = scope.sql_params();

    Ok(sqlx::query_as(
        r#"
        SELECT
            wd.id AS work_day_id,
            wd.employee_id,
            TRIM(e.last_name || ' ' || e.first_name || ' ' || e.middle_name) AS full_name,
            wd.start_work_day,
            wd.end_work_day,
            wp.calls_count,
            wp.completed_tasks,
            sm.work_life_balance,
            sm.satisfaction,
            sm.productivity
        FROM work_days wd
        JOIN employees e ON e.id = wd.employee_id AND e.deleted_at IS NULL
        JOIN work_processes wp ON wp.work_day_id = wd.id AND wp.deleted_at IS NULL
        JOIN satisfaction_metrics sm ON sm.work_day_id = wd.id AND sm.deleted_at IS NULL
        WHERE wd.deleted_at IS NULL
          AND (? = 1 OR wd.employee_id = ?)
        ORDER BY wd.start_work_day, wd.id
        "#,
    )
    .bind(all)
    .bind(employee_id)
    .fetch_all(pool)
    .await?)
}

/// Tombstone every work day of an employee together with its child records.
/// Returns the number of work days affected.
pub async fn delete_work(pool: &SqlitePool, employee_id: i64) -> ApiResult<u64> {
    let mut tx = pool.begin().await?;

    for table in ["work_processes", "satisfaction_metrics"] {
        let sql = format!(
            "UPDATE {table} SET deleted_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') \
             WHERE deleted_at IS NULL \
               AND work_day_id IN (SELECT id FROM work_days WHERE employee_id = ?)"
        );
        sqlx::query(&sql).bind(employee_id).execute(&mut *tx).await?;
    }
    let days = tombstone(&mut tx, "work_days", "employee_id", employee_id).await?;

    tx.commit().await?;
    info!(employee_id, work_days = days, "Work records deleted");
    Ok(days)
}

async fn tombstone(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    column: &str,
    id: i64,
) -> sqlx::Result<u64> {
    let sql = format!(
        "UPDATE {table} SET deleted_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') \
         WHERE {column} = ? AND deleted_at IS NULL"
    );
    let result = sqlx::query(&sql).bind(id).execute(&mut **tx).await?;
    Ok(result.rows_affected())
}
