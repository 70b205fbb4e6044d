//! Flat employee snapshot storage

use crate::ingest::{IngestError, SnapshotRow};
use chrono::{DateTime, Utc};
use edash_common::time::to_db_timestamp;
use sqlx::SqlitePool;

/// Insert or replace the snapshot keyed by (employee_id, owner_user_id)
pub async fn upsert_snapshot(
    pool: &SqlitePool,
    owner_user_id: i64,
    row: &SnapshotRow,
    now: DateTime<Utc>,
) -> Result<i64, IngestError> {
    sqlx::query_scalar(
        r#"
        INSERT INTO employee_snapshots (
            employee_id, owner_user_id, age, department, job_level, years_at_company,
            monthly_hours_worked, remote_work, meetings_per_week, tasks_completed_per_day,
            overtime_hours_per_week, work_life_balance, job_satisfaction, productivity_score,
            annual_salary, absences_per_year, uploaded_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(employee_id, owner_user_id) DO UPDATE SET
            age = excluded.age,
            department = excluded.department,
            job_level = excluded.job_level,
            years_at_company = excluded.years_at_company,
            monthly_hours_worked = excluded.monthly_hours_worked,
            remote_work = excluded.remote_work,
            meetings_per_week = excluded.meetings_per_week,
            tasks_completed_per_day = excluded.tasks_completed_per_day,
            overtime_hours_per_week = excluded.overtime_hours_per_week,
            work_life_balance = excluded.work_life_balance,
            job_satisfaction = excluded.job_satisfaction,
            productivity_score = excluded.productivity_score,
            annual_salary = excluded.annual_salary,
            absences_per_year = excluded.absences_per_year,
            uploaded_at = excluded.uploaded_at
        RETURNING id
        "#,
    )
    .bind(&row.employee_id)
    .bind(owner_user_id)
    .bind(row.age)
    .bind(&row.department)
    .bind(&row.job_level)
    .bind(row.years_at_company)
    .bind(row.monthly_hours_worked)
    .bind(row.remote_work)
    .bind(row.meetings_per_week)
    .bind(row.tasks_completed_per_day)
    .bind(row.overtime_hours_per_week)
    .bind(&row.work_life_balance)
    .bind(row.job_satisfaction)
    .bind(row.productivity_score)
    .bind(row.annual_salary)
    .bind(row.absences_per_year)
    .bind(to_db_timestamp(&now))
    .fetch_one(pool)
    .await
    .map_err(|e| {
        IngestError::conflict(
            "EmployeeSnapshot",
            format!("employee_id={}", row.employee_id),
            e,
        )
    })
}

/// Stored snapshot as returned to its owner
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct StoredSnapshot {
    pub id: i64,
    pub employee_id: String,
    pub department: String,
    pub job_level: String,
    pub productivity_score: f64,
    pub remote_work: bool,
    pub uploaded_at: String,
}

/// Snapshots uploaded by one user, ordered by external employee id
pub async fn list_snapshots(
    pool: &SqlitePool,
    owner_user_id: i64,
) -> sqlx::Result<Vec<StoredSnapshot>> {
    sqlx::query_as(
        r#"
        SELECT id, employee_id, department, job_level, productivity_score, remote_work, uploaded_at
        FROM employee_snapshots
        WHERE owner_user_id = ?
        ORDER BY employee_id
        "#,
    )
    .bind(owner_user_id)
    .fetch_all(pool)
    .await
}
