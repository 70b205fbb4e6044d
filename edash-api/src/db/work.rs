//! Shift reconciliation
//!
//! A shift is stored as three records: the work day (natural key employee +
//! shift window) and its 1:1 work process and satisfaction metrics. All three
//! are upserted inside one transaction, so a row is stored whole or not at all.

use crate::ingest::{IngestError, ShiftRow};
use edash_common::time::to_db_timestamp;
use sqlx::SqlitePool;
use tracing::debug;

/// Insert or update one shift; returns the work day id.
///
/// On a natural-key collision every non-key column is overwritten and any
/// tombstone on the three records is cleared.
pub async fn upsert_shift(pool: &SqlitePool, row: &ShiftRow) -> Result<i64, IngestError> {
    let day_key = format!("employee_id={}", row.employee_id);
    let start = to_db_timestamp(&row.start_work_day);
    let end = to_db_timestamp(&row.end_work_day);

    if row.end_work_day < row.start_work_day {
        return Err(rejected(&day_key, format!("shift ends ({end}) before it starts ({start})")));
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| IngestError::conflict("WorkDay", day_key.clone(), e))?;

    let active: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE id = ? AND deleted_at IS NULL")
            .bind(row.employee_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| IngestError::conflict("WorkDay", day_key.clone(), e))?;
    if active == 0 {
        return Err(rejected(&day_key, "employee does not exist or was deleted"));
    }

    let work_day_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO work_days (employee_id, start_work_day, end_work_day)
        VALUES (?, ?, ?)
        ON CONFLICT(employee_id, start_work_day, end_work_day) DO UPDATE SET
            deleted_at = NULL
        RETURNING id
        "#,
    )
    .bind(row.employee_id)
    .bind(&start)
    .bind(&end)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| IngestError::conflict("WorkDay", day_key.clone(), e))?;

    let child_key = format!("work_day_id={}", work_day_id);

    sqlx::query(
        r#"
        INSERT INTO work_processes (work_day_id, calls_count, completed_tasks)
        VALUES (?, ?, ?)
        ON CONFLICT(work_day_id) DO UPDATE SET
            calls_count = excluded.calls_count,
            completed_tasks = excluded.completed_tasks,
            deleted_at = NULL
        "#,
    )
    .bind(work_day_id)
    .bind(row.calls_count)
    .bind(row.completed_tasks)
    .execute(&mut *tx)
    .await
    .map_err(|e| IngestError::conflict("WorkProcess", child_key.clone(), e))?;

    sqlx::query(
        r#"
        INSERT INTO satisfaction_metrics (work_day_id, work_life_balance, satisfaction, productivity)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(work_day_id) DO UPDATE SET
            work_life_balance = excluded.work_life_balance,
            satisfaction = excluded.satisfaction,
            productivity = excluded.productivity,
            deleted_at = NULL
        "#,
    )
    .bind(work_day_id)
    .bind(row.work_life_balance)
    .bind(row.satisfaction)
    .bind(row.productivity)
    .execute(&mut *tx)
    .await
    .map_err(|e| IngestError::conflict("SatisfactionMetric", child_key.clone(), e))?;

    // Dropping `tx` on any early return above rolls the row back
    tx.commit()
        .await
        .map_err(|e| IngestError::conflict("WorkDay", day_key, e))?;

    debug!(work_day_id, employee_id = row.employee_id, "Shift upserted");
    Ok(work_day_id)
}

fn rejected(day_key: &str, reason: impl Into<String>) -> IngestError {
    IngestError::RejectedRow {
        record: "WorkDay",
        key: day_key.to_string(),
        reason: reason.into(),
    }
}
