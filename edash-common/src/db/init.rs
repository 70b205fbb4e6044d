//! Database initialization
//!
//! Creates the database on first run and brings the schema up to date. Every
//! statement is idempotent, so startup may run this against an existing
//! database any number of times.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Busy timeout applied to every pooled connection
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        // Per-connection: foreign keys are off by default in SQLite
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
        // WAL allows concurrent readers with one writer
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;

    // Reference dictionaries
    create_dictionary_table(pool, "departments").await?;
    create_dictionary_table(pool, "positions").await?;
    create_dictionary_table(pool, "access_groups").await?;

    create_employees_table(pool).await?;
    create_employee_hr_table(pool).await?;
    create_users_table(pool).await?;

    // Work fact tables
    create_work_days_table(pool).await?;
    create_work_processes_table(pool).await?;
    create_satisfaction_metrics_table(pool).await?;

    create_employee_snapshots_table(pool).await?;

    seed_access_groups(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Departments, positions and access groups share one shape
async fn create_dictionary_table(pool: &SqlitePool, table: &str) -> Result<()> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            code TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            deleted_at TEXT
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_deleted_at ON {table}(deleted_at)"
    ))
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_employees_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employees (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            last_name TEXT NOT NULL,
            first_name TEXT NOT NULL,
            middle_name TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            deleted_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_employees_deleted_at ON employees(deleted_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_employee_hr_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employee_hr (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            employee_id INTEGER NOT NULL REFERENCES employees(id),
            department_id INTEGER NOT NULL REFERENCES departments(id),
            position_id INTEGER NOT NULL REFERENCES positions(id),
            is_remote INTEGER NOT NULL DEFAULT 0,
            birth_date TEXT NOT NULL,
            hire_date TEXT NOT NULL,
            fire_date TEXT,
            salary REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            deleted_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_employee_hr_employee ON employee_hr(employee_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Caller accounts; `employee_id` links a caller to its own work records
async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            employee_id INTEGER REFERENCES employees(id),
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_work_days_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS work_days (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            employee_id INTEGER NOT NULL REFERENCES employees(id),
            start_work_day TEXT NOT NULL,
            end_work_day TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            deleted_at TEXT,
            UNIQUE(employee_id, start_work_day, end_work_day)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_work_days_start ON work_days(start_work_day)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_work_processes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS work_processes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            work_day_id INTEGER NOT NULL UNIQUE REFERENCES work_days(id),
            calls_count INTEGER NOT NULL,
            completed_tasks INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            deleted_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_satisfaction_metrics_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS satisfaction_metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            work_day_id INTEGER NOT NULL UNIQUE REFERENCES work_days(id),
            work_life_balance INTEGER NOT NULL,
            satisfaction INTEGER NOT NULL,
            productivity INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            deleted_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Flat per-owner employee snapshots from the 15-column upload layout
async fn create_employee_snapshots_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employee_snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            employee_id TEXT NOT NULL,
            owner_user_id INTEGER NOT NULL,
            age INTEGER NOT NULL,
            department TEXT NOT NULL,
            job_level TEXT NOT NULL,
            years_at_company INTEGER NOT NULL,
            monthly_hours_worked REAL NOT NULL,
            remote_work INTEGER NOT NULL,
            meetings_per_week INTEGER NOT NULL,
            tasks_completed_per_day REAL NOT NULL,
            overtime_hours_per_week REAL NOT NULL,
            work_life_balance TEXT NOT NULL,
            job_satisfaction REAL NOT NULL,
            productivity_score REAL NOT NULL,
            annual_salary REAL NOT NULL,
            absences_per_year INTEGER NOT NULL,
            uploaded_at TEXT NOT NULL,
            UNIQUE(employee_id, owner_user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Access groups the policy gate knows about
async fn seed_access_groups(pool: &SqlitePool) -> Result<()> {
    for (code, name) in [
        ("admin", "Administrators"),
        ("manager", "Managers"),
        ("employee", "Employees"),
    ] {
        sqlx::query("INSERT OR IGNORE INTO access_groups (name, code) VALUES (?, ?)")
            .bind(name)
            .bind(code)
            .execute(pool)
            .await?;
    }

    Ok(())
}
