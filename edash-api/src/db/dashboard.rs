//! Dashboard aggregation
//!
//! Read-only, set-based queries over live work days. Every query shares the
//! same filter: caller scope plus an optional `start_work_day` window.
//! Shift hours are derived from the stored RFC 3339 bounds; overtime is the
//! part of a shift beyond eight hours.

use chrono::{DateTime, NaiveDate, Utc};
use edash_common::time::{day_end_exclusive, day_start, trailing_months};
use edash_common::Scope;
use serde::Serialize;
use sqlx::query::QueryAs;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqlitePool};

/// Number of entries in each top-N ranking
pub const TOP_N: i64 = 3;

/// Months covered by the monthly rollup
pub const MONTHLY_WINDOW: u32 = 6;

const SHIFT_HOURS: &str = "((CAST(strftime('%s', wd.end_work_day) AS REAL) \
     - CAST(strftime('%s', wd.start_work_day) AS REAL)) / 3600.0)";

/// Scope and window shared by every dashboard query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardFilter {
    pub scope: Scope,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl DashboardFilter {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            date_from: None,
            date_to: None,
        }
    }
}

/// Dashboard payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub avg_load: f64,
    pub avg_productivity: f64,
    pub overtime: f64,
    pub satisfaction: f64,
    pub dept_efficiency: Vec<DeptEfficiencyItem>,
    pub top_overtime: Vec<TopOvertimeItem>,
    pub monthly_stats: Vec<MonthlyStat>,
    pub top_efficiency: Vec<TopEfficiencyItem>,
}

/// Mean productivity for one department × position pair
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DeptEfficiencyItem {
    pub department: String,
    pub job_level: String,
    pub avg_productivity: f64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopOvertimeItem {
    pub name: String,
    pub job_satisfaction: Option<i64>,
    pub tasks_completed_per_day: Option<i64>,
    pub overtime_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStat {
    pub month: String,
    pub load: f64,
    pub overtime: f64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopEfficiencyItem {
    pub name: String,
    pub productivity: i64,
    pub tasks: Option<i64>,
    pub overtime: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct Averages {
    avg_load: f64,
    avg_productivity: f64,
    satisfaction: f64,
    overtime: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct LoadAverages {
    load: f64,
    overtime: f64,
}

/// Bind values for the shared filter, in placeholder order
struct FilterBinds {
    all: bool,
    employee_id: Option<i64>,
    from: Option<String>,
    to: Option<String>,
}

impl From<&DashboardFilter> for FilterBinds {
    fn from(filter: &DashboardFilter) -> Self {
        let (all, employee_id) = filter.scope.sql_params();
        Self {
            all,
            employee_id,
            from: filter.date_from.map(day_start),
            to: filter.date_to.map(day_end_exclusive),
        }
    }
}

/// Live work days of live employees, scoped, inside the date window.
/// Four placeholders: scope flag, employee id, window start, window end.
fn filter_clause() -> String {
    "wd.deleted_at IS NULL \
     AND e.deleted_at IS NULL \
     AND (? = 1 OR wd.employee_id = ?) \
     AND wd.start_work_day >= COALESCE(?, '') \
     AND wd.start_work_day < COALESCE(?, '9999')"
        .to_string()
}

fn overtime_expr() -> String {
    format!("MAX({SHIFT_HOURS} - 8.0, 0.0)")
}

fn bind_filter<'q, O>(
    query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    binds: &FilterBinds,
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    query
        .bind(binds.all)
        .bind(binds.employee_id)
        .bind(binds.from.clone())
        .bind(binds.to.clone())
}

/// Compute the whole dashboard for one caller
pub async fn dashboard_summary(
    pool: &SqlitePool,
    filter: &DashboardFilter,
    now: DateTime<Utc>,
) -> sqlx::Result<DashboardSummary> {
    let binds = FilterBinds::from(filter);

    let averages = summary_averages(pool, &binds).await?;
    let dept_efficiency = dept_efficiency(pool, &binds).await?;
    let top_overtime = top_overtime(pool, &binds).await?;
    let top_efficiency = top_efficiency(pool, &binds).await?;
    let monthly_stats = monthly_stats(pool, filter.scope, now).await?;

    Ok(DashboardSummary {
        avg_load: averages.avg_load,
        avg_productivity: averages.avg_productivity,
        overtime: averages.overtime,
        satisfaction: averages.satisfaction,
        dept_efficiency,
        top_overtime,
        monthly_stats,
        top_efficiency,
    })
}

/// Work days without metrics still count toward load and overtime
async fn summary_averages(pool: &SqlitePool, binds: &FilterBinds) -> sqlx::Result<Averages> {
    let sql = format!(
        r#"
        SELECT
            COALESCE(AVG({hours}), 0.0) AS avg_load,
            COALESCE(AVG(sm.productivity), 0.0) AS avg_productivity,
            COALESCE(AVG(sm.satisfaction), 0.0) AS satisfaction,
            COALESCE(AVG({overtime}), 0.0) AS overtime
        FROM work_days wd
        JOIN employees e ON e.id = wd.employee_id
        LEFT JOIN satisfaction_metrics sm ON sm.work_day_id = wd.id AND sm.deleted_at IS NULL
        WHERE {filter}
        "#,
        hours = SHIFT_HOURS,
        overtime = overtime_expr(),
        filter = filter_clause(),
    );

    bind_filter(sqlx::query_as::<_, Averages>(&sql), binds)
        .fetch_one(pool)
        .await
}

async fn dept_efficiency(
    pool: &SqlitePool,
    binds: &FilterBinds,
) -> sqlx::Result<Vec<DeptEfficiencyItem>> {
    let sql = format!(
        r#"
        SELECT
            d.name AS department,
            p.name AS job_level,
            COALESCE(AVG(sm.productivity), 0.0) AS avg_productivity
        FROM work_days wd
        JOIN employees e ON e.id = wd.employee_id
        JOIN employee_hr hr ON hr.employee_id = e.id AND hr.deleted_at IS NULL
        JOIN departments d ON d.id = hr.department_id AND d.deleted_at IS NULL
        JOIN positions p ON p.id = hr.position_id AND p.deleted_at IS NULL
        LEFT JOIN satisfaction_metrics sm ON sm.work_day_id = wd.id AND sm.deleted_at IS NULL
        WHERE {filter}
        GROUP BY d.name, p.name
        ORDER BY d.name, p.name
        "#,
        filter = filter_clause(),
    );

    bind_filter(sqlx::query_as::<_, DeptEfficiencyItem>(&sql), binds)
        .fetch_all(pool)
        .await
}

async fn top_overtime(pool: &SqlitePool, binds: &FilterBinds) -> sqlx::Result<Vec<TopOvertimeItem>> {
    let sql = format!(
        r#"
        SELECT
            TRIM(e.last_name || ' ' || e.first_name || ' ' || e.middle_name) AS name,
            sm.satisfaction AS job_satisfaction,
            wp.completed_tasks AS tasks_completed_per_day,
            {overtime} AS overtime_hours
        FROM work_days wd
        JOIN employees e ON e.id = wd.employee_id
        LEFT JOIN work_processes wp ON wp.work_day_id = wd.id AND wp.deleted_at IS NULL
        LEFT JOIN satisfaction_metrics sm ON sm.work_day_id = wd.id AND sm.deleted_at IS NULL
        WHERE {filter}
        ORDER BY overtime_hours DESC, wd.id ASC
        LIMIT {limit}
        "#,
        overtime = overtime_expr(),
        filter = filter_clause(),
        limit = TOP_N,
    );

    bind_filter(sqlx::query_as::<_, TopOvertimeItem>(&sql), binds)
        .fetch_all(pool)
        .await
}

/// Only work days with satisfaction metrics are ranked
async fn top_efficiency(
    pool: &SqlitePool,
    binds: &FilterBinds,
) -> sqlx::Result<Vec<TopEfficiencyItem>> {
    let sql = format!(
        r#"
        SELECT
            TRIM(e.last_name || ' ' || e.first_name || ' ' || e.middle_name) AS name,
            sm.productivity AS productivity,
            wp.completed_tasks AS tasks,
            {overtime} AS overtime
        FROM work_days wd
        JOIN employees e ON e.id = wd.employee_id
        JOIN satisfaction_metrics sm ON sm.work_day_id = wd.id AND sm.deleted_at IS NULL
        LEFT JOIN work_processes wp ON wp.work_day_id = wd.id AND wp.deleted_at IS NULL
        WHERE {filter}
        ORDER BY sm.productivity DESC, wd.id ASC
        LIMIT {limit}
        "#,
        overtime = overtime_expr(),
        filter = filter_clause(),
        limit = TOP_N,
    );

    bind_filter(sqlx::query_as::<_, TopEfficiencyItem>(&sql), binds)
        .fetch_all(pool)
        .await
}

/// Trailing months, oldest first; scoped but never date-filtered
async fn monthly_stats(
    pool: &SqlitePool,
    scope: Scope,
    now: DateTime<Utc>,
) -> sqlx::Result<Vec<MonthlyStat>> {
    let sql = format!(
        r#"
        SELECT
            COALESCE(AVG({hours}), 0.0) AS load,
            COALESCE(AVG({overtime}), 0.0) AS overtime
        FROM work_days wd
        JOIN employees e ON e.id = wd.employee_id
        WHERE {filter}
          AND substr(wd.start_work_day, 1, 7) = ?
        "#,
        hours = SHIFT_HOURS,
        overtime = overtime_expr(),
        filter = filter_clause(),
    );

    let binds = FilterBinds::from(&DashboardFilter::new(scope));
    let mut stats = Vec::with_capacity(MONTHLY_WINDOW as usize);

    for month in trailing_months(now, MONTHLY_WINDOW) {
        let averages = bind_filter(sqlx::query_as::<_, LoadAverages>(&sql), &binds)
            .bind(month.clone())
            .fetch_one(pool)
            .await?;

        stats.push(MonthlyStat {
            month,
            load: averages.load,
            overtime: averages.overtime,
        });
    }

    Ok(stats)
}
