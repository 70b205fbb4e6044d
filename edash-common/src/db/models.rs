//! Database models

use serde::{Deserialize, Serialize};

/// One department, position or access group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DictionaryEntry {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub created_at: String,
}

/// Employee joined with its HR record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmployeeFull {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub department: String,
    pub position: String,
    pub is_remote: bool,
    pub birth_date: String,
    pub hire_date: String,
    pub fire_date: Option<String>,
    pub salary: f64,
    pub created_at: String,
}

/// One shift with its process counters and satisfaction scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkSummary {
    pub work_day_id: i64,
    pub employee_id: i64,
    pub full_name: String,
    pub start_work_day: String,
    pub end_work_day: String,
    pub calls_count: i64,
    pub completed_tasks: i64,
    pub work_life_balance: i64,
    pub satisfaction: i64,
    pub productivity: i64,
}
