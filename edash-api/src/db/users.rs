//! Caller accounts

use serde::Serialize;
use sqlx::SqlitePool;

/// A caller account and its optional employee link
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct UserAccount {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub employee_id: Option<i64>,
}

pub async fn find_user(pool: &SqlitePool, user_id: i64) -> sqlx::Result<Option<UserAccount>> {
    sqlx::query_as("SELECT id, email, name, employee_id FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Employee name fields shown on the caller's profile
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ProfileEmployee {
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
}

/// Live employee linked to a user, if any
pub async fn linked_employee(
    pool: &SqlitePool,
    employee_id: i64,
) -> sqlx::Result<Option<ProfileEmployee>> {
    sqlx::query_as(
        "SELECT last_name, first_name, middle_name FROM employees WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await
}
