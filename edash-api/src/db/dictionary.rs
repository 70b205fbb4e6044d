//! Reference dictionaries
//!
//! Departments, positions and access groups share one table shape, so one
//! set of queries serves all three; [`DictionaryKind`] picks the table.

use crate::error::{is_unique_violation, ApiError, ApiResult};
use edash_common::db::DictionaryEntry;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

/// The closed set of dictionaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryKind {
    Department,
    Position,
    AccessGroup,
}

/// Create/update payload
#[derive(Debug, Clone, Deserialize)]
pub struct DictionaryRequest {
    pub name: String,
    pub code: String,
}

impl DictionaryKind {
    /// Parse the `/api/dict/{kind}` path segment
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "departments" => Some(DictionaryKind::Department),
            "positions" => Some(DictionaryKind::Position),
            "access-groups" => Some(DictionaryKind::AccessGroup),
            _ => None,
        }
    }

    pub const fn table(self) -> &'static str {
        match self {
            DictionaryKind::Department => "departments",
            DictionaryKind::Position => "positions",
            DictionaryKind::AccessGroup => "access_groups",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DictionaryKind::Department => "department",
            DictionaryKind::Position => "position",
            DictionaryKind::AccessGroup => "access group",
        }
    }

    /// Name and code must both be non-blank
    pub fn validate(self, request: &DictionaryRequest) -> ApiResult<()> {
        if request.name.trim().is_empty() {
            return Err(ApiError::BadRequest(format!("{} name is required", self.label())));
        }
        if request.code.trim().is_empty() {
            return Err(ApiError::BadRequest(format!("{} code is required", self.label())));
        }
        Ok(())
    }

    /// Copy validated request fields onto an entry
    pub fn apply_fields(self, entry: &mut DictionaryEntry, request: &DictionaryRequest) {
        entry.name = request.name.trim().to_string();
        entry.code = request.code.trim().to_string();
    }

    fn map_write_error(self, code: &str, err: sqlx::Error) -> ApiError {
        if is_unique_violation(&err) {
            ApiError::Conflict(format!("{} code {:?} already exists", self.label(), code))
        } else {
            ApiError::Database(err)
        }
    }
}

/// Live entries ordered by id
pub async fn list(pool: &SqlitePool, kind: DictionaryKind) -> ApiResult<Vec<DictionaryEntry>> {
    let sql = format!(
        "SELECT id, name, code, created_at FROM {} WHERE deleted_at IS NULL ORDER BY id",
        kind.table()
    );
    Ok(sqlx::query_as(&sql).fetch_all(pool).await?)
}

/// Live entry by id
pub async fn get(pool: &SqlitePool, kind: DictionaryKind, id: i64) -> ApiResult<DictionaryEntry> {
    let sql = format!(
        "SELECT id, name, code, created_at FROM {} WHERE id = ? AND deleted_at IS NULL",
        kind.table()
    );
    sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{} {}", kind.label(), id)))
}

pub async fn create(
    pool: &SqlitePool,
    kind: DictionaryKind,
    request: &DictionaryRequest,
) -> ApiResult<DictionaryEntry> {
    kind.validate(request)?;

    let mut entry = DictionaryEntry {
        id: 0,
        name: String::new(),
        code: String::new(),
        created_at: String::new(),
    };
    kind.apply_fields(&mut entry, request);

    let sql = format!(
        "INSERT INTO {} (name, code) VALUES (?, ?) RETURNING id, name, code, created_at",
        kind.table()
    );
    let created: DictionaryEntry = sqlx::query_as(&sql)
        .bind(&entry.name)
        .bind(&entry.code)
        .fetch_one(pool)
        .await
        .map_err(|e| kind.map_write_error(&entry.code, e))?;

    info!(table = kind.table(), id = created.id, code = %created.code, "Dictionary entry created");
    Ok(created)
}

/// Update a live entry; deleted entries are not found
pub async fn update(
    pool: &SqlitePool,
    kind: DictionaryKind,
    id: i64,
    request: &DictionaryRequest,
) -> ApiResult<DictionaryEntry> {
    kind.validate(request)?;

    let mut entry = get(pool, kind, id).await?;
    kind.apply_fields(&mut entry, request);

    let sql = format!(
        "UPDATE {} SET name = ?, code = ? WHERE id = ? AND deleted_at IS NULL",
        kind.table()
    );
    let result = sqlx::query(&sql)
        .bind(&entry.name)
        .bind(&entry.code)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| kind.map_write_error(&entry.code, e))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("{} {}", kind.label(), id)));
    }

    Ok(entry)
}

/// Tombstone a live entry
pub async fn soft_delete(pool: &SqlitePool, kind: DictionaryKind, id: i64) -> ApiResult<()> {
    let sql = format!(
        "UPDATE {} SET deleted_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') \
         WHERE id = ? AND deleted_at IS NULL",
        kind.table()
    );
    let result = sqlx::query(&sql).bind(id).execute(pool).await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("{} {}", kind.label(), id)));
    }

    info!(table = kind.table(), id, "Dictionary entry deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use edash_common::db::create_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    fn request(name: &str, code: &str) -> DictionaryRequest {
        DictionaryRequest {
            name: name.to_string(),
            code: code.to_string(),
        }
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(
            DictionaryKind::from_path_segment("access-groups"),
            Some(DictionaryKind::AccessGroup)
        );
        assert_eq!(DictionaryKind::from_path_segment("access_groups"), None);
        assert_eq!(DictionaryKind::Position.table(), "positions");
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let kind = DictionaryKind::Department;
        assert!(kind.validate(&request("Sales", "SAL")).is_ok());
        assert!(matches!(
            kind.validate(&request("  ", "SAL")),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            kind.validate(&request("Sales", "")),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_create_trims_and_rejects_duplicate_code() {
        let pool = memory_pool().await;
        let kind = DictionaryKind::Department;

        let created = create(&pool, kind, &request(" Sales ", " SAL ")).await.unwrap();
        assert_eq!(created.name, "Sales");
        assert_eq!(created.code, "SAL");

        let dup = create(&pool, kind, &request("Other", "SAL")).await;
        assert!(matches!(dup, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_deleted_entries_hidden_and_not_updatable() {
        let pool = memory_pool().await;
        let kind = DictionaryKind::Position;

        let created = create(&pool, kind, &request("Analyst", "AN")).await.unwrap();
        soft_delete(&pool, kind, created.id).await.unwrap();

        assert!(list(&pool, kind).await.unwrap().is_empty());
        assert!(matches!(
            update(&pool, kind, created.id, &request("Analyst", "AN2")).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            soft_delete(&pool, kind, created.id).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_access_groups_seeded() {
        let pool = memory_pool().await;
        let codes: Vec<String> = list(&pool, DictionaryKind::AccessGroup)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.code)
            .collect();
        assert_eq!(codes, vec!["admin", "manager", "employee"]);
    }
}
