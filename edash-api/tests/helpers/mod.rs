//! Shared test scaffolding: temp database, seed data and request builders

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use edash_api::{build_router, AppState, ServiceSettings};
use edash_common::api::{calculate_hash, CallerIdentity};
use edash_common::config::ParseMode;
use edash_common::db::init_database;
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

pub const BOUNDARY: &str = "edash-test-boundary";

/// Seeded employee ids
pub const IVANOV: i64 = 1;
pub const PETROVA: i64 = 2;

/// Seeded users: admin (unlinked), employee linked to Petrova, unlinked employee
pub const ADMIN_USER: i64 = 10;
pub const PETROVA_USER: i64 = 20;
pub const ORPHAN_USER: i64 = 30;

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    pub temp_dir: PathBuf,
    pub secret: i64,
    _root: TempDir,
}

#[derive(Debug, Clone)]
pub struct Caller {
    pub id: i64,
    pub roles: &'static str,
}

pub fn admin() -> Caller {
    Caller {
        id: ADMIN_USER,
        roles: "admin",
    }
}

pub fn manager() -> Caller {
    Caller {
        id: ADMIN_USER,
        roles: "manager",
    }
}

pub fn petrova() -> Caller {
    Caller {
        id: PETROVA_USER,
        roles: "employee",
    }
}

pub fn orphan() -> Caller {
    Caller {
        id: ORPHAN_USER,
        roles: "employee",
    }
}

/// App with caller hash verification disabled
pub async fn setup() -> TestApp {
    setup_with(0, ParseMode::Lenient).await
}

pub async fn setup_with(secret: i64, parse_mode: ParseMode) -> TestApp {
    let root = TempDir::new().expect("temp root");
    let pool = init_database(&root.path().join("edash.db"))
        .await
        .expect("init database");
    seed(&pool).await;

    let temp_dir = root.path().join("tmp");
    let settings = ServiceSettings {
        parse_mode,
        temp_dir: temp_dir.clone(),
        max_upload_bytes: 1024 * 1024,
        shared_secret: secret,
        cors_origins: vec!["http://localhost:5173".to_string()],
    };
    let app = build_router(AppState::new(pool.clone(), settings));

    TestApp {
        app,
        pool,
        temp_dir,
        secret,
        _root: root,
    }
}

/// Two departments, two positions, two employees with HR records, three users
async fn seed(pool: &SqlitePool) {
    let statements = [
        "INSERT INTO departments (id, name, code) VALUES (1, 'Sales', 'SAL'), (2, 'Support', 'SUP')",
        "INSERT INTO positions (id, name, code) VALUES (1, 'Analyst', 'AN'), (2, 'Lead', 'LD')",
        "INSERT INTO employees (id, last_name, first_name, middle_name) VALUES \
            (1, 'Ivanov', 'Ivan', 'Ivanovich'), (2, 'Petrova', 'Anna', '')",
        "INSERT INTO employee_hr (employee_id, department_id, position_id, is_remote, birth_date, hire_date, salary) VALUES \
            (1, 1, 1, 0, '1990-01-01', '2020-01-01', 1000.0), \
            (2, 2, 2, 1, '1992-05-05', '2021-03-01', 1500.0)",
        "INSERT INTO users (id, email, name, employee_id) VALUES \
            (10, 'admin@example.com', 'Admin', NULL), \
            (20, 'anna@example.com', 'Anna', 2), \
            (30, 'ghost@example.com', 'Ghost', NULL)",
    ];

    for sql in statements {
        sqlx::query(sql).execute(pool).await.expect("seed");
    }
}

fn with_identity(builder: axum::http::request::Builder, caller: &Caller, secret: i64) -> axum::http::request::Builder {
    let builder = builder
        .header("x-caller-id", caller.id.to_string())
        .header("x-caller-roles", caller.roles);

    if secret == 0 {
        return builder;
    }

    let identity = CallerIdentity::new(caller.id, CallerIdentity::parse_roles(caller.roles));
    let timestamp = chrono::Utc::now().timestamp_millis();
    builder
        .header("x-caller-timestamp", timestamp.to_string())
        .header("x-caller-hash", calculate_hash(&identity, timestamp, secret))
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub fn get(&self, uri: &str, caller: &Caller) -> Request<Body> {
        with_identity(Request::builder().method("GET").uri(uri), caller, self.secret)
            .body(Body::empty())
            .unwrap()
    }

    pub fn delete(&self, uri: &str, caller: &Caller) -> Request<Body> {
        with_identity(Request::builder().method("DELETE").uri(uri), caller, self.secret)
            .body(Body::empty())
            .unwrap()
    }

    pub fn json(&self, method: &str, uri: &str, caller: &Caller, body: Value) -> Request<Body> {
        with_identity(Request::builder().method(method).uri(uri), caller, self.secret)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn multipart(&self, uri: &str, caller: &Caller, file_name: &str, bytes: &[u8]) -> Request<Body> {
        with_identity(Request::builder().method("POST").uri(uri), caller, self.secret)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body("file", file_name, bytes)))
            .unwrap()
    }

    /// Files left in the upload staging directory
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(&self.temp_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Extract JSON body from response
pub async fn extract_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// One shift row as the confirm endpoint accepts it
pub fn shift(employee_id: i64, start: &str, end: &str, tasks: i64, productivity: i64) -> Value {
    serde_json::json!({
        "employee_id": employee_id,
        "start_work_day": start,
        "end_work_day": end,
        "calls_count": 10,
        "completed_tasks": tasks,
        "work_life_balance": 4,
        "satisfaction": 5,
        "productivity": productivity,
    })
}

pub async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}
