//! Integration tests for upload preview and confirm
//!
//! Tests cover:
//! - Preview of CSV and workbook uploads (skipped rows, unsupported formats, temp cleanup)
//! - Confirm upserts keyed on the shift natural key
//! - Per-row transactions: a failing child write leaves nothing behind
//! - Snapshot layout with caller ownership

mod helpers;

use axum::http::StatusCode;
use edash_common::config::ParseMode;
use chrono::NaiveDate;
use helpers::*;
use rust_xlsxwriter::{Format, Workbook};
use serde_json::json;

const SHIFT_CSV: &str = "\
employee_id,start_work_day,end_work_day,calls_count,completed_tasks,work_life_balance,satisfaction,productivity
1,2025-03-04T09:00:00Z,2025-03-04T17:00:00Z,10,5,4,5,80
2,2025-03-04T09:00:00Z
2,2025-03-04T08:00:00Z,2025-03-04T19:00:00Z,12,7,3,4,bad
";

/// SHIFT_CSV as a workbook: native date cells, numeric cells and a short row
fn shift_workbook() -> Vec<u8> {
    let header = SHIFT_CSV.lines().next().unwrap();
    let at = |day: u32, hour: u32| {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    };
    let stamp = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, title) in header.split(',').enumerate() {
        sheet.write_string(0, col as u16, title).unwrap();
    }

    sheet.write_number(1, 0, 1).unwrap();
    sheet.write_datetime_with_format(1, 1, &at(4, 9), &stamp).unwrap();
    sheet.write_datetime_with_format(1, 2, &at(4, 18), &stamp).unwrap();
    for (col, value) in [10, 5, 4, 5, 80].into_iter().enumerate() {
        sheet.write_number(1, col as u16 + 3, value).unwrap();
    }

    // Only two populated cells; the sheet range still pads it to eight
    sheet.write_number(2, 0, 2).unwrap();
    sheet.write_datetime_with_format(2, 1, &at(4, 9), &stamp).unwrap();

    sheet.write_number(3, 0, 2).unwrap();
    sheet.write_datetime_with_format(3, 1, &at(5, 6), &stamp).unwrap();
    sheet.write_datetime_with_format(3, 2, &at(5, 18), &stamp).unwrap();
    for (col, value) in [12, 7, 3, 4].into_iter().enumerate() {
        sheet.write_number(3, col as u16 + 3, value).unwrap();
    }
    sheet.write_string(3, 7, "bad").unwrap();

    workbook.save_to_buffer().unwrap()
}

// =============================================================================
// Preview
// =============================================================================

#[tokio::test]
async fn test_preview_returns_rows_and_skipped_count() {
    let app = setup().await;

    let request = app.multipart("/api/upload", &admin(), "shifts.csv", SHIFT_CSV.as_bytes());
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    let rows = body["preview"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(body["skipped"], 1);

    assert_eq!(rows[0]["employee_id"], 1);
    assert_eq!(rows[0]["start_work_day"], "2025-03-04T09:00:00Z");
    assert!(rows[0].get("defaulted_fields").is_none());

    // Lenient mode keeps the row and flags the defaulted column
    assert_eq!(rows[1]["productivity"], 0);
    assert_eq!(rows[1]["defaulted_fields"], json!(["productivity"]));

    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_strict_preview_drops_unparsable_rows() {
    let app = setup_with(0, ParseMode::Strict).await;

    let request = app.multipart("/api/upload", &admin(), "shifts.csv", SHIFT_CSV.as_bytes());
    let body = extract_json(app.send(request).await).await;

    assert_eq!(body["preview"].as_array().unwrap().len(), 1);
    assert_eq!(body["skipped"], 2);
}

#[tokio::test]
async fn test_preview_rejects_unsupported_format() {
    let app = setup().await;

    let request = app.multipart("/api/upload", &admin(), "shifts.txt", SHIFT_CSV.as_bytes());
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response).await;
    assert_eq!(body["error"]["code"], "UNSUPPORTED_FORMAT");
}

#[tokio::test]
async fn test_preview_broken_workbook_is_bad_request_and_cleans_up() {
    let app = setup().await;

    let request = app.multipart("/api/upload", &admin(), "shifts.xlsx", b"not a workbook");
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response).await;
    assert_eq!(body["error"]["code"], "DECODE_ERROR");
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_preview_workbook_matches_csv_rules() {
    let app = setup().await;

    let request = app.multipart("/api/upload", &admin(), "shifts.xlsx", &shift_workbook());
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    let rows = body["preview"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(body["skipped"], 1);

    assert_eq!(rows[0]["employee_id"], 1);
    assert_eq!(rows[0]["start_work_day"], "2025-03-04T09:00:00Z");
    assert_eq!(rows[0]["end_work_day"], "2025-03-04T18:00:00Z");
    assert_eq!(rows[0]["completed_tasks"], 5);
    assert_eq!(rows[0]["productivity"], 80);
    assert!(rows[0].get("defaulted_fields").is_none());

    assert_eq!(rows[1]["employee_id"], 2);
    assert_eq!(rows[1]["start_work_day"], "2025-03-05T06:00:00Z");
    assert_eq!(rows[1]["calls_count"], 12);
    assert_eq!(rows[1]["defaulted_fields"], json!(["productivity"]));

    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_strict_preview_workbook_drops_short_and_unparsable_rows() {
    let app = setup_with(0, ParseMode::Strict).await;

    let request = app.multipart("/api/upload", &admin(), "shifts.xlsx", &shift_workbook());
    let body = extract_json(app.send(request).await).await;

    assert_eq!(body["preview"].as_array().unwrap().len(), 1);
    assert_eq!(body["skipped"], 2);
}

#[tokio::test]
async fn test_preview_without_file_field() {
    let app = setup().await;

    let body = {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n");
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    };
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header("x-caller-id", ADMIN_USER.to_string())
        .header("x-caller-roles", "admin")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(axum::body::Body::from(body))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response).await;
    assert_eq!(body["error"]["message"], "file is required");
}

#[tokio::test]
async fn test_upload_requires_elevated_role() {
    let app = setup().await;

    let request = app.multipart("/api/upload", &petrova(), "shifts.csv", SHIFT_CSV.as_bytes());
    assert_eq!(app.send(request).await.status(), StatusCode::FORBIDDEN);

    let request = app.json("POST", "/api/upload/confirm", &petrova(), json!([]));
    assert_eq!(app.send(request).await.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Confirm
// =============================================================================

#[tokio::test]
async fn test_confirm_empty_batch() {
    let app = setup().await;

    let request = app.json("POST", "/api/upload/confirm", &manager(), json!([]));
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    assert_eq!(body["added"], 0);
    assert_eq!(body["errors"], json!([]));
}

#[tokio::test]
async fn test_confirm_same_natural_key_keeps_latest_values() {
    let app = setup().await;
    let start = "2025-03-04T09:00:00Z";
    let end = "2025-03-04T17:00:00Z";

    let rows = json!([shift(IVANOV, start, end, 5, 70), shift(IVANOV, start, end, 9, 90)]);
    let request = app.json("POST", "/api/upload/confirm", &admin(), rows);
    let body = extract_json(app.send(request).await).await;
    assert_eq!(body["added"], 2);

    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM work_days").await, 1);
    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM work_processes").await, 1);
    assert_eq!(
        count(&app.pool, "SELECT completed_tasks FROM work_processes").await,
        9
    );
    assert_eq!(
        count(&app.pool, "SELECT productivity FROM satisfaction_metrics").await,
        90
    );
}

#[tokio::test]
async fn test_confirm_collects_row_errors_without_aborting() {
    let app = setup().await;

    let rows = json!([
        shift(IVANOV, "2025-03-04T09:00:00Z", "2025-03-04T17:00:00Z", 5, 70),
        shift(999, "2025-03-04T09:00:00Z", "2025-03-04T17:00:00Z", 5, 70),
        shift(PETROVA, "2025-03-04T09:00:00Z", "2025-03-04T17:00:00Z", 5, 70),
    ]);
    let request = app.json("POST", "/api/upload/confirm", &admin(), rows);
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    assert_eq!(body["added"], 2);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(
        errors[0].as_str().unwrap().contains("WorkDay employee_id=999"),
        "{}",
        errors[0]
    );
    assert!(body["message"].as_str().unwrap().contains("1 rows failed"));
}

#[tokio::test]
async fn test_confirm_rejects_reversed_shift_window() {
    let app = setup().await;

    let rows = json!([shift(IVANOV, "2025-03-04T17:00:00Z", "2025-03-04T09:00:00Z", 5, 70)]);
    let request = app.json("POST", "/api/upload/confirm", &admin(), rows);
    let body = extract_json(app.send(request).await).await;

    assert_eq!(body["added"], 0);
    let error = body["errors"][0].as_str().unwrap();
    assert!(error.contains("WorkDay employee_id=1"), "{}", error);
    assert!(error.contains("before it starts"), "{}", error);
    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM work_days").await, 0);
}

#[tokio::test]
async fn test_confirm_rejects_shift_for_deleted_employee() {
    let app = setup().await;

    let request = app.delete(&format!("/api/employees/{}", PETROVA), &admin());
    assert_eq!(app.send(request).await.status(), StatusCode::NO_CONTENT);

    let rows = json!([
        shift(PETROVA, "2025-03-04T09:00:00Z", "2025-03-04T17:00:00Z", 5, 70),
        shift(IVANOV, "2025-03-04T09:00:00Z", "2025-03-04T17:00:00Z", 5, 70),
    ]);
    let request = app.json("POST", "/api/upload/confirm", &admin(), rows);
    let body = extract_json(app.send(request).await).await;

    assert_eq!(body["added"], 1);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    let error = errors[0].as_str().unwrap();
    assert!(error.contains("WorkDay employee_id=2"), "{}", error);
    assert!(error.contains("deleted"), "{}", error);
    assert_eq!(
        count(&app.pool, "SELECT COUNT(*) FROM work_days WHERE employee_id = 2").await,
        0
    );
}

#[tokio::test]
async fn test_failed_child_write_rolls_back_work_day() {
    let app = setup().await;

    // Make every WorkProcess insert fail
    sqlx::query(
        "CREATE TRIGGER reject_process BEFORE INSERT ON work_processes \
         BEGIN SELECT RAISE(ABORT, 'process rejected'); END",
    )
    .execute(&app.pool)
    .await
    .unwrap();

    let rows = json!([shift(IVANOV, "2025-03-04T09:00:00Z", "2025-03-04T17:00:00Z", 5, 70)]);
    let request = app.json("POST", "/api/upload/confirm", &admin(), rows);
    let body = extract_json(app.send(request).await).await;

    assert_eq!(body["added"], 0);
    let error = body["errors"][0].as_str().unwrap();
    assert!(error.contains("WorkProcess work_day_id="), "{}", error);

    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM work_days").await, 0);
    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM satisfaction_metrics").await, 0);
}

#[tokio::test]
async fn test_confirm_revives_deleted_shift() {
    let app = setup().await;
    let rows = json!([shift(PETROVA, "2025-03-04T09:00:00Z", "2025-03-04T17:00:00Z", 5, 70)]);

    let request = app.json("POST", "/api/upload/confirm", &admin(), rows.clone());
    app.send(request).await;

    let request = app.delete(&format!("/api/employees/work/{}", PETROVA), &admin());
    assert_eq!(app.send(request).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        count(&app.pool, "SELECT COUNT(*) FROM work_days WHERE deleted_at IS NULL").await,
        0
    );

    let request = app.json("POST", "/api/upload/confirm", &admin(), rows);
    app.send(request).await;
    assert_eq!(
        count(&app.pool, "SELECT COUNT(*) FROM work_days WHERE deleted_at IS NULL").await,
        1
    );
    assert_eq!(
        count(&app.pool, "SELECT COUNT(*) FROM work_processes WHERE deleted_at IS NULL").await,
        1
    );
}

#[tokio::test]
async fn test_confirm_rejects_malformed_json() {
    let app = setup().await;

    let request = app.json("POST", "/api/upload/confirm", &admin(), json!({"not": "an array"}));
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(count(&app.pool, "SELECT COUNT(*) FROM work_days").await, 0);
}

// =============================================================================
// Snapshot layout
// =============================================================================

const SNAPSHOT_CSV: &str = "\
Employee_ID,Age,Department,Job_Level,Years_At_Company,Monthly_Hours_Worked,Remote_Work,Meetings_per_Week,Tasks_Completed_Per_Day,Overtime_Hours_Per_Week,Work_Life_Balance,Job_Satisfaction,Productivity_Score,Annual_Salary,Absences_Per_Year
E1,30,Eng,L2,3,160,yes,4,10,2.5,Good,7,88.5,60000,1
E2,41,Ops,L3
";

#[tokio::test]
async fn test_snapshot_preview_is_stamped_with_owner() {
    let app = setup().await;

    let request = app.multipart(
        "/api/upload/snapshots",
        &manager(),
        "people.csv",
        SNAPSHOT_CSV.as_bytes(),
    );
    let body = extract_json(app.send(request).await).await;

    assert_eq!(body["skipped"], 1);
    let row = &body["preview"][0];
    assert_eq!(row["employee_id"], "E1");
    assert_eq!(row["remote_work"], true);
    assert_eq!(row["overtime_hours_per_week"], 2.5);
    assert_eq!(row["productivity_score"], 88.5);
    assert_eq!(row["owner_user_id"], ADMIN_USER);
}

#[tokio::test]
async fn test_snapshot_confirm_upserts_per_owner() {
    let app = setup().await;

    let request = app.multipart(
        "/api/upload/snapshots",
        &admin(),
        "people.csv",
        SNAPSHOT_CSV.as_bytes(),
    );
    let preview = extract_json(app.send(request).await).await;
    let mut rows = preview["preview"].clone();

    let request = app.json("POST", "/api/upload/snapshots/confirm", &admin(), rows.clone());
    let body = extract_json(app.send(request).await).await;
    assert_eq!(body["added"], 1);

    // Edited re-confirm replaces the stored snapshot
    rows[0]["productivity_score"] = json!(91.0);
    let request = app.json("POST", "/api/upload/snapshots/confirm", &admin(), rows);
    app.send(request).await;

    let request = app.get("/api/upload/snapshots", &admin());
    let stored = extract_json(app.send(request).await).await;
    let stored = stored.as_array().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["employee_id"], "E1");
    assert_eq!(stored[0]["productivity_score"], 91.0);
    assert_eq!(stored[0]["remote_work"], true);
}
