//! Preview and confirm flows
//!
//! Preview turns an uploaded file into parsed rows without touching the
//! database; confirm writes a (possibly edited) preview back through the
//! reconciliation writer, one row at a time.

use super::decode::{extension_of, stage_upload, visit_rows, FileFormat};
use super::error::IngestError;
use super::row::{parse_row, Parsed, ShiftRow, SnapshotRow, TabularRecord};
use crate::db::{snapshots, work};
use chrono::{DateTime, Utc};
use edash_common::config::ParseMode;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// An uploaded file held in memory
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Settings the preview needs from configuration
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub parse_mode: ParseMode,
    pub temp_dir: PathBuf,
}

/// Parsed rows plus the number of rows left out
#[derive(Debug, Clone, Serialize)]
pub struct Preview<T> {
    pub preview: Vec<Parsed<T>>,
    pub skipped: usize,
}

/// Result of a confirm batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfirmOutcome {
    pub added: usize,
    pub errors: Vec<String>,
}

impl ConfirmOutcome {
    fn record(&mut self, index: usize, result: Result<(), IngestError>) {
        match result {
            Ok(()) => self.added += 1,
            Err(e) => {
                warn!(row = index + 1, "Confirm row failed: {}", e);
                self.errors.push(format!("row {}: {}", index + 1, e));
            }
        }
    }

    /// Human-readable summary line
    pub fn message(&self) -> String {
        if self.errors.is_empty() {
            format!("{} rows saved", self.added)
        } else {
            format!(
                "{} rows saved, {} rows failed",
                self.added,
                self.errors.len()
            )
        }
    }
}

/// Decode an upload into typed rows.
///
/// Blocking: runs the file decoders synchronously, so async callers should
/// go through `spawn_blocking`. Rows that fail to decode or parse are
/// counted in `skipped` and logged; the file itself failing is an error.
pub fn preview_upload<T: TabularRecord>(
    upload: &Upload,
    options: &IngestOptions,
) -> Result<Preview<T>, IngestError> {
    let upload_id = Uuid::new_v4();
    let format = FileFormat::from_file_name(&upload.file_name)?;

    let staged = stage_upload(
        &options.temp_dir,
        &extension_of(&upload.file_name),
        &upload.bytes,
    )?;
    debug!(
        upload_id = %upload_id,
        path = %staged.path().display(),
        bytes = upload.bytes.len(),
        "Staged upload"
    );

    let mut preview = Vec::new();
    let mut skipped = 0usize;

    visit_rows(staged.path(), format, |line, cells| {
        let parsed = cells.and_then(|cells| {
            parse_row::<T, _>(&cells, options.parse_mode).map_err(|e| e.to_string())
        });

        match parsed {
            Ok(row) => preview.push(row),
            Err(reason) => {
                skipped += 1;
                warn!(upload_id = %upload_id, line, "Skipping row: {}", reason);
            }
        }
    })?;

    info!(
        upload_id = %upload_id,
        file = %upload.file_name,
        rows = preview.len(),
        skipped,
        "Upload preview ready"
    );

    Ok(Preview { preview, skipped })
}

/// Stamp every snapshot row with the uploading user
pub fn stamp_owner(preview: &mut Preview<SnapshotRow>, owner_user_id: i64) {
    for row in &mut preview.preview {
        row.record.owner_user_id = Some(owner_user_id);
    }
}

/// Persist shift rows; each row commits or rolls back on its own
pub async fn confirm_shifts(pool: &SqlitePool, rows: &[ShiftRow]) -> ConfirmOutcome {
    let mut outcome = ConfirmOutcome::default();

    for (index, row) in rows.iter().enumerate() {
        let result = work::upsert_shift(pool, row).await.map(|_| ());
        outcome.record(index, result);
    }

    info!(
        added = outcome.added,
        failed = outcome.errors.len(),
        "Shift confirm finished"
    );
    outcome
}

/// Persist snapshot rows under `owner_user_id`, whatever owner the rows carry
pub async fn confirm_snapshots(
    pool: &SqlitePool,
    owner_user_id: i64,
    rows: &[SnapshotRow],
    now: DateTime<Utc>,
) -> ConfirmOutcome {
    let mut outcome = ConfirmOutcome::default();

    for (index, row) in rows.iter().enumerate() {
        let result = snapshots::upsert_snapshot(pool, owner_user_id, row, now)
            .await
            .map(|_| ());
        outcome.record(index, result);
    }

    info!(
        owner_user_id,
        added = outcome.added,
        failed = outcome.errors.len(),
        "Snapshot confirm finished"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(dir: &TempDir, parse_mode: ParseMode) -> IngestOptions {
        IngestOptions {
            parse_mode,
            temp_dir: dir.path().join("tmp"),
        }
    }

    fn shift_csv() -> Vec<u8> {
        concat!(
            "employee_id,start,end,calls,tasks,wlb,satisfaction,productivity\n",
            "1,2025-03-04T09:00:00Z,2025-03-04T17:00:00Z,10,5,4,5,80\n",
            "2,2025-03-04T09:00:00Z\n",
            "3,2025-03-04T09:00:00Z,2025-03-04T18:00:00Z,x,5,4,5,70\n",
        )
        .as_bytes()
        .to_vec()
    }

    #[test]
    fn test_preview_skips_short_rows() {
        let dir = TempDir::new().unwrap();
        let upload = Upload {
            file_name: "shifts.csv".to_string(),
            bytes: shift_csv(),
        };

        let preview =
            preview_upload::<ShiftRow>(&upload, &options(&dir, ParseMode::Lenient)).unwrap();

        assert_eq!(preview.preview.len(), 2);
        assert_eq!(preview.skipped, 1);
        assert_eq!(preview.preview[1].record.calls_count, 0);
        assert_eq!(preview.preview[1].defaulted_fields, vec!["calls_count"]);
    }

    #[test]
    fn test_strict_preview_skips_unparsable_rows() {
        let dir = TempDir::new().unwrap();
        let upload = Upload {
            file_name: "shifts.csv".to_string(),
            bytes: shift_csv(),
        };

        let preview =
            preview_upload::<ShiftRow>(&upload, &options(&dir, ParseMode::Strict)).unwrap();

        assert_eq!(preview.preview.len(), 1);
        assert_eq!(preview.skipped, 2);
    }

    #[test]
    fn test_preview_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir, ParseMode::Lenient);

        let ok = Upload {
            file_name: "shifts.csv".to_string(),
            bytes: shift_csv(),
        };
        preview_upload::<ShiftRow>(&ok, &opts).unwrap();

        let broken = Upload {
            file_name: "shifts.xlsx".to_string(),
            bytes: b"not a workbook".to_vec(),
        };
        assert!(preview_upload::<ShiftRow>(&broken, &opts).is_err());

        let leftovers = std::fs::read_dir(&opts.temp_dir).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_unsupported_format_never_stages() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir, ParseMode::Lenient);
        let upload = Upload {
            file_name: "shifts.txt".to_string(),
            bytes: shift_csv(),
        };

        let err = preview_upload::<ShiftRow>(&upload, &opts).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(_)));
        assert!(!opts.temp_dir.exists());
    }

    #[test]
    fn test_stamp_owner() {
        let mut preview = Preview::<SnapshotRow> {
            preview: vec![parse_row(
                &[
                    "E1", "30", "Eng", "L2", "3", "160", "no", "4", "10", "2.5", "Good", "7",
                    "88.5", "60000", "1",
                ],
                ParseMode::Lenient,
            )
            .unwrap()],
            skipped: 0,
        };

        stamp_owner(&mut preview, 42);
        assert_eq!(preview.preview[0].record.owner_user_id, Some(42));
    }

    #[test]
    fn test_confirm_message() {
        let mut outcome = ConfirmOutcome::default();
        outcome.record(0, Ok(()));
        assert_eq!(outcome.message(), "1 rows saved");

        outcome.record(
            1,
            Err(IngestError::MalformedRow {
                expected: 8,
                found: 2,
            }),
        );
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.errors, vec!["row 2: row has 2 of 8 columns (6 missing)"]);
        assert_eq!(outcome.message(), "1 rows saved, 1 rows failed");
    }
}
