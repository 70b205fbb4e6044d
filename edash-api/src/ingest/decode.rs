//! File staging and row decoding
//!
//! Uploads are written to a named temporary file first so both decoders read
//! from a path. The [`NamedTempFile`] handle deletes the file when dropped,
//! which covers success, decode errors and early returns alike.

use super::error::IngestError;
use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::DateTime;
use edash_common::time::to_db_timestamp;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Decoder selected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

impl FileFormat {
    /// Pick a decoder by case-insensitive extension
    pub fn from_file_name(file_name: &str) -> Result<Self, IngestError> {
        match extension_of(file_name).as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" | "xls" => Ok(FileFormat::Spreadsheet),
            _ => Err(IngestError::UnsupportedFormat(file_name.to_string())),
        }
    }

    fn label(self) -> &'static str {
        match self {
            FileFormat::Csv => "CSV",
            FileFormat::Spreadsheet => "spreadsheet",
        }
    }
}

/// Lower-cased extension of an uploaded file name (empty when absent)
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Write upload bytes to a temporary file under `temp_dir`
pub fn stage_upload(
    temp_dir: &Path,
    extension: &str,
    bytes: &[u8],
) -> Result<NamedTempFile, IngestError> {
    std::fs::create_dir_all(temp_dir).map_err(IngestError::FileAccess)?;

    let suffix = format!(".{extension}");
    let mut file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&suffix)
        .tempfile_in(temp_dir)
        .map_err(IngestError::FileAccess)?;

    file.write_all(bytes).map_err(IngestError::FileAccess)?;
    file.flush().map_err(IngestError::FileAccess)?;

    Ok(file)
}

/// Feed every data row (header excluded) to `visit` with its 1-based line
/// number. Rows the reader itself cannot decode arrive as `Err(reason)`.
pub fn visit_rows<F>(path: &Path, format: FileFormat, visit: F) -> Result<(), IngestError>
where
    F: FnMut(usize, Result<Vec<String>, String>),
{
    match format {
        FileFormat::Csv => visit_csv(path, visit),
        FileFormat::Spreadsheet => visit_spreadsheet(path, visit),
    }
}

fn visit_csv<F>(path: &Path, mut visit: F) -> Result<(), IngestError>
where
    F: FnMut(usize, Result<Vec<String>, String>),
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| decode_error(FileFormat::Csv, e))?;

    for (index, record) in reader.records().enumerate() {
        let line = index + 2;
        let cells = record
            .map(|record| record.iter().map(str::to_string).collect())
            .map_err(|e| e.to_string());
        visit(line, cells);
    }

    Ok(())
}

fn visit_spreadsheet<F>(path: &Path, mut visit: F) -> Result<(), IngestError>
where
    F: FnMut(usize, Result<Vec<String>, String>),
{
    let mut workbook =
        open_workbook_auto(path).map_err(|e| decode_error(FileFormat::Spreadsheet, e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| decode_error(FileFormat::Spreadsheet, "workbook has no worksheets"))?
        .map_err(|e| decode_error(FileFormat::Spreadsheet, e))?;

    for (index, row) in range.rows().enumerate().skip(1) {
        visit(index + 1, Ok(populated_cells(row)));
    }

    Ok(())
}

/// Cell texts up to the last non-blank cell. A range pads every row to the
/// sheet width, so short rows only show up once the padding is cut off.
fn populated_cells(row: &[Data]) -> Vec<String> {
    let mut cells: Vec<String> = row.iter().map(cell_text).collect();
    while cells.last().is_some_and(|cell| cell.trim().is_empty()) {
        cells.pop();
    }
    cells
}

/// Spreadsheet cell as the text the row parser expects
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            // Excel serials are floats; snap to the nearest second
            Some(naive) => {
                let millis = naive.and_utc().timestamp_millis() + 500;
                match DateTime::from_timestamp(millis.div_euclid(1000), 0) {
                    Some(at) => to_db_timestamp(&at),
                    None => cell.to_string(),
                }
            }
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}

fn decode_error(format: FileFormat, err: impl std::fmt::Display) -> IngestError {
    IngestError::Decode {
        format: format.label(),
        message: err.to_string(),
    }
}
