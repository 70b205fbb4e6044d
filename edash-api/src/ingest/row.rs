//! Typed row layouts and the cell-level parser
//!
//! Each upload layout is a [`TabularRecord`]: a fixed list of column names
//! plus a constructor that pulls typed values out of a [`CellReader`] in
//! column order. The reader owns the lenient/strict policy, so layouts never
//! decide on their own what a bad cell means.

use super::error::IngestError;
use chrono::{DateTime, Utc};
use edash_common::config::ParseMode;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Cell values (trimmed, lower-cased) that mark a row as remote work
const TRUTHY: &[&str] = &["1", "true", "yes", "y", "remote", "да"];

/// A fixed column layout
pub trait TabularRecord: Sized {
    /// Column names in file order
    const COLUMNS: &'static [&'static str];

    /// Build the record from one row; cells are consumed in `COLUMNS` order
    fn from_cells(reader: &mut CellReader<'_>) -> Result<Self, IngestError>;
}

/// A parsed row plus the columns lenient mode had to default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parsed<T> {
    #[serde(flatten)]
    pub record: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defaulted_fields: Vec<String>,
}

/// Sequential typed access to the cells of one row
pub struct CellReader<'a> {
    cells: &'a [String],
    columns: &'static [&'static str],
    position: usize,
    mode: ParseMode,
    defaulted: Vec<String>,
}

impl<'a> CellReader<'a> {
    fn new(cells: &'a [String], columns: &'static [&'static str], mode: ParseMode) -> Self {
        Self {
            cells,
            columns,
            position: 0,
            mode,
            defaulted: Vec::new(),
        }
    }

    /// Advance and return (column name, cell)
    fn advance(&mut self) -> (&'static str, &'a str) {
        let column = self.columns.get(self.position).copied().unwrap_or("?");
        let cell = self
            .cells
            .get(self.position)
            .map(String::as_str)
            .unwrap_or("");
        self.position += 1;
        (column, cell)
    }

    /// Apply the parse mode to a cell that did not parse
    fn fallback<V: Default>(&mut self, column: &'static str, cell: &str) -> Result<V, IngestError> {
        match self.mode {
            ParseMode::Strict => Err(IngestError::UnparsableField {
                column,
                value: cell.to_string(),
            }),
            ParseMode::Lenient => {
                self.defaulted.push(column.to_string());
                Ok(V::default())
            }
        }
    }

    /// Free text; never fails
    pub fn next_text(&mut self) -> String {
        self.advance().1.to_string()
    }

    /// Numeric cell; empty counts as unparsable
    pub fn next_parsed<V>(&mut self) -> Result<V, IngestError>
    where
        V: FromStr + Default,
    {
        let (column, cell) = self.advance();
        match cell.parse::<V>() {
            Ok(value) if !cell.is_empty() => Ok(value),
            _ => self.fallback(column, cell),
        }
    }

    /// RFC 3339 timestamp; lenient mode defaults to the Unix epoch
    pub fn next_datetime(&mut self) -> Result<DateTime<Utc>, IngestError> {
        let (column, cell) = self.advance();
        match DateTime::parse_from_rfc3339(cell) {
            Ok(value) => Ok(value.with_timezone(&Utc)),
            Err(_) => self.fallback(column, cell),
        }
    }

    /// Boolean flag from the truthy set; anything else is false
    pub fn next_flag(&mut self) -> bool {
        let cell = self.advance().1.to_lowercase();
        TRUTHY.contains(&cell.as_str())
    }
}

/// Parse one row of string cells into a typed record.
///
/// Short rows fail with [`IngestError::MalformedRow`]; extra cells are ignored.
pub fn parse_row<T, S>(cells: &[S], mode: ParseMode) -> Result<Parsed<T>, IngestError>
where
    T: TabularRecord,
    S: AsRef<str>,
{
    let expected = T::COLUMNS.len();
    if cells.len() < expected {
        return Err(IngestError::MalformedRow {
            expected,
            found: cells.len(),
        });
    }

    let trimmed: Vec<String> = cells
        .iter()
        .take(expected)
        .map(|cell| cell.as_ref().trim().to_string())
        .collect();

    let mut reader = CellReader::new(&trimmed, T::COLUMNS, mode);
    let record = T::from_cells(&mut reader)?;

    Ok(Parsed {
        record,
        defaulted_fields: reader.defaulted,
    })
}

/// One shift: a work day with its work process and satisfaction metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftRow {
    pub employee_id: i64,
    pub start_work_day: DateTime<Utc>,
    pub end_work_day: DateTime<Utc>,
    pub calls_count: i64,
    pub completed_tasks: i64,
    pub work_life_balance: i64,
    pub satisfaction: i64,
    pub productivity: i64,
}

impl TabularRecord for ShiftRow {
    const COLUMNS: &'static [&'static str] = &[
        "employee_id",
        "start_work_day",
        "end_work_day",
        "calls_count",
        "completed_tasks",
        "work_life_balance",
        "satisfaction",
        "productivity",
    ];

    fn from_cells(reader: &mut CellReader<'_>) -> Result<Self, IngestError> {
        Ok(Self {
            employee_id: reader.next_parsed()?,
            start_work_day: reader.next_datetime()?,
            end_work_day: reader.next_datetime()?,
            calls_count: reader.next_parsed()?,
            completed_tasks: reader.next_parsed()?,
            work_life_balance: reader.next_parsed()?,
            satisfaction: reader.next_parsed()?,
            productivity: reader.next_parsed()?,
        })
    }
}

/// Flat per-employee snapshot keyed by an external employee id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub employee_id: String,
    pub age: i64,
    pub department: String,
    pub job_level: String,
    pub years_at_company: i64,
    pub monthly_hours_worked: f64,
    pub remote_work: bool,
    pub meetings_per_week: i64,
    pub tasks_completed_per_day: f64,
    pub overtime_hours_per_week: f64,
    pub work_life_balance: String,
    pub job_satisfaction: f64,
    pub productivity_score: f64,
    pub annual_salary: f64,
    pub absences_per_year: i64,
    /// Uploading user; stamped by the preview, ignored on confirm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<i64>,
}

impl TabularRecord for SnapshotRow {
    const COLUMNS: &'static [&'static str] = &[
        "employee_id",
        "age",
        "department",
        "job_level",
        "years_at_company",
        "monthly_hours_worked",
        "remote_work",
        "meetings_per_week",
        "tasks_completed_per_day",
        "overtime_hours_per_week",
        "work_life_balance",
        "job_satisfaction",
        "productivity_score",
        "annual_salary",
        "absences_per_year",
    ];

    fn from_cells(reader: &mut CellReader<'_>) -> Result<Self, IngestError> {
        Ok(Self {
            employee_id: reader.next_text(),
            age: reader.next_parsed()?,
            department: reader.next_text(),
            job_level: reader.next_text(),
            years_at_company: reader.next_parsed()?,
            monthly_hours_worked: reader.next_parsed()?,
            remote_work: reader.next_flag(),
            meetings_per_week: reader.next_parsed()?,
            tasks_completed_per_day: reader.next_parsed()?,
            overtime_hours_per_week: reader.next_parsed()?,
            work_life_balance: reader.next_text(),
            job_satisfaction: reader.next_parsed()?,
            productivity_score: reader.next_parsed()?,
            annual_salary: reader.next_parsed()?,
            absences_per_year: reader.next_parsed()?,
            owner_user_id: None,
        })
    }
}
