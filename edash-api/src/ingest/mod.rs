//! Upload ingestion pipeline
//!
//! File → rows ([`decode`]) → typed records ([`row`]) → preview, and
//! preview → reconciliation writer ([`orchestrator`]).

pub mod decode;
pub mod error;
pub mod orchestrator;
pub mod row;

pub use error::IngestError;
pub use orchestrator::{
    confirm_shifts, confirm_snapshots, preview_upload, stamp_owner, ConfirmOutcome, IngestOptions,
    Preview, Upload,
};
pub use row::{parse_row, Parsed, ShiftRow, SnapshotRow, TabularRecord};
