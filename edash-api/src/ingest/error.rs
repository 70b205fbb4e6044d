//! Ingestion error taxonomy

use thiserror::Error;

/// Errors raised while decoding, parsing or persisting uploaded rows
#[derive(Debug, Error)]
pub enum IngestError {
    /// Row is shorter than its layout; the row is dropped
    #[error("row has {found} of {expected} columns ({} missing)", .expected - .found)]
    MalformedRow { expected: usize, found: usize },

    /// A cell could not be parsed (strict mode only; lenient mode defaults it)
    #[error("cannot parse column {column}: {value:?}")]
    UnparsableField { column: &'static str, value: String },

    /// File extension is not .csv, .xlsx or .xls
    #[error("unsupported file format {0:?}: only CSV or Excel (.csv, .xlsx, .xls) are accepted")]
    UnsupportedFormat(String),

    /// Temporary storage could not be created or written
    #[error("temporary upload storage failed: {0}")]
    FileAccess(#[source] std::io::Error),

    /// The file could not be opened as its declared format
    #[error("cannot read {format} file: {message}")]
    Decode {
        format: &'static str,
        message: String,
    },

    /// A key-constraint or storage failure while writing one sub-record
    #[error("{record} {key}: {source}")]
    PersistenceConflict {
        record: &'static str,
        key: String,
        #[source]
        source: sqlx::Error,
    },

    /// A parsed row that cannot be stored as given
    #[error("{record} {key}: {reason}")]
    RejectedRow {
        record: &'static str,
        key: String,
        reason: String,
    },
}

impl IngestError {
    /// Attach the failing sub-record and its key to a storage error
    pub fn conflict(record: &'static str, key: impl Into<String>, source: sqlx::Error) -> Self {
        IngestError::PersistenceConflict {
            record,
            key: key.into(),
            source,
        }
    }
}
