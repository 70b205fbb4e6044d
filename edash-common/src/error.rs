//! Error type shared by edash-common and the service

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Pool, schema or query failure during startup
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder or database directory could not be created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file exists but cannot be read or parsed
    #[error("Configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl Error {
    pub fn config(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Error::Config {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
