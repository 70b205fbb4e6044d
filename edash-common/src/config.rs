//! Configuration loading and root folder resolution
//!
//! Configuration file resolution order:
//! 1. Command-line argument (highest priority)
//! 2. `EDASH_CONFIG` environment variable
//! 3. User config file (`~/.config/edash/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing configuration file is not an error: the service logs a warning
//! and starts with defaults. A file that exists but cannot be parsed is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "EDASH_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "EDASH_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "edash.db";

/// How the row parser treats cells that fail to parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Unparsable numeric/date cells become zero and are flagged on the row
    #[default]
    Lenient,
    /// The first unparsable cell rejects the whole row
    Strict,
}

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding the database and temporary upload files
    pub root_folder: Option<PathBuf>,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub ingest: IngestConfig,
    pub auth: AuthConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed by CORS; `"*"` allows any
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Upload ingestion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub parse_mode: ParseMode,
    /// Directory for temporary upload files (default: `<root_folder>/tmp`)
    pub temp_dir: Option<PathBuf>,
    /// Maximum accepted request body for uploads, in bytes
    pub max_upload_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            parse_mode: ParseMode::Lenient,
            temp_dir: None,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Caller identity verification settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret shared with the upstream authentication layer; 0 disables hash checks
    pub shared_secret: i64,
}

impl TomlConfig {
    /// Parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(path, format!("read failed: {}", e)))?;
        toml::from_str(&content).map_err(|e| Error::config(path, e))
    }

    /// Resolve and load the configuration file, falling back to defaults
    /// when no file exists.
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self> {
        let candidate = cli_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
            .or_else(default_config_path);

        match candidate {
            Some(path) if path.exists() => {
                let config = Self::load(&path)?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Some(path) => {
                warn!(
                    "Config file not found at {}; using compiled defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory; using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    /// Directory used for temporary upload files
    pub fn temp_dir(&self, root_folder: &Path) -> PathBuf {
        self.ingest
            .temp_dir
            .clone()
            .unwrap_or_else(|| root_folder.join("tmp"))
    }
}

/// Root folder resolution:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config value
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Database file path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// `~/.config/edash/config.toml` (platform config dir)
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("edash").join("config.toml"))
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("edash"))
        .unwrap_or_else(|| PathBuf::from("./edash_data"))
}
