//! # Application Configuration
//!
//! Optional TOML file read once at startup. Command line flags win over
//! values from the file.
//!
//! ```toml
//! database = "rigbook.db"
//! backend = "redb"
//!
//! [catalog]
//! max_page_size = 200
//! allow_self_compatibility = false
//! ```

use clap::ValueEnum;
use rigbook_core::{CatalogConfig, CatalogError};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "rigbook.toml";

pub const DEFAULT_DATABASE: &str = "rigbook.db";

/// Largest config file read.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Where the catalog lives between invocations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Snapshot file loaded into memory and written back after changes.
    File,
    /// ACID redb database.
    #[default]
    Redb,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Redb => f.write_str("redb"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: PathBuf,
    pub backend: Backend,
    pub catalog: CatalogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            backend: Backend::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, CatalogError> {
        let config: Self =
            toml::from_str(text).map_err(|e| CatalogError::Config(e.to_string()))?;
        config.catalog.validate()?;
        Ok(config)
    }

    /// Load `path`, or [`DEFAULT_CONFIG_FILE`] if it exists, or defaults.
    ///
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        let path = match path {
            Some(path) => path,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Path::new(DEFAULT_CONFIG_FILE),
            None => return Ok(Self::default()),
        };

        let metadata = std::fs::metadata(path).map_err(|e| {
            CatalogError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(CatalogError::Config(format!(
                "Config file {} exceeds {} bytes",
                path.display(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply command line overrides.
    #[must_use]
    pub fn with_overrides(mut self, database: Option<PathBuf>, backend: Option<Backend>) -> Self {
        if let Some(database) = database {
            self.database = database;
        }
        if let Some(backend) = backend {
            self.backend = backend;
        }
        self
    }
}
