//! Registry errors

use std::io;
use std::path::PathBuf;

/// Errors raised while resolving, loading or adding tables
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    #[error("Bad table '{name}': {reason}")]
    FileFormat { name: String, reason: String },

    #[error("Can't read resource '{}': {source}", path.display())]
    ResourceAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RegistryError {
    pub(crate) fn format(name: impl Into<String>, reason: impl ToString) -> Self {
        RegistryError::FileFormat {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RegistryError::ResourceAccess {
            path: path.into(),
            source,
        }
    }

    /// True for failures that mean "no such table" rather than "table is broken"
    pub fn is_unknown_table(&self) -> bool {
        matches!(self, RegistryError::UnknownTable(_))
    }
}

impl From<config::ConfigError> for RegistryError {
    fn from(err: config::ConfigError) -> Self {
        RegistryError::Config(err.to_string())
    }
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
