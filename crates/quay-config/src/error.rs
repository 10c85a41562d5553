//! Error types for configuration discovery, parsing and validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// A schema violation, naming the offending field by its dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid config field `{field}`: {message}")]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl ConfigValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while loading or resolving project configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field failed schema validation.
    #[error(transparent)]
    Validation(#[from] ConfigValidationError),

    /// The config file is not valid TOML or JSON.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A task was requested by a name the config does not declare.
    #[error("unknown task `{name}`")]
    UnknownTask { name: String },

    /// Reading the config file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// The offending field when this is a validation failure.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::Validation(err) => Some(&err.field),
            _ => None,
        }
    }
}
