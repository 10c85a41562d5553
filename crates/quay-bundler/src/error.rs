//! Error types for quay-bundler.

use std::path::PathBuf;

use quay_config::ConfigError;
use thiserror::Error;

use crate::plugin::HookKind;

pub type Result<T> = std::result::Result<T, BuildError>;

/// A hook returned an error. The hook's own error is kept as `source`.
#[derive(Debug, Error)]
#[error("plugin `{plugin}` failed in {kind} hook: {source}")]
pub struct PluginHookError {
    pub plugin: String,
    pub kind: HookKind,
    #[source]
    pub source: anyhow::Error,
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The artifact to read does not exist.
    #[error("artifact not found: {path}")]
    Missing { path: PathBuf },

    #[error("failed to write artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize metafile {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArtifactError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Hook(#[from] PluginHookError),

    #[error("bundling failed for `{tag}`: {source}")]
    Engine {
        tag: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("build session was aborted")]
    Aborted,
}

impl BuildError {
    /// The hook error when a plugin hook failed.
    pub fn as_hook_error(&self) -> Option<&PluginHookError> {
        match self {
            BuildError::Hook(err) => Some(err),
            _ => None,
        }
    }
}
