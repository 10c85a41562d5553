//! File-based config discovery
//!
//! Finds a project config by walking from a root directory up to the
//! filesystem root. Schema handling lives in [`ProjectConfig::from_value`],
//! so library users holding an in-memory tree never touch this module.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::ProjectConfig;
use crate::error::{ConfigError, Result};

/// Candidate file names, tried in this order at every directory level.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "quay.config.toml",
    "quay.toml",
    ".quay.toml",
    "quay.config.json",
    "package.json",
];

const PACKAGE_JSON_FIELD: &str = "quay";

/// A config together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: ProjectConfig,
}

/// Searches conventional locations for a quay config.
///
/// # Example
///
/// ```no_run
/// use quay_config::ConfigDiscovery;
///
/// match ConfigDiscovery::new(".").load()? {
///     Some(loaded) => println!("using {}", loaded.path.display()),
///     None => println!("no config found"),
/// }
/// # Ok::<(), quay_config::ConfigError>(())
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Find the nearest config file, starting at the root and walking up.
    ///
    /// A `package.json` only counts when it carries a non-null `quay` field.
    /// A relative root is resolved against the current directory first.
    pub fn find(&self) -> Option<PathBuf> {
        let root = std::path::absolute(&self.root).unwrap_or_else(|_| self.root.clone());
        root.ancestors().find_map(|dir| {
            CONFIG_FILE_NAMES.iter().find_map(|name| {
                let candidate = dir.join(name);
                if !candidate.is_file() {
                    return None;
                }
                if *name == "package.json" && !has_package_field(&candidate) {
                    return None;
                }
                Some(candidate)
            })
        })
    }

    /// Load the nearest config. Returns `Ok(None)` when there is none.
    pub fn load(&self) -> Result<Option<LoadedConfig>> {
        let Some(path) = self.find() else {
            tracing::debug!(root = %self.root.display(), "no quay config found");
            return Ok(None);
        };

        Self::load_from(&path).map(Some)
    }

    /// Load a config from an explicit file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<LoadedConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let value = parse(path, &content)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        tracing::debug!(path = %path.display(), "loading quay config");
        let config = ProjectConfig::from_value(value, base_dir)?;

        Ok(LoadedConfig {
            path: path.to_path_buf(),
            config,
        })
    }
}

fn parse(path: &Path, content: &str) -> Result<Value> {
    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => {
            let toml_val: toml::Value =
                toml::from_str(content).map_err(|e| parse_error(format!("invalid TOML: {}", e)))?;
            serde_json::to_value(toml_val)
                .map_err(|e| parse_error(format!("TOML to JSON conversion failed: {}", e)))
        }
        _ => {
            let parsed: Value = serde_json::from_str(content)
                .map_err(|e| parse_error(format!("invalid JSON: {}", e)))?;

            if path.file_name() != Some(std::ffi::OsStr::new("package.json")) {
                return Ok(parsed);
            }

            match parsed.get(PACKAGE_JSON_FIELD) {
                Some(value) if !value.is_null() => Ok(value.clone()),
                _ => Err(parse_error(format!(
                    "package.json has no `{}` field",
                    PACKAGE_JSON_FIELD
                ))),
            }
        }
    }
}

fn has_package_field(path: &Path) -> bool {
    fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str::<Value>(&content).ok())
        .and_then(|parsed| parsed.get(PACKAGE_JSON_FIELD).cloned())
        .is_some_and(|value| !value.is_null())
}
