//! Project configuration and per-task resolution.
//!
//! This module provides [`ProjectConfig`] and the task merging logic. For
//! finding the config file on disk, see the `discovery` module.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use path_clean::PathClean;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::build::{BuildConfig, BuildSettings};
use crate::error::{ConfigError, ConfigValidationError, Result};
use crate::merge::merge_all;
use crate::platform::{default_outfile_name, Platform};
use crate::validation::validate_project;

const KNOWN_FIELDS: &[&str] = &[
    "app_name",
    "scheme",
    "root",
    "outdir",
    "entry_file",
    "build",
    "dev_server",
    "tasks",
];

pub const DEFAULT_OUTDIR: &str = "dist";
pub const DEFAULT_ENTRY_FILE: &str = "./src/_app.tsx";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for DevServerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8081,
        }
    }
}

/// A named build task. Every field overrides the project-level value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_file: Option<PathBuf>,

    /// Bundle file name, relative to the project's `outdir`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outfile: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev: Option<bool>,

    pub build: BuildSettings,
}

/// A validated project configuration.
///
/// `root`, `entry_file` and `outdir` are absolute once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectConfig {
    pub app_name: String,
    pub scheme: String,
    pub root: PathBuf,
    pub outdir: PathBuf,
    pub entry_file: PathBuf,
    pub build: BuildSettings,
    pub dev_server: DevServerSettings,
    pub tasks: IndexMap<String, TaskConfig>,
}

impl ProjectConfig {
    /// Programmatic config with every optional field at its default.
    pub fn new(app_name: impl Into<String>, scheme: impl Into<String>, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf().clean();
        Self {
            app_name: app_name.into(),
            scheme: scheme.into(),
            outdir: root.join(DEFAULT_OUTDIR).clean(),
            entry_file: root.join(DEFAULT_ENTRY_FILE).clean(),
            root,
            build: BuildSettings::default(),
            dev_server: DevServerSettings::default(),
            tasks: IndexMap::new(),
        }
    }

    /// Parse and validate a config tree.
    ///
    /// Relative paths are resolved against `base_dir`, normally the directory
    /// holding the config file. Unknown fields are logged and skipped.
    pub fn from_value(value: Value, base_dir: &Path) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(ConfigValidationError::new("<root>", "expected a table of settings").into());
        };

        for key in map.keys() {
            if !KNOWN_FIELDS.contains(&key.as_str()) {
                tracing::warn!(field = %key, "ignoring unknown config field");
            }
        }

        let app_name: Option<String> = take_field(&mut map, "app_name")?;
        let scheme: Option<String> = take_field(&mut map, "scheme")?;
        let root: Option<PathBuf> = take_field(&mut map, "root")?;
        let outdir: Option<PathBuf> = take_field(&mut map, "outdir")?;
        let entry_file: Option<PathBuf> = take_field(&mut map, "entry_file")?;
        let build: Option<BuildSettings> = take_field(&mut map, "build")?;
        let dev_server: Option<DevServerSettings> = take_field(&mut map, "dev_server")?;
        let tasks: Option<IndexMap<String, TaskConfig>> = take_field(&mut map, "tasks")?;

        let app_name = app_name.ok_or_else(|| ConfigValidationError::new("app_name", "is required"))?;
        let scheme = scheme.ok_or_else(|| ConfigValidationError::new("scheme", "is required"))?;

        let root = match root {
            Some(root) => base_dir.join(root).clean(),
            None => base_dir.to_path_buf().clean(),
        };
        let outdir = root
            .join(outdir.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTDIR)))
            .clean();
        let entry_file = root
            .join(entry_file.unwrap_or_else(|| PathBuf::from(DEFAULT_ENTRY_FILE)))
            .clean();

        let config = ProjectConfig {
            app_name,
            scheme,
            root,
            outdir,
            entry_file,
            build: build.unwrap_or_default(),
            dev_server: dev_server.unwrap_or_default(),
            tasks: tasks.unwrap_or_default(),
        };

        validate_project(&config)?;
        Ok(config)
    }

    pub fn task(&self, name: &str) -> Result<&TaskConfig> {
        self.tasks.get(name).ok_or_else(|| ConfigError::UnknownTask {
            name: name.to_string(),
        })
    }

    /// Effective configuration of a named task.
    ///
    /// Merge order is shared `build` settings, then `fragments` in order
    /// (plugin-provided config), then the task's own overrides. The project
    /// itself is never modified, so resolving one task cannot affect another.
    pub fn resolve_task(&self, name: &str, fragments: &[BuildSettings]) -> Result<BuildConfig> {
        let task = self.task(name)?;
        let platform = task.platform.ok_or_else(|| {
            ConfigValidationError::new(
                format!("tasks.{}.platform", name),
                "is required to resolve the task",
            )
        })?;

        Ok(self.resolve(platform, Some((name, task)), fragments))
    }

    /// Effective configuration for a platform without a task.
    pub fn resolve_build(&self, platform: Platform, fragments: &[BuildSettings]) -> BuildConfig {
        self.resolve(platform, None, fragments)
    }

    /// Resolve every declared task, in declaration order.
    pub fn resolve_all_tasks(&self, fragments: &[BuildSettings]) -> Result<Vec<BuildConfig>> {
        self.tasks
            .keys()
            .map(|name| self.resolve_task(name, fragments))
            .collect()
    }

    fn resolve(
        &self,
        platform: Platform,
        task: Option<(&str, &TaskConfig)>,
        fragments: &[BuildSettings],
    ) -> BuildConfig {
        let overrides = task.map(|(_, task)| task.build.clone());
        let settings = merge_all(
            self.build.clone(),
            fragments.iter().cloned().chain(overrides),
        );

        let entry = task
            .and_then(|(_, task)| task.entry_file.as_ref())
            .map(|entry| self.root.join(entry).clean())
            .unwrap_or_else(|| self.entry_file.clone());
        let outfile_name = task
            .and_then(|(_, task)| task.outfile.clone())
            .unwrap_or_else(|| PathBuf::from(default_outfile_name(&entry, platform)));
        let tag = match task {
            Some((name, _)) => format!("{}:{}", self.app_name, name),
            None => format!("{}:{}", self.app_name, platform),
        };

        BuildConfig {
            root: self.root.clone(),
            outfile: self.outdir.join(outfile_name).clean(),
            entry,
            platform,
            outdir: self.outdir.clone(),
            resolver: settings.resolver.unwrap_or_default(),
            transform: settings.transform.unwrap_or_default(),
            cache: settings.cache.unwrap_or(true),
            sourcemap: settings.sourcemap.unwrap_or(true),
            dev: task.and_then(|(_, task)| task.dev).unwrap_or(true),
            engine_options: settings.engine_options.unwrap_or_default(),
            tag,
        }
    }
}

fn take_field<T: DeserializeOwned>(map: &mut Map<String, Value>, field: &str) -> Result<Option<T>> {
    let Some(value) = map.remove(field) else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }

    serde_ignored::deserialize(value, |path| {
        tracing::warn!(field = %format!("{}.{}", field, path), "ignoring unknown config field");
    })
    .map(Some)
    .map_err(|err| ConfigValidationError::new(field, err.to_string()).into())
}
