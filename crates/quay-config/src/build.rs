//! Build settings fragments and the fully resolved build configuration.
//!
//! [`BuildSettings`] is the mergeable fragment shape used by the shared
//! `[build]` table, by task overrides and by plugin-provided config. A
//! [`BuildConfig`] is what a single build session hands to the bundling engine.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::platform::Platform;

/// Rewrites an import specifier to another module.
///
/// With `exact = false` (the default) subpaths are rewritten too, so
/// `react-native/Libraries/Core` follows a `react-native` alias.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasConfig {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub exact: bool,
}

/// Handler for a custom import protocol such as `prelude:` or `asset:`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolHandler {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolve: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<String>,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub alias: Vec<AliasConfig>,
    pub protocols: IndexMap<String, ProtocolHandler>,
}

/// A transform plugin, either by name or as a `[name, options]` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformPlugin {
    Name(String),
    WithOptions(String, Value),
}

impl TransformPlugin {
    pub fn name(&self) -> &str {
        match self {
            TransformPlugin::Name(name) | TransformPlugin::WithOptions(name, _) => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub presets: Vec<String>,
    pub plugins: Vec<TransformPlugin>,
    /// Path patterns that opt a module into the slow transform path.
    pub conditions: Vec<String>,
}

/// A mergeable fragment of build configuration.
///
/// Absent fields defer to whatever they are merged onto.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver: Option<ResolverConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sourcemap: Option<bool>,

    /// Free-form options forwarded untouched to the bundling engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_options: Option<IndexMap<String, Value>>,
}

impl BuildSettings {
    pub fn is_empty(&self) -> bool {
        self == &BuildSettings::default()
    }
}

/// Fully resolved configuration for one build of one platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildConfig {
    pub root: PathBuf,
    pub entry: PathBuf,
    pub platform: Platform,
    pub outdir: PathBuf,
    pub outfile: PathBuf,
    pub resolver: ResolverConfig,
    pub transform: TransformConfig,
    pub cache: bool,
    pub sourcemap: bool,
    pub dev: bool,
    pub engine_options: IndexMap<String, Value>,
    /// Session identifier, `<app>:<task>` or `<app>:<platform>`.
    pub tag: String,
}
