//! # quay-config
//!
//! Project configuration for the quay build orchestrator.
//!
//! A project is described by a single config file (`quay.toml`, a JSON
//! variant, or a `quay` field in `package.json`) that is found by walking
//! upward from a root directory. The file declares shared build settings and
//! any number of named tasks; each task resolves to an independent
//! [`BuildConfig`] by merging its overrides onto the shared settings.
//!
//! ```no_run
//! use quay_config::ConfigDiscovery;
//!
//! # fn main() -> Result<(), quay_config::ConfigError> {
//! if let Some(loaded) = ConfigDiscovery::new(".").load()? {
//!     let build = loaded.config.resolve_task("android-release", &[])?;
//!     println!("{} -> {}", build.entry.display(), build.outfile.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod build;
pub mod config;
pub mod discovery;
pub mod error;
pub mod merge;
pub mod platform;
pub mod validation;

pub use build::{
    AliasConfig, BuildConfig, BuildSettings, ProtocolHandler, ResolverConfig, TransformConfig,
    TransformPlugin,
};
pub use config::{DevServerSettings, ProjectConfig, TaskConfig};
pub use discovery::{ConfigDiscovery, LoadedConfig, CONFIG_FILE_NAMES};
pub use error::{ConfigError, ConfigValidationError, Result};
pub use merge::{merge_all, merge_optional, merge_resolver, merge_transform, Merge};
pub use platform::{default_outfile_name, Platform};
pub use validation::{validate_project, validate_settings};
