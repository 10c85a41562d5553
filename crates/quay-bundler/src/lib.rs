//! # quay-bundler
//!
//! Build orchestration for quay projects.
//!
//! Quay drives builds but does not bundle: a [`BundlingEngine`] turns a
//! resolved [`BuildConfig`](quay_config::BuildConfig) into artifacts. Around
//! that call, plugins hook into the session:
//!
//! 1. build pre-hooks run in registration order, sharing one [`SessionContext`]
//! 2. the engine runs once per target
//! 3. bundles and metafiles are written next to each outfile
//! 4. build post-hooks run with the engine's results
//!
//! Any hook error ends the session immediately.
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use quay_bundler::{BuildOptions, BuildOrchestrator, BuildResult, BundlingEngine};
//! use quay_bundler::plugin::{hook_fn, HookOrder, Plugin};
//! use quay_config::{BuildConfig, Platform, ProjectConfig};
//!
//! struct Engine;
//!
//! #[async_trait]
//! impl BundlingEngine for Engine {
//!     async fn bundle(&self, config: &BuildConfig) -> anyhow::Result<Vec<BuildResult>> {
//!         Ok(vec![BuildResult::new(config.platform, &config.outfile, "/* bundle */")])
//!     }
//! }
//!
//! # async fn run() -> Result<(), quay_bundler::BuildError> {
//! let project = ProjectConfig::new("shop", "shop", ".");
//! let stamp = Plugin::new("stamp").build(
//!     HookOrder::Pre,
//!     hook_fn(|ctx, _| {
//!         ctx.insert("started", true);
//!         Ok(())
//!     }),
//! );
//!
//! let orchestrator = BuildOrchestrator::new(project, vec![stamp], Arc::new(Engine));
//! let outcome = orchestrator.build(BuildOptions::platform(Platform::Android)).await?;
//! assert!(outcome.context.contains_key("started"));
//! # Ok(())
//! # }
//! ```

pub mod abort;
pub mod artifact;
pub mod context;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod plugin;

#[cfg(feature = "logging")]
pub mod logging;

pub use abort::{AbortController, AbortSignal};
pub use context::SessionContext;
pub use engine::{BuildResult, BundlingEngine};
pub use error::{ArtifactError, BuildError, PluginHookError, Result};
pub use orchestrator::{BuildOptions, BuildOrchestrator, BuildOutcome, BuildTarget, DEFAULT_CONCURRENCY};
pub use plugin::{hook_fn, Hook, HookArgs, HookKind, HookOrder, Plugin, PluginDriver, PluginHooks};

pub use quay_config::default_outfile_name;
