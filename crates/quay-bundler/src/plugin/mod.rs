//! Plugin descriptors and hook types.
//!
//! A [`Plugin`] bundles an optional config fragment with any number of hooks.
//! [`PluginHooks::from_plugins`] normalizes a list of plugins once, up front,
//! into four ordered hook lists that a [`PluginDriver`] then runs per session.

mod driver;
mod registry;

pub use driver::PluginDriver;
pub use registry::{PluginHooks, RegisteredHook, ResolvedPlugins};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use quay_config::{BuildSettings, ProjectConfig};
use serde::{Deserialize, Serialize};

use crate::context::SessionContext;
use crate::engine::BuildResult;

/// Whether a hook runs before or after the session's main step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookOrder {
    #[default]
    Pre,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    BuildPre,
    BuildPost,
    DevServerPre,
    DevServerPost,
}

impl HookKind {
    pub const ALL: [HookKind; 4] = [
        HookKind::BuildPre,
        HookKind::BuildPost,
        HookKind::DevServerPre,
        HookKind::DevServerPost,
    ];

    fn build(order: HookOrder) -> Self {
        match order {
            HookOrder::Pre => HookKind::BuildPre,
            HookOrder::Post => HookKind::BuildPost,
        }
    }

    fn dev_server(order: HookOrder) -> Self {
        match order {
            HookOrder::Pre => HookKind::DevServerPre,
            HookOrder::Post => HookKind::DevServerPost,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::BuildPre => "build:pre",
            HookKind::BuildPost => "build:post",
            HookKind::DevServerPre => "dev-server:pre",
            HookKind::DevServerPost => "dev-server:post",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed arguments handed to every hook of a session.
#[derive(Debug, Clone)]
pub struct HookArgs {
    pub root_dir: PathBuf,
    pub entry_file: PathBuf,
    pub app_name: String,
    pub out_dir: PathBuf,
    /// Set for dev-server hooks only.
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Engine output, set for build post-hooks. May be empty.
    pub build_results: Arc<[BuildResult]>,
}

impl HookArgs {
    pub fn from_project(project: &ProjectConfig) -> Self {
        Self {
            root_dir: project.root.clone(),
            entry_file: project.entry_file.clone(),
            app_name: project.app_name.clone(),
            out_dir: project.outdir.clone(),
            host: None,
            port: None,
            build_results: Arc::from(Vec::new()),
        }
    }
}

/// A plugin callback.
///
/// Hooks of one session run strictly one after another and share the
/// session's [`SessionContext`]. Returning an error stops the session.
#[async_trait]
pub trait Hook: Send + Sync {
    async fn run(&self, ctx: &mut SessionContext, args: &HookArgs) -> anyhow::Result<()>;
}

struct FnHook<F>(F);

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(&mut SessionContext, &HookArgs) -> anyhow::Result<()> + Send + Sync,
{
    async fn run(&self, ctx: &mut SessionContext, args: &HookArgs) -> anyhow::Result<()> {
        (self.0)(ctx, args)
    }
}

/// Wrap a synchronous closure as a [`Hook`].
///
/// ```
/// use quay_bundler::plugin::{hook_fn, HookOrder, Plugin};
///
/// let plugin = Plugin::new("stamp").build(
///     HookOrder::Pre,
///     hook_fn(|ctx, args| {
///         ctx.insert("app", args.app_name.clone());
///         Ok(())
///     }),
/// );
/// assert_eq!(plugin.name(), "stamp");
/// ```
pub fn hook_fn<F>(f: F) -> Arc<dyn Hook>
where
    F: Fn(&mut SessionContext, &HookArgs) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnHook(f))
}

/// A plugin descriptor.
#[derive(Clone)]
pub struct Plugin {
    name: String,
    config: Option<BuildSettings>,
    hooks: Vec<(HookKind, Arc<dyn Hook>)>,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: None,
            hooks: Vec::new(),
        }
    }

    /// Build settings merged into every build after the shared settings.
    pub fn config(mut self, settings: BuildSettings) -> Self {
        self.config = Some(settings);
        self
    }

    pub fn build(mut self, order: HookOrder, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push((HookKind::build(order), hook));
        self
    }

    pub fn dev_server(mut self, order: HookOrder, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push((HookKind::dev_server(order), hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> Option<&BuildSettings> {
        self.config.as_ref()
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<_> = self.hooks.iter().map(|(kind, _)| kind.as_str()).collect();
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("hooks", &kinds)
            .finish()
    }
}
