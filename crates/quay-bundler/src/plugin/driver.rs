//! Runs normalized hooks for one session.

use std::sync::Arc;

use tracing::debug;

use super::{HookArgs, HookKind, PluginHooks};
use crate::abort::AbortSignal;
use crate::context::SessionContext;
use crate::engine::BuildResult;
use crate::error::{BuildError, PluginHookError, Result};

/// Drives the hooks of a single build or dev-server session.
///
/// The driver owns the session's [`SessionContext`]; it starts empty and is
/// never shared with another driver.
pub struct PluginDriver {
    hooks: Arc<PluginHooks>,
    args: HookArgs,
    context: SessionContext,
    abort: Option<AbortSignal>,
}

impl PluginDriver {
    pub fn new(hooks: Arc<PluginHooks>, args: HookArgs) -> Self {
        Self {
            hooks,
            args,
            context: SessionContext::new(),
            abort: None,
        }
    }

    pub fn with_abort(mut self, signal: AbortSignal) -> Self {
        self.abort = Some(signal);
        self
    }

    pub async fn run_build_pre(&mut self) -> Result<()> {
        let args = self.args.clone();
        self.run(HookKind::BuildPre, &args).await
    }

    pub async fn run_build_post(&mut self, results: Arc<[BuildResult]>) -> Result<()> {
        let args = HookArgs {
            build_results: results,
            ..self.args.clone()
        };
        self.run(HookKind::BuildPost, &args).await
    }

    pub async fn run_dev_pre(&mut self, host: &str, port: u16) -> Result<()> {
        let args = self.dev_args(host, port);
        self.run(HookKind::DevServerPre, &args).await
    }

    pub async fn run_dev_post(&mut self, host: &str, port: u16) -> Result<()> {
        let args = self.dev_args(host, port);
        self.run(HookKind::DevServerPost, &args).await
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn into_context(self) -> SessionContext {
        self.context
    }

    pub(crate) fn check_abort(&self) -> Result<()> {
        match &self.abort {
            Some(signal) if signal.is_aborted() => Err(BuildError::Aborted),
            _ => Ok(()),
        }
    }

    fn dev_args(&self, host: &str, port: u16) -> HookArgs {
        HookArgs {
            host: Some(host.to_string()),
            port: Some(port),
            ..self.args.clone()
        }
    }

    async fn run(&mut self, kind: HookKind, args: &HookArgs) -> Result<()> {
        let hooks = Arc::clone(&self.hooks);

        for entry in hooks.get(kind) {
            self.check_abort()?;
            debug!(plugin = %entry.plugin, hook = %kind, "running plugin hook");

            entry
                .hook
                .run(&mut self.context, args)
                .await
                .map_err(|source| PluginHookError {
                    plugin: entry.plugin.clone(),
                    kind,
                    source,
                })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{hook_fn, HookOrder, Plugin};
    use quay_config::ProjectConfig;

    fn driver(plugins: Vec<Plugin>) -> PluginDriver {
        let project = ProjectConfig::new("shop", "quay", "/work/shop");
        let resolved = PluginHooks::from_plugins(plugins);
        PluginDriver::new(Arc::new(resolved.hooks), HookArgs::from_project(&project))
    }

    #[tokio::test]
    async fn dev_hooks_receive_host_and_port() {
        let mut driver = driver(vec![Plugin::new("dev").dev_server(
            HookOrder::Pre,
            hook_fn(|ctx, args| {
                ctx.insert("host", args.host.clone().unwrap_or_default());
                ctx.insert("port", args.port.unwrap_or_default());
                Ok(())
            }),
        )]);

        driver.run_dev_pre("0.0.0.0", 8081).await.unwrap();
        assert_eq!(driver.context().get_as::<String>("host").as_deref(), Some("0.0.0.0"));
        assert_eq!(driver.context().get_as::<u16>("port"), Some(8081));
    }

    #[tokio::test]
    async fn build_hooks_see_project_args() {
        let mut driver = driver(vec![Plugin::new("args").build(
            HookOrder::Pre,
            hook_fn(|ctx, args| {
                assert!(args.host.is_none());
                assert!(args.build_results.is_empty());
                ctx.insert("app", args.app_name.clone());
                ctx.insert("out", args.out_dir.display().to_string());
                Ok(())
            }),
        )]);

        driver.run_build_pre().await.unwrap();
        assert_eq!(driver.context().get_as::<String>("app").as_deref(), Some("shop"));
        assert_eq!(
            driver.context().get_as::<String>("out").as_deref(),
            Some("/work/shop/dist")
        );
    }

    #[tokio::test]
    async fn aborted_signal_stops_before_first_hook() {
        let controller = crate::abort::AbortController::new();
        let mut driver = driver(vec![Plugin::new("never").build(
            HookOrder::Pre,
            hook_fn(|ctx, _| {
                ctx.insert("ran", true);
                Ok(())
            }),
        )])
        .with_abort(controller.signal());

        controller.abort();
        let err = driver.run_build_pre().await.unwrap_err();
        assert!(matches!(err, BuildError::Aborted));
        assert!(driver.context().is_empty());
    }
}
