//! Normalized hook lists.

use std::collections::HashSet;
use std::sync::Arc;

use quay_config::BuildSettings;

use super::{Hook, HookKind, Plugin};

/// A hook together with the plugin that registered it.
#[derive(Clone)]
pub struct RegisteredHook {
    pub plugin: String,
    pub hook: Arc<dyn Hook>,
}

/// Hooks partitioned by kind, each list in plugin registration order.
#[derive(Clone, Default)]
pub struct PluginHooks {
    build_pre: Vec<RegisteredHook>,
    build_post: Vec<RegisteredHook>,
    dev_server_pre: Vec<RegisteredHook>,
    dev_server_post: Vec<RegisteredHook>,
}

/// Output of [`PluginHooks::from_plugins`].
pub struct ResolvedPlugins {
    pub hooks: PluginHooks,
    /// Config fragments in registration order, ready to merge.
    pub configs: Vec<BuildSettings>,
}

impl PluginHooks {
    pub fn from_plugins(plugins: Vec<Plugin>) -> ResolvedPlugins {
        let mut hooks = PluginHooks::default();
        let mut configs = Vec::new();
        let mut seen = HashSet::new();

        for plugin in plugins {
            if !seen.insert(plugin.name.clone()) {
                tracing::warn!(plugin = %plugin.name, "plugin registered more than once");
            }

            if let Some(config) = plugin.config {
                configs.push(config);
            }

            for (kind, hook) in plugin.hooks {
                hooks.list_mut(kind).push(RegisteredHook {
                    plugin: plugin.name.clone(),
                    hook,
                });
            }
        }

        tracing::debug!(
            build_pre = hooks.build_pre.len(),
            build_post = hooks.build_post.len(),
            dev_server_pre = hooks.dev_server_pre.len(),
            dev_server_post = hooks.dev_server_post.len(),
            "resolved plugin hooks"
        );

        ResolvedPlugins { hooks, configs }
    }

    pub fn get(&self, kind: HookKind) -> &[RegisteredHook] {
        match kind {
            HookKind::BuildPre => &self.build_pre,
            HookKind::BuildPost => &self.build_post,
            HookKind::DevServerPre => &self.dev_server_pre,
            HookKind::DevServerPost => &self.dev_server_post,
        }
    }

    /// Plugin names registered for `kind`, in run order.
    pub fn names(&self, kind: HookKind) -> Vec<&str> {
        self.get(kind).iter().map(|entry| entry.plugin.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        HookKind::ALL.iter().all(|kind| self.get(*kind).is_empty())
    }

    fn list_mut(&mut self, kind: HookKind) -> &mut Vec<RegisteredHook> {
        match kind {
            HookKind::BuildPre => &mut self.build_pre,
            HookKind::BuildPost => &mut self.build_post,
            HookKind::DevServerPre => &mut self.dev_server_pre,
            HookKind::DevServerPost => &mut self.dev_server_post,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{hook_fn, HookOrder};

    fn noop() -> Arc<dyn Hook> {
        hook_fn(|_, _| Ok(()))
    }

    #[test]
    fn partitions_by_kind_in_registration_order() {
        let plugins = vec![
            Plugin::new("a").build(HookOrder::Post, noop()).build(HookOrder::Pre, noop()),
            Plugin::new("b").build(HookOrder::Pre, noop()).dev_server(HookOrder::Post, noop()),
            Plugin::new("c").dev_server(HookOrder::Pre, noop()),
        ];

        let resolved = PluginHooks::from_plugins(plugins);
        let hooks = &resolved.hooks;

        assert_eq!(hooks.names(HookKind::BuildPre), vec!["a", "b"]);
        assert_eq!(hooks.names(HookKind::BuildPost), vec!["a"]);
        assert_eq!(hooks.names(HookKind::DevServerPre), vec!["c"]);
        assert_eq!(hooks.names(HookKind::DevServerPost), vec!["b"]);
    }

    #[test]
    fn collects_config_fragments_in_order() {
        let fragment = |cache| BuildSettings {
            cache: Some(cache),
            ..Default::default()
        };
        let plugins = vec![
            Plugin::new("a").config(fragment(true)),
            Plugin::new("b"),
            Plugin::new("c").config(fragment(false)),
        ];

        let resolved = PluginHooks::from_plugins(plugins);
        let caches: Vec<_> = resolved.configs.iter().map(|c| c.cache).collect();
        assert_eq!(caches, vec![Some(true), Some(false)]);
        assert!(resolved.hooks.is_empty());
    }
}
