//! Merge semantics for configuration fragments.
//!
//! Merging is always `source` then `target`:
//! - both absent: absent
//! - one present: that side, unchanged
//! - both present: arrays concatenate source-then-target, maps shallow-merge
//!   with target keys winning, scalars take the target's value
//!
//! Merges take their inputs by value, so the result never aliases either side.

use indexmap::IndexMap;

use crate::build::{BuildSettings, ResolverConfig, TransformConfig};

pub trait Merge: Sized {
    /// Merge `target` on top of `self`.
    fn merge(self, target: Self) -> Self;
}

pub fn merge_optional<T: Merge>(source: Option<T>, target: Option<T>) -> Option<T> {
    match (source, target) {
        (None, None) => None,
        (Some(source), None) => Some(source),
        (None, Some(target)) => Some(target),
        (Some(source), Some(target)) => Some(source.merge(target)),
    }
}

pub fn merge_resolver(
    source: Option<ResolverConfig>,
    target: Option<ResolverConfig>,
) -> Option<ResolverConfig> {
    merge_optional(source, target)
}

pub fn merge_transform(
    source: Option<TransformConfig>,
    target: Option<TransformConfig>,
) -> Option<TransformConfig> {
    merge_optional(source, target)
}

impl<V> Merge for IndexMap<String, V> {
    fn merge(mut self, target: Self) -> Self {
        self.extend(target);
        self
    }
}

impl Merge for ResolverConfig {
    fn merge(mut self, target: Self) -> Self {
        self.alias.extend(target.alias);
        ResolverConfig {
            alias: self.alias,
            protocols: self.protocols.merge(target.protocols),
        }
    }
}

impl Merge for TransformConfig {
    fn merge(mut self, target: Self) -> Self {
        self.presets.extend(target.presets);
        self.plugins.extend(target.plugins);
        self.conditions.extend(target.conditions);
        self
    }
}

impl Merge for BuildSettings {
    fn merge(self, target: Self) -> Self {
        BuildSettings {
            resolver: merge_resolver(self.resolver, target.resolver),
            transform: merge_transform(self.transform, target.transform),
            cache: target.cache.or(self.cache),
            sourcemap: target.sourcemap.or(self.sourcemap),
            engine_options: merge_optional(self.engine_options, target.engine_options),
        }
    }
}

/// Fold fragments left to right onto `base`.
pub fn merge_all(base: BuildSettings, fragments: impl IntoIterator<Item = BuildSettings>) -> BuildSettings {
    fragments.into_iter().fold(base, Merge::merge)
}
