//! The bundling engine seam.
//!
//! Quay never parses or transforms sources itself. An engine receives a fully
//! resolved [`BuildConfig`] and returns whatever artifacts it produced.

use std::path::PathBuf;

use async_trait::async_trait;
use quay_config::{BuildConfig, Platform};
use serde_json::Value;

/// One artifact produced by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildResult {
    pub platform: Platform,
    pub outfile: PathBuf,
    pub bundle: Vec<u8>,
    pub sourcemap: Option<Vec<u8>>,
    /// Module graph metadata, written next to the bundle when present.
    pub metafile: Option<Value>,
    pub duration_ms: u64,
}

impl BuildResult {
    pub fn new(platform: Platform, outfile: impl Into<PathBuf>, bundle: impl Into<Vec<u8>>) -> Self {
        Self {
            platform,
            outfile: outfile.into(),
            bundle: bundle.into(),
            sourcemap: None,
            metafile: None,
            duration_ms: 0,
        }
    }

    pub fn with_sourcemap(mut self, sourcemap: impl Into<Vec<u8>>) -> Self {
        self.sourcemap = Some(sourcemap.into());
        self
    }

    pub fn with_metafile(mut self, metafile: Value) -> Self {
        self.metafile = Some(metafile);
        self
    }
}

#[async_trait]
pub trait BundlingEngine: Send + Sync {
    async fn bundle(&self, config: &BuildConfig) -> anyhow::Result<Vec<BuildResult>>;
}
