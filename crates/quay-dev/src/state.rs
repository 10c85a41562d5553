//! State shared by the dev server's HTTP handlers.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use parking_lot::Mutex;
use quay_bundler::{BuildResult, BundlingEngine};
use quay_config::{BuildSettings, Platform, ProjectConfig};
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::info;

use crate::endpoints::{EventsSocket, HotSocket, MessageSocket};

type BundleSlot = Arc<OnceCell<Arc<BuildResult>>>;

pub type SharedState = Arc<DevState>;

pub struct DevState {
    project: ProjectConfig,
    fragments: Vec<BuildSettings>,
    engine: Arc<dyn BundlingEngine>,
    messages: Arc<MessageSocket>,
    events: Arc<EventsSocket>,
    hot: Arc<HotSocket>,
    /// Bundle per platform, dropped on reload. Concurrent requests for the
    /// same platform share one build.
    bundles: Mutex<HashMap<Platform, BundleSlot>>,
}

impl DevState {
    pub fn new(
        project: ProjectConfig,
        fragments: Vec<BuildSettings>,
        engine: Arc<dyn BundlingEngine>,
        messages: Arc<MessageSocket>,
        events: Arc<EventsSocket>,
        hot: Arc<HotSocket>,
    ) -> Self {
        Self {
            project,
            fragments,
            engine,
            messages,
            events,
            hot,
            bundles: Mutex::new(HashMap::new()),
        }
    }

    pub fn project(&self) -> &ProjectConfig {
        &self.project
    }

    pub fn messages(&self) -> &Arc<MessageSocket> {
        &self.messages
    }

    pub fn events(&self) -> &Arc<EventsSocket> {
        &self.events
    }

    pub fn hot(&self) -> &Arc<HotSocket> {
        &self.hot
    }

    /// Development bundle for `platform`, built on first request.
    pub async fn bundle(&self, platform: Platform) -> anyhow::Result<Arc<BuildResult>> {
        let slot = Arc::clone(self.bundles.lock().entry(platform).or_default());
        let result = slot.get_or_try_init(|| self.build(platform)).await?;
        Ok(Arc::clone(result))
    }

    async fn build(&self, platform: Platform) -> anyhow::Result<Arc<BuildResult>> {
        let mut config = self.project.resolve_build(platform, &self.fragments);
        config.dev = true;

        self.events
            .report_event(&json!({ "type": "bundle_build_started", "platform": platform }));
        self.hot.update_start();

        let built = self.engine.bundle(&config).await;
        self.hot.update_done();
        let results = built.with_context(|| format!("failed to bundle {}", config.tag))?;

        let index = results
            .iter()
            .position(|result| result.platform == platform)
            .unwrap_or(0);
        let result = results
            .into_iter()
            .nth(index)
            .ok_or_else(|| anyhow!("bundling engine produced no output for {}", config.tag))?;

        info!(tag = %config.tag, bytes = result.bundle.len(), "dev bundle ready");
        self.events
            .report_event(&json!({ "type": "bundle_build_done", "platform": platform }));
        Ok(Arc::new(result))
    }

    /// Forget every cached bundle.
    pub fn invalidate(&self) {
        self.bundles.lock().clear();
    }

    /// Drop cached bundles, then reload `/message` and `/hot` clients.
    /// Returns how many `/message` clients got the command.
    pub fn reload(&self) -> usize {
        self.invalidate();
        self.hot.live_reload();
        self.messages.broadcast("reload", None)
    }

    pub fn is_cached(&self, platform: Platform) -> bool {
        self.bundles
            .lock()
            .get(&platform)
            .is_some_and(|slot| slot.initialized())
    }
}
