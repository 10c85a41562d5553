//! Build sessions.
//!
//! A session is: build pre-hooks, one engine invocation per target, artifact
//! writes, build post-hooks. Pre-hook failure skips everything after it. Each
//! session owns a fresh [`SessionContext`], so concurrent sessions never share
//! hook state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use path_clean::PathClean;
use quay_config::{BuildConfig, BuildSettings, Platform, ProjectConfig};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::abort::AbortSignal;
use crate::artifact;
use crate::context::SessionContext;
use crate::engine::{BuildResult, BundlingEngine};
use crate::error::{BuildError, Result};
use crate::plugin::{HookArgs, Plugin, PluginDriver, PluginHooks};

pub const DEFAULT_CONCURRENCY: usize = 2;

/// What to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildTarget {
    Platform(Platform),
    /// A task declared in the project config.
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub target: BuildTarget,
    /// Overrides the resolved outfile. Relative paths are joined to `outdir`.
    pub outfile: Option<PathBuf>,
    pub dev: Option<bool>,
}

impl BuildOptions {
    pub fn platform(platform: Platform) -> Self {
        Self {
            target: BuildTarget::Platform(platform),
            outfile: None,
            dev: None,
        }
    }

    pub fn task(name: impl Into<String>) -> Self {
        Self {
            target: BuildTarget::Task(name.into()),
            outfile: None,
            dev: None,
        }
    }

    pub fn outfile(mut self, outfile: impl Into<PathBuf>) -> Self {
        self.outfile = Some(outfile.into());
        self
    }

    pub fn dev(mut self, dev: bool) -> Self {
        self.dev = Some(dev);
        self
    }
}

/// Result of a finished session.
#[derive(Debug)]
pub struct BuildOutcome {
    pub results: Arc<[BuildResult]>,
    /// Session state as the last hook left it.
    pub context: SessionContext,
}

pub struct BuildOrchestrator {
    project: ProjectConfig,
    hooks: Arc<PluginHooks>,
    fragments: Vec<BuildSettings>,
    engine: Arc<dyn BundlingEngine>,
    abort: Option<AbortSignal>,
    write_artifacts: bool,
}

impl BuildOrchestrator {
    pub fn new(project: ProjectConfig, plugins: Vec<Plugin>, engine: Arc<dyn BundlingEngine>) -> Self {
        let resolved = PluginHooks::from_plugins(plugins);
        Self {
            project,
            hooks: Arc::new(resolved.hooks),
            fragments: resolved.configs,
            engine,
            abort: None,
            write_artifacts: true,
        }
    }

    pub fn with_abort(mut self, signal: AbortSignal) -> Self {
        self.abort = Some(signal);
        self
    }

    /// Skip writing bundles and metafiles; results are only handed to hooks.
    pub fn without_artifacts(mut self) -> Self {
        self.write_artifacts = false;
        self
    }

    pub fn project(&self) -> &ProjectConfig {
        &self.project
    }

    /// Effective configuration for `options`, without running anything.
    pub fn resolve(&self, options: &BuildOptions) -> Result<BuildConfig> {
        let mut config = match &options.target {
            BuildTarget::Platform(platform) => self.project.resolve_build(*platform, &self.fragments),
            BuildTarget::Task(name) => self.project.resolve_task(name, &self.fragments)?,
        };

        if let Some(outfile) = &options.outfile {
            config.outfile = config.outdir.join(outfile).clean();
        }
        if let Some(dev) = options.dev {
            config.dev = dev;
        }

        Ok(config)
    }

    /// Run one build session.
    pub async fn build(&self, options: BuildOptions) -> Result<BuildOutcome> {
        let config = self.resolve(&options)?;
        let mut driver = self.driver();
        info!(tag = %config.tag, platform = %config.platform, "build started");

        driver.run_build_pre().await?;
        driver.check_abort()?;

        let results = self.bundle_one(&config).await?;
        self.finish(driver, results).await
    }

    /// Build several targets in one session.
    ///
    /// Pre-hooks and post-hooks run once. Engine calls run with at most
    /// `concurrency` in flight; results keep the order of `targets`. Any
    /// failed target fails the session before post-hooks run.
    pub async fn build_all(&self, targets: Vec<BuildOptions>, concurrency: usize) -> Result<BuildOutcome> {
        let configs = targets
            .iter()
            .map(|options| self.resolve(options))
            .collect::<Result<Vec<_>>>()?;

        let mut driver = self.driver();
        info!(targets = configs.len(), concurrency, "build session started");

        driver.run_build_pre().await?;
        driver.check_abort()?;

        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut join_set = JoinSet::new();

        for (index, config) in configs.into_iter().enumerate() {
            let engine = Arc::clone(&self.engine);
            let semaphore = Arc::clone(&semaphore);

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let outcome = invoke_engine(engine.as_ref(), &config).await;
                (index, outcome)
            });
        }

        let collected = self.until_aborted(collect(join_set)).await?;
        let mut ordered = collected?;
        ordered.sort_by_key(|(index, _)| *index);
        let results = ordered.into_iter().flat_map(|(_, results)| results).collect();

        self.finish(driver, results).await
    }

    fn driver(&self) -> PluginDriver {
        let driver = PluginDriver::new(Arc::clone(&self.hooks), HookArgs::from_project(&self.project));
        match &self.abort {
            Some(signal) => driver.with_abort(signal.clone()),
            None => driver,
        }
    }

    async fn bundle_one(&self, config: &BuildConfig) -> Result<Vec<BuildResult>> {
        self.until_aborted(invoke_engine(self.engine.as_ref(), config))
            .await?
    }

    async fn finish(&self, mut driver: PluginDriver, results: Vec<BuildResult>) -> Result<BuildOutcome> {
        driver.check_abort()?;

        if self.write_artifacts {
            for result in &results {
                artifact::write_bundle(result).await?;
                artifact::write_metafile(&result.outfile, result.metafile.as_ref()).await?;
            }
        }

        let results: Arc<[BuildResult]> = results.into();
        driver.run_build_post(Arc::clone(&results)).await?;
        info!(results = results.len(), "build finished");

        Ok(BuildOutcome {
            results,
            context: driver.into_context(),
        })
    }

    /// Race `future` against the abort signal, if one is installed.
    async fn until_aborted<F: std::future::Future>(&self, future: F) -> Result<F::Output> {
        match &self.abort {
            Some(signal) => tokio::select! {
                output = future => Ok(output),
                _ = signal.aborted() => Err(BuildError::Aborted),
            },
            None => Ok(future.await),
        }
    }
}

async fn invoke_engine(engine: &dyn BundlingEngine, config: &BuildConfig) -> Result<Vec<BuildResult>> {
    let started = Instant::now();
    debug!(tag = %config.tag, entry = %config.entry.display(), "invoking bundling engine");

    let mut results = engine
        .bundle(config)
        .await
        .map_err(|source| BuildError::Engine {
            tag: config.tag.clone(),
            source,
        })?;

    let elapsed = started.elapsed().as_millis() as u64;
    for result in &mut results {
        if result.duration_ms == 0 {
            result.duration_ms = elapsed;
        }
    }

    Ok(results)
}

async fn collect(
    mut join_set: JoinSet<(usize, Result<Vec<BuildResult>>)>,
) -> Result<Vec<(usize, Vec<BuildResult>)>> {
    let mut collected = Vec::with_capacity(join_set.len());
    let mut first_error: Option<(usize, BuildError)> = None;

    while let Some(joined) = join_set.join_next().await {
        let (index, outcome) = joined.map_err(|err| BuildError::Engine {
            tag: "build task".to_string(),
            source: anyhow::anyhow!("build task panicked: {}", err),
        })?;

        match outcome {
            Ok(results) => collected.push((index, results)),
            Err(err) => {
                if first_error.as_ref().map_or(true, |(first, _)| index < *first) {
                    first_error = Some((index, err));
                }
            }
        }
    }

    match first_error {
        Some((_, err)) => Err(err),
        None => Ok(collected),
    }
}
