//! Build session tests: hook ordering, shared context, failure and abort.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quay_bundler::plugin::{hook_fn, Hook, HookArgs, HookKind, HookOrder, Plugin};
use quay_bundler::{
    AbortController, BuildError, BuildOptions, BuildOrchestrator, BuildResult, BundlingEngine,
    SessionContext,
};
use quay_config::{AliasConfig, BuildConfig, BuildSettings, Platform, ProjectConfig, ResolverConfig, TaskConfig};
use serde_json::json;
use tempfile::TempDir;

type Log = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct RecordingEngine {
    configs: Mutex<Vec<BuildConfig>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
    fail_platform: Option<Platform>,
    empty: bool,
}

impl RecordingEngine {
    fn calls(&self) -> usize {
        self.configs.lock().unwrap().len()
    }
}

#[async_trait]
impl BundlingEngine for RecordingEngine {
    async fn bundle(&self, config: &BuildConfig) -> anyhow::Result<Vec<BuildResult>> {
        self.configs.lock().unwrap().push(config.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_platform == Some(config.platform) {
            anyhow::bail!("engine exploded on {}", config.platform);
        }
        if self.empty {
            return Ok(Vec::new());
        }

        Ok(vec![BuildResult::new(
            config.platform,
            &config.outfile,
            format!("/* {} */", config.tag),
        )
        .with_metafile(json!({ "inputs": { "src/_app.tsx": {} } }))])
    }
}

/// Writes its index into the context after checking every earlier index is there.
struct IndexedHook {
    index: usize,
    log: Log,
}

#[async_trait]
impl Hook for IndexedHook {
    async fn run(&self, ctx: &mut SessionContext, _args: &HookArgs) -> anyhow::Result<()> {
        for earlier in 0..self.index {
            anyhow::ensure!(
                ctx.contains_key(&earlier.to_string()),
                "hook {} ran before hook {}",
                self.index,
                earlier
            );
        }
        tokio::task::yield_now().await;
        ctx.insert(self.index.to_string(), self.index);
        self.log.lock().unwrap().push(format!("pre:{}", self.index));
        Ok(())
    }
}

#[derive(Debug)]
struct HookFailure(&'static str);

impl std::fmt::Display for HookFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "hook failure: {}", self.0)
    }
}

impl std::error::Error for HookFailure {}

fn logging_hook(log: &Log, entry: &str) -> Arc<dyn Hook> {
    let log = Arc::clone(log);
    let entry = entry.to_string();
    hook_fn(move |_, _| {
        log.lock().unwrap().push(entry.clone());
        Ok(())
    })
}

fn failing_hook(log: &Log, entry: &'static str) -> Arc<dyn Hook> {
    let log = Arc::clone(log);
    hook_fn(move |_, _| {
        log.lock().unwrap().push(entry.to_string());
        Err(HookFailure(entry).into())
    })
}

fn project(dir: &TempDir) -> ProjectConfig {
    ProjectConfig::new("shop", "quay", dir.path())
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn pre_hooks_run_in_order_and_share_context() {
    let dir = TempDir::new().unwrap();
    let log = Log::default();
    let plugins = (0..5)
        .map(|index| {
            Plugin::new(format!("p{}", index)).build(
                HookOrder::Pre,
                Arc::new(IndexedHook {
                    index,
                    log: Arc::clone(&log),
                }),
            )
        })
        .collect();

    let engine = Arc::new(RecordingEngine::default());
    let orchestrator = BuildOrchestrator::new(project(&dir), plugins, engine.clone());

    let outcome = orchestrator
        .build(BuildOptions::platform(Platform::Ios))
        .await
        .expect("build");

    let mut keys: Vec<_> = outcome.context.keys().map(str::to_string).collect();
    keys.sort();
    assert_eq!(keys, vec!["0", "1", "2", "3", "4"]);
    assert_eq!(entries(&log), vec!["pre:0", "pre:1", "pre:2", "pre:3", "pre:4"]);
    assert_eq!(engine.calls(), 1);
}

#[tokio::test]
async fn failing_pre_hook_stops_the_session() {
    let dir = TempDir::new().unwrap();
    let log = Log::default();
    let plugins = vec![
        Plugin::new("first").build(HookOrder::Pre, logging_hook(&log, "first")),
        Plugin::new("broken").build(HookOrder::Pre, failing_hook(&log, "broken")),
        Plugin::new("after").build(HookOrder::Pre, logging_hook(&log, "after")),
        Plugin::new("post").build(HookOrder::Post, logging_hook(&log, "post")),
    ];

    let engine = Arc::new(RecordingEngine::default());
    let orchestrator = BuildOrchestrator::new(project(&dir), plugins, engine.clone());

    let err = orchestrator
        .build(BuildOptions::platform(Platform::Android))
        .await
        .unwrap_err();

    assert_eq!(entries(&log), vec!["first", "broken"]);
    assert_eq!(engine.calls(), 0);

    let hook_err = err.as_hook_error().expect("hook error");
    assert_eq!(hook_err.plugin, "broken");
    assert_eq!(hook_err.kind, HookKind::BuildPre);
    let original = hook_err.source.downcast_ref::<HookFailure>().expect("original error");
    assert_eq!(original.0, "broken");
}

#[tokio::test]
async fn failing_post_hook_skips_remaining_post_hooks() {
    let dir = TempDir::new().unwrap();
    let log = Log::default();
    let plugins = vec![
        Plugin::new("a").build(HookOrder::Post, logging_hook(&log, "a")),
        Plugin::new("b").build(HookOrder::Post, failing_hook(&log, "b")),
        Plugin::new("c").build(HookOrder::Post, logging_hook(&log, "c")),
    ];

    let engine = Arc::new(RecordingEngine::default());
    let orchestrator = BuildOrchestrator::new(project(&dir), plugins, engine.clone());

    let err = orchestrator
        .build(BuildOptions::platform(Platform::Android))
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::Hook(ref e) if e.kind == HookKind::BuildPost));
    assert_eq!(entries(&log), vec!["a", "b"]);
    assert_eq!(engine.calls(), 1);
}

#[tokio::test]
async fn post_hooks_receive_results_even_when_empty() {
    let dir = TempDir::new().unwrap();
    let seen = Arc::new(Mutex::new(None));
    let plugins = vec![Plugin::new("inspect").build(HookOrder::Post, {
        let seen = Arc::clone(&seen);
        hook_fn(move |_, args| {
            *seen.lock().unwrap() = Some(args.build_results.len());
            Ok(())
        })
    })];

    let engine = Arc::new(RecordingEngine {
        empty: true,
        ..Default::default()
    });
    let orchestrator = BuildOrchestrator::new(project(&dir), plugins, engine);

    let outcome = orchestrator
        .build(BuildOptions::platform(Platform::Ios))
        .await
        .expect("build");

    assert!(outcome.results.is_empty());
    assert_eq!(*seen.lock().unwrap(), Some(0));
}

#[tokio::test]
async fn post_hooks_read_what_pre_hooks_staged() {
    let dir = TempDir::new().unwrap();
    let plugins = vec![Plugin::new("manifest")
        .build(
            HookOrder::Pre,
            hook_fn(|ctx, args| {
                ctx.insert("entry", args.entry_file.display().to_string());
                Ok(())
            }),
        )
        .build(
            HookOrder::Post,
            hook_fn(|ctx, args| {
                let entry: String = ctx.get_as("entry").ok_or_else(|| anyhow::anyhow!("no entry"))?;
                let outfiles: Vec<_> = args
                    .build_results
                    .iter()
                    .map(|r| r.outfile.display().to_string())
                    .collect();
                ctx.insert("manifest", json!({ "entry": entry, "outfiles": outfiles }));
                Ok(())
            }),
        )];

    let orchestrator = BuildOrchestrator::new(project(&dir), plugins, Arc::new(RecordingEngine::default()));
    let outcome = orchestrator
        .build(BuildOptions::platform(Platform::Android))
        .await
        .expect("build");

    let manifest = outcome.context.get("manifest").expect("manifest");
    let outfile = dir.path().join("dist/_app.android.js");
    assert_eq!(manifest["outfiles"], json!([outfile.display().to_string()]));
}

#[tokio::test]
async fn each_session_starts_with_an_empty_context() {
    let dir = TempDir::new().unwrap();
    let plugins = vec![Plugin::new("count").build(
        HookOrder::Pre,
        hook_fn(|ctx, _| {
            anyhow::ensure!(ctx.is_empty(), "context leaked from another session");
            ctx.insert("seen", true);
            Ok(())
        }),
    )];

    let orchestrator = BuildOrchestrator::new(project(&dir), plugins, Arc::new(RecordingEngine::default()));

    for _ in 0..3 {
        orchestrator
            .build(BuildOptions::platform(Platform::Ios))
            .await
            .expect("build");
    }
}

#[tokio::test]
async fn plugin_config_reaches_the_engine() {
    let dir = TempDir::new().unwrap();
    let mut project = project(&dir);
    project.tasks.insert(
        "release".into(),
        TaskConfig {
            platform: Some(Platform::Android),
            dev: Some(false),
            ..Default::default()
        },
    );

    let fragment = BuildSettings {
        resolver: Some(ResolverConfig {
            alias: vec![AliasConfig {
                from: "react-native".into(),
                to: "react-native-shim".into(),
                exact: true,
            }],
            ..Default::default()
        }),
        ..Default::default()
    };
    let plugins = vec![Plugin::new("shim").config(fragment)];

    let engine = Arc::new(RecordingEngine::default());
    let orchestrator = BuildOrchestrator::new(project, plugins, engine.clone());
    orchestrator
        .build(BuildOptions::task("release").outfile("release/app.js"))
        .await
        .expect("build");

    let configs = engine.configs.lock().unwrap();
    let config = &configs[0];
    assert_eq!(config.tag, "shop:release");
    assert!(!config.dev);
    assert_eq!(config.resolver.alias[0].to, "react-native-shim");
    assert_eq!(config.outfile, dir.path().join("dist/release/app.js"));
}

#[tokio::test]
async fn unknown_task_fails_before_any_hook() {
    let dir = TempDir::new().unwrap();
    let log = Log::default();
    let plugins = vec![Plugin::new("a").build(HookOrder::Pre, logging_hook(&log, "a"))];
    let orchestrator = BuildOrchestrator::new(project(&dir), plugins, Arc::new(RecordingEngine::default()));

    let err = orchestrator.build(BuildOptions::task("web")).await.unwrap_err();
    assert!(matches!(err, BuildError::Config(_)));
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn engine_errors_carry_the_build_tag() {
    let dir = TempDir::new().unwrap();
    let log = Log::default();
    let plugins = vec![Plugin::new("post").build(HookOrder::Post, logging_hook(&log, "post"))];
    let engine = Arc::new(RecordingEngine {
        fail_platform: Some(Platform::Ios),
        ..Default::default()
    });
    let orchestrator = BuildOrchestrator::new(project(&dir), plugins, engine);

    let err = orchestrator
        .build(BuildOptions::platform(Platform::Ios))
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::Engine { ref tag, .. } if tag == "shop:ios"));
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn build_writes_bundle_and_metafile() {
    let dir = TempDir::new().unwrap();
    let orchestrator = BuildOrchestrator::new(project(&dir), Vec::new(), Arc::new(RecordingEngine::default()));

    orchestrator
        .build(BuildOptions::platform(Platform::Android))
        .await
        .expect("build");

    let bundle = dir.path().join("dist/_app.android.js");
    assert_eq!(std::fs::read_to_string(&bundle).unwrap(), "/* shop:android */");
    assert!(dir.path().join("dist/_app.android.meta.json").exists());
}

#[tokio::test]
async fn outfile_overrides_are_normalized() {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(RecordingEngine::default());
    let orchestrator = BuildOrchestrator::new(project(&dir), Vec::new(), engine.clone());

    orchestrator
        .build(BuildOptions::platform(Platform::Ios).outfile("../bundles/./app.ios.js"))
        .await
        .expect("build");

    let outfile = dir.path().join("bundles/app.ios.js");
    assert_eq!(engine.configs.lock().unwrap()[0].outfile, outfile);
    assert_eq!(std::fs::read_to_string(&outfile).unwrap(), "/* shop:ios */");
}

#[tokio::test]
async fn build_all_runs_hooks_once_and_bounds_concurrency() {
    let dir = TempDir::new().unwrap();
    let log = Log::default();
    let plugins = vec![Plugin::new("once")
        .build(HookOrder::Pre, logging_hook(&log, "pre"))
        .build(HookOrder::Post, logging_hook(&log, "post"))];

    let engine = Arc::new(RecordingEngine {
        delay: Some(Duration::from_millis(30)),
        ..Default::default()
    });
    let orchestrator = BuildOrchestrator::new(project(&dir), plugins, engine.clone()).without_artifacts();

    let targets = vec![
        BuildOptions::platform(Platform::Ios),
        BuildOptions::platform(Platform::Android),
        BuildOptions::platform(Platform::Ios).outfile("second.ios.js"),
        BuildOptions::platform(Platform::Android).outfile("second.android.js"),
    ];
    let outcome = orchestrator.build_all(targets, 2).await.expect("build all");

    assert_eq!(entries(&log), vec!["pre", "post"]);
    assert_eq!(engine.calls(), 4);
    assert!(engine.max_in_flight.load(Ordering::SeqCst) <= 2);

    let names: Vec<_> = outcome
        .results
        .iter()
        .map(|r| r.outfile.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["_app.ios.js", "_app.android.js", "second.ios.js", "second.android.js"]
    );
}

#[tokio::test]
async fn build_all_fails_before_post_hooks_when_a_target_fails() {
    let dir = TempDir::new().unwrap();
    let log = Log::default();
    let plugins = vec![Plugin::new("post").build(HookOrder::Post, logging_hook(&log, "post"))];
    let engine = Arc::new(RecordingEngine {
        fail_platform: Some(Platform::Android),
        ..Default::default()
    });
    let orchestrator = BuildOrchestrator::new(project(&dir), plugins, engine).without_artifacts();

    let err = orchestrator
        .build_all(
            vec![
                BuildOptions::platform(Platform::Ios),
                BuildOptions::platform(Platform::Android),
            ],
            quay_bundler::DEFAULT_CONCURRENCY,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::Engine { .. }));
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn abort_cancels_the_engine_call_and_skips_post_hooks() {
    let dir = TempDir::new().unwrap();
    let log = Log::default();
    let plugins = vec![Plugin::new("post").build(HookOrder::Post, logging_hook(&log, "post"))];
    let engine = Arc::new(RecordingEngine {
        delay: Some(Duration::from_secs(30)),
        ..Default::default()
    });

    let controller = AbortController::new();
    let orchestrator =
        BuildOrchestrator::new(project(&dir), plugins, engine.clone()).with_abort(controller.signal());

    let abort_later = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.abort();
    };
    let (result, _) = tokio::join!(orchestrator.build(BuildOptions::platform(Platform::Ios)), abort_later);

    assert!(matches!(result, Err(BuildError::Aborted)));
    assert_eq!(engine.calls(), 1);
    assert!(entries(&log).is_empty());
}
