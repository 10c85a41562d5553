//! # quay-dev
//!
//! The quay development server: one listener serving plain HTTP routes and
//! any number of websocket protocols, each mounted at its own path.
//!
//! Built-in endpoints:
//!
//! | Path | Kind | Purpose |
//! |------|------|---------|
//! | `/` | GET | placeholder page |
//! | `/status` | GET | `packager-status:running` |
//! | `/index.bundle?platform=` | GET | development bundle from the engine |
//! | `/index.map?platform=` | GET | its sourcemap |
//! | `/symbolicate` | POST | validates crash stacks |
//! | `/reload` | POST | tells `/message` and `/hot` clients to reload |
//! | `/message` | websocket | message relay between clients |
//! | `/events` | websocket | server event reports |
//! | `/hot` | websocket | build progress, live reload and client logs |
//! | `/debugger-proxy` | websocket | debugger to device proxy |
//!
//! Upgrade requests for any other path are dropped without a response.
//!
//! ```no_run
//! use std::sync::Arc;
//! use quay_bundler::plugin::{hook_fn, HookOrder, Plugin};
//! use quay_config::ProjectConfig;
//! use quay_dev::DevServer;
//! # use quay_bundler::{BuildResult, BundlingEngine};
//! # struct Engine;
//! # #[async_trait::async_trait]
//! # impl BundlingEngine for Engine {
//! #     async fn bundle(&self, _: &quay_config::BuildConfig) -> anyhow::Result<Vec<BuildResult>> {
//! #         Ok(Vec::new())
//! #     }
//! # }
//!
//! # async fn run() -> quay_dev::Result<()> {
//! let project = ProjectConfig::new("shop", "shop", ".");
//! let announce = Plugin::new("announce").dev_server(
//!     HookOrder::Post,
//!     hook_fn(|_, args| {
//!         println!("listening on port {:?}", args.port);
//!         Ok(())
//!     }),
//! );
//!
//! let server = DevServer::new(project, vec![announce], Arc::new(Engine)).start().await?;
//! server.reload();
//! server.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod endpoints;
pub mod error;
pub mod routes;
pub mod server;
pub mod socket;
pub mod state;
pub mod symbolicate;

pub use endpoints::{DebuggerProxySocket, EventsSocket, HotSocket, MessageSocket};
pub use error::{DevServerError, Result, RouteMiss};
pub use server::{DevServer, RunningDevServer};
pub use socket::{serve, DevService, SocketConnection, SocketRouter, SocketServer};
pub use state::{DevState, SharedState};
pub use symbolicate::{StackFrame, Symbolicator};

pub use quay_bundler::logging::{init_logging, init_logging_from_env, LogLevel};
