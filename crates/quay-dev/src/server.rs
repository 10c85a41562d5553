//! Dev-server sessions.
//!
//! A session runs dev-server pre-hooks, binds the listener, waits until the
//! accept loop is running, then runs dev-server post-hooks. Post-hooks see the
//! bound port, so a configured port of `0` reports the one the OS picked.

use std::net::SocketAddr;
use std::sync::Arc;

use quay_bundler::plugin::{HookArgs, Plugin, PluginDriver, PluginHooks};
use quay_bundler::{BundlingEngine, SessionContext};
use quay_config::ProjectConfig;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::endpoints::{DebuggerProxySocket, EventsSocket, HotSocket, MessageSocket};
use crate::error::{DevServerError, Result};
use crate::routes;
use crate::socket::{serve, SocketRouter};
use crate::state::DevState;

pub struct DevServer {
    project: ProjectConfig,
    hooks: Arc<PluginHooks>,
    state: Arc<DevState>,
    sockets: Arc<SocketRouter>,
}

impl DevServer {
    pub fn new(project: ProjectConfig, plugins: Vec<Plugin>, engine: Arc<dyn BundlingEngine>) -> Self {
        let resolved = PluginHooks::from_plugins(plugins);
        let messages = Arc::new(MessageSocket::new());
        let events = Arc::new(EventsSocket::new());
        let hot = Arc::new(HotSocket::new(Arc::clone(&events)));

        let sockets = Arc::new(SocketRouter::new());
        sockets.register(DebuggerProxySocket::PATH, Arc::new(DebuggerProxySocket::new()));
        sockets.register(MessageSocket::PATH, messages.clone());
        sockets.register(EventsSocket::PATH, events.clone());
        sockets.register(HotSocket::PATH, hot.clone());

        let state = Arc::new(DevState::new(
            project.clone(),
            resolved.configs,
            engine,
            messages,
            events,
            hot,
        ));

        Self {
            project,
            hooks: Arc::new(resolved.hooks),
            state,
            sockets,
        }
    }

    /// Socket routes; more servers can be mounted before or after `start`.
    pub fn sockets(&self) -> &Arc<SocketRouter> {
        &self.sockets
    }

    pub async fn start(self) -> Result<RunningDevServer> {
        let host = self.project.dev_server.host.clone();
        let port = self.project.dev_server.port;

        let mut driver = PluginDriver::new(Arc::clone(&self.hooks), HookArgs::from_project(&self.project));
        driver.run_dev_pre(&host, port).await?;

        let address = format!("{}:{}", host, port);
        let listener = TcpListener::bind(address.as_str())
            .await
            .map_err(|source| DevServerError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| DevServerError::Bind { address, source })?;

        let service = Arc::clone(&self.sockets).attach(routes::router(Arc::clone(&self.state)));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (ready_tx, ready_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let _ = ready_tx.send(());
            serve(listener, service, async {
                let _ = shutdown_rx.await;
            })
            .await;
        });

        if ready_rx.await.is_err() {
            return Err(DevServerError::NotReady);
        }
        info!(address = %local_addr, "dev server listening");

        if let Err(err) = driver.run_dev_post(&host, local_addr.port()).await {
            let _ = shutdown_tx.send(());
            let _ = task.await;
            return Err(err.into());
        }

        Ok(RunningDevServer {
            local_addr,
            context: driver.into_context(),
            state: self.state,
            sockets: self.sockets,
            shutdown: shutdown_tx,
            task,
        })
    }
}

/// A started dev server. Dropping it without [`shutdown`](Self::shutdown)
/// leaves the accept loop running until the runtime stops.
pub struct RunningDevServer {
    local_addr: SocketAddr,
    context: SessionContext,
    state: Arc<DevState>,
    sockets: Arc<SocketRouter>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RunningDevServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Session state left by the dev-server hooks.
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn sockets(&self) -> &Arc<SocketRouter> {
        &self.sockets
    }

    pub fn messages(&self) -> &Arc<MessageSocket> {
        self.state.messages()
    }

    pub fn events(&self) -> &Arc<EventsSocket> {
        self.state.events()
    }

    pub fn hot(&self) -> &Arc<HotSocket> {
        self.state.hot()
    }

    /// Send a command such as `reload` to every `/message` client.
    pub fn broadcast(&self, method: &str, params: Option<Value>) -> usize {
        self.state.messages().broadcast(method, params)
    }

    /// Push an event to every `/events` listener.
    pub fn report_event<T: Serialize>(&self, event: &T) -> usize {
        self.state.events().report_event(event)
    }

    /// Drop cached bundles and tell clients to reload.
    ///
    /// Returns how many `/message` clients got the command; the `/hot`
    /// client, if any, gets a live reload as well.
    pub fn reload(&self) -> usize {
        self.state.reload()
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    ///
    /// Websockets that are already open stay up until their clients leave.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            warn!(error = %err, "dev server task failed");
        }
        info!(address = %self.local_addr, "dev server shut down");
    }
}
