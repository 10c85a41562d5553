use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::FromRequestParts;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tracing::{debug, warn};

use super::{DevService, SocketConnection, SocketServer};
use crate::error::RouteMiss;

type RouteTable = HashMap<String, Arc<dyn SocketServer>>;

/// Maps exact paths to socket servers.
///
/// The table is an immutable snapshot swapped on every change, so upgrade
/// lookups never block on registration and never see a half-applied update.
pub struct SocketRouter {
    routes: ArcSwap<RouteTable>,
    next_connection_id: AtomicU64,
}

impl Default for SocketRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketRouter {
    pub fn new() -> Self {
        Self {
            routes: ArcSwap::from_pointee(HashMap::new()),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Mount `server` at `path`, replacing any server already there.
    ///
    /// Returns the replaced server.
    pub fn register(
        &self,
        path: impl Into<String>,
        server: Arc<dyn SocketServer>,
    ) -> Option<Arc<dyn SocketServer>> {
        let path = path.into();
        let mut replaced = None;

        self.routes.rcu(|current| {
            let mut next = RouteTable::clone(current);
            replaced = next.insert(path.clone(), Arc::clone(&server));
            next
        });

        match &replaced {
            Some(previous) => debug!(path, server = server.name(), replaced = previous.name(), "socket route replaced"),
            None => debug!(path, server = server.name(), "socket route registered"),
        }
        replaced
    }

    pub fn unregister(&self, path: &str) -> Option<Arc<dyn SocketServer>> {
        let mut removed = None;

        self.routes.rcu(|current| {
            let mut next = RouteTable::clone(current);
            removed = next.remove(path);
            next
        });

        if removed.is_some() {
            debug!(path, "socket route removed");
        }
        removed
    }

    /// Exact-match lookup. `path` must not carry a query string.
    pub fn lookup(&self, path: &str) -> Option<Arc<dyn SocketServer>> {
        self.routes.load().get(path).cloned()
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.routes.load().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Route one upgrade request.
    ///
    /// On a match the websocket handshake is answered and the server gets a
    /// connection once the upgrade completes. A handshake the server cannot
    /// accept (wrong method, missing key) gets the usual 4xx response. With
    /// no match, returns [`RouteMiss`] and nothing is written.
    pub async fn handle_upgrade(&self, request: Request<Body>) -> Result<Response, RouteMiss> {
        let path = request.uri().path().to_string();

        let Some(server) = self.lookup(&path) else {
            debug!(path, "upgrade for unregistered path, dropping connection");
            return Err(RouteMiss { path });
        };

        let (mut parts, _body) = request.into_parts();
        let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
            Ok(upgrade) => upgrade,
            Err(rejection) => {
                warn!(path, server = server.name(), "rejected websocket handshake: {}", rejection);
                return Ok(rejection.into_response());
            }
        };

        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        debug!(path, server = server.name(), id, "websocket handshake");

        Ok(upgrade
            .on_failed_upgrade(move |err| warn!(id, "websocket upgrade failed: {}", err))
            .on_upgrade(move |socket| async move {
                server
                    .on_connection(SocketConnection {
                        id,
                        socket,
                        request: parts,
                    })
                    .await;
            }))
    }

    /// Combine this router with the plain HTTP routes into one service.
    pub fn attach(self: Arc<Self>, http: Router) -> DevService {
        DevService::new(self, http)
    }
}
