//! Websocket multiplexing over the dev server's single listener.
//!
//! Every upgrade request is routed by its exact path (query ignored) to one
//! registered [`SocketServer`]. Requests for unregistered paths get no
//! handshake and no response; the connection is simply dropped.

mod listener;
mod router;
mod service;

pub use listener::serve;
pub use router::SocketRouter;
pub use service::{is_upgrade_request, DevService};

use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::ws::WebSocket;
use axum::extract::Query;
use axum::http::request::Parts;
use axum::http::Uri;

/// One accepted websocket, after the handshake.
pub struct SocketConnection {
    /// Unique per router, increasing in accept order.
    pub id: u64,
    pub socket: WebSocket,
    /// The upgrade request's head, as the client sent it.
    pub request: Parts,
}

impl SocketConnection {
    /// Decoded value of `key` in the upgrade request's query string.
    pub fn query_param(&self, key: &str) -> Option<String> {
        query_value(&self.request.uri, key)
    }
}

fn query_value(uri: &Uri, key: &str) -> Option<String> {
    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params.remove(key)
}

/// A logical socket protocol mounted at one path.
///
/// `on_connection` is called once per accepted client and may run for the
/// client's whole lifetime; each call runs on its own task.
#[async_trait]
pub trait SocketServer: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn on_connection(&self, connection: SocketConnection);
}
