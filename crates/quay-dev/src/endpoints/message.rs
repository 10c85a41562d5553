use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{pump, Clients};
use crate::socket::{SocketConnection, SocketServer};

const PROTOCOL_VERSION: u64 = 2;

/// Generic message channel at `/message`.
///
/// Every valid client message is relayed to all other clients. The server
/// side can push commands such as `reload` with [`MessageSocket::broadcast`].
#[derive(Default)]
pub struct MessageSocket {
    clients: Clients,
}

impl MessageSocket {
    pub const PATH: &'static str = "/message";

    pub fn new() -> Self {
        Self::default()
    }

    /// Send a command to every connected client. Returns how many got it.
    pub fn broadcast(&self, method: &str, params: Option<Value>) -> usize {
        let mut message = json!({ "version": PROTOCOL_VERSION, "method": method });
        if let Some(params) = params {
            message["params"] = params;
        }

        let delivered = self.clients.broadcast(&message.to_string(), None);
        debug!(method, delivered, "message broadcast");
        delivered
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn relay(&self, from: u64, text: &str) {
        if let Err(reason) = check_message(text) {
            warn!(client = from, "dropping message: {}", reason);
            return;
        }
        let delivered = self.clients.broadcast(text, Some(from));
        debug!(client = from, delivered, "message relayed");
    }
}

fn check_message(text: &str) -> Result<(), &'static str> {
    let value: Value = serde_json::from_str(text).map_err(|_| "not valid JSON")?;
    match value.get("version").and_then(Value::as_u64) {
        Some(PROTOCOL_VERSION) => Ok(()),
        Some(_) => Err("unsupported protocol version"),
        None => Err("missing protocol version"),
    }
}

#[async_trait]
impl SocketServer for MessageSocket {
    fn name(&self) -> &str {
        "message"
    }

    async fn on_connection(&self, connection: SocketConnection) {
        let id = connection.id;
        let outgoing = self.clients.register(id);
        debug!(client = id, clients = self.clients.len(), "message client connected");

        pump(connection.socket, outgoing, |text| self.relay(id, text)).await;

        self.clients.unregister(id);
        debug!(client = id, "message client disconnected");
    }
}
