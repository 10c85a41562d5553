use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{pump, Clients};
use crate::socket::{SocketConnection, SocketServer};

/// Server-to-client event reports at `/events`.
#[derive(Default)]
pub struct EventsSocket {
    pub(super) clients: Clients,
}

impl EventsSocket {
    pub const PATH: &'static str = "/events";

    pub fn new() -> Self {
        Self::default()
    }

    /// Push `event` to every listener as `{"type":"event","body":...}`.
    pub fn report_event<T: Serialize>(&self, event: &T) -> usize {
        let body = match serde_json::to_value(event) {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "failed to serialize event");
                return 0;
            }
        };
        let frame = json!({ "type": "event", "body": body }).to_string();
        self.clients.broadcast(&frame, None)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

#[async_trait]
impl SocketServer for EventsSocket {
    fn name(&self) -> &str {
        "events"
    }

    async fn on_connection(&self, connection: SocketConnection) {
        let id = connection.id;
        let outgoing = self.clients.register(id);
        debug!(client = id, "events client connected");

        // Listeners only receive; anything they send is ignored.
        pump(connection.socket, outgoing, |text| {
            debug!(client = id, len = text.len(), "ignoring message on events socket")
        })
        .await;

        self.clients.unregister(id);
    }
}
