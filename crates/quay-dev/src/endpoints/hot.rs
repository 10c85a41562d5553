use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{pump, Clients, EventsSocket};
use crate::socket::{SocketConnection, SocketServer};

/// Calls `DevSettings.reload()` on the device, through whichever native
/// module proxy the runtime exposes.
const RELOAD_SCRIPT: &str = r#"(function () {
  var moduleName = "DevSettings";
  (window.__turboModuleProxy
    ? window.__turboModuleProxy(moduleName)
    : window.nativeModuleProxy[moduleName]).reload();
})();"#;

/// Hot-update channel at `/hot`.
///
/// Only the most recent client is talked to. Build progress is announced
/// with `update-start` / `update-done`, and a live reload is delivered as an
/// `update` whose single added module runs [`RELOAD_SCRIPT`]. Client `log`
/// frames are forwarded to the events socket as `client_log` events.
pub struct HotSocket {
    clients: Clients,
    active: Mutex<Option<u64>>,
    events: Arc<EventsSocket>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum ClientMessage {
    Log {
        level: Option<String>,
        #[serde(default)]
        data: Value,
    },
    RegisterEntrypoints,
    LogOptIn,
}

impl HotSocket {
    pub const PATH: &'static str = "/hot";

    pub fn new(events: Arc<EventsSocket>) -> Self {
        Self {
            clients: Clients::default(),
            active: Mutex::new(None),
            events,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn update_start(&self) -> bool {
        self.send(&json!({ "type": "update-start", "body": { "isInitialUpdate": false } }))
    }

    pub fn update_done(&self) -> bool {
        self.send(&json!({ "type": "update-done" }))
    }

    /// Make the connected client reload its bundle.
    pub fn live_reload(&self) -> bool {
        self.send(&json!({
            "type": "update",
            "body": {
                "added": [{ "module": [-1, RELOAD_SCRIPT], "sourceMappingURL": null, "sourceURL": null }],
                "deleted": [],
                "modified": [],
                "isInitialUpdate": false,
                "revisionId": ""
            }
        }))
    }

    fn send(&self, frame: &Value) -> bool {
        match *self.active.lock() {
            Some(id) => self.clients.send(id, &frame.to_string()),
            None => false,
        }
    }

    fn receive(&self, from: u64, text: &str) {
        // Frames without a known `type` are ignored.
        let Ok(message) = serde_json::from_str::<ClientMessage>(text) else {
            debug!(client = from, "ignoring hot message");
            return;
        };
        if let ClientMessage::Log { level, data } = message {
            self.events.report_event(&json!({
                "type": "client_log",
                "level": level,
                "data": data,
                "mode": "BRIDGE"
            }));
        }
    }
}

#[async_trait]
impl SocketServer for HotSocket {
    fn name(&self) -> &str {
        "hot"
    }

    async fn on_connection(&self, connection: SocketConnection) {
        let id = connection.id;
        let outgoing = self.clients.register(id);
        // Earlier clients stay open but are no longer sent anything.
        *self.active.lock() = Some(id);
        debug!(client = id, "hot client connected");

        pump(connection.socket, outgoing, |text| self.receive(id, text)).await;

        self.clients.unregister(id);
        let mut active = self.active.lock();
        if *active == Some(id) {
            *active = None;
        }
        debug!(client = id, "hot client disconnected");
    }
}
