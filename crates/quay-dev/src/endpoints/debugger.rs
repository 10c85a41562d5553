use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::{pump, Clients};
use crate::socket::{SocketConnection, SocketServer};

/// Close code sent to a second debugger.
const CLOSE_SLOT_TAKEN: u16 = 1011;

/// Debugger proxy at `/debugger-proxy`.
///
/// Connections with `?role=debugger` take the single debugger slot; every
/// other connection is a device. Debugger frames go to all devices, device
/// frames go to the debugger.
#[derive(Default)]
pub struct DebuggerProxySocket {
    debugger: Mutex<Option<u64>>,
    debuggers: Clients,
    devices: Clients,
}

impl DebuggerProxySocket {
    pub const PATH: &'static str = "/debugger-proxy";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_debugger(&self) -> bool {
        self.debugger.lock().is_some()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn claim_debugger_slot(&self, id: u64) -> bool {
        let mut slot = self.debugger.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(id);
        true
    }

    fn release_debugger_slot(&self, id: u64) {
        let mut slot = self.debugger.lock();
        if *slot == Some(id) {
            *slot = None;
        }
    }

    fn to_debugger(&self, from: u64, text: &str) {
        let debugger = *self.debugger.lock();
        match debugger {
            Some(debugger) => {
                self.debuggers.send(debugger, text);
            }
            None => debug!(device = from, "no debugger connected, dropping frame"),
        }
    }

    async fn serve_debugger(&self, mut connection: SocketConnection) {
        let id = connection.id;

        if !self.claim_debugger_slot(id) {
            info!(id, "rejecting debugger, slot already taken");
            let _ = connection
                .socket
                .send(Message::Close(Some(CloseFrame {
                    code: CLOSE_SLOT_TAKEN,
                    reason: "another debugger is already connected".into(),
                })))
                .await;
            return;
        }

        let outgoing = self.debuggers.register(id);
        info!(id, "debugger connected");

        pump(connection.socket, outgoing, |text| {
            self.devices.broadcast(text, None);
        })
        .await;

        self.debuggers.unregister(id);
        self.release_debugger_slot(id);
        info!(id, "debugger disconnected");
    }

    async fn serve_device(&self, connection: SocketConnection) {
        let id = connection.id;
        let outgoing = self.devices.register(id);
        debug!(id, "device connected to debugger proxy");

        pump(connection.socket, outgoing, |text| self.to_debugger(id, text)).await;

        self.devices.unregister(id);
        debug!(id, "device disconnected from debugger proxy");
    }
}

#[async_trait]
impl SocketServer for DebuggerProxySocket {
    fn name(&self) -> &str {
        "debugger-proxy"
    }

    async fn on_connection(&self, connection: SocketConnection) {
        if connection.query_param("role").as_deref() == Some("debugger") {
            self.serve_debugger(connection).await;
        } else {
            self.serve_device(connection).await;
        }
    }
}
