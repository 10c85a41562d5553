//! Built-in socket servers of the dev server.

mod debugger;
mod events;
mod hot;
mod message;

pub use debugger::DebuggerProxySocket;
pub use events::EventsSocket;
pub use hot::HotSocket;
pub use message::MessageSocket;

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::sync::mpsc;

/// Outgoing queues of the clients connected to one socket server.
#[derive(Default)]
pub(crate) struct Clients {
    senders: RwLock<HashMap<u64, mpsc::UnboundedSender<Message>>>,
}

impl Clients {
    pub(crate) fn register(&self, id: u64) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.write().insert(id, tx);
        rx
    }

    pub(crate) fn unregister(&self, id: u64) {
        self.senders.write().remove(&id);
    }

    pub(crate) fn send(&self, id: u64, text: &str) -> bool {
        let delivered = match self.senders.read().get(&id) {
            Some(tx) => tx.send(Message::Text(text.into())).is_ok(),
            None => return false,
        };
        if !delivered {
            self.unregister(id);
        }
        delivered
    }

    /// Queue `text` for every client except `skip`. Returns how many got it.
    pub(crate) fn broadcast(&self, text: &str, skip: Option<u64>) -> usize {
        let mut closed = Vec::new();
        let mut delivered = 0;

        for (id, tx) in self.senders.read().iter() {
            if Some(*id) == skip {
                continue;
            }
            if tx.send(Message::Text(text.into())).is_ok() {
                delivered += 1;
            } else {
                closed.push(*id);
            }
        }

        for id in closed {
            self.unregister(id);
        }
        delivered
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.read().len()
    }
}

/// Pump one websocket until either side closes.
///
/// Frames queued on `outgoing` are written to the socket; incoming text
/// frames are handed to `on_text`.
pub(crate) async fn pump<F>(socket: WebSocket, mut outgoing: mpsc::UnboundedReceiver<Message>, mut on_text: F)
where
    F: FnMut(&str) + Send,
{
    let (mut sink, mut stream) = socket.split();

    let writer = async {
        while let Some(message) = outgoing.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    };

    let reader = async {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => on_text(text.as_str()),
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };

    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }
}
