//! WebSocket listen handler.
//!
//! One socket carries any number of listeners. The client attaches a
//! listener with a `listen` frame and receives the full current value as a
//! `snapshot` frame, then one more after every write that affects it.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use hostel_sync_core::{ClientFrame, DocumentStore, ServerFrame};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Listener id used for frames that cannot be attributed to a listener.
const UNATTRIBUTED: u64 = 0;

/// Listeners attached over one socket.
pub struct ListenSession {
    store: Arc<dyn DocumentStore>,
    user_id: String,
    outbound: mpsc::UnboundedSender<ServerFrame>,
    listeners: HashMap<u64, JoinHandle<()>>,
}

impl ListenSession {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        user_id: impl Into<String>,
        outbound: mpsc::UnboundedSender<ServerFrame>,
    ) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            outbound,
            listeners: HashMap::new(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Handles one binary frame from the client.
    pub fn handle(&mut self, data: &[u8]) {
        match ClientFrame::decode(data) {
            Ok(ClientFrame::Listen { id, target }) => {
                tracing::debug!("{} attached listener {} on {}", self.user_id, id, target);
                let store = Arc::clone(&self.store);
                let outbound = self.outbound.clone();

                let task = tokio::spawn(async move {
                    let mut snapshots = match store.listen(target).await {
                        Ok(snapshots) => snapshots,
                        Err(e) => {
                            let _ = outbound.send(ServerFrame::Error {
                                id,
                                message: e.to_string(),
                            });
                            return;
                        }
                    };

                    while let Some(next) = snapshots.next().await {
                        let frame = match next {
                            Ok(snapshot) => ServerFrame::Snapshot { id, snapshot },
                            Err(e) => ServerFrame::Error {
                                id,
                                message: e.to_string(),
                            },
                        };
                        if outbound.send(frame).is_err() {
                            return;
                        }
                    }
                });

                // Re-using an id replaces the old listener
                if let Some(old) = self.listeners.insert(id, task) {
                    old.abort();
                }
            }
            Ok(ClientFrame::Unlisten { id }) => {
                if let Some(task) = self.listeners.remove(&id) {
                    task.abort();
                    tracing::debug!("{} detached listener {}", self.user_id, id);
                }
            }
            Err(e) => {
                tracing::warn!("Bad frame from {}: {}", self.user_id, e);
                let _ = self.outbound.send(ServerFrame::Error {
                    id: UNATTRIBUTED,
                    message: format!("Failed to decode frame: {}", e),
                });
            }
        }
    }

    /// Detaches every listener.
    pub fn close(&mut self) {
        for (_, task) in self.listeners.drain() {
            task.abort();
        }
    }
}

impl Drop for ListenSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Drives a `/listen` socket until the client goes away.
pub async fn serve_socket(socket: WebSocket, store: Arc<dyn DocumentStore>, user_id: String) {
    let (mut sink, mut incoming) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let bytes = match frame.encode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Failed to encode frame: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Binary(bytes.into())).await.is_err() {
                break;
            }
        }
    });

    tracing::info!("Listen socket opened for {}", user_id);
    let mut session = ListenSession::new(store, user_id.clone(), tx);

    while let Some(message) = incoming.next().await {
        match message {
            Ok(Message::Binary(data)) => session.handle(&data),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Listen socket error for {}: {}", user_id, e);
                break;
            }
        }
    }

    session.close();
    writer.abort();
    tracing::info!("Listen socket closed for {}", user_id);
}
