//! Change fan-out for stores that own their data.
//!
//! Writers publish the path they touched; listeners re-read their target and
//! emit the full current value. Nothing but the path travels on the channel,
//! so a lagging listener loses nothing by skipping ahead.

use std::collections::HashMap;

use futures::stream::{self, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;

use super::{read_snapshot, DocumentStore, SnapshotStream};
use crate::document::{CollectionPath, DocPath, ListenTarget};

const CHANNEL_CAPACITY: usize = 64;

/// A write that listeners on the same collection may care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: DocPath,
}

/// Broadcast channels per collection path.
pub struct ChangeHub {
    channels: RwLock<HashMap<CollectionPath, broadcast::Sender<ChangeEvent>>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribes to changes in a collection.
    pub async fn subscribe(&self, collection: &CollectionPath) -> broadcast::Receiver<ChangeEvent> {
        let mut channels = self.channels.write().await;

        if let Some(sender) = channels.get(collection) {
            sender.subscribe()
        } else {
            let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);
            channels.insert(collection.clone(), sender);
            receiver
        }
    }

    /// Announces a write to every listener on the document's collection.
    pub async fn publish(&self, path: &DocPath) {
        let collection = path.collection();
        let channels = self.channels.read().await;

        if let Some(sender) = channels.get(&collection) {
            // No receivers is fine
            let _ = sender.send(ChangeEvent { path: path.clone() });
        }
    }

    /// Number of collections with an open channel.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Drops channels nobody listens to any more.
    pub async fn prune(&self) {
        self.channels
            .write()
            .await
            .retain(|_, sender| sender.receiver_count() > 0);
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns a change receiver into a snapshot stream for `target`.
///
/// The receiver must be subscribed before the initial read so that no write
/// between the read and the subscription goes unnoticed.
pub fn watch_changes<S>(
    store: S,
    changes: broadcast::Receiver<ChangeEvent>,
    target: ListenTarget,
) -> SnapshotStream
where
    S: DocumentStore + Clone + 'static,
{
    stream::unfold(
        (store, changes, target, true),
        |(store, mut changes, target, first)| async move {
            if !first {
                loop {
                    match changes.recv().await {
                        Ok(event) if target.is_affected_by(&event.path) => break,
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!("Listener on {} lagged by {} change(s)", target, skipped);
                            break;
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }

            let snapshot = read_snapshot(&store, &target).await;
            Some((snapshot, (store, changes, target, false)))
        },
    )
    .boxed()
}
