//! Subscription adapter: typed, cancellable feeds over the store.
//!
//! A [`Feed`] hands every update to a callback as a complete typed value.
//! [`LiveFeed`] is driven by the store's push listener; [`PollingFeed`]
//! re-fetches on a fixed interval for sources without push. Callers cannot
//! tell them apart.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::decode::{decode_document, Decode};
use crate::document::{DocPath, ListenTarget, Query, Snapshot};
use crate::store::{DocumentStore, StoreError};

/// Callback receiving the full current value.
pub type UpdateFn<T> = Box<dyn FnMut(T) + Send + 'static>;

/// Handle to a running subscription.
///
/// Dropping the handle tears the subscription down as well.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    fn new(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// Stops delivery and releases the listener or timer.
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    /// Whether updates can still arrive.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A source of complete, typed values.
pub trait Feed<T>: Send + Sync {
    /// Starts delivery. Must be called inside a Tokio runtime.
    fn subscribe(&self, on_update: UpdateFn<T>) -> Subscription;
}

type Decoder<T> = Arc<dyn Fn(Snapshot) -> T + Send + Sync>;

/// Feed driven by the store's real-time listener.
pub struct LiveFeed<T> {
    store: Arc<dyn DocumentStore>,
    target: ListenTarget,
    decode: Decoder<T>,
}

impl<T: Decode + Default + Send + 'static> LiveFeed<T> {
    /// Feed of a single document; a missing document decodes as `T::default()`.
    pub fn document(store: Arc<dyn DocumentStore>, path: DocPath) -> Self {
        Self {
            store,
            target: ListenTarget::Document { path },
            decode: Arc::new(|snapshot: Snapshot| -> T {
                match snapshot {
                    Snapshot::Document {
                        document: Some(doc),
                    } => decode_document(&doc),
                    Snapshot::Document { document: None } => T::default(),
                    Snapshot::Documents { documents } => documents
                        .first()
                        .map(decode_document)
                        .unwrap_or_default(),
                }
            }),
        }
    }
}

impl<T: Decode + Send + 'static> LiveFeed<Vec<T>> {
    /// Feed of every document matching a query, in query order.
    pub fn query(store: Arc<dyn DocumentStore>, query: Query) -> Self {
        Self {
            store,
            target: ListenTarget::Query { query },
            decode: Arc::new(|snapshot: Snapshot| -> Vec<T> {
                match snapshot {
                    Snapshot::Documents { documents } => {
                        documents.iter().map(decode_document).collect()
                    }
                    Snapshot::Document { document } => {
                        document.iter().map(decode_document).collect()
                    }
                }
            }),
        }
    }
}

impl<T> LiveFeed<T> {
    pub fn target(&self) -> &ListenTarget {
        &self.target
    }
}

impl<T: Send + 'static> Feed<T> for LiveFeed<T> {
    fn subscribe(&self, mut on_update: UpdateFn<T>) -> Subscription {
        let store = Arc::clone(&self.store);
        let target = self.target.clone();
        let decode = Arc::clone(&self.decode);

        let task = tokio::spawn(async move {
            let mut snapshots = match store.listen(target.clone()).await {
                Ok(snapshots) => snapshots,
                Err(e) => {
                    tracing::warn!("Failed to attach listener on {}: {}", target, e);
                    return;
                }
            };
            tracing::debug!("Listener attached on {}", target);

            while let Some(next) = snapshots.next().await {
                match next {
                    Ok(snapshot) => on_update(decode(snapshot)),
                    // Keep the last delivered value; the store reconnects on its own
                    Err(e) => tracing::warn!("Listener error on {}: {}", target, e),
                }
            }
            tracing::debug!("Listener on {} closed", target);
        });

        Subscription::new(task)
    }
}

/// A value that can be fetched on demand.
#[async_trait]
pub trait Fetch<T>: Send + Sync {
    async fn fetch(&self) -> Result<T, StoreError>;
}

/// Feed that re-fetches on a fixed interval.
///
/// The first fetch happens immediately. A failed fetch is logged and the
/// previous value stays with the caller.
pub struct PollingFeed<T> {
    source: Arc<dyn Fetch<T>>,
    interval: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PollingFeed<T> {
    pub fn new(source: Arc<dyn Fetch<T>>, interval: Duration) -> Self {
        Self {
            source,
            interval,
            _marker: PhantomData,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl<T: Send + 'static> Feed<T> for PollingFeed<T> {
    fn subscribe(&self, mut on_update: UpdateFn<T>) -> Subscription {
        let source = Arc::clone(&self.source);
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match source.fetch().await {
                    Ok(value) => on_update(value),
                    Err(e) => tracing::warn!("Polling fetch failed: {}", e),
                }
            }
        });

        Subscription::new(task)
    }
}
