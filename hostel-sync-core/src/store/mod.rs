//! The remote document store seam.
//!
//! Every feature talks to a [`DocumentStore`]. Three implementations exist:
//! [`MemoryStore`] for in-process use, [`RemoteStore`] for the hostel server,
//! and the SQLite-backed store that lives with the server itself.

mod hub;
mod memory;
mod protocol;
mod remote;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::document::{CollectionPath, DocPath, Document, ListenTarget, PathError, Query, Snapshot, WritePayload};

pub use hub::{watch_changes, ChangeEvent, ChangeHub};
pub use memory::MemoryStore;
pub use protocol::{ClientFrame, ServerFrame};
pub use remote::{RemoteStore, RECONNECT_DELAY};

/// Errors surfaced by document stores.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Snapshots pushed by a listener, in the order the store emits them.
pub type SnapshotStream = BoxStream<'static, Result<Snapshot, StoreError>>;

/// A document store with a real-time listen primitive.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a document directly from the store, bypassing any listener.
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Merges `payload` into the document, creating it if needed.
    async fn set_merge(&self, path: &DocPath, payload: WritePayload) -> Result<(), StoreError>;

    /// Creates a document with a generated id and returns the id.
    async fn add(
        &self,
        collection: &CollectionPath,
        payload: WritePayload,
    ) -> Result<String, StoreError>;

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError>;

    /// Attaches a listener. The first item is the current value; every later
    /// item is the complete value after a change.
    async fn listen(&self, target: ListenTarget) -> Result<SnapshotStream, StoreError>;
}

/// Reads the current value of a listen target.
pub async fn read_snapshot<S>(store: &S, target: &ListenTarget) -> Result<Snapshot, StoreError>
where
    S: DocumentStore + ?Sized,
{
    match target {
        ListenTarget::Document { path } => Ok(Snapshot::Document {
            document: store.get(path).await?,
        }),
        ListenTarget::Query { query } => Ok(Snapshot::Documents {
            documents: store.query(query).await?,
        }),
    }
}
