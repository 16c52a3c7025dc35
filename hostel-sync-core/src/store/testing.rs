//! Store wrapper for tests: records writes and injects failures.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{DocumentStore, MemoryStore, SnapshotStream, StoreError};
use crate::document::{CollectionPath, DocPath, Document, ListenTarget, Query, WritePayload};

#[derive(Clone, Default)]
pub(crate) struct RecordingStore {
    pub inner: MemoryStore,
    writes: Arc<Mutex<Vec<(DocPath, WritePayload)>>>,
    gets: Arc<AtomicUsize>,
    fail_get: Arc<AtomicBool>,
    fail_write: Arc<AtomicBool>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<(DocPath, WritePayload)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_write.store(fail, Ordering::SeqCst);
    }

    /// Seeds a document without recording it as a write.
    pub async fn seed(&self, path: &DocPath, payload: WritePayload) {
        self.inner.set_merge(path, payload).await.unwrap();
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        self.inner.get(path).await
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.inner.query(query).await
    }

    async fn set_merge(&self, path: &DocPath, payload: WritePayload) -> Result<(), StoreError> {
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        self.writes
            .lock()
            .unwrap()
            .push((path.clone(), payload.clone()));
        self.inner.set_merge(path, payload).await
    }

    async fn add(
        &self,
        collection: &CollectionPath,
        payload: WritePayload,
    ) -> Result<String, StoreError> {
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        let id = self.inner.add(collection, payload.clone()).await?;
        self.writes.lock().unwrap().push((collection.doc(&id)?, payload));
        Ok(id)
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        self.inner.delete(path).await
    }

    async fn listen(&self, target: ListenTarget) -> Result<SnapshotStream, StoreError> {
        self.inner.listen(target).await
    }
}
