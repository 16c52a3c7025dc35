//! In-process document store.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{watch_changes, ChangeHub, DocumentStore, SnapshotStream, StoreError};
use crate::document::{
    CollectionPath, DocPath, Document, Fields, ListenTarget, Query, WritePayload,
};

struct Inner {
    docs: RwLock<BTreeMap<DocPath, Fields>>,
    hub: ChangeHub,
}

/// A document store held entirely in memory.
///
/// Clones share the same data, so a clone can be handed to every feed and
/// service in the process.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                docs: RwLock::new(BTreeMap::new()),
                hub: ChangeHub::new(),
            }),
        }
    }

    /// Number of documents currently stored.
    pub async fn len(&self) -> usize {
        self.inner.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let docs = self.inner.docs.read().await;
        Ok(docs
            .get(path)
            .map(|fields| Document::new(path.clone(), fields.clone())))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let docs = self.inner.docs.read().await;
        let candidates = docs
            .iter()
            .filter(|(path, _)| path.collection() == query.collection)
            .map(|(path, fields)| Document::new(path.clone(), fields.clone()));
        Ok(query.apply(candidates))
    }

    async fn set_merge(&self, path: &DocPath, payload: WritePayload) -> Result<(), StoreError> {
        let resolved = payload.resolve(Utc::now());
        {
            let mut docs = self.inner.docs.write().await;
            let fields = docs.entry(path.clone()).or_default();
            for (field, value) in resolved {
                fields.insert(field, value);
            }
        }
        tracing::debug!("Merged write into {}", path);
        self.inner.hub.publish(path).await;
        Ok(())
    }

    async fn add(
        &self,
        collection: &CollectionPath,
        payload: WritePayload,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let path = collection.doc(&id)?;
        let fields = payload.resolve(Utc::now());

        self.inner.docs.write().await.insert(path.clone(), fields);
        tracing::debug!("Added {}", path);
        self.inner.hub.publish(&path).await;
        Ok(id)
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let removed = self.inner.docs.write().await.remove(path).is_some();
        if removed {
            tracing::debug!("Deleted {}", path);
            self.inner.hub.publish(path).await;
        }
        Ok(())
    }

    async fn listen(&self, target: ListenTarget) -> Result<SnapshotStream, StoreError> {
        self.inner.hub.prune().await;
        let changes = self.inner.hub.subscribe(&target.collection()).await;
        Ok(watch_changes(self.clone(), changes, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Direction, Snapshot};
    use futures::StreamExt;
    use serde_json::json;

    fn path(p: &str) -> DocPath {
        DocPath::new(p).unwrap()
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get(&path("settings/laundry")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_merge_keeps_untouched_fields() {
        let store = MemoryStore::new();
        let laundry = path("settings/laundry");

        store
            .set_merge(
                &laundry,
                WritePayload::new()
                    .value("status", "On Schedule")
                    .value("pickupDay", "Monday"),
            )
            .await
            .unwrap();
        store
            .set_merge(&laundry, WritePayload::new().value("pickupDay", "Tuesday"))
            .await
            .unwrap();

        let doc = store.get(&laundry).await.unwrap().unwrap();
        assert_eq!(doc.fields["status"], json!("On Schedule"));
        assert_eq!(doc.fields["pickupDay"], json!("Tuesday"));
    }

    #[tokio::test]
    async fn test_add_generates_id_and_delete_removes() {
        let store = MemoryStore::new();
        let contacts = CollectionPath::new("emergency_contacts").unwrap();

        let id = store
            .add(&contacts, WritePayload::new().value("name", "Warden"))
            .await
            .unwrap();
        let doc_path = contacts.doc(&id).unwrap();
        assert!(store.get(&doc_path).await.unwrap().is_some());

        store.delete(&doc_path).await.unwrap();
        assert!(store.get(&doc_path).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_query_only_sees_direct_children() {
        let store = MemoryStore::new();
        store
            .set_merge(&path("conversations/s1"), WritePayload::new().value("lastMessage", "hi"))
            .await
            .unwrap();
        store
            .set_merge(
                &path("conversations/s1/messages/m1"),
                WritePayload::new().value("text", "hi"),
            )
            .await
            .unwrap();

        let docs = store
            .query(&Query::collection(CollectionPath::new("conversations").unwrap()))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id(), "s1");
    }

    #[tokio::test]
    async fn test_listen_emits_initial_and_changes() {
        let store = MemoryStore::new();
        let laundry = path("settings/laundry");

        let mut stream = store
            .listen(ListenTarget::Document {
                path: laundry.clone(),
            })
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, Snapshot::Document { document: None });

        store
            .set_merge(&laundry, WritePayload::new().value("status", "Closed"))
            .await
            .unwrap();

        match stream.next().await.unwrap().unwrap() {
            Snapshot::Document { document: Some(doc) } => {
                assert_eq!(doc.fields["status"], json!("Closed"));
            }
            other => panic!("unexpected snapshot: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_listen_query_sees_full_ordered_value() {
        let store = MemoryStore::new();
        let routes = CollectionPath::new("bus_routes").unwrap();
        let query = Query::collection(routes.clone()).order_by("routeName", Direction::Asc);

        let mut stream = store
            .listen(ListenTarget::Query { query })
            .await
            .unwrap();
        let _initial = stream.next().await.unwrap().unwrap();

        store
            .set_merge(&routes.doc("r2").unwrap(), WritePayload::new().value("routeName", "B"))
            .await
            .unwrap();
        let _ = stream.next().await.unwrap().unwrap();
        store
            .set_merge(&routes.doc("r1").unwrap(), WritePayload::new().value("routeName", "A"))
            .await
            .unwrap();

        match stream.next().await.unwrap().unwrap() {
            Snapshot::Documents { documents } => {
                let ids: Vec<&str> = documents.iter().map(|d| d.id()).collect();
                assert_eq!(ids, vec!["r1", "r2"]);
            }
            other => panic!("unexpected snapshot: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_listen_prunes_abandoned_channels() {
        let store = MemoryStore::new();
        let first = CollectionPath::new("conversations/s1/messages").unwrap();
        let second = CollectionPath::new("conversations/s2/messages").unwrap();

        let stream = store
            .listen(ListenTarget::Query {
                query: Query::collection(first),
            })
            .await
            .unwrap();
        drop(stream);

        let _stream = store
            .listen(ListenTarget::Query {
                query: Query::collection(second),
            })
            .await
            .unwrap();
        assert_eq!(store.inner.hub.channel_count().await, 1);
    }
}
