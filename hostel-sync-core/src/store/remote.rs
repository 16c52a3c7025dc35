//! HTTP + WebSocket client for the hostel server.
//!
//! Reads and writes go over plain HTTP. Each listener opens its own
//! WebSocket on `/listen` and reattaches after a dropped connection; the
//! server replays the full value on reattach, so callers see one fresh
//! snapshot rather than a gap.

use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, SinkExt, StreamExt};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::protocol::{ClientFrame, ServerFrame};
use super::{DocumentStore, SnapshotStream, StoreError};
use crate::document::{CollectionPath, DocPath, Document, ListenTarget, Query, Snapshot, WritePayload};

/// Delay before reattaching a dropped listener.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Listener id used on a single-listener socket.
const LISTENER_ID: u64 = 1;

#[derive(Deserialize)]
struct AddResponse {
    id: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    documents: Vec<Document>,
}

/// Document store backed by a running `hostel-server`.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    http: reqwest::Client,
    server_url: String,
    api_key: String,
}

impl RemoteStore {
    pub fn new(server_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_url: server_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Builds an HTTP URL, encoding each path segment.
    fn url(&self, prefix: &str, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}/{}", self.server_url, prefix, encoded.join("/"))
    }

    fn endpoint(&self, endpoint: &str) -> String {
        format!("{}/{}", self.server_url, endpoint)
    }

    /// Converts the HTTP server URL into the `/listen` WebSocket URL.
    fn ws_url(&self) -> String {
        let base = if let Some(rest) = self.server_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.server_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.server_url.clone()
        };
        format!("{}/listen", base)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response, StoreError> {
        match response.status() {
            s if s.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(StoreError::PermissionDenied(what.to_string()))
            }
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(what.to_string())),
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::Protocol(format!("{}: {}", what, body)))
            }
            status => Err(StoreError::Backend(format!(
                "{}: server returned status {}",
                what, status
            ))),
        }
    }

    /// GETs a JSON endpoint outside the document API (e.g. `students`).
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, StoreError> {
        let response = self
            .http
            .get(self.endpoint(endpoint))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(transport)?;

        let response = Self::check(response, endpoint).await?;
        response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))
    }
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl DocumentStore for RemoteStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let response = self
            .http
            .get(self.url("docs", path.as_str()))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::check(response, path.as_str()).await?;
        let doc: Document = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))?;
        Ok(Some(doc))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let response = self
            .http
            .post(self.endpoint("query"))
            .header("Authorization", self.bearer())
            .json(query)
            .send()
            .await
            .map_err(transport)?;

        let response = Self::check(response, query.collection.as_str()).await?;
        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))?;
        Ok(body.documents)
    }

    async fn set_merge(&self, path: &DocPath, payload: WritePayload) -> Result<(), StoreError> {
        let response = self
            .http
            .patch(self.url("docs", path.as_str()))
            .header("Authorization", self.bearer())
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;

        Self::check(response, path.as_str()).await?;
        Ok(())
    }

    async fn add(
        &self,
        collection: &CollectionPath,
        payload: WritePayload,
    ) -> Result<String, StoreError> {
        let response = self
            .http
            .post(self.url("collections", collection.as_str()))
            .header("Authorization", self.bearer())
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;

        let response = Self::check(response, collection.as_str()).await?;
        let body: AddResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))?;
        Ok(body.id)
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let response = self
            .http
            .delete(self.url("docs", path.as_str()))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(transport)?;

        Self::check(response, path.as_str()).await?;
        Ok(())
    }

    async fn listen(&self, target: ListenTarget) -> Result<SnapshotStream, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let ws_url = self.ws_url();
        let bearer = self.bearer();

        tokio::spawn(async move {
            loop {
                let ended = tokio::select! {
                    result = run_listener(&ws_url, &bearer, &target, &tx) => {
                        if let Err(e) = result {
                            if tx.send(Err(e)).is_err() {
                                return;
                            }
                        }
                        false
                    }
                    _ = tx.closed() => true,
                };
                if ended {
                    tracing::debug!("Listener on {} detached", target);
                    return;
                }

                tokio::select! {
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    _ = tx.closed() => return,
                }
                tracing::debug!("Reattaching listener on {}", target);
            }
        });

        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed())
    }
}

type SnapshotSender = mpsc::UnboundedSender<Result<Snapshot, StoreError>>;

/// Runs one WebSocket session until it drops.
///
/// Returns `Ok(())` when the server closes cleanly; errors are forwarded to
/// the caller as listener errors before reattaching.
async fn run_listener(
    ws_url: &str,
    bearer: &str,
    target: &ListenTarget,
    tx: &SnapshotSender,
) -> Result<(), StoreError> {
    let mut request = ws_url
        .into_client_request()
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
    let header = HeaderValue::from_str(bearer).map_err(|e| StoreError::Protocol(e.to_string()))?;
    request.headers_mut().insert("Authorization", header);

    let (ws_stream, _) = connect_async(request)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
    let (mut sender, mut receiver) = ws_stream.split();

    let listen = ClientFrame::Listen {
        id: LISTENER_ID,
        target: target.clone(),
    }
    .encode()
    .map_err(|e| StoreError::Protocol(e.to_string()))?;
    sender
        .send(Message::Binary(listen.into()))
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

    while let Some(message) = receiver.next().await {
        let message = message.map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let data = match message {
            Message::Binary(data) => data,
            Message::Close(_) => return Ok(()),
            _ => continue,
        };

        let item = match ServerFrame::decode(&data) {
            Ok(ServerFrame::Snapshot { snapshot, .. }) => Ok(snapshot),
            Ok(ServerFrame::Error { message, .. }) => Err(StoreError::Backend(message)),
            Err(e) => Err(StoreError::Protocol(e.to_string())),
        };
        if tx.send(item).is_err() {
            // Subscriber went away
            let _ = sender.send(Message::Close(None)).await;
            return Ok(());
        }
    }

    Err(StoreError::Unavailable("listener connection closed".to_string()))
}
