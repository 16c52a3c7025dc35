//! HTTP API of the hostel server.
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `GET /me`: Returns current user info
//! - `GET|PATCH|DELETE /docs/{*path}`: Read, merge-write or delete a document
//! - `POST /collections/{*path}`: Create a document with a generated id
//! - `POST /query`: Run a collection query
//! - `GET /listen`: WebSocket carrying listen frames
//! - `GET /students`: Student roster

use axum::{
    extract::{ws::WebSocketUpgrade, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use hostel_sync_core::{
    CollectionPath, DocPath, Document, DocumentStore, Query, StoreError, Student, WritePayload,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::auth::{ApiKeyStore, AuthUser, Role};
use super::listen::serve_socket;
use super::storage::SqliteDocumentStore;
use super::students::StudentRepository;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub api_keys: Arc<ApiKeyStore>,
    pub store: SqliteDocumentStore,
    pub students: Arc<StudentRepository>,
}

impl AppState {
    pub fn new(api_keys: ApiKeyStore, store: SqliteDocumentStore) -> Self {
        let students = StudentRepository::new(store.pool().clone());
        Self {
            api_keys: Arc::new(api_keys),
            store,
            students: Arc::new(students),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Handler error carrying its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: message.into(),
        }
    }

    fn forbidden(user: &AuthUser, path: &str) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "forbidden",
            format!("{} '{}' may not write to {}", user.role, user.user_id, path),
        )
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let (status, error) = match &e {
            StoreError::InvalidPath(_) | StoreError::Protocol(_) => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            StoreError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "forbidden"),
            StoreError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            StoreError::Backend(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", e);
        }
        Self::new(status, error, e.to_string())
    }
}

impl From<hostel_sync_core::PathError> for ApiError {
    fn from(e: hostel_sync_core::PathError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_path", e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.error,
                message: self.message,
            }),
        )
            .into_response()
    }
}

/// Authentication middleware
async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let api_key = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        Some(_) => {
            return ApiError::new(
                StatusCode::UNAUTHORIZED,
                "invalid_auth",
                "Authorization header must use Bearer scheme",
            )
            .into_response();
        }
        None => {
            return ApiError::new(
                StatusCode::UNAUTHORIZED,
                "missing_auth",
                "Authorization header required",
            )
            .into_response();
        }
    };

    match state.api_keys.validate(api_key) {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => ApiError::new(StatusCode::UNAUTHORIZED, "invalid_key", "Invalid API key")
            .into_response(),
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Current user response
#[derive(Serialize)]
struct MeResponse {
    user_id: String,
    role: Role,
}

async fn me(Extension(user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
        role: user.role,
    })
}

async fn get_document(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Document>, ApiError> {
    let path = DocPath::new(path)?;
    match state.store.get(&path).await? {
        Some(doc) => Ok(Json(doc)),
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("No document at {}", path),
        )),
    }
}

async fn merge_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(path): Path<String>,
    Json(payload): Json<WritePayload>,
) -> Result<StatusCode, ApiError> {
    let path = DocPath::new(path)?;
    if !user.can_write(path.as_str()) {
        return Err(ApiError::forbidden(&user, path.as_str()));
    }
    state.store.set_merge(&path, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(path): Path<String>,
) -> Result<StatusCode, ApiError> {
    let path = DocPath::new(path)?;
    if !user.can_write(path.as_str()) {
        return Err(ApiError::forbidden(&user, path.as_str()));
    }
    state.store.delete(&path).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct AddResponse {
    id: String,
}

async fn add_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(path): Path<String>,
    Json(payload): Json<WritePayload>,
) -> Result<(StatusCode, Json<AddResponse>), ApiError> {
    let collection = CollectionPath::new(path)?;
    if !user.can_write(collection.as_str()) {
        return Err(ApiError::forbidden(&user, collection.as_str()));
    }
    let id = state.store.add(&collection, payload).await?;
    Ok((StatusCode::CREATED, Json(AddResponse { id })))
}

#[derive(Serialize)]
struct QueryResponse {
    documents: Vec<Document>,
}

async fn query_documents(
    State(state): State<AppState>,
    Json(query): Json<Query>,
) -> Result<Json<QueryResponse>, ApiError> {
    let documents = state.store.query(&query).await?;
    Ok(Json(QueryResponse { documents }))
}

async fn listen(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ws: WebSocketUpgrade,
) -> Response {
    let store: Arc<dyn DocumentStore> = Arc::new(state.store.clone());
    ws.on_upgrade(move |socket| serve_socket(socket, store, user.user_id))
}

async fn list_students(State(state): State<AppState>) -> Result<Json<Vec<Student>>, ApiError> {
    let students = state
        .students
        .list()
        .await
        .map_err(|e| ApiError::from(StoreError::from(e)))?;
    Ok(Json(students))
}

/// Builds the full router: public routes, then authenticated ones.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route("/me", get(me))
        .route(
            "/docs/{*path}",
            get(get_document)
                .patch(merge_document)
                .delete(delete_document),
        )
        .route("/collections/{*path}", post(add_document))
        .route("/query", post(query_documents))
        .route("/listen", get(listen))
        .route("/students", get(list_students))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
