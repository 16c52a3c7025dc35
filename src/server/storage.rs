//! Server-side document storage in SQLite.
//!
//! Every document is one row of the `documents` table:
//! ```text
//! path        settings/laundry
//! collection  settings
//! doc_id      laundry
//! fields      {"status":"On Schedule","pickupDay":"Monday"}
//! updated_at  2026-10-16T08:30:00+00:00
//! ```
//!
//! Writes publish the touched path on a [`ChangeHub`]; listeners re-read
//! their target and receive the full current value.

use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hostel_sync_core::store::watch_changes;
use hostel_sync_core::{
    ChangeHub, CollectionPath, DocPath, Document, DocumentStore, Fields, ListenTarget, PathError,
    Query, SnapshotStream, StoreError, WritePayload,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

/// How long a writer waits for the database lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur in server storage.
#[derive(Debug)]
pub enum ServerStorageError {
    /// I/O error preparing the database location.
    IoError(PathBuf, io::Error),
    /// Error from the database driver.
    Database(sqlx::Error),
    /// Error applying schema migrations.
    Migration(sqlx::migrate::MigrateError),
    /// A stored document whose fields are not a JSON object.
    CorruptDocument(String, String),
    /// A stored or requested path that is not a valid document path.
    InvalidPath(PathError),
}

impl std::fmt::Display for ServerStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            ServerStorageError::Database(e) => write!(f, "Database error: {}", e),
            ServerStorageError::Migration(e) => write!(f, "Migration failed: {}", e),
            ServerStorageError::CorruptDocument(path, e) => {
                write!(f, "Stored document {} is corrupt: {}", path, e)
            }
            ServerStorageError::InvalidPath(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ServerStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerStorageError::IoError(_, e) => Some(e),
            ServerStorageError::Database(e) => Some(e),
            ServerStorageError::Migration(e) => Some(e),
            ServerStorageError::InvalidPath(e) => Some(e),
            ServerStorageError::CorruptDocument(..) => None,
        }
    }
}

impl From<sqlx::Error> for ServerStorageError {
    fn from(e: sqlx::Error) -> Self {
        ServerStorageError::Database(e)
    }
}

impl From<sqlx::migrate::MigrateError> for ServerStorageError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        ServerStorageError::Migration(e)
    }
}

impl From<PathError> for ServerStorageError {
    fn from(e: PathError) -> Self {
        ServerStorageError::InvalidPath(e)
    }
}

impl From<ServerStorageError> for StoreError {
    fn from(e: ServerStorageError) -> Self {
        match e {
            ServerStorageError::InvalidPath(e) => StoreError::InvalidPath(e),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Opens the SQLite database and runs migrations.
pub async fn init_db(path: &Path) -> Result<SqlitePool, ServerStorageError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ServerStorageError::IoError(parent.to_path_buf(), e))?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());
    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    path: String,
    fields: String,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document, ServerStorageError> {
        let fields = parse_fields(&self.path, &self.fields)?;
        let path = DocPath::new(self.path)?;
        Ok(Document::new(path, fields))
    }
}

fn parse_fields(path: &str, json: &str) -> Result<Fields, ServerStorageError> {
    serde_json::from_str(json)
        .map_err(|e| ServerStorageError::CorruptDocument(path.to_string(), e.to_string()))
}

/// Document store persisted in SQLite.
///
/// Clones share the pool and the change hub.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
    hub: Arc<ChangeHub>,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            hub: Arc::new(ChangeHub::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load(&self, path: &DocPath) -> Result<Option<Document>, ServerStorageError> {
        let row: Option<DocumentRow> =
            sqlx::query_as("SELECT path, fields FROM documents WHERE path = ?")
                .bind(path.as_str())
                .fetch_optional(&self.pool)
                .await?;

        row.map(DocumentRow::into_document).transpose()
    }

    async fn load_collection(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<Document>, ServerStorageError> {
        let rows: Vec<DocumentRow> =
            sqlx::query_as("SELECT path, fields FROM documents WHERE collection = ?")
                .bind(collection.as_str())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    /// Merges resolved fields into the stored row.
    ///
    /// The write lock is taken up front (`BEGIN IMMEDIATE`); overlapping
    /// writers wait on the busy timeout.
    async fn merge(&self, path: &DocPath, payload: WritePayload) -> Result<(), ServerStorageError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        match merge_row(&mut *conn, path, payload).await {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    tracing::warn!("Rollback of {} failed: {}", path, rollback);
                }
                Err(e)
            }
        }
    }

    async fn remove(&self, path: &DocPath) -> Result<bool, ServerStorageError> {
        let result = sqlx::query("DELETE FROM documents WHERE path = ?")
            .bind(path.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn merge_row(
    conn: &mut SqliteConnection,
    path: &DocPath,
    payload: WritePayload,
) -> Result<(), ServerStorageError> {
    let now = Utc::now();

    let existing: Option<(String,)> = sqlx::query_as("SELECT fields FROM documents WHERE path = ?")
        .bind(path.as_str())
        .fetch_optional(&mut *conn)
        .await?;

    let mut fields = match existing {
        Some((json,)) => parse_fields(path.as_str(), &json)?,
        None => Fields::new(),
    };
    for (field, value) in payload.resolve(now) {
        fields.insert(field, value);
    }

    let json = serde_json::Value::Object(fields).to_string();
    sqlx::query(
        r#"
        INSERT INTO documents (path, collection, doc_id, fields, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(path) DO UPDATE SET fields = excluded.fields, updated_at = excluded.updated_at
        "#,
    )
    .bind(path.as_str())
    .bind(path.collection().as_str())
    .bind(path.id())
    .bind(&json)
    .bind(now.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        Ok(self.load(path).await?)
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let candidates = self.load_collection(&query.collection).await?;
        Ok(query.apply(candidates))
    }

    async fn set_merge(&self, path: &DocPath, payload: WritePayload) -> Result<(), StoreError> {
        let fields: Vec<&str> = payload.fields().collect();
        tracing::debug!("Merge into {}: {:?}", path, fields);

        self.merge(path, payload).await?;
        self.hub.publish(path).await;
        Ok(())
    }

    async fn add(
        &self,
        collection: &CollectionPath,
        payload: WritePayload,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let path = collection.doc(&id)?;

        self.merge(&path, payload).await?;
        self.hub.publish(&path).await;
        tracing::debug!("Created {}", path);
        Ok(id)
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        if self.remove(path).await? {
            self.hub.publish(path).await;
            tracing::debug!("Deleted {}", path);
        }
        Ok(())
    }

    async fn listen(&self, target: ListenTarget) -> Result<SnapshotStream, StoreError> {
        self.hub.prune().await;
        let changes = self.hub.subscribe(&target.collection()).await;
        Ok(watch_changes(self.clone(), changes, target))
    }
}
