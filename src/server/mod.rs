//! Server-side modules for the hostel sync server.

pub mod api;
pub mod auth;
pub mod listen;
pub mod storage;
pub mod students;

pub use api::{router, ApiError, AppState};
pub use auth::{ApiKeyStore, AuthUser, Role};
pub use listen::{serve_socket, ListenSession};
pub use storage::{init_db, ServerStorageError, SqliteDocumentStore};
pub use students::StudentRepository;
