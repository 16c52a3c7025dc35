//! Hostel Sync Server
//!
//! Serves the hostel's live records (settings, menus, bus routes, service
//! requests, chat) from SQLite and pushes changes to listening clients.
//!
//! # Configuration
//!
//! Environment variables:
//! - `HOSTEL_PORT`: Port to listen on (default: 8080)
//! - `HOSTEL_DATABASE_PATH`: SQLite database file (default: ~/.local/share/hostel-server/hostel.db)
//! - `HOSTEL_SERVER_CONFIG`: Path to config file (default: ~/.config/hostel-server/config.yaml)
//!
//! # Config File Format
//!
//! ```yaml
//! api_keys:
//!   - key: "warden-secret"
//!     user_id: "admin"
//!     role: admin
//!   - key: "asha-secret"
//!     user_id: "stu-1"
//!     role: student
//! ```

use hostelsync::server::{init_db, router, ApiKeyStore, AppState, SqliteDocumentStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    /// Port to listen on
    port: u16,
    /// SQLite database file
    database_path: PathBuf,
    /// Path to config file
    config_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let port = std::env::var("HOSTEL_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let database_path = std::env::var("HOSTEL_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("hostel-server")
                    .join("hostel.db")
            });

        let config_path = std::env::var("HOSTEL_SERVER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("hostel-server")
                    .join("config.yaml")
            });

        Self {
            port,
            database_path,
            config_path,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hostel_server=info,hostelsync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    tracing::info!("Database: {}", config.database_path.display());
    tracing::info!("Config file: {}", config.config_path.display());

    let pool = match init_db(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let api_keys = ApiKeyStore::load(&config.config_path);
    let state = AppState::new(api_keys, SqliteDocumentStore::new(pool));
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
