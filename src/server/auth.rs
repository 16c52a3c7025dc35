//! API key authentication.
//!
//! Keys are loaded from the server config file:
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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Collections students may write to. Everything else is admin-managed.
pub const STUDENT_WRITABLE: &[&str] = &["service_requests", "conversations"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Student => write!(f, "student"),
        }
    }
}

/// API key entry in config
#[derive(Debug, Clone, Deserialize)]
struct ApiKeyEntry {
    key: String,
    user_id: String,
    role: Role,
}

/// Config file structure
#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    api_keys: Vec<ApiKeyEntry>,
}

/// Authenticated user info, added to request extensions after auth
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
}

impl AuthUser {
    /// Whether this user may write documents under `path`.
    pub fn can_write(&self, path: &str) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Student => {
                let root = path.split('/').next().unwrap_or_default();
                STUDENT_WRITABLE.contains(&root)
            }
        }
    }
}

/// API key store - maps key -> AuthUser
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStore {
    keys: HashMap<String, AuthUser>,
}

impl ApiKeyStore {
    /// Load API keys from config file
    pub fn load(config_path: &Path) -> Self {
        let keys = match std::fs::read_to_string(config_path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file: {}", e);
                HashMap::new()
            }),
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}",
                    config_path.display(),
                    e
                );
                tracing::warn!("No API keys loaded - all authenticated requests will fail");
                HashMap::new()
            }
        };

        tracing::info!("Loaded {} API key(s)", keys.len());
        Self { keys }
    }

    fn parse(contents: &str) -> Result<HashMap<String, AuthUser>, serde_yaml::Error> {
        let config: ConfigFile = serde_yaml::from_str(contents)?;
        Ok(config
            .api_keys
            .into_iter()
            .map(|entry| {
                (
                    entry.key,
                    AuthUser {
                        user_id: entry.user_id,
                        role: entry.role,
                    },
                )
            })
            .collect())
    }

    /// Builds a store from explicit entries.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, AuthUser)>,
    {
        Self {
            keys: entries.into_iter().collect(),
        }
    }

    /// Validate an API key and return the associated user
    pub fn validate(&self, key: &str) -> Option<AuthUser> {
        self.keys.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_keys_with_roles() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("server.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "api_keys:").unwrap();
        writeln!(file, "  - key: warden").unwrap();
        writeln!(file, "    user_id: admin").unwrap();
        writeln!(file, "    role: admin").unwrap();
        writeln!(file, "  - key: asha").unwrap();
        writeln!(file, "    user_id: stu-1").unwrap();
        writeln!(file, "    role: student").unwrap();

        let store = ApiKeyStore::load(&path);
        assert_eq!(store.len(), 2);
        assert_eq!(store.validate("asha").unwrap().role, Role::Student);
        assert!(store.validate("nobody").is_none());
    }

    #[test]
    fn test_missing_file_loads_no_keys() {
        let temp_dir = tempdir().unwrap();
        let store = ApiKeyStore::load(&temp_dir.path().join("missing.yaml"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_student_write_scope() {
        let student = AuthUser {
            user_id: "stu-1".into(),
            role: Role::Student,
        };
        assert!(student.can_write("service_requests/r1"));
        assert!(student.can_write("conversations/stu-1/messages/m1"));
        assert!(!student.can_write("settings/laundry"));
        assert!(!student.can_write("bus_routes/r1"));

        let admin = AuthUser {
            user_id: "admin".into(),
            role: Role::Admin,
        };
        assert!(admin.can_write("settings/laundry"));
    }
}
