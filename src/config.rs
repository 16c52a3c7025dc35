use hostel_sync_core::RemoteStore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Client configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Server URL (e.g., "http://localhost:8080")
    pub server_url: ConfigValue<String>,
    /// API key for the server
    #[serde(skip_serializing)]
    pub api_key: ConfigValue<Option<String>>,
    /// Id this client acts as (an admin id or a student id)
    pub user_id: ConfigValue<String>,
    /// Name shown on sent chat messages
    pub display_name: ConfigValue<String>,
    /// Refresh interval for polled data such as the student roster
    pub poll_interval_secs: ConfigValue<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    server_url: Option<String>,
    api_key: Option<String>,
    user_id: Option<String>,
    display_name: Option<String>,
    poll_interval_secs: Option<u64>,
}

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut server_url =
            ConfigValue::new(DEFAULT_SERVER_URL.to_string(), ConfigSource::Default);
        let mut api_key = ConfigValue::new(None, ConfigSource::Default);
        let mut user_id = ConfigValue::new("admin".to_string(), ConfigSource::Default);
        let mut display_name = ConfigValue::new("Warden".to_string(), ConfigSource::Default);
        let mut poll_interval_secs =
            ConfigValue::new(DEFAULT_POLL_INTERVAL_SECS, ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(url) = file_config.server_url {
                server_url = ConfigValue::new(url, ConfigSource::File);
            }
            if let Some(key) = file_config.api_key {
                api_key = ConfigValue::new(Some(key), ConfigSource::File);
            }
            if let Some(id) = file_config.user_id {
                user_id = ConfigValue::new(id, ConfigSource::File);
            }
            if let Some(name) = file_config.display_name {
                display_name = ConfigValue::new(name, ConfigSource::File);
            }
            if let Some(secs) = file_config.poll_interval_secs {
                poll_interval_secs = ConfigValue::new(secs, ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Ok(url) = std::env::var("HOSTEL_SERVER_URL") {
            server_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(key) = std::env::var("HOSTEL_API_KEY") {
            api_key = ConfigValue::new(Some(key), ConfigSource::Environment);
        }
        if let Ok(id) = std::env::var("HOSTEL_USER_ID") {
            user_id = ConfigValue::new(id, ConfigSource::Environment);
        }
        if let Ok(name) = std::env::var("HOSTEL_DISPLAY_NAME") {
            display_name = ConfigValue::new(name, ConfigSource::Environment);
        }

        if poll_interval_secs.value == 0 {
            return Err(ConfigError::InvalidValue(
                "poll_interval_secs".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            server_url,
            api_key,
            user_id,
            display_name,
            poll_interval_secs,
            config_file,
        })
    }

    /// Returns true if the client can talk to a server (has an API key)
    pub fn is_configured(&self) -> bool {
        self.api_key.value.is_some()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.value)
    }

    /// Every key with its displayed value and source. The API key is masked.
    pub fn entries(&self) -> Vec<(&'static str, String, &ConfigSource)> {
        let api_key = match self.api_key.value {
            Some(_) => "(set)",
            None => "(not set)",
        };
        vec![
            ("server_url", self.server_url.value.clone(), &self.server_url.source),
            ("api_key", api_key.to_string(), &self.api_key.source),
            ("user_id", self.user_id.value.clone(), &self.user_id.source),
            ("display_name", self.display_name.value.clone(), &self.display_name.source),
            (
                "poll_interval_secs",
                self.poll_interval_secs.value.to_string(),
                &self.poll_interval_secs.source,
            ),
        ]
    }

    /// Builds the store client for the configured server.
    pub fn remote_store(&self) -> Result<RemoteStore, ConfigError> {
        match &self.api_key.value {
            Some(key) => Ok(RemoteStore::new(self.server_url.value.clone(), key.clone())),
            None => Err(ConfigError::NotConfigured),
        }
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/hostel/
    /// - macOS: ~/Library/Application Support/hostel/
    /// - Windows: %APPDATA%/hostel/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hostel")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String, String),
    NotConfigured,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(key, reason) => {
                write!(f, "Invalid value for '{}': {}", key, reason)
            }
            ConfigError::NotConfigured => write!(
                f,
                "No API key configured. Set api_key in the config file or HOSTEL_API_KEY."
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
