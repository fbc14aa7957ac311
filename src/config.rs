use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Main configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub auth_api: AuthApiConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identity provider and API endpoint settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl Default for AuthApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_credentials_dir")]
    pub dir: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            dir: default_credentials_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Keyring => write!(f, "keyring"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            "memory" => Ok(Self::Memory),
            _ => Err(format!("Unknown storage backend: {s}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_endpoint() -> String {
    "https://api.poetri.co".to_string()
}
const fn default_connect_timeout_secs() -> u64 {
    10
}
const fn default_request_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("poetri/{}", env!("CARGO_PKG_VERSION"))
}
fn default_credentials_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("poetri")
}
fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Config loading and env overrides
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a TOML file, then apply environment variable
    /// overrides. Any setting prefixed with `POETRI_` takes precedence over
    /// the file value.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read '{}': {}", path.display(), e))
            })?;
            Self::from_toml(&content)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text without applying env overrides.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check settings that would otherwise fail at the first request.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.auth_api.endpoint).map_err(|e| {
            Error::Config(format!(
                "Invalid auth_api.endpoint '{}': {}",
                self.auth_api.endpoint, e
            ))
        })?;
        if url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "auth_api.endpoint '{}' cannot be used as a base URL",
                self.auth_api.endpoint
            )));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        macro_rules! env_str {
            ($env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = val;
                }
            };
        }
        macro_rules! env_bool {
            ($env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
                }
            };
        }
        macro_rules! env_parse {
            ($env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    match val.parse() {
                        Ok(parsed) => $field = parsed,
                        Err(_) => tracing::warn!(var = $env, value = %val, "Ignoring unparseable override"),
                    }
                }
            };
        }
        macro_rules! env_path {
            ($env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = PathBuf::from(val);
                }
            };
        }

        // -- Auth API --
        env_str!("POETRI_ENDPOINT", self.auth_api.endpoint);
        env_str!("POETRI_CLIENT_ID", self.auth_api.client_id);
        env_str!("POETRI_CLIENT_SECRET", self.auth_api.client_secret);

        // -- HTTP --
        env_parse!("POETRI_HTTP_CONNECT_TIMEOUT", self.http.connect_timeout_secs);
        env_parse!("POETRI_HTTP_REQUEST_TIMEOUT", self.http.request_timeout_secs);

        // -- Credentials --
        env_parse!("POETRI_CREDENTIALS_BACKEND", self.credentials.backend);
        env_path!("POETRI_CREDENTIALS_DIR", self.credentials.dir);

        // -- Logging --
        env_str!("POETRI_LOG_LEVEL", self.logging.level);
        env_bool!("POETRI_LOG_JSON", self.logging.json);
    }
}
