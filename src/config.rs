use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub populate: PopulateConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    /// Deadline for a single store call, in milliseconds.
    pub timeout_ms: u64,
    /// Name of the sequence counter row used for hotel ids.
    pub counter_name: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// One of `local`, `remote`, `hashed`.
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
    /// URL of the model service used by the `remote` provider.
    pub endpoint: String,
    /// Vector length produced by the `hashed` and `remote` providers.
    pub dimensions: usize,
    /// Deadline for a single embedding call, in milliseconds.
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PopulateConfig {
    pub default_count: usize,
    pub annotations_per_hotel: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_service_dir()
            .join("catalog.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            timeout_ms: 100_000,
            counter_name: "hotelId".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_service_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
            endpoint: "http://nlp-service:3001/embed".into(),
            dimensions: 512,
            timeout_ms: 100_000,
        }
    }
}

impl Default for PopulateConfig {
    fn default() -> Self {
        Self {
            default_count: 10,
            annotations_per_hotel: 3,
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Returns `~/.hotel-search/`, or `./.hotel-search/` when no home directory is known.
pub fn default_service_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hotel-search")
}

/// Returns the default config file path: `~/.hotel-search/config.toml`
pub fn default_config_path() -> PathBuf {
    default_service_dir().join("config.toml")
}

impl ServiceConfig {
    /// Load config from `HOTEL_SEARCH_CONFIG` or the default path, then apply env var overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("HOTEL_SEARCH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path());
        Self::load_from(path)
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ServiceConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HOTEL_SEARCH_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("HOTEL_SEARCH_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("HOTEL_SEARCH_EMBEDDING_PROVIDER") {
            self.embedding.provider = val;
        }
        if let Ok(val) = std::env::var("HOTEL_SEARCH_EMBEDDING_ENDPOINT") {
            self.embedding.endpoint = val;
        }
        if let Ok(val) = std::env::var("PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring unparseable PORT"),
            }
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
