use anyhow::{bail, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the labflow service
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LabflowConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Downstream device service settings
    pub device_service: DeviceServiceConfig,
    /// Workflow collection storage
    pub store: StoreConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceServiceConfig {
    /// Base URL of the device service (e.g. http://localhost:5001)
    pub base_url: String,
    /// Per-request timeout for device calls
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Which backend holds the workflow collection
    pub backend: StoreBackend,
    /// Redis connection URL (redis backend only)
    pub redis_url: String,
    /// Maximum pooled Redis connections
    pub pool_max: usize,
    /// Key the workflow collection blob is stored under
    pub collection_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log level when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON structured logs instead of plain text
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5003,
        }
    }
}

impl Default for DeviceServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            redis_url: "redis://localhost:6379".to_string(),
            pool_max: 16,
            collection_key: "workflows".to_string(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl LabflowConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (labflow.toml)
    /// 3. Environment variables (prefixed with LABFLOW_, `__` between sections)
    /// 4. Legacy deployment variables (DEVICE_API_URL, REDIS_URL, PORT)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("labflow.toml").exists() {
            builder = builder.add_source(File::with_name("labflow"));
        }

        builder = builder.add_source(
            Environment::with_prefix("LABFLOW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut labflow_config: LabflowConfig = config.try_deserialize()?;
        labflow_config.apply_legacy_env();
        labflow_config.validate()?;

        Ok(labflow_config)
    }

    /// The original deployment configured the service through bare variables;
    /// they still win over defaults so existing compose files keep working.
    fn apply_legacy_env(&mut self) {
        if let Ok(url) = std::env::var("DEVICE_API_URL") {
            self.device_service.base_url = url;
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.store.redis_url = url;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.device_service.base_url.trim().is_empty() {
            bail!("device_service.base_url is required (set DEVICE_API_URL)");
        }
        if let Err(e) = reqwest::Url::parse(&self.device_service.base_url) {
            bail!(
                "device_service.base_url '{}' is not a valid URL: {}",
                self.device_service.base_url,
                e
            );
        }
        if self.device_service.timeout_seconds == 0 {
            bail!("device_service.timeout_seconds must be greater than zero");
        }
        if self.store.collection_key.trim().is_empty() {
            bail!("store.collection_key must not be empty");
        }
        Ok(())
    }

    /// Render the resolved configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}
