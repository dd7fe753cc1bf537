//! Configuration for osbd

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Main broker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Reconciliation controller configuration
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Path the broker API is mounted under; routes live at `<prefix>/v2`
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Enable CORS
    #[serde(default)]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            url_prefix: default_url_prefix(),
            max_body_size: default_max_body_size(),
            enable_cors: false,
        }
    }
}

impl ServerConfig {
    /// Mount point of the versioned broker routes, always `/`-rooted
    pub fn versioned_prefix(&self) -> String {
        let trimmed = self.url_prefix.trim_matches('/');
        if trimmed.is_empty() {
            "/v2".to_string()
        } else {
            format!("/{}/v2", trimmed)
        }
    }
}

/// Reconciliation controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Namespace all broker-owned instances live in
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Full relist interval in seconds
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,

    /// Capacity of the informer to controller event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            resync_interval_secs: default_resync_interval(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl ControllerConfig {
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs.max(1))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
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

// Default value helpers
fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8443))
}

fn default_url_prefix() -> String {
    "/broker/sdkbroker.broker.io".to_string()
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn default_namespace() -> String {
    "brokersdk".to_string()
}

fn default_resync_interval() -> u64 {
    120
}

fn default_event_buffer() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BrokerConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `OSB_`-prefixed environment variables (`OSB_SERVER__URL_PREFIX`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&BrokerConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("OSB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
