//! Bridge configuration
//!
//! Loaded once at startup from a JSON file:
//!
//! ```json
//! {
//!   "network": { "identity": "ward-3", "secret": "..." },
//!   "endpoint_url": "http://192.168.1.20:3000/data",
//!   "request_timeout_ms": 5000,
//!   "numeric_policy": "coerce-to-zero",
//!   "serial": { "port": "/dev/ttyUSB0", "baud_rate": 9600 },
//!   "link": { "mode": "always" }
//! }
//! ```
//!
//! Everything except `network.identity` and `endpoint_url` has a default.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::link::{
    AlwaysConnected, ConnectionStatus, LinkError, NetworkCredentials, ReachabilityProbe,
};
use crate::reading::NumericPolicy;
use crate::serial::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS};
use crate::transmit::DEFAULT_TIMEOUT_MS;

/// Environment variable consulted when the file leaves the secret empty
pub const SECRET_ENV_VAR: &str = "VITALS_NETWORK_SECRET";

/// Configuration file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Network identity must not be empty")]
    MissingIdentity,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Could not determine a configuration directory")]
    NoConfigDir,

    #[error(transparent)]
    Link(#[from] LinkError),
}

/// How the bridge decides whether the network is up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Assume the host is on the network; transport failures surface from
    /// the POST itself
    #[default]
    Always,
    /// Open a TCP connection to the endpoint before each transmission
    Probe,
}

/// Serial input settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Serial port name (first detected port when unset)
    pub port: Option<String>,

    /// Baud rate
    pub baud_rate: u32,

    /// Single read timeout in milliseconds
    pub read_timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

/// Network link settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    /// Link status source
    pub mode: LinkMode,

    /// Connect timeout for the reachability probe in milliseconds
    pub probe_timeout_ms: u64,

    /// How long to wait for the link at startup (0 = forever)
    pub startup_wait_ms: u64,

    /// Poll interval while waiting for the link
    pub poll_interval_ms: u64,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            mode: LinkMode::default(),
            probe_timeout_ms: 1000,
            startup_wait_ms: 30_000,
            poll_interval_ms: 500,
        }
    }
}

/// Complete bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Network identity and secret
    pub network: NetworkCredentials,

    /// Collector URL readings are POSTed to
    pub endpoint_url: String,

    /// Per-request time limit in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Handling of undecodable numeric fields
    #[serde(default)]
    pub numeric_policy: NumericPolicy,

    /// Serial input settings
    #[serde(default)]
    pub serial: SerialSettings,

    /// Network link settings
    #[serde(default)]
    pub link: LinkSettings,
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl BridgeConfig {
    /// Configuration with defaults for everything but the required fields
    pub fn new(identity: impl Into<String>, endpoint_url: impl Into<String>) -> Self {
        Self {
            network: NetworkCredentials {
                identity: identity.into(),
                secret: String::new(),
            },
            endpoint_url: endpoint_url.into(),
            request_timeout_ms: default_request_timeout_ms(),
            numeric_policy: NumericPolicy::default(),
            serial: SerialSettings::default(),
            link: LinkSettings::default(),
        }
    }

    /// Default configuration file location
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("vitals-bridge").join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// An empty `network.secret` is filled from [`SECRET_ENV_VAR`] when set.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_json(&content)?;
        if config.network.secret.is_empty() {
            if let Ok(secret) = std::env::var(SECRET_ENV_VAR) {
                config.network.secret = secret;
            }
        }

        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration as pretty-printed JSON, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(write_err)
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.identity.trim().is_empty() {
            return Err(ConfigError::MissingIdentity);
        }
        self.endpoint()?;

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("request_timeout_ms"));
        }
        if self.serial.read_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("serial.read_timeout_ms"));
        }
        if self.link.probe_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("link.probe_timeout_ms"));
        }
        if self.link.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("link.poll_interval_ms"));
        }
        Ok(())
    }

    /// Parsed collector URL (absolute http/https with a host)
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidEndpoint {
            url: self.endpoint_url.clone(),
            reason: reason.to_string(),
        };

        let url = Url::parse(&self.endpoint_url).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host"));
        }
        Ok(url)
    }

    /// Per-request time limit
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Single serial read timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.serial.read_timeout_ms)
    }

    /// Reachability probe connect timeout
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.link.probe_timeout_ms)
    }

    /// Startup wait limit, `None` meaning wait forever
    pub fn startup_wait(&self) -> Option<Duration> {
        (self.link.startup_wait_ms > 0).then(|| Duration::from_millis(self.link.startup_wait_ms))
    }

    /// Poll interval while waiting for the link
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.link.poll_interval_ms)
    }

    /// Link status source selected by `link.mode`
    pub fn connection_status(&self) -> Result<Box<dyn ConnectionStatus>, ConfigError> {
        let link: Box<dyn ConnectionStatus> = match self.link.mode {
            LinkMode::Always => Box::new(AlwaysConnected),
            LinkMode::Probe => Box::new(ReachabilityProbe::for_endpoint(
                &self.endpoint()?,
                self.probe_timeout(),
            )?),
        };
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_takes_defaults() {
        let config = BridgeConfig::from_json(
            r#"{
                "network": { "identity": "ward-3" },
                "endpoint_url": "http://192.168.1.20:3000/data"
            }"#,
        )
        .unwrap();

        assert_eq!(config, BridgeConfig::new("ward-3", "http://192.168.1.20:3000/data"));
        assert_eq!(config.request_timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.link.mode, LinkMode::Always);
        assert_eq!(config.numeric_policy, NumericPolicy::CoerceToZero);
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let config = BridgeConfig::new("ward-3", "ftp://collector/data");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_rejects_relative_endpoint() {
        let config = BridgeConfig::new("ward-3", "/data");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_identity() {
        let config = BridgeConfig::new("  ", "http://collector/data");
        assert!(matches!(config.validate(), Err(ConfigError::MissingIdentity)));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = BridgeConfig::new("ward-3", "http://collector/data");
        config.request_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroDuration("request_timeout_ms"))
        ));
    }

    #[test]
    fn test_startup_wait_zero_means_forever() {
        let mut config = BridgeConfig::new("ward-3", "http://collector/data");
        config.link.startup_wait_ms = 0;
        assert_eq!(config.startup_wait(), None);
    }
}
