//! Gateway configuration

use mensa_core::{Canteen, CanteenRegistry, DEFAULT_PROVIDER_URL};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::{GatewayError, DEFAULT_HOST, DEFAULT_PORT};

/// Environment variable overriding the provider endpoint
pub const PROVIDER_URL_ENV: &str = "MENSA_PROVIDER_URL";

/// Main gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Menu provider client
    pub provider: ProviderSettings,

    /// Session configuration
    pub session: SessionSettings,

    /// Upper bound for a whole turn, fetch included
    pub turn_timeout_secs: u64,

    /// Replaces the built-in canteen table when set
    pub canteens: Option<Vec<Canteen>>,

    /// Enable HTTP request tracing
    pub tracing: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            provider: ProviderSettings::default(),
            session: SessionSettings::default(),
            turn_timeout_secs: 15,
            canteens: None,
            tracing: true,
        }
    }
}

impl GatewayConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the provider endpoint
    pub fn with_provider_url(mut self, url: impl Into<String>) -> Self {
        self.provider.base_url = url.into();
        self
    }

    pub fn with_turn_timeout(mut self, secs: u64) -> Self {
        self.turn_timeout_secs = secs;
        self
    }

    pub fn with_canteens(mut self, canteens: Vec<Canteen>) -> Self {
        self.canteens = Some(canteens);
        self
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`
    pub fn apply_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(PROVIDER_URL_ENV).filter(|u| !u.trim().is_empty()) {
            tracing::debug!("Provider URL from {}: {}", PROVIDER_URL_ENV, url);
            self.provider.base_url = url.trim().to_string();
        }
        self
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> crate::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| GatewayError::InvalidConfig(format!("{}:{}: {}", self.host, self.port, e)))
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs)
    }

    /// Canteen table the engine resolves against
    pub fn canteen_registry(&self) -> CanteenRegistry {
        match &self.canteens {
            Some(canteens) => CanteenRegistry::new(canteens.clone()),
            None => CanteenRegistry::default(),
        }
    }

    /// Reject settings the gateway cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        self.socket_addr()?;

        let url = self.provider.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(GatewayError::InvalidConfig(format!(
                "provider.base_url must be an http(s) URL, got {:?}",
                url
            )));
        }
        if self.provider.timeout_secs == 0 || self.turn_timeout_secs == 0 {
            return Err(GatewayError::InvalidConfig("timeouts must be positive".to_string()));
        }
        if self.session.timeout_secs == 0 || self.session.sweep_interval_secs == 0 {
            return Err(GatewayError::InvalidConfig(
                "session timeout and sweep interval must be positive".to_string(),
            ));
        }
        if matches!(&self.canteens, Some(c) if c.is_empty()) {
            return Err(GatewayError::InvalidConfig("canteen table is empty".to_string()));
        }
        Ok(())
    }

    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Menu provider settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Day-view endpoint
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Idle time after which a session starts over
    pub timeout_secs: u64,

    /// How often expired sessions are swept from memory
    pub sweep_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 3600, // 1 hour
            sweep_interval_secs: 60,
        }
    }
}
