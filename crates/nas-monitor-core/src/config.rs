//! Configuration types for the nas-monitor client.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{Endpoint, Error};

/// Client configuration loaded from YAML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote host settings
    pub host: HostSettings,
    /// Reconnection settings
    pub reconnect: ReconnectSettings,
    /// Session settings
    pub session: SessionSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

impl ClientConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: ClientConfig =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.host.websocket_path.starts_with('/') {
            return Err(Error::Config(
                "host.websocket_path must start with '/'".to_string(),
            ));
        }

        if self.session.max_sessions == 0 {
            return Err(Error::Config("session.max_sessions must be > 0".to_string()));
        }

        if !matches!(
            self.logging.level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(Error::Config(format!(
                "logging.level '{}' is not one of trace, debug, info, warn, error",
                self.logging.level
            )));
        }

        if self.host.url.is_some() {
            self.host.endpoint()?;
        }

        Ok(())
    }
}

/// Remote host settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Host address: web UI base URL, socket URL or bare host
    pub url: Option<String>,
    /// API key (never logged)
    pub api_key: Option<String>,
    /// Socket path used when `url` has none
    pub websocket_path: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            websocket_path: crate::endpoint::DEFAULT_WEBSOCKET_PATH.to_string(),
        }
    }
}

impl HostSettings {
    /// Resolve `url` into a socket endpoint.
    pub fn endpoint(&self) -> crate::Result<Endpoint> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| Error::Config("host.url is not set".to_string()))?;
        Endpoint::from_base_url(url, &self.websocket_path)
    }
}

/// Reconnection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    /// Reconnection attempts after a close before the session is declared dead
    pub max_retries: u32,
    /// Pause before each reconnection attempt in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl ReconnectSettings {
    /// Retry delay as a `Duration`.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Close a link that stays silent this long in any stage (0 = never)
    pub stage_timeout_ms: u64,
    /// Maximum number of concurrent sessions in a manager
    pub max_sessions: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            stage_timeout_ms: 0,
            max_sessions: 4,
        }
    }
}

impl SessionSettings {
    /// Stage timeout, `None` when disabled.
    pub fn stage_timeout(&self) -> Option<Duration> {
        (self.stage_timeout_ms > 0).then(|| Duration::from_millis(self.stage_timeout_ms))
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
