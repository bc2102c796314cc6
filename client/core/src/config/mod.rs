//! TOML Configuration File Support
//!
//! Client configuration lives in an optional TOML file at
//! `~/.config/experience-chat/client.toml`.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/experience-chat/client.toml` (typically
//!   `~/.config/experience-chat/client.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [transport]
//! base_url = "wss://chat.example.com/ws/chat"
//! reconnect_delay_ms = 3000
//! connect_timeout_ms = 10000
//! max_frame_size = 1048576
//! channel_capacity = 100
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::TransportConfig;

/// Environment variable for the WebSocket base URL
pub const ENV_WS_URL: &str = "EXPERIENCE_CHAT_WS_URL";
/// Environment variable for the reconnect delay (ms)
pub const ENV_RECONNECT_DELAY: &str = "EXPERIENCE_CHAT_RECONNECT_DELAY";
/// Environment variable for the connect timeout (ms)
pub const ENV_CONNECT_TIMEOUT: &str = "EXPERIENCE_CHAT_CONNECT_TIMEOUT";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the configuration's highest-priority value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Transport section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportToml {
    /// WebSocket base URL
    pub base_url: Option<String>,

    /// Delay between a close and the next connect attempt (ms)
    pub reconnect_delay_ms: Option<u64>,

    /// Connect attempt timeout (ms)
    pub connect_timeout_ms: Option<u64>,

    /// Largest accepted inbound frame (bytes)
    pub max_frame_size: Option<usize>,

    /// Connection event channel capacity
    pub channel_capacity: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Transport configuration section
    pub transport: TransportToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved client configuration
///
/// Use [`load_config`] to load it with proper priority handling.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Transport configuration
    pub transport: TransportConfig,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check values that would make the client unusable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a base URL that is not
    /// `ws://` or `wss://`, or for a zero reconnect delay or connect timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.transport.base_url;
        let rest = url
            .strip_prefix("ws://")
            .or_else(|| url.strip_prefix("wss://"))
            .ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "base_url must start with ws:// or wss://, got {url:?}"
                ))
            })?;
        if rest.is_empty() {
            return Err(ConfigError::ValidationError(
                "base_url has no host".to_string(),
            ));
        }
        if self.transport.reconnect_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "reconnect_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.transport.connect_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/experience-chat/client.toml` or
/// `~/.config/experience-chat/client.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("experience-chat").join("client.toml"))
}

/// Load configuration from the default path, then the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the resolved values fail validation. A missing file is not an error.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path, then the environment
///
/// # Errors
///
/// Returns an error if the specified file cannot be read or parsed, or if
/// the resolved values fail validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    let mut config = read_file_layer(path)?;
    apply_env_config(&mut config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Defaults overlaid with the TOML file, if it exists
fn read_file_layer(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::default();

    let Some(config_path) = path else {
        return Ok(config);
    };

    if !config_path.exists() {
        tracing::debug!(
            path = %config_path.display(),
            "Config file not found, using defaults"
        );
        return Ok(config);
    }

    let toml_content =
        std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
            path: config_path.clone(),
            source: e,
        })?;

    let toml_config: ClientToml = toml::from_str(&toml_content)?;
    apply_toml_config(&mut config, &toml_config);
    config.source = ConfigSource::File;

    tracing::info!(
        path = %config_path.display(),
        "Loaded configuration from file"
    );
    config.config_file_path = Some(config_path);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ClientConfig, toml: &ClientToml) {
    let t = &toml.transport;
    if let Some(ref url) = t.base_url {
        config.transport.base_url.clone_from(url);
    }
    if let Some(delay) = t.reconnect_delay_ms {
        config.transport.reconnect_delay_ms = delay;
    }
    if let Some(timeout) = t.connect_timeout_ms {
        config.transport.connect_timeout_ms = timeout;
    }
    if let Some(size) = t.max_frame_size {
        config.transport.max_frame_size = size;
    }
    if let Some(capacity) = t.channel_capacity {
        config.transport.channel_capacity = capacity;
    }
}

/// Apply environment overrides read through `lookup`
///
/// Unparseable numbers are ignored with a warning and leave the lower layer
/// in place.
fn apply_env_config(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(ENV_WS_URL) {
        config.transport.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(delay) = lookup(ENV_RECONNECT_DELAY) {
        match delay.parse::<u64>() {
            Ok(ms) => {
                config.transport.reconnect_delay_ms = ms;
                config.source = ConfigSource::Env;
            }
            Err(_) => {
                tracing::warn!(var = ENV_RECONNECT_DELAY, value = %delay, "Ignoring non-numeric value");
            }
        }
    }
    if let Some(timeout) = lookup(ENV_CONNECT_TIMEOUT) {
        match timeout.parse::<u64>() {
            Ok(ms) => {
                config.transport.connect_timeout_ms = ms;
                config.source = ConfigSource::Env;
            }
            Err(_) => {
                tracing::warn!(var = ENV_CONNECT_TIMEOUT, value = %timeout, "Ignoring non-numeric value");
            }
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`], then call [`ClientConfig::validate`].
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Base URL override
    pub base_url: Option<String>,

    /// Reconnect delay override (milliseconds)
    pub reconnect_delay_ms: Option<u64>,

    /// Connect timeout override (milliseconds)
    pub connect_timeout_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base URL override
    #[must_use]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Set reconnect delay override
    #[must_use]
    pub fn with_reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.reconnect_delay_ms = Some(ms);
        self
    }

    /// Set connect timeout override
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = Some(ms);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ClientConfig) {
        if self.base_url.is_some()
            || self.reconnect_delay_ms.is_some()
            || self.connect_timeout_ms.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.base_url {
            config.transport.base_url.clone_from(url);
        }
        if let Some(delay) = self.reconnect_delay_ms {
            config.transport.reconnect_delay_ms = delay;
        }
        if let Some(timeout) = self.connect_timeout_ms {
            config.transport.connect_timeout_ms = timeout;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
