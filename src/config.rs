//! # Configuration Management
//!
//! Centralized configuration for the module protocol library.
//!
//! This module provides structured configuration for controllers, discovery
//! and module peers, including timeouts, retry policy and logging options.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`

use crate::error::{ModuleError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Current supported protocol version. Messages carrying any other value
/// are rejected at decode time.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Default UDP port modules listen on.
pub const DEFAULT_PORT: u16 = 8888;

/// Max allowed datagram payload size in bytes.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Commands beyond this count in a single inbound message are truncated
/// by the receiving peer. The sender is not notified; see the peer module
/// documentation for the rationale and caveats.
pub const MAX_COMMANDS_PER_MESSAGE: usize = 16;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProtocolConfig {
    /// Controller-specific configuration
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Discovery configuration
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Module peer configuration
    #[serde(default)]
    pub peer: PeerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ProtocolConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ModuleError::Config(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ModuleError::Config(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ModuleError::Config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Start with defaults
        let mut config = Self::default();

        // Override with environment variables
        if let Ok(timeout) = std::env::var("MODULE_PROTOCOL_RESPONSE_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.controller.response_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(retries) = std::env::var("MODULE_PROTOCOL_MAX_RETRIES") {
            if let Ok(val) = retries.parse::<u32>() {
                config.controller.max_retries = val;
            }
        }

        if let Ok(addr) = std::env::var("MODULE_PROTOCOL_BROADCAST_ADDRESS") {
            config.discovery.broadcast_address = addr;
        }

        if let Ok(addr) = std::env::var("MODULE_PROTOCOL_BIND_ADDRESS") {
            config.peer.bind_address = addr;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.controller.validate());
        errors.extend(self.discovery.validate());
        errors.extend(self.peer.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ModuleError::Config(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Controller-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Deadline for a correlated response to arrive. Terminal per request;
    /// a response timeout is never retried automatically.
    #[serde(with = "duration_serde")]
    pub response_timeout: Duration,

    /// Additional transmit attempts after the first fails. Applies only to
    /// transmission failures, never to response timeouts.
    pub max_retries: u32,

    /// Whether responses are correlated to requests by sequence number.
    /// When disabled, sends complete immediately with no response and
    /// messages carry a random 31-bit id instead.
    pub sequence_tracking: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            response_timeout: timeout::RESPONSE_TIMEOUT,
            max_retries: 3,
            sequence_tracking: true,
        }
    }
}

impl ControllerConfig {
    /// Validate controller configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.response_timeout.as_millis() < 10 {
            errors.push("Response timeout too short (minimum: 10ms)".to_string());
        } else if self.response_timeout.as_secs() > 300 {
            errors.push("Response timeout too long (maximum: 300s)".to_string());
        }

        if self.max_retries > 10 {
            errors.push(format!(
                "Max retries very high: {} (exponential backoff makes this impractical)",
                self.max_retries
            ));
        }

        errors
    }
}

/// Discovery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    /// Address the presence probe is broadcast to
    pub broadcast_address: String,

    /// Port the probe is sent to (modules listen on DEFAULT_PORT)
    pub port: u16,

    /// Total window during which replies are collected
    #[serde(with = "duration_serde")]
    pub timeout: Duration,

    /// Number of probe transmissions spread across the window
    pub attempts: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            broadcast_address: String::from("255.255.255.255"),
            port: DEFAULT_PORT,
            timeout: timeout::DISCOVERY_WINDOW,
            attempts: 2,
        }
    }
}

impl DiscoveryConfig {
    /// Validate discovery configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.broadcast_address.is_empty() {
            errors.push("Broadcast address cannot be empty".to_string());
        } else if self.broadcast_address.parse::<std::net::Ipv4Addr>().is_err() {
            errors.push(format!(
                "Invalid broadcast address: '{}' (expected an IPv4 address)",
                self.broadcast_address
            ));
        }

        if self.port == 0 {
            errors.push("Discovery port cannot be 0".to_string());
        }

        if self.attempts == 0 {
            errors.push("Discovery attempts must be greater than 0".to_string());
        } else if self.attempts > 16 {
            errors.push(format!(
                "Discovery attempts very high: {} (each shortens the listen window)",
                self.attempts
            ));
        }

        if self.timeout.as_millis() < 100 {
            errors.push("Discovery timeout too short (minimum: 100ms)".to_string());
        } else if self.timeout.as_secs() > 60 {
            errors.push("Discovery timeout too long (maximum: 60s)".to_string());
        }

        errors
    }
}

/// Module peer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PeerConfig {
    /// Address the peer listens on (e.g., "0.0.0.0:8888")
    pub bind_address: String,

    /// Maximum commands accepted from a single inbound message;
    /// the excess is truncated
    pub max_commands: usize,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{DEFAULT_PORT}"),
            max_commands: MAX_COMMANDS_PER_MESSAGE,
        }
    }
}

impl PeerConfig {
    /// Validate peer configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.bind_address.is_empty() {
            errors.push("Peer bind address cannot be empty".to_string());
        } else if self.bind_address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid peer bind address: '{}' (expected format: '0.0.0.0:8888')",
                self.bind_address
            ));
        }

        if self.max_commands == 0 {
            errors.push("Max commands must be greater than 0".to_string());
        } else if self.max_commands > 64 {
            errors.push(format!(
                "Max commands very high: {} (a full batch cannot fit one datagram)",
                self.max_commands
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("module-protocol"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
