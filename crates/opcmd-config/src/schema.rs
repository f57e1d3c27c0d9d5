// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions for opcmd.
//!
//! # Schema Structure
//!
//! ```text
//! ClientConfig
//! ├── connection: ConnectionConfig
//! ├── resolver: ResolverOptions
//! ├── decoder: DecoderOptions
//! ├── logging: LoggingConfig
//! └── catalog: CatalogConfig
//! ```

use std::time::Duration;

use opcmd_core::{ClientOptions, DecoderOptions, MethodCatalog, ResolverOptions};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogConfig;
use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Default server endpoint.
pub const DEFAULT_ENDPOINT_URL: &str = "opc.tcp://localhost:4840";

/// Default per-call timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest accepted per-call timeout (1 hour).
pub const MAX_CALL_TIMEOUT: Duration = Duration::from_secs(3600);

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for an opcmd client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Server connection settings.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Address resolution settings.
    #[serde(default)]
    pub resolver: ResolverOptions,

    /// Result decoding settings.
    #[serde(default)]
    pub decoder: DecoderOptions,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Command catalog.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl ClientConfig {
    /// Validates the entire configuration, including the catalog.
    pub fn validate(&self) -> ConfigResult<()> {
        self.connection.validate()?;

        if self.resolver.max_continuation_pages == 0 {
            return Err(ConfigError::validation(
                "resolver.max_continuation_pages",
                "must be at least 1",
            ));
        }

        self.build_catalog()?;
        Ok(())
    }

    /// Builds the command catalog described by the `catalog` section.
    pub fn build_catalog(&self) -> ConfigResult<MethodCatalog> {
        self.catalog.build()
    }

    /// Runtime options for a command client.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions::default()
            .with_resolver(self.resolver.clone())
            .with_decoder(self.decoder)
            .with_call_timeout(self.connection.call_timeout)
    }
}

// =============================================================================
// Connection Configuration
// =============================================================================

/// Server connection settings handed to the session transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// OPC UA endpoint URL.
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,

    /// Security policy.
    #[serde(default)]
    pub security_policy: SecurityPolicy,

    /// Security mode.
    #[serde(default)]
    pub security_mode: SecurityMode,

    /// Username for authentication (optional).
    #[serde(default)]
    pub username: Option<String>,

    /// Per-call timeout, e.g. `"30s"`.
    #[serde(default = "default_call_timeout", with = "humantime_serde")]
    pub call_timeout: Duration,
}

fn default_endpoint_url() -> String {
    DEFAULT_ENDPOINT_URL.to_string()
}

fn default_call_timeout() -> Duration {
    DEFAULT_CALL_TIMEOUT
}

impl ConnectionConfig {
    /// Validates the connection configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.endpoint_url.is_empty() {
            return Err(ConfigError::validation(
                "connection.endpoint_url",
                "cannot be empty",
            ));
        }
        if !self.endpoint_url.starts_with("opc.tcp://") {
            return Err(ConfigError::validation(
                "connection.endpoint_url",
                "must start with 'opc.tcp://'",
            ));
        }
        if self.call_timeout.is_zero() || self.call_timeout > MAX_CALL_TIMEOUT {
            return Err(ConfigError::validation(
                "connection.call_timeout",
                format!("must be between 1ms and {:?}", MAX_CALL_TIMEOUT),
            ));
        }
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            security_policy: SecurityPolicy::default(),
            security_mode: SecurityMode::default(),
            username: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// OPC UA security policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SecurityPolicy {
    /// No security.
    #[default]
    None,
    /// Basic256Sha256 policy.
    Basic256Sha256,
    /// Aes128Sha256RsaOaep policy.
    Aes128Sha256RsaOaep,
    /// Aes256Sha256RsaPss policy.
    Aes256Sha256RsaPss,
}

/// OPC UA security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SecurityMode {
    /// No security.
    #[default]
    None,
    /// Sign messages.
    Sign,
    /// Sign and encrypt messages.
    SignAndEncrypt,
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
///
/// Command-line flags take precedence over these values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parses a level name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Compact single-line text.
    Compact,
    /// JSON lines.
    Json,
}

impl LogFormat {
    /// Parses a format name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "text" | "pretty" => Some(LogFormat::Text),
            "compact" => Some(LogFormat::Compact),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcmd_core::DuplicatePolicy;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.connection.endpoint_url, DEFAULT_ENDPOINT_URL);
        assert_eq!(config.resolver.duplicate_policy, DuplicatePolicy::FirstMatch);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_validation() {
        let mut connection = ConnectionConfig::default();
        connection.endpoint_url = "http://localhost:4840".to_string();
        assert!(connection.validate().is_err());

        connection.endpoint_url = String::new();
        assert!(connection.validate().is_err());
    }

    #[test]
    fn test_call_timeout_bounds() {
        let mut connection = ConnectionConfig::default();
        connection.call_timeout = Duration::ZERO;
        assert!(connection.validate().is_err());

        connection.call_timeout = Duration::from_secs(7200);
        assert!(connection.validate().is_err());
    }

    #[test]
    fn test_client_options_carry_settings() {
        let mut config = ClientConfig::default();
        config.connection.call_timeout = Duration::from_secs(5);
        config.resolver.duplicate_policy = DuplicatePolicy::Reject;

        let options = config.client_options();
        assert_eq!(options.call_timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.resolver.duplicate_policy, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_log_level_and_format_parse() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("verbose"), None);
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogLevel::Debug.as_str(), "debug");
    }
}
