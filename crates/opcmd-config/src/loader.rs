// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading and processing for opcmd.
//!
//! # Loading Pipeline
//!
//! 1. Read the YAML/TOML/JSON file
//! 2. Resolve `${VAR}` / `${VAR:default}` placeholders
//! 3. Parse into [`ClientConfig`]
//! 4. Apply `OPCMD_*` environment overrides
//! 5. Validate, including building the command catalog
//!
//! # Environment Variable Override
//!
//! ```text
//! OPCMD_ENDPOINT_URL=opc.tcp://instrument:4840
//! OPCMD_CALL_TIMEOUT=10s
//! OPCMD_DUPLICATE_POLICY=reject
//! OPCMD_LOG_LEVEL=debug
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use opcmd_core::{DuplicatePolicy, EnumEncoding};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::catalog::CatalogMode;
use crate::error::{ConfigError, ConfigResult};
use crate::schema::{ClientConfig, LogFormat, LogLevel};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "OPCMD";

/// Override suffixes understood by the loader.
const KNOWN_OVERRIDES: &[&str] = &[
    "ENDPOINT_URL",
    "USERNAME",
    "CALL_TIMEOUT",
    "DUPLICATE_POLICY",
    "MAX_CONTINUATION_PAGES",
    "ENUM_ENCODING",
    "ALLOW_TRAILING_BYTES",
    "LOG_LEVEL",
    "LOG_FORMAT",
    "CATALOG_MODE",
    // Read by the CLI, not the loader.
    "CONFIG",
];

// =============================================================================
// ConfigLoader
// =============================================================================

/// Configuration loader for opcmd.
///
/// # Examples
///
/// ```no_run
/// use opcmd_config::loader::ConfigLoader;
///
/// let loader = ConfigLoader::new();
/// let config = loader.load("opcmd.yaml").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Environment variable prefix.
    env_prefix: String,

    /// Whether to resolve environment variables in values.
    resolve_env_vars: bool,

    /// Fixed variable set used instead of the process environment.
    vars: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Creates a new configuration loader with default settings.
    pub fn new() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
            vars: None,
        }
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Reads variables from `vars` instead of the process environment.
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Loads configuration from a file.
    ///
    /// The format is determined by the extension: `.yaml`/`.yml`, `.toml`
    /// or `.json`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file is missing or unreadable, fails to
    /// parse, carries an invalid override, or fails validation.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<ClientConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = self.read_file(path)?;
        let format = ConfigFormat::from_path(path)?;

        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(&content)
        } else {
            content
        };

        let config = self.parse_str(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })?;

        self.finish(config)
    }

    /// Loads configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<ClientConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        let config = self.parse_str(&content, format)?;
        self.finish(config)
    }

    fn finish(&self, mut config: ClientConfig) -> ConfigResult<ClientConfig> {
        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!(
            endpoint = %config.connection.endpoint_url,
            catalog_mode = config.catalog.mode.as_str(),
            configured_commands = config.catalog.commands.len(),
            "Configuration summary"
        );

        Ok(config)
    }

    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    fn parse_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<ClientConfig> {
        match format {
            ConfigFormat::Yaml => yaml_parse(content),
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
            }
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
            }
        }
    }

    fn var(&self, name: &str) -> Option<String> {
        match &self.vars {
            Some(vars) => vars.get(name).cloned(),
            None => env::var(name).ok(),
        }
    }

    fn prefixed_names(&self) -> Vec<String> {
        let prefix = format!("{}_", self.env_prefix);
        match &self.vars {
            Some(vars) => vars
                .keys()
                .filter(|k| k.starts_with(&prefix))
                .cloned()
                .collect(),
            None => env::vars()
                .map(|(k, _)| k)
                .filter(|k| k.starts_with(&prefix))
                .collect(),
        }
    }

    /// Resolves `${VAR_NAME}` and `${VAR_NAME:default}` placeholders.
    ///
    /// Unknown variables without a default are left in place.
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' || chars.peek() != Some(&'{') {
                result.push(c);
                continue;
            }
            chars.next();

            let mut var_content = String::new();
            let mut found_close = false;
            for c in chars.by_ref() {
                if c == '}' {
                    found_close = true;
                    break;
                }
                var_content.push(c);
            }

            if !found_close {
                result.push_str("${");
                result.push_str(&var_content);
                continue;
            }

            let (var_name, default_value) = match var_content.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (var_content.as_str(), None),
            };

            match (self.var(var_name), default_value) {
                (Some(value), _) => result.push_str(&value),
                (None, Some(default)) => result.push_str(default),
                (None, None) => {
                    warn!("Environment variable '{}' not found", var_name);
                    result.push_str("${");
                    result.push_str(var_name);
                    result.push('}');
                }
            }
        }

        result
    }

    /// Applies `<PREFIX>_*` overrides on top of the parsed file.
    fn apply_env_overrides(&self, config: &mut ClientConfig) -> ConfigResult<()> {
        let name = |suffix: &str| format!("{}_{}", self.env_prefix, suffix);

        for var in self.prefixed_names() {
            let suffix = &var[self.env_prefix.len() + 1..];
            if !KNOWN_OVERRIDES.contains(&suffix) {
                warn!(variable = %var, "Ignoring unknown configuration override");
            }
        }

        if let Some(value) = self.var(&name("ENDPOINT_URL")) {
            config.connection.endpoint_url = value;
        }
        if let Some(value) = self.var(&name("USERNAME")) {
            config.connection.username = Some(value);
        }
        if let Some(value) = self.var(&name("CALL_TIMEOUT")) {
            config.connection.call_timeout = humantime_serde::re::humantime::parse_duration(&value)
                .map_err(|e| ConfigError::invalid_env_var(name("CALL_TIMEOUT"), e.to_string()))?;
        }

        if let Some(value) = self.var(&name("DUPLICATE_POLICY")) {
            config.resolver.duplicate_policy = match value.to_lowercase().as_str() {
                "first_match" | "first" => DuplicatePolicy::FirstMatch,
                "reject" => DuplicatePolicy::Reject,
                _ => {
                    return Err(ConfigError::invalid_env_var(
                        name("DUPLICATE_POLICY"),
                        "expected 'first_match' or 'reject'",
                    ))
                }
            };
        }
        if let Some(value) = self.var(&name("MAX_CONTINUATION_PAGES")) {
            config.resolver.max_continuation_pages = value.parse().map_err(|_| {
                ConfigError::invalid_env_var(name("MAX_CONTINUATION_PAGES"), "expected a number")
            })?;
        }

        if let Some(value) = self.var(&name("ENUM_ENCODING")) {
            config.decoder.enum_encoding = match value.to_lowercase().as_str() {
                "byte" => EnumEncoding::Byte,
                "int32" => EnumEncoding::Int32,
                _ => {
                    return Err(ConfigError::invalid_env_var(
                        name("ENUM_ENCODING"),
                        "expected 'byte' or 'int32'",
                    ))
                }
            };
        }
        if let Some(value) = self.var(&name("ALLOW_TRAILING_BYTES")) {
            config.decoder.allow_trailing_bytes = parse_bool(&value);
        }

        if let Some(value) = self.var(&name("LOG_LEVEL")) {
            if let Some(level) = LogLevel::parse(&value) {
                config.logging.level = level;
            }
        }
        if let Some(value) = self.var(&name("LOG_FORMAT")) {
            if let Some(format) = LogFormat::parse(&value) {
                config.logging.format = format;
            }
        }

        if let Some(value) = self.var(&name("CATALOG_MODE")) {
            config.catalog.mode = CatalogMode::parse(&value).ok_or_else(|| {
                ConfigError::invalid_env_var(
                    name("CATALOG_MODE"),
                    "expected 'builtin', 'replace' or 'extend'",
                )
            })?;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "enabled"
    )
}

/// YAML parsing through the config crate.
fn yaml_parse<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .map_err(|e| ConfigError::serialization(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::serialization(e.to_string()))
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
///
/// ```no_run
/// use opcmd_config::loader::load_config;
///
/// let config = load_config("opcmd.yaml").unwrap();
/// ```
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ClientConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with the specified format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<ClientConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

// =============================================================================
// Tests
// =============================================================================
