// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `commands`: List the command catalog
//! - `decode`: Decode a captured result body offline
//! - `validate`: Validate the configuration file
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use opcmd_config::LoggingConfig;

/// Configuration file looked up in the working directory when `--config`
/// is not given.
pub const DEFAULT_CONFIG_FILE: &str = "opcmd.yaml";

// =============================================================================
// Main CLI Structure
// =============================================================================

/// opcmd - command layer for OPC UA instruments
///
/// Lists the instrument command catalog and decodes captured method results
/// without a live server connection.
#[derive(Parser, Debug)]
#[command(
    name = "opcmd",
    author = "Sylvex <contact@sylvex.io>",
    version = opcmd_core::VERSION,
    about = "Command layer for OPC UA instruments",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "OPCMD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the opcmd CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List the command catalog
    ///
    /// Shows each command's parent path, input arguments and result family.
    Commands(CommandsArgs),

    /// Decode a captured result body
    ///
    /// Reads the binary body of a command's first output argument from a
    /// file and decodes it with that command's output schema.
    Decode(DecodeArgs),

    /// Validate the configuration file
    ///
    /// Parses the configuration and builds the command catalog without
    /// connecting to a server.
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `commands` command.
#[derive(Args, Debug, Clone, Default)]
pub struct CommandsArgs {
    /// Only list commands whose name contains this text
    #[arg(long)]
    pub filter: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `decode` command.
#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Command whose output schema is used
    pub command: String,

    /// File holding the captured result body
    pub file: PathBuf,

    /// How the file content is encoded
    #[arg(short, long, default_value = "raw")]
    pub encoding: InputEncoding,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Strict mode: treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<opcmd_config::LogFormat> for LogFormat {
    fn from(format: opcmd_config::LogFormat) -> Self {
        match format {
            opcmd_config::LogFormat::Text => LogFormat::Text,
            opcmd_config::LogFormat::Json => LogFormat::Json,
            opcmd_config::LogFormat::Compact => LogFormat::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

/// Encoding of a captured result file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum InputEncoding {
    /// Binary bytes as captured
    #[default]
    Raw,
    /// Hexadecimal text, whitespace ignored
    Hex,
    /// Base64 text, whitespace ignored
    Base64,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Effective log level: `--quiet`, then `--log-level`, then the
    /// configuration file.
    pub fn effective_log_level(&self, logging: Option<&LoggingConfig>) -> String {
        if self.quiet {
            return "warn".to_string();
        }
        match (&self.log_level, logging) {
            (Some(level), _) => level.clone(),
            (None, Some(logging)) => logging.level.as_str().to_string(),
            (None, None) => "info".to_string(),
        }
    }

    /// Effective log format: `--log-format`, then the configuration file.
    pub fn effective_log_format(&self, logging: Option<&LoggingConfig>) -> LogFormat {
        match (self.log_format, logging) {
            (Some(format), _) => format,
            (None, Some(logging)) => logging.format.into(),
            (None, None) => LogFormat::Text,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
