// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `commands`: List the command catalog
//! - `decode`: Decode a captured result body
//! - `validate`: Validate configuration file
//! - `version`: Show version information

mod decode;
mod list;
mod validate;
mod version;

pub use decode::{decode, decode_captured, read_body, render_text};
pub use list::{list_commands, result_family};
pub use validate::{collect_warnings, validate};
pub use version::version;

use std::path::PathBuf;

use opcmd_config::ClientConfig;

use crate::cli::{Cli, Commands, DEFAULT_CONFIG_FILE};
use crate::error::BinResult;

/// Configuration in effect for one CLI invocation.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// File the configuration came from, if any.
    pub path: Option<PathBuf>,
    /// Parsed and validated configuration.
    pub config: ClientConfig,
}

/// Loads the configuration named by `--config`, or `opcmd.yaml` in the
/// working directory when present, or the defaults.
pub fn load_config(cli: &Cli) -> BinResult<LoadedConfig> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        }
    };

    let config = match &path {
        Some(path) => opcmd_config::load_config(path)?,
        None => ClientConfig::default(),
    };

    Ok(LoadedConfig { path, config })
}

/// Executes the appropriate command based on CLI arguments.
pub fn execute(cli: &Cli, loaded: &LoadedConfig) -> BinResult<()> {
    match &cli.command {
        Commands::Commands(args) => list::list_commands(loaded, args),
        Commands::Decode(args) => decode::decode(loaded, args),
        Commands::Validate(args) => validate::validate(loaded, args),
        Commands::Version => version::version(),
    }
}
