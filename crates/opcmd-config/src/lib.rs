// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcmd-config
//!
//! Configuration management for the opcmd command layer.
//!
//! ## Features
//!
//! - **Schema Definition**: connection, resolver, decoder and logging settings
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Overrides**: `OPCMD_*` variables and `${VAR:default}` placeholders
//! - **Catalog Files**: extend or replace the builtin command catalog
//!
//! ## Quick Start
//!
//! ```no_run
//! use opcmd_config::loader::load_config;
//!
//! let config = load_config("opcmd.yaml").unwrap();
//! let catalog = config.build_catalog().unwrap();
//!
//! println!("Endpoint: {}", config.connection.endpoint_url);
//! println!("Commands: {}", catalog.len());
//! ```
//!
//! ## Catalog Section
//!
//! ```yaml
//! catalog:
//!   mode: extend
//!   namespace_uri: urn:lab:pump
//!   enums:
//!     - name: MethodResultEnum
//!       values: [Success, Failure]
//!     - name: ErrorLevelEnum
//!       values: [NoError, Warning, Error]
//!     - name: PumpStateEnum
//!       values: [Idle, Running, Fault]
//!   commands:
//!     - name: StartPump
//!       path: [PumpObject]
//!       method: StartPump
//!       result:
//!         kind: fields
//!         fields:
//!           - { name: state, type: "enum:PumpStateEnum" }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod catalog;
pub mod error;
pub mod loader;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use schema::{
    ClientConfig, ConnectionConfig, LogFormat, LogLevel, LoggingConfig, SecurityMode,
    SecurityPolicy,
};

pub use catalog::{
    CatalogConfig, CatalogMode, CommandConfig, EnumConfig, EnumValueConfig, StructureConfig,
};

pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(NAME, "opcmd-config");
    }
}
