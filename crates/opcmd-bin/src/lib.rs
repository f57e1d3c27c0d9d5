// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcmd-bin
//!
//! CLI binary for the opcmd instrument command layer.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────┐
//!                    │   main.rs    │
//!                    └──────┬───────┘
//!                           │
//!                    ┌──────▼───────┐
//!                    │    cli.rs    │
//!                    └──────┬───────┘
//!                           │
//!               ┌───────────┼───────────┐
//!               ▼           ▼           ▼
//!        ┌──────────┐ ┌──────────┐ ┌──────────┐
//!        │ commands │ │ logging  │ │  error   │
//!        └────┬─────┘ └──────────┘ └──────────┘
//!             │
//!      ┌──────┴───────┐
//!      │ opcmd-config │
//!      │ opcmd-core   │
//!      └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # List the command catalog
//! opcmd commands
//!
//! # Decode a captured GetAvailableDiskSpace result
//! opcmd decode GetAvailableDiskSpace capture.hex --encoding hex
//!
//! # Validate configuration
//! opcmd -c /etc/opcmd/opcmd.yaml validate --strict
//!
//! # Show version
//! opcmd version
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
