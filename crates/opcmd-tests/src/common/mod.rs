// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! - `fixtures`: Pre-built catalogs, results and configuration documents
//! - `mocks`: Simulated instrument server

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

use std::sync::{Arc, Once};

use opcmd_core::{ClientOptions, CommandClient, MethodCatalog, Session};
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize test logging. Call this at the start of each test.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn,opcmd=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Create a temporary directory for test data.
pub fn temp_test_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temp directory")
}

/// Connects a client with default options to `server`.
pub async fn connect(catalog: MethodCatalog, server: &Arc<SimulatedServer>) -> CommandClient {
    let session: Arc<dyn Session> = server.clone();
    CommandClient::connect(catalog, ClientOptions::default(), session)
        .await
        .expect("Failed to bind simulated server")
}
