// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcmd Integration Tests
//!
//! Integration tests for the opcmd command layer, run against an in-memory
//! simulated instrument server instead of a live OPC UA endpoint.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `mocks`: [`SimulatedServer`](common::mocks::SimulatedServer), a
//!     [`Session`](opcmd_core::Session) with paging, call counting and
//!     canned replies
//!   - `fixtures`: Catalogs, decoded results and configuration documents
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p opcmd-tests
//!
//! # Run specific test suite
//! cargo test -p opcmd-tests --test integration_resolver
//! cargo test -p opcmd-tests --test integration_decoder
//! cargo test -p opcmd-tests --test integration_client
//! cargo test -p opcmd-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### Resolver Tests (`integration_resolver.rs`)
//! - Continuation paging across every page
//! - Continuation limit and release
//! - Duplicate browse names
//!
//! ### Decoder Tests (`integration_decoder.rs`)
//! - Lock state, disk space and sample result payloads
//! - Truncation at every offset
//! - Namespace scope balance
//!
//! ### Client Tests (`integration_client.rs`)
//! - Unknown commands and argument mismatches never reach the server
//! - Bad status handling
//! - Rebinding and stale descriptors
//!
//! ### Config Tests (`integration_config.rs`)
//! - YAML, TOML and JSON files
//! - Environment placeholders and overrides
//! - Configured catalogs executed end to end
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use opcmd_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let catalog = MethodCatalog::builtin();
//!     let server = SimulatedServer::from_catalog(&catalog);
//!     server.reply_with_result(&catalog, "RequestLock", &ResultFixtures::locked());
//!
//!     let client = connect(catalog, &server).await;
//!     let result = client.run("RequestLock", vec![]).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::fixtures::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{connect, init_test_logging, temp_test_dir};
    pub use opcmd_core::{
        ClientOptions, CommandClient, CommandError, DecodedResult, MethodCatalog, StatusCode,
        TaggedValue, VariantTail,
    };
}
