// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! Loading configuration files and running configured catalogs.
//!
//! ## Test Categories
//!
//! - `test_load_*`: file formats, placeholders and overrides
//! - `test_catalog_*`: configured commands executed end to end

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use opcmd_config::{CatalogMode, ConfigError, ConfigLoader, LogFormat, LogLevel};
use opcmd_core::result::Field;
use opcmd_core::{
    CommonHeader, DecodedValue, DuplicatePolicy, EnumEncoding, Session,
};
use opcmd_tests::prelude::*;

fn isolated() -> ConfigLoader {
    ConfigLoader::new().with_vars(Vec::<(String, String)>::new())
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_yaml_with_placeholder_default() {
    init_test_logging();
    let dir = temp_test_dir("opcmd_yaml");
    let path = dir.path().join("opcmd.yaml");
    fs::write(&path, ConfigFixtures::pump_yaml()).unwrap();

    let config = isolated().load(&path).unwrap();
    assert_eq!(config.connection.endpoint_url, "opc.tcp://localhost:4840");
    assert_eq!(config.connection.call_timeout, Duration::from_secs(5));
    assert_eq!(config.resolver.duplicate_policy, DuplicatePolicy::Reject);
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.catalog.mode, CatalogMode::Extend);
}

#[test]
fn test_load_yaml_with_placeholder_value() {
    let dir = temp_test_dir("opcmd_yaml_vars");
    let path = dir.path().join("opcmd.yml");
    fs::write(&path, ConfigFixtures::pump_yaml()).unwrap();

    let config = ConfigLoader::new()
        .with_vars([("PUMP_HOST", "pump-7.lab")])
        .load(&path)
        .unwrap();
    assert_eq!(config.connection.endpoint_url, "opc.tcp://pump-7.lab:4840");
}

#[test]
fn test_load_toml() {
    let dir = temp_test_dir("opcmd_toml");
    let path = dir.path().join("opcmd.toml");
    fs::write(&path, ConfigFixtures::minimal_toml()).unwrap();

    let config = isolated().load(&path).unwrap();
    assert_eq!(config.connection.endpoint_url, "opc.tcp://instrument.lab:4840");
    assert_eq!(config.connection.call_timeout, Duration::from_secs(10));
    assert_eq!(config.decoder.enum_encoding, EnumEncoding::Int32);
    assert_eq!(config.logging.level, LogLevel::Warn);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.build_catalog().unwrap().len(), MethodCatalog::builtin().len());
}

#[test]
fn test_load_json() {
    let dir = temp_test_dir("opcmd_json");
    let path = dir.path().join("opcmd.json");
    fs::write(&path, ConfigFixtures::minimal_json()).unwrap();

    let config = isolated().load(&path).unwrap();
    assert_eq!(config.resolver.max_continuation_pages, 16);
    assert_eq!(config.client_options().resolver.max_continuation_pages, 16);
}

#[test]
fn test_load_overrides_win_over_file() {
    let dir = temp_test_dir("opcmd_overrides");
    let path = dir.path().join("opcmd.toml");
    fs::write(&path, ConfigFixtures::minimal_toml()).unwrap();

    let config = ConfigLoader::new()
        .with_vars([
            ("OPCMD_ENDPOINT_URL", "opc.tcp://standby.lab:4840"),
            ("OPCMD_ENUM_ENCODING", "byte"),
            ("OPCMD_LOG_FORMAT", "compact"),
        ])
        .load(&path)
        .unwrap();
    assert_eq!(config.connection.endpoint_url, "opc.tcp://standby.lab:4840");
    assert_eq!(config.decoder.enum_encoding, EnumEncoding::Byte);
    assert_eq!(config.logging.format, LogFormat::Compact);
}

#[test]
fn test_load_rejects_invalid_files() {
    let dir = temp_test_dir("opcmd_invalid");

    let missing = isolated().load(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(missing, ConfigError::FileNotFound { .. }));

    let unknown = dir.path().join("unknown.yaml");
    fs::write(&unknown, "connection:\n  endpoint: opc.tcp://x:4840\n").unwrap();
    assert!(isolated().load(&unknown).is_err());

    let zero_pages = dir.path().join("pages.json");
    fs::write(&zero_pages, r#"{ "resolver": { "max_continuation_pages": 0 } }"#).unwrap();
    assert!(matches!(
        isolated().load(&zero_pages),
        Err(ConfigError::Validation { .. })
    ));
}

// =============================================================================
// Configured Catalogs
// =============================================================================

#[tokio::test]
async fn test_catalog_configured_command_end_to_end() {
    init_test_logging();
    let config = isolated()
        .load_from_str(ConfigFixtures::pump_yaml(), opcmd_config::ConfigFormat::Yaml)
        .unwrap();
    let catalog = config.build_catalog().unwrap();
    assert!(catalog.contains("RequestLock"));
    assert_eq!(catalog.lookup("StartPump").unwrap().output.namespace_uri, "urn:lab:pump");

    let running = DecodedResult::new(
        CommonHeader::success(),
        VariantTail::Fields(vec![Field::new(
            "state",
            DecodedValue::Enum {
                ordinal: 1,
                name: "Running".to_string(),
            },
        )]),
    );
    let server = SimulatedServer::from_catalog(&catalog);
    server.reply_with_result(&catalog, "StartPump", &running);

    let session: Arc<dyn Session> = server.clone();
    let client = CommandClient::connect(catalog, config.client_options(), session)
        .await
        .unwrap();
    assert_eq!(client.options().call_timeout, Some(Duration::from_secs(5)));

    let outcome = client.execute_text("StartPump", &["12.5"]).await.unwrap();
    let result = outcome.into_result().unwrap();
    assert_eq!(result, running);
    assert_eq!(
        server.call_history()[0].input_arguments,
        vec![TaggedValue::Double(12.5)]
    );
}

#[tokio::test]
async fn test_catalog_replace_mode_drops_builtins() {
    let yaml = ConfigFixtures::pump_yaml().replace("mode: extend", "mode: replace");
    let config = isolated()
        .load_from_str(&yaml, opcmd_config::ConfigFormat::Yaml)
        .unwrap();
    let catalog = config.build_catalog().unwrap();
    assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["StartPump"]);

    let server = SimulatedServer::from_catalog(&catalog);
    let client = connect(catalog, &server).await;
    let error = client.execute("RequestLock", vec![]).await.unwrap_err();
    assert!(matches!(error, CommandError::Catalog(_)));
    assert_eq!(server.calls(), 0);
}
