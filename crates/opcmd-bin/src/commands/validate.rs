// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use opcmd_config::{CatalogMode, ClientConfig, SecurityMode, SecurityPolicy};

use super::LoadedConfig;
use crate::cli::{OutputFormat, ValidateArgs, DEFAULT_CONFIG_FILE};
use crate::error::{BinError, BinResult};

/// Executes the `validate` command.
///
/// Loading already validated the file; this reports a summary and the
/// warnings that do not make the configuration invalid.
pub fn validate(loaded: &LoadedConfig, args: &ValidateArgs) -> BinResult<()> {
    let config_path = loaded.path.as_ref().ok_or_else(|| {
        BinError::config(format!(
            "no configuration file given and '{}' not found",
            DEFAULT_CONFIG_FILE
        ))
    })?;
    let config = &loaded.config;
    let catalog = config.build_catalog()?;
    let warnings = collect_warnings(config);

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Endpoint: {}", config.connection.endpoint_url);
            println!("  Call timeout: {:?}", config.connection.call_timeout);
            println!("  Catalog mode: {}", config.catalog.mode.as_str());
            println!("  Commands: {}", catalog.len());
            println!("  Duplicate policy: {:?}", config.resolver.duplicate_policy);
            println!("  Enum encoding: {:?}", config.decoder.enum_encoding);

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                let rendered = serde_json::to_string_pretty(config)
                    .unwrap_or_else(|_| "(serialization error)".to_string());
                println!("{}", rendered);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "endpoint_url": config.connection.endpoint_url,
                    "catalog_mode": config.catalog.mode.as_str(),
                    "command_count": catalog.len(),
                    "commands": catalog.names().collect::<Vec<_>>(),
                },
                "warnings": warnings,
                "config": if args.show_config { Some(config) } else { None },
            });
            let output = serde_json::to_string_pretty(&output)
                .map_err(|e| BinError::Runtime(e.to_string()))?;
            println!("{}", output);
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::config(format!(
            "Strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}

/// Settings that are valid but probably not what was meant.
pub fn collect_warnings(config: &ClientConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.catalog.mode == CatalogMode::Builtin && config.catalog.has_entries() {
        warnings.push("Catalog entries are ignored in builtin mode".to_string());
    }

    let connection = &config.connection;
    match (connection.security_policy, connection.security_mode) {
        (SecurityPolicy::None, SecurityMode::None) => {
            if connection.username.is_some() {
                warnings.push("Username is sent without a security policy".to_string());
            }
        }
        (SecurityPolicy::None, _) => {
            warnings.push("Security mode is set but security policy is None".to_string());
        }
        (_, SecurityMode::None) => {
            warnings.push("Security policy is set but security mode is None".to_string());
        }
        _ => {}
    }

    if config.decoder.allow_trailing_bytes {
        warnings.push("Trailing bytes after the last result field are accepted".to_string());
    }

    warnings
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use opcmd_config::{CommandConfig, ConfigFormat, ConfigLoader};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_has_no_warnings() {
        assert!(collect_warnings(&ClientConfig::default()).is_empty());
    }

    #[test]
    fn test_security_mismatch_warns() {
        let mut config = ClientConfig::default();
        config.connection.security_mode = SecurityMode::SignAndEncrypt;
        assert_eq!(collect_warnings(&config).len(), 1);

        config.connection.security_policy = SecurityPolicy::Basic256Sha256;
        assert!(collect_warnings(&config).is_empty());
    }

    #[test]
    fn test_ignored_catalog_entries_warn() {
        let mut config = ClientConfig::default();
        config.catalog.commands.push(CommandConfig {
            name: "StartPump".to_string(),
            path: vec!["PumpObject".to_string()],
            method: None,
            namespace: None,
            inputs: vec![],
            header: None,
            result: None,
            description: None,
        });
        let warnings = collect_warnings(&config);
        assert!(warnings[0].contains("builtin mode"));
    }

    #[test]
    fn test_strict_mode_fails_on_warnings() {
        let yaml = "decoder:\n  allow_trailing_bytes: true\n";
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(yaml, ConfigFormat::Yaml)
            .unwrap();
        let loaded = LoadedConfig {
            path: Some(file.path().to_path_buf()),
            config,
        };

        let lenient = ValidateArgs::default();
        assert!(validate(&loaded, &lenient).is_ok());

        let strict = ValidateArgs {
            strict: true,
            ..ValidateArgs::default()
        };
        assert_eq!(validate(&loaded, &strict).unwrap_err().exit_code(), 1);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let loaded = LoadedConfig::default();
        assert!(matches!(
            validate(&loaded, &ValidateArgs::default()),
            Err(BinError::Configuration(_))
        ));
    }
}
