// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `commands` command.

use opcmd_core::CommandSpec;

use super::LoadedConfig;
use crate::cli::{CommandsArgs, OutputFormat};
use crate::error::{BinError, BinResult};

/// Lists the catalog built from the loaded configuration.
pub fn list_commands(loaded: &LoadedConfig, args: &CommandsArgs) -> BinResult<()> {
    let catalog = loaded.config.build_catalog()?;
    let specs: Vec<&CommandSpec> = catalog
        .commands()
        .filter(|spec| matches_filter(spec, args.filter.as_deref()))
        .collect();

    match args.format {
        OutputFormat::Text => {
            println!("{} command(s), catalog mode: {}", specs.len(), loaded.config.catalog.mode.as_str());
            for spec in &specs {
                println!();
                for line in describe(spec) {
                    println!("{}", line);
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::to_string_pretty(&specs)
                .map_err(|e| BinError::Runtime(e.to_string()))?;
            println!("{}", output);
        }
    }

    Ok(())
}

/// Result family shown in listings: the variant kind, or `header` for
/// header-only results.
pub fn result_family(spec: &CommandSpec) -> String {
    spec.output
        .variant
        .as_ref()
        .map(|variant| variant.kind.to_string())
        .unwrap_or_else(|| "header".to_string())
}

fn matches_filter(spec: &CommandSpec, filter: Option<&str>) -> bool {
    match filter {
        Some(text) => spec.name.to_lowercase().contains(&text.to_lowercase()),
        None => true,
    }
}

fn describe(spec: &CommandSpec) -> Vec<String> {
    let mut lines = vec![spec.name.clone()];
    if let Some(description) = &spec.description {
        lines.push(format!("  {}", description));
    }
    lines.push(format!("  path:   {}/{}", spec.parent_path(), spec.method_name()));

    let inputs = if spec.inputs.is_empty() {
        "(none)".to_string()
    } else {
        spec.inputs
            .iter()
            .map(|input| format!("{}: {}", input.name, input.wire_type))
            .collect::<Vec<_>>()
            .join(", ")
    };
    lines.push(format!("  inputs: {}", inputs));
    lines.push(format!("  result: {} ({})", result_family(spec), spec.output.namespace_uri));
    lines
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use opcmd_core::MethodCatalog;

    #[test]
    fn test_result_family() {
        let catalog = MethodCatalog::builtin();
        assert_eq!(result_family(catalog.lookup("RequestLock").unwrap()), "lock_state");
        assert_eq!(result_family(catalog.lookup("Pause").unwrap()), "header");
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let catalog = MethodCatalog::builtin();
        let names: Vec<&str> = catalog
            .commands()
            .filter(|spec| matches_filter(spec, Some("lock")))
            .map(|spec| spec.name.as_str())
            .collect();
        assert_eq!(names, vec!["RequestLock", "ReleaseLock"]);
    }

    #[test]
    fn test_describe_lists_inputs() {
        let catalog = MethodCatalog::builtin();
        let lines = describe(catalog.lookup("DeleteSampleResults").unwrap());
        assert!(lines
            .iter()
            .any(|line| line.contains("uuids: Guid[], retainResultsAndFirstImage: Boolean")));
    }
}
