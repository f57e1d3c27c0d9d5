// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The `catalog` configuration section.
//!
//! Commands and types can be declared in configuration and either added to
//! the builtin instrument table or used in place of it:
//!
//! ```yaml
//! catalog:
//!   mode: extend            # builtin | replace | extend
//!   namespace_uri: "urn:lab:pump"
//!   enums:
//!     - name: MethodResultEnum
//!       values: [Success, Failure]
//!     - name: PumpStateEnum
//!       ordinals:
//!         - { value: 0, name: Idle }
//!         - { value: 5, name: Running }
//!   structures:
//!     - name: FlowSample
//!       fields:
//!         - { name: RateMlMin, type: double }
//!   commands:
//!     - name: GetPumpState
//!       path: [PumpObject, Methods]
//!       inputs:
//!         - { name: channel, type: uint16 }
//!       result:
//!         kind: fields
//!         fields:
//!           - { name: State, type: "enum:PumpStateEnum" }
//! ```
//!
//! Entries without a `namespace` use the section's `namespace_uri`, or the
//! instrument namespace when that is unset.

use opcmd_core::catalog::INSTRUMENT_NAMESPACE;
use opcmd_core::schema::{EnumType, FieldSchema, HeaderSchema, OutputSchema, StructureType, VariantSchema};
use opcmd_core::{ArgumentSpec, CommandSpec, MethodCatalog, TypeDictionary};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Catalog Section
// =============================================================================

/// How configured commands combine with the builtin table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogMode {
    /// Builtin table only; configured entries are ignored.
    #[default]
    Builtin,
    /// Configured commands only. Builtin types stay available.
    Replace,
    /// Builtin table plus configured commands and types.
    Extend,
}

impl CatalogMode {
    /// Returns the mode name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogMode::Builtin => "builtin",
            CatalogMode::Replace => "replace",
            CatalogMode::Extend => "extend",
        }
    }

    /// Parses a mode name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "builtin" => Some(CatalogMode::Builtin),
            "replace" => Some(CatalogMode::Replace),
            "extend" => Some(CatalogMode::Extend),
            _ => None,
        }
    }
}

/// Catalog configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Combination mode.
    #[serde(default)]
    pub mode: CatalogMode,

    /// Default namespace for entries that do not name one.
    #[serde(default)]
    pub namespace_uri: Option<String>,

    /// Enumeration definitions.
    #[serde(default)]
    pub enums: Vec<EnumConfig>,

    /// Structure definitions.
    #[serde(default)]
    pub structures: Vec<StructureConfig>,

    /// Command definitions.
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
}

/// One enumeration.
///
/// Either `values` (ordinals are positions) or `ordinals` (explicit) must be
/// given, not both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumConfig {
    /// Namespace URI.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Type name.
    pub name: String,
    /// Names with sequential ordinals starting at zero.
    #[serde(default)]
    pub values: Vec<String>,
    /// Names with explicit ordinals.
    #[serde(default)]
    pub ordinals: Vec<EnumValueConfig>,
}

/// One explicit enumeration value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumValueConfig {
    /// Ordinal on the wire.
    pub value: i32,
    /// Symbolic name.
    pub name: String,
}

/// One structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructureConfig {
    /// Namespace URI.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Type name.
    pub name: String,
    /// Fields in wire order.
    pub fields: Vec<FieldSchema>,
}

/// One command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    /// Command display name.
    pub name: String,
    /// Object names from the Objects folder to the parent object.
    pub path: Vec<String>,
    /// Method display name, when it differs from `name`.
    #[serde(default)]
    pub method: Option<String>,
    /// Namespace the result is decoded in.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Input arguments in call order.
    #[serde(default)]
    pub inputs: Vec<ArgumentSpec>,
    /// Header enumeration names.
    #[serde(default)]
    pub header: Option<HeaderSchema>,
    /// Result tail; omitted for header-only results.
    #[serde(default)]
    pub result: Option<VariantSchema>,
    /// Description shown in listings.
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Conversion
// =============================================================================

impl CatalogConfig {
    /// Returns `true` if the section declares anything.
    pub fn has_entries(&self) -> bool {
        !(self.enums.is_empty() && self.structures.is_empty() && self.commands.is_empty())
    }

    fn namespace<'a>(&'a self, entry: &'a Option<String>) -> &'a str {
        entry
            .as_deref()
            .or(self.namespace_uri.as_deref())
            .unwrap_or(INSTRUMENT_NAMESPACE)
    }

    /// Builds the configured type dictionary.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an enumeration with neither or both of
    /// `values` and `ordinals`, or with a repeated ordinal or name.
    pub fn dictionary(&self) -> ConfigResult<TypeDictionary> {
        let mut dictionary = TypeDictionary::new();

        for (i, entry) in self.enums.iter().enumerate() {
            let field = format!("catalog.enums[{}]", i);
            let enum_type = match (entry.values.is_empty(), entry.ordinals.is_empty()) {
                (false, true) => EnumType::sequential(&entry.name, entry.values.iter().cloned()),
                (true, false) => EnumType::new(
                    &entry.name,
                    entry.ordinals.iter().map(|v| (v.value, v.name.clone())),
                ),
                _ => {
                    return Err(ConfigError::validation(
                        field,
                        format!("enum '{}' needs exactly one of values or ordinals", entry.name),
                    ))
                }
            };

            let declared = entry.values.len() + entry.ordinals.len();
            let distinct_names = {
                let mut names: Vec<&str> = enum_type.values().map(|(_, n)| n).collect();
                names.sort_unstable();
                names.dedup();
                names.len()
            };
            if enum_type.values().count() != declared || distinct_names != declared {
                return Err(ConfigError::validation(
                    field,
                    format!("enum '{}' repeats an ordinal or a name", entry.name),
                ));
            }

            dictionary.add_enum(self.namespace(&entry.namespace), enum_type);
        }

        for entry in &self.structures {
            dictionary.add_structure(StructureType::new(
                &entry.name,
                self.namespace(&entry.namespace),
                entry.fields.clone(),
            ));
        }

        Ok(dictionary)
    }

    /// Converts the configured commands.
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands
            .iter()
            .map(|entry| CommandSpec {
                name: entry.name.clone(),
                object_path: entry.path.clone(),
                method_name: entry.method.clone(),
                inputs: entry.inputs.clone(),
                output: OutputSchema {
                    namespace_uri: self.namespace(&entry.namespace).to_string(),
                    header: entry.header.clone().unwrap_or_default(),
                    variant: entry.result.clone(),
                },
                description: entry.description.clone(),
            })
            .collect()
    }

    /// Builds the command catalog for this section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Catalog`] if the resulting catalog does not
    /// validate, or a validation error from [`Self::dictionary`].
    pub fn build(&self) -> ConfigResult<MethodCatalog> {
        let catalog = match self.mode {
            CatalogMode::Builtin => {
                if self.has_entries() {
                    tracing::warn!(
                        commands = self.commands.len(),
                        "Catalog entries are ignored in builtin mode"
                    );
                }
                MethodCatalog::builtin()
            }
            CatalogMode::Replace => {
                let mut dictionary = MethodCatalog::builtin_dictionary();
                dictionary.merge(&self.dictionary()?);
                MethodCatalog::new(self.commands(), dictionary)?
            }
            CatalogMode::Extend => MethodCatalog::builtin().extend(self.commands(), &self.dictionary()?)?,
        };

        tracing::debug!(
            mode = self.mode.as_str(),
            commands = catalog.len(),
            types = catalog.dictionary().len(),
            "Command catalog built"
        );
        Ok(catalog)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use opcmd_core::error::CatalogError;
    use opcmd_core::schema::{FieldType, VariantKind};
    use opcmd_core::WireType;

    fn pump_section(mode: CatalogMode) -> CatalogConfig {
        CatalogConfig {
            mode,
            namespace_uri: Some("urn:lab:pump".to_string()),
            enums: vec![
                EnumConfig {
                    namespace: None,
                    name: "MethodResultEnum".to_string(),
                    values: vec!["Success".into(), "Failure".into()],
                    ordinals: vec![],
                },
                EnumConfig {
                    namespace: None,
                    name: "ErrorLevelEnum".to_string(),
                    values: vec!["NoError".into(), "Warning".into()],
                    ordinals: vec![],
                },
                EnumConfig {
                    namespace: None,
                    name: "PumpStateEnum".to_string(),
                    values: vec![],
                    ordinals: vec![
                        EnumValueConfig { value: 0, name: "Idle".into() },
                        EnumValueConfig { value: 5, name: "Running".into() },
                    ],
                },
            ],
            structures: vec![],
            commands: vec![CommandConfig {
                name: "GetPumpState".to_string(),
                path: vec!["PumpObject".into(), "Methods".into()],
                method: None,
                namespace: None,
                inputs: vec![ArgumentSpec::new("channel", WireType::UInt16)],
                header: None,
                result: Some(VariantSchema::new(
                    VariantKind::Fields,
                    vec![FieldSchema::new("State", FieldType::Enum("PumpStateEnum".into()))],
                )),
                description: None,
            }],
        }
    }

    #[test]
    fn test_builtin_mode_ignores_entries() {
        let catalog = pump_section(CatalogMode::Builtin).build().unwrap();
        assert_eq!(catalog.len(), MethodCatalog::builtin().len());
        assert!(!catalog.contains("GetPumpState"));
    }

    #[test]
    fn test_extend_mode_adds_commands() {
        let catalog = pump_section(CatalogMode::Extend).build().unwrap();
        assert_eq!(catalog.len(), MethodCatalog::builtin().len() + 1);
        let pump = catalog.lookup("GetPumpState").unwrap();
        assert_eq!(pump.output.namespace_uri, "urn:lab:pump");
        assert_eq!(pump.parent_path(), "PumpObject/Methods");
    }

    #[test]
    fn test_replace_mode_uses_only_configured_commands() {
        let catalog = pump_section(CatalogMode::Replace).build().unwrap();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["GetPumpState"]);
        assert!(catalog.lookup("RequestLock").is_err());
    }

    #[test]
    fn test_explicit_ordinals() {
        let dictionary = pump_section(CatalogMode::Extend).dictionary().unwrap();
        let state = dictionary.enum_type("urn:lab:pump", "PumpStateEnum").unwrap();
        assert_eq!(state.name_of(5), Some("Running"));
        assert_eq!(state.name_of(1), None);
    }

    #[test]
    fn test_enum_needs_one_value_form() {
        let mut section = pump_section(CatalogMode::Extend);
        section.enums[2].values = vec!["Idle".into()];
        assert!(matches!(section.dictionary(), Err(ConfigError::Validation { .. })));

        section.enums[2].values.clear();
        section.enums[2].ordinals[1].value = 0;
        assert!(matches!(section.dictionary(), Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut section = pump_section(CatalogMode::Extend);
        section.enums.remove(2);
        let error = section.build().unwrap_err();
        assert!(matches!(error, ConfigError::Catalog(CatalogError::UnknownType { .. })));
    }

    #[test]
    fn test_duplicate_builtin_name_rejected() {
        let mut section = pump_section(CatalogMode::Extend);
        section.commands[0].name = "RequestLock".to_string();
        let error = section.build().unwrap_err();
        assert!(matches!(error, ConfigError::Catalog(CatalogError::DuplicateCommand { .. })));
    }
}
