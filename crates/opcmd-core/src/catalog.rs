// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command catalog.
//!
//! The catalog maps a command's display name to:
//!
//! - the path of object names leading to the method's parent object,
//! - the method's display name under that parent,
//! - the ordered input arguments and their wire types,
//! - the output schema used to decode the result.
//!
//! It also owns the [`TypeDictionary`] of enumerations and structures the
//! output schemas refer to. A catalog is validated when it is built and is
//! read-only afterwards.
//!
//! # Builtin Commands
//!
//! ```text
//! Objects
//! └── ViCellBluStateObject
//!     ├── Methods        RequestLock, ReleaseLock, GetSampleResults, ...
//!     └── PlayControl    Pause, Resume, Stop, EjectStage, StartSample, StartSampleSet
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::schema::{
    EnumType, FieldSchema, FieldType, OutputSchema, StructureType, TypeDictionary, VariantKind,
};
use crate::types::WireType;

/// Namespace URI of the instrument's data types.
pub const INSTRUMENT_NAMESPACE: &str = "http://www.beckman.com/ViCellBlu/";

/// Browse name of the instrument's top-level object.
pub const STATE_OBJECT: &str = "ViCellBluStateObject";

/// Object holding the instrument's general methods.
pub const METHODS_OBJECT: &str = "Methods";

/// Object holding the run-control methods.
pub const PLAY_CONTROL_OBJECT: &str = "PlayControl";

// =============================================================================
// Command Specs
// =============================================================================

/// One declared input argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    /// Argument name, used in error messages and help output.
    pub name: String,
    /// Wire type the argument must carry.
    #[serde(rename = "type")]
    pub wire_type: WireType,
}

impl ArgumentSpec {
    /// Creates an argument spec.
    pub fn new(name: impl Into<String>, wire_type: WireType) -> Self {
        Self {
            name: name.into(),
            wire_type,
        }
    }
}

/// Everything needed to resolve, invoke and decode one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Command display name.
    pub name: String,
    /// Names leading from the Objects folder to the parent object.
    pub object_path: Vec<String>,
    /// Display name of the method node; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
    /// Ordered input arguments.
    #[serde(default)]
    pub inputs: Vec<ArgumentSpec>,
    /// How to decode the first output.
    pub output: OutputSchema,
    /// Short description for listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CommandSpec {
    /// Creates a header-only command in the instrument namespace.
    pub fn new<I, S>(name: impl Into<String>, object_path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            object_path: object_path.into_iter().map(Into::into).collect(),
            method_name: None,
            inputs: Vec::new(),
            output: OutputSchema::header_only(INSTRUMENT_NAMESPACE),
            description: None,
        }
    }

    /// Adds an input argument.
    pub fn with_input(mut self, name: impl Into<String>, wire_type: WireType) -> Self {
        self.inputs.push(ArgumentSpec::new(name, wire_type));
        self
    }

    /// Sets the output schema.
    pub fn with_output(mut self, output: OutputSchema) -> Self {
        self.output = output;
        self
    }

    /// Sets a variant tail on the current output schema.
    pub fn with_variant(mut self, kind: VariantKind, fields: Vec<FieldSchema>) -> Self {
        self.output = self.output.with_variant(kind, fields);
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Display name of the method node.
    pub fn method_name(&self) -> &str {
        self.method_name.as_deref().unwrap_or(&self.name)
    }

    /// Path to the parent object joined with `/`.
    pub fn parent_path(&self) -> String {
        self.object_path.join("/")
    }

    fn validate(&self, dictionary: &TypeDictionary) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::invalid_definition(&self.name, "command name is empty"));
        }
        if self.object_path.is_empty() || self.object_path.iter().any(|n| n.trim().is_empty()) {
            return Err(CatalogError::invalid_definition(
                &self.name,
                "object path must name at least one object and no empty segments",
            ));
        }
        if self.method_name().trim().is_empty() {
            return Err(CatalogError::invalid_definition(&self.name, "method name is empty"));
        }
        self.output.validate(&self.name, dictionary)
    }
}

// =============================================================================
// MethodCatalog
// =============================================================================

/// Validated command table plus the type dictionary its schemas use.
#[derive(Debug, Clone)]
pub struct MethodCatalog {
    commands: Vec<CommandSpec>,
    index: HashMap<String, usize>,
    dictionary: Arc<TypeDictionary>,
}

impl MethodCatalog {
    /// Builds a catalog, rejecting duplicates and unresolvable schemas.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found, in declaration order.
    pub fn new(commands: Vec<CommandSpec>, dictionary: TypeDictionary) -> Result<Self, CatalogError> {
        let catalog = Self::assemble(commands, dictionary)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn assemble(commands: Vec<CommandSpec>, dictionary: TypeDictionary) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(commands.len());
        for (position, command) in commands.iter().enumerate() {
            if index.insert(command.name.clone(), position).is_some() {
                return Err(CatalogError::DuplicateCommand {
                    name: command.name.clone(),
                });
            }
        }
        Ok(Self {
            commands,
            index,
            dictionary: Arc::new(dictionary),
        })
    }

    /// The instrument's command table.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// The instrument's type dictionary.
    pub fn builtin_dictionary() -> TypeDictionary {
        BUILTIN.dictionary.as_ref().clone()
    }

    /// Returns a catalog with `commands` added and `dictionary` merged in.
    ///
    /// Added commands must not reuse an existing name.
    pub fn extend(&self, commands: Vec<CommandSpec>, dictionary: &TypeDictionary) -> Result<Self, CatalogError> {
        let mut merged = self.dictionary.as_ref().clone();
        merged.merge(dictionary);

        let mut all = self.commands.clone();
        all.extend(commands);
        Self::new(all, merged)
    }

    /// Re-checks every command against the dictionary.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for command in &self.commands {
            command.validate(&self.dictionary)?;
        }
        Ok(())
    }

    /// Looks up a command by display name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownCommand`] if the name is not declared.
    pub fn lookup(&self, name: &str) -> Result<&CommandSpec, CatalogError> {
        self.index
            .get(name)
            .map(|&position| &self.commands[position])
            .ok_or_else(|| CatalogError::unknown_command(name))
    }

    /// Returns `true` if the command is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Commands in declaration order.
    pub fn commands(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.iter()
    }

    /// Command names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|c| c.name.as_str())
    }

    /// Shared type dictionary.
    pub fn dictionary(&self) -> Arc<TypeDictionary> {
        Arc::clone(&self.dictionary)
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if no command is declared.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

// =============================================================================
// Builtin Table
// =============================================================================

static BUILTIN: Lazy<MethodCatalog> = Lazy::new(|| {
    let commands = builtin_commands();
    let mut index = HashMap::with_capacity(commands.len());
    for (position, command) in commands.iter().enumerate() {
        index.insert(command.name.clone(), position);
    }
    MethodCatalog {
        commands,
        index,
        dictionary: Arc::new(builtin_types()),
    }
});

fn builtin_types() -> TypeDictionary {
    let ns = INSTRUMENT_NAMESPACE;
    let field = FieldSchema::new;
    let enumeration = |name: &str| FieldType::Enum(name.to_string());

    TypeDictionary::new()
        .with_enum(ns, EnumType::sequential("MethodResultEnum", ["Success", "Failure"]))
        .with_enum(
            ns,
            EnumType::sequential(
                "ErrorLevelEnum",
                ["NoError", "Warning", "Error", "RequiresUserInteraction"],
            ),
        )
        .with_enum(ns, EnumType::sequential("LockStateEnum", ["Unknown", "Unlocked", "Locked"]))
        .with_enum(
            ns,
            EnumType::sequential("DeclusterDegreeEnum", ["None", "Low", "Medium", "High"]),
        )
        .with_enum(
            ns,
            EnumType::sequential(
                "AssayParameterEnum",
                ["Concentration", "Viability", "AverageDiameter"],
            ),
        )
        .with_structure(StructureType::new(
            "SampleResult",
            ns,
            vec![
                field("Uuid", FieldType::Guid),
                field("SampleId", FieldType::String),
                field("CellTypeName", FieldType::String),
                field("AnalysisDateTime", FieldType::DateTime),
                field("TotalCells", FieldType::UInt32),
                field("ViableCells", FieldType::UInt32),
                field("Viability", FieldType::Double),
                field("TotalCellsPerMl", FieldType::Double),
                field("ViableCellsPerMl", FieldType::Double),
            ],
        ))
        .with_structure(StructureType::new(
            "QualityControl",
            ns,
            vec![
                field("QualityControlName", FieldType::String),
                field("CellTypeName", FieldType::String),
                field("AcceptanceLimits", FieldType::Int32),
                field("AssayParameter", enumeration("AssayParameterEnum")),
                field("AssayValue", FieldType::Double),
                field("Comments", FieldType::String),
                field("ExpirationDate", FieldType::DateTime),
                field("LotNumber", FieldType::String),
            ],
        ))
        .with_structure(StructureType::new(
            "CellType",
            ns,
            vec![
                field("CellTypeName", FieldType::String),
                field("ConcentrationAdjustmentFactor", FieldType::Float),
                field("NumAspirationCycles", FieldType::Int32),
                field("DeclusterDegree", enumeration("DeclusterDegreeEnum")),
                field("MaxDiameter", FieldType::Double),
                field("MinDiameter", FieldType::Double),
                field("NumMixingCycles", FieldType::Int32),
                field("NumImages", FieldType::Int32),
                field("CellSharpness", FieldType::Float),
                field("MinCircularity", FieldType::Double),
                field("ViableSpotArea", FieldType::Float),
                field("ViableSpotBrightness", FieldType::Float),
            ],
        ))
}

fn records(type_name: &str) -> FieldType {
    FieldType::Sequence(Box::new(FieldType::Structure(type_name.to_string())))
}

fn builtin_commands() -> Vec<CommandSpec> {
    let methods = [STATE_OBJECT, METHODS_OBJECT];
    let play = [STATE_OBJECT, PLAY_CONTROL_OBJECT];
    let guids = || WireType::Array(Box::new(WireType::Guid));
    let lock_state = || {
        vec![FieldSchema::new(
            "LockState",
            FieldType::Enum("LockStateEnum".to_string()),
        )]
    };

    vec![
        CommandSpec::new("RequestLock", methods)
            .with_variant(VariantKind::LockState, lock_state())
            .with_description("Acquire the instrument lock"),
        CommandSpec::new("ReleaseLock", methods)
            .with_variant(VariantKind::LockState, lock_state())
            .with_description("Release the instrument lock"),
        CommandSpec::new("Pause", play).with_description("Pause the running sample set"),
        CommandSpec::new("Resume", play).with_description("Resume a paused sample set"),
        CommandSpec::new("Stop", play).with_description("Stop the running sample set"),
        CommandSpec::new("EjectStage", play).with_description("Eject the sample stage"),
        CommandSpec::new("StartSample", play)
            .with_input("sampleConfig", WireType::ExtensionObject(None))
            .with_description("Start a single sample"),
        CommandSpec::new("StartSampleSet", play)
            .with_input("sampleSet", WireType::ExtensionObject(None))
            .with_description("Start a sample set"),
        CommandSpec::new("GetSampleResults", methods)
            .with_input("username", WireType::String)
            .with_input("fromDate", WireType::DateTime)
            .with_input("toDate", WireType::DateTime)
            .with_input("filterOn", WireType::Int32)
            .with_input("cellTypeOrQualityControlName", WireType::String)
            .with_input("searchString", WireType::String)
            .with_input("tagSearchString", WireType::String)
            .with_variant(
                VariantKind::SampleResults,
                vec![FieldSchema::new("SampleResults", records("SampleResult"))],
            )
            .with_description("Query stored sample results"),
        CommandSpec::new("DeleteSampleResults", methods)
            .with_input("uuids", guids())
            .with_input("retainResultsAndFirstImage", WireType::Boolean)
            .with_description("Delete sample results by id"),
        CommandSpec::new("StartExport", methods)
            .with_input("uuids", guids())
            .with_variant(
                VariantKind::ExportData,
                vec![FieldSchema::new("ExportDataId", FieldType::String)],
            )
            .with_description("Start exporting sample results"),
        CommandSpec::new("CreateCellType", methods)
            .with_input("cellType", WireType::ExtensionObject(None))
            .with_description("Create a cell type"),
        CommandSpec::new("DeleteCellType", methods)
            .with_input("cellTypeName", WireType::String)
            .with_description("Delete a cell type"),
        CommandSpec::new("CreateQualityControl", methods)
            .with_input("qualityControl", WireType::ExtensionObject(None))
            .with_description("Create a quality control"),
        CommandSpec::new("GetQualityControls", methods)
            .with_variant(
                VariantKind::QualityControls,
                vec![FieldSchema::new("QualityControls", records("QualityControl"))],
            )
            .with_description("List quality controls"),
        CommandSpec::new("ExportConfig", methods)
            .with_variant(
                VariantKind::ConfigFile,
                vec![FieldSchema::new("FileData", FieldType::ByteString)],
            )
            .with_description("Export the instrument configuration"),
        CommandSpec::new("ImportConfig", methods)
            .with_input("fileData", WireType::ByteString)
            .with_description("Import an instrument configuration"),
        CommandSpec::new("GetAvailableDiskSpace", methods)
            .with_variant(
                VariantKind::DiskSpace,
                ["DataBytes", "ExportBytes", "OtherBytes", "TotalFreeBytes", "TotalSizeBytes"]
                    .into_iter()
                    .map(|name| FieldSchema::new(name, FieldType::UInt64))
                    .collect(),
            )
            .with_description("Report disk usage"),
    ]
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_validates() {
        let catalog = MethodCatalog::builtin();
        catalog.validate().unwrap();
        assert_eq!(catalog.len(), 18);
        assert_eq!(catalog.names().next(), Some("RequestLock"));
    }

    #[test]
    fn test_builtin_structures_parse() {
        let dictionary = MethodCatalog::builtin_dictionary();
        for name in ["SampleResult", "QualityControl", "CellType"] {
            let structure = dictionary.structure(INSTRUMENT_NAMESPACE, name).unwrap();
            assert!(structure.fields.len() > 1);
        }
        let qc = dictionary.structure(INSTRUMENT_NAMESPACE, "QualityControl").unwrap();
        assert_eq!(qc.fields[3].field_type, FieldType::Enum("AssayParameterEnum".into()));
    }

    #[test]
    fn test_lookup_unknown_command() {
        let catalog = MethodCatalog::builtin();
        assert!(matches!(
            catalog.lookup("MakeCoffee"),
            Err(CatalogError::UnknownCommand { .. })
        ));
        assert!(!catalog.contains("MakeCoffee"));
    }

    #[test]
    fn test_command_paths() {
        let catalog = MethodCatalog::builtin();
        assert_eq!(catalog.lookup("Pause").unwrap().parent_path(), "ViCellBluStateObject/PlayControl");
        let lookup = catalog.lookup("GetSampleResults").unwrap();
        assert_eq!(lookup.parent_path(), "ViCellBluStateObject/Methods");
        assert_eq!(lookup.inputs.len(), 7);
        assert_eq!(lookup.method_name(), "GetSampleResults");
    }

    #[test]
    fn test_duplicate_command_rejected() {
        let commands = vec![
            CommandSpec::new("Pause", ["A"]),
            CommandSpec::new("Pause", ["B"]),
        ];
        assert!(matches!(
            MethodCatalog::new(commands, MethodCatalog::builtin_dictionary()),
            Err(CatalogError::DuplicateCommand { .. })
        ));
    }

    #[test]
    fn test_extend_rejects_bad_shape() {
        let bad = CommandSpec::new("GetDisk", ["Instrument"]).with_variant(
            VariantKind::DiskSpace,
            vec![FieldSchema::new("Free", FieldType::UInt64)],
        );
        let error = MethodCatalog::builtin()
            .extend(vec![bad], &TypeDictionary::new())
            .unwrap_err();
        assert!(matches!(error, CatalogError::InvalidVariantShape { .. }));
    }

    #[test]
    fn test_extend_with_new_types() {
        let extra = TypeDictionary::new().with_enum(
            "urn:lab:pump",
            EnumType::sequential("PumpStateEnum", ["Idle", "Running"]),
        );
        let command = CommandSpec::new("GetPumpState", ["Pump"]).with_output(
            OutputSchema::header_only("urn:lab:pump").with_variant(
                VariantKind::Fields,
                vec![FieldSchema::new("State", FieldType::Enum("PumpStateEnum".into()))],
            ),
        );

        // Header enums are only defined in the instrument namespace.
        assert!(MethodCatalog::builtin()
            .extend(vec![command.clone()], &extra)
            .is_err());

        let extra = extra
            .with_enum("urn:lab:pump", EnumType::sequential("MethodResultEnum", ["Success", "Failure"]))
            .with_enum("urn:lab:pump", EnumType::sequential("ErrorLevelEnum", ["NoError", "Warning"]));
        let catalog = MethodCatalog::builtin().extend(vec![command], &extra).unwrap();
        assert_eq!(catalog.len(), 19);
    }

    #[test]
    fn test_command_spec_serde() {
        let value = serde_json::json!({
            "name": "GetPumpState",
            "object_path": ["Pump"],
            "inputs": [{ "name": "channel", "type": "int32" }],
            "output": {
                "namespace_uri": INSTRUMENT_NAMESPACE,
                "variant": { "kind": "lock_state", "fields": [{ "name": "State", "type": "enum:LockStateEnum" }] }
            }
        });
        let spec: CommandSpec = serde_json::from_value(value).unwrap();
        assert_eq!(spec.inputs[0].wire_type, WireType::Int32);
        assert_eq!(spec.output.variant_kind(), Some(VariantKind::LockState));
        assert_eq!(spec.method_name(), "GetPumpState");
    }
}
