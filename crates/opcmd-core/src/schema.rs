// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Output schemas and the type dictionary the decoder consults.
//!
//! An [`OutputSchema`] names the namespace whose type definitions govern a
//! result, the enumerations used by the common header and, optionally, the
//! variant tail layout. Enumerations and structures are looked up in the
//! [`TypeDictionary`] by `(namespace URI, type name)`.
//!
//! Field types have a compact text form used by configuration files:
//!
//! | text                  | meaning                               |
//! |-----------------------|---------------------------------------|
//! | `uint64`, `string`... | scalar                                |
//! | `enum:LockStateEnum`  | enumeration from the dictionary       |
//! | `struct:SampleResult` | structure from the dictionary         |
//! | `<type>[]`            | count-prefixed sequence of `<type>`   |

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::{EnumEncoding, ScopeStack};
use crate::error::CatalogError;

// =============================================================================
// FieldType
// =============================================================================

/// Wire layout of one decoded field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldType {
    /// Boolean.
    Boolean,
    /// Signed 8-bit integer.
    SByte,
    /// Unsigned 8-bit integer.
    Byte,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Length-prefixed UTF-8 string.
    String,
    /// Timestamp.
    DateTime,
    /// GUID.
    Guid,
    /// Length-prefixed bytes.
    ByteString,
    /// Enumeration resolved in the active namespace scope.
    Enum(String),
    /// Structure resolved in the active namespace scope.
    Structure(String),
    /// Count-prefixed sequence.
    Sequence(Box<FieldType>),
}

impl FieldType {
    /// Smallest number of bytes one value of this type occupies.
    ///
    /// Used to reject sequence counts that cannot fit in the remaining
    /// buffer before allocating. Structures are required to declare at least
    /// one field, so they occupy at least one byte.
    pub fn min_encoded_len(&self, enums: EnumEncoding) -> usize {
        match self {
            Self::Boolean | Self::SByte | Self::Byte | Self::Structure(_) => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float => 4,
            Self::Int64 | Self::UInt64 | Self::Double | Self::DateTime => 8,
            Self::String | Self::ByteString | Self::Sequence(_) => 4,
            Self::Guid => 16,
            Self::Enum(_) => enums.width(),
        }
    }

    /// Returns the element type of a sequence of structures.
    pub fn as_structure_sequence(&self) -> Option<&str> {
        match self {
            Self::Sequence(element) => match element.as_ref() {
                Self::Structure(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::SByte => write!(f, "sbyte"),
            Self::Byte => write!(f, "byte"),
            Self::Int16 => write!(f, "int16"),
            Self::UInt16 => write!(f, "uint16"),
            Self::Int32 => write!(f, "int32"),
            Self::UInt32 => write!(f, "uint32"),
            Self::Int64 => write!(f, "int64"),
            Self::UInt64 => write!(f, "uint64"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::String => write!(f, "string"),
            Self::DateTime => write!(f, "date_time"),
            Self::Guid => write!(f, "guid"),
            Self::ByteString => write!(f, "byte_string"),
            Self::Enum(name) => write!(f, "enum:{}", name),
            Self::Structure(name) => write!(f, "struct:{}", name),
            Self::Sequence(element) => write!(f, "{}[]", element),
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(element) = s.strip_suffix("[]") {
            return Ok(Self::Sequence(Box::new(element.parse()?)));
        }
        if let Some(name) = s.strip_prefix("enum:") {
            return non_empty(name, s).map(Self::Enum);
        }
        if let Some(name) = s.strip_prefix("struct:") {
            return non_empty(name, s).map(Self::Structure);
        }

        let field_type = match s.to_ascii_lowercase().replace('_', "").as_str() {
            "boolean" | "bool" => Self::Boolean,
            "sbyte" => Self::SByte,
            "byte" => Self::Byte,
            "int16" => Self::Int16,
            "uint16" => Self::UInt16,
            "int32" => Self::Int32,
            "uint32" => Self::UInt32,
            "int64" => Self::Int64,
            "uint64" => Self::UInt64,
            "float" => Self::Float,
            "double" => Self::Double,
            "string" => Self::String,
            "datetime" => Self::DateTime,
            "guid" => Self::Guid,
            "bytestring" => Self::ByteString,
            _ => return Err(format!("unknown field type '{}'", s)),
        };
        Ok(field_type)
    }
}

fn non_empty(name: &str, original: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        Err(format!("missing type name in '{}'", original))
    } else {
        Ok(name.to_string())
    }
}

impl TryFrom<String> for FieldType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.to_string()
    }
}

/// A named field in a structure or variant tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field name.
    pub name: String,
    /// Field layout.
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldSchema {
    /// Creates a field schema.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

// =============================================================================
// Type Dictionary
// =============================================================================

/// Ordinal to name table for one enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    /// Type name.
    pub name: String,
    values: BTreeMap<i32, String>,
}

impl EnumType {
    /// Creates an enumeration from explicit `(ordinal, name)` pairs.
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (i32, S)>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }

    /// Creates an enumeration whose ordinals are the positions of `names`.
    pub fn sequential<I, S>(name: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, (0..).zip(names))
    }

    /// Symbolic name of an ordinal.
    pub fn name_of(&self, ordinal: i32) -> Option<&str> {
        self.values.get(&ordinal).map(String::as_str)
    }

    /// Ordinal of a symbolic name.
    pub fn ordinal_of(&self, name: &str) -> Option<i32> {
        self.values
            .iter()
            .find(|(_, v)| v.as_str() == name)
            .map(|(k, _)| *k)
    }

    /// Iterates `(ordinal, name)` pairs in ordinal order.
    pub fn values(&self) -> impl Iterator<Item = (i32, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Field layout of one structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureType {
    /// Type name.
    pub name: String,
    /// Namespace the structure's own field types are resolved in.
    pub namespace_uri: String,
    /// Fields in wire order.
    pub fields: Vec<FieldSchema>,
}

impl StructureType {
    /// Creates a structure type.
    pub fn new(
        name: impl Into<String>,
        namespace_uri: impl Into<String>,
        fields: Vec<FieldSchema>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace_uri: namespace_uri.into(),
            fields,
        }
    }
}

/// Enumerations and structures keyed by namespace URI and type name.
#[derive(Debug, Clone, Default)]
pub struct TypeDictionary {
    enums: HashMap<String, HashMap<String, EnumType>>,
    structures: HashMap<String, HashMap<String, StructureType>>,
}

impl TypeDictionary {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an enumeration.
    pub fn add_enum(&mut self, namespace_uri: impl Into<String>, enum_type: EnumType) {
        self.enums
            .entry(namespace_uri.into())
            .or_default()
            .insert(enum_type.name.clone(), enum_type);
    }

    /// Adds or replaces a structure.
    pub fn add_structure(&mut self, structure: StructureType) {
        self.structures
            .entry(structure.namespace_uri.clone())
            .or_default()
            .insert(structure.name.clone(), structure);
    }

    /// Builder form of [`Self::add_enum`].
    pub fn with_enum(mut self, namespace_uri: impl Into<String>, enum_type: EnumType) -> Self {
        self.add_enum(namespace_uri, enum_type);
        self
    }

    /// Builder form of [`Self::add_structure`].
    pub fn with_structure(mut self, structure: StructureType) -> Self {
        self.add_structure(structure);
        self
    }

    /// Copies every definition of `other` into this dictionary.
    pub fn merge(&mut self, other: &TypeDictionary) {
        for (ns, types) in &other.enums {
            for enum_type in types.values() {
                self.add_enum(ns.clone(), enum_type.clone());
            }
        }
        for types in other.structures.values() {
            for structure in types.values() {
                self.add_structure(structure.clone());
            }
        }
    }

    /// Looks up an enumeration in one namespace.
    pub fn enum_type(&self, namespace_uri: &str, name: &str) -> Option<&EnumType> {
        self.enums.get(namespace_uri)?.get(name)
    }

    /// Looks up a structure in one namespace.
    pub fn structure(&self, namespace_uri: &str, name: &str) -> Option<&StructureType> {
        self.structures.get(namespace_uri)?.get(name)
    }

    /// Resolves an enumeration in the innermost scope that defines it.
    pub fn find_enum(&self, scopes: &ScopeStack, name: &str) -> Option<&EnumType> {
        scopes
            .innermost_first()
            .find_map(|ns| self.enum_type(ns, name))
    }

    /// Resolves a structure in the innermost scope that defines it.
    pub fn find_structure(&self, scopes: &ScopeStack, name: &str) -> Option<&StructureType> {
        scopes
            .innermost_first()
            .find_map(|ns| self.structure(ns, name))
    }

    /// Number of enumerations and structures defined.
    pub fn len(&self) -> usize {
        self.enums.values().map(HashMap::len).sum::<usize>()
            + self.structures.values().map(HashMap::len).sum::<usize>()
    }

    /// Returns `true` if nothing is defined.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks that every type referenced by `field_type` is defined when
    /// resolved from `scopes`.
    pub fn check_field(
        &self,
        command: &str,
        scopes: &mut ScopeStack,
        field_type: &FieldType,
    ) -> Result<(), CatalogError> {
        let missing = |scopes: &ScopeStack, name: &str| {
            CatalogError::unknown_type(scopes.current().unwrap_or_default(), name)
        };

        match field_type {
            FieldType::Enum(name) => {
                self.find_enum(scopes, name).ok_or_else(|| missing(scopes, name))?;
            }
            FieldType::Structure(name) => {
                let structure = self
                    .find_structure(scopes, name)
                    .ok_or_else(|| missing(scopes, name))?;
                if structure.fields.is_empty() {
                    return Err(CatalogError::invalid_definition(
                        command,
                        format!("structure '{}' declares no fields", name),
                    ));
                }
                let mut inner = scopes.enter(structure.namespace_uri.clone());
                for field in &structure.fields {
                    if field.field_type == FieldType::Structure(name.clone()) {
                        return Err(CatalogError::invalid_definition(
                            command,
                            format!("structure '{}' contains itself", name),
                        ));
                    }
                    self.check_field(command, &mut inner, &field.field_type)?;
                }
            }
            FieldType::Sequence(element) => self.check_field(command, scopes, element)?,
            _ => {}
        }
        Ok(())
    }
}

// =============================================================================
// Output Schema
// =============================================================================

/// Result families with a dedicated typed tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    /// One enumerated lock state.
    LockState,
    /// Five UInt64 disk-space metrics.
    DiskSpace,
    /// One export id string.
    ExportData,
    /// One byte string holding a configuration file.
    ConfigFile,
    /// Sequence of sample result records.
    SampleResults,
    /// Sequence of quality control records.
    QualityControls,
    /// Arbitrary declared fields.
    Fields,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LockState => "lock_state",
            Self::DiskSpace => "disk_space",
            Self::ExportData => "export_data",
            Self::ConfigFile => "config_file",
            Self::SampleResults => "sample_results",
            Self::QualityControls => "quality_controls",
            Self::Fields => "fields",
        };
        write!(f, "{}", name)
    }
}

/// Layout of the fields following the common header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSchema {
    /// Result family the fields are projected onto.
    pub kind: VariantKind,
    /// Fields in wire order.
    pub fields: Vec<FieldSchema>,
}

impl VariantSchema {
    /// Creates a variant schema.
    pub fn new(kind: VariantKind, fields: Vec<FieldSchema>) -> Self {
        Self { kind, fields }
    }

    /// Checks that the declared fields fit the result family.
    pub fn validate_shape(&self, command: &str) -> Result<(), CatalogError> {
        let types: Vec<&FieldType> = self.fields.iter().map(|f| &f.field_type).collect();
        let shape_ok = match self.kind {
            VariantKind::LockState => matches!(types.as_slice(), [FieldType::Enum(_)]),
            VariantKind::DiskSpace => {
                types.len() == 5 && types.iter().all(|t| **t == FieldType::UInt64)
            }
            VariantKind::ExportData => matches!(types.as_slice(), [FieldType::String]),
            VariantKind::ConfigFile => matches!(types.as_slice(), [FieldType::ByteString]),
            VariantKind::SampleResults | VariantKind::QualityControls => {
                types.len() == 1 && types[0].as_structure_sequence().is_some()
            }
            VariantKind::Fields => true,
        };

        if shape_ok {
            Ok(())
        } else {
            let expected = match self.kind {
                VariantKind::LockState => "one enumeration field",
                VariantKind::DiskSpace => "five uint64 fields",
                VariantKind::ExportData => "one string field",
                VariantKind::ConfigFile => "one byte_string field",
                VariantKind::SampleResults | VariantKind::QualityControls => {
                    "one sequence of structures"
                }
                VariantKind::Fields => "any fields",
            };
            Err(CatalogError::invalid_shape(
                command,
                self.kind,
                format!("expected {}", expected),
            ))
        }
    }
}

/// Enumeration types used by the common header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderSchema {
    /// Enumeration of the `methodResult` field.
    pub method_result_type: String,
    /// Enumeration of the `errorLevel` field.
    pub error_level_type: String,
}

impl Default for HeaderSchema {
    fn default() -> Self {
        Self {
            method_result_type: "MethodResultEnum".to_string(),
            error_level_type: "ErrorLevelEnum".to_string(),
        }
    }
}

/// How to decode the first output argument of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Namespace pushed while decoding.
    pub namespace_uri: String,
    /// Header enumerations.
    #[serde(default)]
    pub header: HeaderSchema,
    /// Tail layout; `None` for header-only results.
    #[serde(default)]
    pub variant: Option<VariantSchema>,
}

impl OutputSchema {
    /// Creates a header-only schema.
    pub fn header_only(namespace_uri: impl Into<String>) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            header: HeaderSchema::default(),
            variant: None,
        }
    }

    /// Adds a variant tail.
    pub fn with_variant(mut self, kind: VariantKind, fields: Vec<FieldSchema>) -> Self {
        self.variant = Some(VariantSchema::new(kind, fields));
        self
    }

    /// Returns the variant kind, if any.
    pub fn variant_kind(&self) -> Option<VariantKind> {
        self.variant.as_ref().map(|v| v.kind)
    }

    /// Checks the variant shape and that every referenced type is defined.
    pub fn validate(&self, command: &str, dictionary: &TypeDictionary) -> Result<(), CatalogError> {
        let mut scopes = ScopeStack::new();
        let mut scope = scopes.enter(self.namespace_uri.clone());

        for header_enum in [&self.header.method_result_type, &self.header.error_level_type] {
            dictionary.check_field(command, &mut scope, &FieldType::Enum(header_enum.clone()))?;
        }

        if let Some(variant) = &self.variant {
            variant.validate_shape(command)?;
            for field in &variant.fields {
                dictionary.check_field(command, &mut scope, &field.field_type)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://example.com/instrument/";

    fn dictionary() -> TypeDictionary {
        TypeDictionary::new()
            .with_enum(NS, EnumType::sequential("MethodResultEnum", ["Success", "Failure"]))
            .with_enum(NS, EnumType::sequential("ErrorLevelEnum", ["NoError", "Warning"]))
            .with_structure(StructureType::new(
                "Sample",
                NS,
                vec![FieldSchema::new("id", FieldType::Guid)],
            ))
    }

    #[test]
    fn test_field_type_text_forms() {
        for text in ["uint64", "enum:LockStateEnum", "struct:SampleResult[]", "string[][]"] {
            let parsed: FieldType = text.parse().unwrap();
            assert_eq!(parsed.to_string(), text);
        }
        assert_eq!("ByteString".parse::<FieldType>().unwrap(), FieldType::ByteString);
        assert!("enum:".parse::<FieldType>().is_err());
        assert!("decimal".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_enum_type_lookup() {
        let lock = EnumType::sequential("LockStateEnum", ["Unknown", "Unlocked", "Locked"]);
        assert_eq!(lock.name_of(2), Some("Locked"));
        assert_eq!(lock.name_of(3), None);
        assert_eq!(lock.ordinal_of("Unlocked"), Some(1));
    }

    #[test]
    fn test_find_enum_prefers_innermost_scope() {
        let dict = TypeDictionary::new()
            .with_enum("urn:outer", EnumType::sequential("Mode", ["A"]))
            .with_enum("urn:inner", EnumType::sequential("Mode", ["B"]));

        let mut scopes = ScopeStack::new();
        let mut outer = scopes.enter("urn:outer");
        assert_eq!(dict.find_enum(&outer, "Mode").unwrap().name_of(0), Some("A"));

        let inner = outer.enter("urn:inner");
        assert_eq!(dict.find_enum(&inner, "Mode").unwrap().name_of(0), Some("B"));
    }

    #[test]
    fn test_disk_space_shape() {
        let fields = (0..5)
            .map(|i| FieldSchema::new(format!("f{}", i), FieldType::UInt64))
            .collect::<Vec<_>>();
        assert!(VariantSchema::new(VariantKind::DiskSpace, fields.clone())
            .validate_shape("GetAvailableDiskSpace")
            .is_ok());

        let short = fields[..4].to_vec();
        assert!(matches!(
            VariantSchema::new(VariantKind::DiskSpace, short).validate_shape("GetAvailableDiskSpace"),
            Err(CatalogError::InvalidVariantShape { .. })
        ));
    }

    #[test]
    fn test_output_schema_validate_unknown_type() {
        let schema = OutputSchema::header_only(NS).with_variant(
            VariantKind::LockState,
            vec![FieldSchema::new("lockState", FieldType::Enum("LockStateEnum".into()))],
        );
        assert!(matches!(
            schema.validate("RequestLock", &dictionary()),
            Err(CatalogError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_output_schema_validate_structures() {
        let schema = OutputSchema::header_only(NS).with_variant(
            VariantKind::SampleResults,
            vec![FieldSchema::new(
                "sampleResults",
                FieldType::Sequence(Box::new(FieldType::Structure("Sample".into()))),
            )],
        );
        assert!(schema.validate("GetSampleResults", &dictionary()).is_ok());
    }
}
