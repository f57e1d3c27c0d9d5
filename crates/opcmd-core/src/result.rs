// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Decoded command results.
//!
//! Every result starts with a [`CommonHeader`] and continues with a
//! [`VariantTail`] whose shape is chosen by the command's output schema. The
//! tail is a closed enum: adding a result family means adding a variant.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::schema::{FieldSchema, VariantKind, VariantSchema};

fn serialize_base64<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&BASE64.encode(bytes.as_ref()))
}

// =============================================================================
// Header Enumerations
// =============================================================================

/// Outcome reported by the instrument for a method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MethodResult {
    /// The method completed.
    Success,
    /// The method failed.
    Failure,
}

impl MethodResult {
    /// Parses the symbolic name used in enum tables.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Success" => Some(Self::Success),
            "Failure" => Some(Self::Failure),
            _ => None,
        }
    }

    /// Symbolic name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
        }
    }
}

/// Severity reported by the instrument alongside the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorLevel {
    /// No error.
    NoError,
    /// Warning.
    Warning,
    /// Error.
    Error,
    /// An operator has to act on the instrument.
    RequiresUserInteraction,
}

impl ErrorLevel {
    /// Parses the symbolic name used in enum tables.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NoError" => Some(Self::NoError),
            "Warning" => Some(Self::Warning),
            "Error" => Some(Self::Error),
            "RequiresUserInteraction" => Some(Self::RequiresUserInteraction),
            _ => None,
        }
    }

    /// Symbolic name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NoError => "NoError",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::RequiresUserInteraction => "RequiresUserInteraction",
        }
    }
}

/// Instrument lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LockState {
    /// Not reported.
    Unknown,
    /// No client holds the lock.
    Unlocked,
    /// A client holds the lock.
    Locked,
}

impl LockState {
    /// Parses the symbolic name used in enum tables.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Unknown" => Some(Self::Unknown),
            "Unlocked" => Some(Self::Unlocked),
            "Locked" => Some(Self::Locked),
            _ => None,
        }
    }

    /// Symbolic name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Unlocked => "Unlocked",
            Self::Locked => "Locked",
        }
    }
}

macro_rules! display_by_name {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        })*
    };
}

display_by_name!(MethodResult, ErrorLevel, LockState);

// =============================================================================
// CommonHeader
// =============================================================================

/// Fields present at the start of every result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonHeader {
    /// Method outcome.
    pub method_result: MethodResult,
    /// Human readable description, possibly empty.
    pub response_description: String,
    /// Severity.
    pub error_level: ErrorLevel,
}

impl CommonHeader {
    /// Creates a header.
    pub fn new(
        method_result: MethodResult,
        response_description: impl Into<String>,
        error_level: ErrorLevel,
    ) -> Self {
        Self {
            method_result,
            response_description: response_description.into(),
            error_level,
        }
    }

    /// Successful header with no description.
    pub fn success() -> Self {
        Self::new(MethodResult::Success, "", ErrorLevel::NoError)
    }

    /// Returns `true` for `Success` with `NoError`.
    pub fn is_clean_success(&self) -> bool {
        self.method_result == MethodResult::Success && self.error_level == ErrorLevel::NoError
    }
}

/// Header fields read before a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialHeader {
    /// Method outcome, if read.
    pub method_result: Option<MethodResult>,
    /// Description, if read.
    pub response_description: Option<String>,
    /// Severity, if read.
    pub error_level: Option<ErrorLevel>,
}

impl PartialHeader {
    /// Returns the full header if every field was read.
    pub fn complete(&self) -> Option<CommonHeader> {
        Some(CommonHeader {
            method_result: self.method_result?,
            response_description: self.response_description.clone()?,
            error_level: self.error_level?,
        })
    }

    /// Returns `true` if no field was read.
    pub fn is_empty(&self) -> bool {
        self.method_result.is_none()
            && self.response_description.is_none()
            && self.error_level.is_none()
    }
}

// =============================================================================
// Decoded Values
// =============================================================================

/// A value read from a result payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    /// Boolean.
    Boolean(bool),
    /// Signed 8-bit integer.
    SByte(i8),
    /// Unsigned 8-bit integer.
    Byte(u8),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Unsigned 16-bit integer.
    UInt16(u16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 32-bit integer.
    UInt32(u32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 64-bit integer.
    UInt64(u64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// String.
    String(String),
    /// Timestamp.
    DateTime(DateTime<Utc>),
    /// GUID.
    Guid(Uuid),
    /// Byte string.
    ByteString(#[serde(serialize_with = "serialize_base64")] Vec<u8>),
    /// Enumerated value.
    Enum {
        /// Wire ordinal.
        ordinal: i32,
        /// Symbolic name from the enum table.
        name: String,
    },
    /// Nested structure.
    Structure(Record),
    /// Sequence.
    Sequence(Vec<DecodedValue>),
}

impl DecodedValue {
    /// Returns the string if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value if this is a UInt64.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the symbolic name if this is an enumerated value.
    pub fn as_enum_name(&self) -> Option<&str> {
        match self {
            Self::Enum { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{}", v),
            Self::SByte(v) => write!(f, "{}", v),
            Self::Byte(v) => write!(f, "{}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::UInt64(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Guid(v) => write!(f, "{}", v),
            Self::ByteString(v) => write!(f, "<{} bytes>", v.len()),
            Self::Enum { name, .. } => write!(f, "{}", name),
            Self::Structure(record) => write!(f, "{}", record),
            Self::Sequence(items) => write!(f, "[{} items]", items.len()),
        }
    }
}

/// A named decoded field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Field name from the schema.
    pub name: String,
    /// Decoded value.
    pub value: DecodedValue,
}

impl Field {
    /// Creates a field.
    pub fn new(name: impl Into<String>, value: DecodedValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A decoded structure, fields in wire order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Structure type name.
    pub type_name: String,
    /// Fields in wire order.
    pub fields: Vec<Field>,
}

impl Record {
    /// Creates a record.
    pub fn new(type_name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Returns the value of a field by name.
    pub fn get(&self, name: &str) -> Option<&DecodedValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.name, &field.value)?;
        }
        map.end()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.type_name)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {}", field.name, field.value)?;
        }
        write!(f, " }}")
    }
}

// =============================================================================
// VariantTail
// =============================================================================

/// Disk space report, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DiskSpace {
    /// Space used by sample data.
    pub data_bytes: u64,
    /// Space used by exports.
    pub export_bytes: u64,
    /// Space used by everything else.
    pub other_bytes: u64,
    /// Free space.
    pub total_free_bytes: u64,
    /// Volume size.
    pub total_size_bytes: u64,
}

/// Command-specific fields following the header.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VariantTail {
    /// Header-only result.
    None,
    /// Lock state after a lock request or release.
    LockState(LockState),
    /// Disk space metrics.
    DiskSpace(DiskSpace),
    /// Identifier of a started export.
    ExportData {
        /// Export id.
        export_data_id: String,
    },
    /// Exported configuration file contents.
    ConfigFile {
        /// File bytes.
        #[serde(serialize_with = "serialize_base64")]
        file_data: Vec<u8>,
    },
    /// Sample result records.
    SampleResults(Vec<Record>),
    /// Quality control records.
    QualityControls(Vec<Record>),
    /// Declared fields of a generic result.
    Fields(Vec<Field>),
}

impl VariantTail {
    /// Projects decoded fields onto the typed tail for `kind`.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch when the fields do not have the
    /// shape the family requires.
    pub fn from_fields(kind: VariantKind, fields: Vec<Field>) -> Result<Self, String> {
        let mismatch = |expected: &str| format!("{} result expects {}", kind, expected);

        match kind {
            VariantKind::LockState => {
                let name = single(&fields)
                    .and_then(DecodedValue::as_enum_name)
                    .ok_or_else(|| mismatch("one enumeration"))?;
                LockState::from_name(name)
                    .map(Self::LockState)
                    .ok_or_else(|| format!("'{}' is not a lock state", name))
            }
            VariantKind::DiskSpace => {
                let values: Vec<u64> = fields.iter().filter_map(|f| f.value.as_u64()).collect();
                match values.as_slice() {
                    [data, export, other, free, size] if fields.len() == 5 => {
                        Ok(Self::DiskSpace(DiskSpace {
                            data_bytes: *data,
                            export_bytes: *export,
                            other_bytes: *other,
                            total_free_bytes: *free,
                            total_size_bytes: *size,
                        }))
                    }
                    _ => Err(mismatch("five uint64 values")),
                }
            }
            VariantKind::ExportData => single(&fields)
                .and_then(DecodedValue::as_str)
                .map(|id| Self::ExportData {
                    export_data_id: id.to_string(),
                })
                .ok_or_else(|| mismatch("one string")),
            VariantKind::ConfigFile => match into_single(fields) {
                Some(DecodedValue::ByteString(file_data)) => Ok(Self::ConfigFile { file_data }),
                _ => Err(mismatch("one byte string")),
            },
            VariantKind::SampleResults => into_records(fields)
                .map(Self::SampleResults)
                .ok_or_else(|| mismatch("one sequence of records")),
            VariantKind::QualityControls => into_records(fields)
                .map(Self::QualityControls)
                .ok_or_else(|| mismatch("one sequence of records")),
            VariantKind::Fields => Ok(Self::Fields(fields)),
        }
    }

    /// Expands the typed tail back into values matching `schema`, in order.
    ///
    /// Enumerated values carry only their symbolic name; the encoder resolves
    /// the ordinal from the enum table.
    pub fn to_values(&self, schema: Option<&VariantSchema>) -> Result<Vec<DecodedValue>, String> {
        let Some(schema) = schema else {
            return match self {
                Self::None => Ok(Vec::new()),
                _ => Err("schema declares no tail but result has one".to_string()),
            };
        };

        let values = match (self, schema.kind) {
            (Self::LockState(state), VariantKind::LockState) => vec![DecodedValue::Enum {
                ordinal: -1,
                name: state.name().to_string(),
            }],
            (Self::DiskSpace(d), VariantKind::DiskSpace) => vec![
                DecodedValue::UInt64(d.data_bytes),
                DecodedValue::UInt64(d.export_bytes),
                DecodedValue::UInt64(d.other_bytes),
                DecodedValue::UInt64(d.total_free_bytes),
                DecodedValue::UInt64(d.total_size_bytes),
            ],
            (Self::ExportData { export_data_id }, VariantKind::ExportData) => {
                vec![DecodedValue::String(export_data_id.clone())]
            }
            (Self::ConfigFile { file_data }, VariantKind::ConfigFile) => {
                vec![DecodedValue::ByteString(file_data.clone())]
            }
            (Self::SampleResults(records), VariantKind::SampleResults)
            | (Self::QualityControls(records), VariantKind::QualityControls) => {
                vec![DecodedValue::Sequence(
                    records.iter().cloned().map(DecodedValue::Structure).collect(),
                )]
            }
            (Self::Fields(fields), VariantKind::Fields) => {
                check_field_names(fields, &schema.fields)?;
                fields.iter().map(|f| f.value.clone()).collect()
            }
            (tail, kind) => {
                return Err(format!("{} tail does not match {} schema", tail.kind_name(), kind))
            }
        };
        Ok(values)
    }

    /// Short name of the variant.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::LockState(_) => "lock_state",
            Self::DiskSpace(_) => "disk_space",
            Self::ExportData { .. } => "export_data",
            Self::ConfigFile { .. } => "config_file",
            Self::SampleResults(_) => "sample_results",
            Self::QualityControls(_) => "quality_controls",
            Self::Fields(_) => "fields",
        }
    }
}

fn single(fields: &[Field]) -> Option<&DecodedValue> {
    match fields {
        [field] => Some(&field.value),
        _ => None,
    }
}

fn into_single(fields: Vec<Field>) -> Option<DecodedValue> {
    let mut iter = fields.into_iter();
    match (iter.next(), iter.next()) {
        (Some(field), None) => Some(field.value),
        _ => None,
    }
}

fn into_records(fields: Vec<Field>) -> Option<Vec<Record>> {
    match into_single(fields)? {
        DecodedValue::Sequence(items) => items
            .into_iter()
            .map(|item| match item {
                DecodedValue::Structure(record) => Some(record),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

fn check_field_names(fields: &[Field], schema: &[FieldSchema]) -> Result<(), String> {
    if fields.len() != schema.len() {
        return Err(format!(
            "result has {} fields, schema declares {}",
            fields.len(),
            schema.len()
        ));
    }
    for (field, declared) in fields.iter().zip(schema) {
        if field.name != declared.name {
            return Err(format!(
                "field '{}' found where '{}' is declared",
                field.name, declared.name
            ));
        }
    }
    Ok(())
}

// =============================================================================
// DecodedResult
// =============================================================================

/// A fully decoded command result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedResult {
    /// Common header.
    pub header: CommonHeader,
    /// Command-specific tail.
    pub tail: VariantTail,
}

impl DecodedResult {
    /// Creates a result.
    pub fn new(header: CommonHeader, tail: VariantTail) -> Self {
        Self { header, tail }
    }

    /// Creates a header-only result.
    pub fn header_only(header: CommonHeader) -> Self {
        Self::new(header, VariantTail::None)
    }
}

// =============================================================================
// Tests
// =============================================================================
