// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Result payload encoding.
//!
//! The inverse of [`ResultDecoder`](crate::decoder::ResultDecoder). Used by
//! simulated servers and fixtures to produce the exact body a real instrument
//! would send for a given [`DecodedResult`].
//!
//! Enumerated values are written by symbolic name: the ordinal is looked up in
//! the enum table active for the schema namespace, so a `LockState::Locked`
//! tail encodes to whatever ordinal the dictionary assigns to `"Locked"`.

use std::sync::Arc;

use crate::codec::{BinaryWriter, EncodeError, ScopeStack};
use crate::decoder::DecoderOptions;
use crate::result::{DecodedResult, DecodedValue};
use crate::schema::{FieldType, OutputSchema, TypeDictionary};
use crate::types::{ExtensionObject, NodeId, TaggedValue};

/// Encodes results against an [`OutputSchema`].
#[derive(Debug, Clone)]
pub struct ResultEncoder {
    dictionary: Arc<TypeDictionary>,
    options: DecoderOptions,
}

impl ResultEncoder {
    /// Creates an encoder with default wire options.
    pub fn new(dictionary: Arc<TypeDictionary>) -> Self {
        Self::with_options(dictionary, DecoderOptions::default())
    }

    /// Creates an encoder using the same wire options as a decoder.
    pub fn with_options(dictionary: Arc<TypeDictionary>, options: DecoderOptions) -> Self {
        Self {
            dictionary,
            options,
        }
    }

    /// Encodes a result body.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when the tail does not match the schema family,
    /// a value does not match its declared field type, or an enumerated name
    /// is not present in the active enum table.
    pub fn encode(&self, result: &DecodedResult, schema: &OutputSchema) -> Result<Vec<u8>, EncodeError> {
        let mut scopes = ScopeStack::new();
        let mut scope = scopes.enter(schema.namespace_uri.clone());
        let mut writer = BinaryWriter::new();

        let header = &result.header;
        self.write_enum_name(
            &mut writer,
            &scope,
            "methodResult",
            &schema.header.method_result_type,
            header.method_result.name(),
        )?;
        writer.write_string("responseDescription", &header.response_description)?;
        self.write_enum_name(
            &mut writer,
            &scope,
            "errorLevel",
            &schema.header.error_level_type,
            header.error_level.name(),
        )?;

        let values = result
            .tail
            .to_values(schema.variant.as_ref())
            .map_err(|reason| EncodeError::new("variant", reason))?;
        if let Some(variant) = &schema.variant {
            for (field, value) in variant.fields.iter().zip(&values) {
                self.write_value(&mut writer, &mut scope, &field.name, &field.field_type, value)?;
            }
        }

        Ok(writer.into_bytes())
    }

    /// Encodes a result and wraps it in a binary-bodied extension object.
    pub fn encode_envelope(
        &self,
        result: &DecodedResult,
        schema: &OutputSchema,
        type_id: NodeId,
    ) -> Result<TaggedValue, EncodeError> {
        let body = self.encode(result, schema)?;
        Ok(TaggedValue::ExtensionObject(ExtensionObject::binary(type_id, body)))
    }

    fn write_enum_name(
        &self,
        writer: &mut BinaryWriter,
        scopes: &ScopeStack,
        field: &str,
        type_name: &str,
        name: &str,
    ) -> Result<(), EncodeError> {
        let table = self
            .dictionary
            .find_enum(scopes, type_name)
            .ok_or_else(|| EncodeError::new(field, format!("enumeration '{}' is not defined", type_name)))?;
        let ordinal = table.ordinal_of(name).ok_or_else(|| {
            EncodeError::new(field, format!("'{}' is not a value of {}", name, type_name))
        })?;
        writer.write_enum(field, self.options.enum_encoding, ordinal)
    }

    fn write_value(
        &self,
        writer: &mut BinaryWriter,
        scopes: &mut ScopeStack,
        path: &str,
        field_type: &FieldType,
        value: &DecodedValue,
    ) -> Result<(), EncodeError> {
        match (field_type, value) {
            (FieldType::Boolean, DecodedValue::Boolean(v)) => writer.write_bool(*v),
            (FieldType::SByte, DecodedValue::SByte(v)) => writer.write_i8(*v),
            (FieldType::Byte, DecodedValue::Byte(v)) => writer.write_u8(*v),
            (FieldType::Int16, DecodedValue::Int16(v)) => writer.write_i16(*v),
            (FieldType::UInt16, DecodedValue::UInt16(v)) => writer.write_u16(*v),
            (FieldType::Int32, DecodedValue::Int32(v)) => writer.write_i32(*v),
            (FieldType::UInt32, DecodedValue::UInt32(v)) => writer.write_u32(*v),
            (FieldType::Int64, DecodedValue::Int64(v)) => writer.write_i64(*v),
            (FieldType::UInt64, DecodedValue::UInt64(v)) => writer.write_u64(*v),
            (FieldType::Float, DecodedValue::Float(v)) => writer.write_f32(*v),
            (FieldType::Double, DecodedValue::Double(v)) => writer.write_f64(*v),
            (FieldType::String, DecodedValue::String(v)) => writer.write_string(path, v)?,
            (FieldType::DateTime, DecodedValue::DateTime(v)) => writer.write_date_time(path, v)?,
            (FieldType::Guid, DecodedValue::Guid(v)) => writer.write_guid(v),
            (FieldType::ByteString, DecodedValue::ByteString(v)) => {
                writer.write_byte_string(path, v)?
            }
            (FieldType::Enum(type_name), DecodedValue::Enum { name, .. }) => {
                self.write_enum_name(writer, scopes, path, type_name, name)?
            }
            (FieldType::Structure(type_name), DecodedValue::Structure(record)) => {
                let structure = self
                    .dictionary
                    .find_structure(scopes, type_name)
                    .ok_or_else(|| {
                        EncodeError::new(path, format!("structure '{}' is not defined", type_name))
                    })?;
                if record.fields.len() != structure.fields.len() {
                    return Err(EncodeError::new(
                        path,
                        format!(
                            "record has {} fields, {} declares {}",
                            record.fields.len(),
                            type_name,
                            structure.fields.len()
                        ),
                    ));
                }
                let mut inner = scopes.enter(structure.namespace_uri.clone());
                for (declared, field) in structure.fields.iter().zip(&record.fields) {
                    let child = format!("{}.{}", path, declared.name);
                    self.write_value(writer, &mut inner, &child, &declared.field_type, &field.value)?;
                }
            }
            (FieldType::Sequence(element), DecodedValue::Sequence(items)) => {
                writer.write_length(path, items.len())?;
                for (index, item) in items.iter().enumerate() {
                    let child = format!("{}[{}]", path, index);
                    self.write_value(writer, scopes, &child, element, item)?;
                }
            }
            (expected, actual) => {
                return Err(EncodeError::new(
                    path,
                    format!("expected {}, got value {}", expected, actual),
                ))
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
    use crate::catalog::MethodCatalog;
    use crate::decoder::ResultDecoder;
    use crate::result::{CommonHeader, DiskSpace, ErrorLevel, LockState, MethodResult, VariantTail};

    fn roundtrip(command: &str, result: DecodedResult) -> DecodedResult {
        let catalog = MethodCatalog::builtin();
        let schema = &catalog.lookup(command).unwrap().output;
        let bytes = ResultEncoder::new(catalog.dictionary())
            .encode(&result, schema)
            .unwrap();
        ResultDecoder::new(catalog.dictionary())
            .decode_body(&bytes, schema)
            .unwrap()
    }

    #[test]
    fn test_lock_state_bytes() {
        let catalog = MethodCatalog::builtin();
        let schema = &catalog.lookup("RequestLock").unwrap().output;
        let result = DecodedResult::new(CommonHeader::success(), VariantTail::LockState(LockState::Locked));

        let bytes = ResultEncoder::new(catalog.dictionary()).encode(&result, schema).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 2]);
    }

    #[test]
    fn test_header_and_disk_space_roundtrip() {
        let result = DecodedResult::new(
            CommonHeader::new(MethodResult::Failure, "disk almost full", ErrorLevel::Warning),
            VariantTail::DiskSpace(DiskSpace {
                data_bytes: 1 << 40,
                export_bytes: 0,
                other_bytes: 17,
                total_free_bytes: 0,
                total_size_bytes: u64::MAX,
            }),
        );
        assert_eq!(roundtrip("GetAvailableDiskSpace", result.clone()), result);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let result = DecodedResult::new(
            CommonHeader::success(),
            VariantTail::ConfigFile {
                file_data: vec![0x50, 0x4B, 0x03, 0x04, 0x00],
            },
        );
        assert_eq!(roundtrip("ExportConfig", result.clone()), result);
    }

    #[test]
    fn test_tail_must_match_schema_family() {
        let catalog = MethodCatalog::builtin();
        let schema = catalog.lookup("RequestLock").unwrap().output.clone();
        let result = DecodedResult::new(CommonHeader::success(), VariantTail::None);

        let error = ResultEncoder::new(catalog.dictionary())
            .encode(&result, &schema)
            .unwrap_err();
        assert_eq!(error.field, "variant");
    }
}
