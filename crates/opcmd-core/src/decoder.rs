// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Result payload decoding.
//!
//! A call returns its result as an extension object with a binary body. The
//! body holds a common header followed by a command-specific tail:
//!
//! ```text
//! ┌──────────────┬─────────────────────────┬────────────┬──────────────────┐
//! │ methodResult │ responseDescription     │ errorLevel │ variant tail ... │
//! │ enum         │ Int32 len + UTF-8 bytes │ enum       │ per schema       │
//! └──────────────┴─────────────────────────┴────────────┴──────────────────┘
//! ```
//!
//! Decoding runs through a fixed sequence of stages:
//!
//! ```text
//! Start -> EnvelopeUnwrapped -> ScopeEntered -> HeaderRead -> VariantRead
//!       -> ScopeExited -> Done          (any stage may end in Failed)
//! ```
//!
//! The schema namespace is pushed onto the decoder's own [`ScopeStack`] for
//! the duration of the read and popped on every exit path. Decoding takes
//! `&mut self`, so one decoder cannot be shared by concurrent decodes;
//! construct one decoder per worker instead.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use opcmd_core::catalog::MethodCatalog;
//! use opcmd_core::decoder::ResultDecoder;
//! use opcmd_core::result::{LockState, VariantTail};
//!
//! let catalog = MethodCatalog::builtin();
//! let schema = &catalog.lookup("RequestLock").unwrap().output;
//! let body = [0u8, 0, 0, 0, 0, 0, 2];
//!
//! let mut decoder = ResultDecoder::new(catalog.dictionary());
//! let result = decoder.decode_body(&body, schema).unwrap();
//! assert_eq!(result.tail, VariantTail::LockState(LockState::Locked));
//! assert_eq!(decoder.scope_depth(), 0);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec::{BinaryReader, EnumEncoding, ScopeStack};
use crate::error::{DecodeError, DecodeErrorKind};
use crate::result::{
    CommonHeader, DecodedResult, DecodedValue, ErrorLevel, Field, MethodResult, PartialHeader,
    Record, VariantTail,
};
use crate::schema::{FieldType, HeaderSchema, OutputSchema, TypeDictionary};
use crate::types::{ExtensionBody, TaggedValue};

// =============================================================================
// Options & Stages
// =============================================================================

/// Decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// Wire width of enumerated values.
    pub enum_encoding: EnumEncoding,
    /// Accept bytes left over after the last declared field.
    pub allow_trailing_bytes: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            enum_encoding: EnumEncoding::Byte,
            allow_trailing_bytes: false,
        }
    }
}

/// Stage reached by the most recent decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeStage {
    /// Nothing done yet.
    Start,
    /// Binary body extracted from the envelope.
    EnvelopeUnwrapped,
    /// Schema namespace pushed.
    ScopeEntered,
    /// Common header read.
    HeaderRead,
    /// Variant tail read.
    VariantRead,
    /// Schema namespace popped.
    ScopeExited,
    /// Result assembled.
    Done,
    /// Decode failed; the scope was still exited.
    Failed,
}

// =============================================================================
// ResultDecoder
// =============================================================================

/// Decodes result envelopes against an [`OutputSchema`].
#[derive(Debug, Clone)]
pub struct ResultDecoder {
    dictionary: Arc<TypeDictionary>,
    options: DecoderOptions,
    scopes: ScopeStack,
    stage: DecodeStage,
}

impl ResultDecoder {
    /// Creates a decoder with default options.
    pub fn new(dictionary: Arc<TypeDictionary>) -> Self {
        Self::with_options(dictionary, DecoderOptions::default())
    }

    /// Creates a decoder with explicit options.
    pub fn with_options(dictionary: Arc<TypeDictionary>, options: DecoderOptions) -> Self {
        Self {
            dictionary,
            options,
            scopes: ScopeStack::new(),
            stage: DecodeStage::Start,
        }
    }

    /// Current namespace scope depth. Zero between decodes.
    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    /// Stage reached by the last decode.
    pub fn stage(&self) -> DecodeStage {
        self.stage
    }

    /// Decoder settings.
    pub fn options(&self) -> DecoderOptions {
        self.options
    }

    /// Decodes the raw first output argument of a call.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeErrorKind::MalformedEnvelope`] unless `raw` is an
    /// extension object with a binary body, and any body decoding error
    /// from [`Self::decode_body`].
    pub fn decode(
        &mut self,
        raw: &TaggedValue,
        schema: &OutputSchema,
    ) -> Result<DecodedResult, DecodeError> {
        self.stage = DecodeStage::Start;
        let body = match unwrap_envelope(raw) {
            Ok(body) => body,
            Err(error) => {
                self.stage = DecodeStage::Failed;
                return Err(error);
            }
        };
        self.decode_body(body, schema)
    }

    /// Decodes an already unwrapped binary body.
    pub fn decode_body(
        &mut self,
        body: &[u8],
        schema: &OutputSchema,
    ) -> Result<DecodedResult, DecodeError> {
        self.stage = DecodeStage::EnvelopeUnwrapped;

        let outcome = {
            let mut scope = self.scopes.enter(schema.namespace_uri.clone());
            self.stage = DecodeStage::ScopeEntered;

            let mut cursor = Cursor {
                dictionary: &self.dictionary,
                options: &self.options,
                reader: BinaryReader::new(body),
                partial: PartialHeader::default(),
            };
            cursor.read_result(&mut scope, schema, &mut self.stage)
        };

        match outcome {
            Ok(result) => {
                self.stage = DecodeStage::ScopeExited;
                tracing::trace!(
                    namespace = %schema.namespace_uri,
                    bytes = body.len(),
                    tail = result.tail.kind_name(),
                    "Decoded result"
                );
                self.stage = DecodeStage::Done;
                Ok(result)
            }
            Err(error) => {
                self.stage = DecodeStage::Failed;
                tracing::debug!(
                    namespace = %schema.namespace_uri,
                    offset = error.offset,
                    "Result decode failed: {error}"
                );
                Err(error)
            }
        }
    }
}

/// Extracts the binary body of a result envelope.
pub fn unwrap_envelope(raw: &TaggedValue) -> Result<&[u8], DecodeError> {
    match raw {
        TaggedValue::ExtensionObject(eo) => match &eo.body {
            ExtensionBody::Binary(bytes) => Ok(bytes),
            ExtensionBody::Xml(_) => Err(DecodeError::malformed_envelope(
                "extension object has an XML body, expected binary",
            )),
            ExtensionBody::None => Err(DecodeError::malformed_envelope(
                "extension object has no body",
            )),
        },
        other => Err(DecodeError::malformed_envelope(format!(
            "expected ExtensionObject, got {}",
            other.type_name()
        ))),
    }
}

// =============================================================================
// Cursor
// =============================================================================

struct Cursor<'a> {
    dictionary: &'a TypeDictionary,
    options: &'a DecoderOptions,
    reader: BinaryReader<'a>,
    partial: PartialHeader,
}

impl Cursor<'_> {
    fn fail(&self, kind: DecodeErrorKind, offset: usize, field: &str) -> DecodeError {
        DecodeError::new(kind, offset)
            .with_field(field)
            .with_partial(self.partial.clone())
    }

    fn read_result(
        &mut self,
        scopes: &mut ScopeStack,
        schema: &OutputSchema,
        stage: &mut DecodeStage,
    ) -> Result<DecodedResult, DecodeError> {
        let header = self.read_header(scopes, &schema.header)?;
        *stage = DecodeStage::HeaderRead;

        let tail = match &schema.variant {
            Some(variant) => {
                let mut fields = Vec::with_capacity(variant.fields.len());
                for field in &variant.fields {
                    let value = self.read_field(scopes, &field.name, &field.field_type)?;
                    fields.push(Field::new(field.name.clone(), value));
                }
                let end = self.reader.position();
                VariantTail::from_fields(variant.kind, fields).map_err(|reason| {
                    self.fail(DecodeErrorKind::SchemaMismatch { reason }, end, "variant")
                })?
            }
            None => VariantTail::None,
        };
        *stage = DecodeStage::VariantRead;

        if !self.options.allow_trailing_bytes && !self.reader.is_empty() {
            let offset = self.reader.position();
            return Err(self.fail(
                DecodeErrorKind::TrailingBytes {
                    count: self.reader.remaining(),
                },
                offset,
                "variant",
            ));
        }

        Ok(DecodedResult::new(header, tail))
    }

    fn read_header(
        &mut self,
        scopes: &mut ScopeStack,
        header: &HeaderSchema,
    ) -> Result<CommonHeader, DecodeError> {
        let method_result = self.read_typed_enum(
            scopes,
            "methodResult",
            &header.method_result_type,
            MethodResult::from_name,
        )?;
        self.partial.method_result = Some(method_result);

        let start = self.reader.position();
        let response_description = self
            .reader
            .read_string()
            .map_err(|kind| self.fail(kind, start, "responseDescription"))?;
        self.partial.response_description = Some(response_description.clone());

        let error_level = self.read_typed_enum(
            scopes,
            "errorLevel",
            &header.error_level_type,
            ErrorLevel::from_name,
        )?;
        self.partial.error_level = Some(error_level);

        Ok(CommonHeader {
            method_result,
            response_description,
            error_level,
        })
    }

    fn read_typed_enum<T>(
        &mut self,
        scopes: &ScopeStack,
        field: &str,
        type_name: &str,
        from_name: fn(&str) -> Option<T>,
    ) -> Result<T, DecodeError> {
        let start = self.reader.position();
        let (ordinal, name) = self.read_enum(scopes, field, type_name)?;
        from_name(&name).ok_or_else(|| {
            self.fail(
                DecodeErrorKind::UnknownEnumValue {
                    type_name: type_name.to_string(),
                    ordinal,
                },
                start,
                field,
            )
        })
    }

    fn read_enum(
        &mut self,
        scopes: &ScopeStack,
        field: &str,
        type_name: &str,
    ) -> Result<(i32, String), DecodeError> {
        let start = self.reader.position();
        let ordinal = self
            .reader
            .read_enum(self.options.enum_encoding)
            .map_err(|kind| self.fail(kind, start, field))?;

        let table = self.dictionary.find_enum(scopes, type_name).ok_or_else(|| {
            self.fail(
                DecodeErrorKind::UnknownEnumType {
                    namespace: scopes.current().unwrap_or_default().to_string(),
                    type_name: type_name.to_string(),
                },
                start,
                field,
            )
        })?;

        let name = table.name_of(ordinal).ok_or_else(|| {
            self.fail(
                DecodeErrorKind::UnknownEnumValue {
                    type_name: type_name.to_string(),
                    ordinal,
                },
                start,
                field,
            )
        })?;

        Ok((ordinal, name.to_string()))
    }

    fn read_field(
        &mut self,
        scopes: &mut ScopeStack,
        path: &str,
        field_type: &FieldType,
    ) -> Result<DecodedValue, DecodeError> {
        let start = self.reader.position();
        let reader = &mut self.reader;

        let scalar = match field_type {
            FieldType::Boolean => reader.read_bool().map(DecodedValue::Boolean),
            FieldType::SByte => reader.read_i8().map(DecodedValue::SByte),
            FieldType::Byte => reader.read_u8().map(DecodedValue::Byte),
            FieldType::Int16 => reader.read_i16().map(DecodedValue::Int16),
            FieldType::UInt16 => reader.read_u16().map(DecodedValue::UInt16),
            FieldType::Int32 => reader.read_i32().map(DecodedValue::Int32),
            FieldType::UInt32 => reader.read_u32().map(DecodedValue::UInt32),
            FieldType::Int64 => reader.read_i64().map(DecodedValue::Int64),
            FieldType::UInt64 => reader.read_u64().map(DecodedValue::UInt64),
            FieldType::Float => reader.read_f32().map(DecodedValue::Float),
            FieldType::Double => reader.read_f64().map(DecodedValue::Double),
            FieldType::String => reader.read_string().map(DecodedValue::String),
            FieldType::DateTime => reader.read_date_time().map(DecodedValue::DateTime),
            FieldType::Guid => reader.read_guid().map(DecodedValue::Guid),
            FieldType::ByteString => reader.read_byte_string().map(DecodedValue::ByteString),
            FieldType::Enum(type_name) => {
                let (ordinal, name) = self.read_enum(scopes, path, type_name)?;
                return Ok(DecodedValue::Enum { ordinal, name });
            }
            FieldType::Structure(type_name) => {
                return self.read_structure(scopes, path, type_name);
            }
            FieldType::Sequence(element) => {
                return self.read_sequence(scopes, path, element);
            }
        };

        scalar.map_err(|kind| self.fail(kind, start, path))
    }

    fn read_structure(
        &mut self,
        scopes: &mut ScopeStack,
        path: &str,
        type_name: &str,
    ) -> Result<DecodedValue, DecodeError> {
        let start = self.reader.position();
        let structure = self.dictionary.find_structure(scopes, type_name).ok_or_else(|| {
            self.fail(
                DecodeErrorKind::SchemaMismatch {
                    reason: format!("structure '{}' is not defined", type_name),
                },
                start,
                path,
            )
        })?;

        let mut inner = scopes.enter(structure.namespace_uri.clone());
        let mut fields = Vec::with_capacity(structure.fields.len());
        for field in &structure.fields {
            let child = format!("{}.{}", path, field.name);
            let value = self.read_field(&mut inner, &child, &field.field_type)?;
            fields.push(Field::new(field.name.clone(), value));
        }

        Ok(DecodedValue::Structure(Record::new(type_name, fields)))
    }

    fn read_sequence(
        &mut self,
        scopes: &mut ScopeStack,
        path: &str,
        element: &FieldType,
    ) -> Result<DecodedValue, DecodeError> {
        let start = self.reader.position();
        let count = self
            .reader
            .read_length()
            .map_err(|kind| self.fail(kind, start, path))?
            .unwrap_or(0);

        let needed = count.saturating_mul(element.min_encoded_len(self.options.enum_encoding));
        if needed > self.reader.remaining() {
            let kind = DecodeErrorKind::TruncatedBuffer {
                needed,
                remaining: self.reader.remaining(),
            };
            return Err(self.fail(kind, self.reader.position(), path));
        }

        let mut items = Vec::with_capacity(count);
        for index in 0..count {
            let child = format!("{}[{}]", path, index);
            items.push(self.read_field(scopes, &child, element)?);
        }
        Ok(DecodedValue::Sequence(items))
    }
}

// =============================================================================
// Tests
// =============================================================================
