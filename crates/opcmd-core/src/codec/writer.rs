// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Little-endian writer, the mirror of [`BinaryReader`](super::BinaryReader).

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::{EnumEncoding, NULL_LENGTH, TICKS_PER_SECOND, TICKS_TO_UNIX_EPOCH};

/// Failure to encode a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot encode '{field}': {reason}")]
pub struct EncodeError {
    /// Field being encoded.
    pub field: String,
    /// What went wrong.
    pub reason: String,
}

impl EncodeError {
    /// Creates an encode error.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

type WriteResult = Result<(), EncodeError>;

/// Growable little-endian output buffer.
#[derive(Debug, Clone, Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Writes raw bytes.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a u8.
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Writes an i8.
    pub fn write_i8(&mut self, v: i8) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes a u16.
    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes an i16.
    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes a u32.
    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes an i32.
    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes a u64.
    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes an i64.
    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes an f32.
    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes an f64.
    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes a boolean as one byte.
    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    /// Writes an Int32 length prefix.
    pub fn write_length(&mut self, field: &str, length: usize) -> WriteResult {
        let length = i32::try_from(length)
            .map_err(|_| EncodeError::new(field, format!("length {} exceeds Int32", length)))?;
        self.write_i32(length);
        Ok(())
    }

    /// Writes the null length marker.
    pub fn write_null(&mut self) {
        self.write_i32(NULL_LENGTH);
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, field: &str, v: &str) -> WriteResult {
        self.write_length(field, v.len())?;
        self.write_raw(v.as_bytes());
        Ok(())
    }

    /// Writes a length-prefixed byte string.
    pub fn write_byte_string(&mut self, field: &str, v: &[u8]) -> WriteResult {
        self.write_length(field, v.len())?;
        self.write_raw(v);
        Ok(())
    }

    /// Writes a GUID.
    pub fn write_guid(&mut self, v: &Uuid) {
        let (d1, d2, d3, d4) = v.as_fields();
        self.write_u32(d1);
        self.write_u16(d2);
        self.write_u16(d3);
        self.write_raw(d4);
    }

    /// Writes a timestamp as 100 ns ticks since 1601-01-01 UTC.
    pub fn write_date_time(&mut self, field: &str, v: &DateTime<Utc>) -> WriteResult {
        let ticks = v
            .timestamp()
            .checked_mul(TICKS_PER_SECOND)
            .and_then(|t| t.checked_add(i64::from(v.timestamp_subsec_nanos() / 100)))
            .and_then(|t| t.checked_add(TICKS_TO_UNIX_EPOCH))
            .ok_or_else(|| EncodeError::new(field, "timestamp out of range"))?;
        self.write_i64(ticks);
        Ok(())
    }

    /// Writes an enumerated ordinal at the configured width.
    pub fn write_enum(&mut self, field: &str, encoding: EnumEncoding, ordinal: i32) -> WriteResult {
        match encoding {
            EnumEncoding::Byte => {
                let byte = u8::try_from(ordinal).map_err(|_| {
                    EncodeError::new(field, format!("ordinal {} does not fit one byte", ordinal))
                })?;
                self.write_u8(byte);
            }
            EnumEncoding::Int32 => self.write_i32(ordinal),
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
    use crate::codec::BinaryReader;

    #[test]
    fn test_guid_and_date_time_read_back() {
        let guid = Uuid::parse_str("12345678-1234-5678-0102-030405060708").unwrap();
        let when = DateTime::parse_from_rfc3339("2025-07-07T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let mut writer = BinaryWriter::new();
        writer.write_guid(&guid);
        writer.write_date_time("expirationDate", &when).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.read_guid().unwrap(), guid);
        assert_eq!(reader.read_date_time().unwrap(), when);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_enum_byte_overflow_rejected() {
        let mut writer = BinaryWriter::new();
        let error = writer.write_enum("lockState", EnumEncoding::Byte, 300).unwrap_err();
        assert_eq!(error.field, "lockState");
        assert!(writer.is_empty());
    }

    #[test]
    fn test_null_marker() {
        let mut writer = BinaryWriter::new();
        writer.write_null();
        assert_eq!(writer.into_bytes(), vec![0xFF, 0xFF, 0xFF, 0xFF]);
    }
}
