// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bounds-checked cursor over an encoded body.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{EnumEncoding, NULL_LENGTH, TICKS_PER_SECOND, TICKS_TO_UNIX_EPOCH};
use crate::error::DecodeErrorKind;

type ReadResult<T> = Result<T, DecodeErrorKind>;

macro_rules! read_le {
    ($name:ident, $ty:ty) => {
        #[doc = concat!("Reads a little-endian `", stringify!($ty), "`.")]
        pub fn $name(&mut self) -> ReadResult<$ty> {
            let bytes = self.take(std::mem::size_of::<$ty>())?;
            let mut raw = [0u8; std::mem::size_of::<$ty>()];
            raw.copy_from_slice(bytes);
            Ok(<$ty>::from_le_bytes(raw))
        }
    };
}

/// Cursor over an encoded body. Every read either consumes exactly the bytes
/// it needs or fails with [`DecodeErrorKind::TruncatedBuffer`].
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    /// Creates a reader at offset 0.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Returns `true` when every byte has been consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consumes `n` bytes.
    pub fn take(&mut self, n: usize) -> ReadResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or(DecodeErrorKind::TruncatedBuffer {
                needed: n,
                remaining: self.remaining(),
            })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    read_le!(read_u8, u8);
    read_le!(read_i8, i8);
    read_le!(read_u16, u16);
    read_le!(read_i16, i16);
    read_le!(read_u32, u32);
    read_le!(read_i32, i32);
    read_le!(read_u64, u64);
    read_le!(read_i64, i64);
    read_le!(read_f32, f32);
    read_le!(read_f64, f64);

    /// Reads a boolean (any non-zero byte is `true`).
    pub fn read_bool(&mut self) -> ReadResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads an Int32 length prefix. `None` means null.
    pub fn read_length(&mut self) -> ReadResult<Option<usize>> {
        match self.read_i32()? {
            NULL_LENGTH => Ok(None),
            length if length < 0 => Err(DecodeErrorKind::InvalidLength { length }),
            length => Ok(Some(length as usize)),
        }
    }

    /// Reads a length-prefixed UTF-8 string. Null reads as empty.
    pub fn read_string(&mut self) -> ReadResult<String> {
        let Some(length) = self.read_length()? else {
            return Ok(String::new());
        };
        let bytes = self.take(length)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| DecodeErrorKind::InvalidString {
                reason: e.to_string(),
            })
    }

    /// Reads a length-prefixed byte string. Null reads as empty.
    pub fn read_byte_string(&mut self) -> ReadResult<Vec<u8>> {
        match self.read_length()? {
            Some(length) => Ok(self.take(length)?.to_vec()),
            None => Ok(Vec::new()),
        }
    }

    /// Reads a GUID (Data1..Data3 little-endian, Data4 as bytes).
    pub fn read_guid(&mut self) -> ReadResult<Uuid> {
        let bytes = self.take(16)?;
        let d1 = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let d2 = u16::from_le_bytes([bytes[4], bytes[5]]);
        let d3 = u16::from_le_bytes([bytes[6], bytes[7]]);
        let mut d4 = [0u8; 8];
        d4.copy_from_slice(&bytes[8..16]);
        Ok(Uuid::from_fields(d1, d2, d3, &d4))
    }

    /// Reads a timestamp encoded as 100 ns ticks since 1601-01-01 UTC.
    pub fn read_date_time(&mut self) -> ReadResult<DateTime<Utc>> {
        let ticks = self.read_i64()?;
        let out_of_range = || DecodeErrorKind::InvalidValue {
            reason: format!("timestamp {} ticks is out of range", ticks),
        };
        let since_unix = ticks.checked_sub(TICKS_TO_UNIX_EPOCH).ok_or_else(out_of_range)?;
        let secs = since_unix.div_euclid(TICKS_PER_SECOND);
        let nanos = (since_unix.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
        DateTime::from_timestamp(secs, nanos).ok_or_else(out_of_range)
    }

    /// Reads an enumerated ordinal at the configured width.
    pub fn read_enum(&mut self, encoding: EnumEncoding) -> ReadResult<i32> {
        match encoding {
            EnumEncoding::Byte => Ok(i32::from(self.read_u8()?)),
            EnumEncoding::Int32 => self.read_i32(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
