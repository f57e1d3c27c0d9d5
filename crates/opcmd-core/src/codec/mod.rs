// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Little-endian binary primitives for result payloads.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ BinaryReader │     │ BinaryWriter │     │  ScopeStack  │
//! │  (decode)    │     │  (encode)    │     │ (namespaces) │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Strings, byte strings and sequences carry an Int32 length prefix where
//! `-1` marks a null value. Enumerations are written either as one byte or
//! as an Int32, see [`EnumEncoding`].

mod reader;
mod scope;
mod writer;

pub use reader::BinaryReader;
pub use scope::{ScopeGuard, ScopeStack};
pub use writer::{BinaryWriter, EncodeError};

use serde::{Deserialize, Serialize};

/// 100 ns ticks between 1601-01-01 and 1970-01-01.
pub(crate) const TICKS_TO_UNIX_EPOCH: i64 = 116_444_736_000_000_000;

/// 100 ns ticks per second.
pub(crate) const TICKS_PER_SECOND: i64 = 10_000_000;

/// Length prefix value marking a null string, byte string or sequence.
pub(crate) const NULL_LENGTH: i32 = -1;

/// Wire width of enumerated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumEncoding {
    /// One unsigned byte per ordinal.
    #[default]
    Byte,
    /// Four byte signed ordinal (standard OPC UA binary encoding).
    Int32,
}

impl EnumEncoding {
    /// Encoded size in bytes.
    pub const fn width(&self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Int32 => 4,
        }
    }
}
