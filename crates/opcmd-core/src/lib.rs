// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcmd-core
//!
//! Command and result layer for instruments that expose their operations as
//! OPC UA methods.
//!
//! Commands are resolved by name against the server's node hierarchy once per
//! session, invoked with typed arguments, and their opaque binary results are
//! decoded into a common header plus a command-specific tail.
//!
//! ```text
//!  MethodCatalog ──▶ AddressResolver ──▶ MethodRegistry ──▶ Invoker ──▶ ResultDecoder
//!  (name, path,       (browse, drain      (descriptors per    (one call)   (header + tail)
//!   in/out schema)     continuations)      session)
//!                                              ▲
//!                                    SessionContext (generation)
//! ```
//!
//! - **Types**: node ids, namespace tables, tagged values, status codes
//! - **Codec**: little-endian OPC UA binary primitives and the namespace scope stack
//! - **Catalog**: command table and type dictionary, builtin or from configuration
//! - **Resolver / Registry**: name-based node lookup and per-session descriptors
//! - **Invoker / Decoder**: argument validation, calls, result decoding
//! - **Client**: the facade tying the stages together
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use opcmd_core::{ClientOptions, CommandClient, MethodCatalog};
//!
//! let client = CommandClient::connect(
//!     MethodCatalog::builtin(),
//!     ClientOptions::default(),
//!     Arc::new(session),
//! )
//! .await?;
//!
//! let lock = client.run("RequestLock", vec![]).await?;
//! println!("{}", lock.tail.kind_name());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod codec;
pub mod error;
pub mod types;

// =============================================================================
// Schema & Results
// =============================================================================

pub mod catalog;
pub mod result;
pub mod schema;

// =============================================================================
// Pipeline Modules
// =============================================================================

pub mod client;
pub mod decoder;
pub mod encoder;
pub mod invoker;
pub mod registry;
pub mod resolver;
pub mod session;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::{
    ArgumentError, CatalogError, CommandError, CommandResult, DecodeError, DecodeErrorKind,
    ResolveError, SessionError, TransportError,
};

pub use types::{
    DiagnosticInfo, ExpandedNodeId, ExtensionObject, NamespaceTable, Node, NodeClass, NodeId,
    NodeRef, QualifiedName, StatusCode, TaggedValue, WireType,
};

pub use catalog::{ArgumentSpec, CommandSpec, MethodCatalog};
pub use result::{CommonHeader, DecodedResult, DecodedValue, VariantTail};
pub use schema::{FieldSchema, FieldType, OutputSchema, TypeDictionary, VariantKind};

pub use client::{ClientOptions, CommandClient, CommandOutcome};
pub use codec::EnumEncoding;
pub use decoder::{DecoderOptions, ResultDecoder};
pub use encoder::ResultEncoder;
pub use invoker::{InvocationOutcome, Invoker};
pub use registry::{AvailableMethod, MethodDescriptor, MethodRegistry};
pub use resolver::{AddressResolver, DuplicatePolicy, ResolverOptions};
pub use session::{Session, SessionContext};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
