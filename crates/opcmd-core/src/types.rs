// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Address and value types shared by the command pipeline.
//!
//! - **NodeId / ExpandedNodeId**: local and portable node addresses
//! - **NamespaceTable**: per-session namespace URI table for address conversion
//! - **NodeClass / NodeRef / Node**: browse results and resolved nodes
//! - **WireType / TaggedValue**: typed method arguments and outputs
//! - **StatusCode / DiagnosticInfo**: call outcome metadata
//!
//! # Examples
//!
//! ```
//! use opcmd_core::types::{NodeId, WireType, TaggedValue};
//!
//! let node: NodeId = "ns=2;i=5001".parse().unwrap();
//! assert_eq!(node.namespace_index, 2);
//!
//! let value = WireType::Int32.parse_arg("42").unwrap();
//! assert_eq!(value, TaggedValue::Int32(42));
//! ```

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::{ArgumentError, ResolveError};

/// URI of the OPC UA base namespace (index 0 in every session).
pub const OPC_UA_NAMESPACE_URI: &str = "http://opcfoundation.org/UA/";

// =============================================================================
// NodeId
// =============================================================================

/// Error returned when a node id string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid node id '{input}': {reason}")]
pub struct NodeIdParseError {
    /// The rejected text.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}

impl NodeIdParseError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Local node address, valid only within the session whose namespace table
/// produced it.
///
/// # Examples
///
/// ```
/// use opcmd_core::types::NodeId;
///
/// let node = NodeId::numeric(2, 1001);
/// assert_eq!(node.to_opc_string(), "ns=2;i=1001");
/// assert_eq!(NodeId::OBJECTS_FOLDER.to_opc_string(), "i=85");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    /// Creates a numeric node ID.
    #[inline]
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque (byte string) node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// Objects folder node (ns=0, i=85), the default resolution root.
    pub const OBJECTS_FOLDER: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(85),
    };

    /// Hierarchical references type (ns=0, i=33).
    pub const HIERARCHICAL_REFERENCES: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(33),
    };

    /// Returns the null node ID (ns=0, i=0).
    #[inline]
    pub const fn null() -> Self {
        Self {
            namespace_index: 0,
            identifier: NodeIdentifier::Numeric(0),
        }
    }

    /// Returns `true` if this is a null node ID.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && matches!(self.identifier, NodeIdentifier::Numeric(0))
    }

    /// Converts to the OPC UA string format `ns=<n>;{i|s|g|b}=<id>`.
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = NodeIdParseError;

    /// Parses `ns=2;i=1001`, `ns=2;s=Name`, `ns=2;g=<uuid>`, `ns=2;b=<base64>`,
    /// or the same forms without the `ns=` prefix for namespace 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns, id) = rest
                    .split_once(';')
                    .ok_or_else(|| NodeIdParseError::new(s, "missing identifier after namespace"))?;
                let ns: u16 = ns
                    .parse()
                    .map_err(|_| NodeIdParseError::new(s, "invalid namespace index"))?;
                (ns, id)
            }
            None => (0, s),
        };

        let identifier = if let Some(id) = identifier_part.strip_prefix("i=") {
            NodeIdentifier::Numeric(
                id.parse()
                    .map_err(|_| NodeIdParseError::new(s, "invalid numeric identifier"))?,
            )
        } else if let Some(id) = identifier_part.strip_prefix("s=") {
            NodeIdentifier::String(id.to_string())
        } else if let Some(id) = identifier_part.strip_prefix("g=") {
            NodeIdentifier::Guid(
                Uuid::parse_str(id)
                    .map_err(|e| NodeIdParseError::new(s, format!("invalid GUID: {}", e)))?,
            )
        } else if let Some(id) = identifier_part.strip_prefix("b=") {
            NodeIdentifier::Opaque(
                BASE64
                    .decode(id)
                    .map_err(|e| NodeIdParseError::new(s, format!("invalid base64: {}", e)))?,
            )
        } else {
            return Err(NodeIdParseError::new(
                s,
                "unknown identifier type, expected i=, s=, g= or b=",
            ));
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// The four OPC UA node identifier kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),
    /// String identifier.
    String(String),
    /// GUID identifier.
    Guid(Uuid),
    /// Opaque identifier.
    Opaque(Vec<u8>),
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
            Self::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

// =============================================================================
// ExpandedNodeId & NamespaceTable
// =============================================================================

/// Portable node address as returned by browse.
///
/// When `namespace_uri` is set it takes precedence over the index in
/// `node_id`, and converting to a local [`NodeId`] needs the session's
/// [`NamespaceTable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpandedNodeId {
    /// Node id; its namespace index is used when no URI is present.
    pub node_id: NodeId,
    /// Namespace URI, if the server sent one.
    pub namespace_uri: Option<String>,
    /// Server index (0 = this server).
    pub server_index: u32,
}

impl ExpandedNodeId {
    /// Wraps a local node id.
    pub fn local(node_id: NodeId) -> Self {
        Self {
            node_id,
            namespace_uri: None,
            server_index: 0,
        }
    }

    /// Creates an expanded id that names its namespace by URI.
    pub fn with_uri(uri: impl Into<String>, identifier: NodeIdentifier) -> Self {
        Self {
            node_id: NodeId {
                namespace_index: 0,
                identifier,
            },
            namespace_uri: Some(uri.into()),
            server_index: 0,
        }
    }

    /// Converts to a local node id using the session's namespace table.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownNamespace`] if the URI is not in the
    /// table and [`ResolveError::RemoteNode`] for nodes on other servers.
    pub fn to_local(&self, table: &NamespaceTable) -> Result<NodeId, ResolveError> {
        if self.server_index != 0 {
            return Err(ResolveError::RemoteNode {
                node_id: self.to_string(),
                server_index: self.server_index,
            });
        }

        match &self.namespace_uri {
            Some(uri) => {
                let index = table
                    .index_of(uri)
                    .ok_or_else(|| ResolveError::unknown_namespace(uri))?;
                Ok(NodeId {
                    namespace_index: index,
                    identifier: self.node_id.identifier.clone(),
                })
            }
            None => Ok(self.node_id.clone()),
        }
    }
}

impl From<NodeId> for ExpandedNodeId {
    fn from(node_id: NodeId) -> Self {
        Self::local(node_id)
    }
}

impl fmt::Display for ExpandedNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.server_index != 0 {
            write!(f, "svr={};", self.server_index)?;
        }
        match &self.namespace_uri {
            Some(uri) => write!(f, "nsu={};{}", uri, self.node_id.identifier),
            None => write!(f, "{}", self.node_id),
        }
    }
}

/// Ordered namespace URIs of one session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NamespaceTable {
    uris: Vec<String>,
}

impl NamespaceTable {
    /// Creates a table from the full URI list (index 0 first).
    pub fn new(uris: Vec<String>) -> Self {
        Self { uris }
    }

    /// Creates a table with the base namespace at index 0 followed by `uris`.
    pub fn with_server_uris<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all = vec![OPC_UA_NAMESPACE_URI.to_string()];
        all.extend(uris.into_iter().map(Into::into));
        Self { uris: all }
    }

    /// Returns the index of a URI.
    pub fn index_of(&self, uri: &str) -> Option<u16> {
        self.uris
            .iter()
            .position(|u| u == uri)
            .and_then(|i| u16::try_from(i).ok())
    }

    /// Returns the URI at an index.
    pub fn uri(&self, index: u16) -> Option<&str> {
        self.uris.get(index as usize).map(String::as_str)
    }

    /// Returns the number of namespaces.
    pub fn len(&self) -> usize {
        self.uris.len()
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }
}

// =============================================================================
// QualifiedName
// =============================================================================

/// Namespace-qualified browse name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Namespace index.
    pub namespace_index: u16,
    /// Name.
    pub name: String,
}

impl QualifiedName {
    /// Creates a qualified name.
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }
}

impl From<&str> for QualifiedName {
    /// Parses `"2:Name"`; text without a numeric prefix is namespace 0.
    fn from(s: &str) -> Self {
        if let Some((ns, name)) = s.split_once(':') {
            if let Ok(namespace_index) = ns.parse::<u16>() {
                return Self::new(namespace_index, name);
            }
        }
        Self::new(0, s)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index == 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.namespace_index, self.name)
        }
    }
}

// =============================================================================
// NodeClass
// =============================================================================

/// OPC UA node classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    /// Object node.
    Object,
    /// Variable node.
    Variable,
    /// Method node.
    Method,
    /// Object type node.
    ObjectType,
    /// Variable type node.
    VariableType,
    /// Reference type node.
    ReferenceType,
    /// Data type node.
    DataType,
    /// View node.
    View,
}

impl NodeClass {
    /// Returns the OPC UA bit mask value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Object => 1,
            Self::Variable => 2,
            Self::Method => 4,
            Self::ObjectType => 8,
            Self::VariableType => 16,
            Self::ReferenceType => 32,
            Self::DataType => 64,
            Self::View => 128,
        }
    }

    /// Creates from an OPC UA value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Object),
            2 => Some(Self::Variable),
            4 => Some(Self::Method),
            8 => Some(Self::ObjectType),
            16 => Some(Self::VariableType),
            32 => Some(Self::ReferenceType),
            64 => Some(Self::DataType),
            128 => Some(Self::View),
            _ => None,
        }
    }

    /// Node classes the resolver considers when matching names.
    pub const ADDRESSABLE: [NodeClass; 3] = [Self::Object, Self::Variable, Self::Method];

    /// Combined mask of [`Self::ADDRESSABLE`].
    pub fn addressable_mask() -> u32 {
        Self::ADDRESSABLE.iter().map(NodeClass::value).sum()
    }

    /// Returns `true` for Object, Variable and Method.
    pub fn is_addressable(&self) -> bool {
        Self::ADDRESSABLE.contains(self)
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Object => "Object",
            Self::Variable => "Variable",
            Self::Method => "Method",
            Self::ObjectType => "ObjectType",
            Self::VariableType => "VariableType",
            Self::ReferenceType => "ReferenceType",
            Self::DataType => "DataType",
            Self::View => "View",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// NodeRef & Node
// =============================================================================

/// One reference returned by a browse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    /// Target node.
    pub node_id: ExpandedNodeId,
    /// Browse name of the target.
    pub browse_name: QualifiedName,
    /// Display name of the target.
    pub display_name: String,
    /// Node class of the target.
    pub node_class: NodeClass,
}

impl NodeRef {
    /// Creates a reference.
    pub fn new(
        node_id: impl Into<ExpandedNodeId>,
        browse_name: impl Into<QualifiedName>,
        display_name: impl Into<String>,
        node_class: NodeClass,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            browse_name: browse_name.into(),
            display_name: display_name.into(),
            node_class,
        }
    }

    /// Returns `true` if the display name or browse name equals `name`.
    pub fn matches_name(&self, name: &str) -> bool {
        self.display_name == name || self.browse_name.name == name
    }
}

/// A resolved node with a session-local address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    /// Local node id.
    pub id: NodeId,
    /// Display name.
    pub display_name: String,
    /// Browse name.
    pub browse_name: QualifiedName,
    /// Node class.
    pub node_class: NodeClass,
}

impl Node {
    /// The Objects folder as a resolved node.
    pub fn objects_folder() -> Self {
        Self {
            id: NodeId::OBJECTS_FOLDER,
            display_name: "Objects".to_string(),
            browse_name: QualifiedName::new(0, "Objects"),
            node_class: NodeClass::Object,
        }
    }

    /// Converts a browse reference using the session's namespace table.
    pub fn from_ref(reference: &NodeRef, table: &NamespaceTable) -> Result<Self, ResolveError> {
        Ok(Self {
            id: reference.node_id.to_local(table)?,
            display_name: reference.display_name.clone(),
            browse_name: reference.browse_name.clone(),
            node_class: reference.node_class,
        })
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({})", self.display_name, self.id)
    }
}

// =============================================================================
// StatusCode
// =============================================================================

/// OPC UA status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// Good.
    pub const GOOD: StatusCode = StatusCode(0x0000_0000);
    /// Uncertain.
    pub const UNCERTAIN: StatusCode = StatusCode(0x4000_0000);
    /// Bad.
    pub const BAD: StatusCode = StatusCode(0x8000_0000);
    /// BadUnexpectedError.
    pub const BAD_UNEXPECTED_ERROR: StatusCode = StatusCode(0x8001_0000);
    /// BadInternalError.
    pub const BAD_INTERNAL_ERROR: StatusCode = StatusCode(0x8002_0000);
    /// BadCommunicationError.
    pub const BAD_COMMUNICATION_ERROR: StatusCode = StatusCode(0x8005_0000);
    /// BadDecodingError.
    pub const BAD_DECODING_ERROR: StatusCode = StatusCode(0x8007_0000);
    /// BadTimeout.
    pub const BAD_TIMEOUT: StatusCode = StatusCode(0x800A_0000);
    /// BadUserAccessDenied.
    pub const BAD_USER_ACCESS_DENIED: StatusCode = StatusCode(0x801F_0000);
    /// BadNodeIdUnknown.
    pub const BAD_NODE_ID_UNKNOWN: StatusCode = StatusCode(0x8034_0000);
    /// BadOutOfRange.
    pub const BAD_OUT_OF_RANGE: StatusCode = StatusCode(0x803C_0000);
    /// BadTypeMismatch.
    pub const BAD_TYPE_MISMATCH: StatusCode = StatusCode(0x8074_0000);
    /// BadMethodInvalid.
    pub const BAD_METHOD_INVALID: StatusCode = StatusCode(0x8075_0000);
    /// BadArgumentsMissing.
    pub const BAD_ARGUMENTS_MISSING: StatusCode = StatusCode(0x8076_0000);
    /// BadInvalidArgument.
    pub const BAD_INVALID_ARGUMENT: StatusCode = StatusCode(0x80AB_0000);
    /// BadTooManyArguments.
    pub const BAD_TOO_MANY_ARGUMENTS: StatusCode = StatusCode(0x80E5_0000);
    /// BadNotExecutable.
    pub const BAD_NOT_EXECUTABLE: StatusCode = StatusCode(0x8111_0000);

    /// Returns `true` for good status codes.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` for uncertain status codes.
    #[inline]
    pub const fn is_uncertain(&self) -> bool {
        self.0 & 0xC000_0000 == 0x4000_0000
    }

    /// Returns `true` for bad status codes.
    #[inline]
    pub const fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Returns the symbolic name for well-known codes.
    pub fn name(&self) -> Option<&'static str> {
        let name = match self.0 & 0xFFFF_0000 {
            0x0000_0000 => "Good",
            0x4000_0000 => "Uncertain",
            0x8000_0000 => "Bad",
            0x8001_0000 => "BadUnexpectedError",
            0x8002_0000 => "BadInternalError",
            0x8005_0000 => "BadCommunicationError",
            0x8007_0000 => "BadDecodingError",
            0x800A_0000 => "BadTimeout",
            0x801F_0000 => "BadUserAccessDenied",
            0x8034_0000 => "BadNodeIdUnknown",
            0x803C_0000 => "BadOutOfRange",
            0x8074_0000 => "BadTypeMismatch",
            0x8075_0000 => "BadMethodInvalid",
            0x8076_0000 => "BadArgumentsMissing",
            0x80AB_0000 => "BadInvalidArgument",
            0x80E5_0000 => "BadTooManyArguments",
            0x8111_0000 => "BadNotExecutable",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:08X})", name, self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

// =============================================================================
// DiagnosticInfo
// =============================================================================

/// Diagnostics returned with a call result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiagnosticInfo {
    /// Symbolic id index into the response string table.
    pub symbolic_id: Option<i32>,
    /// Localized text.
    pub localized_text: Option<String>,
    /// Vendor specific detail.
    pub additional_info: Option<String>,
    /// Status code of a nested operation.
    pub inner_status_code: Option<StatusCode>,
}

impl DiagnosticInfo {
    /// Creates diagnostics carrying only a text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            localized_text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Returns `true` if nothing is set.
    pub fn is_empty(&self) -> bool {
        self.symbolic_id.is_none()
            && self.localized_text.is_none()
            && self.additional_info.is_none()
            && self.inner_status_code.is_none()
    }
}

impl fmt::Display for DiagnosticInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(text) = &self.localized_text {
            parts.push(text.clone());
        }
        if let Some(info) = &self.additional_info {
            parts.push(info.clone());
        }
        if let Some(status) = &self.inner_status_code {
            parts.push(format!("inner status {}", status));
        }
        if parts.is_empty() {
            write!(f, "<empty>")
        } else {
            write!(f, "{}", parts.join("; "))
        }
    }
}

// =============================================================================
// TaggedValue
// =============================================================================

/// Body of an extension object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "body", rename_all = "snake_case")]
pub enum ExtensionBody {
    /// No body.
    None,
    /// Binary encoded body.
    Binary(Vec<u8>),
    /// XML encoded body.
    Xml(String),
}

/// A structured value with its encoding type id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionObject {
    /// Encoding type id.
    pub type_id: NodeId,
    /// Encoded body.
    pub body: ExtensionBody,
}

impl ExtensionObject {
    /// Creates a binary-bodied extension object.
    pub fn binary(type_id: NodeId, body: Vec<u8>) -> Self {
        Self {
            type_id,
            body: ExtensionBody::Binary(body),
        }
    }
}

/// A protocol tagged value (variant) used for arguments and outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum TaggedValue {
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
    /// UTF-8 string.
    String(String),
    /// Timestamp.
    DateTime(DateTime<Utc>),
    /// GUID.
    Guid(Uuid),
    /// Byte string.
    ByteString(Vec<u8>),
    /// Structured value.
    ExtensionObject(ExtensionObject),
    /// One-dimensional array.
    Array(Vec<TaggedValue>),
    /// Empty value.
    Null,
}

impl TaggedValue {
    /// Returns a short type name for diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Self::Boolean(_) => "Boolean".to_string(),
            Self::SByte(_) => "SByte".to_string(),
            Self::Byte(_) => "Byte".to_string(),
            Self::Int16(_) => "Int16".to_string(),
            Self::UInt16(_) => "UInt16".to_string(),
            Self::Int32(_) => "Int32".to_string(),
            Self::UInt32(_) => "UInt32".to_string(),
            Self::Int64(_) => "Int64".to_string(),
            Self::UInt64(_) => "UInt64".to_string(),
            Self::Float(_) => "Float".to_string(),
            Self::Double(_) => "Double".to_string(),
            Self::String(_) => "String".to_string(),
            Self::DateTime(_) => "DateTime".to_string(),
            Self::Guid(_) => "Guid".to_string(),
            Self::ByteString(_) => "ByteString".to_string(),
            Self::ExtensionObject(_) => "ExtensionObject".to_string(),
            Self::Array(items) => match items.first() {
                Some(first) => format!("{}[]", first.type_name()),
                None => "Array".to_string(),
            },
            Self::Null => "Null".to_string(),
        }
    }

    /// Returns the extension object if this is one.
    pub fn as_extension_object(&self) -> Option<&ExtensionObject> {
        match self {
            Self::ExtensionObject(eo) => Some(eo),
            _ => None,
        }
    }
}

// =============================================================================
// WireType
// =============================================================================

/// Declared wire type of a method argument.
///
/// Text form (used by configuration files): `boolean`, `int32`, `string`,
/// `date_time`, `guid`, `byte_string`, `extension_object`,
/// `extension_object(ns=2;i=3001)` and `<type>[]` for arrays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WireType {
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
    /// UTF-8 string.
    String,
    /// Timestamp.
    DateTime,
    /// GUID.
    Guid,
    /// Byte string.
    ByteString,
    /// Structured value, optionally constrained to one encoding type id.
    ExtensionObject(Option<NodeId>),
    /// Array of the element type.
    Array(Box<WireType>),
}

impl WireType {
    /// Returns `true` if `value` can be sent for this declared type.
    pub fn matches(&self, value: &TaggedValue) -> bool {
        match (self, value) {
            (Self::Boolean, TaggedValue::Boolean(_))
            | (Self::SByte, TaggedValue::SByte(_))
            | (Self::Byte, TaggedValue::Byte(_))
            | (Self::Int16, TaggedValue::Int16(_))
            | (Self::UInt16, TaggedValue::UInt16(_))
            | (Self::Int32, TaggedValue::Int32(_))
            | (Self::UInt32, TaggedValue::UInt32(_))
            | (Self::Int64, TaggedValue::Int64(_))
            | (Self::UInt64, TaggedValue::UInt64(_))
            | (Self::Float, TaggedValue::Float(_))
            | (Self::Double, TaggedValue::Double(_))
            | (Self::String, TaggedValue::String(_))
            | (Self::DateTime, TaggedValue::DateTime(_))
            | (Self::Guid, TaggedValue::Guid(_))
            | (Self::ByteString, TaggedValue::ByteString(_)) => true,
            (Self::ExtensionObject(None), TaggedValue::ExtensionObject(_)) => true,
            (Self::ExtensionObject(Some(type_id)), TaggedValue::ExtensionObject(eo)) => {
                eo.type_id == *type_id
            }
            (Self::Array(element), TaggedValue::Array(items)) => {
                items.iter().all(|item| element.matches(item))
            }
            _ => false,
        }
    }

    /// Parses command-line text into a value of this type.
    ///
    /// Booleans accept `yes/no/y/n/true/false/1/0`, timestamps accept RFC 3339
    /// or a bare `YYYY-MM-DD` date (midnight UTC), byte strings and extension
    /// object bodies are base64, and arrays are comma separated.
    ///
    /// # Examples
    ///
    /// ```
    /// use opcmd_core::types::{TaggedValue, WireType};
    ///
    /// let retain = WireType::Boolean.parse_arg("yes").unwrap();
    /// assert_eq!(retain, TaggedValue::Boolean(true));
    ///
    /// let ids = WireType::Array(Box::new(WireType::Guid)).parse_arg("").unwrap();
    /// assert_eq!(ids, TaggedValue::Array(vec![]));
    /// ```
    pub fn parse_arg(&self, text: &str) -> Result<TaggedValue, ArgumentError> {
        let trimmed = text.trim();
        let invalid = |reason: &dyn fmt::Display| ArgumentError::invalid_value(self, text, reason);

        let value = match self {
            Self::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" | "1" => TaggedValue::Boolean(true),
                "no" | "n" | "false" | "0" => TaggedValue::Boolean(false),
                _ => return Err(invalid(&"expected yes or no")),
            },
            Self::SByte => TaggedValue::SByte(trimmed.parse().map_err(|e| invalid(&e))?),
            Self::Byte => TaggedValue::Byte(trimmed.parse().map_err(|e| invalid(&e))?),
            Self::Int16 => TaggedValue::Int16(trimmed.parse().map_err(|e| invalid(&e))?),
            Self::UInt16 => TaggedValue::UInt16(trimmed.parse().map_err(|e| invalid(&e))?),
            Self::Int32 => TaggedValue::Int32(trimmed.parse().map_err(|e| invalid(&e))?),
            Self::UInt32 => TaggedValue::UInt32(trimmed.parse().map_err(|e| invalid(&e))?),
            Self::Int64 => TaggedValue::Int64(trimmed.parse().map_err(|e| invalid(&e))?),
            Self::UInt64 => TaggedValue::UInt64(trimmed.parse().map_err(|e| invalid(&e))?),
            Self::Float => TaggedValue::Float(trimmed.parse().map_err(|e| invalid(&e))?),
            Self::Double => TaggedValue::Double(trimmed.parse().map_err(|e| invalid(&e))?),
            Self::String => TaggedValue::String(text.to_string()),
            Self::DateTime => TaggedValue::DateTime(parse_date_time(trimmed).map_err(|e| invalid(&e))?),
            Self::Guid => TaggedValue::Guid(Uuid::parse_str(trimmed).map_err(|e| invalid(&e))?),
            Self::ByteString => {
                TaggedValue::ByteString(BASE64.decode(trimmed).map_err(|e| invalid(&e))?)
            }
            Self::ExtensionObject(type_id) => {
                let body = BASE64.decode(trimmed).map_err(|e| invalid(&e))?;
                TaggedValue::ExtensionObject(ExtensionObject::binary(
                    type_id.clone().unwrap_or_default(),
                    body,
                ))
            }
            Self::Array(element) => TaggedValue::Array(
                trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| element.parse_arg(item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        Ok(value)
    }
}

fn parse_date_time(text: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| e.to_string())?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| "invalid date".to_string())
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "Boolean"),
            Self::SByte => write!(f, "SByte"),
            Self::Byte => write!(f, "Byte"),
            Self::Int16 => write!(f, "Int16"),
            Self::UInt16 => write!(f, "UInt16"),
            Self::Int32 => write!(f, "Int32"),
            Self::UInt32 => write!(f, "UInt32"),
            Self::Int64 => write!(f, "Int64"),
            Self::UInt64 => write!(f, "UInt64"),
            Self::Float => write!(f, "Float"),
            Self::Double => write!(f, "Double"),
            Self::String => write!(f, "String"),
            Self::DateTime => write!(f, "DateTime"),
            Self::Guid => write!(f, "Guid"),
            Self::ByteString => write!(f, "ByteString"),
            Self::ExtensionObject(None) => write!(f, "ExtensionObject"),
            Self::ExtensionObject(Some(id)) => write!(f, "ExtensionObject({})", id),
            Self::Array(element) => write!(f, "{}[]", element),
        }
    }
}

impl FromStr for WireType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(element) = s.strip_suffix("[]") {
            return Ok(Self::Array(Box::new(element.parse()?)));
        }

        let normalize = |text: &str| text.to_ascii_lowercase().replace('_', "");

        if let Some((head, rest)) = s.split_once('(') {
            let inner = rest
                .strip_suffix(')')
                .ok_or_else(|| format!("unterminated type constraint in '{}'", s))?;
            if normalize(head) != "extensionobject" {
                return Err(format!("only extension objects take a type id, got '{}'", s));
            }
            let type_id = inner.parse::<NodeId>().map_err(|e| e.to_string())?;
            return Ok(Self::ExtensionObject(Some(type_id)));
        }

        let wire_type = match normalize(s).as_str() {
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
            "extensionobject" => Self::ExtensionObject(None),
            other => return Err(format!("unknown wire type '{}'", other)),
        };
        Ok(wire_type)
    }
}

impl TryFrom<String> for WireType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WireType> for String {
    fn from(value: WireType) -> Self {
        value.to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_round_trip_text() {
        for text in ["i=85", "ns=2;i=1001", "ns=3;s=ViCellBlu.Methods", "ns=1;b=AQID"] {
            let node: NodeId = text.parse().unwrap();
            assert_eq!(node.to_opc_string(), text);
        }
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert!("ns=x;i=1".parse::<NodeId>().is_err());
        assert!("ns=2".parse::<NodeId>().is_err());
        assert!("q=12".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_expanded_node_id_to_local() {
        let table = NamespaceTable::with_server_uris(["urn:server", "http://instrument/ns"]);
        let expanded = ExpandedNodeId::with_uri("http://instrument/ns", NodeIdentifier::Numeric(7));

        let local = expanded.to_local(&table).unwrap();
        assert_eq!(local, NodeId::numeric(2, 7));
    }

    #[test]
    fn test_expanded_node_id_unknown_namespace() {
        let table = NamespaceTable::with_server_uris(["urn:server"]);
        let expanded = ExpandedNodeId::with_uri("http://missing/ns", NodeIdentifier::Numeric(7));

        assert!(matches!(
            expanded.to_local(&table),
            Err(ResolveError::UnknownNamespace { .. })
        ));
    }

    #[test]
    fn test_expanded_node_id_remote_server() {
        let mut expanded = ExpandedNodeId::local(NodeId::numeric(1, 1));
        expanded.server_index = 3;

        assert!(matches!(
            expanded.to_local(&NamespaceTable::default()),
            Err(ResolveError::RemoteNode { server_index: 3, .. })
        ));
    }

    #[test]
    fn test_qualified_name_parse() {
        assert_eq!(QualifiedName::from("2:Methods"), QualifiedName::new(2, "Methods"));
        assert_eq!(QualifiedName::from("Methods"), QualifiedName::new(0, "Methods"));
        assert_eq!(QualifiedName::from("a:b"), QualifiedName::new(0, "a:b"));
    }

    #[test]
    fn test_node_class_mask() {
        assert_eq!(NodeClass::addressable_mask(), 7);
        assert!(NodeClass::Method.is_addressable());
        assert!(!NodeClass::DataType.is_addressable());
        assert_eq!(NodeClass::from_value(4), Some(NodeClass::Method));
    }

    #[test]
    fn test_node_ref_matches_either_name() {
        let reference = NodeRef::new(
            NodeId::numeric(2, 10),
            "2:PlayControl",
            "Play Control",
            NodeClass::Object,
        );
        assert!(reference.matches_name("PlayControl"));
        assert!(reference.matches_name("Play Control"));
        assert!(!reference.matches_name("playcontrol"));
    }

    #[test]
    fn test_status_code_severity() {
        assert!(StatusCode::GOOD.is_good());
        assert!(StatusCode::UNCERTAIN.is_uncertain());
        assert!(StatusCode::BAD_METHOD_INVALID.is_bad());
        assert!(!StatusCode::BAD_METHOD_INVALID.is_good());
        assert_eq!(
            StatusCode::BAD_TYPE_MISMATCH.to_string(),
            "BadTypeMismatch (0x80740000)"
        );
        assert_eq!(StatusCode(0x8123_0000).name(), None);
    }

    #[test]
    fn test_wire_type_matches() {
        assert!(WireType::String.matches(&TaggedValue::String("x".into())));
        assert!(!WireType::String.matches(&TaggedValue::Int32(1)));
        assert!(!WireType::Int32.matches(&TaggedValue::Null));

        let guids = WireType::Array(Box::new(WireType::Guid));
        assert!(guids.matches(&TaggedValue::Array(vec![])));
        assert!(guids.matches(&TaggedValue::Array(vec![TaggedValue::Guid(Uuid::nil())])));
        assert!(!guids.matches(&TaggedValue::Array(vec![TaggedValue::Int32(1)])));

        let typed = WireType::ExtensionObject(Some(NodeId::numeric(2, 3001)));
        let eo = ExtensionObject::binary(NodeId::numeric(2, 3001), vec![]);
        assert!(typed.matches(&TaggedValue::ExtensionObject(eo.clone())));
        assert!(WireType::ExtensionObject(None).matches(&TaggedValue::ExtensionObject(eo)));
    }

    #[test]
    fn test_wire_type_text_round_trip() {
        for text in ["Int32", "Guid[]", "ByteString", "ExtensionObject(ns=2;s=CellType)"] {
            let wire_type: WireType = text.parse().unwrap();
            assert_eq!(wire_type.to_string(), text);
        }
        assert_eq!("date_time".parse::<WireType>().unwrap(), WireType::DateTime);
        assert!("decimal".parse::<WireType>().is_err());
    }

    #[test]
    fn test_parse_arg() {
        assert_eq!(WireType::Boolean.parse_arg("No").unwrap(), TaggedValue::Boolean(false));
        assert!(WireType::Boolean.parse_arg("maybe").is_err());
        assert!(WireType::Int32.parse_arg("12x").is_err());

        let date = WireType::DateTime.parse_arg("2024-05-01").unwrap();
        match date {
            TaggedValue::DateTime(dt) => assert_eq!(dt.to_rfc3339(), "2024-05-01T00:00:00+00:00"),
            other => panic!("unexpected value: {other:?}"),
        }

        let ids = WireType::Array(Box::new(WireType::Guid))
            .parse_arg("00000000-0000-0000-0000-000000000001, 00000000-0000-0000-0000-000000000002")
            .unwrap();
        match ids {
            TaggedValue::Array(items) => assert_eq!(items.len(), 2),
            other => panic!("unexpected value: {other:?}"),
        }
    }
}
