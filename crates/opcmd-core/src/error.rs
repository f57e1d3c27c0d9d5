// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command layer error types with diagnostics.
//!
//! Every fallible operation in this crate returns a [`CommandError`], which
//! groups failures by the stage of the command pipeline that produced them:
//!
//! ```text
//! CommandError
//! ├── Resolve       - Node hierarchy lookups (AddressNotFound, AddressAmbiguous)
//! ├── Catalog       - Command table lookups and validation (UnknownCommand)
//! ├── Argument      - Local argument validation (ArgumentMismatch)
//! ├── Transport     - Session transport failures (TransportFailure)
//! ├── Session       - Stale or invalidated session contexts
//! ├── ServerStatus  - Bad status returned by the server (ServerStatusFailure)
//! └── Decode        - Result payload decoding failures
//! ```
//!
//! The common header's `methodResult` and `errorLevel` are business signals
//! and never turn into a `CommandError` on their own.
//!
//! # Examples
//!
//! ```
//! use opcmd_core::error::{CatalogError, CommandError};
//!
//! let error = CommandError::unknown_command("SelfDestruct");
//! assert!(!error.is_retryable());
//! assert_eq!(error.category(), "catalog");
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

use crate::result::{DecodedResult, PartialHeader};
use crate::types::{DiagnosticInfo, StatusCode};

/// Result type alias for command layer operations.
pub type CommandResult<T> = Result<T, CommandError>;

// =============================================================================
// CommandError - Main Error Type
// =============================================================================

/// The main error type for the command layer.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// Address resolution errors.
    #[error("{0}")]
    Resolve(#[from] ResolveError),

    /// Catalog lookup and validation errors.
    #[error("{0}")]
    Catalog(#[from] CatalogError),

    /// Local argument validation errors.
    #[error("{0}")]
    Argument(#[from] ArgumentError),

    /// Transport failures reported by the session.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Session context errors.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// The server answered the call with a bad status code.
    #[error("Server returned {status} for command '{command}'")]
    ServerStatus {
        /// Command name.
        command: String,
        /// Status code returned by the server.
        status: StatusCode,
        /// Result decoded from any outputs that came back with the status.
        result: Option<Box<DecodedResult>>,
        /// Decode failure of the returned output, keeping its partial header.
        decode_error: Option<Box<DecodeError>>,
        /// Diagnostics returned alongside the status.
        diagnostics: Vec<DiagnosticInfo>,
    },

    /// Result payload decoding errors.
    #[error("{0}")]
    Decode(#[from] DecodeError),
}

impl CommandError {
    // =========================================================================
    // Convenience Factory Methods
    // =========================================================================

    /// Creates an address-not-found error.
    pub fn address_not_found(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Resolve(ResolveError::not_found(parent, name))
    }

    /// Creates an unknown command error.
    pub fn unknown_command(name: impl Into<String>) -> Self {
        Self::Catalog(CatalogError::unknown_command(name))
    }

    /// Creates a transport failure.
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport(TransportError::failed(operation, message))
    }

    /// Creates a server status failure.
    pub fn server_status(
        command: impl Into<String>,
        status: StatusCode,
        decoded: Option<Result<DecodedResult, DecodeError>>,
        diagnostics: Vec<DiagnosticInfo>,
    ) -> Self {
        let (result, decode_error) = match decoded {
            Some(Ok(result)) => (Some(Box::new(result)), None),
            Some(Err(error)) => (None, Some(Box::new(error))),
            None => (None, None),
        };
        Self::ServerStatus {
            command: command.into(),
            status,
            result,
            decode_error,
            diagnostics,
        }
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns `true` if a host application may reasonably retry.
    ///
    /// The command layer itself never retries; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::Session(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Resolve(e) => e.severity(),
            Self::Catalog(_) => ErrorSeverity::Error,
            Self::Argument(_) => ErrorSeverity::Warning,
            Self::Transport(_) => ErrorSeverity::Error,
            Self::Session(_) => ErrorSeverity::Warning,
            Self::ServerStatus { .. } => ErrorSeverity::Warning,
            Self::Decode(_) => ErrorSeverity::Error,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Resolve(_) => "resolve",
            Self::Catalog(_) => "catalog",
            Self::Argument(_) => "argument",
            Self::Transport(_) => "transport",
            Self::Session(_) => "session",
            Self::ServerStatus { .. } => "server_status",
            Self::Decode(_) => "decode",
        }
    }

    /// Returns a structured error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Resolve(e) => e.error_code(),
            Self::Catalog(e) => e.error_code(),
            Self::Argument(e) => e.error_code(),
            Self::Transport(e) => e.error_code(),
            Self::Session(e) => e.error_code(),
            Self::ServerStatus { .. } => ErrorCode::new(6, 1),
            Self::Decode(e) => e.error_code(),
        }
    }

    /// Returns the partially decoded header, if decoding got that far.
    ///
    /// A bad status whose output failed to decode still exposes the header
    /// fields read before the failure.
    pub fn partial_header(&self) -> Option<&PartialHeader> {
        match self {
            Self::Decode(e) => Some(&e.partial),
            Self::ServerStatus { decode_error, .. } => decode_error.as_deref().map(|e| &e.partial),
            _ => None,
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let code = self.error_code();

        match self.tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                "{self}"
            ),
        }
    }
}

// =============================================================================
// ResolveError
// =============================================================================

/// Errors raised while resolving names against the node hierarchy.
///
/// These are fatal to the affected command only, never to the session.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// No child with the requested name exists under the parent.
    #[error("Address not found: no child named '{name}' under {parent}")]
    NotFound {
        /// Parent node (text form).
        parent: String,
        /// Name that was looked up.
        name: String,
        /// Path segments that resolved before the failure.
        resolved: Vec<String>,
    },

    /// More than one child matched and the policy rejects duplicates.
    #[error("Address ambiguous: {count} children named '{name}' under {parent}")]
    Ambiguous {
        /// Parent node (text form).
        parent: String,
        /// Name that was looked up.
        name: String,
        /// Number of matching children.
        count: usize,
    },

    /// The resolved node has an unexpected class.
    #[error("Node '{name}' is a {actual}, expected a {expected}")]
    UnexpectedNodeClass {
        /// Node name.
        name: String,
        /// Expected node class.
        expected: String,
        /// Actual node class.
        actual: String,
    },

    /// An expanded node id references a namespace the session does not know.
    #[error("Namespace '{uri}' is not in the session namespace table")]
    UnknownNamespace {
        /// Namespace URI.
        uri: String,
    },

    /// The reference points at a node on another server.
    #[error("Node '{node_id}' lives on remote server {server_index}")]
    RemoteNode {
        /// Node id (text form).
        node_id: String,
        /// Server index.
        server_index: u32,
    },

    /// The server kept returning continuation points past the page limit.
    #[error("Browse of {parent} exceeded {pages} continuation pages")]
    ContinuationLimit {
        /// Parent node (text form).
        parent: String,
        /// Page limit that was hit.
        pages: usize,
    },
}

impl ResolveError {
    /// Creates a not-found error.
    pub fn not_found(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            parent: parent.into(),
            name: name.into(),
            resolved: Vec::new(),
        }
    }

    /// Creates an ambiguous-match error.
    pub fn ambiguous(parent: impl Into<String>, name: impl Into<String>, count: usize) -> Self {
        Self::Ambiguous {
            parent: parent.into(),
            name: name.into(),
            count,
        }
    }

    /// Creates an unexpected node class error.
    pub fn unexpected_class(
        name: impl Into<String>,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        Self::UnexpectedNodeClass {
            name: name.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Creates an unknown namespace error.
    pub fn unknown_namespace(uri: impl Into<String>) -> Self {
        Self::UnknownNamespace { uri: uri.into() }
    }

    /// Records the path prefix that resolved before this error.
    pub fn with_resolved(self, prefix: Vec<String>) -> Self {
        match self {
            Self::NotFound { parent, name, .. } => Self::NotFound {
                parent,
                name,
                resolved: prefix,
            },
            other => other,
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound { .. } | Self::Ambiguous { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::new(1, 1),
            Self::Ambiguous { .. } => ErrorCode::new(1, 2),
            Self::UnexpectedNodeClass { .. } => ErrorCode::new(1, 3),
            Self::UnknownNamespace { .. } => ErrorCode::new(1, 4),
            Self::RemoteNode { .. } => ErrorCode::new(1, 5),
            Self::ContinuationLimit { .. } => ErrorCode::new(1, 6),
        }
    }
}

// =============================================================================
// CatalogError
// =============================================================================

/// Errors raised by the method catalog.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// The command name is not in the catalog.
    #[error("Unknown command: '{name}'")]
    UnknownCommand {
        /// Requested command name.
        name: String,
    },

    /// Two catalog entries share a name.
    #[error("Duplicate command definition: '{name}'")]
    DuplicateCommand {
        /// Command name.
        name: String,
    },

    /// A schema references a type the dictionary does not define.
    #[error("Unknown type '{type_name}' in namespace '{namespace}'")]
    UnknownType {
        /// Namespace URI searched.
        namespace: String,
        /// Type name.
        type_name: String,
    },

    /// A variant family was declared with fields of the wrong shape.
    #[error("Invalid {family} result shape for '{command}': {reason}")]
    InvalidVariantShape {
        /// Command name.
        command: String,
        /// Variant family name.
        family: String,
        /// What is wrong.
        reason: String,
    },

    /// Any other invalid command definition.
    #[error("Invalid definition for '{command}': {reason}")]
    InvalidDefinition {
        /// Command name.
        command: String,
        /// What is wrong.
        reason: String,
    },
}

impl CatalogError {
    /// Creates an unknown command error.
    pub fn unknown_command(name: impl Into<String>) -> Self {
        Self::UnknownCommand { name: name.into() }
    }

    /// Creates an unknown type error.
    pub fn unknown_type(namespace: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::UnknownType {
            namespace: namespace.into(),
            type_name: type_name.into(),
        }
    }

    /// Creates an invalid variant shape error.
    pub fn invalid_shape(
        command: impl Into<String>,
        family: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidVariantShape {
            command: command.into(),
            family: family.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid definition error.
    pub fn invalid_definition(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnknownCommand { .. } => ErrorCode::new(2, 1),
            Self::DuplicateCommand { .. } => ErrorCode::new(2, 2),
            Self::UnknownType { .. } => ErrorCode::new(2, 3),
            Self::InvalidVariantShape { .. } => ErrorCode::new(2, 4),
            Self::InvalidDefinition { .. } => ErrorCode::new(2, 5),
        }
    }
}

// =============================================================================
// ArgumentError
// =============================================================================

/// Local argument validation failures. No request is sent when these occur.
#[derive(Debug, Clone, Error)]
pub enum ArgumentError {
    /// Wrong number of arguments.
    #[error("Argument mismatch for '{command}': expected {expected} arguments, got {actual}")]
    CountMismatch {
        /// Command name.
        command: String,
        /// Declared argument count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },

    /// An argument has the wrong wire type.
    #[error(
        "Argument mismatch for '{command}': argument {index} ('{name}') expected {expected}, got {actual}"
    )]
    TypeMismatch {
        /// Command name.
        command: String,
        /// Zero-based argument position.
        index: usize,
        /// Declared argument name.
        name: String,
        /// Declared wire type.
        expected: String,
        /// Supplied wire type.
        actual: String,
    },

    /// Text could not be parsed into the declared wire type.
    #[error("Invalid value '{value}' for {expected}: {reason}")]
    InvalidValue {
        /// Declared wire type.
        expected: String,
        /// Offending text.
        value: String,
        /// Parse failure.
        reason: String,
    },
}

impl ArgumentError {
    /// Creates a count mismatch error.
    pub fn count_mismatch(command: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::CountMismatch {
            command: command.into(),
            expected,
            actual,
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(
        command: impl Into<String>,
        index: usize,
        name: impl Into<String>,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        Self::TypeMismatch {
            command: command.into(),
            index,
            name: name.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(
        expected: impl fmt::Display,
        value: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::InvalidValue {
            expected: expected.to_string(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::CountMismatch { .. } => ErrorCode::new(3, 1),
            Self::TypeMismatch { .. } => ErrorCode::new(3, 2),
            Self::InvalidValue { .. } => ErrorCode::new(3, 3),
        }
    }
}

// =============================================================================
// TransportError
// =============================================================================

/// Failures reported by the session transport.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request could not be completed.
    #[error("Transport failure during {operation}: {message}")]
    Failed {
        /// Service being called (browse, browse_next, call).
        operation: String,
        /// Failure description.
        message: String,
    },

    /// The request timed out in the transport.
    #[error("Transport timeout during {operation} after {duration:?}")]
    Timeout {
        /// Service being called.
        operation: String,
        /// Elapsed time.
        duration: Duration,
    },

    /// The session has no open channel.
    #[error("Session is not connected")]
    NotConnected,
}

impl TransportError {
    /// Creates a generic transport failure.
    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a timeout failure.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Returns `true` if the host could retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::NotConnected)
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Failed { .. } => ErrorCode::new(4, 1),
            Self::Timeout { .. } => ErrorCode::new(4, 2),
            Self::NotConnected => ErrorCode::new(4, 3),
        }
    }
}

// =============================================================================
// SessionError
// =============================================================================

/// Errors tied to the lifecycle of a [`SessionContext`](crate::session::SessionContext).
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// A descriptor built for an earlier session was used with a newer one.
    #[error(
        "Descriptor for '{command}' belongs to session generation {descriptor_generation}, current is {current_generation}"
    )]
    StaleDescriptor {
        /// Command name.
        command: String,
        /// Generation the descriptor was built for.
        descriptor_generation: u64,
        /// Generation of the session in use.
        current_generation: u64,
    },

    /// The session context was invalidated by a reconnect.
    #[error("Session context generation {generation} has been invalidated")]
    Invalidated {
        /// Generation of the invalidated context.
        generation: u64,
    },
}

impl SessionError {
    /// Creates a stale descriptor error.
    pub fn stale(command: impl Into<String>, descriptor_generation: u64, current_generation: u64) -> Self {
        Self::StaleDescriptor {
            command: command.into(),
            descriptor_generation,
            current_generation,
        }
    }

    /// Returns `true` if the host could retry after rebinding.
    pub fn is_retryable(&self) -> bool {
        true
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::StaleDescriptor { .. } => ErrorCode::new(5, 1),
            Self::Invalidated { .. } => ErrorCode::new(5, 2),
        }
    }
}

// =============================================================================
// DecodeError
// =============================================================================

/// A result payload decoding failure.
///
/// Carries the byte offset where the failing read started, the field being
/// read and whatever header fields were fully decoded before the fault.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    /// What went wrong.
    pub kind: DecodeErrorKind,
    /// Byte offset within the envelope body.
    pub offset: usize,
    /// Field being decoded, if known.
    pub field: Option<String>,
    /// Header fields read before the failure.
    pub partial: PartialHeader,
}

impl DecodeError {
    /// Creates a decode error at the given offset.
    pub fn new(kind: DecodeErrorKind, offset: usize) -> Self {
        Self {
            kind,
            offset,
            field: None,
            partial: PartialHeader::default(),
        }
    }

    /// Creates a malformed envelope error.
    pub fn malformed_envelope(reason: impl Into<String>) -> Self {
        Self::new(
            DecodeErrorKind::MalformedEnvelope {
                reason: reason.into(),
            },
            0,
        )
    }

    /// Sets the field being decoded.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Attaches the partially decoded header.
    pub fn with_partial(mut self, partial: PartialHeader) -> Self {
        self.partial = partial;
        self
    }

    /// Returns `true` if the buffer ended before decoding finished.
    pub fn is_truncated(&self) -> bool {
        matches!(self.kind, DecodeErrorKind::TruncatedBuffer { .. })
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        let code = match self.kind {
            DecodeErrorKind::MalformedEnvelope { .. } => 1,
            DecodeErrorKind::TruncatedBuffer { .. } => 2,
            DecodeErrorKind::UnknownEnumValue { .. } => 3,
            DecodeErrorKind::UnknownEnumType { .. } => 4,
            DecodeErrorKind::InvalidString { .. } => 5,
            DecodeErrorKind::InvalidLength { .. } => 6,
            DecodeErrorKind::InvalidValue { .. } => 7,
            DecodeErrorKind::TrailingBytes { .. } => 8,
            DecodeErrorKind::SchemaMismatch { .. } => 9,
        };
        ErrorCode::new(7, code)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decode error at offset {}", self.offset)?;
        if let Some(field) = &self.field {
            write!(f, " in field '{}'", field)?;
        }
        write!(f, ": {}", self.kind)
    }
}

impl std::error::Error for DecodeError {}

/// Kinds of decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    /// The raw value is not a binary-bodied extension object.
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// What is wrong with the envelope.
        reason: String,
    },

    /// A read needed more bytes than remain.
    #[error("truncated buffer: needed {needed} bytes, {remaining} remaining")]
    TruncatedBuffer {
        /// Bytes the read required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// An enumerated ordinal has no entry in its enum table.
    #[error("unknown value {ordinal} for enumeration '{type_name}'")]
    UnknownEnumValue {
        /// Enum type name.
        type_name: String,
        /// Ordinal read from the wire.
        ordinal: i32,
    },

    /// No enum table is defined for the type in any active scope.
    #[error("enumeration '{type_name}' is not defined in namespace '{namespace}'")]
    UnknownEnumType {
        /// Innermost namespace searched.
        namespace: String,
        /// Enum type name.
        type_name: String,
    },

    /// String bytes are not valid UTF-8.
    #[error("invalid string: {reason}")]
    InvalidString {
        /// UTF-8 failure.
        reason: String,
    },

    /// A length or count prefix is negative (other than the null marker).
    #[error("invalid length prefix {length}")]
    InvalidLength {
        /// Length read from the wire.
        length: i32,
    },

    /// A scalar is outside the range its type allows.
    #[error("invalid value: {reason}")]
    InvalidValue {
        /// What is wrong.
        reason: String,
    },

    /// Bytes were left over after the declared fields.
    #[error("{count} trailing bytes after the last declared field")]
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },

    /// Decoded fields do not fit the declared result family.
    #[error("schema mismatch: {reason}")]
    SchemaMismatch {
        /// What does not fit.
        reason: String,
    },
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational.
    Info,
    /// Action may be required.
    Warning,
    /// Action required, but recoverable.
    Error,
    /// Immediate action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code, formatted as `CMD-XXYY`.
///
/// Categories:
/// - 1: Resolve
/// - 2: Catalog
/// - 3: Argument
/// - 4: Transport
/// - 5: Session
/// - 6: Server status
/// - 7: Decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category.
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CMD-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::MethodResult;

    #[test]
    fn test_unknown_command_not_retryable() {
        let error = CommandError::unknown_command("Fly");
        assert!(!error.is_retryable());
        assert_eq!(error.category(), "catalog");
        assert!(error.to_string().contains("Fly"));
    }

    #[test]
    fn test_transport_timeout_is_retryable() {
        let error: CommandError = TransportError::timeout("call", Duration::from_secs(5)).into();
        assert!(error.is_retryable());
        assert_eq!(error.error_code().to_string(), "CMD-0402");
    }

    #[test]
    fn test_resolve_error_with_resolved_prefix() {
        let error = ResolveError::not_found("ns=2;i=10", "Methods")
            .with_resolved(vec!["ViCellBluStateObject".to_string()]);
        match error {
            ResolveError::NotFound { resolved, .. } => {
                assert_eq!(resolved, vec!["ViCellBluStateObject".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_argument_mismatch_message() {
        let error = ArgumentError::type_mismatch("DeleteCellType", 0, "name", "String", "Int32");
        let text = error.to_string();
        assert!(text.contains("argument 0"));
        assert!(text.contains("'name'"));
        assert!(text.contains("expected String, got Int32"));
    }

    #[test]
    fn test_decode_error_display() {
        let error = DecodeError::new(
            DecodeErrorKind::TruncatedBuffer {
                needed: 4,
                remaining: 1,
            },
            12,
        )
        .with_field("responseDescription");

        assert!(error.is_truncated());
        assert_eq!(
            error.to_string(),
            "Decode error at offset 12 in field 'responseDescription': truncated buffer: needed 4 bytes, 1 remaining"
        );
    }

    #[test]
    fn test_decode_error_exposes_partial_header() {
        let error: CommandError = DecodeError::malformed_envelope("not an extension object").into();
        assert!(error.partial_header().is_some());
        assert!(CommandError::unknown_command("x").partial_header().is_none());
    }

    #[test]
    fn test_server_status_keeps_decode_failure() {
        let mut partial = PartialHeader::default();
        partial.method_result = Some(MethodResult::Failure);
        partial.response_description = Some("disk offline".to_string());
        let mut decode = DecodeError::new(
            DecodeErrorKind::TruncatedBuffer {
                needed: 8,
                remaining: 0,
            },
            11,
        );
        decode.partial = partial;

        let error = CommandError::server_status(
            "GetAvailableDiskSpace",
            StatusCode::BAD_NOT_EXECUTABLE,
            Some(Err(decode)),
            vec![],
        );
        let header = error.partial_header().expect("partial header kept");
        assert_eq!(header.response_description.as_deref(), Some("disk offline"));
        assert!(matches!(error, CommandError::ServerStatus { result: None, decode_error: Some(_), .. }));

        let no_outputs = CommandError::server_status("Stop", StatusCode::BAD_NOT_EXECUTABLE, None, vec![]);
        assert!(no_outputs.partial_header().is_none());
    }

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::new(1, 2).to_string(), "CMD-0102");
        assert_eq!(ErrorCode::new(7, 9).as_u16(), 0x0709);
    }
}
