// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The session capability consumed by the core, and the per-session context.
//!
//! Connection setup, secure channels and authentication live outside this
//! crate. A transport hands the core something implementing [`Session`]; the
//! core wraps it in a [`SessionContext`] that snapshots the namespace table
//! and carries a generation number used to reject stale method descriptors.
//!
//! ```text
//! ┌────────────────┐  browse / browse_next / call  ┌──────────────────┐
//! │ AddressResolver│ ─────────────────────────────▶│  dyn Session     │
//! │ Invoker        │                               │  (transport)     │
//! └────────────────┘                               └──────────────────┘
//!         ▲
//!         │ generation, namespaces, invalidated
//! ┌────────────────┐
//! │ SessionContext │
//! └────────────────┘
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, TransportError};
use crate::types::{DiagnosticInfo, NamespaceTable, NodeClass, NodeId, NodeRef, StatusCode, TaggedValue};

// =============================================================================
// Requests & Responses
// =============================================================================

/// A one-level forward browse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseRequest {
    /// Node whose children are listed.
    pub node_id: NodeId,
    /// Reference type followed.
    pub reference_type: NodeId,
    /// Follow subtypes of `reference_type`.
    pub include_subtypes: bool,
    /// Node class filter mask; zero means all classes.
    pub node_class_mask: u32,
    /// Maximum references per page; zero lets the server decide.
    pub max_references_per_page: u32,
}

impl BrowseRequest {
    /// Hierarchical children of `node_id` that are objects, variables or methods.
    pub fn children_of(node_id: NodeId) -> Self {
        Self {
            node_id,
            reference_type: NodeId::HIERARCHICAL_REFERENCES,
            include_subtypes: true,
            node_class_mask: NodeClass::addressable_mask(),
            max_references_per_page: 0,
        }
    }

    /// Sets the page size hint.
    pub fn with_max_references(mut self, max: u32) -> Self {
        self.max_references_per_page = max;
        self
    }
}

/// Opaque server token for fetching the next browse page.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContinuationPoint(pub Vec<u8>);

impl fmt::Debug for ContinuationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContinuationPoint(<{} bytes>)", self.0.len())
    }
}

/// One page of browse results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowsePage {
    /// References on this page.
    pub references: Vec<NodeRef>,
    /// Token for the next page; `None` on the last page.
    pub continuation: Option<ContinuationPoint>,
}

impl BrowsePage {
    /// A final page.
    pub fn last(references: Vec<NodeRef>) -> Self {
        Self {
            references,
            continuation: None,
        }
    }

    /// A page followed by more.
    pub fn more(references: Vec<NodeRef>, continuation: ContinuationPoint) -> Self {
        Self {
            references,
            continuation: Some(continuation),
        }
    }
}

/// One method invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    /// Object that owns the method.
    pub object_id: NodeId,
    /// Method node.
    pub method_id: NodeId,
    /// Encoded input arguments, in declaration order.
    pub input_arguments: Vec<TaggedValue>,
}

/// Server response to one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallResponse {
    /// Overall call status.
    pub status: StatusCode,
    /// Output arguments.
    pub outputs: Vec<TaggedValue>,
    /// Per-input validation results.
    pub input_argument_results: Vec<StatusCode>,
    /// Diagnostics returned with the call.
    pub diagnostics: Vec<DiagnosticInfo>,
}

impl CallResponse {
    /// A good response carrying `outputs`.
    pub fn good(outputs: Vec<TaggedValue>) -> Self {
        Self {
            status: StatusCode::GOOD,
            outputs,
            ..Default::default()
        }
    }

    /// A response with a bad status and no outputs.
    pub fn bad(status: StatusCode) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }
}

// =============================================================================
// Session Trait
// =============================================================================

/// Transport operations the core needs from an established session.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the core holds them behind an
/// `Arc` and awaits one operation at a time.
#[async_trait]
pub trait Session: Send + Sync {
    /// Namespace URIs of this session, index order.
    fn namespace_table(&self) -> NamespaceTable;

    /// Browses one page of references.
    async fn browse(&self, request: &BrowseRequest) -> Result<BrowsePage, TransportError>;

    /// Fetches the page following `continuation`.
    async fn browse_next(
        &self,
        continuation: &ContinuationPoint,
    ) -> Result<BrowsePage, TransportError>;

    /// Releases a continuation point that will not be followed.
    async fn release_continuation(
        &self,
        _continuation: &ContinuationPoint,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    /// Invokes one method.
    async fn call(&self, request: CallRequest) -> Result<CallResponse, TransportError>;

    /// Name used in log output.
    fn display_name(&self) -> String {
        "session".to_string()
    }
}

// =============================================================================
// SessionContext
// =============================================================================

/// One established session as seen by the core.
///
/// Created when a session is bound. The namespace table is captured once;
/// descriptors resolved through this context carry its generation and are
/// rejected once a newer context replaces it.
pub struct SessionContext {
    session: Arc<dyn Session>,
    namespaces: NamespaceTable,
    generation: u64,
    invalidated: AtomicBool,
    established_at: DateTime<Utc>,
}

impl SessionContext {
    /// Creates a context for `session` with the given generation.
    pub fn new(session: Arc<dyn Session>, generation: u64) -> Self {
        let namespaces = session.namespace_table();
        Self {
            session,
            namespaces,
            generation,
            invalidated: AtomicBool::new(false),
            established_at: Utc::now(),
        }
    }

    /// The underlying session.
    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Namespace table captured at creation.
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Generation number.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the context was created.
    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }

    /// Returns `true` until [`Self::invalidate`] is called.
    pub fn is_valid(&self) -> bool {
        !self.invalidated.load(Ordering::Acquire)
    }

    /// Marks the context as replaced.
    pub fn invalidate(&self) {
        if !self.invalidated.swap(true, Ordering::AcqRel) {
            tracing::debug!(
                session = %self.session.display_name(),
                generation = self.generation,
                "Session context invalidated"
            );
        }
    }

    /// Fails with [`SessionError::Invalidated`] once invalidated.
    pub fn ensure_valid(&self) -> Result<(), SessionError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(SessionError::Invalidated {
                generation: self.generation,
            })
        }
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("session", &self.session.display_name())
            .field("namespaces", &self.namespaces.len())
            .field("generation", &self.generation)
            .field("valid", &self.is_valid())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptySession;

    #[async_trait]
    impl Session for EmptySession {
        fn namespace_table(&self) -> NamespaceTable {
            NamespaceTable::with_server_uris(["urn:test"])
        }

        async fn browse(&self, _request: &BrowseRequest) -> Result<BrowsePage, TransportError> {
            Ok(BrowsePage::default())
        }

        async fn browse_next(
            &self,
            _continuation: &ContinuationPoint,
        ) -> Result<BrowsePage, TransportError> {
            Err(TransportError::failed("browse_next", "no continuation issued"))
        }

        async fn call(&self, _request: CallRequest) -> Result<CallResponse, TransportError> {
            Ok(CallResponse::bad(StatusCode::BAD_METHOD_INVALID))
        }
    }

    #[test]
    fn test_context_captures_namespaces() {
        let context = SessionContext::new(Arc::new(EmptySession), 3);
        assert_eq!(context.generation(), 3);
        assert_eq!(context.namespaces().index_of("urn:test"), Some(1));
        assert!(context.is_valid());
    }

    #[test]
    fn test_invalidate_is_sticky() {
        let context = SessionContext::new(Arc::new(EmptySession), 1);
        context.invalidate();
        context.invalidate();
        assert!(!context.is_valid());
        assert!(matches!(
            context.ensure_valid(),
            Err(SessionError::Invalidated { generation: 1 })
        ));
    }

    #[test]
    fn test_children_request_mask() {
        let request = BrowseRequest::children_of(NodeId::OBJECTS_FOLDER);
        assert_eq!(request.node_class_mask, 1 | 2 | 4);
        assert_eq!(request.reference_type, NodeId::HIERARCHICAL_REFERENCES);
    }

    #[tokio::test]
    async fn test_default_release_is_noop() {
        let session = EmptySession;
        let point = ContinuationPoint(vec![1, 2]);
        assert!(session.release_continuation(&point).await.is_ok());
        assert_eq!(format!("{:?}", point), "ContinuationPoint(<2 bytes>)");
    }
}
