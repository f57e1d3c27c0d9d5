// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Simulated Instrument Server
//!
//! [`SimulatedServer`] implements [`Session`] over an in-memory address
//! space. Browse results can be split into pages, calls are counted and
//! recorded, and every method answers with a canned [`CallResponse`].
//!
//! ```text
//! Objects (i=85)
//! └── ViCellBluStateObject
//!     ├── Methods        RequestLock, ReleaseLock, ...
//!     └── PlayControl    Pause, Resume, Stop, ...
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use opcmd_core::catalog::INSTRUMENT_NAMESPACE;
use opcmd_core::session::{BrowsePage, BrowseRequest, CallRequest, CallResponse, ContinuationPoint};
use opcmd_core::types::NodeIdentifier;
use opcmd_core::{
    DecodedResult, ExpandedNodeId, MethodCatalog, NamespaceTable, NodeClass, NodeId, NodeRef,
    ResultEncoder, Session, StatusCode, TransportError,
};

/// First numeric identifier handed out to simulated nodes.
const FIRST_NODE_ID: u32 = 1000;

/// Type id stamped on encoded result envelopes.
const RESULT_TYPE_ID: u32 = 9000;

// =============================================================================
// SimulatedServer
// =============================================================================

/// In-memory instrument server.
pub struct SimulatedServer {
    namespace_uri: String,
    children: RwLock<HashMap<NodeId, Vec<NodeRef>>>,
    methods: RwLock<HashMap<String, NodeId>>,
    replies: RwLock<HashMap<NodeId, CallResponse>>,
    continuations: Mutex<HashMap<Vec<u8>, (NodeId, usize)>>,
    call_history: Mutex<Vec<CallRequest>>,
    call_latency: Mutex<Option<Duration>>,
    browse_latency: Mutex<Option<Duration>>,
    next_node: AtomicU32,
    next_token: AtomicU64,
    page_size: AtomicUsize,
    endless_paging: AtomicBool,
    connected: AtomicBool,
    browse_count: AtomicU64,
    browse_next_count: AtomicU64,
    release_count: AtomicU64,
    call_count: AtomicU64,
}

impl SimulatedServer {
    /// Creates an empty server whose nodes live in `namespace_uri`.
    pub fn new(namespace_uri: impl Into<String>) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            children: RwLock::new(HashMap::new()),
            methods: RwLock::new(HashMap::new()),
            replies: RwLock::new(HashMap::new()),
            continuations: Mutex::new(HashMap::new()),
            call_history: Mutex::new(Vec::new()),
            call_latency: Mutex::new(None),
            browse_latency: Mutex::new(None),
            next_node: AtomicU32::new(FIRST_NODE_ID),
            next_token: AtomicU64::new(1),
            page_size: AtomicUsize::new(0),
            endless_paging: AtomicBool::new(false),
            connected: AtomicBool::new(true),
            browse_count: AtomicU64::new(0),
            browse_next_count: AtomicU64::new(0),
            release_count: AtomicU64::new(0),
            call_count: AtomicU64::new(0),
        }
    }

    /// Creates a server exposing one method node per catalog command.
    pub fn from_catalog(catalog: &MethodCatalog) -> Arc<Self> {
        let server = Self::new(INSTRUMENT_NAMESPACE);
        for command in catalog.commands() {
            let parent = server.add_path(&command.object_path);
            server.add_method(&parent, command.method_name());
        }
        Arc::new(server)
    }

    /// Creates a server exposing the builtin instrument tree.
    pub fn instrument() -> Arc<Self> {
        Self::from_catalog(&MethodCatalog::builtin())
    }

    // =========================================================================
    // Address space
    // =========================================================================

    /// Adds a child node unconditionally and returns its local id.
    pub fn add_node(&self, parent: &NodeId, name: &str, class: NodeClass) -> NodeId {
        let id = self.next_node.fetch_add(1, Ordering::Relaxed);
        let reference = NodeRef::new(
            ExpandedNodeId::with_uri(self.namespace_uri.clone(), NodeIdentifier::Numeric(id)),
            format!("1:{}", name).as_str(),
            name,
            class,
        );
        self.children
            .write()
            .entry(parent.clone())
            .or_default()
            .push(reference);
        NodeId::numeric(1, id)
    }

    /// Adds `count` filler objects ahead of any later children of `parent`.
    pub fn add_fillers(&self, parent: &NodeId, count: usize) {
        for index in 0..count {
            self.add_node(parent, &format!("Filler{:03}", index), NodeClass::Object);
        }
    }

    /// Returns the object named `name` under `parent`, creating it if absent.
    pub fn add_object(&self, parent: &NodeId, name: &str) -> NodeId {
        if let Some(existing) = self.child_id(parent, name) {
            return existing;
        }
        self.add_node(parent, name, NodeClass::Object)
    }

    /// Creates the objects along `path` below the Objects folder.
    pub fn add_path<S: AsRef<str>>(&self, path: &[S]) -> NodeId {
        path.iter().fold(NodeId::OBJECTS_FOLDER, |parent, name| {
            self.add_object(&parent, name.as_ref())
        })
    }

    /// Adds a method node. The first method registered under a name is the
    /// one replies are attached to.
    pub fn add_method(&self, parent: &NodeId, name: &str) -> NodeId {
        let id = self.add_node(parent, name, NodeClass::Method);
        self.methods
            .write()
            .entry(name.to_string())
            .or_insert_with(|| id.clone());
        id
    }

    /// Local id of the method registered under `name`.
    pub fn method_id(&self, name: &str) -> Option<NodeId> {
        self.methods.read().get(name).cloned()
    }

    fn child_id(&self, parent: &NodeId, name: &str) -> Option<NodeId> {
        let table = self.namespace_table();
        self.children
            .read()
            .get(parent)?
            .iter()
            .find(|r| r.matches_name(name))
            .and_then(|r| r.node_id.to_local(&table).ok())
    }

    // =========================================================================
    // Behaviour
    // =========================================================================

    /// Splits browse results into pages of `size` references; zero serves
    /// everything in one page.
    pub fn set_page_size(&self, size: usize) {
        self.page_size.store(size, Ordering::Relaxed);
    }

    /// Makes every page hand out a new continuation point.
    pub fn set_endless_paging(&self, endless: bool) {
        self.endless_paging.store(endless, Ordering::Relaxed);
    }

    /// Delays every call.
    pub fn set_call_latency(&self, latency: Duration) {
        *self.call_latency.lock() = Some(latency);
    }

    /// Delays every browse request.
    pub fn set_browse_latency(&self, latency: Duration) {
        *self.browse_latency.lock() = Some(latency);
    }

    /// Makes browse and call fail as if the connection dropped.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    /// Sets the response for a method.
    ///
    /// # Panics
    ///
    /// Panics if no method is registered under `method`.
    pub fn reply(&self, method: &str, response: CallResponse) {
        let id = self
            .method_id(method)
            .unwrap_or_else(|| panic!("no simulated method named '{}'", method));
        self.replies.write().insert(id, response);
    }

    /// Answers `command` with a good status and `result` encoded as its
    /// first output.
    ///
    /// # Panics
    ///
    /// Panics if the command is not cataloged or the result does not fit
    /// its schema.
    pub fn reply_with_result(&self, catalog: &MethodCatalog, command: &str, result: &DecodedResult) {
        let spec = catalog.lookup(command).expect("command is cataloged");
        let envelope = ResultEncoder::new(catalog.dictionary())
            .encode_envelope(result, &spec.output, NodeId::numeric(1, RESULT_TYPE_ID))
            .expect("result fits the command schema");
        self.reply(spec.method_name(), CallResponse::good(vec![envelope]));
    }

    /// Answers `method` with a bad status and no outputs.
    pub fn reply_status(&self, method: &str, status: StatusCode) {
        self.reply(method, CallResponse::bad(status));
    }

    // =========================================================================
    // Counters
    // =========================================================================

    /// Number of browse requests served.
    pub fn browse_calls(&self) -> u64 {
        self.browse_count.load(Ordering::Relaxed)
    }

    /// Number of browse-next requests served.
    pub fn browse_next_calls(&self) -> u64 {
        self.browse_next_count.load(Ordering::Relaxed)
    }

    /// Number of continuation points released by the client.
    pub fn released(&self) -> u64 {
        self.release_count.load(Ordering::Relaxed)
    }

    /// Number of method calls received.
    pub fn calls(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Continuation points handed out and not yet consumed or released.
    pub fn open_continuations(&self) -> usize {
        self.continuations.lock().len()
    }

    /// Calls received, oldest first.
    pub fn call_history(&self) -> Vec<CallRequest> {
        self.call_history.lock().clone()
    }

    /// Resets every counter and the call history.
    pub fn reset_counters(&self) {
        self.browse_count.store(0, Ordering::Relaxed);
        self.browse_next_count.store(0, Ordering::Relaxed);
        self.release_count.store(0, Ordering::Relaxed);
        self.call_count.store(0, Ordering::Relaxed);
        self.call_history.lock().clear();
    }

    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    fn page(&self, parent: &NodeId, start: usize) -> BrowsePage {
        let all = self.children.read().get(parent).cloned().unwrap_or_default();
        let size = match self.page_size.load(Ordering::Relaxed) {
            0 => all.len().max(1),
            size => size,
        };
        let end = (start + size).min(all.len());
        let references = all[start.min(end)..end].to_vec();

        if end < all.len() || self.endless_paging.load(Ordering::Relaxed) {
            let token = self.next_token.fetch_add(1, Ordering::Relaxed).to_be_bytes().to_vec();
            self.continuations.lock().insert(token.clone(), (parent.clone(), end));
            BrowsePage::more(references, ContinuationPoint(token))
        } else {
            BrowsePage::last(references)
        }
    }
}

impl Default for SimulatedServer {
    fn default() -> Self {
        Self::new(INSTRUMENT_NAMESPACE)
    }
}

#[async_trait]
impl Session for SimulatedServer {
    fn namespace_table(&self) -> NamespaceTable {
        NamespaceTable::with_server_uris([self.namespace_uri.clone()])
    }

    async fn browse(&self, request: &BrowseRequest) -> Result<BrowsePage, TransportError> {
        self.browse_count.fetch_add(1, Ordering::Relaxed);
        self.ensure_connected()?;
        let latency = *self.browse_latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.page(&request.node_id, 0))
    }

    async fn browse_next(&self, continuation: &ContinuationPoint) -> Result<BrowsePage, TransportError> {
        self.browse_next_count.fetch_add(1, Ordering::Relaxed);
        self.ensure_connected()?;
        let entry = self.continuations.lock().remove(&continuation.0);
        let (parent, start) =
            entry.ok_or_else(|| TransportError::failed("browse_next", "unknown continuation point"))?;
        Ok(self.page(&parent, start))
    }

    async fn release_continuation(&self, continuation: &ContinuationPoint) -> Result<(), TransportError> {
        self.release_count.fetch_add(1, Ordering::Relaxed);
        self.continuations.lock().remove(&continuation.0);
        Ok(())
    }

    async fn call(&self, request: CallRequest) -> Result<CallResponse, TransportError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.call_history.lock().push(request.clone());
        self.ensure_connected()?;

        let latency = *self.call_latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(reply) = self.replies.read().get(&request.method_id) {
            return Ok(reply.clone());
        }
        let known = self.methods.read().values().any(|id| *id == request.method_id);
        Ok(if known {
            CallResponse::good(Vec::new())
        } else {
            CallResponse::bad(StatusCode::BAD_METHOD_INVALID)
        })
    }

    fn display_name(&self) -> String {
        format!("simulated {}", self.namespace_uri)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_tree() {
        let server = SimulatedServer::instrument();
        let state = server.child_id(&NodeId::OBJECTS_FOLDER, "ViCellBluStateObject");
        assert!(state.is_some());
        assert!(server.method_id("RequestLock").is_some());
        assert!(server.method_id("GetAvailableDiskSpace").is_some());
        assert!(server.method_id("Reboot").is_none());
    }

    #[tokio::test]
    async fn test_paging_hands_out_continuations() {
        let server = SimulatedServer::new(INSTRUMENT_NAMESPACE);
        server.add_fillers(&NodeId::OBJECTS_FOLDER, 5);
        server.set_page_size(2);

        let request = BrowseRequest::children_of(NodeId::OBJECTS_FOLDER);
        let first = server.browse(&request).await.unwrap();
        assert_eq!(first.references.len(), 2);
        let token = first.continuation.unwrap();
        assert_eq!(server.open_continuations(), 1);

        let second = server.browse_next(&token).await.unwrap();
        assert_eq!(second.references.len(), 2);
        assert!(server.browse_next(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_method_is_bad() {
        let server = SimulatedServer::instrument();
        let response = server
            .call(CallRequest {
                object_id: NodeId::OBJECTS_FOLDER,
                method_id: NodeId::numeric(1, 1),
                input_arguments: vec![],
            })
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::BAD_METHOD_INVALID);
        assert_eq!(server.calls(), 1);
    }
}
