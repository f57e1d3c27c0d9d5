// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command client facade.
//!
//! [`CommandClient`] owns a [`MethodCatalog`] and the registry resolved for
//! the session currently bound to it. Executing a command runs the whole
//! pipeline:
//!
//! ```text
//! execute(name, args)
//!     │
//!     ├─▶ MethodCatalog::lookup        UnknownCommand, no round trip
//!     ├─▶ MethodRegistry::descriptor   recorded resolution failure
//!     ├─▶ Invoker::invoke              ArgumentMismatch, Transport, Session
//!     └─▶ ResultDecoder::decode        first output only
//!             │
//!             ▼
//!       CommandOutcome { status, result, diagnostics }
//! ```
//!
//! # Rebinding
//!
//! [`CommandClient::rebind`] resolves the catalog against a new session and
//! swaps the `(SessionContext, MethodRegistry)` pair in one step. The
//! previous context is invalidated, so descriptors taken from the old
//! registry are rejected instead of being sent with addresses from another
//! session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::catalog::MethodCatalog;
use crate::decoder::{DecoderOptions, ResultDecoder};
use crate::error::{
    ArgumentError, CommandError, CommandResult, DecodeError, SessionError, TransportError,
};
use crate::invoker::{InvocationOutcome, Invoker};
use crate::registry::{MethodDescriptor, MethodRegistry};
use crate::resolver::ResolverOptions;
use crate::result::DecodedResult;
use crate::session::{Session, SessionContext};
use crate::types::{DiagnosticInfo, StatusCode, TaggedValue};

// =============================================================================
// Options
// =============================================================================

/// Runtime options for a [`CommandClient`].
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Address resolution options.
    pub resolver: ResolverOptions,
    /// Result decoding options.
    pub decoder: DecoderOptions,
    /// Per-call timeout; `None` leaves timing to the transport.
    pub call_timeout: Option<Duration>,
}

impl ClientOptions {
    /// Sets resolver options.
    pub fn with_resolver(mut self, resolver: ResolverOptions) -> Self {
        self.resolver = resolver;
        self
    }

    /// Sets decoder options.
    pub fn with_decoder(mut self, decoder: DecoderOptions) -> Self {
        self.decoder = decoder;
        self
    }

    /// Sets the call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}

// =============================================================================
// CommandOutcome
// =============================================================================

/// Result of one executed command.
///
/// A bad status is not an error here: the outcome keeps the status, any
/// decoded result and the diagnostics. Use [`Self::into_result`] to fold a
/// bad status into [`CommandError::ServerStatus`].
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Command name.
    pub command: String,
    /// Call status.
    pub status: StatusCode,
    /// Decoded first output; `None` if the server returned no outputs.
    pub result: Option<Result<DecodedResult, DecodeError>>,
    /// Diagnostics returned with the call.
    pub diagnostics: Vec<DiagnosticInfo>,
    /// Call duration.
    pub elapsed: Duration,
}

impl CommandOutcome {
    /// Returns `true` for a good status.
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }

    /// Decoded result, if one decoded cleanly.
    pub fn decoded(&self) -> Option<&DecodedResult> {
        self.result.as_ref().and_then(|r| r.as_ref().ok())
    }

    /// Converts the outcome into the decoded result.
    ///
    /// # Errors
    ///
    /// - [`CommandError::ServerStatus`] for a bad status, carrying the decoded
    ///   result or the decode failure with its partial header, and the
    ///   diagnostics
    /// - [`CommandError::Decode`] if the first output failed to decode or no
    ///   output came back with a good status
    pub fn into_result(self) -> CommandResult<DecodedResult> {
        if self.status.is_bad() {
            return Err(CommandError::server_status(
                self.command,
                self.status,
                self.result,
                self.diagnostics,
            ));
        }
        match self.result {
            Some(Ok(result)) => Ok(result),
            Some(Err(error)) => Err(error.into()),
            None => Err(DecodeError::malformed_envelope("no output arguments returned").into()),
        }
    }
}

// =============================================================================
// ClientStatistics
// =============================================================================

/// Execution counters.
#[derive(Debug, Default)]
pub struct ClientStatistics {
    executions: AtomicU64,
    rejected: AtomicU64,
    bad_status: AtomicU64,
    decode_failures: AtomicU64,
    rebinds: AtomicU64,
}

impl ClientStatistics {
    /// Commands that reached the server.
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    /// Commands rejected before any call was made.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Calls answered with a bad status.
    pub fn bad_status(&self) -> u64 {
        self.bad_status.load(Ordering::Relaxed)
    }

    /// Outputs that failed to decode.
    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    /// Sessions bound over the client's lifetime.
    pub fn rebinds(&self) -> u64 {
        self.rebinds.load(Ordering::Relaxed)
    }

    /// Resets all counters.
    pub fn reset(&self) {
        self.executions.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.bad_status.store(0, Ordering::Relaxed);
        self.decode_failures.store(0, Ordering::Relaxed);
        self.rebinds.store(0, Ordering::Relaxed);
    }
}

// =============================================================================
// CommandClient
// =============================================================================

#[derive(Debug)]
struct Binding {
    context: Arc<SessionContext>,
    registry: Arc<MethodRegistry>,
}

/// Executes catalog commands against the currently bound session.
#[derive(Debug)]
pub struct CommandClient {
    catalog: Arc<MethodCatalog>,
    options: ClientOptions,
    generation: AtomicU64,
    binding: RwLock<Option<Arc<Binding>>>,
    stats: ClientStatistics,
}

impl CommandClient {
    /// Creates an unbound client.
    pub fn new(catalog: MethodCatalog, options: ClientOptions) -> Self {
        Self {
            catalog: Arc::new(catalog),
            options,
            generation: AtomicU64::new(0),
            binding: RwLock::new(None),
            stats: ClientStatistics::default(),
        }
    }

    /// Creates a client and binds `session`.
    ///
    /// # Errors
    ///
    /// See [`Self::rebind`].
    pub async fn connect(
        catalog: MethodCatalog,
        options: ClientOptions,
        session: Arc<dyn Session>,
    ) -> CommandResult<Self> {
        let client = Self::new(catalog, options);
        client.rebind(session).await?;
        Ok(client)
    }

    /// Command catalog.
    pub fn catalog(&self) -> &MethodCatalog {
        &self.catalog
    }

    /// Client options.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Execution counters.
    pub fn statistics(&self) -> &ClientStatistics {
        &self.stats
    }

    /// Binds a new session, replacing and invalidating the current one.
    ///
    /// The catalog is resolved against `session` before the swap; while that
    /// runs, the previous binding keeps serving commands.
    ///
    /// # Errors
    ///
    /// [`SessionError::Invalidated`] if the new context is invalidated during
    /// the build, or if a rebind that started later has already installed
    /// its session. Per-command resolution failures do not fail the rebind.
    pub async fn rebind(&self, session: Arc<dyn Session>) -> CommandResult<Arc<MethodRegistry>> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let context = Arc::new(SessionContext::new(session, generation));
        let registry = Arc::new(
            MethodRegistry::build(Arc::clone(&context), &self.catalog, self.options.resolver.clone())
                .await?,
        );

        let previous = {
            let mut binding = self.binding.write();
            let current = binding.as_ref().map(|b| b.context.generation());
            if current.is_some_and(|current| current > generation) {
                drop(binding);
                context.invalidate();
                tracing::info!(generation, current, "Rebind superseded by a newer session");
                return Err(SessionError::Invalidated { generation }.into());
            }
            binding.replace(Arc::new(Binding {
                context: Arc::clone(&context),
                registry: Arc::clone(&registry),
            }))
        };
        if let Some(previous) = &previous {
            previous.context.invalidate();
        }
        self.stats.rebinds.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            session = %context.session().display_name(),
            generation,
            previous = previous.as_ref().map(|b| b.context.generation()),
            resolved = registry.len(),
            "Session bound"
        );
        Ok(registry)
    }

    /// Drops the current binding and invalidates its context.
    pub fn unbind(&self) {
        if let Some(previous) = self.binding.write().take() {
            previous.context.invalidate();
            tracing::info!(generation = previous.context.generation(), "Session unbound");
        }
    }

    /// Returns `true` while a session is bound.
    pub fn is_bound(&self) -> bool {
        self.binding.read().is_some()
    }

    /// Registry of the bound session.
    pub fn registry(&self) -> Option<Arc<MethodRegistry>> {
        self.current().map(|b| Arc::clone(&b.registry))
    }

    /// Context of the bound session.
    pub fn context(&self) -> Option<Arc<SessionContext>> {
        self.current().map(|b| Arc::clone(&b.context))
    }

    fn current(&self) -> Option<Arc<Binding>> {
        self.binding.read().clone()
    }

    fn invoker(&self, context: Arc<SessionContext>) -> Invoker {
        let invoker = Invoker::new(context);
        match self.options.call_timeout {
            Some(timeout) => invoker.with_timeout(timeout),
            None => invoker,
        }
    }

    /// Invokes a descriptor against the bound session without decoding.
    ///
    /// # Errors
    ///
    /// [`SessionError::StaleDescriptor`](crate::error::SessionError::StaleDescriptor)
    /// if `descriptor` came from an earlier binding, otherwise as for
    /// [`Invoker::invoke`].
    pub async fn invoke(
        &self,
        descriptor: &MethodDescriptor,
        arguments: Vec<TaggedValue>,
    ) -> CommandResult<InvocationOutcome> {
        let binding = self.current().ok_or(TransportError::NotConnected)?;
        self.invoker(Arc::clone(&binding.context))
            .invoke(descriptor, arguments)
            .await
    }

    /// Executes a command by name.
    ///
    /// # Errors
    ///
    /// Any failure before or during the call: unknown command, unresolved
    /// address, argument mismatch, stale session or transport failure. A bad
    /// status and a decode failure are reported in the returned
    /// [`CommandOutcome`].
    pub async fn execute(&self, name: &str, arguments: Vec<TaggedValue>) -> CommandResult<CommandOutcome> {
        let result = self.execute_inner(name, arguments).await;
        match &result {
            Ok(outcome) => {
                if outcome.status.is_bad() {
                    self.stats.bad_status.fetch_add(1, Ordering::Relaxed);
                }
                if matches!(outcome.result, Some(Err(_))) {
                    self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(CommandError::Transport(TransportError::NotConnected)) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            }
            Err(CommandError::Transport(_)) => {}
            Err(_) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }

    async fn execute_inner(&self, name: &str, arguments: Vec<TaggedValue>) -> CommandResult<CommandOutcome> {
        self.catalog.lookup(name)?;
        let binding = self.current().ok_or(TransportError::NotConnected)?;
        let descriptor = binding.registry.descriptor(name)?;

        let invocation = self
            .invoker(Arc::clone(&binding.context))
            .invoke(&descriptor, arguments)
            .await?;
        self.stats.executions.fetch_add(1, Ordering::Relaxed);

        let result = invocation.first_output().map(|raw| {
            ResultDecoder::with_options(self.catalog.dictionary(), self.options.decoder)
                .decode(raw, &descriptor.output)
        });
        if let Some(Err(error)) = &result {
            CommandError::Decode(error.clone()).log(name);
        }

        Ok(CommandOutcome {
            command: descriptor.name.clone(),
            status: invocation.status,
            result,
            diagnostics: invocation.diagnostics,
            elapsed: invocation.elapsed,
        })
    }

    /// Executes a command with arguments given as text.
    ///
    /// Each argument is parsed with [`WireType::parse_arg`](crate::types::WireType::parse_arg)
    /// for the declared input type.
    ///
    /// # Errors
    ///
    /// [`ArgumentError`] if the count is wrong or a value does not parse,
    /// otherwise as for [`Self::execute`].
    pub async fn execute_text<S: AsRef<str>>(&self, name: &str, arguments: &[S]) -> CommandResult<CommandOutcome> {
        let spec = self.catalog.lookup(name)?;
        if spec.inputs.len() != arguments.len() {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(ArgumentError::count_mismatch(name, spec.inputs.len(), arguments.len()).into());
        }
        let values = spec
            .inputs
            .iter()
            .zip(arguments)
            .map(|(input, text)| input.wire_type.parse_arg(text.as_ref()))
            .collect::<Result<Vec<_>, _>>();
        match values {
            Ok(values) => self.execute(name, values).await,
            Err(error) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                Err(error.into())
            }
        }
    }

    /// Executes a command and returns the decoded result.
    ///
    /// # Errors
    ///
    /// As for [`Self::execute`] and [`CommandOutcome::into_result`].
    pub async fn run(&self, name: &str, arguments: Vec<TaggedValue>) -> CommandResult<DecodedResult> {
        self.execute(name, arguments).await?.into_result()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{INSTRUMENT_NAMESPACE, METHODS_OBJECT, STATE_OBJECT};
    use crate::encoder::ResultEncoder;
    use crate::error::{CatalogError, SessionError};
    use crate::result::{CommonHeader, LockState, VariantTail};
    use crate::session::{BrowsePage, BrowseRequest, CallRequest, CallResponse, ContinuationPoint};
    use crate::types::{ExpandedNodeId, NamespaceTable, NodeClass, NodeId, NodeIdentifier, NodeRef};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    /// Serves the state object with a Methods folder holding the lock commands.
    struct LockSession {
        children: HashMap<NodeId, Vec<NodeRef>>,
        reply: Option<TaggedValue>,
        status: StatusCode,
        calls: AtomicUsize,
    }

    impl LockSession {
        fn new(status: StatusCode, reply: Option<TaggedValue>) -> Self {
            let method = |id: u32, name: &str, class: NodeClass| {
                NodeRef::new(
                    ExpandedNodeId::with_uri(INSTRUMENT_NAMESPACE, NodeIdentifier::Numeric(id)),
                    format!("1:{}", name).as_str(),
                    name,
                    class,
                )
            };
            let mut children = HashMap::new();
            children.insert(
                NodeId::OBJECTS_FOLDER,
                vec![method(1, STATE_OBJECT, NodeClass::Object)],
            );
            children.insert(
                NodeId::numeric(1, 1),
                vec![method(2, METHODS_OBJECT, NodeClass::Object)],
            );
            children.insert(
                NodeId::numeric(1, 2),
                vec![
                    method(10, "RequestLock", NodeClass::Method),
                    method(11, "DeleteCellType", NodeClass::Method),
                ],
            );
            Self {
                children,
                reply,
                status,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Session for LockSession {
        fn namespace_table(&self) -> NamespaceTable {
            NamespaceTable::with_server_uris([INSTRUMENT_NAMESPACE])
        }

        async fn browse(&self, request: &BrowseRequest) -> Result<BrowsePage, TransportError> {
            Ok(BrowsePage::last(
                self.children.get(&request.node_id).cloned().unwrap_or_default(),
            ))
        }

        async fn browse_next(&self, _c: &ContinuationPoint) -> Result<BrowsePage, TransportError> {
            Ok(BrowsePage::default())
        }

        async fn call(&self, _request: CallRequest) -> Result<CallResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CallResponse {
                status: self.status,
                outputs: self.reply.iter().cloned().collect(),
                ..Default::default()
            })
        }
    }

    fn locked_reply() -> TaggedValue {
        let catalog = MethodCatalog::builtin();
        let schema = &catalog.lookup("RequestLock").unwrap().output;
        ResultEncoder::new(catalog.dictionary())
            .encode_envelope(
                &DecodedResult::new(CommonHeader::success(), VariantTail::LockState(LockState::Locked)),
                schema,
                NodeId::numeric(1, 5001),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_execute_decodes_first_output() {
        let session = Arc::new(LockSession::new(StatusCode::GOOD, Some(locked_reply())));
        let client = CommandClient::connect(MethodCatalog::builtin(), ClientOptions::default(), session.clone())
            .await
            .unwrap();

        let result = client.run("RequestLock", vec![]).await.unwrap();
        assert_eq!(result.tail, VariantTail::LockState(LockState::Locked));
        assert_eq!(session.calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.statistics().executions(), 1);
    }

    #[tokio::test]
    async fn test_unknown_command_makes_no_call() {
        let session = Arc::new(LockSession::new(StatusCode::GOOD, None));
        let client = CommandClient::connect(MethodCatalog::builtin(), ClientOptions::default(), session.clone())
            .await
            .unwrap();

        let error = client.execute("Reboot", vec![]).await.unwrap_err();
        assert!(matches!(error, CommandError::Catalog(CatalogError::UnknownCommand { .. })));
        assert_eq!(session.calls.load(Ordering::SeqCst), 0);
        assert_eq!(client.statistics().rejected(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_command_reports_failure() {
        let session = Arc::new(LockSession::new(StatusCode::GOOD, None));
        let client = CommandClient::connect(MethodCatalog::builtin(), ClientOptions::default(), session.clone())
            .await
            .unwrap();

        let error = client.execute("Pause", vec![]).await.unwrap_err();
        assert!(matches!(error, CommandError::Resolve(_)));
        assert_eq!(session.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_status_without_outputs() {
        let session = Arc::new(LockSession::new(StatusCode::BAD_USER_ACCESS_DENIED, None));
        let client = CommandClient::connect(MethodCatalog::builtin(), ClientOptions::default(), session)
            .await
            .unwrap();

        let outcome = client.execute("RequestLock", vec![]).await.unwrap();
        assert!(!outcome.is_good());
        assert!(outcome.result.is_none());
        assert!(matches!(
            outcome.into_result(),
            Err(CommandError::ServerStatus { status: StatusCode::BAD_USER_ACCESS_DENIED, result: None, .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_text_parses_arguments() {
        let session = Arc::new(LockSession::new(StatusCode::GOOD, None));
        let client = CommandClient::connect(MethodCatalog::builtin(), ClientOptions::default(), session.clone())
            .await
            .unwrap();

        let outcome = client.execute_text("DeleteCellType", &["Insect"]).await.unwrap();
        assert!(outcome.is_good());

        let error = client.execute_text("DeleteCellType", &["a", "b"]).await.unwrap_err();
        assert!(matches!(error, CommandError::Argument(ArgumentError::CountMismatch { .. })));
        assert_eq!(session.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rebind_rejects_old_descriptors() {
        let first = Arc::new(LockSession::new(StatusCode::GOOD, Some(locked_reply())));
        let client = CommandClient::connect(MethodCatalog::builtin(), ClientOptions::default(), first.clone())
            .await
            .unwrap();
        let old_context = client.context().unwrap();
        let old = client.registry().unwrap().get("RequestLock").cloned().unwrap();

        let second = Arc::new(LockSession::new(StatusCode::GOOD, Some(locked_reply())));
        client.rebind(second.clone()).await.unwrap();
        assert!(!old_context.is_valid());
        assert_eq!(client.registry().unwrap().generation(), 2);

        let error = client.invoke(&old, vec![]).await.unwrap_err();
        assert!(matches!(error, CommandError::Session(SessionError::StaleDescriptor { .. })));
        assert_eq!(first.calls.load(Ordering::SeqCst) + second.calls.load(Ordering::SeqCst), 0);

        assert!(client.run("RequestLock", vec![]).await.is_ok());
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.statistics().rebinds(), 2);
    }

    #[tokio::test]
    async fn test_unbound_client() {
        let client = CommandClient::new(MethodCatalog::builtin(), ClientOptions::default());
        assert!(!client.is_bound());
        let error = client.execute("RequestLock", vec![]).await.unwrap_err();
        assert!(matches!(error, CommandError::Transport(TransportError::NotConnected)));
        assert_eq!(client.statistics().rejected(), 1);
    }
}
