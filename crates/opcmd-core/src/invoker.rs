// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Method invocation.
//!
//! The invoker checks a descriptor against the current session context,
//! validates arguments locally and performs exactly one call. Nothing reaches
//! the server when validation fails. A bad status from the server is not an
//! error at this layer; it is returned in the [`InvocationOutcome`] together
//! with whatever outputs and diagnostics came back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::catalog::ArgumentSpec;
use crate::error::{ArgumentError, CommandResult, SessionError, TransportError};
use crate::registry::MethodDescriptor;
use crate::session::{CallRequest, SessionContext};
use crate::types::{DiagnosticInfo, StatusCode, TaggedValue};

// =============================================================================
// InvocationOutcome
// =============================================================================

/// What the server returned for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOutcome {
    /// Overall call status.
    pub status: StatusCode,
    /// Output arguments.
    pub outputs: Vec<TaggedValue>,
    /// Per-input results.
    pub input_argument_results: Vec<StatusCode>,
    /// Diagnostics.
    pub diagnostics: Vec<DiagnosticInfo>,
    /// Call duration.
    pub elapsed: Duration,
}

impl InvocationOutcome {
    /// First output argument, which carries the result envelope.
    pub fn first_output(&self) -> Option<&TaggedValue> {
        self.outputs.first()
    }

    /// Returns `true` for a good status.
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }
}

// =============================================================================
// Invoker
// =============================================================================

/// Performs calls against one session context.
#[derive(Debug, Clone)]
pub struct Invoker {
    context: Arc<SessionContext>,
    call_timeout: Option<Duration>,
}

impl Invoker {
    /// Creates an invoker without a call timeout.
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self {
            context,
            call_timeout: None,
        }
    }

    /// Bounds each call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Configured call timeout.
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    /// Invokes the method described by `descriptor`.
    ///
    /// # Errors
    ///
    /// - [`SessionError`] if the descriptor belongs to an older session or
    ///   the context has been invalidated
    /// - [`ArgumentError`] if the arguments do not match the declared inputs
    /// - [`TransportError`] if the call fails or times out
    pub async fn invoke(
        &self,
        descriptor: &MethodDescriptor,
        arguments: Vec<TaggedValue>,
    ) -> CommandResult<InvocationOutcome> {
        if descriptor.generation != self.context.generation() {
            return Err(SessionError::stale(
                &descriptor.name,
                descriptor.generation,
                self.context.generation(),
            )
            .into());
        }
        self.context.ensure_valid()?;
        validate_arguments(&descriptor.name, &descriptor.inputs, &arguments)?;

        let request = CallRequest {
            object_id: descriptor.parent.id.clone(),
            method_id: descriptor.method.id.clone(),
            input_arguments: arguments,
        };

        tracing::debug!(
            command = %descriptor.name,
            object = %request.object_id,
            method = %request.method_id,
            arguments = request.input_arguments.len(),
            "Invoking method"
        );

        let started = Instant::now();
        let call = self.context.session().call(request);
        let response = match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| TransportError::timeout("call", limit))??,
            None => call.await?,
        };
        let elapsed = started.elapsed();

        if response.status.is_bad() {
            tracing::debug!(
                command = %descriptor.name,
                status = %response.status,
                elapsed_ms = elapsed.as_millis() as u64,
                "Method returned bad status"
            );
        } else {
            tracing::trace!(
                command = %descriptor.name,
                outputs = response.outputs.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Method returned"
            );
        }

        Ok(InvocationOutcome {
            status: response.status,
            outputs: response.outputs,
            input_argument_results: response.input_argument_results,
            diagnostics: response.diagnostics,
            elapsed,
        })
    }
}

/// Checks arguments against declared inputs: count first, then each type.
///
/// # Errors
///
/// Returns [`ArgumentError::CountMismatch`] or the first
/// [`ArgumentError::TypeMismatch`].
pub fn validate_arguments(
    command: &str,
    inputs: &[ArgumentSpec],
    arguments: &[TaggedValue],
) -> Result<(), ArgumentError> {
    if inputs.len() != arguments.len() {
        return Err(ArgumentError::count_mismatch(command, inputs.len(), arguments.len()));
    }
    for (index, (spec, value)) in inputs.iter().zip(arguments).enumerate() {
        if !spec.wire_type.matches(value) {
            return Err(ArgumentError::type_mismatch(
                command,
                index,
                &spec.name,
                &spec.wire_type,
                value.type_name(),
            ));
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
