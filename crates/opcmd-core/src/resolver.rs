// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Name-based resolution against the server's node hierarchy.
//!
//! Every lookup is one level deep: browse the parent's hierarchical children,
//! drain all continuation pages, keep objects, variables and methods, and pick
//! the child whose display name or browse name equals the requested name.
//! Paths are resolved by repeating that step, strictly in sequence.
//!
//! ```text
//! resolve_path(Objects, ["ViCellBluStateObject", "Methods"])
//!
//!   Objects ──browse──▶ page 1 ─▶ page 2 ─▶ ... ─▶ match "ViCellBluStateObject"
//!                                                         │
//!           ViCellBluStateObject ──browse──▶ ... ─▶ match "Methods"
//! ```
//!
//! # Duplicate Names
//!
//! When more than one child carries the name, [`DuplicatePolicy::FirstMatch`]
//! accepts the first in browse order and logs the rest at debug level;
//! [`DuplicatePolicy::Reject`] fails with [`ResolveError::Ambiguous`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CommandError, CommandResult, ResolveError};
use crate::session::{BrowseRequest, SessionContext};
use crate::types::{NamespaceTable, Node, NodeId, NodeRef};

// =============================================================================
// Options
// =============================================================================

/// How to treat several children with the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Accept the first match in browse order.
    #[default]
    FirstMatch,
    /// Fail with an ambiguity error.
    Reject,
}

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    /// Duplicate name handling.
    pub duplicate_policy: DuplicatePolicy,
    /// Continuation pages followed per browse before giving up.
    pub max_continuation_pages: usize,
    /// Page size hint sent with each browse; zero lets the server decide.
    pub max_references_per_page: u32,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::FirstMatch,
            max_continuation_pages: 1000,
            max_references_per_page: 0,
        }
    }
}

impl ResolverOptions {
    /// Sets the duplicate policy.
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Sets the continuation page limit.
    pub fn with_max_continuation_pages(mut self, pages: usize) -> Self {
        self.max_continuation_pages = pages;
        self
    }
}

// =============================================================================
// ResolveStatistics
// =============================================================================

/// Counters for browse traffic.
#[derive(Debug, Default)]
pub struct ResolveStatistics {
    /// Initial browse requests.
    pub browse_calls: AtomicU64,
    /// Continuation requests.
    pub continuation_calls: AtomicU64,
    /// References received.
    pub references: AtomicU64,
    /// Successful name lookups.
    pub resolved: AtomicU64,
    /// Failed name lookups.
    pub failures: AtomicU64,
}

impl ResolveStatistics {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    fn record_page(&self, continuation: bool, references: usize) {
        if continuation {
            self.continuation_calls.fetch_add(1, Ordering::Relaxed);
        } else {
            self.browse_calls.fetch_add(1, Ordering::Relaxed);
        }
        self.references.fetch_add(references as u64, Ordering::Relaxed);
    }

    fn record_lookup(&self, ok: bool) {
        let counter = if ok { &self.resolved } else { &self.failures };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Total round trips (browse plus continuation).
    pub fn round_trips(&self) -> u64 {
        self.browse_calls.load(Ordering::Relaxed) + self.continuation_calls.load(Ordering::Relaxed)
    }

    /// Resets all counters.
    pub fn reset(&self) {
        self.browse_calls.store(0, Ordering::Relaxed);
        self.continuation_calls.store(0, Ordering::Relaxed);
        self.references.store(0, Ordering::Relaxed);
        self.resolved.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }
}

// =============================================================================
// AddressResolver
// =============================================================================

/// Resolves names to nodes through one session.
#[derive(Debug, Clone)]
pub struct AddressResolver {
    context: Arc<SessionContext>,
    options: ResolverOptions,
    stats: Arc<ResolveStatistics>,
}

impl AddressResolver {
    /// Creates a resolver bound to a session context.
    pub fn new(context: Arc<SessionContext>, options: ResolverOptions) -> Self {
        Self {
            context,
            options,
            stats: Arc::new(ResolveStatistics::new()),
        }
    }

    /// Resolver settings.
    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Browse counters.
    pub fn statistics(&self) -> &ResolveStatistics {
        &self.stats
    }

    /// Lists the addressable children of `parent`, following every
    /// continuation point.
    ///
    /// # Errors
    ///
    /// Returns a transport error if any page fails, or
    /// [`ResolveError::ContinuationLimit`] if the server keeps paging past
    /// [`ResolverOptions::max_continuation_pages`].
    pub async fn browse_children(&self, parent: &NodeId) -> CommandResult<Vec<NodeRef>> {
        self.context.ensure_valid()?;
        let session = self.context.session();

        let request = BrowseRequest::children_of(parent.clone())
            .with_max_references(self.options.max_references_per_page);
        let mut page = session.browse(&request).await?;
        self.stats.record_page(false, page.references.len());
        tracing::debug!(
            parent = %parent,
            references = page.references.len(),
            more = page.continuation.is_some(),
            "Browsed children"
        );

        let mut references = std::mem::take(&mut page.references);
        let mut pages = 0usize;

        while let Some(continuation) = page.continuation.take() {
            if pages >= self.options.max_continuation_pages {
                if let Err(error) = session.release_continuation(&continuation).await {
                    tracing::debug!(parent = %parent, "Failed to release continuation: {error}");
                }
                return Err(ResolveError::ContinuationLimit {
                    parent: parent.to_string(),
                    pages,
                }
                .into());
            }

            page = session.browse_next(&continuation).await?;
            pages += 1;
            self.stats.record_page(true, page.references.len());
            tracing::debug!(
                parent = %parent,
                page = pages,
                references = page.references.len(),
                more = page.continuation.is_some(),
                "Browsed continuation page"
            );
            references.append(&mut page.references);
        }

        Ok(references
            .into_iter()
            .filter(|r| r.node_class.is_addressable())
            .collect())
    }

    /// Resolves one child by name. `None` as parent means the Objects folder.
    pub async fn resolve_child_by_name(&self, parent: Option<&Node>, name: &str) -> CommandResult<Node> {
        let root;
        let parent = match parent {
            Some(parent) => parent,
            None => {
                root = Node::objects_folder();
                &root
            }
        };

        let children = self.browse_children(&parent.id).await?;
        let outcome = select_child(
            parent,
            &children,
            name,
            self.options.duplicate_policy,
            self.context.namespaces(),
        );
        self.stats.record_lookup(outcome.is_ok());
        Ok(outcome?)
    }

    /// Resolves a path of names starting at `root` (the Objects folder when
    /// `None`).
    ///
    /// # Errors
    ///
    /// A [`ResolveError::NotFound`] carries the names that resolved before
    /// the failing step.
    pub async fn resolve_path<S: AsRef<str>>(&self, root: Option<&Node>, names: &[S]) -> CommandResult<Node> {
        let mut current = root.cloned().unwrap_or_else(Node::objects_folder);
        let mut resolved = Vec::with_capacity(names.len());

        for name in names {
            let name = name.as_ref();
            current = self
                .resolve_child_by_name(Some(&current), name)
                .await
                .map_err(|error| match error {
                    CommandError::Resolve(e) => e.with_resolved(resolved.clone()).into(),
                    other => other,
                })?;
            resolved.push(name.to_string());
        }
        Ok(current)
    }
}

/// Picks the child named `name` out of an already drained browse result.
///
/// Only objects, variables and methods are considered.
pub fn select_child(
    parent: &Node,
    children: &[NodeRef],
    name: &str,
    policy: DuplicatePolicy,
    namespaces: &NamespaceTable,
) -> Result<Node, ResolveError> {
    let mut matches = children
        .iter()
        .filter(|r| r.node_class.is_addressable() && r.matches_name(name));

    let Some(first) = matches.next() else {
        return Err(ResolveError::not_found(parent.to_string(), name));
    };

    let extra = matches.count();
    if extra > 0 {
        match policy {
            DuplicatePolicy::FirstMatch => tracing::debug!(
                parent = %parent,
                name,
                duplicates = extra,
                "Several children share a name, using the first"
            ),
            DuplicatePolicy::Reject => {
                return Err(ResolveError::ambiguous(parent.to_string(), name, extra + 1))
            }
        }
    }

    Node::from_ref(first, namespaces)
}

// =============================================================================
// Tests
// =============================================================================
