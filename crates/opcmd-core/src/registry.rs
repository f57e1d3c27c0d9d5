// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-session registry of resolved method descriptors.
//!
//! The registry is built once after a session is established. Every catalog
//! command is resolved to its parent object and method node; parent paths
//! shared by several commands are browsed once. A command that fails to
//! resolve is recorded with its error and does not fail the build.
//!
//! ```text
//! MethodCatalog ──▶ group by object path ──▶ resolve parent (prefix cache)
//!                                                   │
//!                                   browse parent once, keep Method children
//!                                                   │
//!                          select method by name ──▶ MethodDescriptor
//! ```
//!
//! After construction the registry is read-only and shared through `Arc`. A
//! reconnect builds a new registry instead of mutating this one.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::{ArgumentSpec, CommandSpec, MethodCatalog};
use crate::error::{CommandError, CommandResult, ResolveError};
use crate::resolver::{select_child, AddressResolver, ResolverOptions};
use crate::schema::OutputSchema;
use crate::session::SessionContext;
use crate::types::{Node, NodeClass, NodeId, NodeRef};

// =============================================================================
// MethodDescriptor
// =============================================================================

/// A command resolved against one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Command name.
    pub name: String,
    /// Object the method is called on.
    pub parent: Node,
    /// Method node.
    pub method: Node,
    /// Ordered input arguments.
    pub inputs: Vec<ArgumentSpec>,
    /// Output schema.
    pub output: OutputSchema,
    /// Generation of the session the addresses belong to.
    pub generation: u64,
}

/// A method node found under a catalog parent object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableMethod {
    /// Object path of the parent, joined with `/`.
    pub parent_path: String,
    /// Method node.
    pub method: Node,
    /// Whether a catalog command maps to this method.
    pub cataloged: bool,
}

// =============================================================================
// MethodRegistry
// =============================================================================

/// Resolved descriptors for one session.
#[derive(Debug)]
pub struct MethodRegistry {
    generation: u64,
    descriptors: HashMap<String, Arc<MethodDescriptor>>,
    failures: HashMap<String, CommandError>,
    available: Vec<AvailableMethod>,
    round_trips: u64,
    built_at: DateTime<Utc>,
}

impl MethodRegistry {
    /// Resolves every catalog command through `context`.
    ///
    /// # Errors
    ///
    /// Fails only if the context has already been invalidated. Individual
    /// resolution failures are available through [`Self::failure`].
    pub async fn build(
        context: Arc<SessionContext>,
        catalog: &MethodCatalog,
        options: ResolverOptions,
    ) -> CommandResult<Self> {
        context.ensure_valid()?;
        let generation = context.generation();
        let resolver = AddressResolver::new(Arc::clone(&context), options);

        let mut groups: Vec<(&[String], Vec<&CommandSpec>)> = Vec::new();
        for command in catalog.commands() {
            match groups.iter_mut().find(|(path, _)| *path == command.object_path.as_slice()) {
                Some((_, members)) => members.push(command),
                None => groups.push((command.object_path.as_slice(), vec![command])),
            }
        }

        let mut tree = TreeCache::new(&resolver, &context);
        let mut descriptors = HashMap::new();
        let mut failures = HashMap::new();
        let mut available = Vec::new();

        for (path, members) in groups {
            let parent_path = path.join("/");
            let browsed = match tree.resolve(path).await {
                Ok(parent) => tree
                    .children(&parent.id)
                    .await
                    .map(|children| children.to_vec())
                    .map(|children| (parent, children)),
                Err(error) => Err(error),
            };

            let (parent, children) = match browsed {
                Ok(found) => found,
                Err(error) => {
                    tracing::warn!(path = %parent_path, commands = members.len(), "Parent object not resolved: {error}");
                    for command in members {
                        failures.insert(command.name.clone(), error.clone());
                    }
                    continue;
                }
            };

            for command in &members {
                match select_method(&resolver, &parent, &children, command.method_name(), &context) {
                    Ok(method) => {
                        descriptors.insert(
                            command.name.clone(),
                            Arc::new(MethodDescriptor {
                                name: command.name.clone(),
                                parent: parent.clone(),
                                method,
                                inputs: command.inputs.clone(),
                                output: command.output.clone(),
                                generation,
                            }),
                        );
                    }
                    Err(error) => {
                        tracing::warn!(command = %command.name, path = %parent_path, "Command not resolved: {error}");
                        failures.insert(command.name.clone(), CommandError::from(error));
                    }
                }
            }

            for child in children.iter().filter(|c| c.node_class == NodeClass::Method) {
                let Ok(method) = Node::from_ref(child, context.namespaces()) else {
                    continue;
                };
                let cataloged = members
                    .iter()
                    .any(|c| child.matches_name(c.method_name()));
                available.push(AvailableMethod {
                    parent_path: parent_path.clone(),
                    method,
                    cataloged,
                });
            }
        }

        let round_trips = resolver.statistics().round_trips();
        tracing::info!(
            session = %context.session().display_name(),
            generation,
            resolved = descriptors.len(),
            failed = failures.len(),
            available = available.len(),
            round_trips,
            "Method registry built"
        );

        Ok(Self {
            generation,
            descriptors,
            failures,
            available,
            round_trips,
            built_at: Utc::now(),
        })
    }

    /// Session generation the registry was built for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Descriptor for a resolved command.
    pub fn get(&self, name: &str) -> Option<&Arc<MethodDescriptor>> {
        self.descriptors.get(name)
    }

    /// Resolution failure recorded for a command.
    pub fn failure(&self, name: &str) -> Option<&CommandError> {
        self.failures.get(name)
    }

    /// Returns the descriptor, or the recorded failure, for a command.
    pub fn descriptor(&self, name: &str) -> CommandResult<Arc<MethodDescriptor>> {
        if let Some(descriptor) = self.descriptors.get(name) {
            return Ok(Arc::clone(descriptor));
        }
        Err(self
            .failures
            .get(name)
            .cloned()
            .unwrap_or_else(|| CommandError::unknown_command(name)))
    }

    /// All recorded failures, by command name.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &CommandError)> {
        self.failures.iter().map(|(name, error)| (name.as_str(), error))
    }

    /// Method nodes found under the browsed parent objects, in browse order.
    pub fn available_methods(&self) -> &[AvailableMethod] {
        &self.available
    }

    /// Number of resolved commands.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if nothing resolved.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Browse round trips spent building the registry.
    pub fn round_trips(&self) -> u64 {
        self.round_trips
    }

    /// Build time.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

/// Browse results and resolved prefixes shared across one build.
struct TreeCache<'a> {
    resolver: &'a AddressResolver,
    context: &'a SessionContext,
    children: HashMap<NodeId, Vec<NodeRef>>,
    nodes: HashMap<Vec<String>, Node>,
}

impl<'a> TreeCache<'a> {
    fn new(resolver: &'a AddressResolver, context: &'a SessionContext) -> Self {
        Self {
            resolver,
            context,
            children: HashMap::new(),
            nodes: HashMap::new(),
        }
    }

    async fn children(&mut self, parent: &NodeId) -> CommandResult<&[NodeRef]> {
        if !self.children.contains_key(parent) {
            let found = self.resolver.browse_children(parent).await?;
            self.children.insert(parent.clone(), found);
        }
        Ok(self.children.get(parent).map(Vec::as_slice).unwrap_or_default())
    }

    async fn resolve(&mut self, path: &[String]) -> CommandResult<Node> {
        let policy = self.resolver.options().duplicate_policy;
        let context = self.context;
        let namespaces = context.namespaces();
        let mut current = Node::objects_folder();
        for depth in 0..path.len() {
            if let Some(cached) = self.nodes.get(&path[..=depth]) {
                current = cached.clone();
                continue;
            }
            let children = self.children(&current.id).await?;
            current = select_child(&current, children, &path[depth], policy, namespaces)
                .map_err(|e| e.with_resolved(path[..depth].to_vec()))?;
            self.nodes.insert(path[..=depth].to_vec(), current.clone());
        }
        Ok(current)
    }
}

fn select_method(
    resolver: &AddressResolver,
    parent: &Node,
    children: &[NodeRef],
    name: &str,
    context: &SessionContext,
) -> Result<Node, ResolveError> {
    let method = select_child(
        parent,
        children,
        name,
        resolver.options().duplicate_policy,
        context.namespaces(),
    )?;
    if method.node_class != NodeClass::Method {
        return Err(ResolveError::unexpected_class(
            name,
            NodeClass::Method,
            method.node_class,
        ));
    }
    Ok(method)
}

// =============================================================================
// Tests
// =============================================================================
