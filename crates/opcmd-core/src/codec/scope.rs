// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Namespace scope stack used while decoding enumerations and structures.
//!
//! A scope is entered with [`ScopeStack::enter`] and left when the returned
//! [`ScopeGuard`] is dropped, so every exit path of a decode (including `?`
//! returns) restores the previous depth.

use std::ops::{Deref, DerefMut};

/// Stack of namespace URIs, innermost last.
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    frames: Vec<String>,
}

impl ScopeStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Innermost namespace, if any.
    pub fn current(&self) -> Option<&str> {
        self.frames.last().map(String::as_str)
    }

    /// Namespaces from innermost to outermost.
    pub fn innermost_first(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().rev().map(String::as_str)
    }

    /// Pushes a namespace; it is popped when the guard drops.
    pub fn enter(&mut self, namespace_uri: impl Into<String>) -> ScopeGuard<'_> {
        let restore_to = self.frames.len();
        self.frames.push(namespace_uri.into());
        ScopeGuard {
            stack: self,
            restore_to,
        }
    }
}

/// Active scope. Dereferences to the stack so nested scopes can be entered.
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    stack: &'a mut ScopeStack,
    restore_to: usize,
}

impl Deref for ScopeGuard<'_> {
    type Target = ScopeStack;

    fn deref(&self) -> &Self::Target {
        self.stack
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.stack
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.stack.frames.truncate(self.restore_to);
    }
}

// =============================================================================
// Tests
// =============================================================================
