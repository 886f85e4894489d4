//! Keyboard focus and focus scopes.
//!
//! A focus scope is any control flagged with
//! [`ControlTree::set_focus_scope`]; the root is always one. Each scope
//! remembers the last control focused inside it so focus can return there.

use std::collections::HashMap;

use crate::control::{ControlId, ControlTree};

#[derive(Debug, Default)]
pub struct FocusManager {
    focused: Option<ControlId>,
    scope_memory: HashMap<ControlId, ControlId>,
}

impl FocusManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> Option<ControlId> {
        self.focused
    }

    /// Whether `id` can take focus right now.
    pub fn can_focus(tree: &ControlTree, id: ControlId) -> bool {
        tree.contains(id)
            && tree.is_attached(id)
            && tree.is_effectively_visible(id)
            && tree.node(id).control().is_some_and(|c| c.focusable())
    }

    /// Nearest focus scope enclosing `id` (not `id` itself), falling back to the root.
    pub fn scope_of(tree: &ControlTree, id: ControlId) -> Option<ControlId> {
        let mut current = tree.parent(id);
        while let Some(c) = current {
            if tree.node(c).is_focus_scope() {
                return Some(c);
            }
            current = tree.parent(c);
        }
        tree.root()
    }

    /// Focusable controls inside `scope`, in tree order.
    pub fn candidates(tree: &ControlTree, scope: ControlId) -> Vec<ControlId> {
        tree.subtree(scope)
            .into_iter()
            .filter(|&id| Self::can_focus(tree, id))
            .collect()
    }

    /// Record the new focus and return the previous one.
    pub(crate) fn set(&mut self, tree: &ControlTree, id: Option<ControlId>) -> Option<ControlId> {
        let old = self.focused;
        self.focused = id;
        if let Some(id) = id {
            if let Some(scope) = Self::scope_of(tree, id) {
                self.scope_memory.insert(scope, id);
            }
        }
        old
    }

    /// The control after (or before) the focused one within its scope, wrapping around.
    pub fn step(&self, tree: &ControlTree, forward: bool) -> Option<ControlId> {
        let scope = match self.focused {
            Some(f) if tree.contains(f) => Self::scope_of(tree, f),
            _ => tree.root(),
        }?;
        let candidates = Self::candidates(tree, scope);
        if candidates.is_empty() {
            return None;
        }
        let len = candidates.len();
        let next = match self.focused.and_then(|f| candidates.iter().position(|&c| c == f)) {
            Some(pos) if forward => (pos + 1) % len,
            Some(pos) => (pos + len - 1) % len,
            None if forward => 0,
            None => len - 1,
        };
        Some(candidates[next])
    }

    /// Last control focused inside `scope`, if it can still take focus.
    pub fn remembered(&self, tree: &ControlTree, scope: ControlId) -> Option<ControlId> {
        self.scope_memory
            .get(&scope)
            .copied()
            .filter(|&id| Self::can_focus(tree, id))
    }

    /// Drop references to controls no longer attached.
    pub(crate) fn prune(&mut self, tree: &ControlTree) {
        if self.focused.is_some_and(|f| !tree.is_attached(f)) {
            self.focused = None;
        }
        self.scope_memory
            .retain(|&scope, &mut id| tree.contains(scope) && tree.contains(id));
    }
}
