//! Arena of control nodes.
//!
//! Slots are allocated densely and recycled through a free list, the same
//! way component indices are handed out elsewhere in the engine. Parent
//! links are plain ids, so the tree has no ownership cycles.

use log::trace;

use super::{AsAny, Control, ControlId, LayoutProps, Visibility};
use crate::error::{UsageError, fatal};
use crate::geometry::{Point, Rect, Vector};
use crate::layout::LayoutInfo;

// =============================================================================
// Node
// =============================================================================

/// Per-control state owned by the tree.
pub struct Node {
    /// Taken out while the control's own layout override runs.
    pub(crate) control: Option<Box<dyn Control>>,
    pub(crate) parent: Option<ControlId>,
    pub(crate) children: Vec<ControlId>,
    pub(crate) visibility: Visibility,
    pub(crate) props: LayoutProps,
    pub(crate) layout: LayoutInfo,
    pub(crate) last_layout: LayoutInfo,
    /// Area of the parent's full buffer this control was last composited into.
    pub(crate) last_overlapped_rect: Rect,
    pub(crate) focus_scope: bool,
}

impl Node {
    fn new(control: Box<dyn Control>) -> Self {
        Self {
            control: Some(control),
            parent: None,
            children: Vec::new(),
            visibility: Visibility::Visible,
            props: LayoutProps::default(),
            layout: LayoutInfo::default(),
            last_layout: LayoutInfo::default(),
            last_overlapped_rect: Rect::EMPTY,
            focus_scope: false,
        }
    }

    pub fn parent(&self) -> Option<ControlId> {
        self.parent
    }

    pub fn children(&self) -> &[ControlId] {
        &self.children
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }

    pub fn props(&self) -> &LayoutProps {
        &self.props
    }

    /// Current layout snapshot.
    pub fn layout(&self) -> &LayoutInfo {
        &self.layout
    }

    /// Snapshot from the previous validated pass.
    pub fn last_layout(&self) -> &LayoutInfo {
        &self.last_layout
    }

    pub fn last_overlapped_rect(&self) -> Rect {
        self.last_overlapped_rect
    }

    pub fn is_focus_scope(&self) -> bool {
        self.focus_scope
    }

    /// The control, unless its layout override is currently running.
    pub fn control(&self) -> Option<&dyn Control> {
        self.control.as_deref()
    }
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

// =============================================================================
// ControlTree
// =============================================================================

/// Owner of every control node, plus the pending invalidation stack.
#[derive(Default)]
pub struct ControlTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: Option<ControlId>,
    invalidated: Vec<ControlId>,
    detached: Vec<ControlId>,
}

impl ControlTree {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Allocation
    // -------------------------------------------------------------------------

    /// Add a detached control.
    pub fn insert(&mut self, control: impl Control) -> ControlId {
        self.insert_boxed(Box::new(control))
    }

    pub fn insert_boxed(&mut self, control: Box<dyn Control>) -> ControlId {
        let node = Node::new(control);
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            ControlId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            ControlId {
                index,
                generation: 0,
            }
        }
    }

    /// Free a detached control and its whole subtree.
    ///
    /// Ids of freed nodes become stale; using them afterwards is fatal.
    pub fn destroy(&mut self, id: ControlId) {
        let node = self.node(id);
        if node.parent.is_some() || self.root == Some(id) {
            fatal(UsageError::StillAttached(id));
        }
        for gone in self.subtree(id) {
            self.invalidated.retain(|&queued| queued != gone);
            self.detached.push(gone);
            let slot = &mut self.slots[gone.index()];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(gone.index);
        }
    }

    /// Whether `id` still names a live node.
    pub fn contains(&self, id: ControlId) -> bool {
        self.slots
            .get(id.index())
            .is_some_and(|slot| slot.generation == id.generation && slot.node.is_some())
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[track_caller]
    pub fn node(&self, id: ControlId) -> &Node {
        match self.slots.get(id.index()) {
            Some(Slot {
                generation,
                node: Some(node),
            }) if *generation == id.generation => node,
            _ => fatal(UsageError::StaleControl(id)),
        }
    }

    #[track_caller]
    pub(crate) fn node_mut(&mut self, id: ControlId) -> &mut Node {
        match self.slots.get_mut(id.index()) {
            Some(Slot {
                generation,
                node: Some(node),
            }) if *generation == id.generation => node,
            _ => fatal(UsageError::StaleControl(id)),
        }
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    pub fn root(&self) -> Option<ControlId> {
        self.root
    }

    /// Designate the root element. The previous root, if any, is detached.
    pub fn set_root(&mut self, id: ControlId) {
        if self.node(id).parent.is_some() {
            fatal(UsageError::AlreadyAttached(id));
        }
        if let Some(old) = self.root.replace(id) {
            if old != id {
                self.forget_subtree(old);
            }
        }
        self.invalidate(id);
    }

    pub fn add_child(&mut self, parent: ControlId, child: ControlId) {
        let at = self.node(parent).children.len();
        self.insert_child(parent, at, child);
    }

    /// Attach `child` under `parent` at Z position `index` (clamped).
    pub fn insert_child(&mut self, parent: ControlId, index: usize, child: ControlId) {
        if self.node(child).parent.is_some() || self.root == Some(child) {
            fatal(UsageError::AlreadyAttached(child));
        }
        if self.is_descendant_of(parent, child) {
            fatal(UsageError::CyclicAttach(child));
        }
        self.node_mut(child).parent = Some(parent);
        let children = &mut self.node_mut(parent).children;
        let at = index.min(children.len());
        children.insert(at, child);
        self.invalidate(parent);
    }

    /// Detach `child` and its subtree from `parent`.
    ///
    /// The subtree is purged from the invalidation stack and recorded so
    /// per-control caches can be evicted. Its layout state is reset, so a
    /// later re-attach lays it out from scratch.
    pub fn remove_child(&mut self, parent: ControlId, child: ControlId) {
        let position = self.node(parent).children.iter().position(|&c| c == child);
        let Some(position) = position else {
            fatal(UsageError::NotAChild { parent, child });
        };
        self.node_mut(parent).children.remove(position);
        self.node_mut(child).parent = None;
        self.forget_subtree(child);
        self.invalidate(parent);
    }

    fn forget_subtree(&mut self, top: ControlId) {
        for gone in self.subtree(top) {
            self.invalidated.retain(|&queued| queued != gone);
            self.detached.push(gone);
            let node = self.node_mut(gone);
            node.layout = LayoutInfo::default();
            node.last_layout = LayoutInfo::default();
            node.last_overlapped_rect = Rect::EMPTY;
        }
        trace!("detached subtree {top}");
    }

    /// Drain ids detached or destroyed since the last call.
    pub fn take_detached(&mut self) -> Vec<ControlId> {
        std::mem::take(&mut self.detached)
    }

    /// Move `id` to the top of its siblings' Z-order.
    pub fn raise_to_top(&mut self, id: ControlId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let children = &mut self.node_mut(parent).children;
        if children.last() == Some(&id) {
            return;
        }
        children.retain(|&c| c != id);
        children.push(id);
        self.invalidate(parent);
    }

    pub fn parent(&self, id: ControlId) -> Option<ControlId> {
        self.node(id).parent
    }

    pub fn children(&self, id: ControlId) -> &[ControlId] {
        &self.node(id).children
    }

    /// `id` and all descendants, pre-order (parents before children, Z order).
    pub fn subtree(&self, id: ControlId) -> Vec<ControlId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.node(next).children.iter().rev().copied());
        }
        out
    }

    /// Path from the outermost ancestor down to `id`, inclusive.
    pub fn ancestors(&self, id: ControlId) -> Vec<ControlId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Whether `id` is `ancestor` or lies under it.
    pub fn is_descendant_of(&self, id: ControlId, ancestor: ControlId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.node(c).parent;
        }
        false
    }

    /// Whether `id` is live and reachable from the root.
    pub fn is_attached(&self, id: ControlId) -> bool {
        match self.root {
            Some(root) => self.contains(id) && self.is_descendant_of(id, root),
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    pub fn visibility(&self, id: ControlId) -> Visibility {
        self.node(id).visibility
    }

    /// Change visibility; the control and its parent are re-laid out.
    pub fn set_visibility(&mut self, id: ControlId, visibility: Visibility) {
        let node = self.node_mut(id);
        if node.visibility == visibility {
            return;
        }
        node.visibility = visibility;
        let parent = node.parent;
        self.invalidate(id);
        if let Some(parent) = parent {
            self.invalidate(parent);
        }
    }

    /// Visible itself and through every ancestor.
    pub fn is_effectively_visible(&self, id: ControlId) -> bool {
        self.ancestors(id).iter().all(|&c| self.node(c).is_visible())
    }

    pub fn props(&self, id: ControlId) -> &LayoutProps {
        &self.node(id).props
    }

    pub fn set_props(&mut self, id: ControlId, props: LayoutProps) {
        let node = self.node_mut(id);
        if node.props != props {
            node.props = props;
            self.invalidate(id);
        }
    }

    pub fn set_focus_scope(&mut self, id: ControlId, is_scope: bool) {
        self.node_mut(id).focus_scope = is_scope;
    }

    /// Borrow the control as its concrete type.
    pub fn get<T: Control>(&self, id: ControlId) -> Option<&T> {
        let control: &dyn Control = self.node(id).control.as_deref()?;
        AsAny::as_any(control).downcast_ref::<T>()
    }

    /// Mutably borrow the control as its concrete type. Does not invalidate.
    pub fn get_mut<T: Control>(&mut self, id: ControlId) -> Option<&mut T> {
        let control: &mut dyn Control = self.node_mut(id).control.as_deref_mut()?;
        AsAny::as_any_mut(control).downcast_mut::<T>()
    }

    /// Mutate the control and queue it for re-layout.
    ///
    /// A type mismatch is fatal.
    #[track_caller]
    pub fn update<T: Control, R>(&mut self, id: ControlId, f: impl FnOnce(&mut T) -> R) -> R {
        let Some(control) = self.get_mut::<T>(id) else {
            fatal(UsageError::ControlType(id, std::any::type_name::<T>()));
        };
        let out = f(control);
        self.invalidate(id);
        out
    }

    // -------------------------------------------------------------------------
    // Invalidation
    // -------------------------------------------------------------------------

    /// Queue `id` for the next layout pass. Never lays out synchronously.
    pub fn invalidate(&mut self, id: ControlId) {
        if !self.contains(id) {
            fatal(UsageError::StaleControl(id));
        }
        if !self.invalidated.contains(&id) {
            self.invalidated.push(id);
        }
    }

    /// Pop the most recently invalidated control.
    pub(crate) fn pop_invalidated(&mut self) -> Option<ControlId> {
        self.invalidated.pop()
    }

    pub fn has_pending_invalidations(&self) -> bool {
        !self.invalidated.is_empty()
    }

    // -------------------------------------------------------------------------
    // Coordinates
    // -------------------------------------------------------------------------

    /// Canvas position of the control's own buffer origin.
    pub fn screen_offset(&self, id: ControlId) -> Vector {
        let mut offset = Vector::ZERO;
        for c in self.ancestors(id) {
            offset += self.node(c).layout.actual_offset;
        }
        offset
    }

    /// Convert a canvas point into `id`'s own coordinates.
    pub fn screen_to_local(&self, id: ControlId, point: Point) -> Point {
        point - self.screen_offset(id)
    }

    pub(crate) fn take_control(&mut self, id: ControlId) -> Box<dyn Control> {
        match self.node_mut(id).control.take() {
            Some(control) => control,
            None => fatal(UsageError::ReentrantLayout(id)),
        }
    }

    pub(crate) fn restore_control(&mut self, id: ControlId, control: Box<dyn Control>) {
        self.node_mut(id).control = Some(control);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::Fill;
    use crate::layout::LayoutValidity;

    fn tree_of_three() -> (ControlTree, ControlId, ControlId, ControlId) {
        let mut tree = ControlTree::new();
        let root = tree.insert(Fill::default());
        let mid = tree.insert(Fill::default());
        let leaf = tree.insert(Fill::default());
        tree.set_root(root);
        tree.add_child(root, mid);
        tree.add_child(mid, leaf);
        (tree, root, mid, leaf)
    }

    #[test]
    fn test_ancestors_and_subtree() {
        let (tree, root, mid, leaf) = tree_of_three();
        assert_eq!(tree.ancestors(leaf), vec![root, mid, leaf]);
        assert_eq!(tree.subtree(root), vec![root, mid, leaf]);
        assert!(tree.is_descendant_of(leaf, root));
        assert!(!tree.is_descendant_of(root, leaf));
        assert!(tree.is_attached(leaf));
    }

    #[test]
    fn test_invalidate_dedupes() {
        let (mut tree, root, mid, _) = tree_of_three();
        while tree.pop_invalidated().is_some() {}
        tree.invalidate(mid);
        tree.invalidate(root);
        tree.invalidate(mid);
        assert_eq!(tree.pop_invalidated(), Some(root));
        assert_eq!(tree.pop_invalidated(), Some(mid));
        assert_eq!(tree.pop_invalidated(), None);
    }

    #[test]
    fn test_remove_child_purges_queue_and_records_detach() {
        let (mut tree, root, mid, leaf) = tree_of_three();
        tree.take_detached();
        tree.invalidate(leaf);
        tree.remove_child(root, mid);
        let detached = tree.take_detached();
        assert_eq!(detached, vec![mid, leaf]);
        assert!(!tree.is_attached(leaf));
        let mut queued = Vec::new();
        while let Some(id) = tree.pop_invalidated() {
            queued.push(id);
        }
        assert!(!queued.contains(&leaf));
        assert!(queued.contains(&root));
        assert_eq!(tree.node(leaf).layout().validity, LayoutValidity::Nothing);
    }

    #[test]
    fn test_destroy_bumps_generation() {
        let (mut tree, root, mid, leaf) = tree_of_three();
        tree.remove_child(root, mid);
        tree.destroy(mid);
        assert!(!tree.contains(mid));
        assert!(!tree.contains(leaf));
        let reused = tree.insert(Fill::default());
        assert!(reused.index() == mid.index() || reused.index() == leaf.index());
        assert_ne!(reused, mid);
        assert_ne!(reused, leaf);
    }

    #[test]
    #[should_panic(expected = "stale control id")]
    fn test_stale_id_is_fatal() {
        let mut tree = ControlTree::new();
        let id = tree.insert(Fill::default());
        tree.destroy(id);
        tree.node(id);
    }

    #[test]
    #[should_panic(expected = "already has a parent")]
    fn test_double_attach_is_fatal() {
        let (mut tree, root, _, leaf) = tree_of_three();
        tree.add_child(root, leaf);
    }

    #[test]
    #[should_panic(expected = "cannot be its own ancestor")]
    fn test_cycle_is_fatal() {
        let mut tree = ControlTree::new();
        let a = tree.insert(Fill::default());
        let b = tree.insert(Fill::default());
        tree.add_child(a, b);
        tree.add_child(b, a);
    }

    #[test]
    fn test_raise_to_top() {
        let mut tree = ControlTree::new();
        let root = tree.insert(Fill::default());
        let a = tree.insert(Fill::default());
        let b = tree.insert(Fill::default());
        tree.set_root(root);
        tree.add_child(root, a);
        tree.add_child(root, b);
        tree.raise_to_top(a);
        assert_eq!(tree.children(root), &[b, a]);
    }

    #[test]
    fn test_downcast_and_update() {
        let mut tree = ControlTree::new();
        let id = tree.insert(Fill::new('x'));
        while tree.pop_invalidated().is_some() {}
        assert_eq!(tree.get::<Fill>(id).map(|f| f.cell.char), Some('x' as u32));
        tree.update::<Fill, _>(id, |fill| fill.cell.char = 'y' as u32);
        assert_eq!(tree.get::<Fill>(id).map(|f| f.cell.char), Some('y' as u32));
        assert_eq!(tree.pop_invalidated(), Some(id));
    }
}
