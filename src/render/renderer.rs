//! Layout re-validation, buffer management and damage propagation.
//!
//! One pass of the host loop is:
//!
//! 1. [`Renderer::update_layout`] drains the tree's invalidation stack. Each
//!    control is re-measured with its previous argument; if its size did not
//!    change it is laid out and re-rendered in place, otherwise the parent is
//!    queued instead and the climb continues lazily.
//! 2. [`Renderer::finally_apply_changes_to_canvas`] walks every re-rendered
//!    control up to the root, recompositing its parents' full buffers only
//!    where needed, and flushes the union of the damage once.
//!
//! Buffers are stored densely by control index and checked against the id's
//! generation, so a recycled slot never sees a stale buffer.

use log::{debug, trace};

use super::{PhysicalCanvas, RenderingBuffer};
use crate::control::{ControlId, ControlTree};
use crate::error::Result;
use crate::geometry::{Point, Rect, Size};
use crate::layout::{self, LayoutInfo, LayoutValidity, arrange, measure};

/// What one [`Renderer::update_layout`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutReport {
    /// Controls that left the `Render` state.
    pub invalidated: Vec<ControlId>,
    /// Controls whose own buffer was rendered again.
    pub revalidated: Vec<ControlId>,
}

impl LayoutReport {
    pub fn is_empty(&self) -> bool {
        self.invalidated.is_empty() && self.revalidated.is_empty()
    }
}

#[derive(Debug, Default)]
struct ControlBuffers {
    generation: u32,
    /// The control's own `render` output.
    own: RenderingBuffer,
    /// `own` with every visible child composited in Z order.
    full: RenderingBuffer,
}

impl ControlBuffers {
    fn new(generation: u32) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }
}

/// Area of the parent's buffer a child covers.
fn overlapped_rect(layout: &LayoutInfo, parent_size: Size) -> Rect {
    layout
        .composite_region()
        .translated(layout.actual_offset)
        .intersect(&Rect::from_size(parent_size))
}

pub struct Renderer {
    canvas: PhysicalCanvas,
    root_element_rect: Rect,
    buffers: Vec<Option<ControlBuffers>>,
    rendering_updated: Vec<ControlId>,
    force_repaint: bool,
    pass_pending: bool,
}

impl Renderer {
    /// A renderer laying the root out over the whole canvas.
    pub fn new(canvas: PhysicalCanvas) -> Self {
        let root_element_rect = canvas.bounds();
        Self {
            canvas,
            root_element_rect,
            buffers: Vec::new(),
            rendering_updated: Vec::new(),
            force_repaint: true,
            pass_pending: false,
        }
    }

    pub fn canvas(&self) -> &PhysicalCanvas {
        &self.canvas
    }

    pub fn root_element_rect(&self) -> Rect {
        self.root_element_rect
    }

    /// Move or resize the root's slot. The root is re-laid out and the next
    /// flush repaints the whole canvas.
    pub fn set_root_element_rect(&mut self, tree: &mut ControlTree, rect: Rect) {
        if rect == self.root_element_rect {
            return;
        }
        debug!("root element rect {:?} -> {rect:?}", self.root_element_rect);
        self.root_element_rect = rect;
        self.force_repaint = true;
        if let Some(root) = tree.root() {
            tree.invalidate(root);
        }
    }

    /// Terminal resize: new canvas size, root spanning all of it.
    pub fn resize(&mut self, tree: &mut ControlTree, size: Size) {
        debug!("resize to {size:?}");
        self.canvas.resize(size);
        self.set_root_element_rect(tree, Rect::from_size(size));
    }

    /// Repaint the whole canvas at the next flush.
    pub fn request_full_repaint(&mut self) {
        self.force_repaint = true;
    }

    /// Whether re-rendered controls are waiting for a flush.
    pub fn has_pending_damage(&self) -> bool {
        !self.rendering_updated.is_empty()
    }

    // -------------------------------------------------------------------------
    // Buffers
    // -------------------------------------------------------------------------

    fn buffers(&self, id: ControlId) -> Option<&ControlBuffers> {
        self.buffers
            .get(id.index())?
            .as_ref()
            .filter(|b| b.generation == id.generation())
    }

    fn buffers_mut(&mut self, id: ControlId) -> &mut ControlBuffers {
        let i = id.index();
        if self.buffers.len() <= i {
            self.buffers.resize_with(i + 1, || None);
        }
        let slot = &mut self.buffers[i];
        let current = matches!(slot, Some(b) if b.generation == id.generation());
        if !current {
            *slot = Some(ControlBuffers::new(id.generation()));
        }
        slot.get_or_insert_with(|| ControlBuffers::new(id.generation()))
    }

    /// The control's own render output, if it has been rendered.
    pub fn own_buffer(&self, id: ControlId) -> Option<&RenderingBuffer> {
        self.buffers(id).map(|b| &b.own)
    }

    /// The control's composited buffer, if it has been rendered.
    pub fn full_buffer(&self, id: ControlId) -> Option<&RenderingBuffer> {
        self.buffers(id).map(|b| &b.full)
    }

    fn evict(&mut self, id: ControlId) {
        if let Some(slot) = self.buffers.get_mut(id.index()) {
            if slot.as_ref().is_some_and(|b| b.generation == id.generation()) {
                *slot = None;
            }
        }
        self.rendering_updated.retain(|&c| c != id);
    }

    // -------------------------------------------------------------------------
    // Layout pass
    // -------------------------------------------------------------------------

    /// Drain the invalidation stack, re-laying out and re-rendering what changed.
    pub fn update_layout(&mut self, tree: &mut ControlTree) -> LayoutReport {
        for id in tree.take_detached() {
            self.evict(id);
        }

        let mut report = LayoutReport::default();
        while let Some(id) = tree.pop_invalidated() {
            if !tree.is_attached(id) {
                trace!("skipping detached {id}");
                continue;
            }
            self.process_control(tree, id, &mut report);
        }

        if !report.is_empty() {
            self.pass_pending = true;
            debug!(
                "layout pass: {} invalidated, {} rendered",
                report.invalidated.len(),
                report.revalidated.len()
            );
        }
        report
    }

    fn process_control(
        &mut self,
        tree: &mut ControlTree,
        id: ControlId,
        report: &mut LayoutReport,
    ) {
        trace!("process {id}");
        if layout::reset_validity(tree, id) {
            report.invalidated.push(id);
        }

        if tree.root() == Some(id) {
            let rect = self.root_element_rect;
            measure(tree, id, rect.size());
            arrange(tree, id, rect);
        } else {
            let Some(parent) = tree.parent(id) else {
                return;
            };
            let last = *tree.node(id).last_layout();
            if last.validity == LayoutValidity::Nothing {
                tree.invalidate(parent);
                return;
            }
            measure(tree, id, last.measure_argument);
            if tree.node(id).layout().unclipped_desired_size != last.unclipped_desired_size {
                trace!("{id} changed size, deferring to {parent}");
                tree.invalidate(parent);
                return;
            }
            arrange(tree, id, last.render_slot_rect);
        }

        self.refresh_buffers(tree, id, report);
        if !self.rendering_updated.contains(&id) {
            self.rendering_updated.push(id);
        }
    }

    /// Re-render `id` and every child that is not already up to date, then recomposite.
    fn refresh_buffers(
        &mut self,
        tree: &mut ControlTree,
        id: ControlId,
        report: &mut LayoutReport,
    ) {
        if !tree.node(id).is_visible() {
            layout::set_validity_to_render(tree, id);
            return;
        }

        let render_size = tree.node(id).layout().render_size;
        {
            let buffers = self.buffers_mut(id);
            buffers.own.grow(render_size);
            buffers.full.grow(render_size);
            buffers.own.clear();
            if let Some(control) = tree.node(id).control() {
                control.render(&mut buffers.own, render_size);
            }
        }
        report.revalidated.push(id);

        let children = tree.children(id).to_vec();
        for child in children {
            let node = tree.node(child);
            if !node.is_visible() {
                layout::set_validity_to_render(tree, child);
                continue;
            }
            match node.layout().validity {
                LayoutValidity::Nothing | LayoutValidity::Render => {}
                LayoutValidity::Measure | LayoutValidity::Arrange => {
                    self.refresh_buffers(tree, child, report)
                }
            }
        }

        self.rebuild_region(tree, id, Rect::from_size(render_size), true);
        tree.node_mut(id).layout.validity = LayoutValidity::Render;
    }

    /// Recompute `area` of `id`'s full buffer from its own buffer and its children.
    ///
    /// With `record_overlaps`, every child's composited area is remembered for
    /// the next damage pass.
    fn rebuild_region(
        &mut self,
        tree: &mut ControlTree,
        id: ControlId,
        area: Rect,
        record_overlaps: bool,
    ) {
        let size = tree.node(id).layout().render_size;
        let mut full = std::mem::take(&mut self.buffers_mut(id).full);
        if let Some(b) = self.buffers(id) {
            full.copy_rect_from(&b.own, area);
        }

        for child in tree.children(id).to_vec() {
            let node = tree.node(child);
            let layout = *node.layout();
            if !node.is_visible() || layout.validity == LayoutValidity::Nothing {
                if record_overlaps {
                    tree.node_mut(child).last_overlapped_rect = Rect::EMPTY;
                }
                continue;
            }
            if let Some(b) = self.buffers(child) {
                full.apply_layout(&b.full, &layout, Some(area.translated(-layout.actual_offset)));
            }
            if record_overlaps {
                tree.node_mut(child).last_overlapped_rect = overlapped_rect(&layout, size);
            }
        }

        self.buffers_mut(id).full = full;
    }

    /// Patch `child` into its parent over `region` (child coordinates), then
    /// re-apply higher siblings that overlap the patched area.
    fn patch_child(
        &mut self,
        tree: &ControlTree,
        parent: ControlId,
        child: ControlId,
        region: Rect,
        parent_rect: Rect,
    ) {
        let parent_size = tree.node(parent).layout().render_size;
        let mut full = std::mem::take(&mut self.buffers_mut(parent).full);

        let layout = *tree.node(child).layout();
        if let Some(b) = self.buffers(child) {
            full.apply_layout(&b.full, &layout, Some(region));
        }

        let siblings = tree.children(parent);
        let above = siblings
            .iter()
            .position(|&s| s == child)
            .map_or(&[][..], |i| &siblings[i + 1..]);
        for &sibling in above {
            let node = tree.node(sibling);
            let sl = *node.layout();
            if !node.is_visible() || sl.validity == LayoutValidity::Nothing {
                continue;
            }
            if !overlapped_rect(&sl, parent_size).intersects(&parent_rect) {
                continue;
            }
            if let Some(b) = self.buffers(sibling) {
                full.apply_layout(&b.full, &sl, Some(parent_rect.translated(-sl.actual_offset)));
            }
        }

        self.buffers_mut(parent).full = full;
    }

    // -------------------------------------------------------------------------
    // Damage propagation
    // -------------------------------------------------------------------------

    /// Carry `affected` (own coordinates of `id`) up to the canvas.
    /// Returns the damaged canvas rect, or empty if nothing visible changed.
    fn apply_changes_to_canvas(
        &mut self,
        tree: &mut ControlTree,
        id: ControlId,
        affected: Rect,
    ) -> Rect {
        let mut current = id;
        let mut rect = affected;
        loop {
            let node = tree.node(current);
            let layout = *node.layout();
            if !node.is_visible() || layout.validity != LayoutValidity::Render {
                return Rect::EMPTY;
            }
            let region = layout.composite_region().intersect(&rect);

            let Some(parent) = node.parent() else {
                if region.is_empty() {
                    return Rect::EMPTY;
                }
                let Some(Some(b)) = self.buffers.get(current.index()) else {
                    return Rect::EMPTY;
                };
                if b.generation != current.generation() {
                    return Rect::EMPTY;
                }
                return b.full.copy_to_canvas(&mut self.canvas, region, layout.actual_offset);
            };

            let parent_node = tree.node(parent);
            if parent_node.layout().validity != LayoutValidity::Render {
                return Rect::EMPTY;
            }
            let parent_size = parent_node.layout().render_size;
            let parent_bounds = Rect::from_size(parent_size);
            let parent_rect = region.translated(layout.actual_offset).intersect(&parent_bounds);
            let new_overlap = overlapped_rect(&layout, parent_size);
            let old_overlap = node.last_overlapped_rect();

            let next = if old_overlap != new_overlap {
                let area = old_overlap.union(&new_overlap).intersect(&parent_bounds);
                trace!("{current} moved inside {parent}, rebuilding {area:?}");
                self.rebuild_region(tree, parent, area, false);
                area.union(&parent_rect)
            } else if parent_rect.is_empty() {
                return Rect::EMPTY;
            } else if self.buffers(current).is_some_and(|b| b.full.contains_opacity(region)) {
                trace!("{current} has opacity codes, rebuilding {parent}");
                self.rebuild_region(tree, parent, parent_bounds, true);
                parent_rect
            } else {
                self.patch_child(tree, parent, current, region, parent_rect);
                parent_rect
            };
            tree.node_mut(current).last_overlapped_rect = new_overlap;

            if next.is_empty() {
                return Rect::EMPTY;
            }
            rect = next;
            current = parent;
        }
    }

    /// Propagate every re-rendered control to the canvas and flush the union once.
    ///
    /// Returns the flushed rect, or `None` when nothing needed painting.
    pub fn finally_apply_changes_to_canvas(
        &mut self,
        tree: &mut ControlTree,
    ) -> Result<Option<Rect>> {
        if !self.pass_pending && !self.force_repaint && self.rendering_updated.is_empty() {
            return Ok(None);
        }
        self.pass_pending = false;

        let updated = std::mem::take(&mut self.rendering_updated);
        let mut damage = Rect::EMPTY;
        for id in updated {
            if !tree.is_attached(id) {
                continue;
            }
            let size = tree.node(id).layout().render_size;
            let rect = self.apply_changes_to_canvas(tree, id, Rect::from_size(size));
            damage = damage.union(&rect);
        }

        if self.force_repaint {
            let rendered = tree
                .root()
                .filter(|&r| tree.node(r).layout().validity == LayoutValidity::Render);
            if let Some(root) = rendered {
                self.force_repaint = false;
                self.canvas.surface_mut().clear();
                let layout = *tree.node(root).layout();
                if let Some(Some(b)) = self.buffers.get(root.index()) {
                    let region = layout.composite_region();
                    b.full.copy_to_canvas(&mut self.canvas, region, layout.actual_offset);
                }
                damage = self.canvas.bounds();
            }
        }

        let damage = damage.intersect(&self.canvas.bounds());
        if damage.is_empty() {
            return Ok(None);
        }
        debug!("flush {damage:?}");
        self.canvas.flush(damage)?;
        Ok(Some(damage))
    }

    // -------------------------------------------------------------------------
    // Hit testing
    // -------------------------------------------------------------------------

    /// Topmost visible control under a canvas point.
    ///
    /// Cells whose opacity code lets the mouse pass through are skipped in
    /// favor of whatever lies beneath.
    pub fn hit_test(&self, tree: &ControlTree, point: Point) -> Option<ControlId> {
        let root = tree.root()?;
        let offset = tree.node(root).layout().actual_offset;
        self.hit(tree, root, point - offset)
    }

    fn hit(&self, tree: &ControlTree, id: ControlId, local: Point) -> Option<ControlId> {
        let node = tree.node(id);
        let layout = node.layout();
        if !node.is_visible() || layout.validity != LayoutValidity::Render {
            return None;
        }
        if !layout.composite_region().contains(local) {
            return None;
        }
        for &child in node.children().iter().rev() {
            let child_offset = tree.node(child).layout().actual_offset;
            if let Some(hit) = self.hit(tree, child, local - child_offset) {
                return Some(hit);
            }
        }
        let passes = self
            .own_buffer(id)
            .and_then(|b| b.opacity(local.x, local.y))
            .is_some_and(|o| o.passes_mouse());
        if passes {
            None
        } else {
            Some(id)
        }
    }
}
