//! Measure/Arrange layout.
//!
//! Two passes over the control tree:
//!
//! - `measure(available)` asks a control how much room it wants. The answer
//!   is cached against the argument, so re-measuring with the same size is free.
//! - `arrange(slot)` hands the control its final rectangle and lets it place
//!   its children. Alignment and margins decide where the control's own
//!   buffer sits inside the slot (`actual_offset`) and how much of it shows
//!   (`layout_clip`).
//!
//! Each node carries a [`LayoutInfo`] whose `validity` records how far the
//! current pass got: `Nothing → Measure → Arrange → Render`.

pub mod flex;

pub use flex::{FlexAlign, FlexDirection, FlexJustify, FlexPanel, FlexWrap};

use log::trace;

use crate::control::{ControlId, ControlTree, HorizontalAlignment, VerticalAlignment, Visibility};
use crate::geometry::{Rect, Size, Vector};

// =============================================================================
// LayoutInfo
// =============================================================================

/// How far a node got through the current layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LayoutValidity {
    #[default]
    Nothing,
    Measure,
    Arrange,
    Render,
}

/// Snapshot of one control's layout results.
///
/// Equality ignores `validity`: two snapshots with the same geometry are the
/// same layout, however far each pass got.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutInfo {
    pub measure_argument: Size,
    /// Desired size before margins and before clipping to the available size.
    pub unclipped_desired_size: Size,
    pub desired_size: Size,
    /// Slot handed down by the parent, in parent coordinates.
    pub render_slot_rect: Rect,
    pub render_size: Size,
    /// Visible part of the control's own buffer, in its own coordinates.
    pub layout_clip: Rect,
    /// Own-buffer origin in parent coordinates.
    pub actual_offset: Vector,
    pub validity: LayoutValidity,
}

impl PartialEq for LayoutInfo {
    fn eq(&self, other: &Self) -> bool {
        self.measure_argument == other.measure_argument
            && self.unclipped_desired_size == other.unclipped_desired_size
            && self.desired_size == other.desired_size
            && self.render_slot_rect == other.render_slot_rect
            && self.render_size == other.render_size
            && self.layout_clip == other.layout_clip
            && self.actual_offset == other.actual_offset
    }
}

impl Eq for LayoutInfo {}

impl LayoutInfo {
    /// Part of the own buffer that is composited into the parent, in own coordinates.
    pub fn composite_region(&self) -> Rect {
        self.layout_clip
            .intersect(&Rect::from_size(self.render_size))
            .intersect(&self.render_slot_rect.translated(-self.actual_offset))
    }
}

// =============================================================================
// LayoutContext
// =============================================================================

/// Handed to layout overrides; gives access to the children of one control.
pub struct LayoutContext<'a> {
    tree: &'a mut ControlTree,
    id: ControlId,
}

impl<'a> LayoutContext<'a> {
    pub(crate) fn new(tree: &'a mut ControlTree, id: ControlId) -> Self {
        Self { tree, id }
    }

    /// The control being laid out.
    pub fn id(&self) -> ControlId {
        self.id
    }

    /// Children in Z order, invisible ones included.
    pub fn children(&self) -> Vec<ControlId> {
        self.tree.children(self.id).to_vec()
    }

    pub fn measure(&mut self, child: ControlId, available: Size) -> Size {
        measure(self.tree, child, available)
    }

    pub fn arrange(&mut self, child: ControlId, slot: Rect) {
        arrange(self.tree, child, slot)
    }

    /// Desired size from the child's last measure.
    pub fn desired_size(&self, child: ControlId) -> Size {
        self.tree.node(child).layout.desired_size
    }

    pub fn visibility(&self, child: ControlId) -> Visibility {
        self.tree.visibility(child)
    }

    pub fn tree(&self) -> &ControlTree {
        self.tree
    }
}

// =============================================================================
// Measure
// =============================================================================

/// Measure `id` against `available` and return its desired size (margins included).
pub fn measure(tree: &mut ControlTree, id: ControlId, available: Size) -> Size {
    let node = tree.node_mut(id);
    if node.layout.validity != LayoutValidity::Nothing
        && node.layout.measure_argument == available
    {
        return node.layout.desired_size;
    }
    if node.layout.validity == LayoutValidity::Render {
        node.last_layout = node.layout;
    }

    if node.visibility == Visibility::Collapsed {
        node.layout.measure_argument = available;
        node.layout.unclipped_desired_size = Size::ZERO;
        node.layout.desired_size = Size::ZERO;
        node.layout.validity = LayoutValidity::Measure;
        return Size::ZERO;
    }

    let props = node.props;
    let constrained = props.clamp(available.deflate(props.margin));

    let mut control = tree.take_control(id);
    let wanted = {
        let mut ctx = LayoutContext::new(tree, id);
        control.measure_override(&mut ctx, constrained)
    };
    tree.restore_control(id, control);

    let unclipped = props.clamp(wanted.max(Size::ZERO));
    let desired = unclipped.inflate(props.margin).min(available);

    let node = tree.node_mut(id);
    node.layout.measure_argument = available;
    node.layout.unclipped_desired_size = unclipped;
    node.layout.desired_size = desired;
    node.layout.validity = LayoutValidity::Measure;
    trace!("measure {id}: {available:?} -> {desired:?}");
    desired
}

// =============================================================================
// Arrange
// =============================================================================

/// Place `id` into `slot` (parent coordinates).
pub fn arrange(tree: &mut ControlTree, id: ControlId, slot: Rect) {
    let node = tree.node(id);
    if node.layout.validity >= LayoutValidity::Arrange && node.layout.render_slot_rect == slot {
        return;
    }
    if node.layout.validity == LayoutValidity::Nothing {
        measure(tree, id, slot.size());
    }

    let node = tree.node_mut(id);
    if node.layout.validity == LayoutValidity::Render {
        node.last_layout = node.layout;
    }

    if node.visibility == Visibility::Collapsed {
        node.layout.render_slot_rect = slot;
        node.layout.render_size = Size::ZERO;
        node.layout.layout_clip = Rect::EMPTY;
        node.layout.actual_offset = Vector::new(slot.x, slot.y);
        node.layout.validity = LayoutValidity::Arrange;
        return;
    }

    let props = node.props;
    let unclipped = node.layout.unclipped_desired_size;
    let client = slot.size().deflate(props.margin);

    let mut arrange_size = client;
    if props.horizontal_alignment != HorizontalAlignment::Stretch {
        arrange_size.width = unclipped.width;
    }
    if props.vertical_alignment != VerticalAlignment::Stretch {
        arrange_size.height = unclipped.height;
    }
    let arrange_size = props.clamp(arrange_size);

    let mut control = tree.take_control(id);
    let returned = {
        let mut ctx = LayoutContext::new(tree, id);
        control.arrange_override(&mut ctx, arrange_size)
    };
    tree.restore_control(id, control);
    let render_size = returned.max(Size::ZERO);

    let offset_x = horizontal_offset(props.horizontal_alignment, client.width, render_size.width);
    let offset_y = vertical_offset(props.vertical_alignment, client.height, render_size.height);
    let visible = Size {
        width: (client.width - offset_x).max(0),
        height: (client.height - offset_y).max(0),
    };

    let node = tree.node_mut(id);
    node.layout.render_slot_rect = slot;
    node.layout.render_size = render_size;
    node.layout.actual_offset = Vector::new(
        slot.x + props.margin.left + offset_x,
        slot.y + props.margin.top + offset_y,
    );
    node.layout.layout_clip = Rect::from_size(render_size).intersect(&Rect::from_size(visible));
    node.layout.validity = LayoutValidity::Arrange;
    trace!("arrange {id}: {slot:?} -> {render_size:?}");
}

/// Offset of ink inside the client area; overflowing ink falls back to the left edge.
fn horizontal_offset(alignment: HorizontalAlignment, client: i32, ink: i32) -> i32 {
    if ink > client {
        return 0;
    }
    match alignment {
        HorizontalAlignment::Left | HorizontalAlignment::Stretch => 0,
        HorizontalAlignment::Center => (client - ink) / 2,
        HorizontalAlignment::Right => client - ink,
    }
}

fn vertical_offset(alignment: VerticalAlignment, client: i32, ink: i32) -> i32 {
    if ink > client {
        return 0;
    }
    match alignment {
        VerticalAlignment::Top | VerticalAlignment::Stretch => 0,
        VerticalAlignment::Center => (client - ink) / 2,
        VerticalAlignment::Bottom => client - ink,
    }
}

// =============================================================================
// Validity bookkeeping
// =============================================================================

/// Start over for `id`: the current snapshot becomes `last_layout`.
///
/// Returns true when the control left the `Render` state.
pub(crate) fn reset_validity(tree: &mut ControlTree, id: ControlId) -> bool {
    let node = tree.node_mut(id);
    let was_rendered = node.layout.validity == LayoutValidity::Render;
    if node.layout.validity != LayoutValidity::Nothing {
        node.last_layout = node.layout;
    }
    node.layout = LayoutInfo::default();
    was_rendered
}

/// Mark a subtree that was laid out but is not drawn as up to date.
pub(crate) fn set_validity_to_render(tree: &mut ControlTree, id: ControlId) {
    for c in tree.subtree(id) {
        let node = tree.node_mut(c);
        if node.layout.validity == LayoutValidity::Arrange {
            node.layout.validity = LayoutValidity::Render;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{Layout, LayoutProps};
    use crate::controls::{Fill, TextBlock};
    use crate::geometry::Thickness;

    fn single(
        control: impl crate::control::Control,
        props: LayoutProps,
    ) -> (ControlTree, ControlId) {
        let mut tree = ControlTree::new();
        let id = tree.insert(control);
        tree.set_props(id, props);
        tree.set_root(id);
        (tree, id)
    }

    #[test]
    fn test_measure_is_cached_per_argument() {
        let (mut tree, id) = single(TextBlock::new("hello"), LayoutProps::default());
        let first = measure(&mut tree, id, Size::new(20, 5));
        assert_eq!(first, Size::new(5, 1));
        let snapshot = *tree.node(id).layout();
        assert_eq!(measure(&mut tree, id, Size::new(20, 5)), first);
        assert_eq!(*tree.node(id).layout(), snapshot);
    }

    #[test]
    fn test_desired_size_includes_margin_and_clips() {
        let props = LayoutProps::default().with_margin(Thickness::uniform(1));
        let (mut tree, id) = single(TextBlock::new("hello"), props);
        assert_eq!(measure(&mut tree, id, Size::new(20, 5)), Size::new(7, 3));
        // Clipped to a finite available width; the unclipped size keeps the text.
        let (mut tree, id) = single(TextBlock::new("hello"), LayoutProps::default());
        assert_eq!(measure(&mut tree, id, Size::new(3, 1)), Size::new(3, 1));
        assert_eq!(tree.node(id).layout().unclipped_desired_size, Size::new(5, 1));
    }

    #[test]
    fn test_infinite_available_is_not_clipped() {
        let (mut tree, id) = single(TextBlock::new("abc"), LayoutProps::default());
        assert_eq!(measure(&mut tree, id, Size::UNBOUNDED), Size::new(3, 1));
    }

    #[test]
    fn test_collapsed_measures_zero() {
        let (mut tree, id) = single(TextBlock::new("abc"), LayoutProps::default());
        tree.set_visibility(id, Visibility::Collapsed);
        assert_eq!(measure(&mut tree, id, Size::new(10, 10)), Size::ZERO);
    }

    #[test]
    fn test_center_alignment_offset_and_clip() {
        let props = LayoutProps::default()
            .with_alignment(HorizontalAlignment::Center, VerticalAlignment::Bottom)
            .with_margin(Thickness::new(1, 1, 1, 1));
        let (mut tree, id) = single(TextBlock::new("ab"), props);
        measure(&mut tree, id, Size::new(10, 6));
        arrange(&mut tree, id, Rect::new(0, 0, 10, 6));
        let layout = tree.node(id).layout();
        assert_eq!(layout.render_size, Size::new(2, 1));
        // client = 8x4, ink 2x1 -> x offset 3, y offset 3.
        assert_eq!(layout.actual_offset, Vector::new(4, 4));
        assert_eq!(layout.layout_clip, Rect::new(0, 0, 2, 1));
        assert_eq!(layout.validity, LayoutValidity::Arrange);
    }

    #[test]
    fn test_overflowing_ink_falls_back_to_left_and_clips() {
        let props = LayoutProps::default()
            .with_alignment(HorizontalAlignment::Right, VerticalAlignment::Top);
        let (mut tree, id) = single(TextBlock::new("abcdef"), props);
        measure(&mut tree, id, Size::new(4, 1));
        arrange(&mut tree, id, Rect::new(2, 0, 4, 1));
        let layout = tree.node(id).layout();
        assert_eq!(layout.render_size, Size::new(6, 1));
        assert_eq!(layout.actual_offset, Vector::new(2, 0));
        assert_eq!(layout.layout_clip, Rect::new(0, 0, 4, 1));
        assert_eq!(layout.composite_region(), Rect::new(0, 0, 4, 1));
    }

    #[test]
    fn test_stretch_takes_client_area() {
        let props = LayoutProps::default().with_margin(Thickness::new(2, 1, 0, 0));
        let (mut tree, id) = single(Fill::new('#'), props);
        measure(&mut tree, id, Size::new(10, 5));
        arrange(&mut tree, id, Rect::new(0, 0, 10, 5));
        let layout = tree.node(id).layout();
        assert_eq!(layout.render_size, Size::new(8, 4));
        assert_eq!(layout.actual_offset, Vector::new(2, 1));
    }

    #[test]
    fn test_arrange_is_idempotent() {
        let (mut tree, id) = single(TextBlock::new("abc"), LayoutProps::default());
        measure(&mut tree, id, Size::new(10, 2));
        arrange(&mut tree, id, Rect::new(0, 0, 10, 2));
        let first = *tree.node(id).layout();
        measure(&mut tree, id, Size::new(10, 2));
        arrange(&mut tree, id, Rect::new(0, 0, 10, 2));
        let second = *tree.node(id).layout();
        assert_eq!(first, second);
        assert_eq!(second.validity, LayoutValidity::Arrange);
    }

    #[test]
    fn test_arrange_measures_when_needed() {
        let (mut tree, id) = single(TextBlock::new("abc"), LayoutProps::default());
        arrange(&mut tree, id, Rect::new(0, 0, 5, 1));
        assert_eq!(tree.node(id).layout().measure_argument, Size::new(5, 1));
    }

    struct Column;

    impl Layout for Column {
        fn measure_override(&mut self, ctx: &mut LayoutContext<'_>, available: Size) -> Size {
            let mut total = Size::ZERO;
            for child in ctx.children() {
                let d = ctx.measure(child, Size::new(available.width, Size::INFINITE));
                total.width = total.width.max(d.width);
                total.height += d.height;
            }
            total
        }

        fn arrange_override(&mut self, ctx: &mut LayoutContext<'_>, final_size: Size) -> Size {
            let mut y = 0;
            for child in ctx.children() {
                let h = ctx.desired_size(child).height;
                ctx.arrange(child, Rect::new(0, y, final_size.width, h));
                y += h;
            }
            final_size
        }
    }

    impl crate::control::Render for Column {
        fn render(&self, _: &mut crate::render::RenderingBuffer, _: Size) {}
    }

    impl crate::control::Control for Column {}

    #[test]
    fn test_container_places_children() {
        let mut tree = ControlTree::new();
        let column = tree.insert(Column);
        let a = tree.insert(TextBlock::new("one"));
        let b = tree.insert(TextBlock::new("two\nlines"));
        tree.set_root(column);
        tree.add_child(column, a);
        tree.add_child(column, b);
        assert_eq!(measure(&mut tree, column, Size::new(10, 10)), Size::new(5, 3));
        arrange(&mut tree, column, Rect::new(0, 0, 10, 10));
        assert_eq!(tree.node(b).layout().render_slot_rect, Rect::new(0, 1, 10, 2));
        assert_eq!(tree.node(b).layout().actual_offset, Vector::new(0, 1));
    }

    #[test]
    fn test_reset_validity_snapshots() {
        let (mut tree, id) = single(TextBlock::new("abc"), LayoutProps::default());
        arrange(&mut tree, id, Rect::new(0, 0, 5, 1));
        tree.node_mut(id).layout.validity = LayoutValidity::Render;
        assert!(reset_validity(&mut tree, id));
        assert_eq!(tree.node(id).layout().validity, LayoutValidity::Nothing);
        assert_eq!(tree.node(id).last_layout().render_size, Size::new(5, 1));
        assert!(!reset_validity(&mut tree, id));
        assert_eq!(tree.node(id).last_layout().render_size, Size::new(5, 1));
    }
}
