//! Controls and the arena that holds them.
//!
//! A control is anything implementing [`Control`]: the two layout overrides
//! from [`Layout`], a [`Render`] pass into its own buffer, and an optional
//! focus capability. Controls never own each other; the [`ControlTree`] owns
//! every node and wires parents and children by [`ControlId`].

mod tree;

pub use tree::{ControlTree, Node};

use std::any::Any;
use std::fmt;

use crate::geometry::{Rect, Size, Thickness};
use crate::layout::LayoutContext;
use crate::render::RenderingBuffer;

// =============================================================================
// Identity
// =============================================================================

/// Handle to a node in a [`ControlTree`].
///
/// The generation is bumped whenever a slot is reused, so an id kept past
/// [`ControlTree::destroy`] never aliases a newer control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ControlId {
    /// Dense slot index, suitable for keying side tables.
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

// =============================================================================
// Layout properties
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    /// Laid out but not drawn.
    Hidden,
    /// Takes no space and is not drawn.
    Collapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlignment {
    Left,
    Center,
    Right,
    #[default]
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlignment {
    Top,
    Center,
    Bottom,
    #[default]
    Stretch,
}

/// Sizing and placement inputs consumed by `measure`/`arrange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutProps {
    pub margin: Thickness,
    pub horizontal_alignment: HorizontalAlignment,
    pub vertical_alignment: VerticalAlignment,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
}

impl Default for LayoutProps {
    fn default() -> Self {
        Self {
            margin: Thickness::ZERO,
            horizontal_alignment: HorizontalAlignment::Stretch,
            vertical_alignment: VerticalAlignment::Stretch,
            width: None,
            height: None,
            min_width: 0,
            min_height: 0,
            max_width: Size::INFINITE,
            max_height: Size::INFINITE,
        }
    }
}

impl LayoutProps {
    /// Effective (min, max) sizes once an explicit width/height is folded in.
    ///
    /// An explicit size pins both bounds, but never below the minimum.
    pub fn min_max(&self) -> (Size, Size) {
        let (min_w, max_w) = axis_bounds(self.width, self.min_width, self.max_width);
        let (min_h, max_h) = axis_bounds(self.height, self.min_height, self.max_height);
        (
            Size {
                width: min_w,
                height: min_h,
            },
            Size {
                width: max_w,
                height: max_h,
            },
        )
    }

    /// Clamp `size` into [`LayoutProps::min_max`].
    pub fn clamp(&self, size: Size) -> Size {
        let (min, max) = self.min_max();
        size.min(max).max(min)
    }

    pub fn with_margin(mut self, margin: Thickness) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_alignment(mut self, h: HorizontalAlignment, v: VerticalAlignment) -> Self {
        self.horizontal_alignment = h;
        self.vertical_alignment = v;
        self
    }

    pub fn with_size(mut self, width: i32, height: i32) -> Self {
        self.width = Some(width.max(0));
        self.height = Some(height.max(0));
        self
    }

    /// Fixed size at `rect`'s position inside a stretch-free parent slot.
    pub fn placed(rect: Rect) -> Self {
        Self::default()
            .with_margin(Thickness::new(rect.x, rect.y, 0, 0))
            .with_alignment(HorizontalAlignment::Left, VerticalAlignment::Top)
            .with_size(rect.width, rect.height)
    }
}

fn axis_bounds(explicit: Option<i32>, min: i32, max: i32) -> (i32, i32) {
    let min = min.max(0);
    let max = max.max(min);
    match explicit {
        Some(v) => {
            let pinned = v.clamp(min, max);
            (pinned, pinned)
        }
        None => (min, max),
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// The two layout overrides.
///
/// The defaults behave like an overlay container: every child is measured
/// with the full available size and arranged over the whole final area.
pub trait Layout {
    fn measure_override(&mut self, ctx: &mut LayoutContext<'_>, available: Size) -> Size {
        let mut desired = Size::ZERO;
        for child in ctx.children() {
            desired = desired.max(ctx.measure(child, available));
        }
        desired
    }

    fn arrange_override(&mut self, ctx: &mut LayoutContext<'_>, final_size: Size) -> Size {
        for child in ctx.children() {
            ctx.arrange(child, Rect::from_size(final_size));
        }
        final_size
    }
}

/// Draws the control's own content (never its children).
pub trait Render {
    fn render(&self, buffer: &mut RenderingBuffer, render_size: Size);
}

/// Downcasting support, implemented for every `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node's behavior.
pub trait Control: Layout + Render + AsAny {
    /// Whether keyboard focus may land here.
    fn focusable(&self) -> bool {
        false
    }

    /// Type name used in diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
