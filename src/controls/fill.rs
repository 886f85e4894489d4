//! A control that paints one cell over its whole area.

use crate::control::{Control, Layout, Render};
use crate::geometry::{Rect, Size};
use crate::render::RenderingBuffer;
use crate::types::{Attr, Cell, Opacity, Rgba};

/// Solid (or see-through) block of a single cell.
///
/// Wants no room of its own; it takes whatever the parent arranges it into.
#[derive(Debug, Clone, Default)]
pub struct Fill {
    pub cell: Cell,
    pub opacity: Opacity,
    pub focusable: bool,
}

impl Fill {
    /// White-on-black `ch`, opaque.
    pub fn new(ch: char) -> Self {
        Self {
            cell: Cell::new(ch, Rgba::WHITE, Rgba::BLACK, Attr::NONE),
            ..Self::default()
        }
    }

    pub fn with_opacity(mut self, opacity: Opacity) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_colors(mut self, fg: Rgba, bg: Rgba) -> Self {
        self.cell.fg = fg;
        self.cell.bg = bg;
        self
    }

    pub fn focusable(mut self) -> Self {
        self.focusable = true;
        self
    }
}

impl Layout for Fill {}

impl Render for Fill {
    fn render(&self, buffer: &mut RenderingBuffer, render_size: Size) {
        buffer.fill_rectangle(Rect::from_size(render_size), self.cell, self.opacity);
    }
}

impl Control for Fill {
    fn focusable(&self) -> bool {
        self.focusable
    }
}
