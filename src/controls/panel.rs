//! Background and optional border around overlaid children.

use crate::control::{Control, Layout, Render};
use crate::layout::LayoutContext;
use crate::geometry::{Rect, Size, Thickness};
use crate::render::RenderingBuffer;
use crate::types::{BorderStyle, Cell, Opacity, Rgba};

/// Container that stacks its children over one area, inset by the border.
///
/// With a transparent `opacity` the panel only groups its children: every
/// cell not covered by a child shows whatever lies beneath the panel.
#[derive(Debug, Clone)]
pub struct Panel {
    pub background: Cell,
    pub opacity: Opacity,
    pub border: BorderStyle,
    pub border_fg: Rgba,
}

impl Default for Panel {
    fn default() -> Self {
        Self {
            background: Cell::default(),
            opacity: Opacity::OPAQUE,
            border: BorderStyle::None,
            border_fg: Rgba::TERMINAL_DEFAULT,
        }
    }
}

impl Panel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A panel that draws nothing of its own.
    pub fn transparent() -> Self {
        Self {
            opacity: Opacity::TRANSPARENT,
            ..Self::default()
        }
    }

    pub fn with_background(mut self, background: Cell) -> Self {
        self.background = background;
        self
    }

    pub fn with_border(mut self, border: BorderStyle, fg: Rgba) -> Self {
        self.border = border;
        self.border_fg = fg;
        self
    }

    fn inset(&self) -> Thickness {
        if self.border == BorderStyle::None {
            Thickness::ZERO
        } else {
            Thickness::uniform(1)
        }
    }
}

impl Layout for Panel {
    fn measure_override(&mut self, ctx: &mut LayoutContext<'_>, available: Size) -> Size {
        let inset = self.inset();
        let inner = available.deflate(inset);
        let mut desired = Size::ZERO;
        for child in ctx.children() {
            desired = desired.max(ctx.measure(child, inner));
        }
        desired.inflate(inset)
    }

    fn arrange_override(&mut self, ctx: &mut LayoutContext<'_>, final_size: Size) -> Size {
        let inset = self.inset();
        let inner = final_size.deflate(inset);
        let slot = Rect::new(inset.left, inset.top, inner.width, inner.height);
        for child in ctx.children() {
            ctx.arrange(child, slot);
        }
        final_size
    }
}

impl Render for Panel {
    fn render(&self, buffer: &mut RenderingBuffer, render_size: Size) {
        let area = Rect::from_size(render_size);
        buffer.fill_rectangle(area, self.background, self.opacity);
        buffer.draw_border(area, self.border, self.border_fg, self.background.bg);
    }
}

impl Control for Panel {}
