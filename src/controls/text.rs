//! Static text.

use unicode_width::UnicodeWidthStr;

use crate::control::{Control, Layout, Render};
use crate::layout::LayoutContext;
use crate::geometry::{Rect, Size};
use crate::render::RenderingBuffer;
use crate::types::{Attr, Cell, Opacity, Rgba};

/// One or more lines of text at their natural size. No wrapping.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub text: String,
    pub fg: Rgba,
    pub bg: Rgba,
    pub attrs: Attr,
    pub opacity: Opacity,
}

impl TextBlock {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fg: Rgba::TERMINAL_DEFAULT,
            bg: Rgba::TERMINAL_DEFAULT,
            attrs: Attr::NONE,
            opacity: Opacity::OPAQUE,
        }
    }

    pub fn with_colors(mut self, fg: Rgba, bg: Rgba) -> Self {
        self.fg = fg;
        self.bg = bg;
        self
    }

    pub fn with_attrs(mut self, attrs: Attr) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_opacity(mut self, opacity: Opacity) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn set_text(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
    }

    /// Widest line in cells by line count.
    pub fn natural_size(&self) -> Size {
        let mut size = Size::ZERO;
        for line in self.text.lines() {
            size.width = size.width.max(line.width() as i32);
            size.height += 1;
        }
        size
    }
}

impl Layout for TextBlock {
    fn measure_override(&mut self, _ctx: &mut LayoutContext<'_>, _available: Size) -> Size {
        self.natural_size()
    }
}

impl Render for TextBlock {
    fn render(&self, buffer: &mut RenderingBuffer, render_size: Size) {
        let blank = Cell::new(' ', self.fg, self.bg, self.attrs);
        buffer.fill_rectangle(Rect::from_size(render_size), blank, self.opacity);
        for (y, line) in self.text.lines().enumerate() {
            let y = y as i32;
            if y >= render_size.height {
                break;
            }
            buffer.draw_text(0, y, line, self.fg, self.bg, self.attrs, self.opacity);
        }
    }
}

impl Control for TextBlock {}
