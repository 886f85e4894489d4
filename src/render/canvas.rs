//! The terminal-sized canvas and the painters that put it on screen.
//!
//! [`PhysicalCanvas`] holds what the terminal should show. Nothing reaches
//! the terminal until [`PhysicalCanvas::flush`] hands a damage rect to the
//! [`Painter`], which touches exactly the cells inside it.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{
    Attribute, Color, Print, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use unicode_width::UnicodeWidthChar;

use super::RenderingBuffer;
use crate::error::Result;
use crate::geometry::{Point, Rect, Size};
use crate::types::{Attr, Cell, Rgba};

// =============================================================================
// Painter
// =============================================================================

/// Platform side of a flush: paint every cell of `rect` once.
pub trait Painter {
    fn paint(&mut self, surface: &RenderingBuffer, rect: Rect) -> Result<()>;
}

// =============================================================================
// PhysicalCanvas
// =============================================================================

pub struct PhysicalCanvas {
    surface: RenderingBuffer,
    painter: Box<dyn Painter>,
    flush_count: u64,
}

impl PhysicalCanvas {
    pub fn new(size: Size, painter: Box<dyn Painter>) -> Self {
        Self {
            surface: RenderingBuffer::new(size),
            painter,
            flush_count: 0,
        }
    }

    pub fn size(&self) -> Size {
        self.surface.size()
    }

    pub fn bounds(&self) -> Rect {
        self.surface.bounds()
    }

    /// Match the terminal size. Content is discarded.
    pub fn resize(&mut self, size: Size) {
        if size != self.surface.size() {
            self.surface = RenderingBuffer::new(size);
        }
    }

    pub fn surface(&self) -> &RenderingBuffer {
        &self.surface
    }

    pub(crate) fn surface_mut(&mut self) -> &mut RenderingBuffer {
        &mut self.surface
    }

    /// Number of flushes that reached the painter.
    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }

    /// Paint `rect` (clipped to the canvas) to the terminal.
    pub fn flush(&mut self, rect: Rect) -> Result<()> {
        let rect = rect.intersect(&self.bounds());
        if rect.is_empty() {
            return Ok(());
        }
        self.flush_count += 1;
        self.painter.paint(&self.surface, rect)
    }
}

// =============================================================================
// CrosstermPainter
// =============================================================================

/// Paints through crossterm commands, emitting cursor moves, colors and
/// attributes only when they differ from the previous cell.
pub struct CrosstermPainter<W: Write> {
    out: W,
    last_x: i32,
    last_y: i32,
    last_fg: Option<Rgba>,
    last_bg: Option<Rgba>,
    last_attrs: Attr,
}

impl<W: Write> CrosstermPainter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_x: -1,
            last_y: -1,
            last_fg: None,
            last_bg: None,
            last_attrs: Attr::NONE,
        }
    }

    /// Forget the tracked terminal state; the next cell re-emits everything.
    pub fn reset(&mut self) {
        self.last_x = -1;
        self.last_y = -1;
        self.last_fg = None;
        self.last_bg = None;
        self.last_attrs = Attr::NONE;
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint_cell(&mut self, x: i32, y: i32, cell: &Cell) -> Result<()> {
        if y != self.last_y || x != self.last_x + 1 {
            queue!(self.out, MoveTo(x as u16, y as u16))?;
        }

        if cell.attrs != self.last_attrs {
            queue!(self.out, SetAttribute(Attribute::Reset))?;
            for attr in to_attributes(cell.attrs) {
                queue!(self.out, SetAttribute(attr))?;
            }
            self.last_fg = None;
            self.last_bg = None;
            self.last_attrs = cell.attrs;
        }

        if self.last_fg != Some(cell.fg) {
            queue!(self.out, SetForegroundColor(to_color(cell.fg)))?;
            self.last_fg = Some(cell.fg);
        }
        if self.last_bg != Some(cell.bg) {
            queue!(self.out, SetBackgroundColor(to_color(cell.bg)))?;
            self.last_bg = Some(cell.bg);
        }

        queue!(self.out, Print(cell.glyph().unwrap_or(' ')))?;
        self.last_x = x;
        self.last_y = y;
        Ok(())
    }
}

impl<W: Write> Painter for CrosstermPainter<W> {
    /// Wide glyphs are printed whole only when both columns lie inside
    /// `rect`; a half cut off by the rect edge is painted as a blank.
    fn paint(&mut self, surface: &RenderingBuffer, rect: Rect) -> Result<()> {
        // Column already filled by the wide glyph printed just before.
        let mut covered: Option<Point> = None;
        for p in rect.cells() {
            let Some(&cell) = surface.cell(p.x, p.y) else {
                continue;
            };
            if cell.char == 0 && covered == Some(p) {
                self.last_x = p.x;
                self.last_y = p.y;
                covered = None;
                continue;
            }
            covered = None;
            let wide = cell.glyph().and_then(|c| c.width()) == Some(2);
            let whole = p.x + 1 < rect.right()
                && surface.cell(p.x + 1, p.y).is_some_and(|next| next.char == 0);
            if cell.char == 0 || (wide && !whole) {
                let blank = Cell {
                    char: ' ' as u32,
                    ..cell
                };
                self.paint_cell(p.x, p.y, &blank)?;
            } else {
                self.paint_cell(p.x, p.y, &cell)?;
                if wide {
                    covered = Some(Point::new(p.x + 1, p.y));
                }
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

fn to_color(c: Rgba) -> Color {
    if c.is_terminal_default() {
        Color::Reset
    } else if c.is_ansi() {
        Color::AnsiValue(c.ansi_index())
    } else {
        Color::Rgb {
            r: c.r.clamp(0, 255) as u8,
            g: c.g.clamp(0, 255) as u8,
            b: c.b.clamp(0, 255) as u8,
        }
    }
}

fn to_attributes(attrs: Attr) -> Vec<Attribute> {
    let table = [
        (Attr::BOLD, Attribute::Bold),
        (Attr::DIM, Attribute::Dim),
        (Attr::ITALIC, Attribute::Italic),
        (Attr::UNDERLINE, Attribute::Underlined),
        (Attr::BLINK, Attribute::SlowBlink),
        (Attr::INVERSE, Attribute::Reverse),
        (Attr::HIDDEN, Attribute::Hidden),
        (Attr::STRIKETHROUGH, Attribute::CrossedOut),
    ];
    table
        .into_iter()
        .filter(|(flag, _)| attrs.contains(*flag))
        .map(|(_, attr)| attr)
        .collect()
}

// =============================================================================
// MemoryPainter
// =============================================================================

#[derive(Debug, Default)]
struct MemoryLog {
    flushes: Vec<Rect>,
    cells_painted: usize,
    screen: RenderingBuffer,
}

/// In-memory painter: records every flushed rect and mirrors painted cells.
///
/// Clones share the same log, so keep one handle and give the other to the canvas.
#[derive(Debug, Clone, Default)]
pub struct MemoryPainter {
    log: Rc<RefCell<MemoryLog>>,
}

impl MemoryPainter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flushes(&self) -> Vec<Rect> {
        self.log.borrow().flushes.clone()
    }

    pub fn cells_painted(&self) -> usize {
        self.log.borrow().cells_painted
    }

    pub fn clear(&self) {
        let mut log = self.log.borrow_mut();
        log.flushes.clear();
        log.cells_painted = 0;
    }

    /// What the "terminal" shows on row `y`.
    pub fn screen_row(&self, y: i32) -> String {
        self.log.borrow().screen.row_text(y)
    }

    pub fn screen_cell(&self, x: i32, y: i32) -> Option<Cell> {
        self.log.borrow().screen.cell(x, y).copied()
    }
}

impl Painter for MemoryPainter {
    fn paint(&mut self, surface: &RenderingBuffer, rect: Rect) -> Result<()> {
        let mut log = self.log.borrow_mut();
        log.screen.grow(surface.size());
        log.screen.copy_rect_from(surface, rect);
        log.cells_painted += rect.intersect(&surface.bounds()).cells().count();
        log.flushes.push(rect);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Opacity;

    fn filled(size: Size, ch: char) -> RenderingBuffer {
        let mut buf = RenderingBuffer::new(size);
        let cell = Cell::new(ch, Rgba::WHITE, Rgba::BLACK, Attr::NONE);
        buf.fill_rectangle(buf.bounds(), cell, Opacity::OPAQUE);
        buf
    }

    #[test]
    fn test_flush_clips_and_skips_empty() {
        let painter = MemoryPainter::new();
        let mut canvas = PhysicalCanvas::new(Size::new(4, 2), Box::new(painter.clone()));
        canvas.flush(Rect::new(10, 10, 2, 2)).ok();
        assert!(painter.flushes().is_empty());
        canvas.flush(Rect::new(2, 0, 5, 5)).ok();
        assert_eq!(painter.flushes(), vec![Rect::new(2, 0, 2, 2)]);
        assert_eq!(painter.cells_painted(), 4);
        assert_eq!(canvas.flush_count(), 1);
    }

    #[test]
    fn test_flush_only_touches_rect() {
        let painter = MemoryPainter::new();
        let mut canvas = PhysicalCanvas::new(Size::new(4, 1), Box::new(painter.clone()));
        let src = filled(Size::new(4, 1), 'x');
        src.copy_to_canvas(&mut canvas, src.bounds(), crate::geometry::Vector::ZERO);
        canvas.flush(Rect::new(1, 0, 2, 1)).ok();
        assert_eq!(painter.screen_row(0), " xx ");
    }

    #[test]
    fn test_crossterm_painter_skips_redundant_state() {
        let surface = filled(Size::new(3, 1), 'A');
        let mut painter = CrosstermPainter::new(Vec::new());
        painter.paint(&surface, Rect::new(0, 0, 1, 1)).ok();
        let first = painter.writer().len();
        painter.paint(&surface, Rect::new(1, 0, 1, 1)).ok();
        let second = painter.writer().len() - first;
        assert!(second < first, "sequential cell should skip cursor and colors");
        let text = String::from_utf8_lossy(painter.writer()).to_string();
        assert!(text.starts_with("\x1b[1;1H"));
        assert!(text.ends_with('A'));
    }

    #[test]
    fn test_reset_forgets_terminal_state() {
        let surface = filled(Size::new(2, 1), 'A');
        let mut painter = CrosstermPainter::new(Vec::new());
        painter.paint(&surface, Rect::new(0, 0, 1, 1)).ok();
        let first = painter.writer().len();
        painter.reset();
        painter.paint(&surface, Rect::new(1, 0, 1, 1)).ok();
        let second = painter.writer().len() - first;
        assert_eq!(second, first);
        let text = String::from_utf8_lossy(&painter.writer()[first..]).to_string();
        assert!(text.starts_with("\x1b[1;2H"));
    }

    fn wide_row() -> RenderingBuffer {
        let mut surface = RenderingBuffer::new(Size::new(4, 1));
        surface.draw_text(0, 0, "中ab", Rgba::WHITE, Rgba::BLACK, Attr::NONE, Opacity::OPAQUE);
        surface
    }

    fn painted(surface: &RenderingBuffer, rect: Rect) -> String {
        let mut painter = CrosstermPainter::new(Vec::new());
        painter.paint(surface, rect).ok();
        String::from_utf8_lossy(painter.writer()).to_string()
    }

    #[test]
    fn test_wide_glyph_cut_by_right_edge_is_blanked() {
        let text = painted(&wide_row(), Rect::new(0, 0, 1, 1));
        assert!(!text.contains('中'));
        assert!(text.ends_with(' '));
    }

    #[test]
    fn test_continuation_at_left_edge_is_blanked() {
        let text = painted(&wide_row(), Rect::new(1, 0, 1, 1));
        assert!(text.starts_with("\x1b[1;2H"));
        assert!(text.ends_with(' '));
    }

    #[test]
    fn test_whole_wide_glyph_prints_once() {
        let text = painted(&wide_row(), Rect::new(0, 0, 4, 1));
        assert_eq!(text.matches('中').count(), 1);
        assert!(text.ends_with("ab"));
        assert!(!text.contains("\x1b[1;3H"));
    }

    #[test]
    fn test_to_color() {
        assert_eq!(to_color(Rgba::TERMINAL_DEFAULT), Color::Reset);
        assert_eq!(to_color(Rgba::ansi(9)), Color::AnsiValue(9));
        assert_eq!(to_color(Rgba::rgb(1, 2, 3)), Color::Rgb { r: 1, g: 2, b: 3 });
    }
}
