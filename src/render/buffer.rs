//! Cell buffer with a parallel opacity matrix.
//!
//! Every control owns two of these: its own render output and the "full"
//! buffer with all visible children composited on top in Z order. The
//! compositing step is [`RenderingBuffer::apply_child`]; the per-cell rule
//! is [`compose_cell`].

use unicode_width::UnicodeWidthChar;

use super::canvas::PhysicalCanvas;
use crate::error::{UsageError, fatal};
use crate::geometry::{Point, Rect, Size, Vector};
use crate::layout::LayoutInfo;
use crate::types::{Attr, BorderStyle, Cell, Opacity, OpacityKind, Rgba};

// =============================================================================
// Composition rule
// =============================================================================

/// Blend one child cell onto one parent cell.
///
/// A fully transparent parent cell (code 2 or 6) takes the child's cell and
/// code, so transparency keeps propagating when the parent is itself
/// composited further up. Any other parent keeps its code, and the child's
/// kind decides the look.
pub fn compose_cell(parent: (Cell, Opacity), child: (Cell, Opacity)) -> (Cell, Opacity) {
    let (parent_cell, parent_op) = parent;
    let (child_cell, child_op) = child;
    if parent_op.is_fully_transparent() {
        return child;
    }
    let cell = match child_op.kind() {
        OpacityKind::Opaque => child_cell,
        OpacityKind::Shadow => parent_cell.shadowed(),
        OpacityKind::Transparent => parent_cell,
        OpacityKind::TransparentBackground => Cell {
            bg: parent_cell.bg,
            ..child_cell
        },
    };
    (cell, parent_op)
}

// =============================================================================
// RenderingBuffer
// =============================================================================

/// Grid of cells plus one opacity code per cell.
///
/// Storage only grows: [`RenderingBuffer::grow`] reallocates and keeps the
/// old content, shrinking requests are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderingBuffer {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    opacity: Vec<Opacity>,
}

impl RenderingBuffer {
    pub fn new(size: Size) -> Self {
        let mut buffer = Self::default();
        buffer.grow(size);
        buffer
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size())
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    /// Make room for at least `size`, keeping existing content.
    pub fn grow(&mut self, size: Size) {
        if size.width <= self.width && size.height <= self.height {
            return;
        }
        let width = size.width.max(self.width);
        let height = size.height.max(self.height);
        let len = (width * height) as usize;
        let mut cells = vec![Cell::default(); len];
        let mut opacity = vec![Opacity::OPAQUE; len];
        for y in 0..self.height {
            let from = (y * self.width) as usize;
            let to = (y * width) as usize;
            let n = self.width as usize;
            cells[to..to + n].copy_from_slice(&self.cells[from..from + n]);
            opacity[to..to + n].copy_from_slice(&self.opacity[from..from + n]);
        }
        self.width = width;
        self.height = height;
        self.cells = cells;
        self.opacity = opacity;
    }

    /// Reset every cell to a blank opaque cell.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::default());
        self.opacity.fill(Opacity::OPAQUE);
    }

    pub fn cell(&self, x: i32, y: i32) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    pub fn opacity(&self, x: i32, y: i32) -> Option<Opacity> {
        self.index(x, y).map(|i| self.opacity[i])
    }

    /// Write a cell. Out-of-bounds coordinates are fatal.
    #[track_caller]
    pub fn set_pixel(&mut self, x: i32, y: i32, cell: Cell, opacity: Opacity) {
        let Some(i) = self.index(x, y) else {
            fatal(UsageError::PixelOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        };
        self.cells[i] = cell;
        self.opacity[i] = opacity;
    }

    /// Write a cell if it is inside the buffer. Returns whether it was written.
    pub fn set_pixel_safe(&mut self, x: i32, y: i32, cell: Cell, opacity: Opacity) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.cells[i] = cell;
                self.opacity[i] = opacity;
                true
            }
            None => false,
        }
    }

    #[track_caller]
    pub fn set_opacity(&mut self, x: i32, y: i32, opacity: Opacity) {
        let Some(i) = self.index(x, y) else {
            fatal(UsageError::PixelOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        };
        self.opacity[i] = opacity;
    }

    /// Set the opacity code of every cell in `rect` (clipped).
    pub fn set_opacity_rect(&mut self, rect: Rect, opacity: Opacity) {
        let area = rect.intersect(&self.bounds());
        for p in area.cells() {
            if let Some(i) = self.index(p.x, p.y) {
                self.opacity[i] = opacity;
            }
        }
    }

    /// Fill `rect` (clipped) with one cell and opacity code.
    pub fn fill_rectangle(&mut self, rect: Rect, cell: Cell, opacity: Opacity) {
        let area = rect.intersect(&self.bounds());
        for p in area.cells() {
            if let Some(i) = self.index(p.x, p.y) {
                self.cells[i] = cell;
                self.opacity[i] = opacity;
            }
        }
    }

    /// Draw one line of text starting at (x, y). Returns the number of columns used.
    ///
    /// Wide glyphs take two columns; the second holds a `char == 0`
    /// continuation cell. Zero-width characters are skipped.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_text(
        &mut self,
        x: i32,
        y: i32,
        text: &str,
        fg: Rgba,
        bg: Rgba,
        attrs: Attr,
        opacity: Opacity,
    ) -> i32 {
        let mut col = x;
        for ch in text.chars() {
            if col >= self.width {
                break;
            }
            let w = ch.width().unwrap_or(0) as i32;
            if w == 0 {
                continue;
            }
            self.set_pixel_safe(col, y, Cell::new(ch, fg, bg, attrs), opacity);
            if w == 2 {
                let continuation = Cell {
                    char: 0,
                    fg,
                    bg,
                    attrs,
                };
                self.set_pixel_safe(col + 1, y, continuation, opacity);
            }
            col += w;
        }
        col - x
    }

    /// Draw a box outline along the edge of `rect`.
    pub fn draw_border(&mut self, rect: Rect, style: BorderStyle, fg: Rgba, bg: Rgba) {
        if rect.width < 2 || rect.height < 2 || style == BorderStyle::None {
            return;
        }
        let (horiz, vert, tl, tr, br, bl) = style.chars();
        let (x1, y1) = (rect.x, rect.y);
        let (x2, y2) = (rect.right() - 1, rect.bottom() - 1);
        let mut put = |x: i32, y: i32, ch: char| {
            self.set_pixel_safe(x, y, Cell::new(ch, fg, bg, Attr::NONE), Opacity::OPAQUE);
        };

        put(x1, y1, tl);
        put(x2, y1, tr);
        put(x2, y2, br);
        put(x1, y2, bl);
        for col in (x1 + 1)..x2 {
            put(col, y1, horiz);
            put(col, y2, horiz);
        }
        for row in (y1 + 1)..y2 {
            put(x1, row, vert);
            put(x2, row, vert);
        }
    }

    /// Replace this buffer's content with `source` over `source`'s bounds.
    pub fn copy_from(&mut self, source: &RenderingBuffer) {
        self.grow(source.size());
        self.copy_rect_from(source, source.bounds());
    }

    /// Copy `rect` from `source` into the same coordinates here (clipped to both).
    pub fn copy_rect_from(&mut self, source: &RenderingBuffer, rect: Rect) {
        let area = rect.intersect(&self.bounds()).intersect(&source.bounds());
        for p in area.cells() {
            if let (Some(dst), Some(src)) = (self.index(p.x, p.y), source.index(p.x, p.y)) {
                self.cells[dst] = source.cells[src];
                self.opacity[dst] = source.opacity[src];
            }
        }
    }

    /// Whether any cell of `rect` carries a non-zero opacity code.
    pub fn contains_opacity(&self, rect: Rect) -> bool {
        let area = rect.intersect(&self.bounds());
        area.cells().any(|p| {
            self.index(p.x, p.y)
                .is_some_and(|i| self.opacity[i] != Opacity::OPAQUE)
        })
    }

    /// Composite `child` onto this buffer.
    ///
    /// The painted region, in child coordinates, is `layout_clip ∩ affected ∩
    /// Rect(child_render_size) ∩ (render_slot_rect − actual_offset)`.
    /// It is moved by `actual_offset` and clipped to this buffer. Returns the
    /// painted rect in this buffer's coordinates.
    pub fn apply_child(
        &mut self,
        child: &RenderingBuffer,
        actual_offset: Vector,
        child_render_size: Size,
        render_slot_rect: Rect,
        layout_clip: Rect,
        affected: Option<Rect>,
    ) -> Rect {
        let mut region = layout_clip
            .intersect(&Rect::from_size(child_render_size))
            .intersect(&render_slot_rect.translated(-actual_offset))
            .intersect(&child.bounds());
        if let Some(affected) = affected {
            region = region.intersect(&affected);
        }
        let target = region.translated(actual_offset).intersect(&self.bounds());
        for p in target.cells() {
            let from = p - actual_offset;
            let (Some(dst), Some(src)) = (self.index(p.x, p.y), child.index(from.x, from.y)) else {
                continue;
            };
            let (cell, op) = compose_cell(
                (self.cells[dst], self.opacity[dst]),
                (child.cells[src], child.opacity[src]),
            );
            self.cells[dst] = cell;
            self.opacity[dst] = op;
        }
        target
    }

    /// [`RenderingBuffer::apply_child`] with the geometry taken from a layout snapshot.
    pub fn apply_layout(
        &mut self,
        child: &RenderingBuffer,
        layout: &LayoutInfo,
        affected: Option<Rect>,
    ) -> Rect {
        self.apply_child(
            child,
            layout.actual_offset,
            layout.render_size,
            layout.render_slot_rect,
            layout.layout_clip,
            affected,
        )
    }

    /// Copy `src` (own coordinates) into `target` moved by `offset`, cells and codes alike.
    /// Returns the written rect in target coordinates.
    pub fn copy_region_to(&self, target: &mut RenderingBuffer, src: Rect, offset: Vector) -> Rect {
        let written = src
            .intersect(&self.bounds())
            .translated(offset)
            .intersect(&target.bounds());
        for p in written.cells() {
            let from: Point = p - offset;
            if let (Some(dst), Some(s)) = (target.index(p.x, p.y), self.index(from.x, from.y)) {
                target.cells[dst] = self.cells[s];
                target.opacity[dst] = self.opacity[s];
            }
        }
        written
    }

    /// Copy `src` onto the physical canvas at `offset`. Nothing is painted
    /// until the canvas is flushed.
    pub fn copy_to_canvas(&self, canvas: &mut PhysicalCanvas, src: Rect, offset: Vector) -> Rect {
        self.copy_region_to(canvas.surface_mut(), src, offset)
    }

    /// Row of glyphs, for tests and debugging. Continuation cells are skipped.
    pub fn row_text(&self, y: i32) -> String {
        (0..self.width)
            .filter_map(|x| self.cell(x, y))
            .filter(|c| c.char != 0)
            .filter_map(|c| c.glyph())
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
