//! Core cell types for spark-retained.
//!
//! Everything the compositor moves around is built from these: a [`Cell`]
//! (glyph, colors, attributes) and an [`Opacity`] code that says how the cell
//! blends with whatever lies beneath it.

use crate::error::{UsageError, fatal};

// =============================================================================
// Color
// =============================================================================

/// RGBA color with 8-bit channels (0-255).
///
/// Alpha is carried for completeness; the compositor works with opacity codes,
/// not alpha blending. Special value: r=-1 means "terminal default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: i16,
    pub g: i16,
    pub b: i16,
    pub a: i16,
}

impl Rgba {
    /// Create a new RGBA color.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as i16,
            g: g as i16,
            b: b as i16,
            a: a as i16,
        }
    }

    /// Create an opaque RGB color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Terminal default color (let terminal decide).
    pub const TERMINAL_DEFAULT: Self = Self {
        r: -1,
        g: -1,
        b: -1,
        a: -1,
    };

    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    pub const YELLOW: Self = Self::rgb(255, 255, 0);
    pub const CYAN: Self = Self::rgb(0, 255, 255);
    pub const MAGENTA: Self = Self::rgb(255, 0, 255);
    pub const GRAY: Self = Self::rgb(128, 128, 128);
    /// Foreground used for shadowed cells.
    pub const DARK_GRAY: Self = Self::rgb(64, 64, 64);

    /// Create an ANSI palette color (0-255).
    ///
    /// Uses special marker: r=-2, g=palette_index.
    pub const fn ansi(index: u8) -> Self {
        Self {
            r: -2,
            g: index as i16,
            b: 0,
            a: 255,
        }
    }

    /// Check if this is the terminal default color.
    #[inline]
    pub const fn is_terminal_default(&self) -> bool {
        self.r == -1
    }

    /// Check if this is an ANSI palette color.
    #[inline]
    pub const fn is_ansi(&self) -> bool {
        self.r == -2
    }

    /// Get ANSI palette index (only valid if is_ansi() returns true).
    #[inline]
    pub const fn ansi_index(&self) -> u8 {
        self.g as u8
    }
}

// =============================================================================
// Cell Attributes (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Text attributes as a bitfield for efficient storage and comparison.
    ///
    /// Combine with bitwise OR: `Attr::BOLD | Attr::ITALIC`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        const NONE = 0;
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK = 1 << 4;
        const INVERSE = 1 << 5;
        const HIDDEN = 1 << 6;
        const STRIKETHROUGH = 1 << 7;
    }
}

// =============================================================================
// Cell
// =============================================================================

/// A single character cell.
///
/// `char == 0` marks the continuation half of a wide glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Unicode codepoint (32 for space).
    pub char: u32,
    pub fg: Rgba,
    pub bg: Rgba,
    pub attrs: Attr,
}

impl Cell {
    /// Build a cell from a `char` and colors.
    pub const fn new(ch: char, fg: Rgba, bg: Rgba, attrs: Attr) -> Self {
        Self {
            char: ch as u32,
            fg,
            bg,
            attrs,
        }
    }

    /// The cell's glyph, if it is a valid scalar value.
    pub fn glyph(&self) -> Option<char> {
        char::from_u32(self.char)
    }

    /// The look of a cell covered by a shadow: same glyph, dark-gray on black.
    pub fn shadowed(&self) -> Self {
        Self {
            char: self.char,
            fg: Rgba::DARK_GRAY,
            bg: Rgba::BLACK,
            attrs: Attr::NONE,
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            char: b' ' as u32,
            fg: Rgba::TERMINAL_DEFAULT,
            bg: Rgba::TERMINAL_DEFAULT,
            attrs: Attr::NONE,
        }
    }
}

// =============================================================================
// Opacity codes
// =============================================================================

/// How a cell of a child buffer blends into its parent.
///
/// Low two bits are the [`OpacityKind`]; bit 2 lets mouse hit-testing pass
/// through the cell to whatever lies beneath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Opacity(u8);

/// The visual part of an opacity code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpacityKind {
    Opaque,
    Shadow,
    Transparent,
    TransparentBackground,
}

impl Opacity {
    pub const OPAQUE: Self = Self(0);
    pub const SHADOW: Self = Self(1);
    pub const TRANSPARENT: Self = Self(2);
    pub const TRANSPARENT_BACKGROUND: Self = Self(3);
    const MOUSE_PASS_BIT: u8 = 0b100;

    /// Build an opacity from its raw 3-bit code. Codes above 7 are fatal.
    pub fn new(code: u8) -> Self {
        if code > 7 {
            fatal(UsageError::InvalidOpacity(code));
        }
        Self(code)
    }

    /// Raw code, 0..=7.
    #[inline]
    pub const fn code(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn kind(self) -> OpacityKind {
        match self.0 & 0b11 {
            0 => OpacityKind::Opaque,
            1 => OpacityKind::Shadow,
            2 => OpacityKind::Transparent,
            _ => OpacityKind::TransparentBackground,
        }
    }

    /// Whether mouse hit-testing passes through this cell.
    #[inline]
    pub const fn passes_mouse(self) -> bool {
        self.0 & Self::MOUSE_PASS_BIT != 0
    }

    /// Same visual kind, with mouse pass-through set.
    #[inline]
    pub const fn with_mouse_pass_through(self) -> Self {
        Self(self.0 | Self::MOUSE_PASS_BIT)
    }

    /// Codes 2 and 6: the cell takes whatever is composited onto it.
    #[inline]
    pub const fn is_fully_transparent(self) -> bool {
        matches!(self.kind(), OpacityKind::Transparent)
    }
}

// =============================================================================
// Border Styles
// =============================================================================

/// Border style used by
/// [`RenderingBuffer::draw_border`](crate::render::RenderingBuffer::draw_border).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    None,
    /// ─ │ ┌ ┐ └ ┘
    Single,
    /// ═ ║ ╔ ╗ ╚ ╝
    Double,
    /// ─ │ ╭ ╮ ╰ ╯
    Rounded,
    /// - | + + + +
    Ascii,
}

impl BorderStyle {
    /// (horizontal, vertical, top_left, top_right, bottom_right, bottom_left)
    pub const fn chars(&self) -> (char, char, char, char, char, char) {
        match self {
            Self::None => (' ', ' ', ' ', ' ', ' ', ' '),
            Self::Single => ('─', '│', '┌', '┐', '┘', '└'),
            Self::Double => ('═', '║', '╔', '╗', '╝', '╚'),
            Self::Rounded => ('─', '│', '╭', '╮', '╯', '╰'),
            Self::Ascii => ('-', '|', '+', '+', '+', '+'),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
