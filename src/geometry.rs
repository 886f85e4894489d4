//! Integer cell geometry.
//!
//! All coordinates are terminal cells. A [`Size`] dimension of
//! [`Size::INFINITE`] means "unbounded" and survives arithmetic: adding a
//! margin to an infinite width, or removing one from it, keeps it infinite.

use std::ops::{Add, AddAssign, Neg, Sub};

use crate::error::{UsageError, fatal};

// =============================================================================
// Point / Vector
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A displacement between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Vector {
    pub x: i32,
    pub y: i32,
}

impl Vector {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add<Vector> for Point {
    type Output = Point;
    fn add(self, v: Vector) -> Point {
        Point::new(self.x + v.x, self.y + v.y)
    }
}

impl Sub<Vector> for Point {
    type Output = Point;
    fn sub(self, v: Vector) -> Point {
        Point::new(self.x - v.x, self.y - v.y)
    }
}

impl Sub for Point {
    type Output = Vector;
    fn sub(self, other: Point) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y)
    }
}

impl Add for Vector {
    type Output = Vector;
    fn add(self, v: Vector) -> Vector {
        Vector::new(self.x + v.x, self.y + v.y)
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, v: Vector) {
        self.x += v.x;
        self.y += v.y;
    }
}

impl Sub for Vector {
    type Output = Vector;
    fn sub(self, v: Vector) -> Vector {
        Vector::new(self.x - v.x, self.y - v.y)
    }
}

impl Neg for Vector {
    type Output = Vector;
    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y)
    }
}

// =============================================================================
// Size
// =============================================================================

/// Width and height in cells. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    /// Marker for an unbounded dimension.
    pub const INFINITE: i32 = i32::MAX;
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };
    pub const UNBOUNDED: Self = Self {
        width: Self::INFINITE,
        height: Self::INFINITE,
    };

    /// Build a size. Negative dimensions are fatal.
    #[track_caller]
    pub fn new(width: i32, height: i32) -> Self {
        if width < 0 || height < 0 {
            fatal(UsageError::NegativeSize { width, height });
        }
        Self { width, height }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub const fn is_width_infinite(&self) -> bool {
        self.width == Self::INFINITE
    }

    pub const fn is_height_infinite(&self) -> bool {
        self.height == Self::INFINITE
    }

    /// Component-wise minimum.
    pub fn min(self, other: Size) -> Size {
        Size {
            width: self.width.min(other.width),
            height: self.height.min(other.height),
        }
    }

    /// Component-wise maximum.
    pub fn max(self, other: Size) -> Size {
        Size {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }

    /// Shrink by a thickness, flooring at zero. Infinite dimensions stay infinite.
    pub fn deflate(self, t: Thickness) -> Size {
        Size {
            width: shrink(self.width, t.left + t.right),
            height: shrink(self.height, t.top + t.bottom),
        }
    }

    /// Grow by a thickness. Infinite dimensions stay infinite.
    pub fn inflate(self, t: Thickness) -> Size {
        Size {
            width: grow(self.width, t.left + t.right),
            height: grow(self.height, t.top + t.bottom),
        }
    }
}

fn shrink(value: i32, by: i32) -> i32 {
    if value == Size::INFINITE {
        value
    } else {
        value.saturating_sub(by).max(0)
    }
}

fn grow(value: i32, by: i32) -> i32 {
    if value == Size::INFINITE {
        value
    } else {
        value.saturating_add(by).max(0)
    }
}

// =============================================================================
// Thickness
// =============================================================================

/// Per-side distances, used for margins and padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Thickness {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Thickness {
    pub const ZERO: Self = Self {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn uniform(all: i32) -> Self {
        Self::new(all, all, all, all)
    }
}

// =============================================================================
// Rect
// =============================================================================

/// Axis-aligned rectangle; `right()`/`bottom()` are exclusive.
///
/// A rect with zero width or height is empty. Intersections that do not
/// overlap collapse to [`Rect::EMPTY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const EMPTY: Self = Self {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    /// Build a rect. Negative dimensions are fatal.
    #[track_caller]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        if width < 0 || height < 0 {
            fatal(UsageError::NegativeSize { width, height });
        }
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rect of the given size at the origin.
    pub const fn from_size(size: Size) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }

    pub const fn from_point_size(at: Point, size: Size) -> Self {
        Self {
            x: at.x,
            y: at.y,
            width: size.width,
            height: size.height,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub const fn left(&self) -> i32 {
        self.x
    }

    pub const fn top(&self) -> i32 {
        self.y
    }

    pub const fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub const fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub const fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub const fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        !self.is_empty()
            && p.x >= self.x
            && p.y >= self.y
            && p.x < self.right()
            && p.y < self.bottom()
    }

    /// Whether `other` lies completely inside this rect.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.is_empty()
            || (other.x >= self.x
                && other.y >= self.y
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Overlap of two rects, or [`Rect::EMPTY`].
    pub fn intersect(&self, other: &Rect) -> Rect {
        if self.is_empty() || other.is_empty() {
            return Rect::EMPTY;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return Rect::EMPTY;
        }
        Rect {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }

    /// Smallest rect covering both. Empty operands are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }

    /// Copy moved by `v`. Empty rects stay [`Rect::EMPTY`].
    pub fn translated(&self, v: Vector) -> Rect {
        if self.is_empty() {
            return Rect::EMPTY;
        }
        Rect {
            x: self.x + v.x,
            y: self.y + v.y,
            width: self.width,
            height: self.height,
        }
    }

    /// Move in place. Moving an empty rect is fatal.
    #[track_caller]
    pub fn offset(&mut self, v: Vector) {
        if self.is_empty() {
            fatal(UsageError::EmptyRectMove);
        }
        self.x += v.x;
        self.y += v.y;
    }

    /// Iterate all cell positions, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Point> + '_ {
        let (x0, x1) = (self.x, self.right());
        let rows = if self.is_empty() { 0..0 } else { self.y..self.bottom() };
        rows.flat_map(move |y| (x0..x1).map(move |x| Point::new(x, y)))
    }
}

// =============================================================================
// Tests
// =============================================================================
