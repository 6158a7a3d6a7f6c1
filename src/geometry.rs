//! Geometric primitives shared by the selection machine and the overlay.
//!
//! Everything here is pure: rectangles are corner pairs in image-pixel
//! space and are not required to be normalized (the first corner is the
//! anchor the operator pressed, wherever that is).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A corner pair. `start` is the anchor corner and is preserved by
/// [`square_from`]; `end` may lie on any side of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub start: Point,
    pub end: Point,
}

impl Rect {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }
}

#[cfg(test)]
impl Rect {
    pub fn is_square(&self) -> bool {
        (self.end.x - self.start.x).abs() == (self.end.y - self.start.y).abs()
    }
}

/// Serialized form used in the description file: `((x1, y1), (x2, y2))`.
impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(({}, {}), ({}, {}))",
            self.start.x, self.start.y, self.end.x, self.end.y
        )
    }
}

/// Normalizes the drag from `start` to `end` into a square anchored at
/// `start`, growing both axes along the axis of larger magnitude. Height
/// wins ties.
pub fn square_from(start: Point, end: Point) -> Rect {
    let w = end.x - start.x;
    let h = end.y - start.y;
    if w.abs() > h.abs() {
        Rect::new(start, Point::new(start.x + w, start.y + w))
    } else {
        Rect::new(start, Point::new(start.x + h, start.y + h))
    }
}

/// Translates `rect` by `(dx, dy)`, correcting each axis delta so both
/// corners stay within `[0, width]` × `[0, height]`. The lower bound is
/// corrected before the upper bound, so a rect larger than the canvas
/// settles against the zero edge. Size is never altered.
pub fn translate_clamped(rect: Rect, dx: i32, dy: i32, width: i32, height: i32) -> Rect {
    let mut dx = dx;
    if rect.start.x + dx < 0 {
        dx += -(rect.start.x + dx);
    }
    if rect.end.x + dx < 0 {
        dx += -(rect.end.x + dx);
    }
    if rect.start.x + dx > width {
        dx += width - (rect.start.x + dx);
    }
    if rect.end.x + dx > width {
        dx += width - (rect.end.x + dx);
    }

    let mut dy = dy;
    if rect.start.y + dy < 0 {
        dy += -(rect.start.y + dy);
    }
    if rect.end.y + dy < 0 {
        dy += -(rect.end.y + dy);
    }
    if rect.start.y + dy > height {
        dy += height - (rect.start.y + dy);
    }
    if rect.end.y + dy > height {
        dy += height - (rect.end.y + dy);
    }

    Rect::new(
        Point::new(rect.start.x + dx, rect.start.y + dy),
        Point::new(rect.end.x + dx, rect.end.y + dy),
    )
}

fn between(v: i32, a: i32, b: i32) -> bool {
    (v > a && v < b) || (v < a && v > b)
}

/// Strict-interior containment; `bounds` corners may be given in either
/// order. Points on an edge are outside.
pub fn contains(point: Point, bounds: Rect) -> bool {
    between(point.x, bounds.start.x, bounds.end.x) && between(point.y, bounds.start.y, bounds.end.y)
}
