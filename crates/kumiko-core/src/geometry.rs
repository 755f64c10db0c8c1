//! Geometry utilities.
//!
//! Pure rectangle arithmetic used by the split engine, the render
//! dispatch and the pointer-driven modes. No compositor state leaks here.

use serde::{Deserialize, Serialize};

/// Geometry of a rectangular region in global logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// X coordinate one past the right edge.
    pub const fn right(self) -> i32 {
        self.x + self.width as i32
    }

    /// Y coordinate one past the bottom edge.
    pub const fn bottom(self) -> i32 {
        self.y + self.height as i32
    }

    pub const fn size(self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub const fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Intersection of two rectangles, or `None` when they are disjoint.
    pub fn intersection(self, other: Self) -> Option<Self> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Some(Self::new(x, y, (right - x) as u32, (bottom - y) as u32))
    }

    /// Smallest rectangle covering both.
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(x, y, (right - x) as u32, (bottom - y) as u32)
    }

    /// Shrink by `margin` pixels on every side. Collapses to zero size
    /// rather than underflowing.
    pub fn shrink(self, margin: u32) -> Self {
        Self::new(
            self.x + margin as i32,
            self.y + margin as i32,
            self.width.saturating_sub(margin * 2),
            self.height.saturating_sub(margin * 2),
        )
    }

    /// Grow by `margin` pixels on every side.
    pub fn grow(self, margin: u32) -> Self {
        Self::new(
            self.x - margin as i32,
            self.y - margin as i32,
            self.width + margin * 2,
            self.height + margin * 2,
        )
    }

    /// Clamp size to fit within `bounds` and move the origin so the whole
    /// rectangle lies inside it.
    pub fn constrain(self, bounds: Self) -> Self {
        let width = self.width.min(bounds.width);
        let height = self.height.min(bounds.height);
        let x = self.x.clamp(bounds.x, bounds.right() - width as i32);
        let y = self.y.clamp(bounds.y, bounds.bottom() - height as i32);
        Self::new(x, y, width, height)
    }

    /// Position a rectangle of this size centered within `bounds`.
    pub fn center_in(self, bounds: Self) -> Self {
        let x = bounds.x + (bounds.width.saturating_sub(self.width) / 2) as i32;
        let y = bounds.y + (bounds.height.saturating_sub(self.height) / 2) as i32;
        Self::new(x, y, self.width.min(bounds.width), self.height.min(bounds.height))
    }

    /// Anchor this rectangle's size at one of the nine canonical positions
    /// within `bounds`.
    pub fn anchor_in(self, bounds: Self, anchor: Anchor) -> Self {
        let w = self.width.min(bounds.width);
        let h = self.height.min(bounds.height);
        let (cx, cy) = (
            bounds.x + (bounds.width - w) as i32 / 2,
            bounds.y + (bounds.height - h) as i32 / 2,
        );
        let (rx, by) = (bounds.right() - w as i32, bounds.bottom() - h as i32);
        let (x, y) = match anchor {
            Anchor::TopLeft => (bounds.x, bounds.y),
            Anchor::Top => (cx, bounds.y),
            Anchor::TopRight => (rx, bounds.y),
            Anchor::Left => (bounds.x, cy),
            Anchor::Center => (cx, cy),
            Anchor::Right => (rx, cy),
            Anchor::BottomLeft => (bounds.x, by),
            Anchor::Bottom => (cx, by),
            Anchor::BottomRight => (rx, by),
        };
        Self::new(x, y, w, h)
    }

    /// Scale position and size by `factor`.
    pub fn scale(self, factor: f64) -> Self {
        Self::new(
            (f64::from(self.x) * factor) as i32,
            (f64::from(self.y) * factor) as i32,
            (f64::from(self.width) * factor) as u32,
            (f64::from(self.height) * factor) as u32,
        )
    }

    /// Point at the visual center of the rectangle.
    pub const fn center_point(self) -> (i32, i32) {
        (
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }
}

/// Canonical anchored positions inside a bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn shrink_collapses_instead_of_underflowing() {
        let geo = Geometry::new(10, 10, 8, 8);
        let shrunk = geo.shrink(5);
        assert_eq!(shrunk.width, 0);
        assert_eq!(shrunk.height, 0);
        assert_eq!(shrunk.x, 15);
    }

    #[test]
    fn intersection_and_union() {
        let a = Geometry::new(0, 0, 100, 100);
        let b = Geometry::new(50, 50, 100, 100);
        assert_eq!(a.intersection(b), Some(Geometry::new(50, 50, 50, 50)));
        assert_eq!(a.union(b), Geometry::new(0, 0, 150, 150));

        let c = Geometry::new(200, 200, 10, 10);
        assert_eq!(a.intersection(c), None);
    }

    #[test]
    fn constrain_moves_and_clamps() {
        let bounds = Geometry::new(0, 0, 800, 600);
        let oversized = Geometry::new(-50, -50, 1000, 1000);
        let constrained = oversized.constrain(bounds);
        assert_eq!(constrained, bounds);

        let offscreen = Geometry::new(790, 590, 100, 100);
        let constrained = offscreen.constrain(bounds);
        assert_eq!(constrained, Geometry::new(700, 500, 100, 100));
    }

    #[test]
    fn anchoring() {
        let bounds = Geometry::new(0, 0, 100, 100);
        let win = Geometry::new(0, 0, 20, 10);
        assert_eq!(
            win.anchor_in(bounds, Anchor::BottomRight),
            Geometry::new(80, 90, 20, 10)
        );
        assert_eq!(
            win.anchor_in(bounds, Anchor::Center),
            Geometry::new(40, 45, 20, 10)
        );
    }

    #[test]
    fn center_in_bounds() {
        let bounds = Geometry::new(100, 100, 200, 200);
        let win = Geometry::new(0, 0, 50, 50);
        assert_eq!(win.center_in(bounds), Geometry::new(175, 175, 50, 50));
    }
}
