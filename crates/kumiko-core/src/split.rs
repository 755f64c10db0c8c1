//! Split trees and the container layout algorithms.
//!
//! A [`Split`] is user configuration: a recursive division of screen
//! space whose leaves select one of six placement algorithms. Trees are
//! immutable once built and shared via `Arc`; applying a split never
//! copies it. The engine walks the tree in document order, threading a
//! cursor over the tileable view sequence through every leaf.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;
use crate::view::ViewId;

/// Placement algorithm selected by a container leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerLayout {
    /// Exactly the first view, filling the container.
    Single,
    /// Places nothing; a spacer.
    Empty,
    /// Up to `capacity` views stacked at identical full-container
    /// geometry; later views occlude earlier ones.
    Full,
    /// Left-to-right bands.
    Queue,
    /// Top-to-bottom bands.
    Stack,
    /// Row-major grid, smaller dimension grows first.
    Grid,
}

/// The user-configured screen division tree.
///
/// `Vertical` divides along a vertical line into left/right; `Horizontal`
/// along a horizontal line into top/bottom. `scale` is the share given to
/// the first child, defaulting to an even split.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Split {
    Vertical {
        #[serde(default = "default_scale")]
        scale: f64,
        left: Box<Split>,
        right: Box<Split>,
    },
    Horizontal {
        #[serde(default = "default_scale")]
        scale: f64,
        top: Box<Split>,
        bottom: Box<Split>,
    },
    Container {
        #[serde(default)]
        capacity: Option<usize>,
        layout: ContainerLayout,
    },
}

const fn default_scale() -> f64 {
    0.5
}

impl Split {
    /// A lone container, the shape most layout templates reduce to.
    pub const fn container(layout: ContainerLayout, capacity: Option<usize>) -> Self {
        Self::Container { capacity, layout }
    }

    pub fn vertical(scale: f64, left: Self, right: Self) -> Self {
        Self::Vertical {
            scale,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn horizontal(scale: f64, top: Self, bottom: Self) -> Self {
        Self::Horizontal {
            scale,
            top: Box::new(top),
            bottom: Box::new(bottom),
        }
    }

    /// Maximum number of views this tree can place; `None` is unbounded.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            Self::Vertical { left, right, .. } => sum_capacity(left.capacity(), right.capacity()),
            Self::Horizontal { top, bottom, .. } => sum_capacity(top.capacity(), bottom.capacity()),
            Self::Container { capacity, layout } => match layout {
                ContainerLayout::Single => Some(1),
                ContainerLayout::Empty => Some(0),
                ContainerLayout::Full
                | ContainerLayout::Queue
                | ContainerLayout::Stack
                | ContainerLayout::Grid => *capacity,
            },
        }
    }
}

fn sum_capacity(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        _ => None,
    }
}

/// One view placed by an arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub view: ViewId,
    /// The rectangle reserved for the view within the split tree.
    pub tile: Geometry,
    /// Whether the cursor should be warped to this view after commit.
    /// Set on at most the first placement of a walk.
    pub center: bool,
}

/// Result of walking a split tree over a view sequence.
#[derive(Debug, Clone, Default)]
pub struct Arrangement {
    pub placements: Vec<Placement>,
    /// How many views from the input sequence were consumed, in order.
    pub consumed: usize,
}

impl Arrangement {
    /// Views left unplaced by the walk.
    pub fn remaining<'a>(&self, views: &'a [ViewId]) -> &'a [ViewId] {
        &views[self.consumed..]
    }
}

/// Spacing parameters shared by every container algorithm.
#[derive(Debug, Clone, Copy)]
pub struct Spacing {
    pub gap: u32,
    pub border: u32,
}

impl Spacing {
    /// Inset applied to each child at a binary split's shared edge.
    const fn split_inset(self) -> u32 {
        self.gap / 2 + self.border
    }

    /// Spacing between adjacent bands: a gap plus both views' borders.
    const fn band_spacing(self) -> u32 {
        self.gap + 2 * self.border
    }
}

/// Walk `split` over `views`, assigning geometries within `geometry`.
///
/// Views are consumed in document order of the tree's leaves. The
/// returned arrangement records exactly which prefix of `views` was
/// consumed; callers treat an exhausted sequence as "layout full."
pub fn arrange(
    split: &Split,
    geometry: Geometry,
    views: &[ViewId],
    spacing: Spacing,
    center_first: bool,
) -> Arrangement {
    let mut walk = Walk {
        views,
        next: 0,
        center: center_first,
        spacing,
        placements: Vec::new(),
    };
    walk.apply(split, geometry);
    Arrangement {
        placements: walk.placements,
        consumed: walk.next,
    }
}

struct Walk<'a> {
    views: &'a [ViewId],
    next: usize,
    center: bool,
    spacing: Spacing,
    placements: Vec<Placement>,
}

impl Walk<'_> {
    fn remaining(&self) -> usize {
        self.views.len() - self.next
    }

    fn apply(&mut self, split: &Split, geometry: Geometry) {
        match split {
            Split::Vertical {
                scale,
                left,
                right,
            } => {
                let (first, second) = split_pair(geometry, *scale, self.spacing, true);
                self.apply(left, first);
                self.apply(right, second);
            }
            Split::Horizontal {
                scale,
                top,
                bottom,
            } => {
                let (first, second) = split_pair(geometry, *scale, self.spacing, false);
                self.apply(top, first);
                self.apply(bottom, second);
            }
            Split::Container { capacity, layout } => {
                self.container(geometry, *layout, *capacity);
            }
        }
    }

    fn container(&mut self, rect: Geometry, layout: ContainerLayout, capacity: Option<usize>) {
        if self.remaining() == 0 {
            return;
        }
        let cap = capacity.unwrap_or(usize::MAX);
        match layout {
            ContainerLayout::Empty => {}
            ContainerLayout::Single => {
                let inner = rect.shrink(self.spacing.gap + self.spacing.border);
                self.place(inner);
            }
            ContainerLayout::Full => {
                let n = self.remaining().min(cap);
                let inner = rect.shrink(self.spacing.gap + self.spacing.border);
                for _ in 0..n {
                    self.place(inner);
                }
            }
            ContainerLayout::Queue => {
                let n = self.remaining().min(cap);
                for band in bands(rect, n, self.spacing, true) {
                    self.place(band);
                }
            }
            ContainerLayout::Stack => {
                let n = self.remaining().min(cap);
                for band in bands(rect, n, self.spacing, false) {
                    self.place(band);
                }
            }
            ContainerLayout::Grid => {
                let n = self.remaining().min(cap);
                for cell in grid_cells(rect, n, self.spacing) {
                    self.place(cell);
                }
            }
        }
    }

    fn place(&mut self, tile: Geometry) {
        let view = self.views[self.next];
        self.next += 1;
        let center = std::mem::take(&mut self.center);
        self.placements.push(Placement { view, tile, center });
    }
}

/// Divide `rect` into two children at `scale`, insetting both at the
/// shared edge. `vertical` selects a left/right division.
fn split_pair(rect: Geometry, scale: f64, spacing: Spacing, vertical: bool) -> (Geometry, Geometry) {
    let scale = scale.clamp(0.0, 1.0);
    let inset = spacing.split_inset();
    if vertical {
        let pivot = (f64::from(rect.width) * scale) as u32;
        let first = Geometry::new(rect.x, rect.y, pivot.saturating_sub(inset), rect.height);
        let second = Geometry::new(
            rect.x + (pivot + inset) as i32,
            rect.y,
            rect.width.saturating_sub(pivot + inset),
            rect.height,
        );
        (first, second)
    } else {
        let pivot = (f64::from(rect.height) * scale) as u32;
        let first = Geometry::new(rect.x, rect.y, rect.width, pivot.saturating_sub(inset));
        let second = Geometry::new(
            rect.x,
            rect.y + (pivot + inset) as i32,
            rect.width,
            rect.height.saturating_sub(pivot + inset),
        );
        (first, second)
    }
}

/// Divide a span into `n` equal integer lengths, the first absorbing the
/// rounding remainder.
fn band_lengths(avail: u32, n: usize) -> impl Iterator<Item = u32> {
    let base = avail / n as u32;
    let rem = avail % n as u32;
    (0..n).map(move |i| if i == 0 { base + rem } else { base })
}

/// 1-D banding of `rect` into `n` views. `horizontal` lays bands
/// left-to-right (queue); otherwise top-to-bottom (stack).
///
/// Along the banding axis: a gap at either end, `gap + 2*border` between
/// adjacent bands. Across it: `gap + border` at each edge.
fn bands(rect: Geometry, n: usize, spacing: Spacing, horizontal: bool) -> Vec<Geometry> {
    if n == 0 {
        return Vec::new();
    }
    let between = spacing.band_spacing();
    let span = if horizontal { rect.width } else { rect.height };
    let avail = span
        .saturating_sub(2 * spacing.gap)
        .saturating_sub((n as u32 - 1) * between);
    let cross_inset = spacing.gap + spacing.border;

    let mut out = Vec::with_capacity(n);
    let mut pos = spacing.gap as i32;
    for len in band_lengths(avail, n) {
        let band = if horizontal {
            Geometry::new(
                rect.x + pos,
                rect.y + cross_inset as i32,
                len,
                rect.height.saturating_sub(2 * cross_inset),
            )
        } else {
            Geometry::new(
                rect.x + cross_inset as i32,
                rect.y + pos,
                rect.width.saturating_sub(2 * cross_inset),
                len,
            )
        };
        out.push(band);
        pos += len as i32 + between as i32;
    }
    out
}

/// Grid dimensions for `n` views: the smallest `rows × cols >= n` where
/// the smaller dimension grows first and `cols` never exceeds `rows + 1`.
///
/// This exact growth order is user-visible layout behaviour; do not
/// "improve" the fill for the partial cases.
pub fn grid_dimensions(n: usize) -> (usize, usize) {
    let (mut rows, mut cols) = (1, 1);
    while rows * cols < n {
        if cols > rows {
            rows += 1;
        } else {
            cols += 1;
        }
    }
    (rows, cols)
}

/// Row-major grid cells for `n` views, first row/column absorbing the
/// integer remainder.
fn grid_cells(rect: Geometry, n: usize, spacing: Spacing) -> Vec<Geometry> {
    if n == 0 {
        return Vec::new();
    }
    let (rows, cols) = grid_dimensions(n);
    let between = spacing.band_spacing();
    let avail_w = rect
        .width
        .saturating_sub(2 * spacing.gap)
        .saturating_sub((cols as u32 - 1) * between);
    let avail_h = rect
        .height
        .saturating_sub(2 * spacing.gap)
        .saturating_sub((rows as u32 - 1) * between);

    let widths: Vec<u32> = band_lengths(avail_w, cols).collect();
    let heights: Vec<u32> = band_lengths(avail_h, rows).collect();

    let mut out = Vec::with_capacity(n);
    let mut y = spacing.gap as i32;
    'rows: for h in &heights {
        let mut x = spacing.gap as i32;
        for w in &widths {
            out.push(Geometry::new(rect.x + x, rect.y + y, *w, *h));
            if out.len() == n {
                break 'rows;
            }
            x += *w as i32 + between as i32;
        }
        y += *h as i32 + between as i32;
    }
    out
}

/// Shared handle to an immutable split tree.
pub type SplitTree = Arc<Split>;
