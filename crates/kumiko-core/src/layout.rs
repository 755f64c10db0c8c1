//! Live layouts: a split tree applied to a sheet's tileable views.
//!
//! A [`Layout`] pairs a shared [`SplitTree`] with the list of [`Tile`]s
//! it currently places. Tiles are transient: created when a view enters
//! the managed set, destroyed when it leaves. A layout with no tiles left
//! is discarded by its sheet.

use crate::geometry::Geometry;
use crate::split::{arrange, Arrangement, Spacing, SplitTree};
use crate::view::ViewId;

/// A view's placement record within an active layout.
///
/// `tile` is the rectangle reserved in the split tree; `view_geometry`
/// is where the view actually sits; they differ when a size-forced view
/// is centered within its tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub view: ViewId,
    pub tile: Geometry,
    pub view_geometry: Geometry,
}

/// The live application of a split tree to a sheet.
#[derive(Debug, Clone)]
pub struct Layout {
    split: SplitTree,
    tiles: Vec<Tile>,
}

impl Layout {
    pub fn new(split: SplitTree) -> Self {
        Self {
            split,
            tiles: Vec::new(),
        }
    }

    pub const fn split(&self) -> &SplitTree {
        &self.split
    }

    /// Swap in a new split tree. Existing tiles stay until the next
    /// arrangement recomputes them.
    pub fn set_split(&mut self, split: SplitTree) {
        self.split = split;
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile_for(&self, view: ViewId) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.view == view)
    }

    pub fn contains(&self, view: ViewId) -> bool {
        self.tile_for(view).is_some()
    }

    /// Position of `view` within the tile order.
    pub fn position(&self, view: ViewId) -> Option<usize> {
        self.tiles.iter().position(|t| t.view == view)
    }

    /// Next view after `view` in tile order, wrapping.
    pub fn next_view(&self, view: ViewId) -> Option<ViewId> {
        let pos = self.position(view)?;
        let next = (pos + 1) % self.tiles.len();
        Some(self.tiles[next].view)
    }

    /// Previous view before `view` in tile order, wrapping.
    pub fn prev_view(&self, view: ViewId) -> Option<ViewId> {
        let pos = self.position(view)?;
        let prev = (pos + self.tiles.len() - 1) % self.tiles.len();
        Some(self.tiles[prev].view)
    }

    pub fn first_view(&self) -> Option<ViewId> {
        self.tiles.first().map(|t| t.view)
    }

    /// Remove `view`'s tile. Returns whether a tile was removed.
    pub fn detach(&mut self, view: ViewId) -> bool {
        let before = self.tiles.len();
        self.tiles.retain(|t| t.view != view);
        self.tiles.len() != before
    }

    /// Re-walk the split tree over `views` within `geometry`, replacing
    /// all tiles. `forced_size` reports the frozen size of views whose
    /// dimensions must not change; those are centered within their tile.
    ///
    /// Returns the arrangement so callers can see which views were
    /// consumed and whether the first placement wants cursor centering.
    pub fn arrange_views(
        &mut self,
        geometry: Geometry,
        views: &[ViewId],
        spacing: Spacing,
        center_first: bool,
        forced_size: impl Fn(ViewId) -> Option<(u32, u32)>,
    ) -> Arrangement {
        let arrangement = arrange(&self.split, geometry, views, spacing, center_first);
        self.tiles = arrangement
            .placements
            .iter()
            .map(|p| {
                let view_geometry = match forced_size(p.view) {
                    Some((w, h)) => Geometry::new(0, 0, w, h).center_in(p.tile),
                    None => p.tile,
                };
                Tile {
                    view: p.view,
                    tile: p.tile,
                    view_geometry,
                }
            })
            .collect();
        arrangement
    }
}
