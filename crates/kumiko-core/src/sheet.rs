//! Sheets: per-workspace virtual desktops.
//!
//! Each workspace owns ten sheets, indexed 0 through 9. Sheet 0 is the
//! sticky sheet: its views are shown as an overlay on top of whichever
//! sheet is current, and it sits outside the 1–9 cycling ring.
//!
//! A sheet holds its views in z-order (tail is topmost) and at most one
//! active [`Layout`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::SurfaceBackend;
use crate::geometry::Geometry;
use crate::layout::Layout;
use crate::split::{Spacing, SplitTree};
use crate::view::{Committed, QueueResult, View, ViewId};

pub const SHEET_COUNT: u8 = 10;

/// A sheet slot, 0 through 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SheetIndex(u8);

impl SheetIndex {
    /// The sticky overlay sheet.
    pub const STICKY: Self = Self(0);

    pub const fn new(index: u8) -> Option<Self> {
        if index < SHEET_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn is_sticky(self) -> bool {
        self.0 == 0
    }

    /// Next sheet in the 1–9 cycling ring. Sheet 0 re-enters at 1.
    pub const fn next_cycle(self) -> Self {
        match self.0 {
            0 | 9 => Self(1),
            n => Self(n + 1),
        }
    }

    /// Previous sheet in the 1–9 cycling ring. Sheet 0 re-enters at 9.
    pub const fn prev_cycle(self) -> Self {
        match self.0 {
            0 | 1 => Self(9),
            n => Self(n - 1),
        }
    }

    pub fn from_digit(ch: char) -> Option<Self> {
        ch.to_digit(10).map(|d| Self(d as u8))
    }
}

impl std::fmt::Display for SheetIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for SheetIndex {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index).ok_or_else(|| format!("sheet index out of range: {index}"))
    }
}

impl From<SheetIndex> for u8 {
    fn from(index: SheetIndex) -> Self {
        index.0
    }
}

/// One virtual desktop: a z-ordered view list and an optional layout.
#[derive(Debug, Default)]
pub struct Sheet {
    views: Vec<ViewId>,
    layout: Option<Layout>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Views bottom to top.
    pub fn views(&self) -> &[ViewId] {
        &self.views
    }

    pub fn contains(&self, view: ViewId) -> bool {
        self.views.contains(&view)
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub const fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn layout_mut(&mut self) -> Option<&mut Layout> {
        self.layout.as_mut()
    }

    /// Insert on top of the stack.
    pub fn add_view(&mut self, view: ViewId) {
        if !self.views.contains(&view) {
            self.views.push(view);
        }
    }

    /// Drop a view from the sheet, pruning its tile. A layout with no
    /// tiles left is discarded.
    pub fn remove_view(&mut self, view: ViewId) {
        self.views.retain(|&v| v != view);
        if let Some(layout) = &mut self.layout {
            layout.detach(view);
            if layout.is_empty() {
                self.layout = None;
            }
        }
    }

    /// Restack a view to the top.
    pub fn raise(&mut self, view: ViewId) {
        if let Some(pos) = self.views.iter().position(|&v| v == view) {
            self.views.remove(pos);
            self.views.push(view);
        }
    }

    /// Restack a view to the bottom.
    pub fn lower(&mut self, view: ViewId) {
        if let Some(pos) = self.views.iter().position(|&v| v == view) {
            self.views.remove(pos);
            self.views.insert(0, view);
        }
    }

    /// Hidden views move to the tail, so reveals pop them back in
    /// most-recently-hidden-first order.
    pub fn push_hidden(&mut self, view: ViewId) {
        self.raise(view);
    }

    // ── Tileable scans ───────────────────────────────────────────────

    /// First tileable, non-hidden view in stack order.
    pub fn first_tileable(&self, views: &HashMap<ViewId, View>) -> Option<ViewId> {
        self.views
            .iter()
            .copied()
            .find(|id| Self::scannable(views, *id))
    }

    /// Next tileable view after `view` in stack order, wrapping.
    pub fn next_tileable(&self, view: ViewId, views: &HashMap<ViewId, View>) -> Option<ViewId> {
        let pos = self.views.iter().position(|&v| v == view)?;
        self.views
            .iter()
            .cycle()
            .skip(pos + 1)
            .take(self.views.len())
            .copied()
            .find(|id| Self::scannable(views, *id))
    }

    /// Previous tileable view before `view` in stack order, wrapping.
    pub fn prev_tileable(&self, view: ViewId, views: &HashMap<ViewId, View>) -> Option<ViewId> {
        let pos = self.views.iter().position(|&v| v == view)?;
        self.views
            .iter()
            .rev()
            .cycle()
            .skip(self.views.len() - pos)
            .take(self.views.len())
            .copied()
            .find(|id| Self::scannable(views, *id))
    }

    fn scannable(views: &HashMap<ViewId, View>, id: ViewId) -> bool {
        views
            .get(&id)
            .is_some_and(|v| !v.is_hidden() && v.is_tileable())
    }

    // ── Layout application ───────────────────────────────────────────

    /// Apply a split tree over `area`.
    ///
    /// If the current layout has any tile whose view is mid-operation
    /// the call is a no-op, so an unacknowledged resize is never
    /// stomped. The tileable list is snapshotted before the walk; a
    /// view turning dirty while configures go out does not perturb
    /// placement.
    ///
    /// Returns the placements that committed synchronously on the fast
    /// path, so the caller can run the post-commit fixups on them, or
    /// `None` when the walk was skipped.
    pub fn apply_split(
        &mut self,
        split: SplitTree,
        area: Geometry,
        spacing: Spacing,
        center: bool,
        views: &mut HashMap<ViewId, View>,
        backend: &mut dyn SurfaceBackend,
    ) -> Option<Vec<(ViewId, Committed)>> {
        if let Some(layout) = &self.layout {
            let dirty = layout
                .tiles()
                .iter()
                .any(|t| views.get(&t.view).is_some_and(View::is_dirty));
            if dirty {
                debug!("split application skipped: layout has a dirty view");
                return None;
            }
        }

        let tileable: Vec<ViewId> = self
            .views
            .iter()
            .copied()
            .filter(|id| Self::scannable(views, *id))
            .collect();

        let previous: Vec<ViewId> = self
            .layout
            .as_ref()
            .map(|l| l.tiles().iter().map(|t| t.view).collect())
            .unwrap_or_default();

        let layout = match &mut self.layout {
            Some(layout) => {
                layout.set_split(split);
                layout
            }
            None => self.layout.insert(Layout::new(split)),
        };

        let arrangement = layout.arrange_views(area, &tileable, spacing, center, |id| {
            views.get(&id).and_then(View::forced_size)
        });

        let tiles: Vec<_> = layout.tiles().to_vec();
        let mut commits = Vec::new();
        for (tile, placement) in tiles.iter().zip(&arrangement.placements) {
            if let Some(view) = views.get_mut(&tile.view) {
                if let QueueResult::Committed(committed) =
                    view.queue_tile(*tile, placement.center, backend)
                {
                    commits.push((tile.view, committed));
                }
            }
        }

        // Views the new walk no longer places leave the managed set.
        for id in previous {
            if tiles.iter().all(|t| t.view != id) {
                if let Some(view) = views.get_mut(&id) {
                    view.detach_tile();
                }
            }
        }

        if layout.is_empty() {
            self.layout = None;
        }
        Some(commits)
    }

    /// Discard the active layout, detaching every placed view.
    pub fn reset_layout(&mut self, views: &mut HashMap<ViewId, View>) {
        if let Some(layout) = self.layout.take() {
            for tile in layout.tiles() {
                if let Some(view) = views.get_mut(&tile.view) {
                    view.detach_tile();
                }
            }
        }
    }

    // ── Reveal ───────────────────────────────────────────────────────

    /// Hidden views matching `pred`, scanning from the tail and
    /// stopping at the first visible view. This is the contiguous
    /// most-recently-hidden run a `show` operation reveals.
    pub fn reveal_tail(
        &self,
        views: &HashMap<ViewId, View>,
        pred: impl Fn(&View) -> bool,
    ) -> Vec<ViewId> {
        let mut revealed = Vec::new();
        for id in self.views.iter().rev() {
            let Some(view) = views.get(id) else { continue };
            if !view.is_hidden() {
                break;
            }
            if pred(view) {
                revealed.push(*id);
            }
        }
        revealed
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::backend::{OutputId, Serial};
    use crate::split::{ContainerLayout, Split};

    #[derive(Default)]
    struct TestBackend {
        next_serial: u64,
    }

    impl SurfaceBackend for TestBackend {
        fn configure(&mut self, _view: ViewId, _width: u32, _height: u32) -> Serial {
            self.next_serial += 1;
            Serial(self.next_serial)
        }
        fn move_view(&mut self, _view: ViewId, _x: i32, _y: i32) {}
        fn set_activated(&mut self, _view: ViewId, _activated: bool) {}
        fn close(&mut self, _view: ViewId) {}
    }

    fn view(id: u64) -> View {
        View::new(
            ViewId(id),
            "app".into(),
            format!("view {id}"),
            Geometry::new(0, 0, 100, 100),
            OutputId(0),
            SheetIndex::new(1).unwrap(),
            "1".into(),
        )
    }

    fn populate(n: u64) -> (Sheet, HashMap<ViewId, View>) {
        let mut sheet = Sheet::new();
        let mut views = HashMap::new();
        for id in 1..=n {
            sheet.add_view(ViewId(id));
            views.insert(ViewId(id), view(id));
        }
        (sheet, views)
    }

    const AREA: Geometry = Geometry {
        x: 0,
        y: 0,
        width: 900,
        height: 600,
    };
    const SPACING: Spacing = Spacing { gap: 10, border: 2 };

    fn queue_split() -> SplitTree {
        SplitTree::new(Split::container(ContainerLayout::Queue, None))
    }

    #[test]
    fn cycle_ring_skips_sticky_sheet() {
        let one = SheetIndex::new(1).unwrap();
        let nine = SheetIndex::new(9).unwrap();
        assert_eq!(nine.next_cycle(), one);
        assert_eq!(one.prev_cycle(), nine);
        assert_eq!(SheetIndex::STICKY.next_cycle(), one);
        assert_eq!(SheetIndex::STICKY.prev_cycle(), nine);
        for i in 1..9u8 {
            assert_eq!(SheetIndex::new(i).unwrap().next_cycle().get(), i + 1);
        }
    }

    #[test]
    fn apply_split_queues_tiles() {
        let mut backend = TestBackend::default();
        let (mut sheet, mut views) = populate(3);

        assert!(sheet
            .apply_split(queue_split(), AREA, SPACING, false, &mut views, &mut backend)
            .is_some());
        let layout = sheet.layout().unwrap();
        assert_eq!(layout.tiles().len(), 3);
        for v in views.values() {
            assert!(v.is_dirty());
        }
    }

    #[test]
    fn apply_split_is_noop_while_dirty() {
        let mut backend = TestBackend::default();
        let (mut sheet, mut views) = populate(2);

        sheet.apply_split(queue_split(), AREA, SPACING, false, &mut views, &mut backend);
        let first: Vec<_> = sheet.layout().unwrap().tiles().to_vec();

        // No commits yet; a second application must not disturb the
        // in-flight operations.
        let stack = SplitTree::new(Split::container(ContainerLayout::Stack, None));
        assert!(sheet
            .apply_split(stack, AREA, SPACING, false, &mut views, &mut backend)
            .is_none());
        assert_eq!(sheet.layout().unwrap().tiles().to_vec(), first);
    }

    #[test]
    fn apply_split_snapshot_is_stable() {
        // The walk configures views one by one; views turning dirty as
        // their own configure goes out must still all be placed.
        let mut backend = TestBackend::default();
        let (mut sheet, mut views) = populate(3);

        sheet.apply_split(queue_split(), AREA, SPACING, false, &mut views, &mut backend);
        let placed: Vec<_> = sheet
            .layout()
            .unwrap()
            .tiles()
            .iter()
            .map(|t| t.view)
            .collect();
        assert_eq!(placed, vec![ViewId(1), ViewId(2), ViewId(3)]);
    }

    #[test]
    fn hidden_views_are_not_placed() {
        let mut backend = TestBackend::default();
        let (mut sheet, mut views) = populate(3);
        views.get_mut(&ViewId(2)).unwrap().set_hidden(true);

        sheet.apply_split(queue_split(), AREA, SPACING, false, &mut views, &mut backend);
        let layout = sheet.layout().unwrap();
        assert_eq!(layout.tiles().len(), 2);
        assert!(!layout.contains(ViewId(2)));
    }

    #[test]
    fn same_size_tile_commits_synchronously() {
        let mut backend = TestBackend::default();
        let mut sheet = Sheet::new();
        let mut views = HashMap::new();
        sheet.add_view(ViewId(1));
        // Size already matches the single-view band, so the tile
        // attaches without a round-trip.
        let mut v = view(1);
        v.geometry = Geometry::new(500, 500, 880, 576);
        views.insert(ViewId(1), v);

        let commits = sheet
            .apply_split(queue_split(), AREA, SPACING, false, &mut views, &mut backend)
            .unwrap();
        let v = &views[&ViewId(1)];
        assert!(!v.is_dirty());
        assert!(v.is_tiled());
        assert_eq!(v.geometry, Geometry::new(10, 12, 880, 576));
        // The synchronous commit is reported back for the fixups.
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].0, ViewId(1));
    }

    #[test]
    fn reveal_tail_stops_at_visible_view() {
        let (mut sheet, mut views) = populate(4);
        // Hide 2, then 4: both end up at the tail, 4 hidden last.
        for id in [2u64, 4] {
            views.get_mut(&ViewId(id)).unwrap().set_hidden(true);
            sheet.push_hidden(ViewId(id));
        }
        assert_eq!(sheet.views(), &[ViewId(1), ViewId(3), ViewId(2), ViewId(4)]);

        let revealed = sheet.reveal_tail(&views, |_| true);
        assert_eq!(revealed, vec![ViewId(4), ViewId(2)]);

        // A visible view on top cuts the run short.
        sheet.raise(ViewId(1));
        assert_eq!(sheet.reveal_tail(&views, |_| true), Vec::<ViewId>::new());
    }

    #[test]
    fn remove_last_tile_destroys_layout() {
        let mut backend = TestBackend::default();
        let (mut sheet, mut views) = populate(1);
        sheet.apply_split(queue_split(), AREA, SPACING, false, &mut views, &mut backend);
        assert!(sheet.layout().is_some());
        sheet.remove_view(ViewId(1));
        assert!(sheet.layout().is_none());
        assert!(sheet.is_empty());
    }
}
