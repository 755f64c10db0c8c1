//! Workspaces: one per output, ten sheets each.
//!
//! The workspace tracks which sheet is current, the alternate sheet for
//! quick toggling, and the focused view. Sheet 0 overlays the current
//! sheet, so "what is on screen" is always the current sheet's views
//! with the sticky sheet's views stacked above them.

use std::collections::HashMap;

use tracing::debug;

use crate::backend::OutputId;
use crate::geometry::Geometry;
use crate::sheet::{Sheet, SheetIndex, SHEET_COUNT};
use crate::view::{View, ViewId};

/// A physical display region owning one workspace.
#[derive(Debug)]
pub struct Output {
    pub id: OutputId,
    pub name: String,
    /// Full region in the global coordinate space.
    pub geometry: Geometry,
    /// Region available for layouts, excluding reserved panel zones.
    pub usable: Geometry,
    pub background: Option<String>,
    pub workspace: Workspace,
}

impl Output {
    pub fn new(id: OutputId, name: String, geometry: Geometry, usable: Geometry) -> Self {
        Self {
            id,
            name,
            geometry,
            usable,
            background: None,
            workspace: Workspace::new(),
        }
    }
}

/// Ten sheets, a current/alternate pair, and the focus pointer.
#[derive(Debug)]
pub struct Workspace {
    sheets: [Sheet; SHEET_COUNT as usize],
    current: SheetIndex,
    alternate: SheetIndex,
    pub focus: Option<ViewId>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        let start = SheetIndex::new(1).unwrap_or(SheetIndex::STICKY);
        Self {
            sheets: Default::default(),
            current: start,
            alternate: start,
            focus: None,
        }
    }

    pub const fn current(&self) -> SheetIndex {
        self.current
    }

    pub const fn alternate(&self) -> SheetIndex {
        self.alternate
    }

    pub fn sheet(&self, index: SheetIndex) -> &Sheet {
        &self.sheets[index.get() as usize]
    }

    pub fn sheet_mut(&mut self, index: SheetIndex) -> &mut Sheet {
        &mut self.sheets[index.get() as usize]
    }

    pub fn current_sheet(&self) -> &Sheet {
        self.sheet(self.current)
    }

    pub fn current_sheet_mut(&mut self) -> &mut Sheet {
        self.sheet_mut(self.current)
    }

    /// Whether views on `index` are on screen right now.
    pub fn sheet_visible(&self, index: SheetIndex) -> bool {
        index == self.current || index.is_sticky()
    }

    /// Switch the current sheet, remembering the old one as alternate.
    /// Returns whether anything changed.
    pub fn switch_sheet(&mut self, index: SheetIndex) -> bool {
        if index == self.current {
            return false;
        }
        debug!(from = %self.current, to = %index, "sheet switch");
        self.alternate = self.current;
        self.current = index;
        true
    }

    /// Swap current and alternate sheets.
    pub fn toggle_alternate(&mut self) -> bool {
        self.switch_sheet(self.alternate)
    }

    /// On-screen views bottom to top: current sheet, then the sticky
    /// overlay. Hidden and invisible views are excluded.
    pub fn visible_views(&self, views: &HashMap<ViewId, View>) -> Vec<ViewId> {
        let mut out = Vec::new();
        let mut collect = |sheet: &Sheet| {
            out.extend(
                sheet
                    .views()
                    .iter()
                    .copied()
                    .filter(|id| views.get(id).is_some_and(View::is_visible)),
            );
        };
        collect(self.current_sheet());
        if !self.current.is_sticky() {
            collect(self.sheet(SheetIndex::STICKY));
        }
        out
    }

    /// The sheet that holds `view`, if any.
    pub fn sheet_of(&self, view: ViewId) -> Option<SheetIndex> {
        (0..SHEET_COUNT)
            .filter_map(SheetIndex::new)
            .find(|&i| self.sheet(i).contains(view))
    }

    pub fn remove_view(&mut self, view: ViewId) {
        for sheet in &mut self.sheets {
            sheet.remove_view(view);
        }
        if self.focus == Some(view) {
            self.focus = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.iter().all(Sheet::is_empty)
    }

    /// All views across all sheets, sheet order then stack order.
    pub fn all_views(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.sheets.iter().flat_map(|s| s.views().iter().copied())
    }
}
