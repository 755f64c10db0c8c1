//! Core compositor state.
//!
//! Views live in one arena keyed by [`ViewId`]; sheets, groups and marks
//! hold ordered id sequences into it. Every membership mutation funnels
//! through here so the exclusivity invariants (one sheet, one group, one
//! output per view, marks 1:1) hold after each public call.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::backend::{OutputId, SurfaceBackend};
use crate::config::Config;
use crate::geometry::Geometry;
use crate::group::GroupRegistry;
use crate::input::{CycleScope, Direction};
use crate::mark::{MarkId, MarkRegistry};
use crate::sheet::SheetIndex;
use crate::view::{BorderState, Committed, Operation, View, ViewId};
use crate::workspace::Output;

/// Outcome of mapping a surface, after autoconf rules ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapped {
    pub view: ViewId,
    /// The matching rule asked for focus (or no rule matched).
    pub focus: bool,
}

pub struct State {
    pub config: Config,
    pub views: HashMap<ViewId, View>,
    pub outputs: IndexMap<OutputId, Output>,
    pub groups: GroupRegistry,
    pub marks: MarkRegistry,
    pub focused_output: Option<OutputId>,
    pub pointer: (f64, f64),
    pub running: bool,
}

impl State {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            views: HashMap::new(),
            outputs: IndexMap::new(),
            groups: GroupRegistry::new(),
            marks: MarkRegistry::new(),
            focused_output: None,
            pointer: (0.0, 0.0),
            running: true,
        }
    }

    // ── Outputs ──────────────────────────────────────────────────────

    pub fn add_output(&mut self, id: OutputId, name: String, geometry: Geometry, usable: Geometry) {
        info!(output = %id, name, "output added");
        let mut output = Output::new(id, name, geometry, usable);
        output.background = self.config.backgrounds.get(&output.name).cloned();
        self.outputs.insert(id, output);
        if self.focused_output.is_none() {
            self.focused_output = Some(id);
        }
    }

    /// Drop an output, migrating its views onto a surviving one. The
    /// views keep their sheet index; with no output left they are
    /// parked until one appears.
    pub fn remove_output(&mut self, id: OutputId) {
        let Some(removed) = self.outputs.shift_remove(&id) else {
            return;
        };
        info!(output = %id, "output removed");
        let orphans: Vec<ViewId> = removed.workspace.all_views().collect();

        if self.focused_output == Some(id) {
            self.focused_output = self.outputs.keys().next().copied();
        }
        let Some(target) = self.focused_output else {
            return;
        };
        for view_id in orphans {
            if let Some(view) = self.views.get_mut(&view_id) {
                view.output = target;
                let sheet = view.sheet;
                if let Some(output) = self.outputs.get_mut(&target) {
                    output.workspace.sheet_mut(sheet).add_view(view_id);
                }
            }
        }
    }

    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(&id)
    }

    pub fn focused_output(&self) -> Option<&Output> {
        self.focused_output.and_then(|id| self.outputs.get(&id))
    }

    pub fn focused_output_mut(&mut self) -> Option<&mut Output> {
        self.focused_output.and_then(|id| self.outputs.get_mut(&id))
    }

    // ── View lifecycle ───────────────────────────────────────────────

    /// Admit a freshly mapped surface, applying the first matching
    /// autoconf rule for sheet/group/mark/position.
    pub fn add_view(
        &mut self,
        id: ViewId,
        app_id: String,
        title: String,
        mut geometry: Geometry,
    ) -> Option<Mapped> {
        let output_id = self.focused_output.or_else(|| self.outputs.keys().next().copied())?;

        let rule = self.config.autoconf_for(&app_id);
        let rule_sheet = rule.and_then(|r| r.sheet);
        let rule_group = rule.and_then(|r| r.group.clone());
        let rule_mark = rule.and_then(|r| r.mark);
        let rule_anchor = rule.and_then(|r| r.position);
        let focus = rule.map_or(true, |r| r.focus);

        let output = self.outputs.get_mut(&output_id)?;
        let sheet = rule_sheet.unwrap_or_else(|| output.workspace.current());
        let group = rule_group.unwrap_or_else(|| sheet.to_string());
        if let Some(anchor) = rule_anchor {
            geometry = geometry.anchor_in(output.usable, anchor);
        } else {
            geometry = geometry.constrain(output.usable);
        }

        debug!(view = %id, app_id, sheet = %sheet, group, "view mapped");
        output.workspace.sheet_mut(sheet).add_view(id);

        let view = View::new(id, app_id, title, geometry, output_id, sheet, group.clone());
        let hidden = view.is_hidden();
        self.views.insert(id, view);
        self.groups.add_view(&group, id, !hidden);
        if let Some(mark) = rule_mark {
            self.set_mark(mark, id);
        }

        Some(Mapped { view: id, focus })
    }

    /// Tear a view out of every structure. Returns it for logging.
    pub fn remove_view(&mut self, id: ViewId) -> Option<View> {
        let view = self.views.remove(&id)?;
        if let Some(output) = self.outputs.get_mut(&view.output) {
            output.workspace.remove_view(id);
        }
        self.groups.remove_view(&view.group, id);
        self.marks.clear_view(id);
        debug!(view = %id, "view destroyed");
        Some(view)
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.get_mut(&id)
    }

    // ── Focus ────────────────────────────────────────────────────────

    pub fn focused_view(&self) -> Option<ViewId> {
        self.focused_output().and_then(|o| o.workspace.focus)
    }

    pub fn focus_view(&mut self, id: ViewId, backend: &mut dyn SurfaceBackend) {
        let Some(view) = self.views.get(&id) else {
            return;
        };
        if view.is_hidden() {
            return;
        }
        let output_id = view.output;

        if let Some(old) = self.focused_view() {
            if old == id {
                return;
            }
            if let Some(old_view) = self.views.get_mut(&old) {
                old_view.border = BorderState::Inactive;
            }
            backend.set_activated(old, false);
        }

        if let Some(view) = self.views.get_mut(&id) {
            view.border = BorderState::Active;
        }
        backend.set_activated(id, true);
        self.focused_output = Some(output_id);
        if let Some(output) = self.outputs.get_mut(&output_id) {
            output.workspace.focus = Some(id);
        }
    }

    pub fn clear_focus(&mut self, backend: &mut dyn SurfaceBackend) {
        if let Some(old) = self.focused_view() {
            if let Some(view) = self.views.get_mut(&old) {
                view.border = BorderState::Inactive;
            }
            backend.set_activated(old, false);
        }
        if let Some(output) = self.focused_output_mut() {
            output.workspace.focus = None;
        }
    }

    /// Focus the first tileable view of the focused workspace's current
    /// sheet, or clear focus if there is none.
    pub fn focus_first(&mut self, backend: &mut dyn SurfaceBackend) {
        let first = self
            .focused_output()
            .and_then(|o| o.workspace.current_sheet().first_tileable(&self.views));
        match first {
            Some(id) => self.focus_view(id, backend),
            None => self.clear_focus(backend),
        }
    }

    // ── Visibility and stacking ──────────────────────────────────────

    /// On screen right now: not hidden, not invisible, and its sheet is
    /// current or sticky on its output.
    pub fn view_on_screen(&self, id: ViewId) -> bool {
        self.views.get(&id).is_some_and(|view| {
            view.is_visible()
                && self
                    .outputs
                    .get(&view.output)
                    .is_some_and(|o| o.workspace.sheet_visible(view.sheet))
        })
    }

    pub fn hide_view(&mut self, id: ViewId, backend: &mut dyn SurfaceBackend) {
        let Some(view) = self.views.get_mut(&id) else {
            return;
        };
        if view.is_hidden() {
            return;
        }
        view.set_hidden(true);
        let (output, sheet, group) = (view.output, view.sheet, view.group.clone());
        if let Some(output) = self.outputs.get_mut(&output) {
            output.workspace.sheet_mut(sheet).push_hidden(id);
            if output.workspace.focus == Some(id) {
                output.workspace.focus = None;
            }
        }
        self.groups.set_view_visible(&group, id, false);
        backend.set_activated(id, false);
        debug!(view = %id, "view hidden");
    }

    pub fn show_view(&mut self, id: ViewId) {
        let Some(view) = self.views.get_mut(&id) else {
            return;
        };
        if !view.is_hidden() {
            return;
        }
        view.set_hidden(false);
        let (output, sheet, group) = (view.output, view.sheet, view.group.clone());
        if let Some(output) = self.outputs.get_mut(&output) {
            output.workspace.sheet_mut(sheet).raise(id);
        }
        self.groups.set_view_visible(&group, id, true);
        debug!(view = %id, "view shown");
    }

    pub fn raise_view(&mut self, id: ViewId) {
        if let Some(view) = self.views.get(&id) {
            let (output, sheet) = (view.output, view.sheet);
            if let Some(output) = self.outputs.get_mut(&output) {
                output.workspace.sheet_mut(sheet).raise(id);
            }
        }
    }

    pub fn lower_view(&mut self, id: ViewId) {
        if let Some(view) = self.views.get(&id) {
            let (output, sheet) = (view.output, view.sheet);
            if let Some(output) = self.outputs.get_mut(&output) {
                output.workspace.sheet_mut(sheet).lower(id);
            }
        }
    }

    /// Restack every visible member of `name` above everything else,
    /// ending with `target` on top. The member list is snapshotted
    /// first so re-insertion during the walk cannot loop.
    pub fn raise_group(&mut self, name: &str, target: ViewId) {
        let members: Vec<ViewId> = match self.groups.get(name) {
            Some(group) => group.visible().to_vec(),
            None => return,
        };
        for member in members {
            if member != target {
                self.raise_view(member);
            }
        }
        self.raise_view(target);
    }

    /// Mirror of [`raise_group`](Self::raise_group): visible members to
    /// the bottom, `target` lowest.
    pub fn lower_group(&mut self, name: &str, target: ViewId) {
        let members: Vec<ViewId> = match self.groups.get(name) {
            Some(group) => group.visible().to_vec(),
            None => return,
        };
        for member in members.into_iter().rev() {
            if member != target {
                self.lower_view(member);
            }
        }
        self.lower_view(target);
    }

    // ── Marks ────────────────────────────────────────────────────────

    /// Bind `mark` to `view`, clearing both the slot's previous view
    /// and the view's previous mark.
    pub fn set_mark(&mut self, mark: MarkId, view: ViewId) {
        if let Some(previous) = self.views.get(&view).and_then(|v| v.mark) {
            if previous != mark {
                self.marks.clear(previous);
            }
        }
        if let Some(displaced) = self.marks.bind(mark, view) {
            if displaced != view {
                if let Some(old) = self.views.get_mut(&displaced) {
                    old.mark = None;
                }
            }
        }
        if let Some(v) = self.views.get_mut(&view) {
            v.mark = Some(mark);
        }
        debug!(mark = %mark, view = %view, "mark bound");
    }

    pub fn clear_mark(&mut self, mark: MarkId) {
        if let Some(view) = self.marks.clear(mark) {
            if let Some(v) = self.views.get_mut(&view) {
                v.mark = None;
            }
        }
    }

    /// Jump to a marked view: reveal it, make its sheet current if it
    /// is not already on screen, raise and focus it.
    pub fn show_mark(&mut self, mark: MarkId, backend: &mut dyn SurfaceBackend) -> Option<ViewId> {
        let id = self.marks.view(mark)?;
        self.show_view(id);
        let (output_id, sheet) = {
            let view = self.views.get(&id)?;
            (view.output, view.sheet)
        };
        if let Some(output) = self.outputs.get_mut(&output_id) {
            if !output.workspace.sheet_visible(sheet) {
                output.workspace.switch_sheet(sheet);
            }
        }
        self.raise_view(id);
        self.focus_view(id, backend);
        Some(id)
    }

    // ── Sheets ───────────────────────────────────────────────────────

    pub fn switch_sheet(&mut self, index: SheetIndex, backend: &mut dyn SurfaceBackend) {
        let Some(output) = self.focused_output_mut() else {
            return;
        };
        if output.workspace.switch_sheet(index) {
            self.focus_first(backend);
        }
    }

    pub fn toggle_alternate_sheet(&mut self, backend: &mut dyn SurfaceBackend) {
        let Some(alternate) = self.focused_output().map(|o| o.workspace.alternate()) else {
            return;
        };
        self.switch_sheet(alternate, backend);
    }

    // ── Cycling queries ──────────────────────────────────────────────

    /// Neighbour of the focused view within `scope`.
    pub fn cycle_target(&self, scope: CycleScope, direction: Direction) -> Option<ViewId> {
        let focused = self.focused_view()?;
        let view = self.views.get(&focused)?;
        let output = self.outputs.get(&view.output)?;
        match scope {
            CycleScope::Sheet => {
                let sheet = output.workspace.sheet(view.sheet);
                match direction {
                    Direction::Next => sheet.next_tileable(focused, &self.views),
                    Direction::Prev => sheet.prev_tileable(focused, &self.views),
                }
            }
            CycleScope::Group => {
                let group = self.groups.get(&view.group)?;
                match direction {
                    Direction::Next => group.next_view(focused),
                    Direction::Prev => group.prev_view(focused),
                }
            }
            CycleScope::Layout => {
                let layout = output.workspace.sheet(view.sheet).layout()?;
                match direction {
                    Direction::Next => layout.next_view(focused),
                    Direction::Prev => layout.prev_view(focused),
                }
            }
        }
    }

    /// First visible view of the next/previous group in the global
    /// visible ordering.
    pub fn cycle_group_target(&self, direction: Direction) -> Option<ViewId> {
        let focused = self.focused_view()?;
        let view = self.views.get(&focused)?;
        let name = match direction {
            Direction::Next => self.groups.next_visible(&view.group)?,
            Direction::Prev => self.groups.prev_visible(&view.group)?,
        };
        self.groups.get(name)?.first_view(view.output, &self.views)
    }

    // ── Commit fixups ────────────────────────────────────────────────

    /// Post-commit bookkeeping that needs surrounding structures: the
    /// migrate membership move, raising the view (unless hidden), and
    /// cursor centering.
    pub fn finish_commit(&mut self, id: ViewId, committed: &Committed) {
        if let Operation::Migrate { output, sheet } = committed.op {
            // The view's own fields moved on commit; relocate the
            // membership records to match. The old sheet may live on
            // the destination output, so every workspace is stripped.
            for o in self.outputs.values_mut() {
                o.workspace.remove_view(id);
            }
            if let Some(o) = self.outputs.get_mut(&output) {
                o.workspace.sheet_mut(sheet).add_view(id);
            }
            let on_screen = self
                .outputs
                .get(&output)
                .is_some_and(|o| o.workspace.sheet_visible(sheet));
            if on_screen {
                self.show_view(id);
            }
        }

        let Some(view) = self.views.get(&id) else {
            return;
        };
        if view.is_hidden() {
            return;
        }
        let center = view.geometry.center_point();
        self.raise_view(id);
        if committed.center {
            self.pointer = (f64::from(center.0), f64::from(center.1));
        }
    }

    /// Topmost on-screen view under the pointer on the focused output.
    pub fn view_at(&self, x: f64, y: f64) -> Option<ViewId> {
        let output = self.focused_output()?;
        let stack = output.workspace.visible_views(&self.views);
        stack
            .into_iter()
            .rev()
            .find(|id| {
                self.views
                    .get(id)
                    .is_some_and(|v| v.geometry.contains(x as i32, y as i32))
            })
    }

    /// Validate core invariants. See the `invariants` module.
    pub fn validate_invariants(&self) -> Result<(), crate::invariants::InvariantError> {
        crate::invariants::validate(self)
    }
}
