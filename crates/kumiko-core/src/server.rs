//! The server: event dispatch and mode transitions.
//!
//! A backend feeds [`BackendEvent`]s into [`Server::handle_event`]; the
//! server routes them through the active [`Mode`], mutates [`State`],
//! and answers frame ticks with damage-scoped draw commands. All mode
//! exits funnel through [`Server::enter_normal_mode`], which consumes
//! the outgoing mode by value, so its scratch state is released exactly
//! once per session.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::backend::{
    BackendEvent, CommandRunner, KeyState, OutputId, PasswordVerifier, Serial, SurfaceBackend,
    TextRenderer,
};
use crate::config::Config;
use crate::geometry::Geometry;
use crate::input::{keysym_to_char, Action, Direction, Key, Modifiers};
use crate::mode::{KeyOutcome, Mode, ModeStats, PointerGrab};
use crate::render::{compose_frame, indicator_text, Damage, DrawCommand, IndicatorBar, RenderStats};
use crate::sheet::SheetIndex;
use crate::state::State;
use crate::text::{Completion, InputBuffer};
use crate::view::{QueueResult, ViewFlags, ViewId};

/// The compositor core, wired to its collaborators.
pub struct Server {
    pub state: State,
    mode: Mode,
    pub mode_stats: ModeStats,
    pub render_stats: RenderStats,
    /// A cycle gesture is in progress; the final raise is deferred
    /// until the modifiers are released.
    cycling: bool,
    modifiers: Modifiers,
    damage: HashMap<OutputId, Damage>,
    bars: HashMap<OutputId, IndicatorBar>,
    backend: Box<dyn SurfaceBackend>,
    text: Box<dyn TextRenderer>,
    runner: Box<dyn CommandRunner>,
    verifier: Box<dyn PasswordVerifier>,
}

impl Server {
    pub fn new(
        config: Config,
        backend: Box<dyn SurfaceBackend>,
        text: Box<dyn TextRenderer>,
        runner: Box<dyn CommandRunner>,
        verifier: Box<dyn PasswordVerifier>,
    ) -> Self {
        Self {
            state: State::new(config),
            mode: Mode::Normal,
            mode_stats: ModeStats::default(),
            render_stats: RenderStats::default(),
            cycling: false,
            modifiers: Modifiers::empty(),
            damage: HashMap::new(),
            bars: HashMap::new(),
            backend,
            text,
            runner,
            verifier,
        }
    }

    pub const fn mode(&self) -> &Mode {
        &self.mode
    }

    pub const fn is_cycling(&self) -> bool {
        self.cycling
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    // ── Event dispatch ───────────────────────────────────────────────

    /// Dispatch one backend event. Frame ticks return the commands to
    /// draw; every other event returns an empty list.
    pub fn handle_event(&mut self, event: BackendEvent) -> Vec<DrawCommand> {
        let commands = self.dispatch(event);
        #[cfg(debug_assertions)]
        {
            if let Err(violation) = self.state.validate_invariants() {
                panic!("invariant violated after event dispatch: {violation}");
            }
        }
        commands
    }

    fn dispatch(&mut self, event: BackendEvent) -> Vec<DrawCommand> {
        match event {
            BackendEvent::SurfaceMapped {
                view,
                app_id,
                title,
                geometry,
            } => {
                self.on_mapped(view, app_id, title, geometry);
            }
            BackendEvent::SurfaceDestroyed { view } => {
                self.on_destroyed(view);
            }
            BackendEvent::SurfaceCommit { view, serial, .. } => {
                self.on_commit(view, serial);
            }
            BackendEvent::TitleChanged { view, title } => {
                if let Some(v) = self.state.view_mut(view) {
                    v.title = title;
                }
            }
            BackendEvent::Key {
                keysym,
                state: KeyState::Pressed,
                modifiers,
                ..
            } => {
                self.modifiers = modifiers;
                if self.on_key(keysym) == KeyOutcome::Forward {
                    debug!(keysym, "key forwarded to client");
                }
            }
            BackendEvent::Key { .. } => {}
            BackendEvent::Modifiers { modifiers } => {
                self.on_modifiers(modifiers);
            }
            BackendEvent::Button { state, .. } => {
                self.on_button(state);
            }
            BackendEvent::PointerMotion { x, y, .. } => {
                self.on_motion(x, y);
            }
            BackendEvent::OutputAdded {
                output,
                name,
                geometry,
                usable,
            } => {
                self.state.add_output(output, name, geometry, usable);
                self.damage.entry(output).or_default().add_full();
                self.bars.entry(output).or_default();
            }
            BackendEvent::OutputRemoved { output } => {
                self.state.remove_output(output);
                self.damage.remove(&output);
                self.bars.remove(&output);
                self.damage_all();
            }
            BackendEvent::Frame { output } => {
                return self.on_frame(output);
            }
        }
        Vec::new()
    }

    // ── Surface lifecycle ────────────────────────────────────────────

    fn on_mapped(&mut self, id: ViewId, app_id: String, title: String, geometry: Geometry) {
        let Some(mapped) = self.state.add_view(id, app_id, title, geometry) else {
            warn!(view = %id, "surface mapped with no output available");
            return;
        };
        if mapped.focus && self.state.view_on_screen(id) && !self.mode.is_locked() {
            self.state.focus_view(id, self.backend.as_mut());
        }
        self.damage_view(id);
    }

    fn on_destroyed(&mut self, id: ViewId) {
        let was_focused = self.state.focused_view() == Some(id);
        let grabbed = match &self.mode {
            Mode::Move(grab) | Mode::Resize(grab) => grab.view == id,
            Mode::Dnd { view } => *view == id,
            _ => false,
        };
        self.damage_view(id);
        self.state.remove_view(id);
        if grabbed {
            self.enter_normal_mode();
        }
        if was_focused {
            self.state.focus_first(self.backend.as_mut());
        }
    }

    fn on_commit(&mut self, id: ViewId, serial: Serial) {
        let before = self.state.view(id).map(|v| v.geometry);
        let Some(view) = self.state.view_mut(id) else {
            return;
        };
        let Some(committed) = view.commit_serial(serial) else {
            return;
        };
        self.state.finish_commit(id, &committed);
        if let Some(before) = before {
            self.damage_rect(id, before);
        }
        self.damage_view(id);
    }

    // ── Key routing ──────────────────────────────────────────────────

    fn on_key(&mut self, keysym: u32) -> KeyOutcome {
        match std::mem::take(&mut self.mode) {
            Mode::Normal => {
                self.mode = Mode::Normal;
                self.normal_key(keysym)
            }
            Mode::InputGrab => {
                // Only the grab binding itself leaves the mode; every
                // other key belongs to the client.
                if let Some(key) = Key::from_keysym(keysym) {
                    if self.state.config.bindings.lookup(self.modifiers, key)
                        == Some(&Action::EnterInputGrab)
                    {
                        self.mode = Mode::InputGrab;
                        self.enter_normal_mode();
                        return KeyOutcome::Consumed;
                    }
                }
                self.mode = Mode::InputGrab;
                KeyOutcome::Forward
            }
            Mode::Move(grab) => {
                self.mode = Mode::Move(grab);
                self.transient_key(keysym)
            }
            Mode::Resize(grab) => {
                self.mode = Mode::Resize(grab);
                self.transient_key(keysym)
            }
            Mode::Dnd { view } => {
                self.mode = Mode::Dnd { view };
                KeyOutcome::Consumed
            }
            Mode::SheetAssign => {
                self.mode = Mode::SheetAssign;
                self.sheet_assign_key(keysym)
            }
            Mode::MarkAssign => {
                self.mode = Mode::MarkAssign;
                self.mark_key(keysym, true)
            }
            Mode::MarkSelect => {
                self.mode = Mode::MarkSelect;
                self.mark_key(keysym, false)
            }
            Mode::LayoutSelect => {
                self.mode = Mode::LayoutSelect;
                self.layout_select_key(keysym)
            }
            Mode::GroupAssign { buffer, completion } => self.group_assign_key(keysym, buffer, completion),
            Mode::Exec { buffer, completion } => self.exec_key(keysym, buffer, completion),
            Mode::Lock { buffer, denied } => self.lock_key(keysym, buffer, denied),
        }
    }

    fn normal_key(&mut self, keysym: u32) -> KeyOutcome {
        let Some(key) = Key::from_keysym(keysym) else {
            return KeyOutcome::Forward;
        };
        let Some(action) = self.state.config.bindings.lookup(self.modifiers, key).cloned() else {
            return KeyOutcome::Forward;
        };
        self.run_action(&action);
        KeyOutcome::Consumed
    }

    /// Escape or Return leaves a pointer-driven mode.
    fn transient_key(&mut self, keysym: u32) -> KeyOutcome {
        match Key::from_keysym(keysym) {
            Some(Key::Escape | Key::Return) => self.enter_normal_mode(),
            _ => {}
        }
        KeyOutcome::Consumed
    }

    fn sheet_assign_key(&mut self, keysym: u32) -> KeyOutcome {
        if let Some(ch) = keysym_to_char(keysym) {
            if let Some(sheet) = SheetIndex::from_digit(ch) {
                self.migrate_focused(sheet);
            }
        }
        self.enter_normal_mode();
        KeyOutcome::Consumed
    }

    fn mark_key(&mut self, keysym: u32, assign: bool) -> KeyOutcome {
        if let Some(mark) = keysym_to_char(keysym).and_then(crate::mark::MarkId::from_char) {
            if assign {
                if let Some(focused) = self.state.focused_view() {
                    self.state.set_mark(mark, focused);
                }
            } else if self.state.show_mark(mark, self.backend.as_mut()).is_some() {
                self.damage_all();
            }
        }
        self.enter_normal_mode();
        KeyOutcome::Consumed
    }

    fn layout_select_key(&mut self, keysym: u32) -> KeyOutcome {
        if let Some(ch) = keysym_to_char(keysym) {
            let name = ch.to_string();
            if let Some(split) = self.state.config.layout(&name) {
                self.apply_split(split);
            } else {
                debug!(register = %ch, "no layout bound to register");
            }
        }
        self.enter_normal_mode();
        KeyOutcome::Consumed
    }

    fn group_assign_key(
        &mut self,
        keysym: u32,
        mut buffer: InputBuffer,
        mut completion: Completion,
    ) -> KeyOutcome {
        match Key::from_keysym(keysym) {
            Some(Key::Escape) => {
                self.mode = Mode::GroupAssign { buffer, completion };
                self.enter_normal_mode();
            }
            Some(Key::Return) => {
                let name = buffer.take();
                self.mode = Mode::GroupAssign { buffer, completion };
                self.enter_normal_mode();
                if !name.is_empty() {
                    self.assign_group(&name);
                }
            }
            Some(Key::Tab) => {
                if !completion.is_active() {
                    completion.start(buffer.content());
                }
                let candidate = completion.next().to_string();
                buffer.replace(&candidate);
                self.mode = Mode::GroupAssign { buffer, completion };
            }
            _ => {
                Self::edit_buffer(keysym, &mut buffer);
                completion.reset();
                self.mode = Mode::GroupAssign { buffer, completion };
            }
        }
        KeyOutcome::Consumed
    }

    fn exec_key(
        &mut self,
        keysym: u32,
        mut buffer: InputBuffer,
        mut completion: Completion,
    ) -> KeyOutcome {
        match Key::from_keysym(keysym) {
            Some(Key::Escape) => {
                self.mode = Mode::Exec { buffer, completion };
                self.enter_normal_mode();
            }
            Some(Key::Return) => {
                let entry = buffer.take();
                self.mode = Mode::Exec { buffer, completion };
                self.enter_normal_mode();
                if !entry.is_empty() {
                    let command = self
                        .state
                        .config
                        .macros
                        .get(&entry)
                        .cloned()
                        .unwrap_or(entry);
                    info!(command, "exec");
                    self.runner.execute(&command);
                }
            }
            Some(Key::Tab) => {
                if !completion.is_active() {
                    completion.start(buffer.content());
                }
                let candidate = completion.next().to_string();
                buffer.replace(&candidate);
                self.mode = Mode::Exec { buffer, completion };
            }
            _ => {
                Self::edit_buffer(keysym, &mut buffer);
                completion.reset();
                self.mode = Mode::Exec { buffer, completion };
            }
        }
        KeyOutcome::Consumed
    }

    /// Lock mode never forwards and never exits on Escape; only a
    /// verified password leaves it. A wrong password is a deny flash,
    /// not an error.
    fn lock_key(&mut self, keysym: u32, mut buffer: InputBuffer, denied: bool) -> KeyOutcome {
        match Key::from_keysym(keysym) {
            Some(Key::Return) => {
                let password = buffer.take();
                if self.verifier.verify(&password) {
                    info!("session unlocked");
                    self.mode = Mode::Lock { buffer, denied };
                    self.enter_normal_mode();
                } else {
                    self.mode = Mode::Lock {
                        buffer,
                        denied: true,
                    };
                    self.damage_all();
                }
            }
            Some(Key::Backspace) => {
                buffer.backspace();
                self.mode = Mode::Lock { buffer, denied };
            }
            _ => {
                if let Some(ch) = keysym_to_char(keysym) {
                    buffer.insert(ch);
                }
                // The first keystroke after a deny clears the flash.
                self.mode = Mode::Lock {
                    buffer,
                    denied: false,
                };
                if denied {
                    self.damage_all();
                }
            }
        }
        KeyOutcome::Consumed
    }

    fn edit_buffer(keysym: u32, buffer: &mut InputBuffer) {
        match Key::from_keysym(keysym) {
            Some(Key::Backspace) => {
                buffer.backspace();
            }
            Some(Key::Delete) => {
                buffer.delete();
            }
            Some(Key::Left) => buffer.move_left(),
            Some(Key::Right) => buffer.move_right(),
            Some(Key::Home) => buffer.move_home(),
            Some(Key::End) => buffer.move_end(),
            _ => {
                if let Some(ch) = keysym_to_char(keysym) {
                    buffer.insert(ch);
                }
            }
        }
    }

    // ── Modifier and pointer routing ─────────────────────────────────

    fn on_modifiers(&mut self, modifiers: Modifiers) {
        let released = self.modifiers.binding_mask() != Modifiers::empty()
            && modifiers.binding_mask() == Modifiers::empty();
        self.modifiers = modifiers;

        if released && self.cycling {
            // The gesture is over; raise the final selection.
            self.cycling = false;
            if let Some(focused) = self.state.focused_view() {
                self.state.raise_view(focused);
                self.damage_view(focused);
            }
        }
    }

    fn on_button(&mut self, state: crate::backend::ButtonState) {
        use crate::backend::ButtonState;
        match (&self.mode, state) {
            (Mode::Move(_) | Mode::Resize(_) | Mode::Dnd { .. }, ButtonState::Released) => {
                self.enter_normal_mode();
            }
            (Mode::Normal, ButtonState::Pressed) => {
                let (x, y) = self.state.pointer;
                if let Some(id) = self.state.view_at(x, y) {
                    self.state.focus_view(id, self.backend.as_mut());
                    self.state.raise_view(id);
                    self.damage_view(id);
                }
            }
            _ => {}
        }
    }

    fn on_motion(&mut self, x: f64, y: f64) {
        self.state.pointer = (x, y);
        match &self.mode {
            Mode::Move(grab) => {
                let grab = *grab;
                let dx = (x - grab.start_pointer.0) as i32;
                let dy = (y - grab.start_pointer.1) as i32;
                let before = self.state.view(grab.view).map(|v| v.geometry);
                if let Some(view) = self.state.view_mut(grab.view) {
                    view.move_to(
                        grab.start_geometry.x + dx,
                        grab.start_geometry.y + dy,
                        self.backend.as_mut(),
                    );
                }
                if let Some(before) = before {
                    self.damage_rect(grab.view, before);
                }
                self.damage_view(grab.view);
            }
            Mode::Resize(grab) => {
                let grab = *grab;
                let width = i64::from(grab.start_geometry.width)
                    + (x - grab.start_pointer.0) as i64;
                let height = i64::from(grab.start_geometry.height)
                    + (y - grab.start_pointer.1) as i64;
                let target = Geometry::new(
                    grab.start_geometry.x,
                    grab.start_geometry.y,
                    width.max(1) as u32,
                    height.max(1) as u32,
                );
                // A dirty view rejects the queue, which throttles the
                // motion stream to one configure per acknowledgement.
                if let Some(view) = self.state.view_mut(grab.view) {
                    view.queue_resize(target, false, self.backend.as_mut());
                }
            }
            _ => {}
        }
    }

    // ── Frames ───────────────────────────────────────────────────────

    fn on_frame(&mut self, output_id: OutputId) -> Vec<DrawCommand> {
        let text = indicator_text(&self.state, &self.mode);
        let Some(output) = self.state.outputs.get(&output_id) else {
            return Vec::new();
        };
        let bar_geometry = Geometry::new(
            output.usable.x,
            output.usable.y,
            output.usable.width,
            self.state.config.indicator_height,
        );
        let damage = self.damage.entry(output_id).or_default();
        let bar = self.bars.entry(output_id).or_default();
        bar.update(
            &text,
            &self.state.config.font,
            (bar_geometry.x, bar_geometry.y),
            self.text.as_mut(),
            damage,
        );
        compose_frame(
            &self.state,
            &self.mode,
            output,
            bar,
            bar_geometry,
            damage,
            &mut self.render_stats,
        )
    }

    // ── Mode transitions ─────────────────────────────────────────────

    /// The single exit funnel. Consumes the outgoing mode, counts its
    /// cancellation, and repaints whatever overlays it owned.
    pub fn enter_normal_mode(&mut self) {
        let outgoing = std::mem::take(&mut self.mode);
        if outgoing.is_normal() {
            return;
        }
        debug!(mode = outgoing.name(), "mode cancelled");
        self.mode_stats.record_cancel(outgoing.name());
        drop(outgoing);
        self.damage_all();
    }

    fn enter_mode(&mut self, mode: Mode) {
        if !self.mode.is_normal() {
            self.enter_normal_mode();
        }
        debug!(mode = mode.name(), "mode entered");
        self.mode_stats.record_enter(mode.name());
        self.mode = mode;
        self.damage_all();
    }

    /// Start a drag-and-drop session owning the pointer. Backends call
    /// this when a client initiates a drag; the button release ends it.
    pub fn begin_dnd(&mut self, view: ViewId) {
        if self.state.view(view).is_some() {
            self.enter_mode(Mode::Dnd { view });
        }
    }

    fn enter_grab_mode(&mut self, resize: bool) {
        let Some(id) = self.state.focused_view() else {
            return;
        };
        let Some(view) = self.state.view(id) else {
            return;
        };
        if resize && view.maximization.is_full() {
            return;
        }
        let grab = PointerGrab {
            view: id,
            start_pointer: self.state.pointer,
            start_geometry: view.geometry,
        };
        self.enter_mode(if resize {
            Mode::Resize(grab)
        } else {
            Mode::Move(grab)
        });
    }

    // ── Actions ──────────────────────────────────────────────────────

    pub fn run_action(&mut self, action: &Action) {
        match action {
            Action::Quit => {
                info!("quit requested");
                self.state.running = false;
            }
            Action::Close => {
                if let Some(focused) = self.state.focused_view() {
                    self.backend.close(focused);
                }
            }
            Action::Exec(command) => {
                info!(command, "exec");
                self.runner.execute(command);
            }
            Action::ExecMacro(name) => {
                if let Some(command) = self.state.config.macros.get(name).cloned() {
                    info!(name, command, "exec macro");
                    self.runner.execute(&command);
                } else {
                    warn!(name, "unknown command macro");
                }
            }

            Action::SwitchSheet(index) => {
                self.state.switch_sheet(*index, self.backend.as_mut());
                self.damage_all();
            }
            Action::AlternateSheet => {
                self.state.toggle_alternate_sheet(self.backend.as_mut());
                self.damage_all();
            }
            Action::CycleSheet(direction) => {
                let Some(current) = self.state.focused_output().map(|o| o.workspace.current())
                else {
                    return;
                };
                let next = match direction {
                    Direction::Next => current.next_cycle(),
                    Direction::Prev => current.prev_cycle(),
                };
                self.state.switch_sheet(next, self.backend.as_mut());
                self.damage_all();
            }

            Action::CycleView(scope, direction) => {
                if let Some(target) = self.state.cycle_target(*scope, *direction) {
                    self.cycling = true;
                    self.state.focus_view(target, self.backend.as_mut());
                    self.damage_view(target);
                }
            }
            Action::CycleGroup(direction) => {
                if let Some(target) = self.state.cycle_group_target(*direction) {
                    self.cycling = true;
                    self.state.focus_view(target, self.backend.as_mut());
                    self.damage_view(target);
                }
            }

            Action::Raise => {
                if let Some(focused) = self.state.focused_view() {
                    self.state.raise_view(focused);
                    self.damage_view(focused);
                }
            }
            Action::Lower => {
                if let Some(focused) = self.state.focused_view() {
                    self.state.lower_view(focused);
                    self.damage_view(focused);
                }
            }
            Action::RaiseGroup => self.restack_group(true),
            Action::LowerGroup => self.restack_group(false),
            Action::Hide => {
                if let Some(focused) = self.state.focused_view() {
                    self.state.hide_view(focused, self.backend.as_mut());
                    self.state.focus_first(self.backend.as_mut());
                    self.damage_all();
                }
            }
            Action::ShowAll => self.reveal(|_| true, false),
            Action::ShowInvisible => {
                self.reveal(|v| v.flags.contains(ViewFlags::INVISIBLE), true);
            }
            Action::ShowGroup(name) => self.reveal(|v| v.group == *name, false),

            Action::ToggleFloating => {
                if let Some(focused) = self.state.focused_view() {
                    if let Some(view) = self.state.view_mut(focused) {
                        view.flags.toggle(ViewFlags::FLOATING);
                    }
                    self.damage_view(focused);
                }
            }

            Action::MaximizeFull => self.with_usable(|view, usable, backend| {
                view.queue_maximize_full(usable, backend)
            }),
            Action::MaximizeVertical => self.with_usable(|view, usable, backend| {
                view.queue_maximize_vertical(usable, backend)
            }),
            Action::MaximizeHorizontal => self.with_usable(|view, usable, backend| {
                view.queue_maximize_horizontal(usable, backend)
            }),
            Action::Unmaximize => self.with_usable(|view, _, backend| {
                view.queue_unmaximize(true, backend)
            }),
            Action::Reset => self.with_usable(|view, usable, backend| {
                let target = view.restored_geometry().constrain(usable);
                view.queue_reset(target, true, backend)
            }),
            Action::Snap(anchor) => self.snap_focused(*anchor),

            Action::ApplyLayout(name) => {
                if let Some(split) = self.state.config.layout(name) {
                    self.apply_split(split);
                } else {
                    warn!(name, "unknown layout");
                }
            }
            Action::ResetLayout => {
                let Some(output) = self.state.focused_output else {
                    return;
                };
                let current = match self.state.outputs.get(&output) {
                    Some(o) => o.workspace.current(),
                    None => return,
                };
                let views = &mut self.state.views;
                if let Some(o) = self.state.outputs.get_mut(&output) {
                    o.workspace.sheet_mut(current).reset_layout(views);
                }
                self.damage_all();
            }

            Action::EnterMove => self.enter_grab_mode(false),
            Action::EnterResize => self.enter_grab_mode(true),
            Action::EnterGroupAssign => {
                let names = self.state.groups.names().map(str::to_owned).collect();
                self.enter_mode(Mode::GroupAssign {
                    buffer: InputBuffer::new(),
                    completion: Completion::new(names),
                });
            }
            Action::EnterSheetAssign => self.enter_mode(Mode::SheetAssign),
            Action::EnterMarkAssign => self.enter_mode(Mode::MarkAssign),
            Action::EnterMarkSelect => self.enter_mode(Mode::MarkSelect),
            Action::EnterLayoutSelect => self.enter_mode(Mode::LayoutSelect),
            Action::EnterExec => {
                let macros = self.state.config.macros.keys().cloned().collect();
                self.enter_mode(Mode::Exec {
                    buffer: InputBuffer::new(),
                    completion: Completion::new(macros),
                });
            }
            Action::EnterInputGrab => self.enter_mode(Mode::InputGrab),
            Action::Lock => {
                info!("session locked");
                self.enter_mode(Mode::Lock {
                    buffer: InputBuffer::new(),
                    denied: false,
                });
            }
        }
    }

    /// Queue an operation on the focused view against its output's
    /// usable area.
    fn with_usable(
        &mut self,
        op: impl FnOnce(&mut crate::view::View, Geometry, &mut dyn SurfaceBackend) -> QueueResult,
    ) {
        let Some(focused) = self.state.focused_view() else {
            return;
        };
        let Some(usable) = self
            .state
            .view(focused)
            .and_then(|v| self.state.outputs.get(&v.output))
            .map(|o| o.usable)
        else {
            return;
        };
        let before = self.state.view(focused).map(|v| v.geometry);
        if let Some(view) = self.state.views.get_mut(&focused) {
            if let QueueResult::Committed(committed) = op(view, usable, self.backend.as_mut()) {
                self.state.finish_commit(focused, &committed);
            }
        }
        if let Some(before) = before {
            self.damage_rect(focused, before);
        }
        self.damage_view(focused);
    }

    /// Move the focused view to an anchor position within its output's
    /// usable area. Synchronous; no configure involved.
    fn snap_focused(&mut self, anchor: crate::geometry::Anchor) {
        let Some(focused) = self.state.focused_view() else {
            return;
        };
        let Some(usable) = self
            .state
            .view(focused)
            .and_then(|v| self.state.outputs.get(&v.output))
            .map(|o| o.usable)
        else {
            return;
        };
        let before = self.state.view(focused).map(|v| v.geometry);
        if let Some(view) = self.state.views.get_mut(&focused) {
            let target = view.geometry.anchor_in(usable, anchor);
            view.move_to(target.x, target.y, self.backend.as_mut());
        }
        if let Some(before) = before {
            self.damage_rect(focused, before);
        }
        self.damage_view(focused);
    }

    fn apply_split(&mut self, split: crate::split::SplitTree) {
        let Some(output_id) = self.state.focused_output else {
            return;
        };
        let (usable, current) = match self.state.outputs.get(&output_id) {
            Some(o) => (o.usable, o.workspace.current()),
            None => return,
        };
        let spacing = self.state.config.spacing;
        let views = &mut self.state.views;
        let commits = match self.state.outputs.get_mut(&output_id) {
            Some(output) => output.workspace.sheet_mut(current).apply_split(
                split,
                usable,
                spacing,
                true,
                views,
                self.backend.as_mut(),
            ),
            None => None,
        };
        // Fast-path placements skipped the acknowledgement round-trip;
        // their fixups run here instead of in the commit handler.
        for (id, committed) in commits.into_iter().flatten() {
            self.state.finish_commit(id, &committed);
        }
        self.damage_all();
    }

    fn assign_group(&mut self, name: &str) {
        let Some(focused) = self.state.focused_view() else {
            return;
        };
        let Some(view) = self.state.view_mut(focused) else {
            return;
        };
        let old = std::mem::replace(&mut view.group, name.to_string());
        let visible = !view.is_hidden();
        self.state.groups.reassign(focused, &old, name, visible);
        debug!(view = %focused, from = old, to = name, "group reassigned");
    }

    fn migrate_focused(&mut self, sheet: SheetIndex) {
        let Some(focused) = self.state.focused_view() else {
            return;
        };
        let Some(view) = self.state.view(focused) else {
            return;
        };
        if view.sheet == sheet {
            return;
        }
        let output = view.output;
        let target = view.geometry;
        if let Some(view) = self.state.view_mut(focused) {
            if let QueueResult::Committed(committed) =
                view.queue_migrate(output, sheet, target, self.backend.as_mut())
            {
                self.state.finish_commit(focused, &committed);
            }
        }
        self.state.focus_first(self.backend.as_mut());
        self.damage_all();
    }

    /// Reveal the current sheet's tail run of hidden views matching
    /// `pred`. Only the invisible-targeting reveal clears the
    /// invisible flag; other reveals leave it for a later `show
    /// invisible`.
    fn reveal(&mut self, pred: impl Fn(&crate::view::View) -> bool, clear_invisible: bool) {
        let Some(output) = self.state.focused_output() else {
            return;
        };
        let revealed = output
            .workspace
            .current_sheet()
            .reveal_tail(&self.state.views, pred);
        for id in revealed {
            if clear_invisible {
                if let Some(view) = self.state.view_mut(id) {
                    view.flags.remove(ViewFlags::INVISIBLE);
                }
            }
            self.state.show_view(id);
        }
        self.state.focus_first(self.backend.as_mut());
        self.damage_all();
    }

    /// Restack the focused view's whole group, the focused view ending
    /// on the extreme of the new run.
    fn restack_group(&mut self, raise: bool) {
        let Some(focused) = self.state.focused_view() else {
            return;
        };
        let Some(name) = self.state.view(focused).map(|v| v.group.clone()) else {
            return;
        };
        if raise {
            self.state.raise_group(&name, focused);
        } else {
            self.state.lower_group(&name, focused);
        }
        self.damage_all();
    }

    // ── Damage helpers ───────────────────────────────────────────────

    fn damage_view(&mut self, id: ViewId) {
        if let Some(view) = self.state.view(id) {
            let rect = view.geometry.grow(self.state.config.spacing.border);
            let output = view.output;
            self.damage.entry(output).or_default().add(rect);
        }
    }

    fn damage_rect(&mut self, id: ViewId, rect: Geometry) {
        if let Some(view) = self.state.view(id) {
            let rect = rect.grow(self.state.config.spacing.border);
            let output = view.output;
            self.damage.entry(output).or_default().add(rect);
        }
    }

    fn damage_all(&mut self) {
        for output in self.state.outputs.keys() {
            self.damage.entry(*output).or_default().add_full();
        }
    }
}
