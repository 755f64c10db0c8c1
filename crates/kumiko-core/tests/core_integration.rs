//! Core-only integration tests.
//!
//! These exercise kumiko-core without any backend crate: the
//! collaborator traits are implemented on plain Rust types, and client
//! acknowledgements are replayed from the recorded configures.

use std::cell::RefCell;
use std::rc::Rc;

use kumiko_core::backend::{
    BackendEvent, CommandRunner, KeyState, PasswordVerifier, SurfaceBackend, TextRenderer,
    TextTexture, TextureId,
};
use kumiko_core::config::Config;
use kumiko_core::input::{Action, CycleScope, Direction, Modifiers};
use kumiko_core::{Geometry, OutputId, Serial, Server, SheetIndex, ViewId};

#[derive(Default)]
struct Log {
    serial: u64,
    configures: Vec<(ViewId, u32, u32, Serial)>,
    pending: Vec<(ViewId, u32, u32, Serial)>,
    closed: Vec<ViewId>,
    commands: Vec<String>,
}

type SharedLog = Rc<RefCell<Log>>;

struct RecordingBackend(SharedLog);

impl SurfaceBackend for RecordingBackend {
    fn configure(&mut self, view: ViewId, width: u32, height: u32) -> Serial {
        let mut log = self.0.borrow_mut();
        log.serial += 1;
        let serial = Serial(log.serial);
        log.configures.push((view, width, height, serial));
        log.pending.push((view, width, height, serial));
        serial
    }

    fn move_view(&mut self, _view: ViewId, _x: i32, _y: i32) {}

    fn set_activated(&mut self, _view: ViewId, _activated: bool) {}

    fn close(&mut self, view: ViewId) {
        self.0.borrow_mut().closed.push(view);
    }
}

struct MeasuringText;

impl TextRenderer for MeasuringText {
    fn render_text(&mut self, text: &str, _font: &str) -> TextTexture {
        TextTexture {
            texture: TextureId(1),
            width: text.len() as u32 * 8,
            height: 16,
        }
    }
}

struct RecordingRunner(SharedLog);

impl CommandRunner for RecordingRunner {
    fn execute(&mut self, command: &str) {
        self.0.borrow_mut().commands.push(command.to_string());
    }
}

struct FixedVerifier;

impl PasswordVerifier for FixedVerifier {
    fn verify(&mut self, password: &str) -> bool {
        password == "open sesame"
    }
}

/// A server with default config and one 1920×1080 output.
fn test_server() -> (Server, SharedLog) {
    let log = SharedLog::default();
    let mut server = Server::new(
        Config::default(),
        Box::new(RecordingBackend(Rc::clone(&log))),
        Box::new(MeasuringText),
        Box::new(RecordingRunner(Rc::clone(&log))),
        Box::new(FixedVerifier),
    );
    server.handle_event(BackendEvent::OutputAdded {
        output: OutputId(1),
        name: "test-output".into(),
        geometry: Geometry::new(0, 0, 1920, 1080),
        usable: Geometry::new(0, 0, 1920, 1080),
    });
    (server, log)
}

fn map_view(server: &mut Server, id: u64, app_id: &str) -> ViewId {
    let view = ViewId(id);
    server.handle_event(BackendEvent::SurfaceMapped {
        view,
        app_id: app_id.into(),
        title: app_id.into(),
        geometry: Geometry::new(20, 20, 800, 600),
    });
    view
}

fn press(server: &mut Server, keysym: u32) {
    server.handle_event(BackendEvent::Key {
        keysym,
        state: KeyState::Pressed,
        modifiers: Modifiers::empty(),
        time_msec: 0,
    });
}

/// Replay every outstanding configure as a client acknowledgement.
fn acknowledge_all(server: &mut Server, log: &SharedLog) {
    let pending: Vec<_> = log.borrow_mut().pending.drain(..).collect();
    for (view, width, height, serial) in pending {
        server.handle_event(BackendEvent::SurfaceCommit {
            view,
            serial,
            size: (width, height),
        });
    }
}

// ── Sheets ───────────────────────────────────────────────────────

#[test]
fn sticky_sheet_views_survive_sheet_switches() {
    let (mut server, log) = test_server();
    let sticky = map_view(&mut server, 1, "bar");
    server.run_action(&Action::EnterSheetAssign);
    press(&mut server, '0' as u32);
    acknowledge_all(&mut server, &log);
    assert_eq!(
        server.state.view(sticky).map(|v| v.sheet),
        Some(SheetIndex::STICKY)
    );

    let plain = map_view(&mut server, 2, "term");
    server.run_action(&Action::SwitchSheet(SheetIndex::new(5).unwrap()));

    let visible = server
        .state
        .focused_output()
        .map(|o| o.workspace.visible_views(&server.state.views))
        .unwrap_or_default();
    assert!(visible.contains(&sticky));
    assert!(!visible.contains(&plain));
}

#[test]
fn alternate_sheet_toggles_back() {
    let (mut server, _) = test_server();
    server.run_action(&Action::SwitchSheet(SheetIndex::new(3).unwrap()));
    server.run_action(&Action::AlternateSheet);
    let current = server
        .state
        .focused_output()
        .map(|o| o.workspace.current());
    assert_eq!(current, SheetIndex::new(1));
    server.run_action(&Action::AlternateSheet);
    let current = server
        .state
        .focused_output()
        .map(|o| o.workspace.current());
    assert_eq!(current, SheetIndex::new(3));
}

// ── Marks ────────────────────────────────────────────────────────

#[test]
fn mark_jump_reveals_a_hidden_view() {
    let (mut server, _) = test_server();
    let marked = map_view(&mut server, 1, "editor");
    map_view(&mut server, 2, "term");

    server.state.focus_view(marked, &mut RecordingBackend(SharedLog::default()));
    server.run_action(&Action::EnterMarkAssign);
    press(&mut server, 'e' as u32);

    server.state.focus_view(marked, &mut RecordingBackend(SharedLog::default()));
    server.run_action(&Action::Hide);
    assert!(server.state.view(marked).is_some_and(|v| v.is_hidden()));

    server.run_action(&Action::EnterMarkSelect);
    press(&mut server, 'e' as u32);
    assert!(server.state.view(marked).is_some_and(|v| !v.is_hidden()));
    assert_eq!(server.state.focused_view(), Some(marked));
}

#[test]
fn marks_stay_one_to_one_under_rebinding() {
    let (mut server, _) = test_server();
    let first = map_view(&mut server, 1, "one");
    let second = map_view(&mut server, 2, "two");

    let mark = kumiko_core::MarkId::from_char('a').unwrap();
    server.state.set_mark(mark, first);
    server.state.set_mark(mark, second);
    assert_eq!(server.state.view(first).and_then(|v| v.mark), None);
    assert_eq!(server.state.view(second).and_then(|v| v.mark), Some(mark));

    let other = kumiko_core::MarkId::from_char('b').unwrap();
    server.state.set_mark(other, second);
    assert_eq!(server.state.marks.view(mark), None);
    assert_eq!(server.state.marks.view(other), Some(second));
}

// ── Maximization and the commit protocol ─────────────────────────

#[test]
fn maximize_round_trip_restores_the_saved_geometry() {
    let (mut server, log) = test_server();
    let view = map_view(&mut server, 1, "term");
    let original = server.state.view(view).map(|v| v.geometry);

    server.run_action(&Action::MaximizeFull);
    acknowledge_all(&mut server, &log);
    assert_eq!(
        server.state.view(view).map(|v| v.geometry),
        Some(Geometry::new(0, 0, 1920, 1080))
    );

    server.run_action(&Action::Unmaximize);
    acknowledge_all(&mut server, &log);
    assert_eq!(server.state.view(view).map(|v| v.geometry), original);
}

#[test]
fn second_operation_waits_for_the_first_acknowledgement() {
    let (mut server, log) = test_server();
    let view = map_view(&mut server, 1, "term");

    server.run_action(&Action::MaximizeFull);
    let sent = log.borrow().configures.len();

    // The view is dirty until the client commits; further operations
    // must not reach the backend.
    server.run_action(&Action::MaximizeVertical);
    assert_eq!(log.borrow().configures.len(), sent);

    acknowledge_all(&mut server, &log);
    assert!(server.state.view(view).is_some_and(|v| v.maximization.is_full()));
}

#[test]
fn fully_maximized_views_ignore_resize_requests() {
    let (mut server, log) = test_server();
    let view = map_view(&mut server, 1, "term");
    server.run_action(&Action::MaximizeFull);
    acknowledge_all(&mut server, &log);

    let sent = log.borrow().configures.len();
    let result = server.state.view_mut(view).map(|v| {
        v.queue_resize(
            Geometry::new(10, 10, 300, 200),
            false,
            &mut RecordingBackend(SharedLog::default()),
        )
    });
    assert!(matches!(result, Some(kumiko_core::view::QueueResult::Rejected)));
    assert_eq!(log.borrow().configures.len(), sent);
}

// ── Layouts ──────────────────────────────────────────────────────

#[test]
fn applying_a_layout_tiles_every_view_inside_the_output() {
    let (mut server, log) = test_server();
    let views = [
        map_view(&mut server, 1, "one"),
        map_view(&mut server, 2, "two"),
        map_view(&mut server, 3, "three"),
    ];

    server.run_action(&Action::ApplyLayout("grid".into()));
    acknowledge_all(&mut server, &log);

    let usable = Geometry::new(0, 0, 1920, 1080);
    for id in views {
        let view = server.state.view(id).unwrap();
        assert!(view.is_tiled(), "{id} should be tiled");
        assert!(
            usable.contains(view.geometry.x, view.geometry.y),
            "{id} placed outside the output"
        );
    }
}

#[test]
fn layout_reset_detaches_all_tiles() {
    let (mut server, log) = test_server();
    let view = map_view(&mut server, 1, "one");
    server.run_action(&Action::ApplyLayout("full".into()));
    acknowledge_all(&mut server, &log);
    assert!(server.state.view(view).is_some_and(|v| v.is_tiled()));

    server.run_action(&Action::ResetLayout);
    assert!(server.state.view(view).is_some_and(|v| !v.is_tiled()));
}

// ── Modes ────────────────────────────────────────────────────────

#[test]
fn every_prompt_mode_cancels_exactly_once() {
    let (mut server, _) = test_server();
    map_view(&mut server, 1, "term");

    let entries = [
        (Action::EnterExec, "exec"),
        (Action::EnterGroupAssign, "group-assign"),
        (Action::EnterSheetAssign, "sheet-assign"),
        (Action::EnterMarkAssign, "mark-assign"),
        (Action::EnterMarkSelect, "mark-select"),
        (Action::EnterLayoutSelect, "layout-select"),
        (Action::EnterMove, "move"),
        (Action::EnterResize, "resize"),
    ];
    for (action, name) in entries {
        server.run_action(&action);
        assert_eq!(server.mode().name(), name);
        press(&mut server, 0xff1b);
        assert!(server.mode().is_normal(), "{name} did not exit on escape");
        assert_eq!(server.mode_stats.entries(name), 1, "{name} entries");
        assert_eq!(server.mode_stats.cancels(name), 1, "{name} cancels");
    }
}

#[test]
fn switching_prompts_directly_still_cancels_the_first() {
    let (mut server, _) = test_server();
    map_view(&mut server, 1, "term");

    server.run_action(&Action::EnterExec);
    server.run_action(&Action::EnterGroupAssign);
    assert_eq!(server.mode().name(), "group-assign");
    assert_eq!(server.mode_stats.cancels("exec"), 1);
}

// ── Hiding ───────────────────────────────────────────────────────

#[test]
fn show_all_reveals_the_hidden_tail() {
    let (mut server, _) = test_server();
    let a = map_view(&mut server, 1, "one");
    let b = map_view(&mut server, 2, "two");

    for id in [a, b] {
        server.state.focus_view(id, &mut RecordingBackend(SharedLog::default()));
        server.run_action(&Action::Hide);
    }
    assert!(server.state.view(a).is_some_and(|v| v.is_hidden()));
    assert!(server.state.view(b).is_some_and(|v| v.is_hidden()));

    server.run_action(&Action::ShowAll);
    assert!(server.state.view(a).is_some_and(|v| !v.is_hidden()));
    assert!(server.state.view(b).is_some_and(|v| !v.is_hidden()));
}

// ── Cycling ──────────────────────────────────────────────────────

#[test]
fn sheet_cycling_wraps_and_skips_hidden_views() {
    let (mut server, _) = test_server();
    let a = map_view(&mut server, 1, "one");
    let b = map_view(&mut server, 2, "two");
    let c = map_view(&mut server, 3, "three");

    server.state.focus_view(a, &mut RecordingBackend(SharedLog::default()));
    server.state.focus_view(b, &mut RecordingBackend(SharedLog::default()));
    server.run_action(&Action::Hide);
    server.state.focus_view(c, &mut RecordingBackend(SharedLog::default()));

    server.run_action(&Action::CycleView(CycleScope::Sheet, Direction::Next));
    assert_eq!(server.state.focused_view(), Some(a));
    server.run_action(&Action::CycleView(CycleScope::Sheet, Direction::Next));
    assert_eq!(server.state.focused_view(), Some(c));
}

// ── Outputs ──────────────────────────────────────────────────────

#[test]
fn removing_an_output_migrates_its_views() {
    let (mut server, _) = test_server();
    let view = map_view(&mut server, 1, "term");
    server.handle_event(BackendEvent::OutputAdded {
        output: OutputId(2),
        name: "secondary".into(),
        geometry: Geometry::new(1920, 0, 1280, 1024),
        usable: Geometry::new(1920, 0, 1280, 1024),
    });

    server.handle_event(BackendEvent::OutputRemoved { output: OutputId(1) });
    assert_eq!(
        server.state.view(view).map(|v| v.output),
        Some(OutputId(2))
    );
    assert_eq!(
        server.state.view(view).map(|v| v.sheet),
        SheetIndex::new(1)
    );
}

// ── Locking ──────────────────────────────────────────────────────

#[test]
fn quit_binding_is_inert_while_locked() {
    let (mut server, _) = test_server();
    server.run_action(&Action::Lock);

    // A keysym that would normally match a binding only feeds the
    // password line.
    server.handle_event(BackendEvent::Key {
        keysym: 'q' as u32,
        state: KeyState::Pressed,
        modifiers: Modifiers::SUPER | Modifiers::SHIFT,
        time_msec: 0,
    });
    assert!(server.is_running());
    assert!(server.mode().is_locked());

    // The swallowed keystroke went into the password line; erase it.
    press(&mut server, 0xff08);
    for ch in "open sesame".chars() {
        press(&mut server, ch as u32);
    }
    press(&mut server, 0xff0d);
    assert!(server.mode().is_normal());
}
