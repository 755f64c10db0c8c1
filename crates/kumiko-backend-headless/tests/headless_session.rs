//! Full sessions driven through the headless backend.

use kumiko_backend_headless::{HeadlessBackend, HeadlessRunner, HeadlessText, StaticVerifier};
use kumiko_core::backend::{BackendEvent, ButtonState, KeyState};
use kumiko_core::config::Config;
use kumiko_core::input::{Action, Modifiers};
use kumiko_core::render::DrawCommand;
use kumiko_core::{Geometry, OutputId, Server, ViewId};

fn session() -> (Server, HeadlessBackend, HeadlessRunner) {
    let backend = HeadlessBackend::new();
    let runner = HeadlessRunner::new();
    let mut server = Server::new(
        Config::default(),
        Box::new(backend.clone()),
        Box::new(HeadlessText::new()),
        Box::new(runner.clone()),
        Box::new(StaticVerifier::new("hunter2")),
    );
    server.handle_event(BackendEvent::OutputAdded {
        output: OutputId(1),
        name: "headless-0".into(),
        geometry: Geometry::new(0, 0, 1600, 900),
        usable: Geometry::new(0, 0, 1600, 900),
    });
    (server, backend, runner)
}

fn map(server: &mut Server, id: u64) -> ViewId {
    let view = ViewId(id);
    server.handle_event(BackendEvent::SurfaceMapped {
        view,
        app_id: format!("app-{id}"),
        title: format!("window {id}"),
        geometry: Geometry::new(50, 60, 640, 480),
    });
    view
}

fn motion(server: &mut Server, x: f64, y: f64) {
    server.handle_event(BackendEvent::PointerMotion {
        x,
        y,
        time_msec: 0,
    });
}

fn pump(server: &mut Server, backend: &HeadlessBackend) {
    for event in backend.acknowledge_all() {
        server.handle_event(event);
    }
}

#[test]
fn move_mode_follows_the_pointer() {
    let (mut server, backend, _) = session();
    let view = map(&mut server, 1);

    motion(&mut server, 100.0, 100.0);
    server.run_action(&Action::EnterMove);
    motion(&mut server, 130.0, 180.0);

    assert_eq!(
        server.state.view(view).map(|v| (v.geometry.x, v.geometry.y)),
        Some((80, 140))
    );
    assert!(backend.moves().contains(&(view, 80, 140)));

    server.handle_event(BackendEvent::Button {
        button: 0x110,
        state: ButtonState::Released,
        time_msec: 0,
    });
    assert!(server.mode().is_normal());

    // Motion after the release must not drag the view further.
    motion(&mut server, 500.0, 500.0);
    assert_eq!(
        server.state.view(view).map(|v| (v.geometry.x, v.geometry.y)),
        Some((80, 140))
    );
}

#[test]
fn resize_mode_sends_one_configure_per_acknowledgement() {
    let (mut server, backend, _) = session();
    let view = map(&mut server, 1);

    motion(&mut server, 200.0, 200.0);
    server.run_action(&Action::EnterResize);

    for step in 1..=5 {
        motion(&mut server, 200.0 + f64::from(step) * 10.0, 200.0);
    }
    assert_eq!(backend.configures().len(), 1);

    pump(&mut server, &backend);
    motion(&mut server, 400.0, 260.0);
    assert_eq!(backend.configures().len(), 2);
    let last = backend.last_configure(view).unwrap();
    assert_eq!((last.width, last.height), (840, 540));
}

#[test]
fn layout_session_tiles_and_settles() {
    let (mut server, backend, _) = session();
    let views = [
        map(&mut server, 1),
        map(&mut server, 2),
        map(&mut server, 3),
    ];

    server.run_action(&Action::ApplyLayout("stack".into()));
    pump(&mut server, &backend);

    let geometries: Vec<Geometry> = views
        .iter()
        .map(|id| server.state.view(*id).unwrap().geometry)
        .collect();
    for (i, a) in geometries.iter().enumerate() {
        assert!(!a.is_empty());
        for b in &geometries[i + 1..] {
            assert!(!a.intersects(*b), "tiles overlap: {a:?} vs {b:?}");
        }
    }

    // Everything acknowledged; a second pump has nothing to replay.
    assert!(backend.acknowledge_all().is_empty());
}

#[test]
fn frames_emit_surfaces_and_the_indicator_bar() {
    let (mut server, _, _) = session();
    let view = map(&mut server, 1);

    let commands = server.handle_event(BackendEvent::Frame {
        output: OutputId(1),
    });
    assert!(commands
        .iter()
        .any(|c| matches!(c, DrawCommand::Surface { view: v, .. } if *v == view)));
    assert!(commands
        .iter()
        .any(|c| matches!(c, DrawCommand::Text { .. })));
}

#[test]
fn bound_exec_reaches_the_runner() {
    let (mut server, _, runner) = session();
    server.handle_event(BackendEvent::Key {
        keysym: 0xff0d,
        state: KeyState::Pressed,
        modifiers: Modifiers::SUPER,
        time_msec: 0,
    });
    assert_eq!(runner.commands(), vec!["foot".to_string()]);
}
