//! In-memory backend for Kumiko.
//!
//! Implements every collaborator trait against plain data structures:
//! configures are recorded with minted serials, commands and close
//! requests land in logs, and text "rasterization" just measures the
//! string. Handles are cheap clones over shared interior state, so a
//! test can keep one while the [`Server`](kumiko_core::Server) owns the
//! boxed other.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use kumiko_core::backend::{
    BackendEvent, CommandRunner, PasswordVerifier, Serial, SurfaceBackend, TextRenderer,
    TextTexture, TextureId,
};
use kumiko_core::ViewId;

/// One configure request captured from the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureRecord {
    pub view: ViewId,
    pub width: u32,
    pub height: u32,
    pub serial: Serial,
    pub acknowledged: bool,
}

#[derive(Debug, Default)]
struct Inner {
    next_serial: u64,
    configures: Vec<ConfigureRecord>,
    moves: Vec<(ViewId, i32, i32)>,
    activations: Vec<(ViewId, bool)>,
    closed: Vec<ViewId>,
}

/// The display-server half, backed by logs instead of a protocol.
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    inner: Rc<RefCell<Inner>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configures(&self) -> Vec<ConfigureRecord> {
        self.inner.borrow().configures.clone()
    }

    pub fn moves(&self) -> Vec<(ViewId, i32, i32)> {
        self.inner.borrow().moves.clone()
    }

    pub fn activations(&self) -> Vec<(ViewId, bool)> {
        self.inner.borrow().activations.clone()
    }

    pub fn closed(&self) -> Vec<ViewId> {
        self.inner.borrow().closed.clone()
    }

    /// The most recent configure sent to `view`, acknowledged or not.
    pub fn last_configure(&self, view: ViewId) -> Option<ConfigureRecord> {
        self.inner
            .borrow()
            .configures
            .iter()
            .rev()
            .find(|c| c.view == view)
            .copied()
    }

    /// Play the client's part: answer every outstanding configure with
    /// the commit event that acknowledges it, in request order.
    pub fn acknowledge_all(&self) -> Vec<BackendEvent> {
        let mut inner = self.inner.borrow_mut();
        inner
            .configures
            .iter_mut()
            .filter(|c| !c.acknowledged)
            .map(|c| {
                c.acknowledged = true;
                BackendEvent::SurfaceCommit {
                    view: c.view,
                    serial: c.serial,
                    size: (c.width, c.height),
                }
            })
            .collect()
    }
}

impl SurfaceBackend for HeadlessBackend {
    fn configure(&mut self, view: ViewId, width: u32, height: u32) -> Serial {
        let mut inner = self.inner.borrow_mut();
        inner.next_serial += 1;
        let serial = Serial(inner.next_serial);
        debug!(%view, width, height, serial = serial.0, "configure");
        inner.configures.push(ConfigureRecord {
            view,
            width,
            height,
            serial,
            acknowledged: false,
        });
        serial
    }

    fn move_view(&mut self, view: ViewId, x: i32, y: i32) {
        self.inner.borrow_mut().moves.push((view, x, y));
    }

    fn set_activated(&mut self, view: ViewId, activated: bool) {
        self.inner.borrow_mut().activations.push((view, activated));
    }

    fn close(&mut self, view: ViewId) {
        debug!(%view, "close requested");
        self.inner.borrow_mut().closed.push(view);
    }
}

/// Measures strings at a fixed cell size instead of rasterizing them.
#[derive(Debug, Clone, Default)]
pub struct HeadlessText {
    next_texture: Rc<RefCell<u64>>,
}

impl HeadlessText {
    pub const CELL_WIDTH: u32 = 8;
    pub const CELL_HEIGHT: u32 = 16;

    pub fn new() -> Self {
        Self::default()
    }
}

impl TextRenderer for HeadlessText {
    fn render_text(&mut self, text: &str, _font: &str) -> TextTexture {
        let mut next = self.next_texture.borrow_mut();
        *next += 1;
        TextTexture {
            texture: TextureId(*next),
            width: text.chars().count() as u32 * Self::CELL_WIDTH,
            height: Self::CELL_HEIGHT,
        }
    }
}

/// Records commands instead of spawning them.
#[derive(Debug, Clone, Default)]
pub struct HeadlessRunner {
    commands: Rc<RefCell<Vec<String>>>,
}

impl HeadlessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }
}

impl CommandRunner for HeadlessRunner {
    fn execute(&mut self, command: &str) {
        debug!(command, "exec");
        self.commands.borrow_mut().push(command.to_string());
    }
}

/// Compares against a fixed password.
#[derive(Debug, Clone)]
pub struct StaticVerifier {
    password: String,
}

impl StaticVerifier {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl PasswordVerifier for StaticVerifier {
    fn verify(&mut self, password: &str) -> bool {
        password == self.password
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn serials_are_strictly_increasing() {
        let mut backend = HeadlessBackend::new();
        let a = backend.configure(ViewId(1), 100, 100);
        let b = backend.configure(ViewId(1), 200, 200);
        let c = backend.configure(ViewId(2), 300, 300);
        assert!(a < b && b < c);
    }

    #[test]
    fn clones_share_the_log() {
        let handle = HeadlessBackend::new();
        let mut owned = handle.clone();
        owned.configure(ViewId(7), 640, 480);
        assert_eq!(handle.last_configure(ViewId(7)).map(|c| c.serial), Some(Serial(1)));
    }

    #[test]
    fn acknowledge_all_answers_each_configure_once() {
        let mut backend = HeadlessBackend::new();
        backend.configure(ViewId(1), 100, 100);
        backend.configure(ViewId(2), 200, 200);

        let events = backend.acknowledge_all();
        assert_eq!(events.len(), 2);
        assert!(backend.acknowledge_all().is_empty());
    }

    #[test]
    fn text_measures_by_character_count() {
        let mut text = HeadlessText::new();
        let texture = text.render_text("kumiko", "monospace 10");
        assert_eq!(texture.width, 6 * HeadlessText::CELL_WIDTH);
        assert_eq!(texture.height, HeadlessText::CELL_HEIGHT);
    }

    #[test]
    fn verifier_matches_exactly() {
        let mut verifier = StaticVerifier::new("correct horse");
        assert!(verifier.verify("correct horse"));
        assert!(!verifier.verify("correct horse "));
        assert!(!verifier.verify(""));
    }
}
