//! Collaborator contracts.
//!
//! The core never touches a display-server protocol. Backends translate
//! protocol events into [`BackendEvent`]s and implement the collaborator
//! traits; the core calls back through them for the request/acknowledge
//! resize protocol, text rasterization, process spawning and password
//! verification.

use crate::geometry::Geometry;
use crate::view::ViewId;

/// Backend-assigned identifier for a physical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputId(pub u64);

impl std::fmt::Display for OutputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "output:{}", self.0)
    }
}

/// Opaque, monotonically increasing configure serial.
///
/// The ordering comparison (`>=`) is the sole mechanism for matching a
/// late client acknowledgement against several in-flight configure
/// requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Serial(pub u64);

/// Key press/release state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Pointer button press/release state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

/// Events a backend feeds into [`Server::handle_event`].
///
/// [`Server::handle_event`]: crate::server::Server::handle_event
#[derive(Debug, Clone)]
pub enum BackendEvent {
    /// A surface was mapped and should become a managed view.
    SurfaceMapped {
        view: ViewId,
        app_id: String,
        title: String,
        geometry: Geometry,
    },

    /// A surface disappeared; the view is destroyed.
    SurfaceDestroyed { view: ViewId },

    /// The client committed a buffer, possibly acknowledging a configure.
    SurfaceCommit {
        view: ViewId,
        serial: Serial,
        size: (u32, u32),
    },

    /// A view's title changed.
    TitleChanged { view: ViewId, title: String },

    /// Keyboard key event with the current modifier mask.
    Key {
        keysym: u32,
        state: KeyState,
        modifiers: crate::input::Modifiers,
        time_msec: u32,
    },

    /// The modifier mask changed without a mapped key event.
    Modifiers { modifiers: crate::input::Modifiers },

    /// Pointer button event.
    Button {
        button: u32,
        state: ButtonState,
        time_msec: u32,
    },

    /// Absolute pointer position update.
    PointerMotion { x: f64, y: f64, time_msec: u32 },

    /// A new output appeared.
    OutputAdded {
        output: OutputId,
        name: String,
        geometry: Geometry,
        usable: Geometry,
    },

    /// An output disappeared; its workspace merges elsewhere.
    OutputRemoved { output: OutputId },

    /// Frame timer tick for `output`; drives the render dispatch.
    Frame { output: OutputId },
}

/// The display-server side of the resize/configure protocol.
///
/// `configure` must return a serial strictly greater than every serial it
/// returned before; the client's commit echoes the highest serial it has
/// acknowledged.
pub trait SurfaceBackend {
    /// Request the client resize to `width`×`height`. Returns the serial
    /// the acknowledging commit will carry.
    fn configure(&mut self, view: ViewId, width: u32, height: u32) -> Serial;

    /// Reposition a surface. Synchronous; no acknowledgement involved.
    fn move_view(&mut self, view: ViewId, x: i32, y: i32);

    /// Tell the client whether it is the activated (focused) surface.
    fn set_activated(&mut self, view: ViewId, activated: bool);

    /// Ask the client to close.
    fn close(&mut self, view: ViewId);
}

/// Opaque handle to a rasterized texture owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// A rasterized string with its pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextTexture {
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
}

/// Rasterizes indicator-bar text.
pub trait TextRenderer {
    fn render_text(&mut self, text: &str, font: &str) -> TextTexture;
}

/// Spawns external commands, detached.
pub trait CommandRunner {
    fn execute(&mut self, command: &str);
}

/// The unlock helper: exchanges a candidate password for a verdict.
///
/// Implementations talk to a separate trusted process over a pipe pair;
/// the read blocks the whole event loop, so input stays frozen while a
/// verification is in flight.
pub trait PasswordVerifier {
    fn verify(&mut self, password: &str) -> bool;
}
