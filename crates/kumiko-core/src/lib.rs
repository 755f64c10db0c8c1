//! Kumiko Core: protocol-agnostic tiling compositor engine
//!
//! This crate contains all window-management logic (views, sheets,
//! groups, marks, layouts, modes) with zero dependencies on display
//! protocols. Backends translate protocol events into
//! [`BackendEvent`]s, feed them to [`Server::handle_event`], and apply
//! the returned draw commands plus the calls made through the
//! collaborator traits in [`backend`] back to the display server.
//!
//! # Quick start
//! ```
//! use kumiko_core::backend::{BackendEvent, OutputId};
//! use kumiko_core::config::Config;
//! use kumiko_core::{Geometry, Server, ViewId};
//!
//! # use kumiko_core::backend::{CommandRunner, PasswordVerifier, Serial, SurfaceBackend,
//! #     TextRenderer, TextTexture, TextureId};
//! # struct Null(u64);
//! # impl SurfaceBackend for Null {
//! #     fn configure(&mut self, _: ViewId, _: u32, _: u32) -> Serial {
//! #         self.0 += 1;
//! #         Serial(self.0)
//! #     }
//! #     fn move_view(&mut self, _: ViewId, _: i32, _: i32) {}
//! #     fn set_activated(&mut self, _: ViewId, _: bool) {}
//! #     fn close(&mut self, _: ViewId) {}
//! # }
//! # struct Text;
//! # impl TextRenderer for Text {
//! #     fn render_text(&mut self, text: &str, _: &str) -> TextTexture {
//! #         TextTexture { texture: TextureId(0), width: text.len() as u32 * 8, height: 16 }
//! #     }
//! # }
//! # struct Sh;
//! # impl CommandRunner for Sh { fn execute(&mut self, _: &str) {} }
//! # struct Pw;
//! # impl PasswordVerifier for Pw { fn verify(&mut self, _: &str) -> bool { true } }
//! let mut server = Server::new(
//!     Config::default(),
//!     Box::new(Null(0)),
//!     Box::new(Text),
//!     Box::new(Sh),
//!     Box::new(Pw),
//! );
//!
//! // Backend tells the core an output and a surface appeared.
//! server.handle_event(BackendEvent::OutputAdded {
//!     output: OutputId(1),
//!     name: "HDMI-A-1".into(),
//!     geometry: Geometry::new(0, 0, 1920, 1080),
//!     usable: Geometry::new(0, 0, 1920, 1080),
//! });
//! server.handle_event(BackendEvent::SurfaceMapped {
//!     view: ViewId(1),
//!     app_id: "foot".into(),
//!     title: "shell".into(),
//!     geometry: Geometry::new(40, 40, 800, 600),
//! });
//! assert_eq!(server.state.focused_view(), Some(ViewId(1)));
//! ```

pub mod backend;
pub mod config;
pub mod geometry;
pub mod group;
pub mod input;
pub mod invariants;
pub mod layout;
pub mod mark;
pub mod mode;
pub mod render;
pub mod server;
pub mod sheet;
pub mod split;
pub mod state;
pub mod text;
pub mod view;
pub mod workspace;

// Re-export primary API types at the crate root
pub use backend::{BackendEvent, OutputId, Serial};
pub use geometry::Geometry;
pub use input::Action;
pub use mark::MarkId;
pub use server::Server;
pub use sheet::SheetIndex;
pub use state::State;
pub use view::ViewId;
