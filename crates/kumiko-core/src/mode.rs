//! The input mode set.
//!
//! Exactly one mode is active at a time. Each variant owns its scratch
//! state (prompt buffers, completion lists, grab anchors), so leaving a
//! mode by value through [`Server::enter_normal_mode`] releases that
//! state exactly once; there is no separate cancel callback to forget
//! or to double-invoke.
//!
//! [`Server::enter_normal_mode`]: crate::server::Server::enter_normal_mode

use std::collections::HashMap;

use crate::geometry::Geometry;
use crate::text::{Completion, InputBuffer};
use crate::view::ViewId;

/// Anchor data for the pointer-driven move/resize modes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerGrab {
    pub view: ViewId,
    pub start_pointer: (f64, f64),
    pub start_geometry: Geometry,
}

/// The active input-interpretation state.
#[derive(Debug, Default)]
pub enum Mode {
    #[default]
    Normal,
    /// Pointer motion repositions the grabbed view.
    Move(PointerGrab),
    /// Pointer motion resizes the grabbed view from its corner.
    Resize(PointerGrab),
    /// All keys forward to the client until the grab keybinding exits.
    InputGrab,
    /// Text prompt naming the focused view's new group.
    GroupAssign {
        buffer: InputBuffer,
        completion: Completion,
    },
    /// Next digit reassigns the focused view's sheet.
    SheetAssign,
    /// Next letter binds a mark to the focused view.
    MarkAssign,
    /// Next letter jumps to the marked view.
    MarkSelect,
    /// Next letter applies the layout bound to that register.
    LayoutSelect,
    /// Text prompt over the configured command macros.
    Exec {
        buffer: InputBuffer,
        completion: Completion,
    },
    /// Screen lock; keys feed the password line only.
    Lock { buffer: InputBuffer, denied: bool },
    /// A drag-and-drop gesture owns the pointer.
    Dnd { view: ViewId },
}

impl Mode {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Move(_) => "move",
            Self::Resize(_) => "resize",
            Self::InputGrab => "input-grab",
            Self::GroupAssign { .. } => "group-assign",
            Self::SheetAssign => "sheet-assign",
            Self::MarkAssign => "mark-assign",
            Self::MarkSelect => "mark-select",
            Self::LayoutSelect => "layout-select",
            Self::Exec { .. } => "exec",
            Self::Lock { .. } => "lock",
            Self::Dnd { .. } => "dnd",
        }
    }

    pub const fn is_normal(&self) -> bool {
        matches!(self, Self::Normal)
    }

    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::Lock { .. })
    }

    /// Whether this mode paints an input prompt on the indicator bar.
    pub const fn has_prompt(&self) -> bool {
        matches!(
            self,
            Self::GroupAssign { .. } | Self::Exec { .. } | Self::Lock { .. }
        )
    }
}

/// What a key handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The event was interpreted by the mode.
    Consumed,
    /// The backend should forward the event to the focused client.
    Forward,
}

/// Per-mode enter/cancel counters.
///
/// Mode transitions are infrequent; the counters make the
/// cancel-exactly-once guarantee observable in tests and logs.
#[derive(Debug, Default)]
pub struct ModeStats {
    entered: HashMap<&'static str, u32>,
    cancelled: HashMap<&'static str, u32>,
}

impl ModeStats {
    pub fn record_enter(&mut self, name: &'static str) {
        *self.entered.entry(name).or_default() += 1;
    }

    pub fn record_cancel(&mut self, name: &'static str) {
        *self.cancelled.entry(name).or_default() += 1;
    }

    pub fn entries(&self, name: &str) -> u32 {
        self.entered.get(name).copied().unwrap_or(0)
    }

    pub fn cancels(&self, name: &str) -> u32 {
        self.cancelled.get(name).copied().unwrap_or(0)
    }
}
