//! Keybindings: modifier masks, key names, and the action vocabulary.
//!
//! Binding strings from the configuration ("super+shift+q" = "close")
//! are parsed at load time; any malformed binding or unknown action name
//! is fatal, so a running compositor only ever sees valid tables.

use std::collections::HashMap;

use bitflags::bitflags;
use thiserror::Error;

use crate::geometry::Anchor;
use crate::sheet::SheetIndex;

/// Binding table construction errors. All load-time fatal.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("invalid key name: {0}")]
    Key(String),
    #[error("invalid modifier: {0}")]
    Modifier(String),
    #[error("invalid binding: {0}")]
    Binding(String),
    #[error("unknown action: {0}")]
    Action(String),
}

bitflags! {
    /// Keyboard modifier mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT     = 0b0000_0001;
        const CTRL      = 0b0000_0010;
        const ALT       = 0b0000_0100;
        const SUPER     = 0b0000_1000;
        const CAPS_LOCK = 0b0001_0000;
        const NUM_LOCK  = 0b0010_0000;
    }
}

impl Modifiers {
    /// Mask used for binding lookup; lock states never participate.
    pub fn binding_mask(self) -> Self {
        self & (Self::SHIFT | Self::CTRL | Self::ALT | Self::SUPER)
    }

    fn parse_one(s: &str) -> Result<Self, BindingError> {
        match s {
            "shift" => Ok(Self::SHIFT),
            "ctrl" | "control" => Ok(Self::CTRL),
            "alt" | "mod1" => Ok(Self::ALT),
            "super" | "mod4" | "logo" => Ok(Self::SUPER),
            other => Err(BindingError::Modifier(other.to_string())),
        }
    }
}

/// A bindable key, abstracted over the backend's keysym values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    F(u8),
    Escape,
    Tab,
    Space,
    Return,
    Backspace,
    Delete,
    Home,
    End,
    Left,
    Right,
    Up,
    Down,
}

impl Key {
    /// Parse a key name from a binding string.
    pub fn from_name(name: &str) -> Result<Self, BindingError> {
        let lower = name.to_lowercase();
        let key = match lower.as_str() {
            "escape" | "esc" => Self::Escape,
            "tab" => Self::Tab,
            "space" => Self::Space,
            "return" | "enter" => Self::Return,
            "backspace" => Self::Backspace,
            "delete" => Self::Delete,
            "home" => Self::Home,
            "end" => Self::End,
            "left" => Self::Left,
            "right" => Self::Right,
            "up" => Self::Up,
            "down" => Self::Down,
            "comma" => Self::Char(','),
            "period" => Self::Char('.'),
            "semicolon" => Self::Char(';'),
            "apostrophe" => Self::Char('\''),
            "minus" => Self::Char('-'),
            "equal" => Self::Char('='),
            "slash" => Self::Char('/'),
            "grave" => Self::Char('`'),
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) if ch.is_ascii_graphic() => Self::Char(ch),
                    (Some('f'), Some(_)) => {
                        let n: u8 = lower[1..]
                            .parse()
                            .map_err(|_| BindingError::Key(name.to_string()))?;
                        if (1..=12).contains(&n) {
                            Self::F(n)
                        } else {
                            return Err(BindingError::Key(name.to_string()));
                        }
                    }
                    _ => return Err(BindingError::Key(name.to_string())),
                }
            }
        };
        Ok(key)
    }

    /// Map a backend keysym to a bindable key. Printable ASCII keysyms
    /// map to their character; letters fold to lowercase.
    pub fn from_keysym(keysym: u32) -> Option<Self> {
        match keysym {
            0x20 => Some(Self::Space),
            0x21..=0x7e => {
                let ch = char::from_u32(keysym)?;
                Some(Self::Char(ch.to_ascii_lowercase()))
            }
            0xff08 => Some(Self::Backspace),
            0xff09 => Some(Self::Tab),
            0xff0d => Some(Self::Return),
            0xff1b => Some(Self::Escape),
            0xff50 => Some(Self::Home),
            0xff51 => Some(Self::Left),
            0xff52 => Some(Self::Up),
            0xff53 => Some(Self::Right),
            0xff54 => Some(Self::Down),
            0xff57 => Some(Self::End),
            0xffff => Some(Self::Delete),
            0xffbe..=0xffc9 => Some(Self::F((keysym - 0xffbe + 1) as u8)),
            _ => None,
        }
    }
}

/// Character for a keysym, for the text-entry modes.
pub fn keysym_to_char(keysym: u32) -> Option<char> {
    (0x20..=0x7e).contains(&keysym).then(|| keysym as u8 as char)
}

/// Which neighbour sequence a cycle action walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleScope {
    Sheet,
    Group,
    Layout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Everything a keybinding can do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Close,
    Exec(String),
    ExecMacro(String),

    SwitchSheet(SheetIndex),
    AlternateSheet,
    CycleSheet(Direction),
    CycleView(CycleScope, Direction),
    CycleGroup(Direction),

    Raise,
    Lower,
    RaiseGroup,
    LowerGroup,
    Hide,
    ShowAll,
    ShowInvisible,
    ShowGroup(String),

    ToggleFloating,
    MaximizeFull,
    MaximizeVertical,
    MaximizeHorizontal,
    Unmaximize,
    Reset,
    Snap(Anchor),

    ApplyLayout(String),
    ResetLayout,

    EnterMove,
    EnterResize,
    EnterGroupAssign,
    EnterSheetAssign,
    EnterMarkAssign,
    EnterMarkSelect,
    EnterLayoutSelect,
    EnterExec,
    EnterInputGrab,
    Lock,
}

impl Action {
    /// Parse an action string from the configuration. Unknown names are
    /// an error, never silently dropped.
    pub fn parse(s: &str) -> Result<Self, BindingError> {
        let s = s.trim();
        let (cmd, args) = s.split_once(' ').unwrap_or((s, ""));
        let args = args.trim();

        let action = match cmd {
            "quit" => Self::Quit,
            "close" => Self::Close,
            "exec" if !args.is_empty() => Self::Exec(args.to_string()),
            "macro" if !args.is_empty() => Self::ExecMacro(args.to_string()),

            "sheet" => match args {
                "alternate" => Self::AlternateSheet,
                "next" => Self::CycleSheet(Direction::Next),
                "prev" => Self::CycleSheet(Direction::Prev),
                _ => {
                    let index = args
                        .parse::<u8>()
                        .ok()
                        .and_then(SheetIndex::new)
                        .ok_or_else(|| BindingError::Action(s.to_string()))?;
                    Self::SwitchSheet(index)
                }
            },

            "cycle" => {
                let (scope, dir) = args
                    .split_once(' ')
                    .ok_or_else(|| BindingError::Action(s.to_string()))?;
                let dir = match dir.trim() {
                    "next" => Direction::Next,
                    "prev" => Direction::Prev,
                    _ => return Err(BindingError::Action(s.to_string())),
                };
                match scope {
                    "view" | "sheet-view" => Self::CycleView(CycleScope::Sheet, dir),
                    "group-view" => Self::CycleView(CycleScope::Group, dir),
                    "layout-view" => Self::CycleView(CycleScope::Layout, dir),
                    "group" => Self::CycleGroup(dir),
                    _ => return Err(BindingError::Action(s.to_string())),
                }
            }

            "raise" => Self::Raise,
            "lower" => Self::Lower,
            "group" => match args {
                "raise" => Self::RaiseGroup,
                "lower" => Self::LowerGroup,
                _ => return Err(BindingError::Action(s.to_string())),
            },
            "hide" => Self::Hide,
            "show" => match args {
                "all" | "" => Self::ShowAll,
                "invisible" => Self::ShowInvisible,
                _ => match args.strip_prefix("group ").map(str::trim) {
                    Some(name) if !name.is_empty() => Self::ShowGroup(name.to_string()),
                    _ => return Err(BindingError::Action(s.to_string())),
                },
            },

            "floating" => Self::ToggleFloating,
            "maximize" => match args {
                "full" | "" => Self::MaximizeFull,
                "vertical" => Self::MaximizeVertical,
                "horizontal" => Self::MaximizeHorizontal,
                _ => return Err(BindingError::Action(s.to_string())),
            },
            "unmaximize" => Self::Unmaximize,
            "reset" => Self::Reset,
            "snap" => {
                let anchor = match args {
                    "top-left" => Anchor::TopLeft,
                    "top" => Anchor::Top,
                    "top-right" => Anchor::TopRight,
                    "left" => Anchor::Left,
                    "center" => Anchor::Center,
                    "right" => Anchor::Right,
                    "bottom-left" => Anchor::BottomLeft,
                    "bottom" => Anchor::Bottom,
                    "bottom-right" => Anchor::BottomRight,
                    _ => return Err(BindingError::Action(s.to_string())),
                };
                Self::Snap(anchor)
            }

            "layout" => match args {
                "reset" => Self::ResetLayout,
                "" => return Err(BindingError::Action(s.to_string())),
                name => Self::ApplyLayout(name.to_string()),
            },

            "mode" => match args {
                "move" => Self::EnterMove,
                "resize" => Self::EnterResize,
                "group-assign" => Self::EnterGroupAssign,
                "sheet-assign" => Self::EnterSheetAssign,
                "mark-assign" => Self::EnterMarkAssign,
                "mark-select" => Self::EnterMarkSelect,
                "layout-select" => Self::EnterLayoutSelect,
                "exec" => Self::EnterExec,
                "input-grab" => Self::EnterInputGrab,
                _ => return Err(BindingError::Action(s.to_string())),
            },
            "lock" => Self::Lock,

            _ => return Err(BindingError::Action(s.to_string())),
        };
        Ok(action)
    }
}

/// A parsed modifier+key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl KeyBinding {
    /// Parse a binding string like "super+shift+return". The final
    /// segment is the key; everything before it must be a modifier.
    pub fn parse(s: &str) -> Result<Self, BindingError> {
        let mut modifiers = Modifiers::empty();
        let mut parts = s.split('+').map(str::trim).peekable();
        let mut key = None;

        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                key = Some(Key::from_name(part)?);
            } else {
                modifiers |= Modifiers::parse_one(&part.to_lowercase())?;
            }
        }

        match key {
            Some(key) => Ok(Self { modifiers, key }),
            None => Err(BindingError::Binding(s.to_string())),
        }
    }
}

/// The keybinding table, looked up by (binding-masked modifiers, key).
#[derive(Debug, Default)]
pub struct Bindings {
    table: HashMap<KeyBinding, Action>,
}

impl Bindings {
    /// Build the table from (binding string, action string) pairs.
    /// The first error aborts the whole load.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, BindingError> {
        let mut table = HashMap::new();
        for (keys, action) in entries {
            let binding = KeyBinding::parse(keys)?;
            table.insert(binding, Action::parse(action)?);
        }
        Ok(Self { table })
    }

    /// Every bound action, for load-time cross-checks.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.table.values()
    }

    pub fn lookup(&self, modifiers: Modifiers, key: Key) -> Option<&Action> {
        self.table.get(&KeyBinding {
            modifiers: modifiers.binding_mask(),
            key,
        })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
