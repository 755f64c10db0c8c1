//! Mark registry.
//!
//! Twenty-six fixed global slots, `a` through `z`, each bound to at most
//! one view. The view keeps a back-reference; the 1:1 invariant is
//! enforced by the binding path in [`State`](crate::state::State), not by
//! a type constraint.

use serde::{Deserialize, Serialize};

use crate::view::ViewId;

pub const MARK_COUNT: usize = 26;

/// One of the 26 mark slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct MarkId(u8);

impl MarkId {
    /// Slot for an ASCII letter, case-insensitive.
    pub fn from_char(ch: char) -> Option<Self> {
        let lower = ch.to_ascii_lowercase();
        lower.is_ascii_lowercase().then(|| Self(lower as u8 - b'a'))
    }

    pub const fn as_char(self) -> char {
        (b'a' + self.0) as char
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for MarkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl TryFrom<char> for MarkId {
    type Error = String;

    fn try_from(ch: char) -> Result<Self, Self::Error> {
        Self::from_char(ch).ok_or_else(|| format!("invalid mark character: {ch:?}"))
    }
}

impl From<MarkId> for char {
    fn from(mark: MarkId) -> Self {
        mark.as_char()
    }
}

/// The fixed global slot table.
#[derive(Debug, Default)]
pub struct MarkRegistry {
    slots: [Option<ViewId>; MARK_COUNT],
}

impl MarkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self, mark: MarkId) -> Option<ViewId> {
        self.slots[mark.index()]
    }

    /// Bind `mark` to `view`, returning the view previously in the slot
    /// (whose back-reference the caller must clear).
    pub fn bind(&mut self, mark: MarkId, view: ViewId) -> Option<ViewId> {
        self.slots[mark.index()].replace(view)
    }

    /// Empty a slot, returning the view that was bound to it.
    pub fn clear(&mut self, mark: MarkId) -> Option<ViewId> {
        self.slots[mark.index()].take()
    }

    /// Remove any binding for `view`. Used on unmap.
    pub fn clear_view(&mut self, view: ViewId) {
        for slot in &mut self.slots {
            if *slot == Some(view) {
                *slot = None;
            }
        }
    }

    /// All currently bound (mark, view) pairs in slot order.
    pub fn bound(&self) -> impl Iterator<Item = (MarkId, ViewId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|view| (MarkId(i as u8), view)))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn mark(ch: char) -> MarkId {
        MarkId::from_char(ch).unwrap()
    }

    #[test]
    fn from_char_accepts_letters_only() {
        assert_eq!(MarkId::from_char('a'), Some(MarkId(0)));
        assert_eq!(MarkId::from_char('Z'), Some(MarkId(25)));
        assert_eq!(MarkId::from_char('1'), None);
        assert_eq!(MarkId::from_char(' '), None);
    }

    #[test]
    fn bind_returns_displaced_view() {
        let mut registry = MarkRegistry::new();
        assert_eq!(registry.bind(mark('a'), ViewId(1)), None);
        assert_eq!(registry.bind(mark('a'), ViewId(2)), Some(ViewId(1)));
        assert_eq!(registry.view(mark('a')), Some(ViewId(2)));
    }

    #[test]
    fn clear_view_drops_all_bindings() {
        let mut registry = MarkRegistry::new();
        registry.bind(mark('a'), ViewId(1));
        registry.bind(mark('b'), ViewId(2));
        registry.clear_view(ViewId(1));
        assert_eq!(registry.view(mark('a')), None);
        assert_eq!(registry.view(mark('b')), Some(ViewId(2)));
    }

    #[test]
    fn bound_iterates_in_slot_order() {
        let mut registry = MarkRegistry::new();
        registry.bind(mark('z'), ViewId(3));
        registry.bind(mark('a'), ViewId(1));
        let bound: Vec<_> = registry.bound().collect();
        assert_eq!(bound, vec![(mark('a'), ViewId(1)), (mark('z'), ViewId(3))]);
    }
}
