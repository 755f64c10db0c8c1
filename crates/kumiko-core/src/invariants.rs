//! Invariant validation for the core state.
//!
//! Called after every dispatched event in debug builds.

use crate::state::State;
use crate::view::ViewId;

/// Error indicating which invariant was violated.
#[derive(Debug, thiserror::Error)]
pub enum InvariantError {
    #[error("focused view {0} does not exist")]
    FocusMissing(ViewId),

    #[error("focused view {0} is hidden")]
    FocusHidden(ViewId),

    #[error("view {0} is in {1} sheet lists, expected exactly one")]
    SheetMembership(ViewId, usize),

    #[error("view {0} records sheet {1} but sits on sheet {2}")]
    SheetMismatch(ViewId, u8, u8),

    #[error("view {0} is missing from its group {1:?}")]
    GroupMembership(ViewId, String),

    #[error("mark {0} points to missing view {1}")]
    MarkDangling(char, ViewId),

    #[error("mark {0} and view {1} disagree on the binding")]
    MarkBackreference(char, ViewId),

    #[error("hidden view {0} appears in group {1:?}'s visible list")]
    HiddenButVisible(ViewId, String),
}

/// Validate all core invariants. Returns the first violation found.
pub fn validate(state: &State) -> Result<(), InvariantError> {
    // Focus must point at an existing, non-hidden view.
    for output in state.outputs.values() {
        if let Some(id) = output.workspace.focus {
            let Some(view) = state.views.get(&id) else {
                return Err(InvariantError::FocusMissing(id));
            };
            if view.is_hidden() {
                return Err(InvariantError::FocusHidden(id));
            }
        }
    }

    // Each view sits on exactly one sheet, matching its own record,
    // and appears in its group's member list.
    for (&id, view) in &state.views {
        let mut memberships = 0;
        for output in state.outputs.values() {
            if let Some(sheet) = output.workspace.sheet_of(id) {
                memberships += 1;
                if output.id == view.output && sheet != view.sheet {
                    return Err(InvariantError::SheetMismatch(
                        id,
                        view.sheet.get(),
                        sheet.get(),
                    ));
                }
            }
        }
        if !state.outputs.is_empty() && memberships != 1 {
            return Err(InvariantError::SheetMembership(id, memberships));
        }

        match state.groups.get(&view.group) {
            Some(group) if group.contains(id) => {}
            _ => return Err(InvariantError::GroupMembership(id, view.group.clone())),
        }
    }

    // Marks and views agree, both directions.
    for (mark, id) in state.marks.bound() {
        match state.views.get(&id) {
            None => return Err(InvariantError::MarkDangling(mark.as_char(), id)),
            Some(view) if view.mark != Some(mark) => {
                return Err(InvariantError::MarkBackreference(mark.as_char(), id));
            }
            Some(_) => {}
        }
    }

    // Hidden views never show up in a visible subset.
    for name in state.groups.names() {
        if let Some(group) = state.groups.get(name) {
            for &id in group.visible() {
                if state.views.get(&id).is_some_and(|v| v.is_hidden()) {
                    return Err(InvariantError::HiddenButVisible(id, name.to_string()));
                }
            }
        }
    }

    Ok(())
}
