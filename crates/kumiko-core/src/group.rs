//! Groups: named, cross-sheet collections of views.
//!
//! A group tracks two member lists: every member, and the visible subset
//! (members that are shown and not hidden). Groups are created on first
//! member and destroyed with their last; the registry also keeps the
//! global ordering of groups with at least one visible member, which is
//! what group cycling walks.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::backend::OutputId;
use crate::view::{View, ViewId};

/// One named collection.
#[derive(Debug, Default)]
pub struct Group {
    views: Vec<ViewId>,
    visible: Vec<ViewId>,
}

impl Group {
    pub fn views(&self) -> &[ViewId] {
        &self.views
    }

    /// Visible members in raise order (tail was raised last).
    pub fn visible(&self) -> &[ViewId] {
        &self.visible
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn has_visible(&self) -> bool {
        !self.visible.is_empty()
    }

    pub fn contains(&self, view: ViewId) -> bool {
        self.views.contains(&view)
    }

    /// First visible member on `output`, in member order.
    pub fn first_view(
        &self,
        output: OutputId,
        views: &HashMap<ViewId, View>,
    ) -> Option<ViewId> {
        self.visible
            .iter()
            .copied()
            .find(|id| views.get(id).is_some_and(|v| v.output == output))
    }

    /// Last visible member on `output`, in member order.
    pub fn last_view(
        &self,
        output: OutputId,
        views: &HashMap<ViewId, View>,
    ) -> Option<ViewId> {
        self.visible
            .iter()
            .copied()
            .rev()
            .find(|id| views.get(id).is_some_and(|v| v.output == output))
    }

    /// Next visible member after `view`, wrapping.
    pub fn next_view(&self, view: ViewId) -> Option<ViewId> {
        let pos = self.visible.iter().position(|&v| v == view)?;
        let next = (pos + 1) % self.visible.len();
        Some(self.visible[next])
    }

    /// Previous visible member before `view`, wrapping.
    pub fn prev_view(&self, view: ViewId) -> Option<ViewId> {
        let pos = self.visible.iter().position(|&v| v == view)?;
        let prev = (pos + self.visible.len() - 1) % self.visible.len();
        Some(self.visible[prev])
    }

    fn add(&mut self, view: ViewId, visible: bool) {
        if !self.views.contains(&view) {
            self.views.push(view);
        }
        if visible && !self.visible.contains(&view) {
            self.visible.push(view);
        }
    }

    fn remove(&mut self, view: ViewId) {
        self.views.retain(|&v| v != view);
        self.visible.retain(|&v| v != view);
    }

    fn set_visible(&mut self, view: ViewId, visible: bool) {
        self.visible.retain(|&v| v != view);
        if visible {
            self.visible.push(view);
        }
    }
}

/// All live groups plus the global visible-group ordering.
///
/// Iteration order of `groups` is creation order; `visible_order` holds
/// only groups with a visible member and is the cycling sequence.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: IndexMap<String, Group>,
    visible_order: Vec<String>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Groups with at least one visible member, in cycling order.
    pub fn visible_order(&self) -> &[String] {
        &self.visible_order
    }

    /// Add `view` to `name`, creating the group on first member.
    pub fn add_view(&mut self, name: &str, view: ViewId, visible: bool) {
        let group = match self.groups.get_mut(name) {
            Some(group) => group,
            None => {
                debug!(group = name, "group created");
                self.groups.entry(name.to_owned()).or_default()
            }
        };
        group.add(view, visible);
        self.refresh_visibility(name);
    }

    /// Remove `view` from `name`. A group with no members left is
    /// destroyed immediately.
    pub fn remove_view(&mut self, name: &str, view: ViewId) {
        let Some(group) = self.groups.get_mut(name) else {
            return;
        };
        group.remove(view);
        if group.is_empty() {
            self.groups.shift_remove(name);
            debug!(group = name, "group destroyed");
        }
        self.refresh_visibility(name);
    }

    /// Move `view` between groups; destroys the old group if emptied.
    pub fn reassign(&mut self, view: ViewId, from: &str, to: &str, visible: bool) {
        if from == to {
            return;
        }
        self.remove_view(from, view);
        self.add_view(to, view, visible);
    }

    /// Record a visibility flip for `view` within its group.
    pub fn set_view_visible(&mut self, name: &str, view: ViewId, visible: bool) {
        if let Some(group) = self.groups.get_mut(name) {
            group.set_visible(view, visible);
        }
        self.refresh_visibility(name);
    }

    /// Next group after `name` in the visible ordering, wrapping.
    pub fn next_visible(&self, name: &str) -> Option<&str> {
        let pos = self.visible_order.iter().position(|g| g == name)?;
        let next = (pos + 1) % self.visible_order.len();
        Some(&self.visible_order[next])
    }

    /// Previous group before `name` in the visible ordering, wrapping.
    pub fn prev_visible(&self, name: &str) -> Option<&str> {
        let pos = self.visible_order.iter().position(|g| g == name)?;
        let prev = (pos + self.visible_order.len() - 1) % self.visible_order.len();
        Some(&self.visible_order[prev])
    }

    fn refresh_visibility(&mut self, name: &str) {
        let has_visible = self.groups.get(name).is_some_and(Group::has_visible);
        let listed = self.visible_order.iter().any(|g| g == name);
        if has_visible && !listed {
            self.visible_order.push(name.to_owned());
        } else if !has_visible && listed {
            self.visible_order.retain(|g| g != name);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn group_destroyed_with_last_member() {
        let mut registry = GroupRegistry::new();
        registry.add_view("editors", ViewId(1), true);
        registry.add_view("editors", ViewId(2), true);
        assert!(registry.get("editors").is_some());

        registry.remove_view("editors", ViewId(1));
        assert!(registry.get("editors").is_some());
        registry.remove_view("editors", ViewId(2));
        assert!(registry.get("editors").is_none());
        assert!(registry.visible_order().is_empty());
    }

    #[test]
    fn hidden_members_leave_visible_subset() {
        let mut registry = GroupRegistry::new();
        registry.add_view("term", ViewId(1), true);
        registry.set_view_visible("term", ViewId(1), false);

        let group = registry.get("term").unwrap();
        assert_eq!(group.views(), &[ViewId(1)]);
        assert!(group.visible().is_empty());
        // Group remains alive, but leaves the cycling order.
        assert!(registry.visible_order().is_empty());

        registry.set_view_visible("term", ViewId(1), true);
        assert_eq!(registry.visible_order(), &["term".to_owned()]);
    }

    #[test]
    fn visible_order_follows_first_visible_member() {
        let mut registry = GroupRegistry::new();
        registry.add_view("a", ViewId(1), false);
        registry.add_view("b", ViewId(2), true);
        registry.add_view("a", ViewId(3), true);
        assert_eq!(
            registry.visible_order(),
            &["b".to_owned(), "a".to_owned()]
        );

        assert_eq!(registry.next_visible("a"), Some("b"));
        assert_eq!(registry.prev_visible("b"), Some("a"));
    }

    #[test]
    fn cycling_within_group_wraps() {
        let mut registry = GroupRegistry::new();
        for id in 1..=3u64 {
            registry.add_view("g", ViewId(id), true);
        }
        let group = registry.get("g").unwrap();
        assert_eq!(group.next_view(ViewId(3)), Some(ViewId(1)));
        assert_eq!(group.prev_view(ViewId(1)), Some(ViewId(3)));
    }

    #[test]
    fn reassign_moves_between_groups() {
        let mut registry = GroupRegistry::new();
        registry.add_view("old", ViewId(1), true);
        registry.reassign(ViewId(1), "old", "new", true);
        assert!(registry.get("old").is_none());
        assert!(registry.get("new").unwrap().contains(ViewId(1)));
    }
}
