/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use super::NodeId;

/// Canonical node-selection state: unselected, or exactly one node.
///
/// Stack promotion and camera centering are driven from the app reducer;
/// this type only tracks which node is selected and a revision counter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    selected: Option<NodeId>,
    revision: u64,
}

/// A selection transition, old and new value reported together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChange {
    pub previous: Option<NodeId>,
    pub current: Option<NodeId>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic revision incremented whenever the selection changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selected == Some(id)
    }

    pub fn select(&mut self, id: NodeId) -> Option<SelectionChange> {
        self.set(Some(id))
    }

    pub fn clear(&mut self) -> Option<SelectionChange> {
        self.set(None)
    }

    /// Clear the selection if it points at `id`.
    pub fn forget(&mut self, id: NodeId) -> Option<SelectionChange> {
        if self.is_selected(id) { self.clear() } else { None }
    }

    fn set(&mut self, next: Option<NodeId>) -> Option<SelectionChange> {
        if self.selected == next {
            return None;
        }
        let previous = std::mem::replace(&mut self.selected, next);
        self.revision = self.revision.saturating_add(1);
        Some(SelectionChange {
            previous,
            current: next,
        })
    }
}
