/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Recency-ordered node stack.
//!
//! Head is the most recently selected node and renders on top. The same
//! ordering drives keyboard cycling: `cycle` moves a preview cursor and only
//! `commit_cycle` reorders the stack.

use std::collections::{HashMap, HashSet};

use log::debug;

use super::NodeId;

#[derive(Debug, Clone, Default)]
pub struct ZOrderStack {
    order: Vec<NodeId>,
    index_lookup: HashMap<NodeId, usize>,
    cycle_cursor: usize,
    cycling: bool,
}

impl ZOrderStack {
    pub const Z_INDEX_BASE: i32 = 50;
    pub const Z_INDEX_STEP: i32 = 10;

    pub fn new() -> Self {
        Self::default()
    }

    /// Z-index for a raw rank, where rank `len` is the head.
    pub fn make_z_index(rank: usize) -> i32 {
        let rank = i32::try_from(rank).unwrap_or(i32::MAX / Self::Z_INDEX_STEP);
        Self::Z_INDEX_BASE.saturating_add(Self::Z_INDEX_STEP.saturating_mul(rank))
    }

    fn reindex(&mut self) {
        self.index_lookup.clear();
        for (index, id) in self.order.iter().enumerate() {
            self.index_lookup.insert(*id, index);
        }
    }

    /// Move `id` to the head, inserting it if absent. Returns whether the
    /// order changed.
    pub fn promote(&mut self, id: NodeId) -> bool {
        if self.order.first() == Some(&id) {
            return false;
        }
        if let Some(index) = self.index_lookup.get(&id).copied() {
            self.order.remove(index);
        }
        self.order.insert(0, id);
        self.reindex();
        true
    }

    /// Append a new node at the bottom of the stack.
    pub fn push(&mut self, id: NodeId) -> bool {
        if self.index_lookup.contains_key(&id) {
            debug!("Node {id} already stacked");
            return false;
        }
        self.index_lookup.insert(id, self.order.len());
        self.order.push(id);
        true
    }

    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(index) = self.index_lookup.get(&id).copied() else {
            return false;
        };
        self.order.remove(index);
        self.reindex();

        if self.cycling {
            if self.order.len() < 2 {
                self.cancel_cycle();
            } else if index < self.cycle_cursor {
                // Keep previewing the same node.
                self.cycle_cursor -= 1;
            } else if self.cycle_cursor >= self.order.len() {
                self.cycle_cursor = 0;
            }
        }
        true
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.index_lookup.clear();
        self.cancel_cycle();
    }

    /// Advance the preview cursor by `delta`, wrapping in both directions.
    ///
    /// Returns the previewed node, or `None` when there is nothing to cycle
    /// through.
    pub fn cycle(&mut self, delta: isize) -> Option<NodeId> {
        let len = self.order.len();
        if len < 2 {
            return None;
        }
        let len_signed = isize::try_from(len).ok()?;
        let cursor = isize::try_from(self.cycle_cursor).ok()?;
        let next = (cursor + delta.rem_euclid(len_signed)).rem_euclid(len_signed);
        self.cycle_cursor = usize::try_from(next).ok()?;
        self.cycling = true;
        self.order.get(self.cycle_cursor).copied()
    }

    /// Promote the previewed node and reset the cursor.
    pub fn commit_cycle(&mut self) -> Option<NodeId> {
        if !self.cycling {
            return None;
        }
        let target = self.order.get(self.cycle_cursor).copied();
        self.cancel_cycle();
        let id = target?;
        self.promote(id);
        Some(id)
    }

    /// Drop the preview without touching the order.
    pub fn cancel_cycle(&mut self) {
        self.cycle_cursor = 0;
        self.cycling = false;
    }

    pub fn is_cycling(&self) -> bool {
        self.cycling
    }

    pub fn cycle_cursor(&self) -> usize {
        self.cycle_cursor
    }

    /// Node under the cycle cursor while cycling.
    pub fn preview(&self) -> Option<NodeId> {
        if self.cycling {
            self.order.get(self.cycle_cursor).copied()
        } else {
            None
        }
    }

    pub fn head(&self) -> Option<NodeId> {
        self.order.first().copied()
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.index_lookup.get(&id).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index_lookup.contains_key(&id)
    }

    pub fn z_index(&self, id: NodeId) -> Option<i32> {
        let index = self.index_of(id)?;
        Some(Self::make_z_index(self.order.len() - index))
    }

    /// `(id, z_index)` pairs from head to tail.
    pub fn z_indices(&self) -> Vec<(NodeId, i32)> {
        let len = self.order.len();
        self.order
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, Self::make_z_index(len - index)))
            .collect()
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Make the stack hold exactly `ids`: dangling entries are dropped, missing
    /// ones appended in the given order. Returns whether anything was repaired.
    pub fn reconcile<I>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = NodeId>,
    {
        let ids: Vec<NodeId> = ids.into_iter().collect();
        let wanted: HashSet<NodeId> = ids.iter().copied().collect();

        let mut seen = HashSet::new();
        let before = self.order.len();
        self.order
            .retain(|id| wanted.contains(id) && seen.insert(*id));
        let mut changed = self.order.len() != before;

        for id in ids {
            if seen.insert(id) {
                self.order.push(id);
                changed = true;
            }
        }
        if changed {
            self.reindex();
            if self.cycle_cursor >= self.order.len() || self.order.len() < 2 {
                self.cancel_cycle();
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn stack_of(n: usize) -> (ZOrderStack, Vec<NodeId>) {
        let mut stack = ZOrderStack::new();
        let ids: Vec<NodeId> = (0..n).map(|_| NodeId::new()).collect();
        for id in &ids {
            stack.push(*id);
        }
        (stack, ids)
    }

    fn assert_consistent(stack: &ZOrderStack) {
        assert_eq!(stack.index_lookup.len(), stack.order.len());
        for (index, id) in stack.order.iter().enumerate() {
            assert_eq!(stack.index_of(*id), Some(index));
        }
        let z: Vec<i32> = stack.z_indices().into_iter().map(|(_, z)| z).collect();
        assert!(z.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn test_push_appends_to_tail() {
        let (stack, ids) = stack_of(3);
        assert_eq!(stack.ids(), ids.as_slice());
        assert_eq!(stack.head(), Some(ids[0]));
        assert_consistent(&stack);
    }

    #[test]
    fn test_push_rejects_duplicates() {
        let (mut stack, ids) = stack_of(2);
        assert!(!stack.push(ids[0]));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_promote_moves_to_head() {
        let (mut stack, ids) = stack_of(3);
        assert!(stack.promote(ids[2]));
        assert_eq!(stack.ids(), &[ids[2], ids[0], ids[1]]);
        assert_eq!(stack.index_of(ids[2]), Some(0));
        assert_consistent(&stack);
    }

    #[test]
    fn test_promote_head_is_idempotent() {
        let (mut stack, ids) = stack_of(3);
        stack.promote(ids[1]);
        let before = stack.ids().to_vec();
        assert!(!stack.promote(ids[1]));
        assert_eq!(stack.ids(), before.as_slice());
    }

    #[test]
    fn test_z_index_formula() {
        let (stack, ids) = stack_of(3);
        assert_eq!(stack.z_index(ids[0]), Some(80));
        assert_eq!(stack.z_index(ids[1]), Some(70));
        assert_eq!(stack.z_index(ids[2]), Some(60));
        assert_eq!(stack.z_index(NodeId::new()), None);
    }

    #[test]
    fn test_remove_reindexes() {
        let (mut stack, ids) = stack_of(3);
        assert!(stack.remove(ids[1]));
        assert!(!stack.remove(ids[1]));
        assert_eq!(stack.ids(), &[ids[0], ids[2]]);
        assert_consistent(&stack);
    }

    #[test]
    fn test_cycle_wraps_forward() {
        let (mut stack, ids) = stack_of(3);
        assert_eq!(stack.cycle(1), Some(ids[1]));
        assert_eq!(stack.cycle(1), Some(ids[2]));
        assert_eq!(stack.cycle(1), Some(ids[0]));
        assert_eq!(stack.cycle_cursor(), 0);
        assert_eq!(stack.ids(), ids.as_slice());
    }

    #[rstest]
    #[case(-1, 2)]
    #[case(-2, 1)]
    #[case(-4, 2)]
    #[case(4, 1)]
    #[case(3, 0)]
    fn test_cycle_delta_wraps(#[case] delta: isize, #[case] expected: usize) {
        let (mut stack, ids) = stack_of(3);
        assert_eq!(stack.cycle(delta), Some(ids[expected]));
        assert_eq!(stack.cycle_cursor(), expected);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    fn test_cycle_on_short_stack_is_noop(#[case] len: usize) {
        let (mut stack, _) = stack_of(len);
        assert_eq!(stack.cycle(1), None);
        assert!(!stack.is_cycling());
        assert_eq!(stack.commit_cycle(), None);
    }

    #[test]
    fn test_commit_cycle_promotes_preview() {
        let (mut stack, ids) = stack_of(3);
        stack.cycle(1);
        stack.cycle(1);
        assert_eq!(stack.preview(), Some(ids[2]));
        assert_eq!(stack.commit_cycle(), Some(ids[2]));
        assert_eq!(stack.ids(), &[ids[2], ids[0], ids[1]]);
        assert_eq!(stack.cycle_cursor(), 0);
        assert!(!stack.is_cycling());
    }

    #[test]
    fn test_cancel_cycle_keeps_order() {
        let (mut stack, ids) = stack_of(3);
        stack.cycle(-1);
        stack.cancel_cycle();
        assert_eq!(stack.ids(), ids.as_slice());
        assert_eq!(stack.commit_cycle(), None);
    }

    #[test]
    fn test_remove_during_cycle_keeps_preview() {
        let (mut stack, ids) = stack_of(4);
        stack.cycle(2);
        assert_eq!(stack.preview(), Some(ids[2]));
        stack.remove(ids[0]);
        assert_eq!(stack.preview(), Some(ids[2]));
        stack.remove(ids[3]);
        assert_eq!(stack.preview(), Some(ids[2]));
        stack.remove(ids[2]);
        assert!(stack.preview().is_none());
    }

    #[test]
    fn test_reconcile_repairs_desync() {
        let (mut stack, ids) = stack_of(3);
        let extra = NodeId::new();
        let registry_ids = vec![ids[2], ids[0], extra];

        assert!(stack.reconcile(registry_ids.clone()));
        assert_eq!(stack.ids(), &[ids[0], ids[2], extra]);
        assert_consistent(&stack);
        assert!(!stack.reconcile(registry_ids));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push,
        Promote(usize),
        Remove(usize),
        Cycle(isize),
        Commit,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Push),
            (0usize..8).prop_map(Op::Promote),
            (0usize..8).prop_map(Op::Remove),
            (-3isize..4).prop_map(Op::Cycle),
            Just(Op::Commit),
        ]
    }

    proptest! {
        #[test]
        fn test_stack_stays_consistent(ops in proptest::collection::vec(op_strategy(), 0..64)) {
            let mut stack = ZOrderStack::new();
            let mut live: Vec<NodeId> = Vec::new();
            for op in ops {
                match op {
                    Op::Push => {
                        let id = NodeId::new();
                        live.push(id);
                        stack.push(id);
                    },
                    Op::Promote(i) if !live.is_empty() => {
                        stack.promote(live[i % live.len()]);
                    },
                    Op::Remove(i) if !live.is_empty() => {
                        let id = live.remove(i % live.len());
                        stack.remove(id);
                    },
                    Op::Cycle(delta) => {
                        stack.cycle(delta);
                    },
                    Op::Commit => {
                        stack.commit_cycle();
                    },
                    _ => {},
                }
                assert_consistent(&stack);
                let stacked: HashSet<NodeId> = stack.ids().iter().copied().collect();
                let expected: HashSet<NodeId> = live.iter().copied().collect();
                prop_assert_eq!(stacked, expected);
                prop_assert_eq!(stack.len(), live.len());
                if stack.is_cycling() {
                    prop_assert!(stack.cycle_cursor() < stack.len());
                }
            }
        }
    }
}
