/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Single-threaded deferred-task queue.
//!
//! Tasks are identified by key; scheduling an existing key moves its deadline
//! (trailing-edge debounce). The host drives the queue by passing the current
//! `Instant` into [`DeferredQueue::take_due`].

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::workspace::WorkspaceId;

/// Work the canvas app defers to a later tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredTask {
    SaveNodes(WorkspaceId),
    SaveTransform(WorkspaceId),
    SaveBackground(WorkspaceId),
    SaveTitle(WorkspaceId),
    /// Second phase of a workspace switch.
    Hydrate(WorkspaceId),
}

impl DeferredTask {
    pub fn workspace(&self) -> WorkspaceId {
        match self {
            DeferredTask::SaveNodes(id)
            | DeferredTask::SaveTransform(id)
            | DeferredTask::SaveBackground(id)
            | DeferredTask::SaveTitle(id)
            | DeferredTask::Hydrate(id) => *id,
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, DeferredTask::Hydrate(_))
    }
}

#[derive(Debug, Clone)]
pub struct DeferredQueue<K> {
    entries: HashMap<K, (Instant, u64)>,
    sequence: u64,
}

impl<K> Default for DeferredQueue<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            sequence: 0,
        }
    }
}

impl<K> DeferredQueue<K>
where
    K: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `key` at `now + delay`, replacing any earlier deadline for it.
    pub fn schedule(&mut self, key: K, now: Instant, delay: Duration) {
        self.sequence = self.sequence.wrapping_add(1);
        self.entries.insert(key, (now + delay, self.sequence));
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Cancel every task matching `predicate`.
    pub fn cancel_where<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&K) -> bool,
    {
        self.entries.retain(|key, _| !predicate(key));
    }

    pub fn is_scheduled(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Earliest pending deadline.
    pub fn next_due(&self) -> Option<Instant> {
        self.entries.values().map(|(due, _)| *due).min()
    }

    /// Remove and return every task due at `now`, earliest first. Ties keep
    /// scheduling order.
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(K, Instant, u64)> = self
            .entries
            .iter()
            .filter(|(_, (deadline, _))| *deadline <= now)
            .map(|(key, (deadline, sequence))| (*key, *deadline, *sequence))
            .collect();
        due.sort_by_key(|(_, deadline, sequence)| (*deadline, *sequence));
        for (key, _, _) in &due {
            self.entries.remove(key);
        }
        due.into_iter().map(|(key, _, _)| key).collect()
    }

    /// Remove and return every task matching `predicate`, regardless of
    /// deadline.
    pub fn drain_where<F>(&mut self, mut predicate: F) -> Vec<K>
    where
        F: FnMut(&K) -> bool,
    {
        let mut drained: Vec<(K, Instant, u64)> = self
            .entries
            .iter()
            .filter(|(key, _)| predicate(key))
            .map(|(key, (deadline, sequence))| (*key, *deadline, *sequence))
            .collect();
        drained.sort_by_key(|(_, deadline, sequence)| (*deadline, *sequence));
        for (key, _, _) in &drained {
            self.entries.remove(key);
        }
        drained.into_iter().map(|(key, _, _)| key).collect()
    }

    pub fn drain_all(&mut self) -> Vec<K> {
        self.drain_where(|_| true)
    }
}
