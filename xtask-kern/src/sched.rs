// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The scheduler's bookkeeping collections: priority ready queues, the delay
//! list, and the block list.
//!
//! Tasks are named here by their slot index (`TaskId::index()`), not by the
//! `Task` value itself -- `Kernel` owns the one `Vec<Task>` and these
//! collections just say which slots are waiting where.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use xtask_abi::Priority;

use crate::task::BlockKey;
use crate::time::Tick;

/// Ready queues, delay list and block list for one kernel.
#[derive(Default)]
pub struct Scheduler {
    ready: [VecDeque<usize>; Priority::LEVELS],
    /// Min-heap on expiry tick. The source design suggests a sorted
    /// pointer-linked list for this; a binary heap gets the same "next
    /// expiry first" behavior without the list-splicing code.
    delayed: BinaryHeap<Reverse<(Tick, usize)>>,
    /// Unordered -- matched by scanning, not by queue position.
    blocked: Vec<(usize, BlockKey)>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            ready: Default::default(),
            delayed: BinaryHeap::new(),
            blocked: Vec::new(),
        }
    }

    pub fn push_ready(&mut self, priority: Priority, slot: usize) {
        self.ready[priority.0 as usize].push_back(slot);
    }

    /// Removes and returns the slot at the front of the highest-priority
    /// nonempty ready queue.
    pub fn pop_ready(&mut self) -> Option<usize> {
        self.ready.iter_mut().find_map(|q| q.pop_front())
    }

    pub fn push_delayed(&mut self, expiry: Tick, slot: usize) {
        self.delayed.push(Reverse((expiry, slot)));
    }

    /// Removes and returns every slot whose expiry has passed as of `now`.
    pub fn drain_expired(&mut self, now: Tick) -> Vec<usize> {
        let mut woken = Vec::new();
        while let Some(&Reverse((expiry, _))) = self.delayed.peek() {
            if expiry > now {
                break;
            }
            let Reverse((_, slot)) = self.delayed.pop().unwrap();
            woken.push(slot);
        }
        woken
    }

    pub fn push_blocked(&mut self, slot: usize, key: BlockKey) {
        self.blocked.push((slot, key));
    }

    /// Removes and returns the first blocked slot for which `predicate(slot,
    /// key)` holds. Taking both the slot and its key lets the caller
    /// disambiguate block reasons that don't carry enough information in the
    /// key alone (e.g. two tasks both blocked on `ThreadCreation`).
    pub fn take_blocked(&mut self, mut predicate: impl FnMut(usize, BlockKey) -> bool) -> Option<usize> {
        let pos = self.blocked.iter().position(|(slot, k)| predicate(*slot, *k))?;
        Some(self.blocked.remove(pos).0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtask_abi::VcHandle;

    #[test]
    fn ready_queue_is_priority_ordered() {
        let mut s = Scheduler::new();
        s.push_ready(Priority(3), 30);
        s.push_ready(Priority(1), 10);
        s.push_ready(Priority(1), 11);
        assert_eq!(s.pop_ready(), Some(10));
        assert_eq!(s.pop_ready(), Some(11));
        assert_eq!(s.pop_ready(), Some(30));
        assert_eq!(s.pop_ready(), None);
    }

    #[test]
    fn delay_list_wakes_earliest_first() {
        let mut s = Scheduler::new();
        s.push_delayed(Tick(30), 3);
        s.push_delayed(Tick(10), 1);
        s.push_delayed(Tick(20), 2);
        assert_eq!(s.drain_expired(Tick(15)), vec![1]);
        assert_eq!(s.drain_expired(Tick(30)), vec![2, 3]);
        assert!(s.drain_expired(Tick(100)).is_empty());
    }

    #[test]
    fn block_list_matches_by_key() {
        let mut s = Scheduler::new();
        s.push_blocked(5, BlockKey::VcBuffer(VcHandle(1)));
        s.push_blocked(6, BlockKey::InboxDelivery);
        assert_eq!(
            s.take_blocked(|_, k| k == BlockKey::VcBuffer(VcHandle(1))),
            Some(5)
        );
        assert_eq!(s.take_blocked(|_, k| k == BlockKey::InboxDelivery), Some(6));
        assert_eq!(s.take_blocked(|_, k| k == BlockKey::ThreadCreation), None);
    }
}
