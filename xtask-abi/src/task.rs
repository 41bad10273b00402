// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Task identity and priority.

/// Identifies a task, unique within its kernel.
///
/// Unlike Hubris's `TaskId`, xTask tasks are never restarted in place -- a
/// task is destroyed by `exit` and that's the end of it -- so there is
/// no generation number to pack alongside the index -- a plain `u32` is
/// enough to name a task for the lifetime of the system.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TaskId(pub u32);

impl TaskId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for TaskId {
    fn from(v: u32) -> Self {
        TaskId(v)
    }
}

/// Task priority, 0 (most important) through 7. Priority 7 is reserved for
/// the per-core idle task.
///
/// This deliberately does not implement `PartialOrd`/`Ord` on the numeric
/// value directly, to avoid ever being tempted to compare priorities with
/// `<`/`>` and getting "more important" backwards. Use
/// `is_more_important_than`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct Priority(pub u8);

impl Priority {
    pub const IDLE: Priority = Priority(crate::IDLE_PRIORITY);

    /// Number of distinct priority levels (and thus ready queues) a kernel
    /// maintains.
    pub const LEVELS: usize = crate::IDLE_PRIORITY as usize + 1;

    pub fn is_more_important_than(self, other: Self) -> bool {
        self.0 < other.0
    }

    pub fn is_valid(self) -> bool {
        (self.0 as usize) < Self::LEVELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_is_inverted() {
        assert!(Priority(0).is_more_important_than(Priority(1)));
        assert!(!Priority(1).is_more_important_than(Priority(0)));
        assert!(!Priority(3).is_more_important_than(Priority(3)));
    }

    #[test]
    fn idle_priority_is_last_level() {
        assert!(Priority::IDLE.is_valid());
        assert!(!Priority(8).is_valid());
    }
}
