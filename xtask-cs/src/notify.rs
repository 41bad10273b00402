// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded in-flight notification tracking, standing in for the 8-slot
//! pending-kernel-reply table.
//!
//! With the direct-payload `CsNotification` channel there's no table to
//! overflow -- the payload always reaches the kernel. What this keeps is the
//! capacity *signal*: a CS tracks how many notifications it has sent without
//! a matching `AckNotify` back yet, so a kernel that stops acknowledging (or
//! a burst that outruns it) is visible instead of silent.

use log::warn;
use xtask_abi::PKR_SLOTS;

pub struct NotifySlots {
    capacity: usize,
    in_flight: usize,
}

impl NotifySlots {
    pub fn new() -> Self {
        NotifySlots { capacity: PKR_SLOTS, in_flight: 0 }
    }

    /// Call when a `CsNotification` is about to be sent. Returns `false` if
    /// this pushed the in-flight count past capacity (still sent; this is a
    /// reporting signal, not a gate).
    pub fn reserve(&mut self) -> bool {
        self.in_flight += 1;
        if self.in_flight > self.capacity {
            warn!(
                "pending-notification slots exhausted: {} in flight, capacity {}",
                self.in_flight, self.capacity
            );
            false
        } else {
            true
        }
    }

    /// Call on `AckNotify`.
    pub fn release(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

impl Default for NotifySlots {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_exhaustion_past_capacity() {
        let mut slots = NotifySlots::new();
        for _ in 0..8 {
            assert!(slots.reserve());
        }
        assert!(!slots.reserve());
        slots.release();
        assert_eq!(slots.in_flight(), 8);
    }
}
