// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel time. xTask measures time in an arbitrary tick unit
//! driven by the kernel's timer; there are no wall-clock semantics anywhere
//! in the kernel.

/// In-kernel timestamp, measured in ticks since kernel start.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Default)]
#[repr(transparent)]
pub struct Tick(pub u64);

impl Tick {
    pub fn plus(self, n: u64) -> Self {
        Tick(self.0.wrapping_add(n))
    }
}

impl From<u64> for Tick {
    fn from(v: u64) -> Self {
        Tick(v)
    }
}

impl From<Tick> for u64 {
    fn from(v: Tick) -> Self {
        v.0
    }
}
