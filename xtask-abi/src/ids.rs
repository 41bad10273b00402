// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Small newtype handles passed across the kernel/CS/userlib boundary.

/// Handle to a virtual channel, as returned by `create_thread` /
/// `create_remote_thread` and used by every later `vc_*` call.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct VcHandle(pub u32);

/// A mailbox id, unique system-wide.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct MailboxId(pub u32);

impl From<u32> for MailboxId {
    fn from(v: u32) -> Self {
        MailboxId(v)
    }
}

/// Which of a virtual channel's two half-buffers a value refers to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum BufferIndex {
    Zero = 0,
    One = 1,
}

impl BufferIndex {
    pub fn other(self) -> Self {
        match self {
            BufferIndex::Zero => BufferIndex::One,
            BufferIndex::One => BufferIndex::Zero,
        }
    }

    pub fn as_usize(self) -> usize {
        self as u8 as usize
    }
}
