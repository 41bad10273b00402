// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pending ring requests: one per outstanding ring transaction this CS
//! originated, waiting for its own frame to complete the loop.
//!
//! Ring replies for a given originator arrive back in the order they were
//! sent, so a plain FIFO queue is enough to match a returning frame to the
//! request that caused it -- no explicit request id is carried on the wire.

use std::collections::VecDeque;

use xtask_abi::{MailboxId, TaskId, WorkerEntry};

/// What a pending ring request is waiting to complete.
pub enum PrrPayload {
    /// A type-2 create-remote-worker request. The worker closure travels no
    /// further than this entry -- the ring round-trip only negotiates
    /// placement, since no protocol exists for proxying a remote tile's VC
    /// traffic back through a different kernel's fixed local CS pairing, so
    /// the originating CS is the one that actually spawns it once its own
    /// frame returns.
    RemoteThread {
        requester: TaskId,
        worker: WorkerEntry,
        obj_size: u32,
        rx_size: u32,
        tx_size: u32,
    },
    /// A type-3 deliver-outbox request.
    Outbox {
        sender: TaskId,
        sender_mailbox: MailboxId,
        recipient: MailboxId,
        bytes: Vec<u8>,
    },
}

/// The FIFO of this CS's outstanding ring transactions.
#[derive(Default)]
pub struct PrrList {
    entries: VecDeque<PrrPayload>,
}

impl PrrList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, payload: PrrPayload) {
        self.entries.push_back(payload);
    }

    /// Matches the next returning own-frame to the oldest outstanding
    /// request -- the head PRR always corresponds to the next
    /// self-originated frame observed.
    pub fn pop_front(&mut self) -> Option<PrrPayload> {
        self.entries.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_thread(requester: TaskId) -> PrrPayload {
        PrrPayload::RemoteThread {
            requester,
            worker: Box::new(|_| {}),
            obj_size: 4,
            rx_size: 16,
            tx_size: 16,
        }
    }

    #[test]
    fn fifo_order_preserved() {
        let mut prr = PrrList::new();
        prr.push(remote_thread(TaskId(1)));
        prr.push(remote_thread(TaskId(2)));
        match prr.pop_front() {
            Some(PrrPayload::RemoteThread { requester, .. }) => assert_eq!(requester, TaskId(1)),
            _ => panic!("expected remote thread entry"),
        }
        match prr.pop_front() {
            Some(PrrPayload::RemoteThread { requester, .. }) => assert_eq!(requester, TaskId(2)),
            _ => panic!("expected remote thread entry"),
        }
        assert!(prr.is_empty());
    }
}
