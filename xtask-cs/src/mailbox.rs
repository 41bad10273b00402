// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mailboxes: named bounded inbox/outbox pairs for inter-task messaging
//!.

use std::collections::VecDeque;

use xtask_abi::{MailboxId, TaskId};

bitflags::bitflags! {
    /// A mailbox's inbox status. Unlike a VC buffer's six mutually-exclusive
    /// flag combinations, `TASK_WAITING` and `SENDER_PEND` really are
    /// independent booleans -- a mailbox can be waited on and have a pending
    /// sender at the same time, briefly, between a sender's append and the
    /// receiver's next scan.
    #[derive(Default)]
    pub struct InboxFlags: u32 {
        /// The owning task has called `get_inbox` and has nothing yet.
        const TASK_WAITING = 1 << 0;
        /// At least one sender is parked on this mailbox's behalf.
        const SENDER_PEND = 1 << 1;
    }
}

/// One mailbox.
pub struct Mailbox {
    id: MailboxId,
    owner: TaskId,
    rx_size: u32,
    tx_size: u32,
    inbox: Option<Vec<u8>>,
    flags: InboxFlags,
}

impl Mailbox {
    pub fn new(id: MailboxId, owner: TaskId, rx_size: u32, tx_size: u32) -> Self {
        Mailbox {
            id,
            owner,
            rx_size,
            tx_size,
            inbox: None,
            flags: InboxFlags::empty(),
        }
    }

    pub fn id(&self) -> MailboxId {
        self.id
    }

    pub fn owner(&self) -> TaskId {
        self.owner
    }

    pub fn tx_size(&self) -> u32 {
        self.tx_size
    }

    pub fn rx_size(&self) -> u32 {
        self.rx_size
    }

    pub fn is_waiting(&self) -> bool {
        self.flags.contains(InboxFlags::TASK_WAITING)
    }

    pub fn set_waiting(&mut self, waiting: bool) {
        self.flags.set(InboxFlags::TASK_WAITING, waiting);
    }

    pub fn set_sender_pending(&mut self, pending: bool) {
        self.flags.set(InboxFlags::SENDER_PEND, pending);
    }

    pub fn deliver(&mut self, bytes: Vec<u8>) {
        self.inbox = Some(bytes);
    }

    pub fn take_inbox(&mut self) -> Option<Vec<u8>> {
        self.inbox.take()
    }
}

/// One sender parked on a same-tile mailbox that wasn't ready yet, or
/// re-parked after a cross-tile `status == 2` reply.
pub struct ParkedSend {
    pub sender: TaskId,
    pub outbox_mailbox: MailboxId,
    pub recipient: MailboxId,
    pub bytes: Vec<u8>,
}

/// The CS-wide list of parked senders (the source's `p_outbox`), scanned by
/// `get_inbox` and by a ring type-4 broadcast.
#[derive(Default)]
pub struct ParkedSends {
    entries: VecDeque<ParkedSend>,
}

impl ParkedSends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ParkedSend) {
        self.entries.push_back(entry);
    }

    /// Removes and returns the first entry addressed to `recipient`, per
    /// the "exactly the first match" rule.
    pub fn take_first_for(&mut self, recipient: MailboxId) -> Option<ParkedSend> {
        let pos = self.entries.iter().position(|e| e.recipient == recipient)?;
        self.entries.remove(pos)
    }

    /// True if any entry remains addressed to `recipient`, used to decide
    /// whether `SENDER_PEND` should stay set after the first match is taken.
    pub fn has_pending_for(&self, recipient: MailboxId) -> bool {
        self.entries.iter().any(|e| e.recipient == recipient)
    }

    /// Drains every entry addressed to `recipient` (ring type-4 broadcast
    /// handling: every parked sender gets a fresh shot at delivery).
    pub fn drain_for(&mut self, recipient: MailboxId) -> Vec<ParkedSend> {
        let (matching, rest): (VecDeque<_>, VecDeque<_>) =
            self.entries.drain(..).partition(|e| e.recipient == recipient);
        self.entries = rest;
        matching.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins_others_stay_parked() {
        let mut p = ParkedSends::new();
        p.push(ParkedSend {
            sender: TaskId(1),
            outbox_mailbox: MailboxId(1),
            recipient: MailboxId(2),
            bytes: vec![1],
        });
        p.push(ParkedSend {
            sender: TaskId(3),
            outbox_mailbox: MailboxId(3),
            recipient: MailboxId(2),
            bytes: vec![2],
        });
        let first = p.take_first_for(MailboxId(2)).unwrap();
        assert_eq!(first.bytes, vec![1]);
        assert!(p.has_pending_for(MailboxId(2)));
        let second = p.take_first_for(MailboxId(2)).unwrap();
        assert_eq!(second.bytes, vec![2]);
        assert!(!p.has_pending_for(MailboxId(2)));
    }
}
