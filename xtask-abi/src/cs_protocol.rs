// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The kernel <-> Communication Server protocol.
//!
//! Requests travel kernel -> CS on a synchronous per-kernel channel: the
//! kernel sends one `CsRequest` and, for operations that have a sync reply,
//! blocks for exactly one `KcallReturn`. Operations without a sync reply
//! (create-remote-thread, send-outbox, get-inbox) return nothing on that
//! path; the caller task stays blocked until a `CsNotification` arrives
//! later.
//!
//! The source design delivers that later wakeup as a bare "something
//! happened" poke that the kernel must follow up with a `cmd=10` pull of a
//! pending-kernel-reply slot -- a two-step handoff with a documented race: a
//! notification can be dropped if the PKR table is full when the CS tries
//! to record it. We replace that with a typed channel instead:
//! `CsNotification` carries its payload directly over a typed channel, so
//! there is no separate "poke, then pull" step and nothing to race. The CS
//! still tracks a bounded number of in-flight notifications (mirroring the
//! 8-slot PKR table) so that exhaustion remains an observable, handled
//! condition rather than a silent drop -- see `xtask-cs::notify`.

use crate::channel::WorkerEntry;
use crate::err::UsageError;
use crate::ids::{BufferIndex, MailboxId, VcHandle};
use crate::kcall::KcallReturn;
use crate::task::TaskId;

/// A request sent by a kernel to its Communication Server.
pub enum CsRequest {
    /// cmd=1: create a local worker thread and its virtual channel.
    CreateThread {
        caller: TaskId,
        worker: WorkerEntry,
        obj_size: u32,
        rx_size: u32,
        tx_size: u32,
    },
    /// cmd=2: a task wants data from its worker.
    VcReceive { caller: TaskId, handle: VcHandle, min_size: u32 },
    /// cmd=3: a task wants a fresh write buffer.
    VcGetWriteBuf { caller: TaskId, handle: VcHandle },
    /// cmd=4: a task is handing a filled write buffer to its worker.
    VcSend { caller: TaskId, handle: VcHandle, index: BufferIndex, bytes: Vec<u8> },
    /// cmd=5: register a mailbox.
    CreateMailbox { caller: TaskId, id: MailboxId, rx_size: u32, tx_size: u32 },
    /// cmd=6: create a worker thread on another tile. No sync reply.
    CreateRemoteThread {
        caller: TaskId,
        tile: u32,
        worker: WorkerEntry,
        obj_size: u32,
        rx_size: u32,
        tx_size: u32,
    },
    /// cmd=7: get a mailbox's outbox capacity / write surface.
    GetOutbox { caller: TaskId, mailbox: MailboxId },
    /// cmd=8: send a filled outbox. No sync reply.
    SendOutbox {
        caller: TaskId,
        sender: MailboxId,
        outbox: Vec<u8>,
        recipient: MailboxId,
    },
    /// cmd=9: fetch a mailbox's inbox. No sync reply.
    GetInbox { caller: TaskId, mailbox: MailboxId, anywhere: bool },
    /// Frees the most recently acknowledged notification slot (see module
    /// docs): sent by the kernel once it has finished acting on a
    /// `CsNotification`, so the CS can reuse the slot it reserved.
    AckNotify,
}

/// Immediate acknowledgment the CS sends back for every `CsRequest`.
///
/// Four of the ten operations (`VcReceive`, `CreateRemoteThread`,
/// `SendOutbox`, `GetInbox`) don't always have an answer ready the moment
/// they're requested -- a remote tile or a missing sender may be involved.
/// Rather than give those four a different call shape than the other six,
/// every request gets one `CsReply` back right away: either the answer, or
/// notice that the answer will follow later as a `CsNotification`. This
/// keeps the kernel's dispatch loop uniform regardless of which of the ten
/// operations it just issued.
pub enum CsReply {
    /// The request is fully satisfied; here is the kcall's return value.
    Ready(KcallReturn),
    /// The request was accepted but can't complete yet. The caller should
    /// block and wait for a matching `CsNotification`.
    Pending,
    /// The request named a handle or id that does not exist. The kernel
    /// should treat this the same as any other fatal usage error: abort the
    /// calling task rather than hand it a response built from placeholder
    /// data.
    Fatal(UsageError),
}

/// Asynchronous completion delivered from a CS to a kernel, some time after a
/// request that had no sync reply. Classifies the wakeup
/// the way the source's `cmd=10` reply-`cmd` column does, but carries
/// its payload directly instead of requiring a follow-up pull.
pub enum CsNotification {
    /// Completes a blocked `vc_receive`: a buffer became available.
    VcBufferReady { handle: VcHandle, bytes: Vec<u8> },
    /// Completes a blocked `create_remote_thread`.
    ThreadCreated { requester: TaskId, result: Result<VcHandle, ()> },
    /// Completes a blocked `get_inbox`.
    InboxDelivered { requester: TaskId, bytes: Vec<u8> },
    /// Completes a blocked `send_outbox`.
    OutboxSent { requester: TaskId, code: u32 },
}

