// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The twelve kernel calls a task may issue.
//!
//! Real hardware passes these as a six-word parameter block in a reserved
//! register, followed by a trap. Since the channel/trap primitives are
//! explicitly out of scope for this design, a task's call here is a
//! regular function call: it packs a `Kcall`, hands it to the kernel's
//! dispatch entry point, and blocks on the matching `KcallReturn`.

use crate::channel::{TaskEntry, WorkerEntry};
use crate::ids::{BufferIndex, MailboxId, VcHandle};
use crate::task::{Priority, TaskId};

/// Kernel call numbers, matching the source's dispatch table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum KcallNumber {
    DelayTicks = 1,
    CreateThread = 2,
    VcReceive = 3,
    VcGetWriteBuf = 4,
    VcSend = 5,
    CreateMailbox = 6,
    CreateRemoteThread = 7,
    GetOutbox = 8,
    SendOutbox = 9,
    GetInbox = 10,
    CreateTask = 11,
    Exit = 12,
}

/// A task-issued kernel call together with its parameters.
pub enum Kcall {
    DelayTicks { ticks: u64 },
    CreateThread { worker: WorkerEntry, obj_size: u32, rx_size: u32, tx_size: u32 },
    VcReceive { handle: VcHandle, min_size: u32 },
    VcGetWriteBuf { handle: VcHandle },
    VcSend { handle: VcHandle, index: BufferIndex, bytes: Vec<u8> },
    CreateMailbox { id: MailboxId, rx_size: u32, tx_size: u32 },
    CreateRemoteThread { tile: u32, worker: WorkerEntry, obj_size: u32, rx_size: u32, tx_size: u32 },
    GetOutbox { mailbox: MailboxId },
    SendOutbox { sender: MailboxId, recipient: MailboxId, bytes: Vec<u8> },
    GetInbox { mailbox: MailboxId, anywhere: bool },
    CreateTask { priority: Priority, tid: TaskId, entry: TaskEntry },
    Exit,
}

impl Kcall {
    pub fn number(&self) -> KcallNumber {
        match self {
            Kcall::DelayTicks { .. } => KcallNumber::DelayTicks,
            Kcall::CreateThread { .. } => KcallNumber::CreateThread,
            Kcall::VcReceive { .. } => KcallNumber::VcReceive,
            Kcall::VcGetWriteBuf { .. } => KcallNumber::VcGetWriteBuf,
            Kcall::VcSend { .. } => KcallNumber::VcSend,
            Kcall::CreateMailbox { .. } => KcallNumber::CreateMailbox,
            Kcall::CreateRemoteThread { .. } => KcallNumber::CreateRemoteThread,
            Kcall::GetOutbox { .. } => KcallNumber::GetOutbox,
            Kcall::SendOutbox { .. } => KcallNumber::SendOutbox,
            Kcall::GetInbox { .. } => KcallNumber::GetInbox,
            Kcall::CreateTask { .. } => KcallNumber::CreateTask,
            Kcall::Exit => KcallNumber::Exit,
        }
    }
}

/// The result delivered back to a blocked or immediately-satisfied kcall.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KcallReturn {
    Unit,
    VcHandle(VcHandle),
    /// `vc_receive` result: `Some(bytes)` once a buffer was obtained.
    VcBuffer(Vec<u8>),
    VcWriteBuf { index: BufferIndex, capacity: u32 },
    /// `send_outbox` / `create_remote_thread` completion code: `0` delivered,
    /// `1` failed.
    Code(u32),
    Inbox(Vec<u8>),
}
