// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw kernel call stubs.
//!
//! Each stub packs a [`Kcall`], hands it to the bound kernel's event channel,
//! and blocks on the matching [`KcallReturn`]. One stub per kcall number,
//! same shape as the source table.

use std::sync::mpsc;

use xtask_abi::{BufferIndex, Kcall, KcallReturn, MailboxId, Priority, TaskEntry, TaskId, VcHandle, WorkerEntry};
use xtask_kern::KernelEvent;

use crate::with_context;

fn call(kcall: Kcall) -> KcallReturn {
    let (reply_tx, reply_rx) = mpsc::sync_channel(1);
    with_context(|ctx| {
        let _ = ctx.events.send(KernelEvent::Call {
            task: ctx.id,
            kcall,
            reply: reply_tx,
        });
    });
    reply_rx
        .recv()
        .expect("kernel dropped our reply channel without answering")
}

/// kcall 1: block the calling task for `ticks` kernel ticks.
pub fn sys_delay_ticks(ticks: u64) {
    call(Kcall::DelayTicks { ticks });
}

/// kcall 2: create a local worker thread and its virtual channel.
pub fn sys_create_thread(worker: WorkerEntry, obj_size: u32, rx_size: u32, tx_size: u32) -> VcHandle {
    match call(Kcall::CreateThread { worker, obj_size, rx_size, tx_size }) {
        KcallReturn::VcHandle(h) => h,
        other => panic!("create_thread: unexpected kcall reply {other:?}"),
    }
}

/// kcall 3: fetch the next object (or the accumulated partial run) from a
/// virtual channel's read half.
pub fn sys_vc_receive(handle: VcHandle, min_size: u32) -> Vec<u8> {
    match call(Kcall::VcReceive { handle, min_size }) {
        KcallReturn::VcBuffer(bytes) => bytes,
        other => panic!("vc_receive: unexpected kcall reply {other:?}"),
    }
}

/// kcall 4: obtain a fresh write buffer for a virtual channel.
pub fn sys_vc_get_write_buf(handle: VcHandle) -> (BufferIndex, u32) {
    match call(Kcall::VcGetWriteBuf { handle }) {
        KcallReturn::VcWriteBuf { index, capacity } => (index, capacity),
        other => panic!("vc_get_write_buf: unexpected kcall reply {other:?}"),
    }
}

/// kcall 5: hand a filled write buffer to the virtual channel's worker,
/// receiving the next write buffer in exchange.
pub fn sys_vc_send(handle: VcHandle, index: BufferIndex, bytes: Vec<u8>) -> (BufferIndex, u32) {
    match call(Kcall::VcSend { handle, index, bytes }) {
        KcallReturn::VcWriteBuf { index, capacity } => (index, capacity),
        other => panic!("vc_send: unexpected kcall reply {other:?}"),
    }
}

/// kcall 6: register a mailbox under `id`.
pub fn sys_create_mailbox(id: MailboxId, rx_size: u32, tx_size: u32) {
    call(Kcall::CreateMailbox { id, rx_size, tx_size });
}

/// kcall 7: create a worker thread on tile `tile`, by hint.
pub fn sys_create_remote_thread(
    tile: u32,
    worker: WorkerEntry,
    obj_size: u32,
    rx_size: u32,
    tx_size: u32,
) -> Result<VcHandle, ()> {
    match call(Kcall::CreateRemoteThread { tile, worker, obj_size, rx_size, tx_size }) {
        KcallReturn::VcHandle(h) => Ok(h),
        KcallReturn::Code(_) => Err(()),
        other => panic!("create_remote_thread: unexpected kcall reply {other:?}"),
    }
}

/// kcall 8: query a mailbox's outbox capacity.
pub fn sys_get_outbox(mailbox: MailboxId) -> u32 {
    match call(Kcall::GetOutbox { mailbox }) {
        KcallReturn::Code(capacity) => capacity,
        other => panic!("get_outbox: unexpected kcall reply {other:?}"),
    }
}

/// kcall 9: send a filled outbox to `recipient`. Returns `SEND_OUTBOX_*`
///.
pub fn sys_send_outbox(sender: MailboxId, recipient: MailboxId, bytes: Vec<u8>) -> u32 {
    match call(Kcall::SendOutbox { sender, recipient, bytes }) {
        KcallReturn::Code(code) => code,
        other => panic!("send_outbox: unexpected kcall reply {other:?}"),
    }
}

/// kcall 10: fetch a mailbox's inbox, optionally asking the ring to retry
/// parked senders system-wide if none is available locally.
pub fn sys_get_inbox(mailbox: MailboxId, anywhere: bool) -> Vec<u8> {
    match call(Kcall::GetInbox { mailbox, anywhere }) {
        KcallReturn::Inbox(bytes) => bytes,
        other => panic!("get_inbox: unexpected kcall reply {other:?}"),
    }
}

/// kcall 11: create a new task at `priority`, identified by `tid`, running
/// `entry` on its own OS thread once the kernel installs its scheduling
/// state.
pub fn sys_create_task(priority: Priority, tid: TaskId, entry: TaskEntry) {
    call(Kcall::CreateTask { priority, tid, entry });
}

/// kcall 12: terminate the calling task.
pub fn sys_exit() {
    call(Kcall::Exit);
}
