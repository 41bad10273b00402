// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Higher-level, ergonomic wrappers over the raw `sys_*` stubs.
//!
//! A task rarely needs to juggle a bare `VcHandle` or `MailboxId` plus the
//! matching `sys_vc_*`/`sys_*_inbox`/`sys_*_outbox` calls by hand; `Worker`
//! and `Mailbox` pair each handle with the calls that make sense against it,
//! the way `hl::sleep_for` pairs a tick count with the timer kcall.

use xtask_abi::{BufferIndex, MailboxId, ObjectChannel, Priority, TaskId, VcHandle, WorkerEntry};

use crate::sys;

/// Blocks the calling task for `ticks` kernel ticks.
pub fn sleep_for(ticks: u64) {
    sys::sys_delay_ticks(ticks);
}

/// Creates a new task at `priority`, identified by `tid`, running `entry`.
pub fn spawn_task(priority: Priority, tid: TaskId, entry: impl FnOnce() + Send + 'static) {
    sys::sys_create_task(priority, tid, Box::new(entry));
}

/// A task's handle to a virtual channel and the worker thread behind it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Worker(VcHandle);

impl Worker {
    /// Starts a worker thread on this tile, running `entry` on its own OS
    /// thread, connected by a virtual channel with the given object size and
    /// per-direction buffer capacities.
    pub fn spawn(entry: WorkerEntry, obj_size: u32, rx_size: u32, tx_size: u32) -> Self {
        Worker(sys::sys_create_thread(entry, obj_size, rx_size, tx_size))
    }

    /// Starts a worker thread on tile `tile`, by hint; the actual placement
    /// is negotiated over the ring.
    pub fn spawn_remote(tile: u32, entry: WorkerEntry, obj_size: u32, rx_size: u32, tx_size: u32) -> Result<Self, ()> {
        sys::sys_create_remote_thread(tile, entry, obj_size, rx_size, tx_size).map(Worker)
    }

    pub fn handle(self) -> VcHandle {
        self.0
    }

    /// Blocks until at least one full object -- or, if `min_size` is
    /// nonzero, at least `min_size` bytes of a run in progress -- is
    /// available from the worker, then returns it.
    pub fn receive(self, min_size: u32) -> Vec<u8> {
        sys::sys_vc_receive(self.0, min_size)
    }

    /// Blocks until a worker object of any size is ready (the
    /// zero-watermark case).
    pub fn receive_object(self) -> Vec<u8> {
        self.receive(0)
    }

    /// Obtains a fresh write buffer, fills it with `bytes`, and hands it to
    /// the worker, returning the write buffer now offered in its place.
    pub fn send(self, bytes: Vec<u8>) -> (BufferIndex, u32) {
        let (index, capacity) = sys::sys_vc_get_write_buf(self.0);
        debug_assert!(bytes.len() as u32 <= capacity, "write exceeds buffer capacity");
        sys::sys_vc_send(self.0, index, bytes)
    }
}

/// A task's handle to one of its own mailboxes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Mailbox(MailboxId);

impl Mailbox {
    /// Registers a mailbox under `id` with the given inbox/outbox capacities.
    pub fn create(id: MailboxId, rx_size: u32, tx_size: u32) -> Self {
        sys::sys_create_mailbox(id, rx_size, tx_size);
        Mailbox(id)
    }

    pub fn id(self) -> MailboxId {
        self.0
    }

    /// This mailbox's outbox capacity.
    pub fn outbox_capacity(self) -> u32 {
        sys::sys_get_outbox(self.0)
    }

    /// Sends `bytes` to `recipient`, blocking until the send resolves.
    /// Returns `SEND_OUTBOX_DELIVERED` or `SEND_OUTBOX_FAILED`.
    pub fn send(self, recipient: MailboxId, bytes: Vec<u8>) -> u32 {
        sys::sys_send_outbox(self.0, recipient, bytes)
    }

    /// Blocks for the next inbox delivery, checking only this tile.
    pub fn recv(self) -> Vec<u8> {
        sys::sys_get_inbox(self.0, false)
    }

    /// Blocks for the next inbox delivery, broadcasting a "ready" frame on
    /// the ring if nothing is parked locally so senders on other tiles get a
    /// chance to retry.
    pub fn recv_anywhere(self) -> Vec<u8> {
        sys::sys_get_inbox(self.0, true)
    }
}

/// Convenience re-export so a worker entry point only needs
/// `xtask_userlib::hl::ObjectChannel`.
pub use xtask_abi::ObjectChannel as WorkerChannel;

/// Runs `body` in a loop, forwarding each received object straight back as
/// the worker's own emission -- a trivial loopback worker useful for tests
/// and demos that just need a live VC on the other end.
pub fn echo_worker(channel: ObjectChannel) {
    while let Some(object) = channel.accept() {
        if !channel.emit(object) {
            break;
        }
    }
}
