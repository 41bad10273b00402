// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Implementation of tasks.
//!
//! The fields here are private to the module for the same reason Hubris
//! keeps `Task`'s fields private: a task's state changes have to keep a
//! handful of cross-cutting invariants intact (it lives in exactly one of
//! {current, a ready queue, the delay list, the block list} at a time), and
//! that's much easier to audit if nothing outside this module can poke at
//! `state` directly.

use std::sync::mpsc::SyncSender;

use xtask_abi::{KcallReturn, Priority, TaskId, VcHandle};

use crate::time::Tick;

/// What a blocked task is waiting on, and how to match the CS notification
/// that will eventually resolve it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BlockKey {
    /// Blocked in `vc_receive`; resolved by a `VcBufferReady` notification
    /// naming this handle.
    VcBuffer(VcHandle),
    /// Blocked in `create_remote_thread`; resolved by `ThreadCreated`.
    ThreadCreation,
    /// Blocked in `get_inbox`; resolved by `InboxDelivered`.
    InboxDelivery,
    /// Blocked in `send_outbox`; resolved by `OutboxSent`.
    OutboxSend,
}

/// Current scheduling state of a task.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TaskState {
    /// Slot has never held a task, or the task that held it has exited.
    Dead,
    /// In a priority ready queue, waiting for the scheduler to pick it.
    Ready,
    /// Currently the kernel's `current` task.
    Running,
    /// In the delay list, waiting for its expiry tick.
    Delayed,
    /// In the block list, waiting on an asynchronous CS notification.
    Blocked(BlockKey),
}

/// Internal representation of a task.
#[derive(Debug)]
pub struct Task {
    id: TaskId,
    priority: Priority,
    state: TaskState,
    /// Stack size in machine words, as given to `create_task`. The actual
    /// stack is whatever the host OS gives the thread backing this task;
    /// we keep the requested size only so callers can be faithfully told it
    /// back and so bookkeeping mirrors the source record shape.
    stack_words: usize,
    /// Expiry tick, valid only while `state == Delayed`.
    expiry: Tick,
    /// The kcall's reply channel, stashed while the task is `Delayed` or
    /// `Blocked` so the kernel can answer it once whatever it's waiting for
    /// arrives. `None` whenever the task is `Ready`/`Running`/`Dead`.
    pending_reply: Option<SyncSender<KcallReturn>>,
    /// The value to send on `pending_reply` once the scheduler actually
    /// dispatches this task, computed at wake time (tick expiry or CS
    /// notification) but not delivered until then.
    pending_return: Option<KcallReturn>,
}

impl Task {
    pub fn new(id: TaskId, priority: Priority, stack_words: usize) -> Self {
        Task {
            id,
            priority,
            state: TaskState::Ready,
            stack_words,
            expiry: Tick::default(),
            pending_reply: None,
            pending_return: None,
        }
    }

    pub fn dead(id: TaskId) -> Self {
        Task {
            id,
            priority: Priority::IDLE,
            state: TaskState::Dead,
            stack_words: 0,
            expiry: Tick::default(),
            pending_reply: None,
            pending_return: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn stack_words(&self) -> usize {
        self.stack_words
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn is_runnable(&self) -> bool {
        matches!(self.state, TaskState::Ready)
    }

    pub fn is_alive(&self) -> bool {
        !matches!(self.state, TaskState::Dead)
    }

    pub fn set_ready(&mut self) {
        self.state = TaskState::Ready;
    }

    pub fn set_running(&mut self) {
        self.state = TaskState::Running;
    }

    pub fn set_delayed(&mut self, expiry: Tick) {
        self.expiry = expiry;
        self.state = TaskState::Delayed;
    }

    pub fn expiry(&self) -> Tick {
        self.expiry
    }

    pub fn set_blocked(&mut self, key: BlockKey) {
        self.state = TaskState::Blocked(key);
    }

    pub fn block_key(&self) -> Option<BlockKey> {
        match self.state {
            TaskState::Blocked(k) => Some(k),
            _ => None,
        }
    }

    pub fn set_dead(&mut self) {
        self.state = TaskState::Dead;
        self.pending_reply = None;
        self.pending_return = None;
    }

    pub fn stash_reply(&mut self, reply: SyncSender<KcallReturn>) {
        self.pending_reply = Some(reply);
    }

    pub fn take_reply(&mut self) -> Option<SyncSender<KcallReturn>> {
        self.pending_reply.take()
    }

    pub fn stash_return(&mut self, ret: KcallReturn) {
        self.pending_return = Some(ret);
    }

    pub fn take_return(&mut self) -> Option<KcallReturn> {
        self.pending_return.take()
    }
}
