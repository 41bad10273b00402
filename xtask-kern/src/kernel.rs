// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The kernel's single-threaded event loop and kcall dispatch table.
//!
//! Real hardware drives this loop from SysTick and SVCall exceptions. Here
//! the three kinds of event -- a task issuing a kcall, the CS completing a
//! pending request, and a timer tick -- are funneled into one channel as a
//! `KernelEvent` and handled one at a time by `Kernel::run`, which keeps the
//! same "never two kcalls in flight at once" property the source design gets
//! from running on a single core.
//!
//! Priority scheduling is enforced at the point a task resumes after
//! blocking (a tick expiry or a CS notification satisfies it): rather than
//! replying to whichever blocked task happened to wake first, the wake just
//! marks the task `Ready` and queues it; `dispatch` then hands the single
//! "current" slot to the highest-priority ready task, and nothing else gets
//! its reply until that task blocks again or exits. A task that hasn't yet
//! made a blocking call runs freely on its own OS thread, same as on real
//! hardware before its first trap -- this only arbitrates contention between
//! tasks that are actually waiting on the kernel.

use std::sync::mpsc::{Receiver, Sender, SyncSender};

use log::{debug, trace, warn};
use xtask_abi::{CsNotification, CsReply, CsRequest, Kcall, KcallReturn, Priority, TaskEntry, TaskId};

use crate::err::CallError;
use crate::sched::Scheduler;
use crate::task::{BlockKey, Task};
use crate::time::Tick;

/// One input to the kernel's dispatch loop.
pub enum KernelEvent {
    /// A task issued a kcall and is waiting on `reply`.
    Call {
        task: TaskId,
        kcall: Kcall,
        reply: SyncSender<KcallReturn>,
    },
    /// The CS finished a request that had returned `CsReply::Pending`.
    Notify(CsNotification),
    /// The kernel's timer fired once.
    Tick,
}

/// A single-core xTask kernel.
///
/// Owns every task's scheduling state and talks to exactly one Communication
/// Server over a synchronous request/reply pair plus the shared event
/// channel that carries notifications and timer ticks.
pub struct Kernel {
    tasks: Vec<Task>,
    sched: Scheduler,
    /// Slot currently holding the kernel's one "running" token, if any.
    current: Option<usize>,
    /// Slot of the idle task: always implicitly runnable, never actually
    /// dispatched or allowed to hold `current`.
    idle: usize,
    now: Tick,
    events: Receiver<KernelEvent>,
    cs_requests: Sender<CsRequest>,
    cs_replies: Receiver<CsReply>,
    /// Spawns a task created at runtime (kcall 11); kept as a callback so
    /// this crate never has to depend on the userlib/runtime crates that
    /// know how to start an OS thread and bind it to this kernel's event
    /// channel.
    spawn_task: Box<dyn FnMut(TaskId, Priority, TaskEntry) + Send>,
}

impl Kernel {
    pub fn new(
        task_count: usize,
        idle: TaskId,
        events: Receiver<KernelEvent>,
        cs_requests: Sender<CsRequest>,
        cs_replies: Receiver<CsReply>,
        spawn_task: Box<dyn FnMut(TaskId, Priority, TaskEntry) + Send>,
    ) -> Self {
        let mut tasks: Vec<Task> = (0..task_count)
            .map(|i| Task::dead(TaskId::from(i as u32)))
            .collect();
        if idle.index() < tasks.len() {
            tasks[idle.index()] = Task::new(idle, Priority::IDLE, 0);
        }
        let mut sched = Scheduler::new();
        sched.push_ready(Priority::IDLE, idle.index());

        Kernel {
            tasks,
            sched,
            current: None,
            idle: idle.index(),
            now: Tick::default(),
            events,
            cs_requests,
            cs_replies,
            spawn_task,
        }
    }

    /// Registers a task created before the kernel starts running, as
    /// distinct from a task created at runtime by `create_task`. Doesn't
    /// touch the ready queue: a task only competes for the "current" slot
    /// once it first blocks and is woken, not from the moment it's merely
    /// installed -- it's already running freely on its own OS thread.
    pub fn install_task(&mut self, id: TaskId, priority: Priority, stack_words: usize) {
        self.tasks[id.index()] = Task::new(id, priority, stack_words);
    }

    /// Gives a blocked/delayed task's slot back to the ready queue and
    /// frees `current` if it was the one holding it, then tries to hand the
    /// token to the next highest-priority ready task.
    fn wake(&mut self, slot: usize, ret: KcallReturn) {
        self.tasks[slot].set_ready();
        self.tasks[slot].stash_return(ret);
        let priority = self.tasks[slot].priority();
        self.sched.push_ready(priority, slot);
    }

    fn release_current(&mut self, slot: usize) {
        if self.current == Some(slot) {
            self.current = None;
        }
    }

    /// If nobody currently holds the token, hands it to the highest-priority
    /// ready task and delivers its stashed reply. The idle task is always
    /// implicitly ready but never actually dispatched -- it represents
    /// "nothing else to run", not a task waiting its turn.
    fn dispatch(&mut self) {
        if self.current.is_some() {
            return;
        }
        while let Some(slot) = self.sched.pop_ready() {
            if slot == self.idle {
                self.sched.push_ready(Priority::IDLE, slot);
                return;
            }
            if !self.tasks[slot].is_runnable() {
                continue;
            }
            self.tasks[slot].set_running();
            self.current = Some(slot);
            if let Some(reply) = self.tasks[slot].take_reply() {
                if let Some(ret) = self.tasks[slot].take_return() {
                    let _ = reply.send(ret);
                }
            }
            return;
        }
    }

    /// Runs forever, handling one event at a time. Returns only if the event
    /// channel is disconnected (every task and the timer source gone).
    pub fn run(&mut self) {
        while let Ok(event) = self.events.recv() {
            match event {
                KernelEvent::Call { task, kcall, reply } => self.handle_call(task, kcall, reply),
                KernelEvent::Notify(n) => self.handle_notify(n),
                KernelEvent::Tick => self.handle_tick(),
            }
        }
    }

    fn handle_tick(&mut self) {
        self.now = self.now.plus(1);
        let woken = self.sched.drain_expired(self.now);
        for slot in woken {
            self.wake(slot, KcallReturn::Unit);
        }
        self.dispatch();
    }

    fn handle_notify(&mut self, n: CsNotification) {
        let tasks = &self.tasks;
        let (slot, ret) = match n {
            CsNotification::VcBufferReady { handle, bytes } => {
                let slot = self
                    .sched
                    .take_blocked(|_, k| k == BlockKey::VcBuffer(handle));
                (slot, KcallReturn::VcBuffer(bytes))
            }
            CsNotification::ThreadCreated { requester, result } => {
                let slot = self
                    .sched
                    .take_blocked(|s, k| k == BlockKey::ThreadCreation && tasks[s].id() == requester);
                let ret = match result {
                    Ok(handle) => KcallReturn::VcHandle(handle),
                    Err(()) => KcallReturn::Code(1),
                };
                (slot, ret)
            }
            CsNotification::InboxDelivered { requester, bytes } => {
                let slot = self
                    .sched
                    .take_blocked(|s, k| k == BlockKey::InboxDelivery && tasks[s].id() == requester);
                (slot, KcallReturn::Inbox(bytes))
            }
            CsNotification::OutboxSent { requester, code } => {
                let slot = self
                    .sched
                    .take_blocked(|s, k| k == BlockKey::OutboxSend && tasks[s].id() == requester);
                (slot, KcallReturn::Code(code))
            }
        };

        let Some(slot) = slot else {
            warn!("CS notification matched no blocked task; dropping");
            let _ = self.cs_requests.send(CsRequest::AckNotify);
            return;
        };
        self.wake(slot, ret);
        let _ = self.cs_requests.send(CsRequest::AckNotify);
        self.dispatch();
    }

    fn handle_call(&mut self, caller: TaskId, kcall: Kcall, reply: SyncSender<KcallReturn>) {
        trace!("task {:?}: {:?}", caller, kcall.number());
        let slot = caller.index();

        let outcome = match kcall {
            Kcall::DelayTicks { ticks } => {
                self.tasks[slot].stash_reply(reply);
                self.tasks[slot].set_delayed(self.now.plus(ticks));
                self.sched.push_delayed(self.now.plus(ticks), slot);
                self.release_current(slot);
                self.dispatch();
                return;
            }
            Kcall::CreateTask { priority, tid, entry } => {
                (self.spawn_task)(tid, priority, entry);
                self.install_task(tid, priority, 0);
                Ok(KcallReturn::Unit)
            }
            Kcall::Exit => {
                self.tasks[slot].set_dead();
                let _ = reply.send(KcallReturn::Unit);
                self.release_current(slot);
                self.dispatch();
                return;
            }
            Kcall::CreateThread { worker, obj_size, rx_size, tx_size } => self.forward_sync(
                caller,
                CsRequest::CreateThread { caller, worker, obj_size, rx_size, tx_size },
            ),
            Kcall::VcGetWriteBuf { handle } => {
                self.forward_sync(caller, CsRequest::VcGetWriteBuf { caller, handle })
            }
            Kcall::VcSend { handle, index, bytes } => {
                self.forward_sync(caller, CsRequest::VcSend { caller, handle, index, bytes })
            }
            Kcall::CreateMailbox { id, rx_size, tx_size } => {
                self.forward_sync(caller, CsRequest::CreateMailbox { caller, id, rx_size, tx_size })
            }
            Kcall::GetOutbox { mailbox } => {
                self.forward_sync(caller, CsRequest::GetOutbox { caller, mailbox })
            }
            Kcall::VcReceive { handle, min_size } => {
                match self.forward_pending(
                    caller,
                    CsRequest::VcReceive { caller, handle, min_size },
                    BlockKey::VcBuffer(handle),
                    reply,
                ) {
                    Some(r) => r,
                    None => return,
                }
            }
            Kcall::CreateRemoteThread { tile, worker, obj_size, rx_size, tx_size } => {
                match self.forward_pending(
                    caller,
                    CsRequest::CreateRemoteThread { caller, tile, worker, obj_size, rx_size, tx_size },
                    BlockKey::ThreadCreation,
                    reply,
                ) {
                    Some(r) => r,
                    None => return,
                }
            }
            Kcall::SendOutbox { sender, recipient, bytes } => {
                match self.forward_pending(
                    caller,
                    CsRequest::SendOutbox { caller, sender, outbox: bytes, recipient },
                    BlockKey::OutboxSend,
                    reply,
                ) {
                    Some(r) => r,
                    None => return,
                }
            }
            Kcall::GetInbox { mailbox, anywhere } => {
                match self.forward_pending(
                    caller,
                    CsRequest::GetInbox { caller, mailbox, anywhere },
                    BlockKey::InboxDelivery,
                    reply,
                ) {
                    Some(r) => r,
                    None => return,
                }
            }
        };

        match outcome {
            Ok(ret) => {
                let _ = reply.send(ret);
            }
            Err(CallError::Recoverable(code)) => {
                let _ = reply.send(KcallReturn::Code(code));
            }
            Err(CallError::Fatal(e)) => {
                warn!("task {:?} faulted: {}", caller, e);
                self.tasks[slot].set_dead();
                self.release_current(slot);
                self.dispatch();
            }
        }
    }

    /// Sends a request that the source table marks as always having a
    /// synchronous reply, and waits for it inline.
    fn forward_sync(&mut self, _caller: TaskId, req: CsRequest) -> Result<KcallReturn, CallError> {
        let _ = self.cs_requests.send(req);
        match self.cs_replies.recv() {
            Ok(CsReply::Ready(ret)) => Ok(ret),
            Ok(CsReply::Pending) => {
                debug!("CS answered Pending to a call expected to be synchronous");
                Err(CallError::Recoverable(1))
            }
            Ok(CsReply::Fatal(e)) => Err(CallError::Fatal(e)),
            Err(_) => Err(CallError::Recoverable(1)),
        }
    }

    /// Sends a request that may or may not resolve immediately. If the CS
    /// says `Ready`, returns the outcome straight away (`Some`). If
    /// `Pending`, stashes the task as blocked on `key` and returns `None` --
    /// the caller must not touch `reply` again; `handle_notify` owns it now.
    fn forward_pending(
        &mut self,
        caller: TaskId,
        req: CsRequest,
        key: BlockKey,
        reply: SyncSender<KcallReturn>,
    ) -> Option<Result<KcallReturn, CallError>> {
        let _ = self.cs_requests.send(req);
        match self.cs_replies.recv() {
            Ok(CsReply::Ready(ret)) => Some(Ok(ret)),
            Ok(CsReply::Pending) => {
                let slot = caller.index();
                self.tasks[slot].stash_reply(reply);
                self.tasks[slot].set_blocked(key);
                self.sched.push_blocked(slot, key);
                self.release_current(slot);
                self.dispatch();
                None
            }
            Ok(CsReply::Fatal(e)) => Some(Err(CallError::Fatal(e))),
            Err(_) => Some(Err(CallError::Recoverable(1))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    use xtask_abi::MailboxId;

    use crate::task::TaskState;

    fn test_kernel() -> (Kernel, Receiver<CsRequest>, Sender<CsReply>) {
        let (_events_tx, events_rx) = mpsc::channel();
        let (cs_request_tx, cs_request_rx) = mpsc::channel();
        let (cs_reply_tx, cs_reply_rx) = mpsc::channel();
        let spawn_task: Box<dyn FnMut(TaskId, Priority, TaskEntry) + Send> = Box::new(|_, _, _| {});
        let kernel = Kernel::new(4, TaskId(0), events_rx, cs_request_tx, cs_reply_rx, spawn_task);
        (kernel, cs_request_rx, cs_reply_tx)
    }

    #[test]
    fn delay_ticks_blocks_then_wakes_on_expiry() {
        let (mut kernel, _cs_request_rx, _cs_reply_tx) = test_kernel();
        kernel.install_task(TaskId(1), Priority(1), 0);

        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        kernel.handle_call(TaskId(1), Kcall::DelayTicks { ticks: 5 }, reply_tx);

        assert!(reply_rx.try_recv().is_err());
        assert_eq!(kernel.tasks[1].state(), &TaskState::Delayed);

        for _ in 0..4 {
            kernel.handle_tick();
            assert!(reply_rx.try_recv().is_err(), "must not wake before expiry");
        }
        kernel.handle_tick();

        assert!(matches!(reply_rx.try_recv(), Ok(KcallReturn::Unit)));
        assert_eq!(kernel.tasks[1].state(), &TaskState::Running);
        assert_eq!(kernel.current, Some(1));
    }

    #[test]
    fn create_task_spawns_then_installs_new_slot() {
        let (events_tx, events_rx) = mpsc::channel();
        let (cs_request_tx, _cs_request_rx) = mpsc::channel();
        let (_cs_reply_tx, cs_reply_rx) = mpsc::channel();

        let spawned: Arc<Mutex<Vec<(TaskId, Priority)>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = spawned.clone();
        let spawn_task: Box<dyn FnMut(TaskId, Priority, TaskEntry) + Send> =
            Box::new(move |tid, priority, _entry| recorded.lock().unwrap().push((tid, priority)));
        let mut kernel = Kernel::new(4, TaskId(0), events_rx, cs_request_tx, cs_reply_rx, spawn_task);
        drop(events_tx);

        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        let entry: TaskEntry = Box::new(|| {});
        kernel.handle_call(
            TaskId(0),
            Kcall::CreateTask { priority: Priority(2), tid: TaskId(3), entry },
            reply_tx,
        );

        assert!(matches!(reply_rx.try_recv(), Ok(KcallReturn::Unit)));
        assert_eq!(*spawned.lock().unwrap(), vec![(TaskId(3), Priority(2))]);
        assert_eq!(kernel.tasks[3].priority(), Priority(2));
        assert!(kernel.tasks[3].is_alive());
    }

    #[test]
    fn forward_sync_turns_unexpected_pending_into_recoverable_error() {
        let (mut kernel, cs_request_rx, cs_reply_tx) = test_kernel();
        kernel.install_task(TaskId(1), Priority(1), 0);

        cs_reply_tx.send(CsReply::Pending).unwrap();
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        kernel.handle_call(
            TaskId(1),
            Kcall::CreateMailbox { id: MailboxId(1), rx_size: 4, tx_size: 4 },
            reply_tx,
        );

        assert!(matches!(cs_request_rx.try_recv(), Ok(CsRequest::CreateMailbox { .. })));
        assert!(matches!(reply_rx.try_recv(), Ok(KcallReturn::Code(1))));
    }

    #[test]
    fn forward_pending_blocks_caller_until_notification_arrives() {
        let (mut kernel, cs_request_rx, cs_reply_tx) = test_kernel();
        kernel.install_task(TaskId(1), Priority(1), 0);

        cs_reply_tx.send(CsReply::Pending).unwrap();
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        kernel.handle_call(
            TaskId(1),
            Kcall::GetInbox { mailbox: MailboxId(1), anywhere: false },
            reply_tx,
        );

        assert!(matches!(cs_request_rx.try_recv(), Ok(CsRequest::GetInbox { .. })));
        assert!(reply_rx.try_recv().is_err());
        assert_eq!(
            kernel.tasks[1].block_key(),
            Some(BlockKey::InboxDelivery)
        );

        kernel.handle_notify(CsNotification::InboxDelivered { requester: TaskId(1), bytes: vec![9, 9] });

        assert!(matches!(reply_rx.try_recv(), Ok(KcallReturn::Inbox(bytes)) if bytes == vec![9, 9]));
        assert_eq!(kernel.tasks[1].state(), &TaskState::Running);
        assert_eq!(kernel.current, Some(1));
    }

    #[test]
    fn tick_wakeup_dispatches_highest_priority_ready_task_first() {
        let (mut kernel, _cs_request_rx, _cs_reply_tx) = test_kernel();
        kernel.install_task(TaskId(1), Priority(5), 0);
        kernel.install_task(TaskId(2), Priority(1), 0);

        let (low_tx, low_rx) = mpsc::sync_channel(1);
        kernel.handle_call(TaskId(1), Kcall::DelayTicks { ticks: 3 }, low_tx);
        let (high_tx, high_rx) = mpsc::sync_channel(1);
        kernel.handle_call(TaskId(2), Kcall::DelayTicks { ticks: 3 }, high_tx);

        for _ in 0..2 {
            kernel.handle_tick();
        }
        kernel.handle_tick();

        // Both expire on the same tick, but only the higher-priority task
        // (lower Priority number) actually gets dispatched and its reply
        // delivered; the other stays Ready, holding no token.
        assert!(matches!(high_rx.try_recv(), Ok(KcallReturn::Unit)));
        assert!(low_rx.try_recv().is_err(), "lower-priority task must not run yet");
        assert_eq!(kernel.current, Some(2));
        assert_eq!(kernel.tasks[2].state(), &TaskState::Running);
        assert_eq!(kernel.tasks[1].state(), &TaskState::Ready);

        // Once the running task exits, the token frees up and the other
        // ready task is dispatched.
        let (exit_tx, exit_rx) = mpsc::sync_channel(1);
        kernel.handle_call(TaskId(2), Kcall::Exit, exit_tx);
        assert!(matches!(exit_rx.try_recv(), Ok(KcallReturn::Unit)));

        assert!(matches!(low_rx.try_recv(), Ok(KcallReturn::Unit)));
        assert_eq!(kernel.current, Some(1));
        assert_eq!(kernel.tasks[1].state(), &TaskState::Running);
    }
}
