// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The dedicated worker/CS object channel.
//!
//! The underlying channel -- "enqueue/dequeue a word stream with
//! end-of-transfer tokens" -- is treated as an external, architecture
//! specific primitive. `ObjectChannel` is the abstract contract that
//! primitive is assumed to satisfy: a worker and its CS exchange whole
//! fixed-size objects, one at a time, over the two halves of a dedicated,
//! bounded channel.

use std::sync::mpsc::{Receiver, Sender};

/// One endpoint of a worker/CS dedicated channel.
///
/// The CS holds one `ObjectChannel` per virtual channel; the worker thread
/// holds the other end (a plain pair of `Sender`/`Receiver` handed to the
/// worker's entry point).
pub struct ObjectChannel {
    pub outbound: Sender<Vec<u8>>,
    pub inbound: Receiver<Vec<u8>>,
}

impl ObjectChannel {
    pub fn new(outbound: Sender<Vec<u8>>, inbound: Receiver<Vec<u8>>) -> Self {
        Self { outbound, inbound }
    }

    /// Worker -> CS direction: hand one fixed-size object to the CS.
    pub fn emit(&self, object: Vec<u8>) -> bool {
        self.outbound.send(object).is_ok()
    }

    /// CS -> worker direction: block until the CS hands us one object, or the
    /// CS has gone away.
    pub fn accept(&self) -> Option<Vec<u8>> {
        self.inbound.recv().ok()
    }
}

/// A worker's entry point: a function run on its own thread, given the
/// worker-side endpoint of its dedicated channel.
pub type WorkerEntry = Box<dyn FnOnce(ObjectChannel) + Send + 'static>;

/// A task's entry point, carried by `create_task` (kcall 11). The source
/// passes a bare program counter plus an args pointer; since a task
/// here is an OS thread rather than a stack the kernel switches to directly,
/// the closure itself is the "pc + args" bundle.
pub type TaskEntry = Box<dyn FnOnce() + Send + 'static>;
