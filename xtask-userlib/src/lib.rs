// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Task-side support library.
//!
//! This contains kernel call stubs and re-exports the contents of the `abi`
//! crate that gets shared with the kernel and the Communication Server.
//!
//! # Syscall stub implementations
//!
//! A task runs as an ordinary OS thread here rather than as code that traps
//! into a kernel running on the same core, so a "syscall" is a channel send
//! followed by a blocking recv on a reply channel, instead of an `svc`
//! instruction. Each task thread binds itself to its kernel once, via
//! [`bind_task`], before making any `sys_*` call; everything after that reads
//! the binding from thread-local storage, the same way the stub functions
//! read fixed registers on the real target.

pub use xtask_abi::*;

pub mod hl;
pub mod sys;

use std::cell::RefCell;
use std::sync::mpsc::Sender;

use xtask_kern::KernelEvent;

struct TaskContext {
    id: TaskId,
    events: Sender<KernelEvent>,
}

thread_local! {
    static CONTEXT: RefCell<Option<TaskContext>> = const { RefCell::new(None) };
}

/// Binds the calling OS thread to a task identity and its kernel's event
/// channel. A task's entry point must call this before issuing any `sys_*`
/// call.
pub fn bind_task(id: TaskId, events: Sender<KernelEvent>) {
    CONTEXT.with(|c| *c.borrow_mut() = Some(TaskContext { id, events }));
}

/// The calling thread's own task id, as bound by [`bind_task`].
pub fn task_id() -> TaskId {
    with_context(|ctx| ctx.id)
}

fn with_context<R>(f: impl FnOnce(&TaskContext) -> R) -> R {
    CONTEXT.with(|c| {
        let borrow = c.borrow();
        let ctx = borrow
            .as_ref()
            .expect("task thread issued a kernel call before bind_task");
        f(ctx)
    })
}
