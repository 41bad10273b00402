// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-core xTask kernel: task lifecycle, priority scheduling, and kcall
//! dispatch.
//!
//! This crate has no notion of virtual channels, mailboxes, or the ring bus
//! beyond the `CsRequest`/`CsNotification`/`CsReply` vocabulary it shares
//! with `xtask-abi` -- everything about how those are actually satisfied
//! lives in `xtask-cs`. A `Kernel` only needs to know that it can hand a
//! request to *something* and eventually get an answer back.

pub mod err;
pub mod kernel;
pub mod sched;
pub mod task;
pub mod time;

pub use err::CallError;
pub use kernel::{Kernel, KernelEvent};
pub use task::{BlockKey, Task, TaskState};
pub use time::Tick;
