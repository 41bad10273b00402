// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! xTask ABI definitions, shared between the kernel, the Communication
//! Server, and tasks.
//!
//! This crate has no executable logic of its own. Everything here is either a
//! plain data type exchanged across a component boundary, or the fixed
//! wire-format encoding for such a type. Keeping these in one crate lets the
//! kernel, the CS, and task-facing userlib agree on layout without textually
//! depending on each other.

pub mod channel;
pub mod cs_protocol;
pub mod err;
pub mod kcall;
pub mod ring;

mod ids;
mod task;

pub use channel::{ObjectChannel, TaskEntry, WorkerEntry};
pub use cs_protocol::{CsNotification, CsReply, CsRequest};
pub use err::UsageError;
pub use ids::{BufferIndex, MailboxId, VcHandle};
pub use kcall::{Kcall, KcallNumber, KcallReturn};
pub use task::{Priority, TaskId};

/// Number of kernel calls defined by the ABI (`callnr` ranges 1..=12).
pub const KCALL_COUNT: usize = 12;

/// Number of pending-kernel-reply slots a Communication Server keeps per
/// attached kernel.
///
/// This is a latent resource limit in the source system: slot exhaustion is
/// a known bug there. We keep the same capacity here rather than silently
/// growing it, so that running out is at least something `xtask-cs` can
/// observe and report instead of the request simply vanishing.
pub const PKR_SLOTS: usize = 8;

/// Reserved mailbox return code meaning "ring frame delivered, recipient
/// received it".
pub const SEND_OUTBOX_DELIVERED: u32 = 0;
/// Reserved mailbox return code meaning "send failed" (recipient never
/// found, or the PRR protocol dropped the reply).
pub const SEND_OUTBOX_FAILED: u32 = 1;

/// Flag passed to `get_inbox` requesting that, if no sender is currently
/// pending, the CS broadcast a "mailbox N ready" frame on the ring so that
/// senders parked on other tiles get a chance to retry (ring frame type 4).
pub const ITC_ANYWHERE: u32 = 1;

/// A task priority that is numerically above all application priorities,
/// reserved for the per-kernel idle task.
pub const IDLE_PRIORITY: u8 = 7;
