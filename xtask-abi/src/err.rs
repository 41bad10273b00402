// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error taxonomy shared by the kernel and the Communication Server.
//!
//! The source system distinguishes four tiers: transient errors a caller can
//! retry, silent structural drops that "should never happen", resource
//! exhaustion, and fatal misuse. We keep that shape rather than collapsing
//! everything into one bag-of-errors type, so each tier's handling policy
//! stays visible at the call site.

/// A misuse of a kernel call severe enough that the offending task should be
/// aborted rather than handed a response code.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum UsageError {
    #[error("unknown kernel call number {0}")]
    BadCallNumber(u32),
    #[error("invalid virtual channel handle")]
    BadVcHandle,
    #[error("invalid mailbox id")]
    BadMailboxId,
}
