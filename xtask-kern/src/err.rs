// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel-side error handling.
//!
//! A kcall implementation returns `Result<KcallReturn, CallError>` instead of
//! picking its own ad hoc failure shape. `CallError` keeps the two tiers that
//! matter at this layer distinct: a response code the caller can act on
//! (`Recoverable`), and a misuse severe enough that the calling task is torn
//! down (`Fatal`). The other two tiers from the taxonomy -- transient CS-side
//! drops and resource exhaustion -- surface as specific `Recoverable` codes
//! rather than their own variant, since from the kernel's point of view both
//! just mean "tell the task it didn't work."

use xtask_abi::UsageError;

/// An error raised while servicing a kcall.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CallError {
    /// Hand the caller back a response code; it stays alive and runnable.
    Recoverable(u32),
    /// The call was malformed badly enough that the caller is killed instead
    /// of answered.
    Fatal(UsageError),
}

impl From<UsageError> for CallError {
    fn from(e: UsageError) -> Self {
        CallError::Fatal(e)
    }
}
