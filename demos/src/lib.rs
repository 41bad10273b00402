// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Board-description glue: wires a `Kernel` and a `CommServer` into a
//! running tile, the way a board crate wires `kernel(...)` and
//! `comserver(...)` to real hardware.
//!
//! This is demo-only scaffolding, not part of the kernel/CS/userlib
//! components themselves -- a different host program (an embedded image
//! builder, say) would replace it without touching any of those crates.

pub mod system;

use std::time::Duration;

use clap::Parser;

/// Shared CLI surface for the demo binaries: how long to let the tile(s)
/// run before the process exits.
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// How long to run before exiting, in milliseconds.
    #[clap(long, default_value = "1500")]
    pub run_ms: u64,
}

impl DemoArgs {
    pub fn run_duration(&self) -> Duration {
        Duration::from_millis(self.run_ms)
    }
}
