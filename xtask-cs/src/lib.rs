// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-tile Communication Server.
//!
//! Each tile runs one `CommServer` alongside its kernel: a single-threaded
//! state machine that owns every virtual channel, mailbox, and ring-bus
//! transaction for that tile. The kernel never touches this state directly --
//! it only ever exchanges `CsRequest`/`CsReply`/`CsNotification` values with
//! it, same as the source design's fixed per-tile CS/kernel pairing.

pub mod mailbox;
pub mod notify;
pub mod prr;
pub mod server;
pub mod vc;

pub use server::{CommServer, CsEvent};
