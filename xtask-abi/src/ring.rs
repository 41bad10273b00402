// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ring-bus wire format.
//!
//! One frame is in flight per CS at a time: a CS finishes processing (or
//! forwarding) the frame it holds before accepting the next one from its
//! ring-in endpoint. The hosted ring bus passes `RingFrame` values directly
//! over native channels rather than serialized bytes, so only the payload
//! codecs below (outbox bytes, mailbox ids) need a wire encoding -- those are
//! what actually cross the ring-in/ring-out channel boundary between tiles.

use byteorder::{BigEndian, ByteOrder};

use crate::ids::MailboxId;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum RingMsgType {
    /// Connectivity probe: each CS appends its id and forwards.
    Probe = 1,
    /// Create a worker thread on a remote tile.
    CreateRemoteWorker = 2,
    /// Deliver a mailbox outbox to a recipient on another tile.
    DeliverOutbox = 3,
    /// Broadcast "mailbox N is ready to receive".
    MailboxReady = 4,
}

/// Status codes carried in a ring frame's reply leg. Meaning is per
/// `msg_type`.
pub mod status {
    pub const NOT_FOUND: u8 = 0;
    pub const DELIVERED: u8 = 1;
    pub const RECIPIENT_NOT_READY: u8 = 2;
}

/// A single frame circulating on the ring bus.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RingFrame {
    /// CS id that first emitted this frame. Used for own-frame detection: a
    /// CS that sees `origin_cs_id == self.id` knows the frame has completed
    /// one full circuit and should consume rather than forward it.
    pub origin_cs_id: u32,
    pub msg_type: RingMsgType,
    pub status: u8,
    pub payload: Vec<u8>,
}

impl RingFrame {
    pub fn new(origin_cs_id: u32, msg_type: RingMsgType, status: u8, payload: Vec<u8>) -> Self {
        Self { origin_cs_id, msg_type, status, payload }
    }

    pub fn is_own(&self, self_cs_id: u32) -> bool {
        self.origin_cs_id == self_cs_id
    }
}

/// Payload for a type-3 frame: the target mailbox id followed by the raw
/// outbox bytes.
pub fn encode_outbox_payload(recipient: MailboxId, bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + bytes.len());
    let mut id_bytes = [0u8; 4];
    BigEndian::write_u32(&mut id_bytes, recipient.0);
    out.extend_from_slice(&id_bytes);
    out.extend_from_slice(bytes);
    out
}

pub fn decode_outbox_payload(payload: &[u8]) -> Result<(MailboxId, Vec<u8>), ()> {
    if payload.len() < 4 {
        return Err(());
    }
    let id = BigEndian::read_u32(&payload[0..4]);
    Ok((MailboxId(id), payload[4..].to_vec()))
}

/// Payload for a type-4 frame: just the mailbox id.
pub fn encode_mailbox_id(id: MailboxId) -> Vec<u8> {
    let mut out = vec![0u8; 4];
    BigEndian::write_u32(&mut out, id.0);
    out
}

pub fn decode_mailbox_id(payload: &[u8]) -> Result<MailboxId, ()> {
    if payload.len() < 4 {
        return Err(());
    }
    Ok(MailboxId(BigEndian::read_u32(&payload[0..4])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbox_payload_round_trips() {
        let payload = encode_outbox_payload(MailboxId(9), &[1, 2, 3]);
        let (id, bytes) = decode_outbox_payload(&payload).unwrap();
        assert_eq!(id, MailboxId(9));
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn own_frame_detection() {
        let frame = RingFrame::new(7, RingMsgType::Probe, 0, vec![]);
        assert!(frame.is_own(7));
        assert!(!frame.is_own(8));
    }
}
