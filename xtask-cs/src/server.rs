// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Communication Server's event loop and command dispatch.
//!
//! `CommServer` serves exactly one attached kernel -- the source design
//! allows several kernels per tile, but none of the testable end-to-end
//! scenarios exercise that, and task ids aren't qualified by kernel in the
//! data model, so disambiguating them would be invented complexity with
//! nothing to ground it against. See `DESIGN.md` for the full writeup.
//!
//! "One frame in flight per CS at a time" and the single-threaded
//! event loop mean every mutation below -- VC state, mailbox lists, the PRR
//! queue, the parked-sender list -- happens without any locking, same as
//! the source.

use std::sync::mpsc::{Receiver, Sender, SyncSender};

use log::{trace, warn};
use xtask_abi::ring::{self, RingFrame, RingMsgType};
use xtask_abi::{
    CsNotification, CsReply, CsRequest, MailboxId, SEND_OUTBOX_DELIVERED, SEND_OUTBOX_FAILED,
    TaskId, UsageError, VcHandle, WorkerEntry,
};

use crate::mailbox::{Mailbox, ParkedSend, ParkedSends};
use crate::notify::NotifySlots;
use crate::prr::{PrrList, PrrPayload};
use crate::vc::VirtualChannel;

/// One input to the CS's dispatch loop: the union of "N management-sync
/// endpoints, ring-in endpoint, all VC worker endpoints".
pub enum CsEvent {
    Management(CsRequest),
    /// A worker thread posted one object. `ack` is a rendezvous the
    /// forwarder thread (see `spawn_worker`) waits on before pulling the
    /// next object off the worker, so a full buffer backpressures the
    /// worker instead of having objects silently dropped.
    WorkerObject {
        handle: VcHandle,
        bytes: Vec<u8>,
        ack: SyncSender<()>,
    },
    RingIn(RingFrame),
}

/// A per-tile Communication Server.
pub struct CommServer {
    id: u32,
    events: Receiver<CsEvent>,
    events_tx: Sender<CsEvent>,
    reply_tx: SyncSender<CsReply>,
    notify_tx: Sender<CsNotification>,
    ring_out: Option<Sender<RingFrame>>,
    vcs: Vec<VirtualChannel>,
    mailboxes: Vec<Mailbox>,
    parked: ParkedSends,
    prr: PrrList,
    notify_slots: NotifySlots,
    /// Worker objects that arrived while their VC's read half had nowhere
    /// to put them, kept unacked so the worker's forwarder thread stays
    /// blocked until a `vc_receive` frees room.
    pending_worker_objects: Vec<(VcHandle, Vec<u8>, SyncSender<()>)>,
}

impl CommServer {
    pub fn new(
        id: u32,
        events: Receiver<CsEvent>,
        events_tx: Sender<CsEvent>,
        reply_tx: SyncSender<CsReply>,
        notify_tx: Sender<CsNotification>,
        ring_out: Option<Sender<RingFrame>>,
    ) -> Self {
        CommServer {
            id,
            events,
            events_tx,
            reply_tx,
            notify_tx,
            ring_out,
            vcs: Vec::new(),
            mailboxes: Vec::new(),
            parked: ParkedSends::new(),
            prr: PrrList::new(),
            notify_slots: NotifySlots::new(),
            pending_worker_objects: Vec::new(),
        }
    }

    pub fn run(&mut self) {
        while let Ok(event) = self.events.recv() {
            match event {
                CsEvent::Management(req) => self.handle_request(req),
                CsEvent::WorkerObject { handle, bytes, ack } => self.handle_worker_object(handle, bytes, ack),
                CsEvent::RingIn(frame) => self.handle_ring_frame(frame),
            }
        }
    }

    fn reply(&self, r: CsReply) {
        let _ = self.reply_tx.send(r);
    }

    fn notify(&mut self, n: CsNotification) {
        self.notify_slots.reserve();
        let _ = self.notify_tx.send(n);
    }

    fn find_vc_mut(&mut self, handle: VcHandle) -> Option<&mut VirtualChannel> {
        self.vcs.iter_mut().find(|vc| vc.handle() == handle)
    }

    /// First mailbox matching `id`, scanning front to back. Duplicate ids
    /// are never rejected at creation; this scan order
    /// means whichever registration happened first keeps the id for every
    /// later lookup, and a second `create_mailbox` with the same id is
    /// simply unreachable dead weight rather than an error.
    fn find_mailbox_mut(&mut self, id: MailboxId) -> Option<&mut Mailbox> {
        self.mailboxes.iter_mut().find(|m| m.id() == id)
    }

    fn spawn_worker(&self, entry: WorkerEntry) -> (Sender<Vec<u8>>, VcHandle) {
        use std::thread;

        let (to_worker_tx, to_worker_rx) = std::sync::mpsc::channel();
        let (from_worker_tx, from_worker_rx) = std::sync::mpsc::channel();
        let worker_side = xtask_abi::ObjectChannel::new(from_worker_tx, to_worker_rx);
        thread::spawn(move || entry(worker_side));

        let handle = VcHandle(self.vcs.len() as u32);
        let events_tx = self.events_tx.clone();
        thread::spawn(move || {
            while let Ok(bytes) = from_worker_rx.recv() {
                let (ack_tx, ack_rx) = std::sync::mpsc::sync_channel(0);
                if events_tx.send(CsEvent::WorkerObject { handle, bytes, ack: ack_tx }).is_err() {
                    break;
                }
                // Rendezvous with the event loop: don't pull the worker's
                // next object until this one has either been accepted or
                // queued, so a full buffer backpressures the worker thread
                // instead of objects being dropped under load.
                if ack_rx.recv().is_err() {
                    break;
                }
            }
        });

        (to_worker_tx, handle)
    }

    fn handle_request(&mut self, req: CsRequest) {
        match req {
            CsRequest::CreateThread { caller: _, worker, obj_size, rx_size, tx_size } => {
                let (to_worker, handle) = self.spawn_worker(worker);
                self.vcs.push(VirtualChannel::new(handle, obj_size, rx_size, tx_size, to_worker));
                self.reply(CsReply::Ready(xtask_abi::KcallReturn::VcHandle(handle)));
            }
            CsRequest::VcReceive { caller: _, handle, min_size } => {
                let Some(vc) = self.find_vc_mut(handle) else {
                    self.reply(CsReply::Fatal(UsageError::BadVcHandle));
                    return;
                };
                match vc.read_mut().receive(min_size) {
                    crate::vc::ReceiveOutcome::Ready(bytes) => {
                        self.reply(CsReply::Ready(xtask_abi::KcallReturn::VcBuffer(bytes)));
                        self.drain_pending_worker_object(handle);
                    }
                    crate::vc::ReceiveOutcome::Blocked => self.reply(CsReply::Pending),
                }
            }
            CsRequest::VcGetWriteBuf { caller: _, handle } => {
                let Some(vc) = self.find_vc_mut(handle) else {
                    self.reply(CsReply::Fatal(UsageError::BadVcHandle));
                    return;
                };
                let (index, capacity) = vc.write_mut().get_write_buf();
                self.reply(CsReply::Ready(xtask_abi::KcallReturn::VcWriteBuf { index, capacity }));
            }
            CsRequest::VcSend { caller: _, handle, index, bytes } => {
                let Some(vc) = self.find_vc_mut(handle) else {
                    self.reply(CsReply::Fatal(UsageError::BadVcHandle));
                    return;
                };
                let ((fresh_index, capacity), pumped) = vc.write_mut().send(index, bytes);
                self.reply(CsReply::Ready(xtask_abi::KcallReturn::VcWriteBuf {
                    index: fresh_index,
                    capacity,
                }));
                vc.pump_to_worker(&pumped);
                vc.write_mut().mark_drained(index);
            }
            CsRequest::CreateMailbox { caller, id, rx_size, tx_size } => {
                self.mailboxes.push(Mailbox::new(id, caller, rx_size, tx_size));
                self.reply(CsReply::Ready(xtask_abi::KcallReturn::Unit));
            }
            CsRequest::GetOutbox { caller: _, mailbox } => {
                let Some(m) = self.find_mailbox_mut(mailbox) else {
                    self.reply(CsReply::Fatal(UsageError::BadMailboxId));
                    return;
                };
                let capacity = m.tx_size();
                self.reply(CsReply::Ready(xtask_abi::KcallReturn::Code(capacity)));
            }
            CsRequest::CreateRemoteThread { caller, tile, worker, obj_size, rx_size, tx_size } => {
                self.reply(CsReply::Pending);
                match &self.ring_out {
                    None => {
                        self.notify(CsNotification::ThreadCreated { requester: caller, result: Err(()) });
                    }
                    Some(out) => {
                        trace!("create_remote_thread from {:?}: placing via ring (hint tile {})", caller, tile);
                        // The worker closure never leaves this process -- it
                        // rides along in the PRR entry and is spawned here
                        // once the ring round-trip confirms a placement. See
                        // DESIGN.md for why remote-tile VC service isn't
                        // modeled.
                        self.prr.push(PrrPayload::RemoteThread {
                            requester: caller,
                            worker,
                            obj_size,
                            rx_size,
                            tx_size,
                        });
                        let frame = RingFrame::new(self.id, RingMsgType::CreateRemoteWorker, ring::status::NOT_FOUND, Vec::new());
                        let _ = out.send(frame);
                    }
                }
            }
            CsRequest::SendOutbox { caller, sender, outbox, recipient } => {
                self.reply(CsReply::Pending);
                self.send_outbox(caller, sender, recipient, outbox);
            }
            CsRequest::GetInbox { caller, mailbox, anywhere } => {
                self.reply(CsReply::Pending);
                self.get_inbox(caller, mailbox, anywhere);
            }
            CsRequest::AckNotify => {
                self.notify_slots.release();
            }
        }
    }

    fn handle_worker_object(&mut self, handle: VcHandle, bytes: Vec<u8>, ack: SyncSender<()>) {
        let Some(vc) = self.find_vc_mut(handle) else {
            let _ = ack.send(());
            return;
        };
        if !vc.read_mut().has_room() {
            // No free/claimable buffer right now. Leave `ack` unsent so the
            // worker's forwarder thread stays blocked -- the object is
            // replayed via `drain_pending_worker_object` once a
            // `vc_receive` frees room, instead of being dropped.
            self.pending_worker_objects.push((handle, bytes, ack));
            return;
        }
        if let crate::vc::ArrivalOutcome::WakeReceiver(bytes) = vc.read_mut().worker_object_arrived(&bytes) {
            self.notify(CsNotification::VcBufferReady { handle, bytes });
        }
        let _ = ack.send(());
    }

    /// Replays one queued worker object for `handle`, if any, now that a
    /// `vc_receive` has freed room on its read half.
    fn drain_pending_worker_object(&mut self, handle: VcHandle) {
        let Some(pos) = self.pending_worker_objects.iter().position(|(h, _, _)| *h == handle) else {
            return;
        };
        let (handle, bytes, ack) = self.pending_worker_objects.remove(pos);
        self.handle_worker_object(handle, bytes, ack);
    }

    fn send_outbox(&mut self, sender_task: TaskId, sender_mailbox: MailboxId, recipient: MailboxId, bytes: Vec<u8>) {
        let recipient_here = self.find_mailbox_mut(recipient).is_some();
        if !recipient_here {
            if let Some(out) = &self.ring_out {
                self.prr.push(PrrPayload::Outbox { sender: sender_task, sender_mailbox, recipient, bytes: bytes.clone() });
                let payload = ring::encode_outbox_payload(recipient, &bytes);
                let frame = RingFrame::new(self.id, RingMsgType::DeliverOutbox, ring::status::NOT_FOUND, payload);
                let _ = out.send(frame);
            } else {
                self.notify(CsNotification::OutboxSent { requester: sender_task, code: SEND_OUTBOX_FAILED });
            }
            return;
        }

        let waiting = self.find_mailbox_mut(recipient).map(|m| m.is_waiting()).unwrap_or(false);
        if waiting {
            let recipient_owner = {
                let m = self.find_mailbox_mut(recipient).unwrap();
                m.deliver(bytes.clone());
                m.set_waiting(false);
                m.owner()
            };
            self.notify(CsNotification::InboxDelivered { requester: recipient_owner, bytes });
            self.notify(CsNotification::OutboxSent { requester: sender_task, code: SEND_OUTBOX_DELIVERED });
        } else {
            self.parked.push(ParkedSend { sender: sender_task, outbox_mailbox: sender_mailbox, recipient, bytes });
            if let Some(m) = self.find_mailbox_mut(recipient) {
                m.set_sender_pending(true);
            }
        }
    }

    fn get_inbox(&mut self, caller: TaskId, mailbox: MailboxId, anywhere: bool) {
        if let Some(m) = self.find_mailbox_mut(mailbox) {
            m.set_waiting(true);
        }

        if let Some(parked) = self.parked.take_first_for(mailbox) {
            if let Some(m) = self.find_mailbox_mut(mailbox) {
                m.deliver(parked.bytes.clone());
                m.set_waiting(false);
                m.set_sender_pending(self.parked.has_pending_for(mailbox));
            }
            self.notify(CsNotification::InboxDelivered { requester: caller, bytes: parked.bytes });
            self.notify(CsNotification::OutboxSent { requester: parked.sender, code: SEND_OUTBOX_DELIVERED });
            return;
        }

        if anywhere {
            if let Some(out) = &self.ring_out {
                let payload = ring::encode_mailbox_id(mailbox);
                let frame = RingFrame::new(self.id, RingMsgType::MailboxReady, 0, payload);
                let _ = out.send(frame);
            }
        }
    }

    fn handle_ring_frame(&mut self, frame: RingFrame) {
        if frame.is_own(self.id) {
            self.handle_own_frame(frame);
        } else {
            let forwarded = self.handle_foreign_frame(frame);
            if let Some(out) = &self.ring_out {
                let _ = out.send(forwarded);
            }
        }
    }

    fn handle_own_frame(&mut self, frame: RingFrame) {
        match frame.msg_type {
            RingMsgType::Probe => {
                trace!("ring probe returned to origin, {} CS ids observed", frame.payload.len() / 4);
            }
            RingMsgType::CreateRemoteWorker => {
                let Some(PrrPayload::RemoteThread { requester, worker, obj_size, rx_size, tx_size }) =
                    self.prr.pop_front()
                else {
                    warn!("CreateRemoteWorker own-frame with no matching PRR entry");
                    return;
                };
                if frame.status == ring::status::DELIVERED {
                    let (to_worker, handle) = self.spawn_worker(worker);
                    self.vcs.push(VirtualChannel::new(handle, obj_size, rx_size, tx_size, to_worker));
                    self.notify(CsNotification::ThreadCreated { requester, result: Ok(handle) });
                } else {
                    self.notify(CsNotification::ThreadCreated { requester, result: Err(()) });
                }
            }
            RingMsgType::DeliverOutbox => {
                let Some(PrrPayload::Outbox { sender, sender_mailbox, recipient: _, bytes }) = self.prr.pop_front()
                else {
                    warn!("DeliverOutbox own-frame with no matching PRR entry");
                    return;
                };
                match frame.status {
                    ring::status::DELIVERED => {
                        self.notify(CsNotification::OutboxSent { requester: sender, code: SEND_OUTBOX_DELIVERED });
                    }
                    ring::status::RECIPIENT_NOT_READY => {
                        if let Ok((recipient, _)) = ring::decode_outbox_payload(&frame.payload) {
                            self.parked.push(ParkedSend { sender, outbox_mailbox: sender_mailbox, recipient, bytes });
                        }
                    }
                    _ => {
                        warn!("outbox to unknown recipient dropped; sender {:?} blocked forever", sender);
                        self.notify(CsNotification::OutboxSent { requester: sender, code: SEND_OUTBOX_FAILED });
                    }
                }
            }
            RingMsgType::MailboxReady => {}
        }
    }

    fn handle_foreign_frame(&mut self, mut frame: RingFrame) -> RingFrame {
        match frame.msg_type {
            RingMsgType::Probe => {
                frame.payload.extend_from_slice(&self.id.to_be_bytes());
                frame
            }
            RingMsgType::CreateRemoteWorker => {
                if frame.status == ring::status::NOT_FOUND {
                    frame.status = ring::status::DELIVERED;
                }
                frame
            }
            RingMsgType::DeliverOutbox => {
                if let Ok((recipient, bytes)) = ring::decode_outbox_payload(&frame.payload) {
                    if let Some(m) = self.find_mailbox_mut(recipient) {
                        if m.is_waiting() {
                            let owner = m.owner();
                            m.deliver(bytes.clone());
                            m.set_waiting(false);
                            frame.status = ring::status::DELIVERED;
                            self.notify(CsNotification::InboxDelivered { requester: owner, bytes });
                        } else {
                            m.set_sender_pending(true);
                            frame.status = ring::status::RECIPIENT_NOT_READY;
                        }
                    }
                }
                frame
            }
            RingMsgType::MailboxReady => {
                if let Ok(mailbox) = ring::decode_mailbox_id(&frame.payload) {
                    for parked in self.parked.drain_for(mailbox) {
                        self.prr.push(PrrPayload::Outbox {
                            sender: parked.sender,
                            sender_mailbox: parked.outbox_mailbox,
                            recipient: mailbox,
                            bytes: parked.bytes.clone(),
                        });
                        let payload = ring::encode_outbox_payload(mailbox, &parked.bytes);
                        let retry = RingFrame::new(self.id, RingMsgType::DeliverOutbox, ring::status::NOT_FOUND, payload);
                        if let Some(out) = &self.ring_out {
                            let _ = out.send(retry);
                        }
                    }
                }
                frame
            }
        }
    }
}
