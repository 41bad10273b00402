// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Virtual-channel buffer state machine.
//!
//! The source system tracks each buffer's ownership with six independent
//! flag bits per half (read/write), several of which can never legally be
//! set together. Rather than carry that encoding forward, each buffer gets
//! an explicit state (`BufferState`) and the two block-the-producer /
//! block-the-consumer conditions (`cs_block`, `task_block`) live alongside
//! it as plain booleans. A buffer's state and the half's block flags
//! together cover exactly the same ground as the original six bits, with
//! illegal combinations unrepresentable instead of merely undocumented.

use std::sync::mpsc::Sender;

use xtask_abi::{BufferIndex, VcHandle};

/// State of one of a half's two buffers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BufferState {
    /// Nobody owns this buffer; it's available to be claimed.
    Free,
    /// The CS is accumulating worker objects into it.
    CsFilling,
    /// Full (or as full as it'll get before being handed over); `first`
    /// records whether this buffer filled before its sibling, used to
    /// break the tie when both are `Filled` at once.
    Filled { first: bool },
    /// The task currently holds this buffer.
    TaskHolding,
}

/// Outcome of a `vc_receive` call against one half.
pub enum ReceiveOutcome {
    Ready(Vec<u8>),
    Blocked,
}

/// Outcome of a worker object arriving on the read half.
pub enum ArrivalOutcome {
    /// Nothing to hand to the task yet.
    Accepted,
    /// A blocked task can now be woken with this buffer's bytes.
    WakeReceiver(Vec<u8>),
}

/// One direction (read or write) of a virtual channel's double buffer.
pub struct Half {
    object_size: u32,
    capacity: u32,
    states: [BufferState; 2],
    data: [Vec<u8>; 2],
    cs_block: bool,
    task_block: bool,
    min_read_size: u32,
}

impl Half {
    pub fn new(object_size: u32, capacity: u32) -> Self {
        Half {
            object_size,
            capacity,
            states: [BufferState::Free, BufferState::Free],
            data: [Vec::new(), Vec::new()],
            cs_block: false,
            task_block: false,
            min_read_size: 0,
        }
    }

    fn other(i: usize) -> usize {
        1 - i
    }

    fn is_filled(&self, i: usize) -> bool {
        matches!(self.states[i], BufferState::Filled { .. })
    }

    /// True if the CS currently has somewhere to put the next worker
    /// object -- mirrors "re-enable worker events" / "disable the event".
    pub fn has_room(&self) -> bool {
        !self.cs_block
    }

    /// `vc_receive(min_size)` against this half.
    pub fn receive(&mut self, min_size: u32) -> ReceiveOutcome {
        for i in 0..2 {
            if matches!(self.states[i], BufferState::TaskHolding) {
                self.states[i] = BufferState::Free;
                self.data[i].clear();
            }
        }

        let (filled0, filled1) = (self.is_filled(0), self.is_filled(1));
        let picked = if filled0 && filled1 {
            let first = match (&self.states[0], &self.states[1]) {
                (BufferState::Filled { first: true }, _) => 0,
                _ => 1,
            };
            Some(first)
        } else if filled0 {
            Some(0)
        } else if filled1 {
            Some(1)
        } else if min_size > 0 {
            (0..2).find(|&i| {
                matches!(self.states[i], BufferState::CsFilling) && self.data[i].len() as u32 >= min_size
            })
        } else {
            None
        };

        match picked {
            Some(i) => {
                self.states[i] = BufferState::TaskHolding;
                self.cs_block = false;
                ReceiveOutcome::Ready(std::mem::take(&mut self.data[i]))
            }
            None => {
                self.task_block = true;
                self.min_read_size = min_size;
                ReceiveOutcome::Blocked
            }
        }
    }

    /// One fixed-size object arrived from the worker.
    pub fn worker_object_arrived(&mut self, object: &[u8]) -> ArrivalOutcome {
        let target = (0..2).find(|&i| matches!(self.states[i], BufferState::CsFilling)).or_else(|| {
            [1usize, 0usize]
                .into_iter()
                .find(|&i| !matches!(self.states[i], BufferState::TaskHolding | BufferState::Filled { .. }))
        });

        let Some(i) = target else {
            self.cs_block = true;
            return ArrivalOutcome::Accepted;
        };

        self.states[i] = BufferState::CsFilling;
        self.data[i].extend_from_slice(object);
        let used = self.data[i].len() as u32;

        if self.capacity.saturating_sub(used) < self.object_size {
            let sibling_filled = self.is_filled(Self::other(i));
            self.states[i] = BufferState::Filled { first: !sibling_filled };
        }

        let ready_to_wake = self.task_block
            && (used >= self.min_read_size && self.min_read_size > 0
                || matches!(self.states[i], BufferState::Filled { .. }));

        if ready_to_wake {
            self.task_block = false;
            self.states[i] = BufferState::TaskHolding;
            ArrivalOutcome::WakeReceiver(std::mem::take(&mut self.data[i]))
        } else {
            ArrivalOutcome::Accepted
        }
    }

    /// `vc_get_write_buf` against this half: hand back a free buffer,
    /// reusing the one the task isn't currently holding if nothing is
    /// strictly free.
    pub fn get_write_buf(&mut self) -> (BufferIndex, u32) {
        let idx = (0..2)
            .find(|&i| matches!(self.states[i], BufferState::Free))
            .or_else(|| (0..2).find(|&i| !matches!(self.states[i], BufferState::TaskHolding)))
            .unwrap_or(0);
        self.states[idx] = BufferState::TaskHolding;
        self.data[idx].clear();
        let index = if idx == 0 { BufferIndex::Zero } else { BufferIndex::One };
        (index, self.capacity)
    }

    /// `vc_send`: the task handed back buffer `index` filled with `bytes`.
    /// Returns the buffer now offered as the fresh write buffer, and the
    /// bytes to pump to the worker.
    pub fn send(&mut self, index: BufferIndex, bytes: Vec<u8>) -> ((BufferIndex, u32), Vec<u8>) {
        let i = index.as_usize();
        self.states[i] = BufferState::Filled { first: false };
        self.data[i] = bytes;
        let fresh = self.get_write_buf();
        let pumped = std::mem::take(&mut self.data[i]);
        (fresh, pumped)
    }

    /// Marks a write buffer as drained after the synchronous object pump
    /// completes.
    pub fn mark_drained(&mut self, index: BufferIndex) {
        let i = index.as_usize();
        if matches!(self.states[i], BufferState::Filled { .. }) {
            self.states[i] = BufferState::Free;
        }
    }

    pub fn object_size(&self) -> u32 {
        self.object_size
    }
}

/// A virtual channel: a worker thread's dedicated link to its owning task,
/// mediated entirely by this CS.
pub struct VirtualChannel {
    handle: VcHandle,
    read: Half,
    write: Half,
    to_worker: Sender<Vec<u8>>,
}

impl VirtualChannel {
    pub fn new(handle: VcHandle, object_size: u32, rx_size: u32, tx_size: u32, to_worker: Sender<Vec<u8>>) -> Self {
        VirtualChannel {
            handle,
            read: Half::new(object_size, rx_size),
            write: Half::new(object_size, tx_size),
            to_worker,
        }
    }

    pub fn handle(&self) -> VcHandle {
        self.handle
    }

    pub fn read_mut(&mut self) -> &mut Half {
        &mut self.read
    }

    pub fn write_mut(&mut self) -> &mut Half {
        &mut self.write
    }

    /// Pumps `bytes` to the worker one `object_size`-sized object at a
    /// time. Highest-word-first is a register-ABI concern the source cares
    /// about that a byte buffer does not, so this just forwards whole
    /// objects in order.
    pub fn pump_to_worker(&self, bytes: &[u8]) {
        let object_size = self.write.object_size() as usize;
        if object_size == 0 {
            return;
        }
        for chunk in bytes.chunks(object_size) {
            let _ = self.to_worker.send(chunk.to_vec());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_blocks_then_delivers_on_fill() {
        let mut half = Half::new(4, 8);
        assert!(matches!(half.receive(0), ReceiveOutcome::Blocked));
        assert!(matches!(half.worker_object_arrived(&[1, 2, 3, 4]), ArrivalOutcome::WakeReceiver(_)));
    }

    #[test]
    fn receive_respects_min_size_watermark() {
        let mut half = Half::new(4, 16);
        assert!(matches!(half.receive(8), ReceiveOutcome::Blocked));
        assert!(matches!(half.worker_object_arrived(&[0; 4]), ArrivalOutcome::Accepted));
        match half.worker_object_arrived(&[0; 4]) {
            ArrivalOutcome::WakeReceiver(bytes) => assert_eq!(bytes.len(), 8),
            ArrivalOutcome::Accepted => panic!("expected wake once watermark reached"),
        }
    }

    #[test]
    fn write_buf_round_trip_marks_free_after_pump() {
        let mut half = Half::new(4, 8);
        let (idx, cap) = half.get_write_buf();
        assert_eq!(cap, 8);
        let ((next_idx, _), pumped) = half.send(idx, vec![1, 2, 3, 4]);
        assert_ne!(next_idx.as_usize(), idx.as_usize());
        assert_eq!(pumped, vec![1, 2, 3, 4]);
        half.mark_drained(idx);
    }
}
