// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dedicated worker send: T1 creates a local worker running
//! `infinite_receive`; T1 fills a buffer with a 4-byte counter and calls
//! `vc_send` in a loop, and the worker must observe 0, 1, 2, ... without
//! loss.

use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};
use demos::system::Tile;
use xtask_abi::{ObjectChannel, Priority, TaskEntry, TaskId, WorkerEntry};
use xtask_userlib::hl::Worker;

const T1: TaskId = TaskId(1);
const IDLE: TaskId = TaskId(0);

/// Accepts objects from the worker's inbound half and verifies the sequence.
fn infinite_receive(channel: ObjectChannel) {
    let mut expected: u32 = 0;
    while let Some(bytes) = channel.accept() {
        let value = BigEndian::read_u32(&bytes);
        assert_eq!(value, expected, "worker: expected {expected}, got {value}");
        println!("worker observed {value}");
        expected += 1;
    }
}

fn main() {
    env_logger::init();

    let t1: TaskEntry = Box::new(move || {
        let worker: WorkerEntry = Box::new(infinite_receive);
        let worker = Worker::spawn(worker, 4, 4, 4);
        for counter in 0u32..20 {
            let mut bytes = [0u8; 4];
            BigEndian::write_u32(&mut bytes, counter);
            let (_index, _capacity) = worker.send(bytes.to_vec());
        }
    });

    let tile = Tile::start(0, 2, IDLE, vec![(T1, Priority(1), t1)], None);
    tile.start_ticking(Duration::from_millis(1));

    std::thread::sleep(Duration::from_millis(500));
}
