// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dedicated worker receive: T1 creates a local worker running
//! `infinite_send`, which emits a u32 counter every object time. With
//! `rx_buf_size = tx_buf_size = 4`, T1 calls `vc_receive(h, 0)` in a loop;
//! successive buffers must carry strictly increasing u32 values with no
//! gaps.

use std::thread;
use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};
use demos::system::Tile;
use xtask_abi::{ObjectChannel, Priority, TaskEntry, TaskId, WorkerEntry};
use xtask_userlib::hl::Worker;

const T1: TaskId = TaskId(1);
const IDLE: TaskId = TaskId(0);

/// Emits an incrementing u32 counter, one object per tick of its own pace.
fn infinite_send(channel: ObjectChannel) {
    let mut counter: u32 = 0;
    loop {
        let mut bytes = [0u8; 4];
        BigEndian::write_u32(&mut bytes, counter);
        if !channel.emit(bytes.to_vec()) {
            break;
        }
        counter += 1;
        thread::sleep(Duration::from_millis(5));
    }
}

fn main() {
    env_logger::init();

    let t1: TaskEntry = Box::new(move || {
        let worker: WorkerEntry = Box::new(infinite_send);
        let worker = Worker::spawn(worker, 4, 4, 4);
        let mut expected: u32 = 0;
        for _ in 0..20 {
            let bytes = worker.receive(0);
            let value = BigEndian::read_u32(&bytes);
            assert_eq!(value, expected, "worker receive: expected {expected}, got {value}");
            println!("received {value}");
            expected += 1;
        }
    });

    let tile = Tile::start(0, 2, IDLE, vec![(T1, Priority(1), t1)], None);
    tile.start_ticking(Duration::from_millis(1));

    std::thread::sleep(Duration::from_millis(500));
}
