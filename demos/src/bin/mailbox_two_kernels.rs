// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inter-task message, same tile, two kernels: T1 on kernel 0's mailbox 1
//! sends an incrementing u32 every 200 ticks to T2 on kernel 1's mailbox 2.
//! Modeled as two CS-and-kernel tiles joined by a two-node ring (see
//! `demos::system` module docs) rather than one CS shared by two kernels;
//! the mailbox delivery T2 observes is the same either way.

use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};
use clap::Parser;
use demos::system::start_ring_pair;
use demos::DemoArgs;
use xtask_abi::{MailboxId, Priority, TaskEntry, TaskId};
use xtask_userlib::hl::{self, Mailbox};

const SENDER: TaskId = TaskId(1);
const RECEIVER: TaskId = TaskId(1);
const IDLE: TaskId = TaskId(0);

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = DemoArgs::parse();

    let sender: TaskEntry = Box::new(move || {
        let mailbox = Mailbox::create(MailboxId(1), 256, 4);
        let mut counter: u32 = 0;
        loop {
            hl::sleep_for(200);
            let mut bytes = [0u8; 4];
            BigEndian::write_u32(&mut bytes, counter);
            mailbox.send(MailboxId(2), bytes.to_vec());
            counter += 1;
        }
    });

    let receiver: TaskEntry = Box::new(move || {
        let mailbox = Mailbox::create(MailboxId(2), 4, 256);
        loop {
            let bytes = mailbox.recv();
            let value = BigEndian::read_u32(&bytes);
            println!("4 bytes received, value: {value}");
        }
    });

    let (a, _b) = start_ring_pair(
        2,
        IDLE,
        vec![(SENDER, Priority(1), sender)],
        vec![(RECEIVER, Priority(1), receiver)],
    );
    a.start_ticking(Duration::from_millis(1));

    std::thread::sleep(args.run_duration());
    Ok(())
}
