// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cross-tile mailbox with ring: T1 on tile 0 mailbox 1 sends every 200
//! ticks to T2 on tile 1 mailbox 2, which receives with `ITC_ANYWHERE`. The
//! first message may be dropped if T2 hasn't called `get_inbox` yet (the
//! status-2 "recipient not ready" path, recovered by a type-4 broadcast
//! once T2 does); from the first successful receive onward every send must
//! be delivered in order.

use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};
use clap::Parser;
use demos::system::start_ring_pair;
use demos::DemoArgs;
use xtask_abi::{MailboxId, Priority, TaskEntry, TaskId};
use xtask_userlib::hl::{self, Mailbox};

const T1: TaskId = TaskId(1);
const T2: TaskId = TaskId(1);
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
            let code = mailbox.send(MailboxId(2), bytes.to_vec());
            println!("tile-0 sent {counter} (code {code})");
            counter += 1;
        }
    });

    let receiver: TaskEntry = Box::new(move || {
        let mailbox = Mailbox::create(MailboxId(2), 4, 256);
        let mut last = None;
        loop {
            let bytes = mailbox.recv_anywhere();
            let value = BigEndian::read_u32(&bytes);
            if let Some(prev) = last {
                assert_eq!(value, prev + 1, "gap or reorder: prev {prev}, got {value}");
            }
            println!("tile-1 received {value}");
            last = Some(value);
        }
    });

    let (a, _b) = start_ring_pair(
        2,
        IDLE,
        vec![(T1, Priority(1), sender)],
        vec![(T2, Priority(1), receiver)],
    );
    a.start_ticking(Duration::from_millis(1));

    std::thread::sleep(args.run_duration());
    Ok(())
}
