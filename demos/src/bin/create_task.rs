// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Create task at run time: T1 prints "task 1" every 1000 ticks; on its
//! first iteration it calls `create_task` for T2, which then prints
//! "task 2" on the same cadence.

use std::time::Duration;

use clap::Parser;
use demos::system::Tile;
use demos::DemoArgs;
use xtask_abi::{Priority, TaskId};
use xtask_userlib::hl;

const T1: TaskId = TaskId(1);
const T2: TaskId = TaskId(2);
const IDLE: TaskId = TaskId(0);

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = DemoArgs::parse();

    let t1: xtask_abi::TaskEntry = Box::new(move || {
        let mut first = true;
        loop {
            hl::sleep_for(1000);
            println!("task 1");
            if first {
                first = false;
                hl::spawn_task(Priority(1), T2, || loop {
                    hl::sleep_for(1000);
                    println!("task 2");
                });
            }
        }
    });

    let tile = Tile::start(0, 3, IDLE, vec![(T1, Priority(1), t1)], None);
    tile.start_ticking(Duration::from_millis(1));

    std::thread::sleep(args.run_duration().max(Duration::from_millis(3200)));
    Ok(())
}
