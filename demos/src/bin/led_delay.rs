// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Task delay toggles LED: T1 alternates `delay(250)` / set / `delay(250)` /
//! clear forever; after 500 ticks the LED has toggled twice, after 1000 four
//! times.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use demos::system::Tile;
use demos::DemoArgs;
use xtask_abi::{Priority, TaskId};
use xtask_userlib::hl;

const T1: TaskId = TaskId(1);
const IDLE: TaskId = TaskId(0);

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = DemoArgs::parse();

    let lit = Arc::new(AtomicBool::new(false));
    let toggles = Arc::new(AtomicU32::new(0));

    let task_lit = lit.clone();
    let task_toggles = toggles.clone();
    let t1: xtask_abi::TaskEntry = Box::new(move || loop {
        hl::sleep_for(250);
        task_lit.store(true, Ordering::SeqCst);
        task_toggles.fetch_add(1, Ordering::SeqCst);
        println!("leds on (toggle {})", task_toggles.load(Ordering::SeqCst));

        hl::sleep_for(250);
        task_lit.store(false, Ordering::SeqCst);
        task_toggles.fetch_add(1, Ordering::SeqCst);
        println!("leds off (toggle {})", task_toggles.load(Ordering::SeqCst));
    });

    let tile = Tile::start(0, 2, IDLE, vec![(T1, Priority(1), t1)], None);
    tile.start_ticking(Duration::from_millis(1));

    std::thread::sleep(args.run_duration());
    println!("toggles after ~1000 ticks: {}", toggles.load(Ordering::SeqCst));
    Ok(())
}
