//! Demo for the `quorum-sync` primitives.
//!
//! Spawns a pool of writers bumping a ticket-locked counter, readers
//! sampling it, and a shared `AtomicCell` tallying every operation, then
//! rendezvouses the pool on a `CancellableBarrier` before printing totals.

use quorum_sync::{AtomicCell, CancellableBarrier, TicketRwLock};
use std::sync::Arc;
use std::thread;

const WRITERS: usize = 4;
const READERS: usize = 4;
const OPS: usize = 100_000;

fn main() {
    println!("quorum-sync demo: {WRITERS} writers, {READERS} readers, {OPS} ops each");

    let counter = Arc::new(TicketRwLock::new(0u64));
    let ops_done = Arc::new(AtomicCell::new(0u64));
    let barrier = Arc::new(CancellableBarrier::new(WRITERS + READERS));

    let mut threads = Vec::with_capacity(WRITERS + READERS);

    for _ in 0..WRITERS {
        let counter = counter.clone();
        let ops_done = ops_done.clone();
        let barrier = barrier.clone();
        threads.push(thread::spawn(move || {
            for _ in 0..OPS {
                *counter.write() += 1;
                ops_done.inc();
            }
            barrier.wait();
        }));
    }

    for _ in 0..READERS {
        let counter = counter.clone();
        let ops_done = ops_done.clone();
        let barrier = barrier.clone();
        threads.push(thread::spawn(move || {
            let mut last = 0;
            for _ in 0..OPS {
                last = *counter.read();
                ops_done.inc();
            }
            barrier.wait();
            let _ = last;
        }));
    }

    for t in threads {
        let _ = t.join();
    }

    println!("counter = {}", *counter.read());
    println!("ops     = {}", ops_done.get());
}
