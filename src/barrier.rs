//! # Cancellable sense-reversing barrier
//!
//! A reusable rendezvous point for a fixed number of threads, with an
//! explicit cancellation path that releases every waiter without the
//! arrival count ever being reached.
//!
//! The barrier alternates between two generations distinguished by a
//! boolean *sense*. Each waiter records the sense it saw on entry and
//! sleeps until the release flag flips to that value; the last arrival of
//! a generation performs the flip and wakes everyone. Because consecutive
//! generations listen on opposite values, a thread that arrives late for
//! generation g cannot be released by the fall of generation g-1 — the
//! stale-release race inherent to a single-bit flag.
//!
//! Unlike the spin locks in this crate, [`wait`](CancellableBarrier::wait)
//! blocks on a condition variable and releases the CPU; the module is
//! therefore only available with the `std` feature (the privileged context
//! supplies its own blocking rendezvous).
//!
//! ## Example
//! ```rust
//! use quorum_sync::CancellableBarrier;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let barrier = Arc::new(CancellableBarrier::new(3));
//! let handles: Vec<_> = (0..3)
//!     .map(|_| {
//!         let barrier = barrier.clone();
//!         thread::spawn(move || barrier.wait())
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//! ```

use crate::backend::sync::{Condvar, Mutex};
use crate::backend::{AtomicBool, Ordering};

struct BarrierState {
    /// Arrivals required to fall.
    needed: usize,
    /// Threads waiting in the current generation.
    called: usize,
    /// Sense of the current generation.
    sense: bool,
    /// Sense value whose generation has been released.
    release: bool,
    /// Authoritative liveness; false once cancelled.
    alive: bool,
}

/// A sense-reversing barrier with a cancellation escape hatch.
///
/// `wait()` completes when `needed` threads have arrived in the current
/// generation, or immediately once [`cancel`](Self::cancel) has been
/// called. A cancelled barrier stays dead: no later generation exists and
/// every subsequent `wait()` is a no-op.
pub struct CancellableBarrier {
    state: Mutex<BarrierState>,
    cond: Condvar,
    // Mirror of `state.alive` so wait() after cancellation returns
    // without taking the mutex. The mutex copy stays authoritative for
    // threads already inside.
    alive: AtomicBool,
}

impl CancellableBarrier {
    /// Creates a barrier that falls when `needed` threads have called
    /// [`wait`](Self::wait).
    pub fn new(needed: usize) -> Self {
        CancellableBarrier {
            state: Mutex::new(BarrierState {
                needed,
                called: 0,
                sense: false,
                release: true,
                alive: true,
            }),
            cond: Condvar::new(),
            alive: AtomicBool::new(true),
        }
    }

    /// Blocks until the current generation's arrival count is reached, or
    /// the barrier is cancelled.
    ///
    /// The last arrival resets the count, flips the sense, and wakes the
    /// whole generation; it does not block.
    pub fn wait(&self) {
        if !self.alive.load(Ordering::SeqCst) {
            return;
        }

        let mut st = self.state.lock().unwrap();
        if !st.alive {
            return;
        }

        st.called += 1;
        let listening_on = st.sense;

        if st.called == st.needed {
            // Last arrival: release this generation and open the next.
            st.called = 0;
            st.release = st.sense;
            st.sense = !st.sense;
            self.cond.notify_all();
        } else {
            while st.release != listening_on && st.alive {
                st = self.cond.wait(st).unwrap();
            }
        }
    }

    /// Kills the barrier, releasing every waiter immediately.
    ///
    /// `needed` never has to be reached; all blocked threads return, and
    /// every future [`wait`](Self::wait) call is a no-op. The barrier
    /// cannot be revived.
    pub fn cancel(&self) {
        let mut st = self.state.lock().unwrap();
        st.alive = false;
        self.alive.store(false, Ordering::SeqCst);
        drop(st);
        self.cond.notify_all();
    }

    /// Reassigns the participant count.
    ///
    /// The caller must guarantee no thread is concurrently blocked in
    /// [`wait`](Self::wait): resizing under a live generation miscounts
    /// it (waiters may be stranded until `cancel`). The barrier itself
    /// does not check.
    pub fn resize_unsafe(&self, needed: usize) {
        self.state.lock().unwrap().needed = needed;
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        !self.alive.load(Ordering::SeqCst)
    }
}
