//! # BackOff
//!
//! Exponential spin policy used by every busy-wait loop in the crate.
//!
//! Each call to [`BackOff::wait`] burns a burst of
//! [`spin_loop`](core::hint::spin_loop) hints and doubles the burst length
//! up to a cap, so a thread that keeps losing a ticket race backs off the
//! bus instead of hammering it. Under the `std` feature a long-contended
//! waiter escalates to [`std::thread::yield_now`]; in the privileged
//! (`no_std`) context there is nothing to yield to and the policy stays
//! pure spin. Under `--cfg loom` every wait is a single scheduler yield —
//! the model checker cannot see progress inside an opaque spin burst.
//!
//! ## Example
//! ```rust
//! use quorum_sync::BackOff;
//!
//! let backoff = BackOff::new();
//! loop {
//!     if try_acquire() {
//!         break;
//!     }
//!     backoff.wait();
//! }
//! # fn try_acquire() -> bool { true }
//! ```

use core::cell::Cell;

#[cfg(not(loom))]
use crate::backend::hint::spin_loop;

/// First burst length.
const SPIN_START: u32 = 1 << 4;

/// Burst length cap; doubling stops here.
#[cfg(not(loom))]
const SPIN_LIMIT: u32 = 1 << 18;

/// Burst length past which a `std` build yields the thread as well.
#[cfg(all(feature = "std", not(loom)))]
const YIELD_THRESHOLD: u32 = 1 << 10;

/// Per-acquisition exponential backoff state.
///
/// Create one per lock attempt; it is deliberately not shared between
/// threads (the spin counter lives in a [`Cell`]).
pub struct BackOff {
    spin: Cell<u32>,
}

impl BackOff {
    /// Creates a backoff starting at the default burst length.
    #[inline]
    pub const fn new() -> Self {
        BackOff {
            spin: Cell::new(SPIN_START),
        }
    }

    /// Spins for the current burst, then doubles it (up to the cap).
    ///
    /// On `std` builds a waiter past the yield threshold also yields the
    /// thread so the lock holder can run.
    #[inline]
    pub fn wait(&self) {
        #[cfg(loom)]
        {
            crate::backend::thread::yield_now();
        }

        #[cfg(not(loom))]
        {
            let burst = self.spin.get();
            for _ in 0..burst {
                spin_loop();
            }
            self.spin.set((burst << 1).min(SPIN_LIMIT));

            #[cfg(feature = "std")]
            if burst > YIELD_THRESHOLD {
                crate::backend::thread::yield_now();
            }
        }
    }

    /// Restores the default burst length.
    #[inline]
    pub fn reset(&self) {
        self.spin.set(SPIN_START);
    }

    /// Current burst length; exposed for tests and tuning.
    #[inline]
    pub fn current(&self) -> u32 {
        self.spin.get()
    }
}

impl Default for BackOff {
    fn default() -> Self {
        Self::new()
    }
}
