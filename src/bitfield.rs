//! # Bitfield reader-writer spin lock
//!
//! The latency-biased alternative to [`crate::ticket`]: a single state
//! word with a writer-queued bit, a writer-held bit, and the reader count
//! in the remaining upper bits.
//!
//! ```text
//!   bit 0   WAIT    a writer is queued
//!   bit 1   WRITE   a writer holds the lock
//!   bit 2+  READ    active reader count, in steps of 4
//! ```
//!
//! A queued writer raises `WAIT`, which stalls new readers before they
//! even attempt admission, so the writer gets in as soon as the readers
//! already inside drain. The uncontended write path is one CAS. The price
//! is fairness: there is no ticket order here, and two writers trading the
//! lock can hold readers off indefinitely. Pick this lock when write
//! latency matters more than strict arrival order, and the ticket lock
//! when it does not.

use core::ops::{Deref, DerefMut};

use crate::backend::cell::UnsafeCell;
use crate::backend::{unsafe_cell_get, unsafe_cell_get_mut, AtomicOps, AtomicU32};
use crate::BackOff;

const RW_WAIT: u32 = 1;
const RW_WRITE: u32 = 2;
const RW_READ: u32 = 4;

/// The bare bitfield lock state machine.
///
/// Unlock calls must match the admission they release; there is no
/// recorded lock-kind here. Prefer [`BitfieldRwLock`] for guard-managed
/// pairing.
pub struct RawBitfieldLock {
    state: AtomicU32,
}

impl RawBitfieldLock {
    /// Creates an unlocked lock.
    pub fn new() -> Self {
        RawBitfieldLock {
            state: AtomicU32::new(0),
        }
    }

    /// Acquires exclusive access.
    ///
    /// Swaps in the write-held state as soon as no reader or writer is
    /// observed; otherwise raises `WAIT` and spins until the lock drains.
    /// Winning the swap consumes this writer's `WAIT` bit.
    pub fn write_lock(&self) {
        let backoff = BackOff::new();
        loop {
            let state = self.state.read();

            // No readers and no writer: only a WAIT bit may be set, and
            // the swap takes it down along with the claim.
            if state < RW_WRITE && self.state.bool_compare_and_swap(state, RW_WRITE) {
                return;
            }

            if state & RW_WAIT == 0 {
                self.set_wait();
            }

            while self.state.read() > RW_WAIT {
                backoff.wait();
            }
            backoff.reset();
        }
    }

    /// Releases exclusive access.
    pub fn write_unlock(&self) {
        self.state.fetch_and_sub(RW_WRITE);
    }

    /// Acquires shared access.
    ///
    /// Readers stall while a writer holds or waits, then claim a slot
    /// with fetch-and-add; a claim that raced a writer is undone and
    /// retried.
    pub fn read_lock(&self) {
        let backoff = BackOff::new();
        loop {
            while self.state.read() & (RW_WAIT | RW_WRITE) != 0 {
                backoff.wait();
            }

            if self.state.fetch_and_add(RW_READ) & (RW_WAIT | RW_WRITE) == 0 {
                return;
            }

            // A writer slipped in between the check and the add.
            self.state.fetch_and_sub(RW_READ);
            backoff.reset();
        }
    }

    /// Releases shared access.
    pub fn read_unlock(&self) {
        self.state.fetch_and_sub(RW_READ);
    }

    /// Raises the `WAIT` bit, staying within the backend's CAS/fetch op
    /// set (there is no fetch-or among them).
    #[inline]
    fn set_wait(&self) {
        loop {
            let cur = self.state.read();
            if cur & RW_WAIT != 0 || self.state.bool_compare_and_swap(cur, cur | RW_WAIT) {
                return;
            }
        }
    }
}

impl Default for RawBitfieldLock {
    fn default() -> Self {
        Self::new()
    }
}

/// A value protected by a [`RawBitfieldLock`], with RAII guards.
pub struct BitfieldRwLock<T> {
    raw: RawBitfieldLock,
    data: UnsafeCell<T>,
}

/// Shared-access guard returned by [`BitfieldRwLock::read`].
pub struct BitfieldReadGuard<'a, T> {
    lock: &'a BitfieldRwLock<T>,
}

/// Exclusive-access guard returned by [`BitfieldRwLock::write`].
pub struct BitfieldWriteGuard<'a, T> {
    lock: &'a BitfieldRwLock<T>,
}

impl<T> BitfieldRwLock<T> {
    /// Creates a new unlocked lock wrapping `data`.
    pub fn new(data: T) -> Self {
        BitfieldRwLock {
            raw: RawBitfieldLock::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquires shared access.
    pub fn read(&self) -> BitfieldReadGuard<'_, T> {
        self.raw.read_lock();
        BitfieldReadGuard { lock: self }
    }

    /// Acquires exclusive access.
    pub fn write(&self) -> BitfieldWriteGuard<'_, T> {
        self.raw.write_lock();
        BitfieldWriteGuard { lock: self }
    }

    /// Consumes the lock, returning the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T> Deref for BitfieldReadGuard<'_, T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        // Safety: shared admission excludes every writer.
        unsafe_cell_get!(self.lock.data)
    }
}

impl<T> Drop for BitfieldReadGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.raw.read_unlock();
    }
}

impl<T> Deref for BitfieldWriteGuard<'_, T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        // Safety: exclusive admission.
        unsafe_cell_get!(self.lock.data)
    }
}

impl<T> DerefMut for BitfieldWriteGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // Safety: exclusive admission.
        unsafe_cell_get_mut!(self.lock.data)
    }
}

impl<T> Drop for BitfieldWriteGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.raw.write_unlock();
    }
}

// Safety: admission protocol of RawBitfieldLock guards every data access.
unsafe impl<T: Send> Send for BitfieldRwLock<T> {}
unsafe impl<T: Send + Sync> Sync for BitfieldRwLock<T> {}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn write_then_read_uncontended() {
        let lock = BitfieldRwLock::new(String::from("a"));
        lock.write().push('b');
        assert_eq!(*lock.read(), "ab");
        assert_eq!(lock.into_inner(), "ab");
    }

    #[test]
    fn raw_lock_cycles() {
        let raw = RawBitfieldLock::new();
        raw.write_lock();
        raw.write_unlock();
        raw.read_lock();
        raw.read_lock(); // two concurrent read claims
        raw.read_unlock();
        raw.read_unlock();
        raw.write_lock();
        raw.write_unlock();
    }

    #[test]
    fn writers_are_mutually_exclusive() {
        let lock = Arc::new(BitfieldRwLock::new(0u64));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = lock.clone();
                thread::spawn(move || {
                    for _ in 0..50_000 {
                        *lock.write() += 1;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*lock.read(), 200_000);
    }

    #[test]
    fn readers_overlap() {
        let lock = Arc::new(BitfieldRwLock::new(0u32));
        let rendezvous = Arc::new(Barrier::new(3));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let lock = lock.clone();
                let rendezvous = rendezvous.clone();
                thread::spawn(move || {
                    let guard = lock.read();
                    // Passing requires all three readers inside at once.
                    rendezvous.wait();
                    drop(guard);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn queued_writer_blocks_new_readers() {
        let lock = Arc::new(BitfieldRwLock::new(0u32));
        let entered = Arc::new(Mutex::new(0u32));

        let held = lock.read();

        let lock_w = lock.clone();
        let entered_w = entered.clone();
        let writer = thread::spawn(move || {
            let mut guard = lock_w.write();
            *guard += 1;
            *entered_w.lock().unwrap() += 1;
        });

        // Let the writer queue up (raise WAIT) behind the held reader.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(*entered.lock().unwrap(), 0);

        // A late reader must not starve the queued writer: it stalls on
        // WAIT until the writer has been through.
        let lock_r = lock.clone();
        let late = thread::spawn(move || {
            let guard = lock_r.read();
            assert_eq!(*guard, 1, "late reader admitted before queued writer");
        });

        drop(held);
        writer.join().unwrap();
        late.join().unwrap();
    }
}
