//! # Ticket reader-writer spin lock
//!
//! A FIFO-fair, starvation-free reader-writer lock built from a single
//! word, after the ticket algorithm of Mellor-Crummey and Scott
//! ("Scalable Reader-Writer Synchronization for Shared-Memory
//! Multiprocessors").
//!
//! The word is split into three byte-wide counters:
//!
//! ```text
//!   bits 16..24   users   next ticket to hand out
//!   bits  8..16   read    ticket currently permitted to read
//!   bits  0..8    write   ticket currently permitted to write
//! ```
//!
//! Readers and writers draw tickets from the same `users` counter with one
//! fetch-and-add, so admission is strictly arrival-ordered: no thread can
//! be starved by repeated admission of later arrivals. A releasing writer
//! advances `write` and `read` together, letting any readers queued behind
//! it proceed at once; an admitted reader immediately advances `read`
//! again, chaining the next queued reader in without a handshake. Reader
//! *completion* is accounted on the `write` counter — a writer's ticket
//! only comes up once every earlier reader has bumped it.
//!
//! One consequence of the chained admission: a burst of readers can all
//! become admitted before any of them runs, which slightly weakens FIFO
//! ordering between interleaved readers and writers. That is a deliberate
//! throughput property of the reference algorithm, not a defect.
//!
//! [`RawTicketLock`] is the bare state machine with explicit
//! `write_lock`/`read_lock`/`unlock` calls; [`TicketRwLock`] wraps it
//! around a value with RAII guards. Both spin (with [`BackOff`]) rather
//! than block — use them for short critical sections only.
//!
//! ## Example
//! ```rust
//! use quorum_sync::TicketRwLock;
//!
//! let lock = TicketRwLock::new(vec![1, 2, 3]);
//! {
//!     let r = lock.read();
//!     assert_eq!(r.len(), 3);
//! }
//! lock.write().push(4);
//! assert_eq!(lock.read().len(), 4);
//! ```

use core::ops::{Deref, DerefMut};

use crate::backend::cell::UnsafeCell;
use crate::backend::{unsafe_cell_get, unsafe_cell_get_mut, AtomicOps, AtomicU32};
use crate::BackOff;

const WRITE_SHIFT: u32 = 0;
const READ_SHIFT: u32 = 8;
const USERS_SHIFT: u32 = 16;
const FIELD_MASK: u32 = 0xff;

/// One byte-wide counter out of the state word.
#[inline]
fn field(word: u32, shift: u32) -> u8 {
    ((word >> shift) & FIELD_MASK) as u8
}

/// The bare ticket lock state machine.
///
/// Unlock calls must match the lock call that admitted the thread
/// (`write_unlock` after `write_lock`, `read_unlock` after `read_lock`),
/// or go through [`unlock`](RawTicketLock::unlock), which dispatches on a
/// flag recorded at write-admission time. Prefer [`TicketRwLock`] unless
/// the guard lifetimes genuinely cannot be expressed.
pub struct RawTicketLock {
    state: AtomicU32,
    // Set by the admitted writer, cleared before it releases. Not part of
    // the atomic state: only the thread holding exclusive access writes
    // it, and only a thread holding some admission reads it.
    writing: UnsafeCell<bool>,
}

impl RawTicketLock {
    /// Creates an unlocked lock; ticket 0 is the first admitted.
    pub fn new() -> Self {
        RawTicketLock {
            state: AtomicU32::new(0),
            writing: UnsafeCell::new(false),
        }
    }

    /// Draws the next ticket from the `users` counter.
    ///
    /// The add carries out of the byte on wrap; the overflow lands above
    /// the three fields and is discarded by the mask.
    #[inline]
    fn take_ticket(&self) -> u8 {
        field(self.state.fetch_and_add(1 << USERS_SHIFT), USERS_SHIFT)
    }

    /// Advances one byte-wide counter by 1, wrapping mod 256 without
    /// carrying into its neighbors.
    ///
    /// The original algorithm does this with a sub-word store into a
    /// union; a word-wide CAS loop gives the same transition while
    /// preserving a concurrently advancing `users` field.
    #[inline]
    fn bump(&self, shift: u32) {
        loop {
            let cur = self.state.read();
            let byte = field(cur, shift).wrapping_add(1);
            let next = (cur & !(FIELD_MASK << shift)) | ((byte as u32) << shift);
            if self.state.bool_compare_and_swap(cur, next) {
                return;
            }
        }
    }

    /// Acquires exclusive access, spinning until this thread's ticket
    /// comes up on the `write` counter.
    pub fn write_lock(&self) {
        let ticket = self.take_ticket();
        let backoff = BackOff::new();
        while field(self.state.read(), WRITE_SHIFT) != ticket {
            backoff.wait();
        }
        // Exclusive from here until write_unlock.
        *unsafe_cell_get_mut!(self.writing) = true;
    }

    /// Releases exclusive access, advancing `write` and `read` together so
    /// queued readers behind this writer proceed immediately.
    pub fn write_unlock(&self) {
        // Clear the flag while still exclusive; after the counters move, a
        // successor may be admitted at any moment.
        *unsafe_cell_get_mut!(self.writing) = false;
        loop {
            let cur = self.state.read();
            let w = field(cur, WRITE_SHIFT).wrapping_add(1);
            let r = field(cur, READ_SHIFT).wrapping_add(1);
            let next = (cur & !0xffff) | ((r as u32) << READ_SHIFT) | (w as u32);
            if self.state.bool_compare_and_swap(cur, next) {
                return;
            }
        }
    }

    /// Acquires shared access, spinning until this thread's ticket comes
    /// up on the `read` counter, then chain-admits the next reader.
    pub fn read_lock(&self) {
        let ticket = self.take_ticket();
        let backoff = BackOff::new();
        while field(self.state.read(), READ_SHIFT) != ticket {
            backoff.wait();
        }
        self.bump(READ_SHIFT);
    }

    /// Releases shared access.
    ///
    /// Reader completion is tracked on the `write` counter: once every
    /// reader admitted ahead of a queued writer has bumped it, that
    /// writer's ticket comes up.
    pub fn read_unlock(&self) {
        self.bump(WRITE_SHIFT);
    }

    /// Releases whichever admission this lock currently holds.
    ///
    /// Dispatches on the flag set by [`write_lock`](Self::write_lock); the
    /// calling thread must actually hold the lock.
    pub fn unlock(&self) {
        if *unsafe_cell_get!(self.writing) {
            self.write_unlock();
        } else {
            self.read_unlock();
        }
    }
}

impl Default for RawTicketLock {
    fn default() -> Self {
        Self::new()
    }
}

// Safety: the state word is only touched through atomic operations. The
// `writing` flag is written only between write-admission and write-release
// (a window with a unique owner) and read only by a thread that holds some
// admission, which the ticket protocol orders against every write-holder.
unsafe impl Send for RawTicketLock {}
unsafe impl Sync for RawTicketLock {}

/// A value protected by a [`RawTicketLock`], with RAII guards.
pub struct TicketRwLock<T> {
    raw: RawTicketLock,
    data: UnsafeCell<T>,
}

/// Shared-access guard returned by [`TicketRwLock::read`].
pub struct TicketReadGuard<'a, T> {
    lock: &'a TicketRwLock<T>,
}

/// Exclusive-access guard returned by [`TicketRwLock::write`].
pub struct TicketWriteGuard<'a, T> {
    lock: &'a TicketRwLock<T>,
}

impl<T> TicketRwLock<T> {
    /// Creates a new unlocked lock wrapping `data`.
    pub fn new(data: T) -> Self {
        TicketRwLock {
            raw: RawTicketLock::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquires shared access in ticket order.
    pub fn read(&self) -> TicketReadGuard<'_, T> {
        self.raw.read_lock();
        TicketReadGuard { lock: self }
    }

    /// Acquires exclusive access in ticket order.
    pub fn write(&self) -> TicketWriteGuard<'_, T> {
        self.raw.write_lock();
        TicketWriteGuard { lock: self }
    }

    /// Consumes the lock, returning the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T> Deref for TicketReadGuard<'_, T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        // Safety: shared admission excludes every writer.
        unsafe_cell_get!(self.lock.data)
    }
}

impl<T> Drop for TicketReadGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.raw.read_unlock();
    }
}

impl<T> Deref for TicketWriteGuard<'_, T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        // Safety: exclusive admission.
        unsafe_cell_get!(self.lock.data)
    }
}

impl<T> DerefMut for TicketWriteGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // Safety: exclusive admission.
        unsafe_cell_get_mut!(self.lock.data)
    }
}

impl<T> Drop for TicketWriteGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.raw.write_unlock();
    }
}

// Safety: admission protocol of RawTicketLock guards every data access.
unsafe impl<T: Send> Send for TicketRwLock<T> {}
unsafe impl<T: Send + Sync> Sync for TicketRwLock<T> {}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn write_then_read_uncontended() {
        let lock = TicketRwLock::new(1u32);
        *lock.write() += 1;
        assert_eq!(*lock.read(), 2);
        assert_eq!(lock.into_inner(), 2);
    }

    #[test]
    fn raw_generic_unlock_dispatches() {
        let raw = RawTicketLock::new();
        raw.write_lock();
        raw.unlock(); // write path
        raw.read_lock();
        raw.unlock(); // read path
        // A full cycle later the lock must still admit a writer.
        raw.write_lock();
        raw.write_unlock();
    }

    #[test]
    fn counters_survive_byte_wraparound() {
        let raw = RawTicketLock::new();
        // 300 > 256 write cycles: every byte field wraps at least once.
        for _ in 0..300 {
            raw.write_lock();
            raw.write_unlock();
        }
        for _ in 0..300 {
            raw.read_lock();
            raw.read_unlock();
        }
        raw.write_lock();
        raw.write_unlock();
    }

    #[test]
    fn writers_are_mutually_exclusive() {
        let lock = Arc::new(TicketRwLock::new(0u64));
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

    // Scenario: W,R,R,R queued in order. No reader may enter while the
    // writer holds the lock; all three must enter after it releases, and
    // their critical sections overlap.
    #[test]
    fn queued_readers_wait_for_writer_then_overlap() {
        let lock = Arc::new(TicketRwLock::new(0u32));
        let entered = Arc::new(Mutex::new(Vec::new()));
        let rendezvous = Arc::new(Barrier::new(3));

        let writer = lock.write();

        let readers: Vec<_> = (0..3)
            .map(|id| {
                let lock = lock.clone();
                let entered = entered.clone();
                let rendezvous = rendezvous.clone();
                thread::spawn(move || {
                    let guard = lock.read();
                    entered.lock().unwrap().push(id);
                    // All three readers must be inside their critical
                    // sections at once to pass this barrier.
                    rendezvous.wait();
                    drop(guard);
                })
            })
            .collect();

        // Readers cannot be admitted past the held write ticket.
        thread::sleep(Duration::from_millis(50));
        assert!(entered.lock().unwrap().is_empty());

        drop(writer);
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(entered.lock().unwrap().len(), 3);
    }

    // FIFO: a writer queued behind a held write lock is admitted before a
    // reader that drew its ticket later.
    #[test]
    fn tickets_are_granted_in_draw_order() {
        let lock = Arc::new(TicketRwLock::new(Vec::<&str>::new()));

        let first = lock.write();

        let lock_w = lock.clone();
        let second = thread::spawn(move || {
            lock_w.write().push("second");
        });
        // Give the second writer time to draw its ticket before the third
        // requester arrives.
        thread::sleep(Duration::from_millis(50));

        let lock_r = lock.clone();
        let third = thread::spawn(move || {
            let n = lock_r.read().len();
            assert_eq!(n, 1, "reader admitted before the earlier writer");
        });

        drop(first);
        second.join().unwrap();
        third.join().unwrap();
    }

    #[test]
    fn readers_and_writers_agree_on_totals() {
        let lock = Arc::new(TicketRwLock::new(0i64));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let lock = lock.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..20_000 {
                    *lock.write() += 1;
                }
            }));
        }
        for _ in 0..2 {
            let lock = lock.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..20_000 {
                    let v = *lock.read();
                    assert!((0..=40_000).contains(&v));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*lock.read(), 40_000);
    }
}
