//! # quorum-sync 🌀
//!
//! A lightweight, **`no_std`-compatible** crate of portable spin-based
//! synchronization primitives, usable both in an ordinary process and
//! inside a privileged (kernel) execution context.
//!
//! The crate includes:
//!
//! - [`AtomicCell<T>`] — a shared value slot with atomic
//!   increment/decrement/exchange over integers **and** `f32`/`f64`
//!   (floats are emulated with a bit-pattern CAS retry loop).
//! - [`TicketRwLock<T>`] / [`RawTicketLock`] — a FIFO-fair ticket
//!   reader-writer spinlock after Mellor-Crummey and Scott.
//! - [`BitfieldRwLock<T>`] / [`RawBitfieldLock`] — a compact
//!   writer-latency-biased reader-writer spinlock.
//! - [`CancellableBarrier`] — a reusable sense-reversing barrier with an
//!   explicit cancellation path (`std` only).
//! - [`BackOff`] — the adaptive exponential backoff behind every spin
//!   loop here.
//!
//! ## ✨ Features
//!
//! - ✅ `no_std` compatible core (locks and cells use `core` only)
//! - ⚙️ Optional `std` feature: yield escape for long spins plus the
//!   blocking [`CancellableBarrier`]
//! - 🔬 `--cfg loom` routes every atomic through the [loom] model checker
//! - 🔒 RAII guards on both reader-writer locks
//!
//! [loom]: https://docs.rs/loom
//!
//! ## 🚀 Quick Example
//!
//! ```rust
//! use quorum_sync::{AtomicCell, TicketRwLock};
//!
//! let counter = AtomicCell::new(0u32);
//! assert_eq!(counter.inc(), 1);
//! assert_eq!(counter.inc_ret_last(), 1);
//!
//! let lock = TicketRwLock::new(0i32);
//! *lock.write() += 1;
//! assert_eq!(*lock.read(), 1);
//! ```
//!
//! ## 🧠 Design
//!
//! ### Execution contexts
//!
//! A build-time selection — not a runtime branch — picks the atomic
//! backend for the whole binary: the default `std` feature compiles the
//! unprivileged-context backend (`std::sync::atomic`, cooperative
//! yielding); building with `default-features = false` compiles the
//! privileged-context backend (pure `core`, spin-only). Every operation
//! the backend exposes is sequentially consistent in both arms. See
//! [`backend`].
//!
//! ### Floating-point atomics
//!
//! No target offers a native float CAS, so [`float_cas`] reinterprets the
//! IEEE-754 storage as a same-width unsigned integer (checked at compile
//! time) and [`AtomicCell`] runs its arithmetic as CAS retry loops —
//! lock-free, not wait-free. The bit boundary never leaks to callers.
//!
//! ### Two reader-writer locks
//!
//! The ticket lock admits strictly in arrival order and cannot starve
//! anyone; the bitfield lock trades that fairness for a one-CAS write
//! path. They exist side by side because callers legitimately want either
//! end of that trade.
//!
//! ## ⚠️ Safety & Usage Notes
//!
//! - The locks busy-wait. Hold them for **short critical sections** only,
//!   and never across blocking or long-running operations.
//! - Unlock must match lock: release a read admission with the read path
//!   and a write admission with the write path (guards do this for you;
//!   [`RawTicketLock::unlock`] dispatches on recorded state).
//! - A cancelled [`CancellableBarrier`] is permanently dead; `wait()`
//!   becomes a no-op.
//! - None of these operations return errors: contracts are either
//!   unconditionally satisfied or are fatal precondition violations.
//!
//! ## 📦 Modules
//!
//! - [`backend`] — execution-context atomic facade and operation set.
//! - [`float_cas`] — bit-pattern CAS emulation for `f32`/`f64`.
//! - [`cell`] — the generic atomic value wrapper.
//! - [`ticket`] — the ticket reader-writer spinlock.
//! - [`bitfield`] — the bitfield reader-writer spinlock.
//! - [`barrier`] — the cancellable sense-reversing barrier (`std`).
//! - [`backoff`] — adaptive exponential backoff.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod backend;
pub mod backoff;
#[cfg(feature = "std")]
pub mod barrier;
pub mod bitfield;
pub mod cell;
pub mod float_cas;
pub mod ticket;

#[cfg(loom)]
mod loom_tests;

pub use backend::AtomicOps;
pub use backoff::BackOff;
#[cfg(feature = "std")]
pub use barrier::CancellableBarrier;
pub use bitfield::{BitfieldReadGuard, BitfieldRwLock, BitfieldWriteGuard, RawBitfieldLock};
pub use cell::{AtomicCell, AtomicPrimitive, PaddedCell};
pub use ticket::{RawTicketLock, TicketReadGuard, TicketRwLock, TicketWriteGuard};
