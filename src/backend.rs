//! # Atomic backend
//!
//! The single funnel through which every module in this crate reaches
//! atomic types, the processor spin hint, and cooperative yielding.
//!
//! Three build-time arms select the execution context:
//!
//! - `--cfg loom` — all primitives come from the loom model checker so
//!   tests can explore thread interleavings exhaustively.
//! - `std` feature (default) — the unprivileged process context:
//!   `std::sync::atomic` (compiler-intrinsic atomics) plus a
//!   `thread::yield_now` escape for long spins.
//! - neither — the privileged (kernel) context: pure `core::sync::atomic`,
//!   spin-only, no OS services assumed.
//!
//! The selection is a single static choice for the whole binary. **Every**
//! file in the crate must import atomics through this module; a direct
//! `use core::sync::atomic::*` elsewhere would bypass loom's scheduler and
//! silently break the model tests.
//!
//! On top of the selected types, [`AtomicOps`] exposes the uniform
//! operation set the rest of the crate is built from: compare-and-swap,
//! fetch-add/sub (prior value), add/sub-and-fetch (new value), and
//! unconditional exchange. All of them are sequentially consistent; no
//! relaxed or acquire/release variants are exposed, and none can fail.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(loom)] {
        pub use loom::sync::atomic::{
            AtomicBool, AtomicI32, AtomicI64, AtomicIsize, AtomicU32, AtomicU64, AtomicUsize,
            Ordering,
        };
    } else if #[cfg(feature = "std")] {
        pub use std::sync::atomic::{
            AtomicBool, AtomicI32, AtomicI64, AtomicIsize, AtomicU32, AtomicU64, AtomicUsize,
            Ordering,
        };
    } else {
        pub use core::sync::atomic::{
            AtomicBool, AtomicI32, AtomicI64, AtomicIsize, AtomicU32, AtomicU64, AtomicUsize,
            Ordering,
        };
    }
}

pub(crate) mod hint {
    cfg_if::cfg_if! {
        if #[cfg(loom)] {
            pub(crate) use loom::hint::spin_loop;
        } else {
            pub(crate) use core::hint::spin_loop;
        }
    }
}

#[cfg(any(feature = "std", loom))]
pub(crate) mod thread {
    cfg_if::cfg_if! {
        if #[cfg(loom)] {
            pub(crate) use loom::thread::yield_now;
        } else {
            pub(crate) use std::thread::yield_now;
        }
    }
}

/// Mutex and condition variable, only present where blocking is possible.
#[cfg(any(feature = "std", loom))]
pub(crate) mod sync {
    cfg_if::cfg_if! {
        if #[cfg(loom)] {
            pub(crate) use loom::sync::{Condvar, Mutex};
        } else {
            pub(crate) use std::sync::{Condvar, Mutex};
        }
    }
}

pub(crate) mod cell {
    cfg_if::cfg_if! {
        if #[cfg(loom)] {
            pub(crate) use loom::cell::UnsafeCell;
        } else {
            pub(crate) use core::cell::UnsafeCell;
        }
    }
}

/// Shared access to the contents of an [`cell::UnsafeCell`].
///
/// Under std this is `&*cell.get()`; under loom it goes through `with` so
/// the access is visible to the model checker.
///
/// # Safety
/// Caller must guarantee no concurrent mutable access (same contract as
/// `UnsafeCell::get`).
macro_rules! unsafe_cell_get {
    ($cell:expr) => {{
        #[cfg(not(loom))]
        {
            // Safety: upheld by caller.
            unsafe { &*$cell.get() }
        }
        #[cfg(loom)]
        {
            // Safety: upheld by caller.
            unsafe { $cell.with(|p| &*p) }
        }
    }};
}
pub(crate) use unsafe_cell_get;

/// Exclusive access to the contents of an [`cell::UnsafeCell`].
///
/// # Safety
/// Caller must guarantee exclusive access.
macro_rules! unsafe_cell_get_mut {
    ($cell:expr) => {{
        #[cfg(not(loom))]
        {
            // Safety: upheld by caller.
            unsafe { &mut *$cell.get() }
        }
        #[cfg(loom)]
        {
            // Safety: upheld by caller.
            unsafe { $cell.with_mut(|p| &mut *p) }
        }
    }};
}
pub(crate) use unsafe_cell_get_mut;

/// The uniform read-modify-write operation set over an atomic integer slot.
///
/// Implemented for every atomic integer type the crate stores state in.
/// Each method is a single sequentially-consistent hardware primitive (or
/// the retry-style instruction the target maps it to); none of them can
/// fail, and none takes an ordering parameter.
pub trait AtomicOps {
    /// The plain integer type held in the slot.
    type Value: Copy + PartialEq;

    /// Replaces the value with `desired` iff it currently equals
    /// `expected`. Returns whether the swap happened.
    fn bool_compare_and_swap(&self, expected: Self::Value, desired: Self::Value) -> bool;

    /// Atomically adds `delta`, returning the value **before** the add.
    fn fetch_and_add(&self, delta: Self::Value) -> Self::Value;

    /// Atomically subtracts `delta`, returning the value **before** the
    /// subtract.
    fn fetch_and_sub(&self, delta: Self::Value) -> Self::Value;

    /// Atomically adds `delta`, returning the value **after** the add.
    fn add_and_fetch(&self, delta: Self::Value) -> Self::Value;

    /// Atomically subtracts `delta`, returning the value **after** the
    /// subtract.
    fn sub_and_fetch(&self, delta: Self::Value) -> Self::Value;

    /// Unconditionally stores `newval`, returning the prior value.
    fn exchange(&self, newval: Self::Value) -> Self::Value;

    /// Plain atomic load.
    fn read(&self) -> Self::Value;

    /// Plain atomic store.
    fn write(&self, val: Self::Value);
}

macro_rules! impl_atomic_ops {
    ($($atomic:ident => $value:ty),* $(,)?) => {$(
        impl AtomicOps for $atomic {
            type Value = $value;

            #[inline]
            fn bool_compare_and_swap(&self, expected: $value, desired: $value) -> bool {
                self.compare_exchange(expected, desired, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            }

            #[inline]
            fn fetch_and_add(&self, delta: $value) -> $value {
                $atomic::fetch_add(self, delta, Ordering::SeqCst)
            }

            #[inline]
            fn fetch_and_sub(&self, delta: $value) -> $value {
                $atomic::fetch_sub(self, delta, Ordering::SeqCst)
            }

            #[inline]
            fn add_and_fetch(&self, delta: $value) -> $value {
                $atomic::fetch_add(self, delta, Ordering::SeqCst).wrapping_add(delta)
            }

            #[inline]
            fn sub_and_fetch(&self, delta: $value) -> $value {
                $atomic::fetch_sub(self, delta, Ordering::SeqCst).wrapping_sub(delta)
            }

            #[inline]
            fn exchange(&self, newval: $value) -> $value {
                self.swap(newval, Ordering::SeqCst)
            }

            #[inline]
            fn read(&self) -> $value {
                self.load(Ordering::SeqCst)
            }

            #[inline]
            fn write(&self, val: $value) {
                self.store(val, Ordering::SeqCst)
            }
        }
    )*};
}

impl_atomic_ops! {
    AtomicU32 => u32,
    AtomicU64 => u64,
    AtomicUsize => usize,
    AtomicI32 => i32,
    AtomicI64 => i64,
    AtomicIsize => isize,
}
