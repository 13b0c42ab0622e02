//! # AtomicCell
//!
//! A shared value slot with increment/decrement/exchange semantics over
//! integers, `f32`, and `f64`, behind one type.
//!
//! For integral types every operation maps 1:1 onto a single backend
//! primitive from [`crate::backend`]. For floating types there is no such
//! instruction, so arithmetic runs a compare-and-swap retry loop over the
//! bit-pattern CAS of [`crate::float_cas`]: read, compute, attempt the
//! swap, repeat on interference. The loop is unbounded but lock-free —
//! a failed attempt means some other thread's update landed.
//!
//! ## Example
//! ```rust
//! use quorum_sync::AtomicCell;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let hits = Arc::new(AtomicCell::new(0u64));
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let hits = hits.clone();
//!         thread::spawn(move || {
//!             for _ in 0..1000 {
//!                 hits.inc();
//!             }
//!         })
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//! assert_eq!(hits.get(), 4000);
//! ```
//!
//! None of these operations report errors; every step either completes or
//! retries against a genuinely newer value.

use crate::backend::{
    AtomicI32, AtomicI64, AtomicIsize, AtomicOps, AtomicU32, AtomicU64, AtomicUsize,
};
use crate::float_cas;

use crossbeam_utils::CachePadded;

mod sealed {
    pub trait Sealed {}
}

/// Value types [`AtomicCell`] can hold.
///
/// Sealed: implemented for `u32 i32 u64 i64 usize isize f32 f64` and
/// nothing else. The methods are plumbing between the cell and the
/// backend; callers never use them directly.
pub trait AtomicPrimitive: Copy + PartialEq + sealed::Sealed {
    /// The atomic slot the value lives in.
    #[doc(hidden)]
    type Repr: Send + Sync;

    #[doc(hidden)]
    const ONE: Self;

    #[doc(hidden)]
    fn into_repr(self) -> Self::Repr;
    #[doc(hidden)]
    fn load(repr: &Self::Repr) -> Self;
    #[doc(hidden)]
    fn store(repr: &Self::Repr, val: Self);
    #[doc(hidden)]
    fn add_and_fetch(repr: &Self::Repr, delta: Self) -> Self;
    #[doc(hidden)]
    fn fetch_and_add(repr: &Self::Repr, delta: Self) -> Self;
    #[doc(hidden)]
    fn sub_and_fetch(repr: &Self::Repr, delta: Self) -> Self;
    #[doc(hidden)]
    fn fetch_and_sub(repr: &Self::Repr, delta: Self) -> Self;
    #[doc(hidden)]
    fn exchange(repr: &Self::Repr, val: Self) -> Self;
}

macro_rules! impl_primitive_int {
    ($($value:ty => $atomic:ident),* $(,)?) => {$(
        impl sealed::Sealed for $value {}

        impl AtomicPrimitive for $value {
            type Repr = $atomic;

            const ONE: $value = 1;

            #[inline]
            fn into_repr(self) -> $atomic {
                $atomic::new(self)
            }

            #[inline]
            fn load(repr: &$atomic) -> $value {
                repr.read()
            }

            #[inline]
            fn store(repr: &$atomic, val: $value) {
                repr.write(val)
            }

            #[inline]
            fn add_and_fetch(repr: &$atomic, delta: $value) -> $value {
                AtomicOps::add_and_fetch(repr, delta)
            }

            #[inline]
            fn fetch_and_add(repr: &$atomic, delta: $value) -> $value {
                AtomicOps::fetch_and_add(repr, delta)
            }

            #[inline]
            fn sub_and_fetch(repr: &$atomic, delta: $value) -> $value {
                AtomicOps::sub_and_fetch(repr, delta)
            }

            #[inline]
            fn fetch_and_sub(repr: &$atomic, delta: $value) -> $value {
                AtomicOps::fetch_and_sub(repr, delta)
            }

            #[inline]
            fn exchange(repr: &$atomic, val: $value) -> $value {
                AtomicOps::exchange(repr, val)
            }
        }
    )*};
}

impl_primitive_int! {
    u32 => AtomicU32,
    i32 => AtomicI32,
    u64 => AtomicU64,
    i64 => AtomicI64,
    usize => AtomicUsize,
    isize => AtomicIsize,
}

// Floating impls store the bit pattern and emulate arithmetic with a CAS
// retry loop. `exchange` and `store` stay single backend ops because they
// are unconditional.
macro_rules! impl_primitive_float {
    ($($value:ty => $atomic:ident, $cas:path),* $(,)?) => {$(
        impl sealed::Sealed for $value {}

        impl AtomicPrimitive for $value {
            type Repr = $atomic;

            const ONE: $value = 1.0;

            #[inline]
            fn into_repr(self) -> $atomic {
                $atomic::new(self.to_bits())
            }

            #[inline]
            fn load(repr: &$atomic) -> $value {
                <$value>::from_bits(repr.read())
            }

            #[inline]
            fn store(repr: &$atomic, val: $value) {
                repr.write(val.to_bits())
            }

            #[inline]
            fn add_and_fetch(repr: &$atomic, delta: $value) -> $value {
                loop {
                    let prev = Self::load(repr);
                    let next = prev + delta;
                    if $cas(repr, prev, next) {
                        return next;
                    }
                }
            }

            #[inline]
            fn fetch_and_add(repr: &$atomic, delta: $value) -> $value {
                loop {
                    let prev = Self::load(repr);
                    if $cas(repr, prev, prev + delta) {
                        return prev;
                    }
                }
            }

            #[inline]
            fn sub_and_fetch(repr: &$atomic, delta: $value) -> $value {
                loop {
                    let prev = Self::load(repr);
                    let next = prev - delta;
                    if $cas(repr, prev, next) {
                        return next;
                    }
                }
            }

            #[inline]
            fn fetch_and_sub(repr: &$atomic, delta: $value) -> $value {
                loop {
                    let prev = Self::load(repr);
                    if $cas(repr, prev, prev - delta) {
                        return prev;
                    }
                }
            }

            #[inline]
            fn exchange(repr: &$atomic, val: $value) -> $value {
                <$value>::from_bits(AtomicOps::exchange(repr, val.to_bits()))
            }
        }
    )*};
}

impl_primitive_float! {
    f32 => AtomicU32, float_cas::compare_and_swap_f32,
    f64 => AtomicU64, float_cas::compare_and_swap_f64,
}

/// A shared atomic value slot.
///
/// All mutation goes through the backend's atomic primitives (integers) or
/// a CAS retry loop (floats); there is no plain read-modify-write anywhere.
/// Share it across threads with `Arc` or a `static`; it owns no heap state
/// and needs no teardown.
pub struct AtomicCell<T: AtomicPrimitive> {
    value: T::Repr,
}

impl<T: AtomicPrimitive> AtomicCell<T> {
    /// Creates a cell holding `initial`.
    pub fn new(initial: T) -> Self {
        AtomicCell {
            value: initial.into_repr(),
        }
    }

    /// Reads the current value.
    #[inline]
    pub fn get(&self) -> T {
        T::load(&self.value)
    }

    /// Overwrites the current value.
    #[inline]
    pub fn set(&self, val: T) {
        T::store(&self.value, val)
    }

    /// Increments by 1, returning the new value.
    #[inline]
    pub fn inc(&self) -> T {
        T::add_and_fetch(&self.value, T::ONE)
    }

    /// Decrements by 1, returning the new value.
    #[inline]
    pub fn dec(&self) -> T {
        T::sub_and_fetch(&self.value, T::ONE)
    }

    /// Increments by `delta`, returning the new value.
    #[inline]
    pub fn inc_by(&self, delta: T) -> T {
        T::add_and_fetch(&self.value, delta)
    }

    /// Decrements by `delta`, returning the new value.
    #[inline]
    pub fn dec_by(&self, delta: T) -> T {
        T::sub_and_fetch(&self.value, delta)
    }

    /// Increments by 1, returning the prior value.
    #[inline]
    pub fn inc_ret_last(&self) -> T {
        T::fetch_and_add(&self.value, T::ONE)
    }

    /// Decrements by 1, returning the prior value.
    #[inline]
    pub fn dec_ret_last(&self) -> T {
        T::fetch_and_sub(&self.value, T::ONE)
    }

    /// Increments by `delta`, returning the prior value.
    #[inline]
    pub fn inc_by_ret_last(&self, delta: T) -> T {
        T::fetch_and_add(&self.value, delta)
    }

    /// Decrements by `delta`, returning the prior value.
    #[inline]
    pub fn dec_by_ret_last(&self, delta: T) -> T {
        T::fetch_and_sub(&self.value, delta)
    }

    /// Unconditionally stores `val`, returning the prior value.
    #[inline]
    pub fn exchange(&self, val: T) -> T {
        T::exchange(&self.value, val)
    }
}

impl<T: AtomicPrimitive + core::fmt::Debug> core::fmt::Debug for AtomicCell<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("AtomicCell").field(&self.get()).finish()
    }
}

// Safety: every access to the slot goes through an atomic primitive or a
// CAS retry loop over one.
unsafe impl<T: AtomicPrimitive> Send for AtomicCell<T> {}
unsafe impl<T: AtomicPrimitive> Sync for AtomicCell<T> {}

/// An [`AtomicCell`] padded out to its own cache line.
///
/// Use for arrays of per-thread counters that would otherwise false-share.
pub type PaddedCell<T> = CachePadded<AtomicCell<T>>;
