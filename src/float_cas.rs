//! # Float/double CAS emulation
//!
//! Compare-and-swap for IEEE-754 values, built on the integer backend.
//!
//! No architecture in either execution context offers a native
//! floating-point compare-and-swap, so the floating storage is held as the
//! value's **bit pattern** in an unsigned integer of the same width and the
//! comparison is delegated to [`AtomicOps::bool_compare_and_swap`]. This is the
//! only place in the crate where a float crosses the bit boundary, and it
//! does so through [`f32::to_bits`]/[`f32::from_bits`] — no pointer
//! reinterpretation.
//!
//! Two consequences of comparing representations rather than values:
//!
//! - `-0.0` and `+0.0` do **not** match each other;
//! - a NaN matches exactly the NaN with the same payload (and unlike `==`,
//!   it *does* match itself).
//!
//! Both are exactly what the retry loops in [`crate::cell`] need: a CAS
//! succeeds iff the slot still holds the representation that was read.
//!
//! No arithmetic lives here; this module exists solely so that
//! [`AtomicCell`](crate::AtomicCell) can run its retry loops without a
//! native floating-point atomic instruction.

use crate::backend::{AtomicOps, AtomicU32, AtomicU64};

// The emulation is only sound if the floating storage width equals the
// integer storage width. A mismatch is a build error, not a runtime one.
const _: () = assert!(core::mem::size_of::<f32>() == core::mem::size_of::<u32>());
const _: () = assert!(core::mem::size_of::<f64>() == core::mem::size_of::<u64>());

/// Replaces the `f32` held (as bits) in `slot` with `desired` iff the slot
/// currently holds the bit pattern of `expected`. Returns whether the swap
/// happened.
#[inline]
pub fn compare_and_swap_f32(slot: &AtomicU32, expected: f32, desired: f32) -> bool {
    slot.bool_compare_and_swap(expected.to_bits(), desired.to_bits())
}

/// `f64` analog of [`compare_and_swap_f32`], over a 64-bit slot.
#[inline]
pub fn compare_and_swap_f64(slot: &AtomicU64, expected: f64, desired: f64) -> bool {
    slot.bool_compare_and_swap(expected.to_bits(), desired.to_bits())
}
