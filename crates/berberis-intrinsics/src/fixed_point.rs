//! Fixed-point rounding and saturating-average primitives.
//!
//! Ported from `intrinsics/include/berberis/intrinsics/intrinsics_fixed_point_impl.h`.

use crate::guest_cpu_flags::vxrm;

/// An integer type `roundoff`/`aadd`/`asub` can operate on. Implemented for
/// every fixed-width signed and unsigned Rust integer.
pub trait FixedPointInt:
    Copy
    + PartialEq
    + std::ops::Shr<u32, Output = Self>
    + std::ops::Shl<u32, Output = Self>
    + std::ops::BitAnd<Output = Self>
    + std::ops::Sub<Output = Self>
{
    const BITS: u32;
    const ZERO: Self;
    const ONE: Self;

    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_sub(self, rhs: Self) -> Self;
}

macro_rules! impl_fixed_point_int {
    ($($t:ty),* $(,)?) => {$(
        impl FixedPointInt for $t {
            const BITS: u32 = <$t>::BITS;
            const ZERO: Self = 0;
            const ONE: Self = 1;

            fn wrapping_add(self, rhs: Self) -> Self {
                <$t>::wrapping_add(self, rhs)
            }

            fn wrapping_sub(self, rhs: Self) -> Self {
                <$t>::wrapping_sub(self, rhs)
            }
        }
    )*};
}

impl_fixed_point_int!(i8, u8, i16, u16, i32, u32, i64, u64);

/// Rounds `v >> shift` per the RISC-V "V" extension's 2-bit VXRM rounding
/// mode (`vxrm::{RNU, RNE, RDN, ROD}`). `premasked_d` is masked down to
/// `log2(bits_of(T))` bits before use, matching the hardware's behavior of
/// ignoring out-of-range shift-amount bits rather than rejecting them.
pub fn roundoff<T: FixedPointInt>(rounding_mode: u8, v: T, premasked_d: u8) -> T {
    let shift_mask = (1u8 << T::BITS.trailing_zeros()) - 1;
    let d = premasked_d & shift_mask;
    if d == 0 {
        return v;
    }
    let d = d as u32;

    let r = match rounding_mode {
        vxrm::RNU => (v >> (d - 1)) & T::ONE,
        vxrm::RNE => {
            let round_bit = (v >> (d - 1)) & T::ONE;
            let sticky_bits_set = (v & ((T::ONE << (d - 1)) - T::ONE)) != T::ZERO;
            let next_bit_set = (v >> d) & T::ONE != T::ZERO;
            if round_bit != T::ZERO && (sticky_bits_set || next_bit_set) {
                T::ONE
            } else {
                T::ZERO
            }
        }
        vxrm::RDN => T::ZERO,
        vxrm::ROD => {
            let next_bit_zero = (v >> d) & T::ONE == T::ZERO;
            let sticky_bits_set = (v & ((T::ONE << d) - T::ONE)) != T::ZERO;
            if next_bit_zero && sticky_bits_set {
                T::ONE
            } else {
                T::ZERO
            }
        }
        _ => berberis_base::fatal!("roundoff: invalid rounding mode {rounding_mode}"),
    };

    (v >> d).wrapping_add(r)
}

/// Saturating average-add: `roundoff(mode, x + y, 1)`, wrapping at the
/// operand width.
pub fn aadd<T: FixedPointInt>(rounding_mode: u8, x: T, y: T) -> T {
    roundoff(rounding_mode, x.wrapping_add(y), 1)
}

/// Saturating average-subtract: `roundoff(mode, x - y, 1)`, wrapping at the
/// operand width.
pub fn asub<T: FixedPointInt>(rounding_mode: u8, x: T, y: T) -> T {
    roundoff(rounding_mode, x.wrapping_sub(y), 1)
}
