//! ABI selection and a unified `ArgLocation` that every guest ABI's cursor
//! is translated into, so the rest of this crate does not match on four
//! different `ArgLocationKind` enums.
//!
//! Ported from `guest_abi/guest_abi.h`'s `GuestAbi::CallingConventionsVariant`
//! (`kAapcs`/`kAapcs64`/`kLp64`/`kLp64d`) plus the per-arch
//! `guest_arguments_arch.h`/`guest_params_arch.h` headers, which each pick a
//! concrete `arm::ArgLocation`/`arm64::ArgLocation`/`riscv64::ArgLocation` at
//! compile time. Unifying them here lets `GuestParams`/`GuestArgumentBuffer`
//! be written once instead of three times.

use berberis_calling_conventions::{arm, arm64, riscv64};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestAbiKind {
    /// ARM 32-bit (AAPCS).
    Aapcs32,
    /// ARM 64-bit (AAPCS64).
    Aapcs64,
    /// RISC-V 64-bit, soft float: FP arguments are marshalled through the
    /// integer path, per `spec.md` §4.4.
    Lp64,
    /// RISC-V 64-bit, hardware float and double.
    Lp64d,
}

impl GuestAbiKind {
    /// Byte size of one `IntReg` location unit in the marshalling buffer.
    /// AAPCS32 addresses integer argument registers in 4-byte words;
    /// AAPCS64/LP64/LP64D address them in 8-byte registers.
    pub fn int_unit_bytes(self) -> u32 {
        match self {
            GuestAbiKind::Aapcs32 => 4,
            GuestAbiKind::Aapcs64 | GuestAbiKind::Lp64 | GuestAbiKind::Lp64d => 8,
        }
    }

    /// Byte size of one `FpReg` location unit. AAPCS32's `s`-registers are
    /// addressed in 4-byte units, AAPCS64's `v`-registers in 16-byte units,
    /// LP64D's `f`-registers in 8-byte units.
    pub fn fp_unit_bytes(self) -> u32 {
        match self {
            GuestAbiKind::Aapcs32 => 4,
            GuestAbiKind::Aapcs64 => 16,
            GuestAbiKind::Lp64 | GuestAbiKind::Lp64d => 8,
        }
    }

    /// Total bytes of the integer-register marshalling area addressable by
    /// a split `IntRegAndStack` location (AAPCS32's r0-r3).
    pub fn int_area_bytes(self) -> u32 {
        4 * self.int_unit_bytes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgLocationKind {
    None,
    Stack,
    IntReg,
    FpReg,
    /// AAPCS32 only: an argument that starts in the last integer register(s)
    /// and continues onto the stack. `offset` is the starting register
    /// index (in `int_unit_bytes()` units); the register part runs to the
    /// end of the integer register area and the stack part starts at byte 0
    /// of the outgoing stack area, per `calling_conventions_arm.h`'s
    /// "only the first stack-crossing argument ever splits" invariant.
    IntRegAndStack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgLocation {
    pub kind: ArgLocationKind,
    pub offset: u32,
}

/// A cursor over one of the four guest ABIs, hiding which concrete
/// `berberis_calling_conventions` type backs it.
#[derive(Debug, Clone)]
pub enum Cursor {
    Aapcs32(arm::CallingConventions),
    Aapcs64(arm64::CallingConventions),
    Riscv64 {
        conv: riscv64::CallingConventions,
        /// `false` for LP64 (soft float): FP arguments go through the
        /// integer path instead of `fa0..fa7`.
        hard_float: bool,
    },
}

impl Cursor {
    pub fn new(abi: GuestAbiKind) -> Self {
        match abi {
            GuestAbiKind::Aapcs32 => Cursor::Aapcs32(arm::CallingConventions::new()),
            GuestAbiKind::Aapcs64 => Cursor::Aapcs64(arm64::CallingConventions::new()),
            GuestAbiKind::Lp64 => Cursor::Riscv64 {
                conv: riscv64::CallingConventions::new(),
                hard_float: false,
            },
            GuestAbiKind::Lp64d => Cursor::Riscv64 {
                conv: riscv64::CallingConventions::new(),
                hard_float: true,
            },
        }
    }

    pub fn next_int_arg_loc(&mut self, size: u32, alignment: u32) -> ArgLocation {
        match self {
            Cursor::Aapcs32(conv) => from_arm(conv.get_next_int_arg_loc(size, alignment)),
            Cursor::Aapcs64(conv) => from_arm64(conv.get_next_int_arg_loc(size, alignment)),
            Cursor::Riscv64 { conv, .. } => from_riscv64(conv.get_next_int_arg_loc(size, alignment)),
        }
    }

    pub fn next_fp_arg_loc(&mut self, size: u32, alignment: u32) -> ArgLocation {
        match self {
            Cursor::Aapcs32(conv) => from_arm(conv.get_next_fp_arg_loc(size, alignment)),
            Cursor::Aapcs64(conv) => from_arm64(conv.get_next_fp_arg_loc(size, alignment)),
            Cursor::Riscv64 { conv, hard_float } => {
                if *hard_float {
                    from_riscv64(conv.get_next_fp_arg_loc(size, alignment))
                } else {
                    from_riscv64(conv.get_next_int_arg_loc(size, alignment))
                }
            }
        }
    }

    /// Reserves a large-struct return's hidden pointer argument, per
    /// `spec.md` §4.4: the caller-allocated buffer's address, passed as an
    /// implicit pointer argument reserved *before* any visible parameter is
    /// assigned a location. Must be called before any `next_int_arg_loc`/
    /// `next_fp_arg_loc` call on this cursor.
    ///
    /// On AAPCS64 this is always x8, which sits beyond the int argument
    /// registers and so never needs to consume from the same cursor as
    /// visible arguments. On LP64/LP64D it is a0, taken from the same
    /// integer-argument cursor visible arguments use, per
    /// `calling_conventions_riscv64.h`'s "the return location must be
    /// allocated before any parameters" invariant.
    pub fn reserve_large_struct_return(&mut self, size: u32, alignment: u32) -> ArgLocation {
        match self {
            Cursor::Aapcs32(conv) => from_arm(conv.get_int_res_loc(size)),
            Cursor::Aapcs64(conv) => from_arm64(conv.get_large_struct_res_loc()),
            Cursor::Riscv64 { conv, .. } => from_riscv64(conv.get_next_int_arg_loc(size, alignment)),
        }
    }

    pub fn int_res_loc(&self, size: u32) -> ArgLocation {
        match self {
            Cursor::Aapcs32(conv) => from_arm(conv.get_int_res_loc(size)),
            Cursor::Aapcs64(conv) => from_arm64(conv.get_int_res_loc(size)),
            Cursor::Riscv64 { conv, .. } => from_riscv64(conv.get_int_res_loc(size)),
        }
    }

    pub fn fp_res_loc(&self, size: u32) -> ArgLocation {
        match self {
            Cursor::Aapcs32(conv) => from_arm(conv.get_fp_res_loc(size)),
            Cursor::Aapcs64(conv) => from_arm64(conv.get_fp_res_loc(size)),
            Cursor::Riscv64 { conv, hard_float } => {
                if *hard_float {
                    from_riscv64(conv.get_fp_res_loc(size))
                } else {
                    from_riscv64(conv.get_int_res_loc(size))
                }
            }
        }
    }
}

fn from_arm(loc: arm::ArgLocation) -> ArgLocation {
    let kind = match loc.kind {
        arm::ArgLocationKind::None => ArgLocationKind::None,
        arm::ArgLocationKind::Stack => ArgLocationKind::Stack,
        arm::ArgLocationKind::Int => ArgLocationKind::IntReg,
        arm::ArgLocationKind::IntAndStack => ArgLocationKind::IntRegAndStack,
        arm::ArgLocationKind::Simd => ArgLocationKind::FpReg,
    };
    ArgLocation { kind, offset: loc.offset }
}

fn from_arm64(loc: arm64::ArgLocation) -> ArgLocation {
    let kind = match loc.kind {
        arm64::ArgLocationKind::None => ArgLocationKind::None,
        arm64::ArgLocationKind::Stack => ArgLocationKind::Stack,
        arm64::ArgLocationKind::Int => ArgLocationKind::IntReg,
        arm64::ArgLocationKind::Simd => ArgLocationKind::FpReg,
    };
    ArgLocation { kind, offset: loc.offset }
}

fn from_riscv64(loc: riscv64::ArgLocation) -> ArgLocation {
    let kind = match loc.kind {
        riscv64::ArgLocationKind::None => ArgLocationKind::None,
        riscv64::ArgLocationKind::Stack => ArgLocationKind::Stack,
        riscv64::ArgLocationKind::Int => ArgLocationKind::IntReg,
        riscv64::ArgLocationKind::Fp => ArgLocationKind::FpReg,
    };
    ArgLocation { kind, offset: loc.offset }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lp64_routes_fp_through_integer_registers() {
        let mut cursor = Cursor::new(GuestAbiKind::Lp64);
        let loc = cursor.next_fp_arg_loc(8, 8);
        assert_eq!(loc.kind, ArgLocationKind::IntReg);
        assert_eq!(loc.offset, 0);
    }

    #[test]
    fn lp64d_uses_fp_registers() {
        let mut cursor = Cursor::new(GuestAbiKind::Lp64d);
        let loc = cursor.next_fp_arg_loc(8, 8);
        assert_eq!(loc.kind, ArgLocationKind::FpReg);
        assert_eq!(loc.offset, 0);
    }

    #[test]
    fn lp64_large_struct_return_reserves_a0_before_visible_args() {
        let mut cursor = Cursor::new(GuestAbiKind::Lp64);
        let res_loc = cursor.reserve_large_struct_return(8, 8);
        assert_eq!(res_loc.kind, ArgLocationKind::IntReg);
        assert_eq!(res_loc.offset, 0); // a0
        let first_arg = cursor.next_int_arg_loc(8, 8);
        assert_eq!(first_arg.kind, ArgLocationKind::IntReg);
        assert_eq!(first_arg.offset, 1); // a1, not a0
    }

    #[test]
    fn aapcs64_large_struct_return_reserves_x8_without_displacing_visible_args() {
        let mut cursor = Cursor::new(GuestAbiKind::Aapcs64);
        let res_loc = cursor.reserve_large_struct_return(8, 8);
        assert_eq!(res_loc.kind, ArgLocationKind::IntReg);
        assert_eq!(res_loc.offset, 8); // x8
        let first_arg = cursor.next_int_arg_loc(8, 8);
        assert_eq!(first_arg.kind, ArgLocationKind::IntReg);
        assert_eq!(first_arg.offset, 0); // x0, untouched
    }

    #[test]
    fn aapcs32_split_case_reports_int_and_stack() {
        let mut cursor = Cursor::new(GuestAbiKind::Aapcs32);
        cursor.next_int_arg_loc(4, 4);
        cursor.next_int_arg_loc(4, 4);
        cursor.next_int_arg_loc(4, 4);
        let loc = cursor.next_int_arg_loc(8, 8);
        assert_eq!(loc.kind, ArgLocationKind::IntRegAndStack);
        assert_eq!(loc.offset, 3);
    }
}
