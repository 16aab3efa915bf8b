//! `GuestArgumentBuffer`: the host→guest call marshalling buffer, laid out
//! exactly per `spec.md` §6's table.
//!
//! Ported from `guest_abi/{arm,arm64,riscv64}/include/.../guest_arguments_arch.h`'s
//! `GuestArgumentBuffer` struct, generalized to the one shape that covers
//! every guest ISA (the per-arch headers each define a narrower version:
//! ARM32's has no SIMD fields, ARM64's and RISC-V's do). `spec.md`'s own §6
//! table already describes the generalized shape, so this is a direct port
//! of that table rather than of any single header.

#[derive(Debug, Clone)]
pub struct GuestArgumentBuffer {
    pub argc: i32,
    pub resc: i32,
    pub simd_argc: i32,
    pub simd_resc: i32,
    pub stack_argc: i32,
    pub argv: [u64; 8],
    pub simd_argv: [u128; 8],
    pub stack_argv: Vec<u8>,
}

impl GuestArgumentBuffer {
    pub fn new(stack_bytes: usize) -> Self {
        GuestArgumentBuffer {
            argc: 8,
            resc: 8,
            simd_argc: 8,
            simd_resc: 8,
            stack_argc: stack_bytes as i32,
            argv: [0; 8],
            simd_argv: [0; 8],
            stack_argv: vec![0u8; stack_bytes],
        }
    }
}

impl crate::storage::ArgumentStorage for GuestArgumentBuffer {
    fn int_area(&self) -> &[u8] {
        // SAFETY: `[u64; 8]` has no padding; reinterpreting it as bytes is
        // the same operation the source performs via `argv + loc.offset`
        // pointer arithmetic on a `uint64_t[8]`.
        unsafe {
            std::slice::from_raw_parts(self.argv.as_ptr() as *const u8, std::mem::size_of_val(&self.argv))
        }
    }

    fn int_area_mut(&mut self) -> &mut [u8] {
        unsafe {
            std::slice::from_raw_parts_mut(self.argv.as_mut_ptr() as *mut u8, std::mem::size_of_val(&self.argv))
        }
    }

    fn fp_area(&self) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts(
                self.simd_argv.as_ptr() as *const u8,
                std::mem::size_of_val(&self.simd_argv),
            )
        }
    }

    fn fp_area_mut(&mut self) -> &mut [u8] {
        unsafe {
            std::slice::from_raw_parts_mut(
                self.simd_argv.as_mut_ptr() as *mut u8,
                std::mem::size_of_val(&self.simd_argv),
            )
        }
    }

    fn stack_area(&self) -> &[u8] {
        &self.stack_argv
    }

    fn stack_area_mut(&mut self) -> &mut [u8] {
        &mut self.stack_argv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{Cursor, GuestAbiKind};
    use crate::scalar::ArgDescriptor;
    use crate::storage::{read_location, write_location};

    #[test]
    fn write_then_read_int_arg_round_trips() {
        let mut buf = GuestArgumentBuffer::new(64);
        let mut cursor = Cursor::new(GuestAbiKind::Aapcs64);
        let loc = cursor.next_int_arg_loc(ArgDescriptor::of::<i64>().size, ArgDescriptor::of::<i64>().alignment);
        write_location(&mut buf, GuestAbiKind::Aapcs64, loc, &42i64.to_ne_bytes());
        let bytes = read_location(&buf, GuestAbiKind::Aapcs64, loc, 8);
        assert_eq!(i64::from_ne_bytes(bytes.try_into().unwrap()), 42);
    }

    #[test]
    fn write_then_read_fp_arg_round_trips() {
        let mut buf = GuestArgumentBuffer::new(64);
        let mut cursor = Cursor::new(GuestAbiKind::Lp64d);
        let loc = cursor.next_fp_arg_loc(8, 8);
        write_location(&mut buf, GuestAbiKind::Lp64d, loc, &1.5f64.to_ne_bytes());
        let bytes = read_location(&buf, GuestAbiKind::Lp64d, loc, 8);
        assert_eq!(f64::from_ne_bytes(bytes.try_into().unwrap()), 1.5);
    }

    #[test]
    fn aapcs32_split_argument_round_trips_across_register_and_stack() {
        let mut buf = GuestArgumentBuffer::new(64);
        let mut cursor = Cursor::new(GuestAbiKind::Aapcs32);
        cursor.next_int_arg_loc(4, 4);
        cursor.next_int_arg_loc(4, 4);
        cursor.next_int_arg_loc(4, 4);
        let loc = cursor.next_int_arg_loc(8, 8);
        let value = 0x1122_3344_5566_7788u64;
        write_location(&mut buf, GuestAbiKind::Aapcs32, loc, &value.to_ne_bytes());
        let bytes = read_location(&buf, GuestAbiKind::Aapcs32, loc, 8);
        assert_eq!(u64::from_ne_bytes(bytes.try_into().unwrap()), value);
    }
}
