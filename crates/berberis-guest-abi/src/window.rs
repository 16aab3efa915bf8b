//! `ThreadRegisterWindow`: a live thread's register file viewed as the same
//! three byte areas `GuestArgumentBuffer` exposes, for guest→host
//! trampolines.
//!
//! Ported from `guest_abi/{arm64,riscv64}/include/.../guest_params_arch.h`'s
//! `GuestParamsAndReturn(ThreadState* state)` constructor, which captures
//! `state->cpu.x`/`state->cpu.v`/`ToHostAddr<uint8_t>(state->cpu.sp)`
//! directly rather than copying through a `GuestArgumentBuffer` — a
//! guest→host trampoline reads parameters where the guest call left them,
//! not in a freshly marshalled buffer.

use crate::storage::ArgumentStorage;

/// The FP/SIMD register file's element width varies by guest ISA: AAPCS32's
/// `s`-registers are 32-bit, AAPCS64's `v`-registers are 128-bit, LP64D's
/// `f`-registers are 64-bit.
pub enum FpRegs<'a> {
    Narrow32(&'a mut [u32]),
    Wide64(&'a mut [u64]),
    Wide128(&'a mut [u128]),
}

/// `ThreadRegisterWindow` borrows directly into a live thread's register
/// arrays and stack memory; it does not own or copy them. Constructing one
/// is the Rust analog of `x_(state->cpu.x), v_(state->cpu.v), s_(...)`.
pub struct ThreadRegisterWindow<'a> {
    int_regs: &'a mut [u64],
    fp_regs: FpRegs<'a>,
    stack: &'a mut [u8],
}

impl<'a> ThreadRegisterWindow<'a> {
    pub fn new(int_regs: &'a mut [u64], fp_regs: FpRegs<'a>, stack: &'a mut [u8]) -> Self {
        ThreadRegisterWindow { int_regs, fp_regs, stack }
    }

    fn int_bytes(&self) -> &[u8] {
        // SAFETY: reinterpreting a register array as raw bytes, same as the
        // source's pointer arithmetic over `uint64_t x[32]`.
        unsafe {
            std::slice::from_raw_parts(self.int_regs.as_ptr() as *const u8, std::mem::size_of_val(self.int_regs))
        }
    }

    fn int_bytes_mut(&mut self) -> &mut [u8] {
        unsafe {
            std::slice::from_raw_parts_mut(
                self.int_regs.as_mut_ptr() as *mut u8,
                std::mem::size_of_val(self.int_regs),
            )
        }
    }
}

impl<'a> ArgumentStorage for ThreadRegisterWindow<'a> {
    fn int_area(&self) -> &[u8] {
        self.int_bytes()
    }

    fn int_area_mut(&mut self) -> &mut [u8] {
        self.int_bytes_mut()
    }

    fn fp_area(&self) -> &[u8] {
        match &self.fp_regs {
            FpRegs::Narrow32(r) => unsafe {
                std::slice::from_raw_parts(r.as_ptr() as *const u8, std::mem::size_of_val(*r))
            },
            FpRegs::Wide64(r) => unsafe {
                std::slice::from_raw_parts(r.as_ptr() as *const u8, std::mem::size_of_val(*r))
            },
            FpRegs::Wide128(r) => unsafe {
                std::slice::from_raw_parts(r.as_ptr() as *const u8, std::mem::size_of_val(*r))
            },
        }
    }

    fn fp_area_mut(&mut self) -> &mut [u8] {
        match &mut self.fp_regs {
            FpRegs::Narrow32(r) => unsafe {
                std::slice::from_raw_parts_mut(r.as_mut_ptr() as *mut u8, std::mem::size_of_val(*r))
            },
            FpRegs::Wide64(r) => unsafe {
                std::slice::from_raw_parts_mut(r.as_mut_ptr() as *mut u8, std::mem::size_of_val(*r))
            },
            FpRegs::Wide128(r) => unsafe {
                std::slice::from_raw_parts_mut(r.as_mut_ptr() as *mut u8, std::mem::size_of_val(*r))
            },
        }
    }

    fn stack_area(&self) -> &[u8] {
        self.stack
    }

    fn stack_area_mut(&mut self) -> &mut [u8] {
        self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{Cursor, GuestAbiKind};
    use crate::storage::{read_location, write_location};

    #[test]
    fn reads_int_register_written_by_a_guest_call() {
        let mut x = [0u64; 32];
        x[10] = 99; // a0, per LP64D
        let mut f = [0u64; 32];
        let mut stack = [0u8; 64];
        let window = ThreadRegisterWindow::new(&mut x, FpRegs::Wide64(&mut f), &mut stack);

        let mut cursor = Cursor::new(GuestAbiKind::Lp64d);
        let loc = cursor.next_int_arg_loc(8, 8);
        let bytes = read_location(&window, GuestAbiKind::Lp64d, loc, 8);
        assert_eq!(u64::from_ne_bytes(bytes.try_into().unwrap()), 99);
    }

    #[test]
    fn writes_return_value_into_a0() {
        let mut x = [0u64; 32];
        let mut f = [0u64; 32];
        let mut stack = [0u8; 64];
        let mut window = ThreadRegisterWindow::new(&mut x, FpRegs::Wide64(&mut f), &mut stack);

        let cursor = Cursor::new(GuestAbiKind::Lp64d);
        let loc = cursor.int_res_loc(8);
        write_location(&mut window, GuestAbiKind::Lp64d, loc, &7u64.to_ne_bytes());
        assert_eq!(x[10], 7);
    }
}
