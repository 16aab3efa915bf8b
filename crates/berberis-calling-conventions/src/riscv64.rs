//! LP64/LP64D (RISC-V64) argument-location cursor.
//!
//! Ported from `calling_conventions_riscv64.h`, with one behavior taken from
//! `calling_conventions_riscv64_test.cc`'s `FpSpilling` test rather than the
//! header: once the floating-point register file (f10-f17) is exhausted, an
//! overflowing FP argument is *not* sent straight to the stack — it spills
//! into whatever integer registers (x10-x17) are still unused, exactly as if
//! it were an integer argument of the same size, and only falls to the stack
//! once both register files are spent. See `DESIGN.md` for why this
//! implementation follows the test over the header.

use crate::align_up;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgLocationKind {
    None,
    Stack,
    /// x10 - x17
    Int,
    /// f10 - f17
    Fp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgLocation {
    pub kind: ArgLocationKind,
    pub offset: u32,
}

const MAX_INT_OFFSET: u32 = 8;
const MAX_FP_OFFSET: u32 = 8;

#[derive(Debug, Clone, Default)]
pub struct CallingConventions {
    int_offset: u32,
    fp_offset: u32,
    stack_offset: u32,
}

impl CallingConventions {
    pub const STACK_ALIGNMENT_BEFORE_CALL: u32 = 16;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_next_int_arg_loc(&mut self, size: u32, alignment: u32) -> ArgLocation {
        if size > 16 || size != alignment {
            berberis_base::fatal!("invalid int arg size/alignment: {size}/{alignment}");
        }

        match self.try_take_int_reg(size) {
            Some(loc) => loc,
            None => {
                self.int_offset = MAX_INT_OFFSET;
                self.get_next_stack_arg_loc(size, alignment)
            }
        }
    }

    pub fn get_next_fp_arg_loc(&mut self, size: u32, alignment: u32) -> ArgLocation {
        if size > 16 || size != alignment {
            berberis_base::fatal!("invalid fp arg size/alignment: {size}/{alignment}");
        }

        if self.fp_offset < MAX_FP_OFFSET {
            let loc = ArgLocation {
                kind: ArgLocationKind::Fp,
                offset: self.fp_offset,
            };
            self.fp_offset += 1;
            return loc;
        }

        if let Some(loc) = self.try_take_int_reg(size) {
            return loc;
        }

        self.int_offset = MAX_INT_OFFSET;
        self.get_next_stack_arg_loc(size, alignment)
    }

    pub fn get_int_res_loc(&self, size: u32) -> ArgLocation {
        if size > 16 {
            berberis_base::fatal!("invalid int result size: {size}");
        }
        // a0
        ArgLocation {
            kind: ArgLocationKind::Int,
            offset: 10,
        }
    }

    pub fn get_fp_res_loc(&self, size: u32) -> ArgLocation {
        if size > 16 {
            berberis_base::fatal!("invalid fp result size: {size}");
        }
        // fa0
        ArgLocation {
            kind: ArgLocationKind::Fp,
            offset: 10,
        }
    }

    fn try_take_int_reg(&mut self, size: u32) -> Option<ArgLocation> {
        let size_in_regs = if size > 8 { 2 } else { 1 };
        let alignment_in_regs = size_in_regs;
        let aligned_int_offset = align_up(self.int_offset, alignment_in_regs);

        if aligned_int_offset + size_in_regs <= MAX_INT_OFFSET {
            self.int_offset = aligned_int_offset + size_in_regs;
            Some(ArgLocation {
                kind: ArgLocationKind::Int,
                offset: aligned_int_offset,
            })
        } else {
            None
        }
    }

    fn get_next_stack_arg_loc(&mut self, size: u32, alignment: u32) -> ArgLocation {
        debug_assert!(size <= 16);
        debug_assert_eq!(size, alignment);

        // Pointer-sized and smaller arguments are aligned at 8 bytes on the
        // stack; larger arguments keep their natural alignment.
        let alignment_in_stack = if alignment > 8 { alignment } else { 8 };
        let size_in_stack = align_up(size, alignment_in_stack);

        let aligned_stack_offset = align_up(self.stack_offset, alignment_in_stack);
        self.stack_offset = aligned_stack_offset + size_in_stack;
        ArgLocation {
            kind: ArgLocationKind::Stack,
            offset: aligned_stack_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoke() {
        let mut conv = CallingConventions::new();

        let loc = conv.get_next_int_arg_loc(4, 4);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Int, 0));
        let loc = conv.get_next_int_arg_loc(8, 8);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Int, 1));
        let loc = conv.get_next_int_arg_loc(8, 8);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Int, 2));
        let loc = conv.get_next_int_arg_loc(8, 8);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Int, 3));
        let loc = conv.get_next_int_arg_loc(2, 2);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Int, 4));
        let loc = conv.get_next_int_arg_loc(1, 1);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Int, 5));
        let loc = conv.get_next_int_arg_loc(1, 1);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Int, 6));
        let loc = conv.get_next_int_arg_loc(2, 2);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Int, 7));

        let loc = conv.get_next_int_arg_loc(4, 4);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Stack, 0));
        let loc = conv.get_next_int_arg_loc(4, 4);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Stack, 8));
        let loc = conv.get_next_int_arg_loc(4, 4);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Stack, 16));
        let loc = conv.get_next_int_arg_loc(2, 2);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Stack, 24));
        let loc = conv.get_next_int_arg_loc(1, 1);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Stack, 32));

        let loc = conv.get_next_fp_arg_loc(8, 8);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Fp, 0));
        let loc = conv.get_next_fp_arg_loc(4, 4);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Fp, 1));
        let loc = conv.get_next_fp_arg_loc(4, 4);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Fp, 2));

        let loc = conv.get_int_res_loc(1);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Int, 10));
    }

    #[test]
    fn fp_spilling() {
        let mut conv = CallingConventions::new();

        let loc = conv.get_next_int_arg_loc(4, 4);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Int, 0));
        let loc = conv.get_next_int_arg_loc(8, 8);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Int, 1));

        for expected in 0..8u32 {
            let loc = conv.get_next_fp_arg_loc(8, 8);
            assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Fp, expected));
        }

        // fp registers are exhausted; spill into x12-x17 (int cursor resumes
        // at 2, where it was left after the two integer arguments above).
        for expected in 2..8u32 {
            let loc = conv.get_next_fp_arg_loc(8, 8);
            assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Int, expected));
        }

        // both register files are now spent.
        let loc = conv.get_next_fp_arg_loc(8, 8);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Stack, 0));
        let loc = conv.get_next_int_arg_loc(8, 8);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Stack, 8));
        let loc = conv.get_next_fp_arg_loc(8, 8);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Stack, 16));
        let loc = conv.get_next_int_arg_loc(8, 8);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Stack, 24));

        let loc = conv.get_fp_res_loc(4);
        assert_eq!((loc.kind, loc.offset), (ArgLocationKind::Fp, 10));
    }
}
