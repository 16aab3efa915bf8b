//! Host x86-64 instruction encoder.
//!
//! `examples/original_source` kept only the RISC-V assembler header, not an
//! x86-64 one, so this module is modeled on the *shape* the source
//! describes generically in `spec.md` §4.1 (an opcode-emitting method per
//! mnemonic, a `Label`/fixup table, `resolve_jumps` patching rel32 fields)
//! rather than ported line-for-line; the actual opcode bytes are standard
//! x86-64 encodings. Unlike RISC-V, x86-64's `lea reg, [rip+disp32]` reaches
//! any `+-2GiB` target in one instruction, so there is no two-instruction
//! PC-relative load pseudo here — see `riscv::Assembler::emit_load_address`
//! for the architecture that actually needs one.

use berberis_base::fatal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rbx = 3,
    Rsp = 4,
    Rbp = 5,
    Rsi = 6,
    Rdi = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl Register {
    fn low3(self) -> u8 {
        (self as u8) & 0b111
    }

    fn needs_rex_b_or_r(self) -> bool {
        (self as u8) >= 8
    }
}

/// x86-64 condition codes for `Jcc`/`SETcc`, keyed by the condition's
/// four-bit `tttn` encoding. `Always`/`Never` are pseudo-conditions handled
/// specially by `emit_jcc` per `spec.md` §4.1's documented tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Overflow = 0x0,
    NotOverflow = 0x1,
    Below = 0x2,
    AboveEqual = 0x3,
    Equal = 0x4,
    NotEqual = 0x5,
    BelowEqual = 0x6,
    Above = 0x7,
    Sign = 0x8,
    NotSign = 0x9,
    Less = 0xc,
    GreaterEqual = 0xd,
    LessEqual = 0xe,
    Greater = 0xf,
    Always = 0x10,
    Never = 0x11,
}

/// A base-register + 32-bit-displacement memory operand.
#[derive(Debug, Clone, Copy)]
pub struct Operand {
    pub base: Register,
    pub displacement: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

enum JumpEncoding {
    /// `0xE9 rel32`.
    Jmp,
    /// `0x0F 0x8<tttn> rel32`.
    Jcc(u8),
}

struct JumpRecord {
    label: Label,
    /// Position of the rel32 field itself (not the instruction start).
    rel32_pos: usize,
}

/// Emits host machine code into a growable byte buffer and resolves forward
/// branches through a label table. No I/O, no allocation beyond growing the
/// output buffer, matching `spec.md` §4.1's failure model.
pub struct Assembler {
    code: Vec<u8>,
    label_positions: Vec<Option<usize>>,
    jumps: Vec<JumpRecord>,
}

impl Assembler {
    pub fn new() -> Self {
        Assembler {
            code: Vec::new(),
            label_positions: Vec::new(),
            jumps: Vec::new(),
        }
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn pc(&self) -> usize {
        self.code.len()
    }

    pub fn new_label(&mut self) -> Label {
        self.label_positions.push(None);
        Label(self.label_positions.len() - 1)
    }

    /// Bind `label` to the current emission cursor. Calling this twice on
    /// the same label is a programming error and is fatal.
    pub fn bind(&mut self, label: Label) {
        let slot = &mut self.label_positions[label.0];
        if slot.is_some() {
            fatal!("label {} bound twice", label.0);
        }
        *slot = Some(self.code.len());
    }

    fn rex(&mut self, w: bool, r: bool, x: bool, b: bool) {
        if w || r || x || b {
            let byte = 0x40 | ((w as u8) << 3) | ((r as u8) << 2) | ((x as u8) << 1) | (b as u8);
            self.code.push(byte);
        }
    }

    fn modrm_reg_reg(&mut self, reg_field: u8, rm_field: u8) {
        self.code.push(0b11_000_000 | (reg_field << 3) | rm_field);
    }

    /// `mov dst, src` (64-bit general-purpose registers).
    pub fn emit_mov_reg_reg(&mut self, dst: Register, src: Register) {
        self.rex(true, src.needs_rex_b_or_r(), false, dst.needs_rex_b_or_r());
        self.code.push(0x89);
        self.modrm_reg_reg(src.low3(), dst.low3());
    }

    /// `mov dst, imm32` (sign-extended to 64 bits).
    pub fn emit_mov_reg_imm32(&mut self, dst: Register, imm: i32) {
        self.rex(true, false, false, dst.needs_rex_b_or_r());
        self.code.push(0xc7);
        self.code.push(0b11_000_000 | dst.low3());
        self.code.extend_from_slice(&imm.to_le_bytes());
    }

    /// `movabs dst, imm64`.
    pub fn emit_mov_reg_imm64(&mut self, dst: Register, imm: i64) {
        self.rex(true, false, false, dst.needs_rex_b_or_r());
        self.code.push(0xb8 + dst.low3());
        self.code.extend_from_slice(&imm.to_le_bytes());
    }

    /// `add dst, src`.
    pub fn emit_add_reg_reg(&mut self, dst: Register, src: Register) {
        self.rex(true, src.needs_rex_b_or_r(), false, dst.needs_rex_b_or_r());
        self.code.push(0x01);
        self.modrm_reg_reg(src.low3(), dst.low3());
    }

    /// `sub dst, src`.
    pub fn emit_sub_reg_reg(&mut self, dst: Register, src: Register) {
        self.rex(true, src.needs_rex_b_or_r(), false, dst.needs_rex_b_or_r());
        self.code.push(0x29);
        self.modrm_reg_reg(src.low3(), dst.low3());
    }

    /// `cmp a, b`.
    pub fn emit_cmp_reg_reg(&mut self, a: Register, b: Register) {
        self.rex(true, b.needs_rex_b_or_r(), false, a.needs_rex_b_or_r());
        self.code.push(0x39);
        self.modrm_reg_reg(b.low3(), a.low3());
    }

    /// `lea dst, [rip + disp32]`: the single-instruction host analogue of
    /// the two-instruction RISC-V AUIPC+ADDI pseudo.
    pub fn emit_lea_rip_relative(&mut self, dst: Register, displacement: i32) {
        self.rex(true, dst.needs_rex_b_or_r(), false, false);
        self.code.push(0x8d);
        self.code.push(0b00_000_101 | (dst.low3() << 3));
        self.code.extend_from_slice(&displacement.to_le_bytes());
    }

    pub fn emit_push(&mut self, reg: Register) {
        if reg.needs_rex_b_or_r() {
            self.code.push(0x41);
        }
        self.code.push(0x50 + reg.low3());
    }

    pub fn emit_pop(&mut self, reg: Register) {
        if reg.needs_rex_b_or_r() {
            self.code.push(0x41);
        }
        self.code.push(0x58 + reg.low3());
    }

    pub fn emit_ret(&mut self) {
        self.code.push(0xc3);
    }

    /// `call reg` (indirect, near).
    pub fn emit_call_reg(&mut self, reg: Register) {
        if reg.needs_rex_b_or_r() {
            self.code.push(0x41);
        }
        self.code.push(0xff);
        self.code.push(0b11_010_000 | reg.low3());
    }

    /// Unconditional jump to a label, possibly not yet bound.
    pub fn emit_jmp(&mut self, label: Label) {
        self.code.push(0xe9);
        self.register_jump(label, JumpEncoding::Jmp);
        self.code.extend_from_slice(&0i32.to_le_bytes());
    }

    /// Conditional jump. `Always` lowers to an unconditional `jmp`;
    /// `Never` emits nothing — the documented tie-breaks from `spec.md`
    /// §4.1.
    pub fn emit_jcc(&mut self, cond: Condition, label: Label) {
        match cond {
            Condition::Always => self.emit_jmp(label),
            Condition::Never => {}
            _ => {
                self.code.push(0x0f);
                self.code.push(0x80 + cond as u8);
                self.register_jump(label, JumpEncoding::Jcc(cond as u8));
                self.code.extend_from_slice(&0i32.to_le_bytes());
            }
        }
    }

    fn register_jump(&mut self, label: Label, _encoding: JumpEncoding) {
        // rel32 field immediately follows what's already been emitted.
        let rel32_pos = self.code.len();
        self.jumps.push(JumpRecord { label, rel32_pos });
    }

    /// Walk the buffered jump records; for each, compute `offset =
    /// label.position - pc_at_emit` (`pc_at_emit` here is the position
    /// *after* the rel32 field, matching how an x86 branch's displacement
    /// is relative to the address of the following instruction) and write
    /// it into the four bytes reserved for it. Fatal if a label was never
    /// bound.
    pub fn resolve_jumps(&mut self) {
        for record in std::mem::take(&mut self.jumps) {
            let target = match self.label_positions[record.label.0] {
                Some(pos) => pos,
                None => fatal!("label {} used but never bound", record.label.0),
            };
            let pc_at_emit = record.rel32_pos + 4;
            let offset = target as i64 - pc_at_emit as i64;
            let offset: i32 = offset
                .try_into()
                .unwrap_or_else(|_| fatal!("branch offset {offset} does not fit in rel32"));
            self.code[record.rel32_pos..record.rel32_pos + 4].copy_from_slice(&offset.to_le_bytes());
        }
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mov_reg_reg_uses_rex_w_for_extended_registers() {
        let mut asm = Assembler::new();
        asm.emit_mov_reg_reg(Register::R8, Register::Rax);
        // REX.W + REX.B, opcode 0x89, modrm.
        assert_eq!(asm.code(), &[0x49, 0x89, 0xc0]);
    }

    #[test]
    fn mov_reg_reg_without_extended_registers_still_sets_rex_w() {
        let mut asm = Assembler::new();
        asm.emit_mov_reg_reg(Register::Rbx, Register::Rax);
        assert_eq!(asm.code(), &[0x48, 0x89, 0xc3]);
    }

    #[test]
    fn forward_jmp_resolves_to_the_correct_rel32() {
        let mut asm = Assembler::new();
        let label = asm.new_label();
        asm.emit_jmp(label);
        asm.emit_push(Register::Rax);
        asm.emit_push(Register::Rbx);
        asm.bind(label);
        asm.resolve_jumps();

        // jmp is 5 bytes (0xE9 + rel32); two 1-byte pushes follow; rel32 is
        // relative to the byte after the jmp instruction, so offset == 2.
        let rel = i32::from_le_bytes(asm.code()[1..5].try_into().unwrap());
        assert_eq!(rel, 2);
    }

    #[test]
    fn jcc_always_lowers_to_unconditional_jump() {
        let mut asm = Assembler::new();
        let label = asm.new_label();
        asm.emit_jcc(Condition::Always, label);
        asm.bind(label);
        asm.resolve_jumps();
        assert_eq!(asm.code()[0], 0xe9);
    }

    #[test]
    fn jcc_never_emits_nothing() {
        let mut asm = Assembler::new();
        let label = asm.new_label();
        asm.emit_jcc(Condition::Never, label);
        asm.bind(label);
        asm.resolve_jumps();
        assert!(asm.code().is_empty());
    }

    #[test]
    fn backward_jcc_resolves_to_a_negative_rel32() {
        let mut asm = Assembler::new();
        let label = asm.new_label();
        asm.bind(label);
        asm.emit_push(Register::Rax);
        asm.emit_jcc(Condition::Equal, label);
        asm.resolve_jumps();

        // jcc near is 6 bytes (0x0F 0x8x + rel32); label is at offset 0,
        // push is 1 byte, so rel32 = 0 - (1 + 6) = -7.
        let code = asm.code();
        let rel_pos = code.len() - 4;
        let rel = i32::from_le_bytes(code[rel_pos..].try_into().unwrap());
        assert_eq!(rel, -7);
    }
}
