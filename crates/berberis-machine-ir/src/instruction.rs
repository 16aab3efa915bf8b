//! `Instruction`: opcode plus an ordered operand vector, matching
//! `spec.md` §4.2's contract that operand order within an instruction is
//! fixed by opcode (defs first, then uses) and that the per-operand kind
//! annotation drives liveness.
//!
//! Ported from the shape of the `MachineInsn` hierarchy seen in
//! `backend/common/machine_ir_debug.cc` (`PseudoBranch`, `PseudoCondBranch`,
//! `PseudoJump`, `PseudoIndirectJump`, `PseudoCopy`, `PseudoDefReg`,
//! `PseudoReadFlags`, `PseudoWriteFlags`) and
//! `backend/include/berberis/backend/x86_64/machine_ir_builder.h`'s `CallImm`/
//! `CallImmArg`. The source models each pseudo as its own `MachineInsn`
//! subclass; a closed Rust enum captures the same fixed set of shapes more
//! directly and lets `GetDebugString`'s per-kind formatting become a single
//! `match`.

use crate::reg::{self, MachineReg};
use std::fmt;

/// How an instruction uses a register operand. Drives liveness the way
/// `spec.md` §4.2 describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Use,
    Def,
    /// A def whose register must not alias any use operand's register —
    /// the register allocator must not reuse a use's register for this def.
    DefEarlyClobber,
    UseDef,
}

#[derive(Debug, Clone, Copy)]
pub struct Operand {
    pub reg: MachineReg,
    pub kind: OperandKind,
}

impl Operand {
    pub fn new(reg: MachineReg, kind: OperandKind) -> Self {
        Operand { reg, kind }
    }

    pub fn is_def(&self) -> bool {
        matches!(
            self.kind,
            OperandKind::Def | OperandKind::DefEarlyClobber | OperandKind::UseDef
        )
    }

    pub fn is_use(&self) -> bool {
        matches!(self.kind, OperandKind::Use | OperandKind::UseDef)
    }
}

/// A conditional-branch pseudo's condition. Architecture-neutral at this
/// layer; a backend's real-instruction selection pass maps these onto host
/// condition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Below,
    BelowEqual,
    Above,
    AboveEqual,
}

/// Which exit path a `JumpToExit` pseudo takes, mirroring `PseudoJump::Kind`
/// in the kept source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    WithPendingSignalsCheck,
    WithoutPendingSignalsCheck,
    Syscall,
    ExitGeneratedCode,
}

/// A real, not-yet-selected host opcode together with its operands. The
/// assembler/instruction-selection layer is responsible for turning this
/// into actual bytes; `berberis-machine-ir` only carries the shape.
#[derive(Debug, Clone)]
pub struct RealOp {
    pub mnemonic: &'static str,
    pub operands: Vec<Operand>,
    pub immediate: Option<i64>,
}

/// One instruction in a `BasicBlock` or `Edge`'s instruction list.
///
/// The pseudo variants are the closed set `spec.md` §4.2 names. `Real`
/// covers anything instruction selection has already lowered to an actual
/// host opcode.
#[derive(Debug, Clone)]
pub enum Instruction {
    /// Unconditional branch to another basic block.
    Branch { target: usize },
    /// Conditional branch: `then`/`else_` are basic-block ids; `flags` is
    /// the flags-carrying operand the condition reads.
    CondBranch {
        cond: Condition,
        then: usize,
        else_: usize,
        flags: Operand,
    },
    /// Jump through a register rather than to a known block.
    IndirectJump { src: Operand },
    /// Jump to a fixed guest or host address, tagged with the exit path the
    /// runtime should take.
    JumpToExit { target: u64, kind: ExitKind },
    /// Register-to-register move of `size_bytes` (the allocator picks a
    /// move instruction whose width matches).
    Copy {
        dst: Operand,
        src: Operand,
        size_bytes: u32,
    },
    /// Pseudo-def used to model ABI-provided inputs — introduces a vreg's
    /// first value without a real producing instruction.
    DefineAsInput { dst: Operand },
    /// Reads the flags register into `dst`; `skip_overflow` is a hint that
    /// the consumer never inspects the overflow bit.
    ReadFlags { dst: Operand, skip_overflow: bool },
    /// Writes `src` into the flags register.
    WriteFlags { dst: Operand, src: Operand },
    /// Call to a fixed host address. `clobbers` lists every register the
    /// callee clobbers per the host ABI so the allocator sees the clobber
    /// set even though the emitted call is a single opcode.
    CallImmediate {
        target: u64,
        flags: Operand,
        clobbers: Vec<Operand>,
    },
    /// One argument register feeding the `CallImmediate` that follows it in
    /// program order.
    CallImmediateArgument { arg: Operand },
    Real(RealOp),
}

impl Instruction {
    /// All register operands in the fixed defs-then-uses order `spec.md`
    /// §4.2 requires.
    pub fn operands(&self) -> Vec<Operand> {
        match self {
            Instruction::Branch { .. } => vec![],
            Instruction::CondBranch { flags, .. } => vec![*flags],
            Instruction::IndirectJump { src } => vec![*src],
            Instruction::JumpToExit { .. } => vec![],
            Instruction::Copy { dst, src, .. } => vec![*dst, *src],
            Instruction::DefineAsInput { dst } => vec![*dst],
            Instruction::ReadFlags { dst, .. } => vec![*dst],
            Instruction::WriteFlags { dst, src } => vec![*dst, *src],
            Instruction::CallImmediate { flags, clobbers, .. } => {
                let mut ops = clobbers.clone();
                ops.push(*flags);
                ops
            }
            Instruction::CallImmediateArgument { arg } => vec![*arg],
            Instruction::Real(op) => op.operands.clone(),
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Branch { .. }
                | Instruction::CondBranch { .. }
                | Instruction::IndirectJump { .. }
                | Instruction::JumpToExit { .. }
        )
    }

    fn reg_operand_debug_string(op: &Operand) -> String {
        let mut out = String::new();
        if op.reg.is_vreg() {
            out.push_str("v ");
        }
        out.push_str(&reg::debug_string(op.reg));
        out
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Branch { target } => write!(f, "PSEUDO_BRANCH {target}"),
            Instruction::CondBranch { cond, then, else_, flags } => write!(
                f,
                "PSEUDO_COND_BRANCH {cond:?}, {then}, {else_}, ({})",
                Self::reg_operand_debug_string(flags)
            ),
            Instruction::IndirectJump { src } => {
                write!(f, "PSEUDO_INDIRECT_JUMP {}", Self::reg_operand_debug_string(src))
            }
            Instruction::JumpToExit { target, kind } => {
                let suffix = match kind {
                    ExitKind::WithPendingSignalsCheck => "_SIG_CHECK",
                    ExitKind::WithoutPendingSignalsCheck => "",
                    ExitKind::Syscall => "_TO_SYSCALL",
                    ExitKind::ExitGeneratedCode => "_EXIT_GEN_CODE",
                };
                write!(f, "PSEUDO_JUMP{suffix} {target:#x}")
            }
            Instruction::Copy { dst, src, .. } => write!(
                f,
                "PSEUDO_COPY {}, {}",
                Self::reg_operand_debug_string(dst),
                Self::reg_operand_debug_string(src)
            ),
            Instruction::DefineAsInput { dst } => {
                write!(f, "PSEUDO_DEF {}", Self::reg_operand_debug_string(dst))
            }
            Instruction::ReadFlags { dst, skip_overflow } => write!(
                f,
                "PSEUDO_READ_FLAGS {}{}",
                if *skip_overflow { "(skip overflow) " } else { "" },
                Self::reg_operand_debug_string(dst)
            ),
            Instruction::WriteFlags { dst, src } => write!(
                f,
                "PSEUDO_WRITE_FLAGS {}, {}",
                Self::reg_operand_debug_string(dst),
                Self::reg_operand_debug_string(src)
            ),
            Instruction::CallImmediate { target, .. } => write!(f, "CALL_IMM {target:#x}"),
            Instruction::CallImmediateArgument { arg } => {
                write!(f, "CALL_IMM_ARG {}", Self::reg_operand_debug_string(arg))
            }
            Instruction::Real(op) => {
                write!(f, "{}", op.mnemonic)?;
                if let Some(imm) = op.immediate {
                    write!(f, " {imm}")?;
                }
                for operand in &op.operands {
                    write!(f, " {}", Self::reg_operand_debug_string(operand))?;
                }
                Ok(())
            }
        }
    }
}
