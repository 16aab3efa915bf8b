//! Typed, mutable program representation that codegen and the register
//! allocator operate on before final assembly, per `spec.md` §4.2.
//!
//! `Function` owns every `BasicBlock` and `Edge` in an arena; blocks and
//! edges refer to each other by index rather than by pointer (`spec.md`
//! §9's redesign note on the `BasicBlock ↔ Edge` cycle). `MachineReg` tags
//! hardware, virtual, and spilled registers in one 32-bit handle.

pub mod debug;
pub mod function;
pub mod instruction;
pub mod reg;
pub mod verify;

pub use debug::{debug_string, debug_string_for_dot};
pub use function::{BasicBlock, BlockId, Edge, EdgeId, Function};
pub use instruction::{Condition, ExitKind, Instruction, Operand, OperandKind, RealOp};
pub use reg::MachineReg;
pub use verify::{check_liveness_equation, check_ssa_dominance};
