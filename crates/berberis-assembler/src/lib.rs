//! Label/fixup instruction encoders for the host ISAs Berberis can run on
//! (`x86_64`) plus the guest-model immediate machinery shared by the
//! RISC-V backend (`riscv`).
//!
//! Both modules follow the same shape: a buffer of emitted bytes, a table
//! of labels, and a `resolve_jumps` pass that patches branch displacements
//! once every label is bound. See each module's doc comment for why the
//! two differ where guest-vs-host concerns diverge (most visibly, the
//! two-instruction PC-relative-load pseudo RISC-V needs and x86-64
//! doesn't).

pub mod riscv;
pub mod x86_64;
