//! Per-thread guest CPU state and thread-state record, per `spec.md` §4.3.
//!
//! The rest of the system depends only on the opaque accessors `lib.rs`
//! re-exports here, never on `CpuState`'s concrete per-ISA layout —
//! mirroring how `guest_state_opaque.h` forward-declares `CPUState`/
//! `ThreadState` and exposes only free functions.

pub mod accessor_header;
pub mod cpu_state;
pub mod csr;
pub mod guest_addr;
pub mod pending_signals;
pub mod residence;
pub mod thread_state;

pub use accessor_header::{AccessorHeader, NativeBridgeArch};
pub use cpu_state::{Arm32CpuState, Arm64CpuState, CpuState, Riscv64CpuState};
pub use csr::CsrName;
pub use guest_addr::GuestAddr;
pub use pending_signals::{PendingSignals, PendingSignalsStatus};
pub use residence::GuestThreadResidence;
pub use thread_state::{GuestIsa, ThreadState};
