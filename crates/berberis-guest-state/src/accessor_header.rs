//! The published accessor header: the first bytes of the mmap'd region
//! backing a `ThreadState`, readable by an external debugger without
//! knowing the concrete register-file layout, per `spec.md` §3's
//! "Invariants."
//!
//! Ported from `guest_state.cc`'s `InitializeNativeBridgeGuestStateHeader`
//! and the `NativeBridgeGuestStateHeader` shape it populates (`signature`,
//! `native_bridge_host_arch`, `native_bridge_guest_arch`,
//! `guest_state_data`, `guest_state_data_size`).

pub const SIGNATURE: u32 = 0x4273_4753; // "BsGS", arbitrary but stable magic.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NativeBridgeArch {
    Arm = 1,
    Arm64 = 2,
    X86 = 3,
    X86_64 = 4,
    Riscv64 = 5,
}

/// Mirrors `NativeBridgeGuestStateHeader`. `#[repr(C)]` because an external
/// debugger parses these bytes directly out of the live mapping.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AccessorHeader {
    pub signature: u32,
    pub native_bridge_host_arch: NativeBridgeArch,
    pub native_bridge_guest_arch: NativeBridgeArch,
    pub guest_state_data: *const (),
    pub guest_state_data_size: usize,
}

impl AccessorHeader {
    pub fn new(
        host_arch: NativeBridgeArch,
        guest_arch: NativeBridgeArch,
        guest_state_data: *const (),
        guest_state_data_size: usize,
    ) -> Self {
        AccessorHeader {
            signature: SIGNATURE,
            native_bridge_host_arch: host_arch,
            native_bridge_guest_arch: guest_arch,
            guest_state_data,
            guest_state_data_size,
        }
    }
}
