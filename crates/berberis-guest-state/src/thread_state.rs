//! `ThreadState`: the per-guest-thread record, and its opaque accessors.
//!
//! Ported from `guest_state.cc`'s `CreateThreadState`/`DestroyThreadState`/
//! `InitThreadState` sequencing (mmap a page-aligned region, placement-
//! construct the state at an aligned offset past the accessor header,
//! initialize every field, populate the header) and the free-function
//! accessor style (`GetCPUState`/`SetCPUState`/`GetResidence`/
//! `SetResidence`/`GetGuestThread`/`SetGuestThread`/`GetInsnAddr`/
//! `SetInsnAddr`) rather than methods, so the rest of the system depends
//! only on this module's opaque surface and never on `CpuState`'s concrete
//! layout, per `spec.md` §4.3.
//!
//! The mmap + placement-construct step is unavoidably `unsafe`: it is the
//! same operation `guest_state.cc`'s `CreateThreadState` performs with a
//! placement `new` over `Mmap`-returned memory, translated to
//! `libc::mmap` + `std::ptr::write`.

use std::mem::{align_of, size_of};
use std::ptr::{self, NonNull};

use berberis_base::align::{align_up, align_up_page_size};
use berberis_base::fatal;

use crate::accessor_header::{AccessorHeader, NativeBridgeArch};
use crate::cpu_state::CpuState;
use crate::guest_addr::GuestAddr;
use crate::pending_signals::{PendingSignals, PendingSignalsStatus};
use crate::residence::GuestThreadResidence;

#[cfg(target_arch = "x86_64")]
const HOST_ARCH: NativeBridgeArch = NativeBridgeArch::X86_64;
#[cfg(target_arch = "aarch64")]
const HOST_ARCH: NativeBridgeArch = NativeBridgeArch::Arm64;

/// Which guest ISA's `CpuState` variant to construct. Mirrors the
/// `NATIVE_BRIDGE_GUEST_ARCH_*` compile-time selection in `guest_state.cc`,
/// made a runtime parameter here since this crate supports all three guest
/// ISAs in one build rather than one per translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestIsa {
    Arm32,
    Arm64,
    Riscv64,
}

impl GuestIsa {
    fn native_bridge_arch(self) -> NativeBridgeArch {
        match self {
            GuestIsa::Arm32 => NativeBridgeArch::Arm,
            GuestIsa::Arm64 => NativeBridgeArch::Arm64,
            GuestIsa::Riscv64 => NativeBridgeArch::Riscv64,
        }
    }

    fn default_cpu_state(self) -> CpuState {
        match self {
            GuestIsa::Arm32 => CpuState::Arm32(Default::default()),
            GuestIsa::Arm64 => CpuState::Arm64(Default::default()),
            GuestIsa::Riscv64 => CpuState::Riscv64(Default::default()),
        }
    }
}

pub struct ThreadState {
    pub cpu: CpuState,
    thread: Option<NonNull<()>>,
    pending_signals_status: PendingSignals,
    residence: GuestThreadResidence,
    instrument_data: Option<NonNull<()>>,
    thread_state_storage: *mut u8,
    thread_state_storage_len: usize,
}

// SAFETY: ThreadState is handed off across threads the same way the C++
// original is — the owning thread writes it; other threads only read it
// through the documented accessor header. Send/Sync here match that
// contract rather than granting unrestricted concurrent mutation.
unsafe impl Send for ThreadState {}

impl ThreadState {
    /// Allocates a page-aligned, anonymous mapping, constructs a
    /// `ThreadState` in place past an aligned accessor header, and
    /// populates that header. Returns `None` if the mapping fails (mirrors
    /// `CreateThreadState` returning `nullptr` on `Mmap` failure).
    pub fn create(guest_isa: GuestIsa) -> Option<NonNull<ThreadState>> {
        let header_offset = align_up(size_of::<AccessorHeader>(), align_of::<ThreadState>());
        let storage_len = align_up_page_size(header_offset + size_of::<ThreadState>());

        // SAFETY: standard anonymous-mapping request; result is checked
        // against MAP_FAILED before use.
        let storage = unsafe {
            libc::mmap(
                ptr::null_mut(),
                storage_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if storage == libc::MAP_FAILED {
            return None;
        }
        let storage = storage as *mut u8;

        // SAFETY: `state_ptr` is within the mapping just created, aligned
        // for `ThreadState`, and not yet read as a `ThreadState` by anyone.
        let state_ptr = unsafe { storage.add(header_offset) as *mut ThreadState };
        let state = ThreadState {
            cpu: guest_isa.default_cpu_state(),
            thread: None,
            pending_signals_status: PendingSignals::new(PendingSignalsStatus::Disabled),
            residence: GuestThreadResidence::OutsideGeneratedCode,
            instrument_data: None,
            thread_state_storage: storage,
            thread_state_storage_len: storage_len,
        };
        unsafe {
            ptr::write(state_ptr, state);
        }

        let header = AccessorHeader::new(
            HOST_ARCH,
            guest_isa.native_bridge_arch(),
            state_ptr as *const (),
            align_up_page_size(size_of::<ThreadState>()),
        );
        // SAFETY: the header lives in the mapping's first bytes, which are
        // reserved for it and large enough (`header_offset >=
        // size_of::<AccessorHeader>()`).
        unsafe {
            ptr::write(storage as *mut AccessorHeader, header);
        }

        NonNull::new(state_ptr)
    }

    /// Unmaps the region backing `state`. The caller must not use `state`
    /// (or any reference derived from it) afterward.
    ///
    /// # Safety
    /// `state` must have been returned by [`ThreadState::create`] and not
    /// already destroyed.
    pub unsafe fn destroy(state: NonNull<ThreadState>) {
        let storage = state.as_ref().thread_state_storage;
        let storage_len = state.as_ref().thread_state_storage_len;
        ptr::drop_in_place(state.as_ptr());
        let rc = libc::munmap(storage as *mut libc::c_void, storage_len);
        if rc != 0 {
            fatal!("munmap of thread state storage failed");
        }
    }

    pub fn thread_state_storage(&self) -> *mut u8 {
        self.thread_state_storage
    }

    pub fn set_guest_thread(&mut self, thread: Option<NonNull<()>>) {
        self.thread = thread;
    }

    pub fn guest_thread(&self) -> Option<NonNull<()>> {
        self.thread
    }

    pub fn residence(&self) -> GuestThreadResidence {
        self.residence
    }

    pub fn set_residence(&mut self, residence: GuestThreadResidence) {
        self.residence = residence;
    }

    pub fn pending_signals(&self) -> &PendingSignals {
        &self.pending_signals_status
    }

    pub fn set_instrument_data(&mut self, data: Option<NonNull<()>>) {
        self.instrument_data = data;
    }

    pub fn instrument_data(&self) -> Option<NonNull<()>> {
        self.instrument_data
    }

    pub fn insn_addr(&self) -> GuestAddr {
        match &self.cpu {
            CpuState::Riscv64(s) => s.insn_addr,
            _ => fatal!("insn_addr is only tracked explicitly for Riscv64CpuState"),
        }
    }

    pub fn set_insn_addr(&mut self, addr: GuestAddr) {
        match &mut self.cpu {
            CpuState::Riscv64(s) => s.insn_addr = addr,
            _ => fatal!("insn_addr is only tracked explicitly for Riscv64CpuState"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_destroy_round_trips() {
        let state = ThreadState::create(GuestIsa::Riscv64).expect("mmap should succeed");
        // SAFETY: freshly created, not yet destroyed.
        unsafe {
            assert_eq!((*state.as_ptr()).residence(), GuestThreadResidence::OutsideGeneratedCode);
            assert!(!(*state.as_ptr()).pending_signals().are_present());
            ThreadState::destroy(state);
        }
    }

    #[test]
    fn insn_addr_round_trips_for_riscv64() {
        let state = ThreadState::create(GuestIsa::Riscv64).unwrap();
        unsafe {
            let state_mut = &mut *state.as_ptr();
            state_mut.set_insn_addr(GuestAddr(0x1000));
            assert_eq!(state_mut.insn_addr(), GuestAddr(0x1000));
            ThreadState::destroy(state);
        }
    }
}
