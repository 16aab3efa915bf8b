//! No-op instrumentation hook points.
//!
//! Grounded on `instrument/include/berberis/instrument/exec.h` and
//! `instrument/include/berberis/instrument/trampolines.h`: the source builds
//! these as compile-time-disabled-by-default callbacks invoked around guest
//! instruction execution and around trampoline entry/exit. Callers that want
//! real instrumentation enable the `instrument` feature and provide their own
//! implementations; without it, these are inlined away entirely.

/// Called once before a translated instruction sequence begins executing.
#[cfg(not(feature = "instrument"))]
#[inline(always)]
pub fn before_exec(_guest_pc: u64) {}

/// Called once before a translated instruction sequence begins executing.
#[cfg(feature = "instrument")]
pub fn before_exec(guest_pc: u64) {
    tracing::trace!(guest_pc, "instrument: before_exec");
}

/// Called on entry to a host trampoline servicing a guest call.
#[cfg(not(feature = "instrument"))]
#[inline(always)]
pub fn trampoline_enter(_name: &str) {}

/// Called on entry to a host trampoline servicing a guest call.
#[cfg(feature = "instrument")]
pub fn trampoline_enter(name: &str) {
    tracing::trace!(name, "instrument: trampoline_enter");
}

/// Called on exit from a host trampoline servicing a guest call.
#[cfg(not(feature = "instrument"))]
#[inline(always)]
pub fn trampoline_leave(_name: &str) {}

/// Called on exit from a host trampoline servicing a guest call.
#[cfg(feature = "instrument")]
pub fn trampoline_leave(name: &str) {
    tracing::trace!(name, "instrument: trampoline_leave");
}

/// Called around loader bring-up milestones (executable/linker/vDSO
/// mapped, linker callbacks resolved, guest main thread started).
#[cfg(not(feature = "instrument"))]
#[inline(always)]
pub fn loader_event(_event: &str) {}

/// Called around loader bring-up milestones (executable/linker/vDSO
/// mapped, linker callbacks resolved, guest main thread started).
#[cfg(feature = "instrument")]
pub fn loader_event(event: &str) {
    tracing::trace!(event, "instrument: loader_event");
}
