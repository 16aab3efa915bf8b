//! Pending-signal state machine: `disabled <-> enabled <-> enabled and
//! pending signals present`.
//!
//! Ported from `guest_state_opaque.h`'s `PendingSignalsStatus` and
//! `guest_state.cc`'s `ArePendingSignalsPresent`/
//! `GetPendingSignalsStatusAtomic`. Read on every return from a wrapped
//! syscall, per `spec.md` §4.3, so the load is relaxed — the field exists
//! purely as a fast-path hint, not a synchronization point.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PendingSignalsStatus {
    /// Initial value; must be 0 so a zeroed `ThreadState` starts disabled.
    Disabled = 0,
    Enabled = 1,
    /// Implies `Enabled`.
    Present = 2,
}

impl PendingSignalsStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => PendingSignalsStatus::Disabled,
            1 => PendingSignalsStatus::Enabled,
            2 => PendingSignalsStatus::Present,
            _ => berberis_base::fatal!("invalid PendingSignalsStatus byte: {v}"),
        }
    }
}

/// Wraps the `ThreadState`'s pending-signals byte. A plain `AtomicU8` field
/// embedded directly in `ThreadState` rather than a newtype would work just
/// as well; this type exists so the relaxed-load convention lives in one
/// place instead of being re-chosen at every call site.
#[derive(Debug)]
pub struct PendingSignals(AtomicU8);

impl PendingSignals {
    pub fn new(initial: PendingSignalsStatus) -> Self {
        PendingSignals(AtomicU8::new(initial as u8))
    }

    pub fn store(&self, status: PendingSignalsStatus) {
        self.0.store(status as u8, Ordering::Relaxed);
    }

    pub fn load(&self) -> PendingSignalsStatus {
        PendingSignalsStatus::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub fn are_present(&self) -> bool {
        self.load() == PendingSignalsStatus::Present
    }
}

impl Default for PendingSignals {
    fn default() -> Self {
        PendingSignals::new(PendingSignalsStatus::Disabled)
    }
}
