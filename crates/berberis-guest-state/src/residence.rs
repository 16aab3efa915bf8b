//! Tracks whether a guest thread is currently executing translated code.
//!
//! Ported from `guest_state_opaque.h`'s `GuestThreadResidence`. This is the
//! sole authority `spec.md` §3 names for whether an asynchronous signal can
//! be delivered synchronously or must be deferred.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GuestThreadResidence {
    OutsideGeneratedCode = 0,
    InsideGeneratedCode = 1,
}
