//! ABI marshalling: typed parameter/return views built on top of
//! `berberis-calling-conventions` and `berberis-guest-state`, per
//! `spec.md` §4.5.
//!
//! Two call directions share the same [`params::GuestParams`] type,
//! distinguished only by which [`storage::ArgumentStorage`] backs it:
//! [`buffer::GuestArgumentBuffer`] for host→guest calls (`spec.md` §6's
//! wire layout) and [`window::ThreadRegisterWindow`] for guest→host
//! trampolines reading a live thread's registers.

pub mod abi;
pub mod buffer;
pub mod params;
pub mod scalar;
pub mod storage;
pub mod va_list;
pub mod window;

pub use abi::{ArgLocation, ArgLocationKind, Cursor, GuestAbiKind};
pub use buffer::GuestArgumentBuffer;
pub use params::{ArgLayout, GuestParams};
pub use scalar::{ArgDescriptor, ArgumentClass, GuestScalar};
pub use storage::ArgumentStorage;
pub use va_list::VaListParams;
pub use window::{FpRegs, ThreadRegisterWindow};
