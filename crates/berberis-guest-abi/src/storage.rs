//! `ArgumentStorage`: the byte-addressable backing for an `ArgLocation`.
//!
//! Two implementations exist: [`crate::buffer::GuestArgumentBuffer`] (the
//! host→guest marshalling buffer `spec.md` §6 lays out byte-for-byte) and
//! [`crate::window::ThreadRegisterWindow`] (a live thread's register file,
//! for guest→host trampolines reading `GuestParamsAndReturn(ThreadState*)`
//! style parameters). Both expose the same three byte areas so
//! [`crate::params::GuestParams`] only has to be written once.

use crate::abi::{ArgLocation, ArgLocationKind, GuestAbiKind};

pub trait ArgumentStorage {
    fn int_area(&self) -> &[u8];
    fn int_area_mut(&mut self) -> &mut [u8];
    fn fp_area(&self) -> &[u8];
    fn fp_area_mut(&mut self) -> &mut [u8];
    fn stack_area(&self) -> &[u8];
    fn stack_area_mut(&mut self) -> &mut [u8];
}

/// Reads `size` raw bytes out of `loc`. For the AAPCS32 `IntRegAndStack`
/// split, concatenates the register tail and the stack head, per
/// `calling_conventions_arm.h`'s "only the first stack-crossing argument
/// splits, and only when the stack is still untouched" invariant (see
/// `crate::abi::ArgLocationKind::IntRegAndStack`).
pub fn read_location<S: ArgumentStorage + ?Sized>(
    storage: &S,
    abi: GuestAbiKind,
    loc: ArgLocation,
    size: u32,
) -> Vec<u8> {
    let size = size as usize;
    match loc.kind {
        ArgLocationKind::None => {
            berberis_base::fatal!("cannot read a `None` argument location")
        }
        ArgLocationKind::IntReg => {
            let start = (loc.offset * abi.int_unit_bytes()) as usize;
            storage.int_area()[start..start + size].to_vec()
        }
        ArgLocationKind::FpReg => {
            let start = (loc.offset * abi.fp_unit_bytes()) as usize;
            storage.fp_area()[start..start + size].to_vec()
        }
        ArgLocationKind::Stack => {
            let start = loc.offset as usize;
            storage.stack_area()[start..start + size].to_vec()
        }
        ArgLocationKind::IntRegAndStack => {
            let unit = abi.int_unit_bytes();
            let reg_start = (loc.offset * unit) as usize;
            let int_area_len = abi.int_area_bytes() as usize;
            let reg_bytes = int_area_len - reg_start;
            let mut out = storage.int_area()[reg_start..int_area_len].to_vec();
            out.extend_from_slice(&storage.stack_area()[..size - reg_bytes]);
            out
        }
    }
}

/// Writes `bytes` into `loc`. Used for `set_return`/result-slot writes and
/// for constructing a `GuestArgumentBuffer` before a host→guest call.
pub fn write_location<S: ArgumentStorage + ?Sized>(
    storage: &mut S,
    abi: GuestAbiKind,
    loc: ArgLocation,
    bytes: &[u8],
) {
    match loc.kind {
        ArgLocationKind::None => {
            berberis_base::fatal!("cannot write a `None` argument location")
        }
        ArgLocationKind::IntReg => {
            let start = (loc.offset * abi.int_unit_bytes()) as usize;
            storage.int_area_mut()[start..start + bytes.len()].copy_from_slice(bytes);
        }
        ArgLocationKind::FpReg => {
            let start = (loc.offset * abi.fp_unit_bytes()) as usize;
            storage.fp_area_mut()[start..start + bytes.len()].copy_from_slice(bytes);
        }
        ArgLocationKind::Stack => {
            let start = loc.offset as usize;
            storage.stack_area_mut()[start..start + bytes.len()].copy_from_slice(bytes);
        }
        ArgLocationKind::IntRegAndStack => {
            let unit = abi.int_unit_bytes();
            let reg_start = (loc.offset * unit) as usize;
            let int_area_len = abi.int_area_bytes() as usize;
            let reg_bytes = int_area_len - reg_start;
            storage.int_area_mut()[reg_start..int_area_len].copy_from_slice(&bytes[..reg_bytes]);
            storage.stack_area_mut()[..bytes.len() - reg_bytes].copy_from_slice(&bytes[reg_bytes..]);
        }
    }
}
