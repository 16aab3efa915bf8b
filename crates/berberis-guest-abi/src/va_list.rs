//! `VaListParams`: reads variadic arguments that follow a named-parameter
//! prefix, per `spec.md` §4.5.
//!
//! Ported from `guest_abi/guest_params_arch.h`'s `GuestVAListParams`: it
//! starts from a *copy* of the calling-convention cursor as it stood right
//! after the named parameters (`kVAStartBase`), then calls
//! `GetNextIntArgLoc`/`GetNextFpArgLoc` exactly like ordinary parameter
//! computation, one call per `va_arg`. The AAPCS32 "variadic FP arguments go
//! through the integer path" rule (`spec.md` §4.5) is carried here as a
//! per-ABI override of `T`'s natural argument class.

use crate::abi::{Cursor, GuestAbiKind};
use crate::params::{ArgLayout, GuestParams};
use crate::scalar::{ArgumentClass, GuestScalar};
use crate::storage::{read_location, ArgumentStorage};
use berberis_guest_state::GuestAddr;

pub struct VaListParams<'a, S: ArgumentStorage> {
    storage: &'a mut S,
    abi: GuestAbiKind,
    cursor: Cursor,
}

impl<'a, S: ArgumentStorage> VaListParams<'a, S> {
    /// Continues reading variadic arguments after a `GuestParams` view's
    /// named parameters, per `spec.md` §4.5: "named parameters are skipped
    /// first (per ABI), then `get_param<T>()` advances the cursor."
    pub fn from_named<'l>(params: GuestParams<'a, 'l, S>) -> Self {
        let abi = params.layout().abi();
        let cursor = params.layout().cursor_after_named();
        let (storage, _layout) = params.into_parts();
        VaListParams { storage, abi, cursor }
    }

    /// Starts a fresh cursor with no named-parameter prefix — used when a
    /// function is entirely variadic, or when re-deriving `va_list` state
    /// from a guest-side `Guest_va_list` struct's already-known register
    /// offsets (`GuestVaListToIntOffset`/`GuestVaListToSimdOffset` in the
    /// source) rather than from a `GuestParams` computation.
    pub fn from_offsets(storage: &'a mut S, abi: GuestAbiKind, int_offset: u32, fp_offset: u32) -> Self {
        let cursor = match abi {
            GuestAbiKind::Aapcs64 => {
                Cursor::Aapcs64(berberis_calling_conventions::arm64::CallingConventions::with_offsets(
                    int_offset, fp_offset,
                ))
            }
            _ => berberis_base::fatal!("from_offsets is only implemented for AAPCS64 va_list decoding"),
        };
        VaListParams { storage, abi, cursor }
    }

    /// `GetParam<T>()`: advances the cursor by one argument of `T`'s class
    /// and reads it. On AAPCS32, a floating-point `T` is marshalled through
    /// the integer registers instead of the VFP ones, per `spec.md` §4.5.
    pub fn get_param<T: GuestScalar>(&mut self) -> T {
        let treat_as_integer = matches!(self.abi, GuestAbiKind::Aapcs32) && T::CLASS == ArgumentClass::Fp;
        let loc = if treat_as_integer || T::CLASS != ArgumentClass::Fp {
            self.cursor.next_int_arg_loc(T::SIZE, T::ALIGNMENT)
        } else {
            self.cursor.next_fp_arg_loc(T::SIZE, T::ALIGNMENT)
        };
        let bytes = read_location(self.storage, self.abi, loc, T::SIZE);
        T::from_ne_bytes(&bytes)
    }

    /// `GetPointerParam<T>()`: reads a `GuestAddr`-sized argument and
    /// returns it as a guest address (dereferencing into host memory is the
    /// guest memory map's job, outside this crate).
    pub fn get_pointer_param(&mut self) -> GuestAddr {
        self.get_param::<GuestAddr>()
    }
}
