//! `GuestParams`: a typed view over an argument-storage backend, computing
//! each parameter's location once from a fresh calling-convention cursor.
//!
//! Ported from `guest_abi/guest_params_arch.h`'s `GuestParamsAndReturn` /
//! `guest_arguments_arch.h`'s `GuestArgumentsAndResult`. The source computes
//! `kParamsLocations`/`kResultLocation` as `constexpr` arrays baked in at
//! compile time from a variadic template parameter pack; Rust has no
//! compile-time reflection over a function's argument list, so this port
//! takes the `(ArgumentClass, size, alignment)` descriptor list as an
//! explicit runtime slice (the codegen call site that builds a
//! `GuestParams` always knows the callee's signature statically, so this is
//! a direct translation of the same information, not a capability loss).

use berberis_guest_state::GuestAddr;

use crate::abi::{ArgLocation, Cursor, GuestAbiKind};
use crate::scalar::{ArgDescriptor, ArgumentClass, GuestScalar};
use crate::storage::{read_location, write_location, ArgumentStorage};

/// Computes parameter/return locations once, per `spec.md` §4.5: "the view
/// computes each argument's location once from the calling-convention
/// cursor ... and caches it."
pub struct ArgLayout {
    abi: GuestAbiKind,
    locations: Vec<ArgLocation>,
    return_location: Option<ArgLocation>,
    /// Whether `return_location` holds the hidden pointer argument of a
    /// `LargeStruct` return (x8 AAPCS64 / a0 LP64) rather than the return
    /// value's own bytes, per `spec.md` §4.4/§4.5.
    return_is_large_struct: bool,
    /// Cursor state right after the named parameters, for `VaListParams`
    /// (`spec.md` §4.5's "named parameters are skipped first, then
    /// `get_param::<T>()` advances the cursor").
    cursor_after_named: Cursor,
}

impl ArgLayout {
    pub fn new(abi: GuestAbiKind, params: &[ArgDescriptor], ret: Option<ArgDescriptor>) -> Self {
        let mut cursor = Cursor::new(abi);
        // A large-struct return's hidden pointer argument is reserved
        // *before* any visible parameter gets a location, per `spec.md`
        // §4.4 — on LP64/LP64D this consumes a0 out of the same integer
        // cursor visible arguments use, shifting the first visible integer
        // argument to a1.
        let large_struct_return_loc = match ret {
            Some(d) if d.class == ArgumentClass::LargeStruct => Some(cursor.reserve_large_struct_return(d.size, d.alignment)),
            _ => None,
        };
        let locations = params
            .iter()
            .map(|d| Self::next_loc(&mut cursor, *d))
            .collect();
        let return_is_large_struct = large_struct_return_loc.is_some();
        let return_location = match ret {
            None => None,
            Some(d) if d.class == ArgumentClass::LargeStruct => large_struct_return_loc,
            Some(d) => Some(match d.class {
                ArgumentClass::Integer => cursor.int_res_loc(d.size),
                ArgumentClass::Fp => cursor.fp_res_loc(d.size),
                ArgumentClass::LargeStruct => unreachable!("handled above"),
            }),
        };
        ArgLayout {
            abi,
            locations,
            return_location,
            return_is_large_struct,
            cursor_after_named: cursor,
        }
    }

    pub(crate) fn abi(&self) -> GuestAbiKind {
        self.abi
    }

    pub(crate) fn cursor_after_named(&self) -> Cursor {
        self.cursor_after_named.clone()
    }

    fn next_loc(cursor: &mut Cursor, d: ArgDescriptor) -> ArgLocation {
        match d.class {
            ArgumentClass::Integer | ArgumentClass::LargeStruct => cursor.next_int_arg_loc(d.size, d.alignment),
            ArgumentClass::Fp => cursor.next_fp_arg_loc(d.size, d.alignment),
        }
    }
}

/// Typed parameter/return view, per `spec.md` §4.5. `S` is the storage
/// backend: [`crate::buffer::GuestArgumentBuffer`] for host→guest calls or
/// [`crate::window::ThreadRegisterWindow`] for guest→host trampolines.
pub struct GuestParams<'a, 'l, S: ArgumentStorage> {
    storage: &'a mut S,
    layout: &'l ArgLayout,
}

impl<'a, 'l, S: ArgumentStorage> GuestParams<'a, 'l, S> {
    pub fn new(storage: &'a mut S, layout: &'l ArgLayout) -> Self {
        GuestParams { storage, layout }
    }

    /// `params.param::<i>()`: reads the `index`-th parameter. Panics (via
    /// `fatal!`) if `index` is out of range — a codegen bug, not a
    /// recoverable condition.
    pub fn param<T: GuestScalar>(&self, index: usize) -> T {
        let loc = *self
            .layout
            .locations
            .get(index)
            .unwrap_or_else(|| berberis_base::fatal!("argument index {index} out of range"));
        let bytes = read_location(self.storage, self.layout.abi, loc, T::SIZE);
        T::from_ne_bytes(&bytes)
    }

    /// `params.return_slot()`: writes the callee's result.
    ///
    /// Not valid for a `LargeStruct` return — that class's return location
    /// holds a hidden pointer, not the value's own bytes; use
    /// [`Self::return_pointer`] instead.
    pub fn set_return<T: GuestScalar>(&mut self, value: T) {
        if self.layout.return_is_large_struct {
            berberis_base::fatal!("large-struct returns use return_pointer(), not set_return()");
        }
        let loc = self
            .layout
            .return_location
            .unwrap_or_else(|| berberis_base::fatal!("function has no return value"));
        write_location(self.storage, self.layout.abi, loc, &value.to_ne_bytes_vec());
    }

    /// `params.return_pointer()`: the address of the caller-allocated
    /// buffer a `LargeStruct` return must be written into. Per `spec.md`
    /// §4.5, the view dereferences the hidden pointer register (x8 on
    /// AAPCS64, a0 on LP64/LP64D) transparently, so callers never read that
    /// register directly.
    pub fn return_pointer(&self) -> GuestAddr {
        if !self.layout.return_is_large_struct {
            berberis_base::fatal!("function does not have a large-struct return");
        }
        let loc = self
            .layout
            .return_location
            .unwrap_or_else(|| berberis_base::fatal!("function has no return value"));
        let bytes = read_location(self.storage, self.layout.abi, loc, GuestAddr::SIZE);
        GuestAddr::from_ne_bytes(&bytes)
    }

    pub(crate) fn layout(&self) -> &'l ArgLayout {
        self.layout
    }

    /// Consumes the view, handing back the storage borrow and layout
    /// reference. Used by [`crate::va_list::VaListParams::from_named`],
    /// which continues reading from the same storage starting where the
    /// named parameters left the cursor.
    pub fn into_parts(self) -> (&'a mut S, &'l ArgLayout) {
        (self.storage, self.layout)
    }
}
