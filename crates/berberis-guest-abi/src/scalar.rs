//! `GuestArgumentInfo<T>`: which register class a Rust type marshals
//! through, and how to read/write its raw bytes out of a location.
//!
//! Ported from `guest_abi/guest_abi.h`'s `GuestArgumentInfo` specializations
//! (`kArgumentClass`/`kSize`/`kAlignment` per fundamental type). The
//! template's `GuestType`/`HostType` split (guest and host integers can
//! differ in width on a 32-on-64 translation) is collapsed here: this port
//! only needs the host-side representation, since `berberis-guest-abi`
//! marshals host-visible arguments for trampolines, not guest-to-guest
//! struct layouts.

use berberis_guest_state::GuestAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentClass {
    Integer,
    Fp,
    /// Passed by hidden pointer; spec.md §4.4's "large-struct returns use an
    /// implicit pointer argument."
    LargeStruct,
}

/// A value marshalled across a guest ABI boundary. Implemented for the
/// primitive integer/float widths `spec.md` §4.5's typed views operate over,
/// plus `GuestAddr` (the "opaque pointer" case every ABI treats as an
/// integer).
pub trait GuestScalar: Sized + Copy {
    const CLASS: ArgumentClass;
    const SIZE: u32;
    const ALIGNMENT: u32;

    /// Reinterprets `bytes` (at least `SIZE` bytes, native-endian raw
    /// register/stack storage) as `Self`. Mirrors the source's
    /// `reinterpret_cast<GuestType*>(address)` read.
    fn from_ne_bytes(bytes: &[u8]) -> Self;

    /// Produces `SIZE` bytes of raw storage for writing back into a
    /// register/stack location.
    fn to_ne_bytes_vec(self) -> Vec<u8>;
}

macro_rules! impl_guest_scalar_int {
    ($ty:ty) => {
        impl GuestScalar for $ty {
            const CLASS: ArgumentClass = ArgumentClass::Integer;
            const SIZE: u32 = std::mem::size_of::<$ty>() as u32;
            const ALIGNMENT: u32 = std::mem::align_of::<$ty>() as u32;

            fn from_ne_bytes(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                <$ty>::from_ne_bytes(buf)
            }

            fn to_ne_bytes_vec(self) -> Vec<u8> {
                self.to_ne_bytes().to_vec()
            }
        }
    };
}

impl_guest_scalar_int!(i8);
impl_guest_scalar_int!(u8);
impl_guest_scalar_int!(i16);
impl_guest_scalar_int!(u16);
impl_guest_scalar_int!(i32);
impl_guest_scalar_int!(u32);
impl_guest_scalar_int!(i64);
impl_guest_scalar_int!(u64);

impl GuestScalar for f32 {
    const CLASS: ArgumentClass = ArgumentClass::Fp;
    const SIZE: u32 = 4;
    const ALIGNMENT: u32 = 4;

    fn from_ne_bytes(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[..4]);
        f32::from_ne_bytes(buf)
    }

    fn to_ne_bytes_vec(self) -> Vec<u8> {
        self.to_ne_bytes().to_vec()
    }
}

impl GuestScalar for f64 {
    const CLASS: ArgumentClass = ArgumentClass::Fp;
    const SIZE: u32 = 8;
    const ALIGNMENT: u32 = 8;

    fn from_ne_bytes(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[..8]);
        f64::from_ne_bytes(buf)
    }

    fn to_ne_bytes_vec(self) -> Vec<u8> {
        self.to_ne_bytes().to_vec()
    }
}

impl GuestScalar for GuestAddr {
    const CLASS: ArgumentClass = ArgumentClass::Integer;
    const SIZE: u32 = 8;
    const ALIGNMENT: u32 = 8;

    fn from_ne_bytes(bytes: &[u8]) -> Self {
        GuestAddr(u64::from_ne_bytes(bytes[..8].try_into().unwrap()))
    }

    fn to_ne_bytes_vec(self) -> Vec<u8> {
        u64::from(self).to_ne_bytes().to_vec()
    }
}

/// `(ArgumentClass, size, alignment)`, the pure-data description
/// `spec.md` §4.4 feeds into the calling-convention cursor. Derived from
/// `T: GuestScalar` via [`ArgDescriptor::of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgDescriptor {
    pub class: ArgumentClass,
    pub size: u32,
    pub alignment: u32,
}

impl ArgDescriptor {
    pub fn of<T: GuestScalar>() -> Self {
        ArgDescriptor {
            class: T::CLASS,
            size: T::SIZE,
            alignment: T::ALIGNMENT,
        }
    }

    /// A large struct passed by hidden pointer, per `spec.md` §4.4: always
    /// marshalled through the integer register class at pointer size/align,
    /// regardless of the struct's own size.
    pub fn large_struct() -> Self {
        ArgDescriptor {
            class: ArgumentClass::LargeStruct,
            size: 8,
            alignment: 8,
        }
    }
}
