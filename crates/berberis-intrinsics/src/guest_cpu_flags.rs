//! RISC-V floating-point exception/rounding-mode flag layouts.
//!
//! Ported from `intrinsics/riscv64_to_all/include/berberis/intrinsics/guest_cpu_flags.h`.

/// Bit positions within the `fflags`/`fcsr` accumulated-exception field, and
/// the 3-bit dynamic rounding-mode encodings (`frm`).
pub mod fp_flags {
    pub const NV: u64 = 1 << 4;
    pub const DZ: u64 = 1 << 3;
    pub const OF: u64 = 1 << 2;
    pub const UF: u64 = 1 << 1;
    pub const NX: u64 = 1 << 0;

    pub const RM_POS: u64 = 5;
    pub const RM_MASK: u64 = 0b111;
    pub const RM_MAX: u8 = 0b100;

    pub const RNE: u8 = 0b000;
    pub const RTZ: u8 = 0b001;
    pub const RDN: u8 = 0b010;
    pub const RUP: u8 = 0b011;
    pub const RMM: u8 = 0b100;
    pub const DYN: u8 = 0b111;
}

/// The 2-bit VXRM vector fixed-point rounding mode.
pub mod vxrm {
    pub const RNU: u8 = 0b00;
    pub const RNE: u8 = 0b01;
    pub const RDN: u8 = 0b10;
    pub const ROD: u8 = 0b11;
}

/// The host FPU rounding mode a guest `frm` value maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRoundingMode {
    ToNearest,
    TowardZero,
    Downward,
    Upward,
    /// Guest requested `DYN`: leave whatever the host currently has
    /// installed untouched.
    Dynamic,
}

/// Not every RISC-V rounding mode has a host FPU equivalent: `RMM` (round to
/// nearest, ties away from zero) is software-emulated rather than installed
/// into the host FPU's control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrinsicRoundingMode {
    Host(HostRoundingMode),
    /// `RMM`: round to nearest, ties away from zero.
    TiesAway,
}

/// `ToHostRoundingMode` from the source: maps a guest `frm` encoding to the
/// nearest host-representable rounding mode. `RMM` degrades to
/// `TowardZero`, matching the source's `kRounding` table (the actual
/// ties-away behavior is recovered by the intrinsic layer, not the host
/// FPU).
pub fn to_host_rounding_mode(rm: u8) -> HostRoundingMode {
    if rm == fp_flags::DYN {
        return HostRoundingMode::Dynamic;
    }
    match rm {
        fp_flags::RNE => HostRoundingMode::ToNearest,
        fp_flags::RTZ => HostRoundingMode::TowardZero,
        fp_flags::RDN => HostRoundingMode::Downward,
        fp_flags::RUP => HostRoundingMode::Upward,
        fp_flags::RMM => HostRoundingMode::TowardZero,
        _ => berberis_base::fatal!("invalid fp rounding mode: {rm}"),
    }
}

/// `ToIntrinsicRoundingMode` from the source: like `to_host_rounding_mode`,
/// but keeps `RMM` distinct so the intrinsic layer can emulate it instead of
/// silently rounding toward zero.
pub fn to_intrinsic_rounding_mode(rm: u8) -> IntrinsicRoundingMode {
    if rm == fp_flags::RMM {
        IntrinsicRoundingMode::TiesAway
    } else {
        IntrinsicRoundingMode::Host(to_host_rounding_mode(rm))
    }
}

/// `GuestModeFromHostRounding`: the inverse mapping, used after a host call
/// that may have changed `fegetround()` out from under us (e.g. libm calls)
/// to recover the guest-visible `frm` value.
pub fn guest_mode_from_host_rounding(mode: HostRoundingMode) -> u8 {
    match mode {
        HostRoundingMode::ToNearest => fp_flags::RNE,
        HostRoundingMode::Downward => fp_flags::RDN,
        HostRoundingMode::Upward => fp_flags::RUP,
        HostRoundingMode::TowardZero => fp_flags::RTZ,
        HostRoundingMode::Dynamic => {
            berberis_base::fatal!("host rounding mode query cannot be Dynamic")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dyn_maps_to_dynamic_host_mode() {
        assert_eq!(to_host_rounding_mode(fp_flags::DYN), HostRoundingMode::Dynamic);
    }

    #[test]
    fn rmm_is_ties_away_at_the_intrinsic_layer_but_toward_zero_on_host() {
        assert_eq!(to_host_rounding_mode(fp_flags::RMM), HostRoundingMode::TowardZero);
        assert_eq!(
            to_intrinsic_rounding_mode(fp_flags::RMM),
            IntrinsicRoundingMode::TiesAway
        );
    }

    #[test]
    fn guest_mode_from_host_rounding_round_trips() {
        for (guest, host) in [
            (fp_flags::RNE, HostRoundingMode::ToNearest),
            (fp_flags::RTZ, HostRoundingMode::TowardZero),
            (fp_flags::RDN, HostRoundingMode::Downward),
            (fp_flags::RUP, HostRoundingMode::Upward),
        ] {
            assert_eq!(to_host_rounding_mode(guest), host);
            assert_eq!(guest_mode_from_host_rounding(host), guest);
        }
    }
}
