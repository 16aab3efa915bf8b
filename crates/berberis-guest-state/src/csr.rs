//! RISC-V CSR names, write-masks, and the writability rule.
//!
//! Ported from `guest_state/riscv64/include/berberis/guest_state/guest_state_arch.h`:
//! `CsrName`'s discriminants (kept bit-identical —
//! `berberis-assembler::riscv::Csr` uses the same numbering for the
//! assembler's encoding side; this is the guest-state-owning side), the
//! `BERBERIS_RISV64_PROCESS_SUPPORTED_CSRS` write-mask table, and
//! `CsrWritable`'s "top two bits both set means read-only counter" rule.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrName {
    FFlags = 0b00_00_0000_0001,
    Frm = 0b00_00_0000_0010,
    FCsr = 0b00_00_0000_0011,
    Vstart = 0b00_00_0000_1000,
    Vxsat = 0b00_00_0000_1001,
    Vxrm = 0b00_00_0000_1010,
    Vcsr = 0b00_00_0000_1111,
    Cycle = 0b11_00_0000_0000,
    Vl = 0b11_00_0010_0000,
    Vtype = 0b11_00_0010_0001,
    Vlenb = 0b11_00_0010_0010,
}

impl CsrName {
    /// `CsrWritable`: a CSR whose number has both top bits set (`0b11`) is
    /// one of the read-only counter/derived-constant group
    /// (`Cycle`/`Vl`/`Vtype`/`Vlenb`); everything else is writable, subject
    /// to its own per-CSR mask.
    ///
    /// Note: the source's `Vl`/`Vtype` writability follows this same rule
    /// (both have the top two bits `0b11`) even though they *do* have
    /// storage and a mask in `BERBERIS_RISV64_PROCESS_SUPPORTED_CSRS` — on
    /// real hardware they are written only as a side effect of `vset{i}vl{i}`,
    /// never directly, so `is_writable` returning `false` for them here
    /// matches the source's `CsrWritable` exactly; `crate::cpu_state`
    /// writes them through a separate vector-config path, not through
    /// `set_csr`.
    pub fn is_writable(self) -> bool {
        (self as u32) & 0b11_00_0000_0000 != 0b11_00_0000_0000
    }

    pub fn has_storage(self) -> bool {
        matches!(
            self,
            CsrName::Frm | CsrName::Vstart | CsrName::Vcsr | CsrName::Vl | CsrName::Vtype
        )
    }
}

/// The per-CSR write-mask: reserved bits are forced to zero on every write.
/// Fatal for CSRs with no mask entry (the no-storage set) — callers must
/// route those through their owning layer instead.
pub fn write_mask(name: CsrName) -> u64 {
    match name {
        CsrName::Frm => 0b111,
        CsrName::Vstart => 0b0111_1111,
        CsrName::Vcsr => 0b111,
        CsrName::Vl => 0b1111_1111,
        // Top bit (vill) | bits 6..7 (vma/vta) | bits 0..5 (vsew/vlmul): see
        // `guest_state_arch.h`'s `Vtype` mask, `0x8000_0000_0000_00ff`.
        CsrName::Vtype => 0x8000_0000_0000_00ffu64,
        _ => berberis_base::fatal!("{name:?} has no write mask (no-storage CSR)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_not_writable() {
        assert!(!CsrName::Cycle.is_writable());
        assert!(!CsrName::Vl.is_writable());
        assert!(!CsrName::Vtype.is_writable());
        assert!(!CsrName::Vlenb.is_writable());
    }

    #[test]
    fn storage_backed_non_counters_are_writable() {
        assert!(CsrName::Frm.is_writable());
        assert!(CsrName::Vstart.is_writable());
        assert!(CsrName::Vcsr.is_writable());
    }

    #[test]
    fn fflags_and_fcsr_are_writable_but_storage_free() {
        assert!(CsrName::FFlags.is_writable());
        assert!(!CsrName::FFlags.has_storage());
        assert!(CsrName::FCsr.is_writable());
        assert!(!CsrName::FCsr.has_storage());
    }
}
