//! Guest-ISA syscall number mapping, per `spec.md` §4.7: "a pure function
//! `to_host_syscall_number(guest_nr) -> host_nr | -1` and its inverse. The
//! mapping is a dense switch per guest ABI."
//!
//! Argument marshalling for individual syscalls (the other half of §4.7's
//! contract) is out of scope here: it is per-syscall and belongs next to
//! whatever trampoline or kernel-API shim actually issues the host syscall,
//! not in the number-translation table.

mod numbers;

use berberis_guest_state::GuestIsa;

/// Translates a guest syscall number to the host's equivalent, per
/// `guest_isa`'s numbering convention. Returns `-1` if `guest_isa` has no
/// host equivalent for `guest_nr` — the caller reports this to the guest as
/// `ENOSYS`, per `spec.md` §4.7.
pub fn to_host_syscall_number(guest_isa: GuestIsa, guest_nr: i64) -> i64 {
    let host_nr = match guest_isa {
        GuestIsa::Arm32 => numbers::arm32_to_host(guest_nr),
        GuestIsa::Arm64 | GuestIsa::Riscv64 => numbers::generic_to_host(guest_nr),
    };
    if host_nr == -1 {
        tracing::debug!(?guest_isa, guest_nr, "no host syscall for this guest_nr");
    }
    host_nr
}

/// Inverse of [`to_host_syscall_number`]: translates a host syscall number
/// back to `guest_isa`'s guest number, for reporting a host-originated event
/// (a trace record, a signal delivered during a syscall) in guest terms.
/// Returns `-1` if `host_nr` has no entry in `guest_isa`'s table.
pub fn to_guest_syscall_number(guest_isa: GuestIsa, host_nr: i64) -> i64 {
    match guest_isa {
        GuestIsa::Arm32 => numbers::arm32_to_guest(host_nr),
        GuestIsa::Arm64 | GuestIsa::Riscv64 => numbers::generic_to_guest(host_nr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_read_and_write_per_isa() {
        assert_eq!(to_host_syscall_number(GuestIsa::Riscv64, 63), libc::SYS_read as i64);
        assert_eq!(to_host_syscall_number(GuestIsa::Arm64, 63), libc::SYS_read as i64);
        assert_eq!(to_host_syscall_number(GuestIsa::Arm32, 3), libc::SYS_read as i64);
    }

    #[test]
    fn arm64_and_riscv64_share_the_generic_numbering() {
        for guest_nr in [56, 57, 93, 94, 214, 220, 221, 222] {
            assert_eq!(
                to_host_syscall_number(GuestIsa::Arm64, guest_nr),
                to_host_syscall_number(GuestIsa::Riscv64, guest_nr),
            );
        }
    }

    #[test]
    fn unmapped_guest_nr_reports_enosys_sentinel() {
        assert_eq!(to_host_syscall_number(GuestIsa::Arm32, -1), -1);
        assert_eq!(to_host_syscall_number(GuestIsa::Riscv64, 999_999), -1);
    }

    #[test]
    fn round_trips_through_guest_and_back() {
        let host_nr = to_host_syscall_number(GuestIsa::Riscv64, 214); // brk
        assert_eq!(to_guest_syscall_number(GuestIsa::Riscv64, host_nr), 214);
    }
}
