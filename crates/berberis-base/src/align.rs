//! Page-size and generic alignment helpers.
//!
//! Grounded on `base/include/berberis/base/*` (`AlignUp`/`AlignUpPageSize`
//! used throughout `guest_state.cc` and `tiny_loader.cc`).

/// Round `value` up to the next multiple of `alignment`. `alignment` must be
/// a power of two; this is a programming error to violate and aborts.
pub const fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Round `value` down to the previous multiple of `alignment`.
pub const fn align_down(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    value & !(alignment - 1)
}

/// The host page size, queried once via `sysconf(_SC_PAGESIZE)` and cached.
pub fn page_size() -> usize {
    use std::sync::OnceLock;
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        // SAFETY: sysconf with _SC_PAGESIZE never fails on a supported host.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size <= 0 {
            4096
        } else {
            size as usize
        }
    })
}

/// Round `value` up to a multiple of the host page size.
pub fn align_up_page_size(value: usize) -> usize {
    align_up(value, page_size())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_next_multiple() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(16, 16), 16);
        assert_eq!(align_up(17, 16), 32);
    }

    #[test]
    fn align_down_rounds_to_previous_multiple() {
        assert_eq!(align_down(0, 16), 0);
        assert_eq!(align_down(15, 16), 0);
        assert_eq!(align_down(16, 16), 16);
        assert_eq!(align_down(31, 16), 16);
    }

    #[test]
    fn page_size_is_a_power_of_two_and_at_least_4k() {
        let size = page_size();
        assert!(size >= 4096);
        assert!(size.is_power_of_two());
    }

    #[test]
    fn align_up_page_size_is_idempotent() {
        let once = align_up_page_size(1);
        let twice = align_up_page_size(once);
        assert_eq!(once, twice);
    }
}
