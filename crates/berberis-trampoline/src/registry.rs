//! The trampoline registry: a mutex-guarded guest-address -> host-callback
//! map, per `spec.md` §5 ("The trampoline registry is a mutex-guarded map,
//! rarely written (at library-load time) and read-mostly at run time").

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use berberis_guest_state::GuestAddr;

use crate::known::{HostPayload, TrampolineFn};

/// What a stub installed at a guest address hands control to, per
/// `spec.md` §4.9: "the runtime installs a stub at the guest symbol
/// address that, when executed, hands control to
/// `trampoline_fn(thunk, thread_state)`."
#[derive(Clone, Copy)]
pub struct TrampolineEntry {
    pub trampoline_fn: TrampolineFn,
    pub host_payload: HostPayload,
    pub debug_name: &'static str,
    pub is_host_func: bool,
}

#[derive(Default)]
pub struct TrampolineRegistry {
    entries: Mutex<HashMap<GuestAddr, TrampolineEntry>>,
}

impl TrampolineRegistry {
    /// The process-wide registry, per `spec.md` §5's "shared resources"
    /// list. Locking order with the other process-wide singletons
    /// (`loader -> registry -> exec-region`) is the caller's responsibility;
    /// this type only ever takes its own lock.
    pub fn global() -> &'static TrampolineRegistry {
        static REGISTRY: OnceLock<TrampolineRegistry> = OnceLock::new();
        REGISTRY.get_or_init(TrampolineRegistry::default)
    }

    pub fn install(&self, guest_addr: GuestAddr, entry: TrampolineEntry) {
        tracing::debug!(guest_addr = guest_addr.0, name = entry.debug_name, "trampoline installed");
        self.entries.lock().expect("trampoline registry lock poisoned").insert(guest_addr, entry);
    }

    pub fn lookup(&self, guest_addr: GuestAddr) -> Option<TrampolineEntry> {
        self.entries.lock().expect("trampoline registry lock poisoned").get(&guest_addr).copied()
    }

    pub fn is_intercepted(&self, guest_addr: GuestAddr) -> bool {
        self.entries.lock().expect("trampoline registry lock poisoned").contains_key(&guest_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::known::do_bad_trampoline;

    fn sample_entry(name: &'static str) -> TrampolineEntry {
        TrampolineEntry {
            trampoline_fn: do_bad_trampoline,
            host_payload: HostPayload::DebugName(name),
            debug_name: name,
            is_host_func: true,
        }
    }

    #[test]
    fn installs_and_looks_up_by_guest_address() {
        let registry = TrampolineRegistry::default();
        let addr = GuestAddr(0x1000);
        assert!(registry.lookup(addr).is_none());

        registry.install(addr, sample_entry("malloc"));
        let entry = registry.lookup(addr).expect("just installed");
        assert_eq!(entry.debug_name, "malloc");
        assert!(registry.is_intercepted(addr));
    }

    #[test]
    fn reinstalling_at_the_same_address_replaces_the_entry() {
        let registry = TrampolineRegistry::default();
        let addr = GuestAddr(0x2000);
        registry.install(addr, sample_entry("free"));
        registry.install(addr, sample_entry("malloc"));
        assert_eq!(registry.lookup(addr).unwrap().debug_name, "malloc");
    }

    #[test]
    fn global_registry_is_a_shared_singleton() {
        let addr = GuestAddr(0x3000);
        TrampolineRegistry::global().install(addr, sample_entry("shared"));
        assert_eq!(TrampolineRegistry::global().lookup(addr).unwrap().debug_name, "shared");
    }
}
