//! `ProxyLibraryRegistry`: the library-name -> [`ProxyLibraryBuilder`] map,
//! per `proxy_loader.cc::InterceptGuestSymbol`'s `g_libraries` static map
//! guarded by `g_guard_mutex`.
//!
//! A caller registers a library's declarative tables once (in place of the
//! source's dlopen-a-proxy-`.so`-and-call-`InitProxyLibrary` step — see
//! `proxy.rs`'s module doc comment for why), then every subsequent
//! `intercept_guest_symbol` for that library name reuses the registered
//! builder.

use std::collections::HashMap;
use std::sync::Mutex;

use berberis_guest_state::GuestAddr;

use crate::error::ProxyLibraryError;
use crate::proxy::{install_intercepted_symbol, HostLibrary, InterceptedSymbol, ProxyLibraryBuilder};
use crate::registry::TrampolineRegistry;

#[derive(Default)]
pub struct ProxyLibraryRegistry {
    libraries: Mutex<HashMap<String, ProxyLibraryBuilder>>,
}

impl ProxyLibraryRegistry {
    /// Registers `library_name`'s declarative tables, dlopen-ing the
    /// target library itself for the default-thunk `dlsym` path (mirrors
    /// `ProxyLibraryBuilder::Build`'s `handle_ = dlopen(library_name,
    /// RTLD_GLOBAL)`). Re-registering the same name replaces the prior
    /// entry.
    pub fn register(&self, library_name: &str, handle: Box<dyn HostLibrary + Send + Sync>, functions: &'static [crate::known::KnownTrampoline], variables: &'static [crate::known::KnownVariable]) {
        let builder = ProxyLibraryBuilder::new(library_name, functions, variables, handle);
        self.libraries.lock().expect("proxy library registry lock poisoned").insert(library_name.to_string(), builder);
    }

    /// `InterceptGuestSymbol`: looks up `library_name`'s builder and
    /// resolves `symbol_name` against it. Per the source, a library that
    /// was never registered is a hard failure (`LOG_ALWAYS_FATAL` there);
    /// this crate reports it as a caller-recoverable `Result` instead.
    pub fn intercept_guest_symbol(
        &self,
        guest_addr: GuestAddr,
        library_name: &str,
        symbol_name: &str,
    ) -> Result<Option<InterceptedSymbol>, ProxyLibraryError> {
        let libraries = self.libraries.lock().expect("proxy library registry lock poisoned");
        let builder = libraries
            .get(library_name)
            .ok_or_else(|| ProxyLibraryError::LibraryNotRegistered { library: library_name.to_string() })?;
        let _ = guest_addr;
        Ok(builder.intercept_symbol(symbol_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::known::{HostPayload, KnownTrampoline};
    use crate::proxy::InterceptedSymbol;
    use std::collections::HashMap as StdHashMap;

    struct FakeLibrary(StdHashMap<&'static str, *const ()>);
    impl HostLibrary for FakeLibrary {
        fn symbol(&self, name: &str) -> Option<*const ()> {
            self.0.get(name).copied()
        }
    }

    fn noop_trampoline(_payload: HostPayload, _state: &mut berberis_guest_state::ThreadState) {}

    #[test]
    fn unregistered_library_is_an_error() {
        let registry = ProxyLibraryRegistry::default();
        let result = registry.intercept_guest_symbol(GuestAddr(0x1000), "libc.so", "malloc");
        assert!(matches!(result, Err(ProxyLibraryError::LibraryNotRegistered { .. })));
    }

    #[test]
    fn registered_library_resolves_its_declared_symbols() {
        static FUNCS: &[KnownTrampoline] =
            &[KnownTrampoline { name: "malloc", marshal_and_call: noop_trampoline, thunk: Some(HostPayload::DebugName("fixed")) }];
        let registry = ProxyLibraryRegistry::default();
        registry.register("libc.so", Box::new(FakeLibrary(StdHashMap::new())), FUNCS, &[]);

        let result = registry.intercept_guest_symbol(GuestAddr(0x2000), "libc.so", "malloc").unwrap();
        assert!(matches!(result, Some(InterceptedSymbol::Function(_))));
    }
}
