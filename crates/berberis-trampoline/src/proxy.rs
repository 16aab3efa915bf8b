//! `ProxyLibraryBuilder`: resolves one intercepted library's declarative
//! trampoline/variable tables against a dlopen'd handle for the *target*
//! library (the one being intercepted), per
//! `proxy_library_builder.cc::ProxyLibraryBuilder::{Build,InterceptSymbol}`.
//!
//! The source additionally dlopens a separate *proxy* `.so` per intercepted
//! library and calls its exported `InitProxyLibrary` to obtain the
//! `KnownTrampoline`/`KnownVariable` tables (`proxy_loader.cc::LoadProxyLibrary`).
//! That extra hop only exists because the Android build compiles one such
//! `.so` per wrapped library; this workspace has no equivalent build step
//! producing them, so a caller registers a library's tables directly
//! (`ProxyLibraryRegistry::register`) instead of them being dlsym'd out of
//! a generated `.so`. Everything downstream of that — the declarative
//! tables, the default-thunk dlsym fallback, the bad-thunk/bad-trampoline
//! stubs — is unchanged from the source.

use berberis_guest_state::GuestAddr;

use crate::error::ProxyLibraryError;
use crate::known::{do_bad_thunk, do_bad_trampoline, HostPayload, KnownTrampoline, KnownVariable};
use crate::registry::{TrampolineEntry, TrampolineRegistry};

/// Resolves symbol names to host addresses in an already-loaded library.
/// Abstracts over `dlsym` so tests can substitute a fixed table instead of
/// dlopen-ing a real shared object.
pub trait HostLibrary {
    fn symbol(&self, name: &str) -> Option<*const ()>;
}

/// A real `dlopen`'d library, backed by `libloading`.
pub struct DlopenLibrary(libloading::Library);

// SAFETY: a loaded library handle is immutable after `open` and outlives
// every symbol resolved from it for the registry's process lifetime.
unsafe impl Send for DlopenLibrary {}
unsafe impl Sync for DlopenLibrary {}

impl DlopenLibrary {
    pub fn open(path: &str) -> Result<Self, ProxyLibraryError> {
        // SAFETY: loading an arbitrary shared object always carries the
        // usual caveats (its static initializers run); this mirrors the
        // source's unguarded `dlopen(library_name, RTLD_GLOBAL)`.
        let lib = unsafe { libloading::Library::new(path) }
            .map_err(|e| ProxyLibraryError::DlopenFailed { library: path.to_string(), reason: e.to_string() })?;
        Ok(DlopenLibrary(lib))
    }
}

impl HostLibrary for DlopenLibrary {
    fn symbol(&self, name: &str) -> Option<*const ()> {
        let mut bytes = name.as_bytes().to_vec();
        bytes.push(0);
        // SAFETY: `get` only reads the symbol table; the returned address
        // is never dereferenced here, only handed back as an opaque value.
        unsafe { self.0.get::<*const ()>(&bytes).ok().map(|sym| *sym) }
    }
}

/// Either outcome of [`ProxyLibraryBuilder::intercept_symbol`], per
/// `ProxyLibraryBuilder::InterceptSymbol`'s two declarative tables.
pub enum InterceptedSymbol {
    Function(TrampolineEntry),
    /// A data symbol: `host_ptr`/`size` describe bytes to copy into guest
    /// memory at the intercepted `GuestAddr`. This crate has no guest
    /// memory map, so copying those bytes is the caller's job (the guest
    /// loader, which owns the mapped guest address space).
    Variable { host_ptr: *const u8, size: usize },
}

pub struct ProxyLibraryBuilder {
    library_name: String,
    functions: &'static [KnownTrampoline],
    variables: &'static [KnownVariable],
    handle: Box<dyn HostLibrary + Send + Sync>,
}

impl ProxyLibraryBuilder {
    pub fn new(
        library_name: &str,
        functions: &'static [KnownTrampoline],
        variables: &'static [KnownVariable],
        handle: Box<dyn HostLibrary + Send + Sync>,
    ) -> Self {
        ProxyLibraryBuilder { library_name: library_name.to_string(), functions, variables, handle }
    }

    /// `ProxyLibraryBuilder::InterceptSymbol`: finds `name` in the
    /// declarative tables and resolves its thunk. Returns `None` if `name`
    /// is in neither table (a soft failure in the source: it traces and
    /// returns without installing anything).
    pub fn intercept_symbol(&self, name: &str) -> Option<InterceptedSymbol> {
        if let Some(function) = self.functions.iter().find(|f| f.name == name) {
            let payload = if function.marshal_and_call as usize == do_bad_trampoline as usize {
                // HACK, ported verbatim: DoBadTrampoline needs the symbol's
                // own name, not a thunk.
                HostPayload::DebugName(function.name)
            } else {
                function.thunk.unwrap_or_else(|| {
                    self.handle
                        .symbol(name)
                        .map(HostPayload::Thunk)
                        .unwrap_or(HostPayload::Thunk(do_bad_thunk as *const ()))
                })
            };
            return Some(InterceptedSymbol::Function(TrampolineEntry {
                trampoline_fn: function.marshal_and_call,
                host_payload: payload,
                debug_name: function.name,
                is_host_func: true,
            }));
        }

        if let Some(variable) = self.variables.iter().find(|v| v.name == name) {
            if variable.size != std::mem::size_of::<GuestAddr>() {
                tracing::debug!(
                    library = self.library_name,
                    name,
                    "variable size mismatch, assuming pointer-sized anyway"
                );
            }
            return match self.handle.symbol(name) {
                Some(addr) => Some(InterceptedSymbol::Variable { host_ptr: addr as *const u8, size: variable.size }),
                None => {
                    tracing::debug!(library = self.library_name, name, "variable symbol not found");
                    None
                }
            };
        }

        tracing::debug!(library = self.library_name, name, "symbol not found in proxy library");
        None
    }
}

/// Installs `intercepted` into `registry` at `guest_addr`, per
/// `spec.md` §4.9's "install a stub... hands control to
/// trampoline_fn(thunk, thread_state)". Variables are left to the caller,
/// per [`InterceptedSymbol::Variable`]'s doc comment.
pub fn install_intercepted_symbol(registry: &TrampolineRegistry, guest_addr: GuestAddr, intercepted: InterceptedSymbol) {
    if let InterceptedSymbol::Function(entry) = intercepted {
        registry.install(guest_addr, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeLibrary(HashMap<&'static str, *const ()>);
    impl HostLibrary for FakeLibrary {
        fn symbol(&self, name: &str) -> Option<*const ()> {
            self.0.get(name).copied()
        }
    }

    fn noop_trampoline(_payload: HostPayload, _state: &mut berberis_guest_state::ThreadState) {}

    #[test]
    fn resolves_a_declared_thunk_without_consulting_the_library() {
        static FUNCS: &[KnownTrampoline] =
            &[KnownTrampoline { name: "malloc", marshal_and_call: noop_trampoline, thunk: Some(HostPayload::DebugName("fixed")) }];
        let handle = Box::new(FakeLibrary(HashMap::new()));
        let builder = ProxyLibraryBuilder::new("libc.so", FUNCS, &[], handle);

        match builder.intercept_symbol("malloc") {
            Some(InterceptedSymbol::Function(entry)) => assert_eq!(entry.debug_name, "malloc"),
            _ => panic!("expected a function match"),
        }
    }

    #[test]
    fn falls_back_to_dlsym_for_the_default_thunk() {
        static FUNCS: &[KnownTrampoline] = &[KnownTrampoline { name: "free", marshal_and_call: noop_trampoline, thunk: None }];
        let addr = 0x1234usize as *const ();
        let mut map = HashMap::new();
        map.insert("free", addr);
        let builder = ProxyLibraryBuilder::new("libc.so", FUNCS, &[], Box::new(FakeLibrary(map)));

        match builder.intercept_symbol("free") {
            Some(InterceptedSymbol::Function(entry)) => match entry.host_payload {
                HostPayload::Thunk(p) => assert_eq!(p, addr),
                _ => panic!("expected a resolved thunk"),
            },
            _ => panic!("expected a function match"),
        }
    }

    #[test]
    fn falls_back_to_do_bad_thunk_when_dlsym_finds_nothing() {
        static FUNCS: &[KnownTrampoline] = &[KnownTrampoline { name: "free", marshal_and_call: noop_trampoline, thunk: None }];
        let builder = ProxyLibraryBuilder::new("libc.so", FUNCS, &[], Box::new(FakeLibrary(HashMap::new())));

        match builder.intercept_symbol("free") {
            Some(InterceptedSymbol::Function(entry)) => match entry.host_payload {
                HostPayload::Thunk(p) => assert_eq!(p, do_bad_thunk as *const ()),
                _ => panic!("expected a thunk"),
            },
            _ => panic!("expected a function match"),
        }
    }

    #[test]
    fn do_bad_trampoline_entries_carry_their_name_as_the_payload() {
        static FUNCS: &[KnownTrampoline] = &[KnownTrampoline { name: "abort", marshal_and_call: do_bad_trampoline, thunk: None }];
        let builder = ProxyLibraryBuilder::new("libc.so", FUNCS, &[], Box::new(FakeLibrary(HashMap::new())));

        match builder.intercept_symbol("abort") {
            Some(InterceptedSymbol::Function(entry)) => match entry.host_payload {
                HostPayload::DebugName(name) => assert_eq!(name, "abort"),
                _ => panic!("expected a debug name payload"),
            },
            _ => panic!("expected a function match"),
        }
    }

    #[test]
    fn unknown_symbol_is_a_soft_miss() {
        let builder = ProxyLibraryBuilder::new("libc.so", &[], &[], Box::new(FakeLibrary(HashMap::new())));
        assert!(builder.intercept_symbol("nonexistent").is_none());
    }

    #[test]
    fn variable_lookup_yields_a_host_pointer_and_size_for_the_caller_to_copy() {
        static VARS: &[KnownVariable] = &[KnownVariable { name: "environ", size: 8 }];
        let addr = 0x5678usize as *const ();
        let mut map = HashMap::new();
        map.insert("environ", addr);
        let builder = ProxyLibraryBuilder::new("libc.so", &[], VARS, Box::new(FakeLibrary(map)));

        match builder.intercept_symbol("environ") {
            Some(InterceptedSymbol::Variable { host_ptr, size }) => {
                assert_eq!(host_ptr, addr as *const u8);
                assert_eq!(size, 8);
            }
            _ => panic!("expected a variable match"),
        }
    }
}
