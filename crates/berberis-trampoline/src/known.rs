//! Declarative trampoline/variable tables and the fallback stubs they can
//! point at, per `spec.md` §4.9: "a declarative array of `{name,
//! trampoline_fn, thunk}` triples registers all wrapped symbols."
//!
//! Ported from `proxy_library_builder.h`'s `KnownTrampoline`/`KnownVariable`
//! and `proxy_library_builder.cc`'s `DoBadThunk`/`DoBadTrampoline`.

use berberis_guest_state::ThreadState;

/// The opaque second argument a [`TrampolineFn`] receives: either the real
/// host function/data pointer a `KnownTrampoline` declared, or (for
/// [`do_bad_trampoline`] specifically) the symbol's own name. The source's
/// `DoBadTrampoline` reads the intercepted symbol's name out of its
/// `callee` parameter as a raw `const char*` ("HACK: DoBadTrampoline needs
/// function name passed as callee!"); this enum gives that hack a type
/// instead of a reinterpreted pointer.
#[derive(Clone, Copy)]
pub enum HostPayload {
    Thunk(*const ()),
    DebugName(&'static str),
}

// SAFETY: `Thunk` addresses are resolved once at proxy-build time from a
// dlopen'd library and never mutated afterwards; `DebugName` is a `'static`
// string. Same sharing contract as `ThreadState`'s Send impl.
unsafe impl Send for HostPayload {}
unsafe impl Sync for HostPayload {}

/// `TrampolineFunc` in the source: the stub installed at a guest symbol
/// address hands control here with the thunk it was registered with and
/// the calling thread's state.
pub type TrampolineFn = fn(payload: HostPayload, state: &mut ThreadState);

/// One entry in a proxy library's declarative function table.
#[derive(Clone, Copy)]
pub struct KnownTrampoline {
    pub name: &'static str,
    pub marshal_and_call: TrampolineFn,
    /// `None` means "use the default thunk": `dlsym` the target library for
    /// a same-named host symbol, per `ProxyLibraryBuilder::InterceptSymbol`.
    pub thunk: Option<HostPayload>,
}

/// One entry in a proxy library's declarative data-symbol table.
#[derive(Clone, Copy)]
pub struct KnownVariable {
    pub name: &'static str,
    pub size: usize,
}

/// `DoBadThunk`: called if a stub is ever invoked directly as a thunk
/// rather than through its trampoline. Always a programming error.
pub fn do_bad_thunk() -> ! {
    berberis_base::fatal!("bad thunk call");
}

/// `DoBadTrampoline`: the `marshal_and_call` used for symbols that are
/// intercepted to detect accidental calls (no real implementation should
/// ever run). Always a programming error; `payload` carries the symbol's
/// name for the diagnostic.
pub fn do_bad_trampoline(payload: HostPayload, _state: &mut ThreadState) {
    match payload {
        HostPayload::DebugName(name) => berberis_base::fatal!("bad trampoline call: \"{name}\""),
        HostPayload::Thunk(_) => berberis_base::fatal!("bad trampoline call"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_trampoline_tables_are_plain_data() {
        let table = [
            KnownTrampoline { name: "malloc", marshal_and_call: do_bad_trampoline, thunk: None },
            KnownTrampoline {
                name: "free",
                marshal_and_call: do_bad_trampoline,
                thunk: Some(HostPayload::DebugName("free")),
            },
        ];
        assert_eq!(table[0].name, "malloc");
        assert!(table[0].thunk.is_none());
    }
}
