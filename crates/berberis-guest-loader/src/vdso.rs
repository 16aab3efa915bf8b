//! Installs trampolines on the guest vDSO's well-known entry points, per
//! `spec.md` §4.8 step 4: "mmap-load the guest vDSO and install trampolines
//! on its known entry points (`trace`, `intercept-symbol`, `post-init`,
//! `call-guest`, `config-static-tls`, `get-host-pthread`)."
//!
//! Ported from `guest_loader.cc::InitializeVdso`. `call-guest` is handled
//! differently from the other five: it is not a trampoline target (guest
//! code never jumps to it directly) but the guest-side entry point the
//! *host* jumps to in order to run translated guest code — out of scope
//! for this crate to invoke (no interpreter/codegen here), but its address
//! is still load-bearing for whoever does, so it is resolved and returned
//! rather than silently dropped.

use berberis_guest_state::GuestAddr;
use berberis_trampoline::{HostPayload, TrampolineFn, TrampolineRegistry};

use crate::elf::LoadedElfFile;
use crate::error::LoaderError;
use crate::linker_callbacks::make_elf_symbol_trampoline_callable;

/// The three vDSO symbols that get a trampoline installed, in the source's
/// own order.
const VDSO_TRAMPOLINE_SYMBOLS: &[&str] =
    &["native_bridge_trace", "native_bridge_intercept_symbol", "native_bridge_post_init"];

/// Addresses the vDSO bring-up resolves but does not itself act on.
#[derive(Debug, Clone, Copy)]
pub struct VdsoSymbols {
    pub call_guest: GuestAddr,
}

/// `InitializeVdso`: installs `trace`/`intercept_symbol`/`post_init`
/// trampolines and resolves `native_bridge_call_guest`. `trace_fn`,
/// `intercept_symbol_fn`, and `post_init_fn` are the caller's
/// implementations of `TraceCallback`/`InterceptGuestSymbolCallback`/
/// `PostInitCallback` — kept as parameters rather than fixed functions
/// here, since those callbacks depend on runtime components (a tracing
/// sink, the proxy-loader's symbol interception, application-process
/// post-init hooks) this crate does not own.
pub fn initialize_vdso(
    vdso_elf_file: &LoadedElfFile,
    registry: &TrampolineRegistry,
    trace_fn: TrampolineFn,
    intercept_symbol_fn: TrampolineFn,
    post_init_fn: TrampolineFn,
) -> Result<VdsoSymbols, LoaderError> {
    let callbacks = [trace_fn, intercept_symbol_fn, post_init_fn];
    for (name, callback) in VDSO_TRAMPOLINE_SYMBOLS.iter().zip(callbacks) {
        make_elf_symbol_trampoline_callable(vdso_elf_file, "vdso", name, callback, HostPayload::DebugName(name), registry)?;
    }

    let call_guest = vdso_elf_file.find_symbol("native_bridge_call_guest").ok_or(LoaderError::MissingCallGuestSymbol)?;
    tracing::debug!(guest_addr = call_guest.0, "resolved native_bridge_call_guest");
    Ok(VdsoSymbols { call_guest })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vdso_trampoline_symbol_table_has_the_three_documented_entries() {
        assert_eq!(VDSO_TRAMPOLINE_SYMBOLS, &["native_bridge_trace", "native_bridge_intercept_symbol", "native_bridge_post_init"]);
    }
}
