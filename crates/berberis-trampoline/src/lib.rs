//! The trampoline registry and proxy-library builder, per `spec.md` §4.9:
//! binds a guest address to a host callback so that guest code resolving a
//! wrapped symbol (or jumping to a well-known loader/vDSO entry point)
//! re-enters the runtime instead of running real guest code there.

mod error;
mod known;
mod library_registry;
mod proxy;
mod registry;

pub use error::ProxyLibraryError;
pub use known::{do_bad_thunk, do_bad_trampoline, HostPayload, KnownTrampoline, KnownVariable, TrampolineFn};
pub use library_registry::ProxyLibraryRegistry;
pub use proxy::{install_intercepted_symbol, DlopenLibrary, HostLibrary, InterceptedSymbol, ProxyLibraryBuilder};
pub use registry::{TrampolineEntry, TrampolineRegistry};
