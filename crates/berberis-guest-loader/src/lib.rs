//! Guest ELF loader, per `spec.md` §4.8: mmaps the main executable, the
//! guest dynamic linker (when present), and the vDSO; resolves the
//! linker-callback table; installs vDSO trampolines; and tracks the
//! resulting state as a process-wide singleton.
//!
//! Ported from `tiny_loader.cc`/`tiny_symbol_table.cc` (ELF parsing,
//! segment mapping, symbol resolution) and `guest_loader.cc`/
//! `linker_callbacks.cc` (bring-up sequencing, callback resolution).

mod elf;
mod error;
mod linker_callbacks;
mod loader;
mod symbol_table;
mod vdso;

pub use elf::{load_from_file, ElfPhdr, LoadedElfFile, ET_DYN, ET_EXEC};
pub use error::LoaderError;
pub use linker_callbacks::{LinkerCallbacks, STUB_DLERROR_MESSAGE};
pub use loader::{get_instance, init_once, GuestLoader, GuestMainArgs, LoaderCallbacks, LoaderConfig};
pub use vdso::VdsoSymbols;
