//! `LoaderError`: the caller-recoverable failure modes of bringing up a
//! guest process, per `spec.md` §4.8's "Failure semantics" and §7's "Loader
//! errors ... returned as a string to the caller; the loader leaves no
//! partial state."

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("failed to open \"{path}\": {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("\"{path}\" is not a valid ELF file: {reason}")]
    MalformedElf { path: String, reason: String },

    #[error("mmap failed while loading \"{path}\": {reason}")]
    MmapFailed { path: String, reason: String },

    #[error("couldn't find \"{symbol}\" symbol in {elf_file_label}")]
    MissingSymbol { elf_file_label: String, symbol: String },

    #[error("couldn't find \"native_bridge_call_guest\" symbol in vdso")]
    MissingCallGuestSymbol,

    #[error("guest loader is already initialized")]
    AlreadyInitialized,
}
