//! `ProxyLibraryError`: the caller-recoverable failure modes of loading a
//! proxy library and intercepting symbols in it.

#[derive(Debug, thiserror::Error)]
pub enum ProxyLibraryError {
    #[error("dlopen failed for library \"{library}\": {reason}")]
    DlopenFailed { library: String, reason: String },

    #[error("proxy library \"{library}\" is not registered")]
    LibraryNotRegistered { library: String },
}
