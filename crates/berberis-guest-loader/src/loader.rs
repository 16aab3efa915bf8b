//! `GuestLoader`: the process-wide state that brings a guest process up,
//! per `spec.md` §4.8 and `guest_loader.h`/`guest_loader.cc`.
//!
//! `CreateInstance`'s five-step sequence:
//! 1. mmap-load the main guest ELF.
//! 2. Decide static vs. dynamic from `PT_INTERP`'s presence; if dynamic,
//!    mmap-load the guest dynamic linker (falling back to treating the
//!    main executable itself as the linker when it is `ET_DYN` with no
//!    `PT_INTERP`, as `tiny_loader.cc`'s "is a PIE but not using standard
//!    linker" comment documents).
//! 3. Resolve the linker-callback table (fatal for a dynamic executable).
//! 4. mmap-load the guest vDSO and install trampolines on its known entry
//!    points (fatal for a dynamic executable).
//! 5. Record the process-wide singleton instance.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use berberis_guest_state::{GuestAddr, GuestIsa};
use berberis_trampoline::{TrampolineFn, TrampolineRegistry};

use crate::elf::{self, LoadedElfFile};
use crate::error::LoaderError;
use crate::linker_callbacks::{self, LinkerCallbacks};
use crate::vdso::{self, VdsoSymbols};

/// Inputs to [`GuestLoader::create_instance`], per `spec.md` §9's
/// "configuration" expansion: a plain struct the embedder fills in, not
/// environment variables or a config file this crate would have to parse.
pub struct LoaderConfig {
    pub main_executable_path: PathBuf,
    pub vdso_path: PathBuf,
    pub linker_path: PathBuf,
    pub guest_isa: GuestIsa,
    /// Minimum load-address alignment for every mapped image
    /// (`kLibraryAlignment` in the source).
    pub library_alignment: usize,
}

/// Host callbacks the loader wires trampolines to during bring-up. Kept as
/// a bundle rather than five separate parameters to `create_instance`.
pub struct LoaderCallbacks {
    pub config_static_tls: TrampolineFn,
    pub get_host_pthread: TrampolineFn,
    pub trace: TrampolineFn,
    pub intercept_symbol: TrampolineFn,
    pub post_init: TrampolineFn,
}

/// The arguments `StartGuestExecutableImpl` hands to the guest's entry
/// point. This crate resolves every field but does not itself jump to
/// `entry_point` — that is the translator/interpreter's job, outside this
/// crate's scope; see [`GuestLoader::start_guest_main_thread`].
#[derive(Debug, Clone)]
pub struct GuestMainArgs {
    pub argv: Vec<String>,
    pub linker_base_addr: GuestAddr,
    pub entry_point: GuestAddr,
    pub main_executable_entry_point: GuestAddr,
    pub phdr: GuestAddr,
    pub phdr_count: usize,
    pub vdso_base_addr: GuestAddr,
}

pub struct GuestLoader {
    pub main_executable_path: PathBuf,
    pub executable_elf_file: LoadedElfFile,
    pub linker_elf_file: Option<LoadedElfFile>,
    pub vdso_elf_file: Option<LoadedElfFile>,
    pub linker_callbacks: LinkerCallbacks,
    pub vdso_symbols: Option<VdsoSymbols>,
    pub is_static_executable: bool,
}

impl GuestLoader {
    /// `CreateInstance`: loads the main executable, the dynamic linker (if
    /// any), and the vDSO, and resolves every callback table. Leaves no
    /// partial state on error — if any step fails, nothing here is saved
    /// into the process-wide singleton.
    pub fn create_instance(
        config: &LoaderConfig,
        callbacks: &LoaderCallbacks,
        registry: &TrampolineRegistry,
    ) -> Result<GuestLoader, LoaderError> {
        tracing::debug!(
            main_executable_path = %config.main_executable_path.display(),
            vdso_path = %config.vdso_path.display(),
            linker_path = %config.linker_path.display(),
            "GuestLoader::create_instance"
        );

        let executable_elf_file = elf::load_from_file(&config.main_executable_path, config.library_alignment)?;
        berberis_base::instrument::loader_event("main_executable_mapped");
        let is_static_executable = !executable_elf_file.has_pt_interp();

        let (linker_elf_file, linker_callbacks) = if is_static_executable {
            // A `PIE` main executable with no `PT_INTERP` can itself act as
            // a "linker" exposing the `__loader_*`/`__native_bridge_*`
            // symbols; a plain static executable cannot, and bringing up
            // callbacks against it would only fail, so don't try.
            if executable_elf_file.e_type == elf::ET_DYN {
                match linker_callbacks::initialize_linker(
                    &executable_elf_file,
                    registry,
                    callbacks.config_static_tls,
                    callbacks.get_host_pthread,
                ) {
                    Ok(resolved) => (None, resolved),
                    Err(e) => {
                        tracing::debug!(error = %e, "main executable does not expose linker callbacks, using stubs");
                        (None, LinkerCallbacks::stub())
                    }
                }
            } else {
                (None, LinkerCallbacks::stub())
            }
        } else {
            let linker = elf::load_from_file(&config.linker_path, config.library_alignment)?;
            berberis_base::instrument::loader_event("linker_mapped");
            let resolved =
                linker_callbacks::initialize_linker(&linker, registry, callbacks.config_static_tls, callbacks.get_host_pthread)?;
            berberis_base::instrument::loader_event("linker_callbacks_resolved");
            (Some(linker), resolved)
        };

        let (vdso_elf_file, vdso_symbols) = match elf::load_from_file(&config.vdso_path, config.library_alignment) {
            Ok(vdso) => {
                berberis_base::instrument::loader_event("vdso_mapped");
                let symbols =
                    vdso::initialize_vdso(&vdso, registry, callbacks.trace, callbacks.intercept_symbol, callbacks.post_init)?;
                (Some(vdso), Some(symbols))
            }
            Err(e) if is_static_executable => {
                tracing::debug!(error = %e, "static executable has no vdso, continuing without one");
                (None, None)
            }
            Err(e) => return Err(e),
        };

        Ok(GuestLoader {
            main_executable_path: config.main_executable_path.clone(),
            executable_elf_file,
            linker_elf_file,
            vdso_elf_file,
            linker_callbacks,
            vdso_symbols,
            is_static_executable,
        })
    }

    /// `StartGuestExecutableImpl`'s argument bundle, assembled from the
    /// images this loader already holds.
    pub fn guest_main_args(&self, argv: Vec<String>) -> GuestMainArgs {
        let entry_point = self
            .linker_elf_file
            .as_ref()
            .filter(|l| l.is_loaded())
            .map(|l| l.entry_point)
            .unwrap_or(self.executable_elf_file.entry_point);
        let linker_base_addr = self.linker_elf_file.as_ref().map(|l| GuestAddr(l.base_addr as u64)).unwrap_or(GuestAddr::NULL);
        let vdso_base_addr = self.vdso_elf_file.as_ref().map(|v| GuestAddr(v.base_addr as u64)).unwrap_or(GuestAddr::NULL);

        GuestMainArgs {
            argv,
            linker_base_addr,
            entry_point,
            main_executable_entry_point: self.executable_elf_file.entry_point,
            phdr: self.executable_elf_file.phdr_addr,
            phdr_count: self.executable_elf_file.phdr_table.len(),
            vdso_base_addr,
        }
    }

    /// `StartGuestMainThread`: spawns a host thread that hands
    /// `guest_main_args` to `entry`, the caller's entry point into the
    /// translator/interpreter. This crate never runs guest code itself.
    pub fn start_guest_main_thread<F>(&self, argv: Vec<String>, entry: F) -> std::thread::JoinHandle<()>
    where
        F: FnOnce(GuestMainArgs) + Send + 'static,
    {
        let args = self.guest_main_args(argv);
        berberis_base::instrument::loader_event("guest_main_thread_started");
        std::thread::spawn(move || entry(args))
    }
}

// SAFETY: every field is populated once during `create_instance` and never
// mutated afterward; readers only ever take `&GuestLoader` references.
unsafe impl Send for GuestLoader {}
unsafe impl Sync for GuestLoader {}

static INSTANCE: OnceLock<GuestLoader> = OnceLock::new();
static INIT_GUARD: Mutex<()> = Mutex::new(());

/// `init_once`: idempotent, thread-safe process-wide bring-up. A second
/// call (from any thread) returns [`LoaderError::AlreadyInitialized`]
/// without touching the already-installed instance, per `spec.md` §9's
/// "init_once must be idempotent and thread-safe".
pub fn init_once(config: &LoaderConfig, callbacks: &LoaderCallbacks, registry: &TrampolineRegistry) -> Result<(), LoaderError> {
    let _guard = INIT_GUARD.lock().expect("guest loader init guard poisoned");
    if INSTANCE.get().is_some() {
        return Err(LoaderError::AlreadyInitialized);
    }
    let loader = GuestLoader::create_instance(config, callbacks, registry)?;
    // `_guard` still held: no other caller can observe a half-set `INSTANCE`.
    INSTANCE.set(loader).unwrap_or_else(|_| berberis_base::fatal!("guest loader initialized twice under its own guard"));
    Ok(())
}

/// `GetInstance`: `None` before [`init_once`] has succeeded.
pub fn get_instance() -> Option<&'static GuestLoader> {
    INSTANCE.get()
}
