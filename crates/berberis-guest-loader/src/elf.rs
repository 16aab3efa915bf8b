//! A minimal ELF32/ELF64 segment-mapping loader, ported from
//! `tiny_loader/tiny_loader.cc`'s `TinyElfLoader`.
//!
//! `spec.md` §1 excludes "the tiny ELF loader used only in tests" from
//! scope, but this is a *different* thing: a minimal segment-mapping/
//! symbol-lookup helper that the in-scope guest loader depends on to do its
//! job, not a standalone test tool. It is kept as small as the source's own
//! version — no section header parsing, no relocation processing (the
//! guest dynamic linker does that once control passes to it).
//!
//! Reading the ELF/program headers here is by whole-file buffer rather than
//! the source's `MappedFileFragment` page-fragment mapping; the actual
//! loadable-segment mapping still goes through `libc::mmap` with
//! `MAP_FIXED`, matching the source's memory model.

use std::ffi::c_void;
use std::fs::File;
use std::io::Read;
use std::os::raw::c_char;
use std::path::Path;

use berberis_base::align::{align_down, align_up};
use berberis_guest_state::GuestAddr;

use crate::error::LoaderError;
use crate::symbol_table::{ElfSym, SymbolTable};

pub const ET_EXEC: u16 = 2;
pub const ET_DYN: u16 = 3;

const PT_LOAD: u32 = 1;
const PT_DYNAMIC: u32 = 2;
const PT_INTERP: u32 = 3;

const PF_X: u32 = 1;
const PF_W: u32 = 2;
const PF_R: u32 = 4;

const DT_NULL: i64 = 0;
const DT_HASH: i64 = 4;
const DT_STRTAB: i64 = 5;
const DT_SYMTAB: i64 = 6;
const DT_STRSZ: i64 = 10;
const DT_GNU_HASH: i64 = 0x6ffffef5;

const ELFCLASS32: u8 = 1;
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const EV_CURRENT: u32 = 1;

#[derive(Debug, Clone, Copy)]
pub struct ElfPhdr {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

struct ElfHeader {
    class64: bool,
    e_type: u16,
    e_entry: u64,
    e_phoff: u64,
    e_phentsize: u16,
    e_phnum: u16,
}

fn malformed(path: &str, reason: impl Into<String>) -> LoaderError {
    LoaderError::MalformedElf { path: path.to_string(), reason: reason.into() }
}

fn read_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes(buf[off..off + 2].try_into().unwrap())
}
fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(buf[off..off + 4].try_into().unwrap())
}
fn read_u64(buf: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(buf[off..off + 8].try_into().unwrap())
}

fn parse_elf_header(path: &str, buf: &[u8]) -> Result<ElfHeader, LoaderError> {
    if buf.len() < 20 || &buf[0..4] != b"\x7fELF" {
        return Err(malformed(path, "bad ELF magic"));
    }
    let ei_class = buf[4];
    let ei_data = buf[5];
    if ei_class != ELFCLASS32 && ei_class != ELFCLASS64 {
        return Err(malformed(path, format!("unsupported EI_CLASS: {ei_class}")));
    }
    if ei_data != ELFDATA2LSB {
        return Err(malformed(path, format!("not little-endian: {ei_data}")));
    }
    let class64 = ei_class == ELFCLASS64;

    let e_version = read_u32(buf, 20);
    if e_version != EV_CURRENT {
        return Err(malformed(path, format!("unexpected e_version: {e_version}")));
    }

    if class64 {
        if buf.len() < 64 {
            return Err(malformed(path, "file too small for an ELF64 header"));
        }
        Ok(ElfHeader {
            class64,
            e_type: read_u16(buf, 16),
            e_entry: read_u64(buf, 24),
            e_phoff: read_u64(buf, 32),
            e_phentsize: read_u16(buf, 54),
            e_phnum: read_u16(buf, 56),
        })
    } else {
        if buf.len() < 52 {
            return Err(malformed(path, "file too small for an ELF32 header"));
        }
        Ok(ElfHeader {
            class64,
            e_type: read_u16(buf, 16),
            e_entry: read_u32(buf, 24) as u64,
            e_phoff: read_u32(buf, 28) as u64,
            e_phentsize: read_u16(buf, 42),
            e_phnum: read_u16(buf, 44),
        })
    }
}

fn parse_program_headers(path: &str, buf: &[u8], header: &ElfHeader) -> Result<Vec<ElfPhdr>, LoaderError> {
    if header.e_phnum == 0 || header.e_phnum as usize > 65536 / 32 {
        return Err(malformed(path, format!("invalid e_phnum: {}", header.e_phnum)));
    }
    let mut phdrs = Vec::with_capacity(header.e_phnum as usize);
    for i in 0..header.e_phnum as usize {
        let off = header.e_phoff as usize + i * header.e_phentsize as usize;
        if header.class64 {
            if off + 56 > buf.len() {
                return Err(malformed(path, "phdr table past end of file"));
            }
            phdrs.push(ElfPhdr {
                p_type: read_u32(buf, off),
                p_flags: read_u32(buf, off + 4),
                p_offset: read_u64(buf, off + 8),
                p_vaddr: read_u64(buf, off + 16),
                p_filesz: read_u64(buf, off + 32),
                p_memsz: read_u64(buf, off + 40),
                p_align: read_u64(buf, off + 48),
            });
        } else {
            if off + 32 > buf.len() {
                return Err(malformed(path, "phdr table past end of file"));
            }
            phdrs.push(ElfPhdr {
                p_type: read_u32(buf, off),
                p_offset: read_u32(buf, off + 4) as u64,
                p_vaddr: read_u32(buf, off + 8) as u64,
                p_filesz: read_u32(buf, off + 16) as u64,
                p_memsz: read_u32(buf, off + 20) as u64,
                p_flags: read_u32(buf, off + 24),
                p_align: read_u32(buf, off + 28) as u64,
            });
        }
    }
    Ok(phdrs)
}

/// `FindPtInterp`: the presence of a `PT_INTERP` segment is the sole
/// signal the guest loader uses to decide "dynamic executable" vs "static
/// executable", per `spec.md` §4.8 step 2.
pub fn find_pt_interp<'a>(buf: &'a [u8], phdrs: &[ElfPhdr]) -> Option<&'a str> {
    let phdr = phdrs.iter().find(|p| p.p_type == PT_INTERP)?;
    let start = phdr.p_offset as usize;
    let end = start + phdr.p_filesz as usize;
    if end > buf.len() || start >= end {
        return None;
    }
    let raw = &buf[start..end];
    let nul = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    std::str::from_utf8(&raw[..nul]).ok()
}

/// Extent of all `PT_LOAD` segments, page-aligned, per
/// `phdr_table_get_load_size`.
fn load_size(phdrs: &[ElfPhdr]) -> Option<(u64, u64)> {
    let mut min_vaddr = u64::MAX;
    let mut max_vaddr = 0u64;
    let mut found = false;
    for phdr in phdrs {
        if phdr.p_type != PT_LOAD {
            continue;
        }
        found = true;
        min_vaddr = min_vaddr.min(phdr.p_vaddr);
        max_vaddr = max_vaddr.max(phdr.p_vaddr + phdr.p_memsz);
    }
    if !found {
        return None;
    }
    let page = berberis_base::align::page_size() as u64;
    let min_vaddr = align_down(min_vaddr as usize, page as usize) as u64;
    let max_vaddr = align_up(max_vaddr as usize, page as usize) as u64;
    Some((min_vaddr, max_vaddr - min_vaddr))
}

/// A loaded guest ELF image. Owns nothing past the mapping `libc::mmap`
/// created (it is deliberately never unmapped by this type — the image
/// must live for the guest process' lifetime, mirroring `LoadedElfFile`
/// never calling `munmap` either).
pub struct LoadedElfFile {
    pub e_type: u16,
    pub base_addr: usize,
    pub load_bias: u64,
    pub entry_point: GuestAddr,
    /// `load_bias + e_phoff`: the guest address of the program header table
    /// within the mapped image, i.e. the value Linux's own ELF loader hands
    /// the guest as `AT_PHDR`.
    pub phdr_addr: GuestAddr,
    pub phdr_table: Vec<ElfPhdr>,
    pub(crate) symbol_table: Option<SymbolTable>,
}

impl LoadedElfFile {
    pub fn is_loaded(&self) -> bool {
        self.base_addr != 0
    }

    pub fn find_symbol(&self, name: &str) -> Option<GuestAddr> {
        self.symbol_table.as_ref().and_then(|t| t.find_symbol(name)).map(GuestAddr)
    }

    /// Presence of a `PT_INTERP` segment, per `FindPtInterp`; the guest
    /// loader uses only presence (not the interpreter path string) to
    /// decide whether an executable is static, per `spec.md` §4.8 step 2.
    pub fn has_pt_interp(&self) -> bool {
        self.phdr_table.iter().any(|p| p.p_type == PT_INTERP)
    }
}

// SAFETY: the mapping backing a `LoadedElfFile` is set up once at load time
// and never mutated by this crate afterward (only read, by the symbol
// table and by the dynamic linker once control transfers to it).
unsafe impl Send for LoadedElfFile {}

/// Reserves and populates the address space for `phdr_table`'s `PT_LOAD`
/// segments, per `TinyElfLoader::{ReserveAddressSpace,LoadSegments}`.
fn load_segments(path: &str, fd: &File, file_buf: &[u8], e_type: u16, phdr_table: &[ElfPhdr], align: usize) -> Result<(usize, u64), LoaderError> {
    use std::os::unix::io::AsRawFd;

    let (min_vaddr, size) = load_size(phdr_table).ok_or_else(|| malformed(path, "no loadable segments"))?;
    if size == 0 {
        return Err(malformed(path, "no loadable segments"));
    }

    let page = berberis_base::align::page_size();
    let mmap_err = |reason: std::io::Error| LoaderError::MmapFailed { path: path.to_string(), reason: reason.to_string() };

    // SAFETY: reserving address space with PROT_NONE never touches memory
    // contents; the result is checked against MAP_FAILED.
    let reserve = |hint: *mut c_void, reserve_size: usize| unsafe {
        libc::mmap(hint, reserve_size, libc::PROT_NONE, libc::MAP_PRIVATE | libc::MAP_ANONYMOUS, -1, 0)
    };

    let (start, load_bias): (*mut u8, u64) = if e_type == ET_EXEC {
        let hint = min_vaddr as usize as *mut c_void;
        let addr = reserve(hint, size as usize);
        if addr == libc::MAP_FAILED {
            return Err(mmap_err(std::io::Error::last_os_error()));
        }
        if addr != hint {
            // SAFETY: addr came from the mmap call above.
            unsafe { libc::munmap(addr, size as usize) };
            return Err(LoaderError::MmapFailed {
                path: path.to_string(),
                reason: format!("couldn't reserve {size} bytes at the requested fixed address {min_vaddr:#x}"),
            });
        }
        (addr as *mut u8, 0)
    } else if align <= page {
        let addr = reserve(std::ptr::null_mut(), size as usize);
        if addr == libc::MAP_FAILED {
            return Err(mmap_err(std::io::Error::last_os_error()));
        }
        (addr as *mut u8, (addr as u64).wrapping_sub(min_vaddr))
    } else {
        let unaligned = reserve(std::ptr::null_mut(), align + size as usize);
        if unaligned == libc::MAP_FAILED {
            return Err(mmap_err(std::io::Error::last_os_error()));
        }
        let unaligned = unaligned as usize;
        let start = align_up(unaligned, align);
        // SAFETY: trims the two slack regions bracketing the aligned span.
        unsafe {
            libc::munmap(unaligned as *mut c_void, start - unaligned);
            libc::munmap((start + size as usize) as *mut c_void, unaligned + align - start);
        }
        (start as *mut u8, (start as u64).wrapping_sub(min_vaddr))
    };

    for phdr in phdr_table {
        if phdr.p_type != PT_LOAD {
            continue;
        }
        let seg_start = phdr.p_vaddr.wrapping_add(load_bias);
        let seg_end = seg_start + phdr.p_memsz;
        let seg_page_start = align_down(seg_start as usize, page) as u64;
        let seg_page_end = align_up(seg_end as usize, page) as u64;
        let mut seg_file_end = seg_start + phdr.p_filesz;

        let file_start = phdr.p_offset;
        let file_end = file_start + phdr.p_filesz;
        if file_end as usize > file_buf.len() {
            return Err(malformed(path, "load segment extends past end of file"));
        }
        let file_page_start = align_down(file_start as usize, page) as u64;
        let file_length = file_end - file_page_start;

        let prot = (if phdr.p_flags & PF_X != 0 { libc::PROT_EXEC } else { 0 })
            | (if phdr.p_flags & PF_R != 0 { libc::PROT_READ } else { 0 })
            | (if phdr.p_flags & PF_W != 0 { libc::PROT_WRITE } else { 0 });
        if prot & (libc::PROT_EXEC | libc::PROT_WRITE) == (libc::PROT_EXEC | libc::PROT_WRITE) {
            return Err(malformed(path, "W+E load segments are not allowed"));
        }

        if file_length != 0 {
            // SAFETY: `seg_page_start` lies within the region reserved
            // above; `fd` stays open for the call's duration.
            let seg_addr = unsafe {
                libc::mmap(
                    seg_page_start as usize as *mut c_void,
                    file_length as usize,
                    prot,
                    libc::MAP_FIXED | libc::MAP_PRIVATE,
                    fd.as_raw_fd(),
                    file_page_start as libc::off_t,
                )
            };
            if seg_addr == libc::MAP_FAILED {
                return Err(mmap_err(std::io::Error::last_os_error()));
            }
        }

        if phdr.p_flags & PF_W != 0 {
            let page_offset = seg_file_end % page as u64;
            if page_offset > 0 {
                // SAFETY: zero-fills the tail of the last file-backed page
                // of a writable segment, which this mapping owns.
                unsafe {
                    std::ptr::write_bytes(seg_file_end as usize as *mut u8, 0, (page as u64 - page_offset) as usize);
                }
            }
        }
        seg_file_end = align_up(seg_file_end as usize, page) as u64;

        if seg_page_end > seg_file_end {
            let zero_size = (seg_page_end - seg_file_end) as usize;
            // SAFETY: the anonymous zero-fill mapping covers only the
            // remainder of this segment's own reserved range.
            let zero_addr = unsafe {
                libc::mmap(
                    seg_file_end as usize as *mut c_void,
                    zero_size,
                    prot,
                    libc::MAP_FIXED | libc::MAP_ANONYMOUS | libc::MAP_PRIVATE,
                    -1,
                    0,
                )
            };
            if zero_addr == libc::MAP_FAILED {
                return Err(mmap_err(std::io::Error::last_os_error()));
            }
        }
    }

    Ok((start as usize, load_bias))
}

fn find_dynamic_segment(phdr_table: &[ElfPhdr], load_bias: u64) -> Option<u64> {
    phdr_table.iter().find(|p| p.p_type == PT_DYNAMIC).map(|p| p.p_vaddr.wrapping_add(load_bias))
}

/// Walks the `PT_DYNAMIC` entries to find `DT_SYMTAB`/`DT_STRTAB`/
/// `DT_STRSZ` plus either `DT_GNU_HASH` or `DT_HASH`, and builds the
/// [`SymbolTable`], per `TinyElfLoader::InitializeFields`.
///
/// # Safety
/// `dynamic_addr` must address a `DT_NULL`-terminated array of
/// `(tag: i64, value: u64)` pairs within memory mapped by [`load_segments`].
unsafe fn build_symbol_table(path: &str, dynamic_addr: u64, load_bias: u64) -> Result<Option<SymbolTable>, LoaderError> {
    let mut symtab: Option<*const ElfSym> = None;
    let mut strtab: Option<*const c_char> = None;
    let mut strtab_size: usize = 0;
    let mut gnu_hash_ptr: Option<u64> = None;
    let mut sysv_hash_ptr: Option<u64> = None;

    let mut cursor = dynamic_addr as *const i64;
    loop {
        let tag = *cursor;
        let value = *(cursor.add(1) as *const u64);
        if tag == DT_NULL {
            break;
        }
        match tag {
            DT_GNU_HASH => gnu_hash_ptr = Some(load_bias.wrapping_add(value)),
            DT_HASH => sysv_hash_ptr = Some(load_bias.wrapping_add(value)),
            DT_SYMTAB => symtab = Some(load_bias.wrapping_add(value) as usize as *const ElfSym),
            DT_STRTAB => strtab = Some(load_bias.wrapping_add(value) as usize as *const c_char),
            DT_STRSZ => strtab_size = value as usize,
            _ => {}
        }
        cursor = cursor.add(2);
    }

    let (Some(symtab), Some(strtab)) = (symtab, strtab) else {
        return Err(malformed(path, "missing DT_SYMTAB or DT_STRTAB"));
    };
    if strtab_size == 0 {
        return Err(malformed(path, "missing or invalid DT_STRSZ"));
    }

    if let Some(gnu_addr) = gnu_hash_ptr {
        let words = gnu_addr as usize as *const u32;
        let nbucket = *words;
        let nchain_base = *words.add(1);
        let mut maskwords = *words.add(2);
        let shift2 = *words.add(3);
        let bloom_filter = words.add(4) as *const u64;
        if maskwords == 0 || (maskwords & (maskwords - 1)) != 0 {
            return Err(malformed(path, "invalid GNU hash maskwords (not a power of two)"));
        }
        maskwords -= 1;
        let bucket = (bloom_filter as *const u32).add(maskwords as usize + 1);
        let chain = bucket.add(nbucket as usize).offset(-(nchain_base as isize));
        Ok(Some(SymbolTable::new_gnu(load_bias, symtab, strtab, strtab_size, nbucket, bucket, chain, maskwords, shift2, bloom_filter)))
    } else if let Some(sysv_addr) = sysv_hash_ptr {
        let words = sysv_addr as usize as *const u32;
        let nbucket = *words;
        let bucket = words.add(2);
        let chain = bucket.add(nbucket as usize);
        Ok(Some(SymbolTable::new_sysv(load_bias, symtab, strtab, strtab_size, nbucket, bucket, chain)))
    } else {
        Ok(None)
    }
}

/// `TinyLoader::LoadFromFile`: reads, reserves, maps, and parses one ELF
/// image. `align` is the minimum load-address alignment (`kLibraryAlignment`
/// in the source); pass the host page size if the caller has no stronger
/// requirement.
pub fn load_from_file(path: &Path, align: usize) -> Result<LoadedElfFile, LoaderError> {
    let path_str = path.display().to_string();
    let mut file = File::open(path).map_err(|e| LoaderError::OpenFailed { path: path_str.clone(), reason: e.to_string() })?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(|e| LoaderError::OpenFailed { path: path_str.clone(), reason: e.to_string() })?;

    let header = parse_elf_header(&path_str, &buf)?;
    let phdr_table = parse_program_headers(&path_str, &buf, &header)?;

    let (base_addr, load_bias) = load_segments(&path_str, &file, &buf, header.e_type, &phdr_table, align)?;

    let entry_point = if header.e_entry != 0 { GuestAddr(load_bias.wrapping_add(header.e_entry)) } else { GuestAddr::NULL };

    let dynamic_offset = if header.e_type == ET_EXEC { None } else { find_dynamic_segment(&phdr_table, load_bias) };
    let symbol_table = match dynamic_offset {
        // SAFETY: `dynamic_offset` was computed from a `PT_DYNAMIC` entry
        // within the image `load_segments` just mapped.
        Some(addr) => unsafe { build_symbol_table(&path_str, addr, load_bias)? },
        None => None,
    };
    if header.e_type != ET_EXEC && symbol_table.is_none() {
        return Err(malformed(&path_str, "dynamic segment was not found"));
    }

    let phdr_addr = GuestAddr(load_bias.wrapping_add(header.e_phoff));

    Ok(LoadedElfFile { e_type: header.e_type, base_addr, load_bias, entry_point, phdr_addr, phdr_table, symbol_table })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_magic() {
        let buf = vec![0u8; 64];
        let err = parse_elf_header("test", &buf).unwrap_err();
        assert!(matches!(err, LoaderError::MalformedElf { .. }));
    }

    #[test]
    fn parses_a_minimal_elf64_header() {
        let mut buf = vec![0u8; 64];
        buf[0..4].copy_from_slice(b"\x7fELF");
        buf[4] = ELFCLASS64;
        buf[5] = ELFDATA2LSB;
        buf[20..24].copy_from_slice(&1u32.to_le_bytes()); // e_version
        buf[16..18].copy_from_slice(&ET_DYN.to_le_bytes()); // e_type
        buf[24..32].copy_from_slice(&0x1000u64.to_le_bytes()); // e_entry
        buf[32..40].copy_from_slice(&64u64.to_le_bytes()); // e_phoff
        buf[54..56].copy_from_slice(&56u16.to_le_bytes()); // e_phentsize
        buf[56..58].copy_from_slice(&1u16.to_le_bytes()); // e_phnum

        let header = parse_elf_header("test", &buf).unwrap();
        assert!(header.class64);
        assert_eq!(header.e_type, ET_DYN);
        assert_eq!(header.e_entry, 0x1000);
        assert_eq!(header.e_phnum, 1);
    }

    #[test]
    fn find_pt_interp_reads_the_nul_terminated_path() {
        let path_bytes = b"/system/bin/linker64\0";
        let mut buf = vec![0u8; 64];
        buf.extend_from_slice(path_bytes);
        let interp_offset = 64u64;

        let phdrs = vec![ElfPhdr {
            p_type: PT_INTERP,
            p_flags: PF_R,
            p_offset: interp_offset,
            p_vaddr: interp_offset,
            p_filesz: path_bytes.len() as u64,
            p_memsz: path_bytes.len() as u64,
            p_align: 1,
        }];

        assert_eq!(find_pt_interp(&buf, &phdrs), Some("/system/bin/linker64"));
    }

    #[test]
    fn find_pt_interp_is_none_for_a_static_executable() {
        let phdrs = vec![ElfPhdr { p_type: PT_LOAD, p_flags: PF_R | PF_X, p_offset: 0, p_vaddr: 0, p_filesz: 0, p_memsz: 0, p_align: 0x1000 }];
        assert_eq!(find_pt_interp(&[], &phdrs), None);
    }

    #[test]
    fn load_size_spans_every_pt_load_segment_page_aligned() {
        let phdrs = vec![
            ElfPhdr { p_type: PT_LOAD, p_flags: PF_R, p_offset: 0, p_vaddr: 0x1000, p_filesz: 0x10, p_memsz: 0x10, p_align: 0x1000 },
            ElfPhdr { p_type: PT_LOAD, p_flags: PF_R | PF_W, p_offset: 0x1000, p_vaddr: 0x3000, p_filesz: 0x10, p_memsz: 0x2000, p_align: 0x1000 },
        ];
        let (min_vaddr, size) = load_size(&phdrs).unwrap();
        assert_eq!(min_vaddr, 0x1000);
        assert_eq!(size, 0x4000);
    }

    #[test]
    fn load_size_is_none_without_any_pt_load() {
        let phdrs = vec![ElfPhdr { p_type: PT_DYNAMIC, p_flags: PF_R, p_offset: 0, p_vaddr: 0, p_filesz: 0, p_memsz: 0, p_align: 8 }];
        assert!(load_size(&phdrs).is_none());
    }
}
