//! Integration coverage for loading a real (synthetic) ELF64 PIE off disk:
//! segment mapping through `libc::mmap`, entry-point computation, and
//! `DT_HASH`-based symbol resolution end to end.

use std::io::Write;

use berberis_guest_loader::{load_from_file, LoaderError};
use tempfile::NamedTempFile;

const ET_EXEC: u16 = 2;
const ET_DYN: u16 = 3;
const PT_LOAD: u32 = 1;
const PT_DYNAMIC: u32 = 2;
const PT_INTERP: u32 = 3;
const PF_R: u32 = 4;
const PF_X: u32 = 1;

const DT_HASH: i64 = 4;
const DT_STRTAB: i64 = 5;
const DT_SYMTAB: i64 = 6;
const DT_STRSZ: i64 = 10;
const DT_NULL: i64 = 0;

/// Appends `bytes`, returning the offset it was written at. Lets the test
/// lay out a file without hand-computing every offset.
struct Builder {
    buf: Vec<u8>,
}

impl Builder {
    fn new() -> Builder {
        Builder { buf: Vec::new() }
    }

    fn push(&mut self, bytes: &[u8]) -> u64 {
        let offset = self.buf.len() as u64;
        self.buf.extend_from_slice(bytes);
        offset
    }

    fn pad_to(&mut self, align: usize) {
        while self.buf.len() % align != 0 {
            self.buf.push(0);
        }
    }
}

/// One `Elf64_Sym` entry, matching the in-memory layout `symbol_table.rs`
/// expects to find mapped guest-side.
fn elf_sym(st_name: u32, st_info: u8, st_shndx: u16, st_value: u64) -> [u8; 24] {
    let mut b = [0u8; 24];
    b[0..4].copy_from_slice(&st_name.to_le_bytes());
    b[4] = st_info;
    b[5] = 0; // st_other
    b[6..8].copy_from_slice(&st_shndx.to_le_bytes());
    b[8..16].copy_from_slice(&st_value.to_le_bytes());
    b[16..24].copy_from_slice(&(0u64).to_le_bytes());
    b
}

fn write_phdr(buf: &mut [u8], cursor: &mut usize, p_type: u32, p_flags: u32, p_offset: u64, p_vaddr: u64, p_filesz: u64) {
    let c = *cursor;
    buf[c..c + 4].copy_from_slice(&p_type.to_le_bytes());
    buf[c + 4..c + 8].copy_from_slice(&p_flags.to_le_bytes());
    buf[c + 8..c + 16].copy_from_slice(&p_offset.to_le_bytes());
    buf[c + 16..c + 24].copy_from_slice(&p_vaddr.to_le_bytes());
    buf[c + 24..c + 32].copy_from_slice(&0u64.to_le_bytes()); // p_paddr
    buf[c + 32..c + 40].copy_from_slice(&p_filesz.to_le_bytes());
    buf[c + 40..c + 48].copy_from_slice(&p_filesz.to_le_bytes()); // p_memsz == p_filesz
    buf[c + 48..c + 56].copy_from_slice(&0x1000u64.to_le_bytes()); // p_align
    *cursor += 56;
}

/// Minimum load address for the `ET_EXEC` (static, fixed-address) case:
/// mapping at vaddr 0 would collide with the kernel's `mmap_min_addr`
/// guard, so fixed-address loads in this file use a realistic base.
const STATIC_BASE: u64 = 0x0040_0000;

/// Builds a minimal ELF64 file: one `PT_LOAD` segment, with an optional
/// `PT_DYNAMIC` segment exposing a SysV-hashed dynamic symbol table
/// containing a single defined global symbol, `"answer"`, whose value
/// addresses a 4-byte payload. `e_type` is `ET_DYN` (loaded anywhere, vaddr
/// 0 == file offset 0, used for the dynamic-linking scenarios) or
/// `ET_EXEC` (loaded at the fixed address `STATIC_BASE`, used for the
/// static-executable scenario, which carries no `PT_DYNAMIC`).
fn build_synthetic_elf(e_type: u16, with_dynamic: bool, with_interp: bool) -> Vec<u8> {
    let base = if e_type == ET_EXEC { STATIC_BASE } else { 0 };
    let mut b = Builder::new();

    // Reserve space for the ELF header (64 bytes) and up to 3 program
    // headers (56 bytes each); patched in at the end.
    let ehdr_off = b.push(&[0u8; 64]);
    assert_eq!(ehdr_off, 0);
    let phdr_table_off = b.push(&[0u8; 56 * 3]);

    let payload_off = b.push(&0x2a_u32.to_le_bytes());

    let interp_off = if with_interp { Some(b.push(b"/system/bin/linker64\0")) } else { None };

    let mut dynamic_off = None;
    let mut dynamic_len = 0u64;
    if with_dynamic {
        b.pad_to(8);
        let strtab_off = b.push(b"\0answer\0");
        let strtab_size = 8u64;

        b.pad_to(8);
        let symtab_off = b.push(&elf_sym(0, 0, 0, 0)); // index 0: reserved null symbol
        b.push(&elf_sym(1, 0x10, 1, payload_off)); // index 1: STB_GLOBAL, defined, value = payload_off

        b.pad_to(4);
        // SysV hash: nbucket=1, nchain=2, bucket=[1], chain=[0,0]
        let hash_off = b.push(&1u32.to_le_bytes());
        b.push(&2u32.to_le_bytes());
        b.push(&1u32.to_le_bytes()); // bucket[0]
        b.push(&0u32.to_le_bytes()); // chain[0]
        b.push(&0u32.to_le_bytes()); // chain[1]

        b.pad_to(8);
        let dyn_start = b.buf.len() as u64;
        let mut push_dyn = |tag: i64, value: u64, b: &mut Builder| {
            b.push(&tag.to_le_bytes());
            b.push(&value.to_le_bytes());
        };
        push_dyn(DT_HASH, hash_off, &mut b);
        push_dyn(DT_STRTAB, strtab_off, &mut b);
        push_dyn(DT_SYMTAB, symtab_off, &mut b);
        push_dyn(DT_STRSZ, strtab_size, &mut b);
        push_dyn(DT_NULL, 0, &mut b);
        dynamic_off = Some(dyn_start);
        dynamic_len = (b.buf.len() as u64) - dyn_start;
    }

    b.pad_to(0x10);
    let total_len = b.buf.len() as u64;

    // Patch the ELF64 header.
    let buf = &mut b.buf;
    buf[0..4].copy_from_slice(b"\x7fELF");
    buf[4] = 2; // ELFCLASS64
    buf[5] = 1; // ELFDATA2LSB
    buf[20..24].copy_from_slice(&1u32.to_le_bytes()); // e_version
    buf[16..18].copy_from_slice(&e_type.to_le_bytes());
    buf[24..32].copy_from_slice(&(base + payload_off).to_le_bytes()); // e_entry
    buf[32..40].copy_from_slice(&phdr_table_off.to_le_bytes());
    buf[54..56].copy_from_slice(&56u16.to_le_bytes()); // e_phentsize

    let mut phnum = 1u16;
    let mut phdr_cursor = phdr_table_off as usize;

    write_phdr(buf, &mut phdr_cursor, PT_LOAD, PF_R | PF_X, 0, base, total_len);

    if let Some(off) = dynamic_off {
        write_phdr(buf, &mut phdr_cursor, PT_DYNAMIC, PF_R, off, base + off, dynamic_len);
        phnum += 1;
    }
    if let Some(off) = interp_off {
        let len = b"/system/bin/linker64\0".len() as u64;
        write_phdr(buf, &mut phdr_cursor, PT_INTERP, PF_R, off, base + off, len);
        phnum += 1;
    }

    buf[56..58].copy_from_slice(&phnum.to_le_bytes());

    std::mem::take(&mut b.buf)
}

fn write_temp_file(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file
}

#[test]
fn loads_a_dynamic_pie_and_resolves_its_symbol() {
    let bytes = build_synthetic_elf(ET_DYN, true, false);
    let file = write_temp_file(&bytes);

    let elf = load_from_file(file.path(), 0x1000).expect("should load");
    assert!(elf.is_loaded());
    assert!(!elf.has_pt_interp());

    let answer = elf.find_symbol("answer").expect("symbol should resolve");
    // The sole `PT_LOAD` segment has `p_vaddr == 0`, so `load_bias ==
    // base_addr` and a resolved `GuestAddr`'s raw value is directly a host
    // pointer into the mapping `load_from_file` created.
    assert_eq!(elf.load_bias, elf.base_addr as u64);
    // SAFETY: `answer` was resolved from the image `load_from_file` just
    // mapped, and points at the 4-byte payload this test wrote there.
    let value = unsafe { std::ptr::read(answer.0 as *const u32) };
    assert_eq!(value, 0x2a);

    assert_eq!(elf.find_symbol("does_not_exist"), None);
}

#[test]
fn loads_a_static_executable_with_no_dynamic_segment() {
    let bytes = build_synthetic_elf(ET_EXEC, false, false);
    let file = write_temp_file(&bytes);

    let elf = load_from_file(file.path(), 0x1000).expect("a static executable with no PT_DYNAMIC should load");
    assert!(elf.is_loaded());
    assert_eq!(elf.base_addr, STATIC_BASE as usize);
    assert_eq!(elf.load_bias, 0);
    assert_eq!(elf.entry_point, berberis_guest_state::GuestAddr(STATIC_BASE + 232));
    assert!(!elf.has_pt_interp());
    assert!(elf.find_symbol("anything").is_none());
}

#[test]
fn has_pt_interp_reflects_the_segment_table() {
    let bytes = build_synthetic_elf(ET_DYN, true, true);
    let file = write_temp_file(&bytes);

    let elf = load_from_file(file.path(), 0x1000).expect("should load");
    assert!(elf.has_pt_interp());
}

#[test]
fn missing_file_reports_open_failed() {
    let mut path = std::env::temp_dir();
    path.push("berberis-guest-loader-test-does-not-exist");
    let err = load_from_file(&path, 0x1000).unwrap_err();
    assert!(matches!(err, LoaderError::OpenFailed { .. }));
}

#[test]
fn truncated_file_reports_malformed_elf() {
    let file = write_temp_file(&[0u8; 4]);
    let err = load_from_file(file.path(), 0x1000).unwrap_err();
    assert!(matches!(err, LoaderError::MalformedElf { .. }));
}
