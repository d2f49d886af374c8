//! Synthesizing minimal ELF64 executables.
//!
//! The output is the smallest layout Linux will load: the file header,
//! one `PT_LOAD` program header, zero padding up to the next page
//! boundary, then the code. There is no section header table.

use log::trace;

use crate::elf::raw::{self, Record};
use crate::elf::{
    ByteOrder, Class, FileType, Header, Ident, Segment, SegmentFlags, SegmentType,
};

/// Page size the code segment is aligned to, both in the file and in
/// memory.
pub const PAGE_SIZE: u64 = 0x1000;

/// Build an x86-64 Linux executable that maps `code` read, write and
/// execute at `virt_addr` and starts running at `entry_addr`.
///
/// The code is placed at the first page boundary after the headers, so
/// its file offset and `virt_addr` agree modulo [`PAGE_SIZE`] as long
/// as `virt_addr` is page aligned. `code` must be self-contained
/// machine code: the file carries no relocations or symbols.
pub fn synthesize(virt_addr: u64, entry_addr: u64, code: &[u8]) -> Vec<u8> {
    let hdr_size = (raw::FILE_HDR_SIZE + raw::PROGRAM_HDR_SIZE) as u64;
    let padding = (PAGE_SIZE - hdr_size % PAGE_SIZE) % PAGE_SIZE;
    let code_size = code.len() as u64;

    let segment = Segment {
        seg_type: SegmentType::Load,
        flags: SegmentFlags::READ | SegmentFlags::WRITE | SegmentFlags::EXEC,
        offset: hdr_size + padding,
        virt_addr,
        phys_addr: virt_addr,
        file_size: code_size,
        mem_size: code_size,
        align: PAGE_SIZE,
    };

    let header = Header {
        ident: Ident {
            class: Class::Elf64,
            data: ByteOrder::Little,
            version: raw::EV_CURRENT as u8,
            osabi: raw::ELFOSABI_LINUX,
            abi_version: 0,
        },
        filety: FileType::Exec,
        machine: raw::EM_X86_64,
        version: raw::EV_CURRENT,
        entry_addr,
        prog_hdr_offset: raw::FILE_HDR_SIZE as u64,
        sec_hdr_offset: 0,
        flags: 0,
        hdr_size: raw::FILE_HDR_SIZE as u16,
        prog_hdr_size: raw::PROGRAM_HDR_SIZE as u16,
        prog_hdr_count: 1,
        sec_hdr_size: 0,
        sec_hdr_count: 0,
        sec_strtab_index: raw::SHN_UNDEF,
    };

    trace!(
        "code at file offset {:#x}, vaddr {:#x}, entry {:#x}, {} bytes",
        segment.offset,
        virt_addr,
        entry_addr,
        code_size
    );

    let mut out = Vec::with_capacity((segment.offset + code_size) as usize);
    header.to_raw().write(ByteOrder::Little, &mut out);
    raw::ProgramHdr::from(segment).write(ByteOrder::Little, &mut out);
    out.resize(out.len() + padding as usize, 0);
    out.extend_from_slice(code);
    out
}
