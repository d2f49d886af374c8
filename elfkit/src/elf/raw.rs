//! Raw representation of the ELF64 on-disk records, as `#[repr(C)]`
//! [`Pod`] structures.
//!
//! The multi-byte fields of a raw record hold whatever byte order
//! they were read in or are about to be written in. [`Record::read`]
//! and [`Record::write`] take care of converting between the file's
//! [`ByteOrder`] and native order.

use core::mem;

use bytemuck::{Pod, Zeroable};

use super::ByteOrder;

/// Magic number (`b"\x7FELF"`).
pub const MAGIC: [u8; 4] = *b"\x7fELF";
/// Size of `e_ident`.
pub const EI_NIDENT: usize = 16;
/// 32-bit files.
pub const ELFCLASS32: u8 = 1;
/// 64-bit files.
pub const ELFCLASS64: u8 = 2;
/// Two's complement, little-endian.
pub const ELFDATA2LSB: u8 = 1;
/// Two's complement, big-endian.
pub const ELFDATA2MSB: u8 = 2;
/// System-V ABI.
pub const ELFOSABI_SYSV: u8 = 0;
/// Linux ABI.
pub const ELFOSABI_LINUX: u8 = 3;
/// Current ELF version.
pub const EV_CURRENT: u32 = 1;
/// AMD x86-64 architecture.
pub const EM_X86_64: u16 = 0x3e;

/// Undefined section index.
pub const SHN_UNDEF: u16 = 0;
/// Lower bound of reserved section indices.
pub const SHN_LORESERVE: u16 = 0xff00;
/// Absolute symbol values.
pub const SHN_ABS: u16 = 0xfff1;
/// Common block symbols.
pub const SHN_COMMON: u16 = 0xfff2;
/// Escape value for section indices stored elsewhere.
pub const SHN_XINDEX: u16 = 0xffff;

/// Size of [`FileHdr`] on disk.
pub const FILE_HDR_SIZE: usize = mem::size_of::<FileHdr>();
/// Size of [`ProgramHdr`] on disk.
pub const PROGRAM_HDR_SIZE: usize = mem::size_of::<ProgramHdr>();
/// Size of [`SectionHdr`] on disk.
pub const SECTION_HDR_SIZE: usize = mem::size_of::<SectionHdr>();
/// Size of [`Sym`] on disk.
pub const SYM_SIZE: usize = mem::size_of::<Sym>();

/// A raw record that can be moved between a byte buffer in some
/// [`ByteOrder`] and a native-order value.
pub trait Record: Pod {
    /// Swap every multi-byte field between `order` and native order.
    /// Swapping twice with the same order gives back the original.
    #[must_use]
    fn swap(self, order: ByteOrder) -> Self;

    /// Read one record from the start of `bytes`, which are in
    /// `order`. Returns `None` if `bytes` is too short.
    fn read(bytes: &[u8], order: ByteOrder) -> Option<Self> {
        let bytes = bytes.get(..mem::size_of::<Self>())?;
        Some(bytemuck::pod_read_unaligned::<Self>(bytes).swap(order))
    }

    /// Append this record to `out`, in `order`.
    fn write(self, order: ByteOrder, out: &mut Vec<u8>) {
        out.extend_from_slice(bytemuck::bytes_of(&self.swap(order)));
    }
}

/// ELF file identifier. Equivalent to `e_ident` in `Elf64_Ehdr` in
/// `elf.h`. Single bytes only, so it reads the same in any byte
/// order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
#[allow(missing_docs)]
pub struct FileIdent {
    pub magic: [u8; 4],
    pub class: u8,
    pub data: u8,
    pub version: u8,
    pub osabi: u8,
    pub abi_version: u8,
    pub pad: [u8; 7],
}

/// ELF file header. Equivalent to `Elf64_Ehdr` in `elf.h`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
#[allow(missing_docs)]
pub struct FileHdr {
    pub ident: FileIdent,
    pub filety: u16,
    pub machine: u16,
    pub version: u32,
    pub entry_addr: u64,
    pub prog_hdr_offset: u64,
    pub sec_hdr_offset: u64,
    pub flags: u32,
    pub hdr_size: u16,
    pub prog_hdr_size: u16,
    pub prog_hdr_count: u16,
    pub sec_hdr_size: u16,
    pub sec_hdr_count: u16,
    pub sec_strtab_index: u16,
}

impl Record for FileHdr {
    fn swap(self, order: ByteOrder) -> Self {
        Self {
            ident: self.ident,
            filety: order.swap16(self.filety),
            machine: order.swap16(self.machine),
            version: order.swap32(self.version),
            entry_addr: order.swap64(self.entry_addr),
            prog_hdr_offset: order.swap64(self.prog_hdr_offset),
            sec_hdr_offset: order.swap64(self.sec_hdr_offset),
            flags: order.swap32(self.flags),
            hdr_size: order.swap16(self.hdr_size),
            prog_hdr_size: order.swap16(self.prog_hdr_size),
            prog_hdr_count: order.swap16(self.prog_hdr_count),
            sec_hdr_size: order.swap16(self.sec_hdr_size),
            sec_hdr_count: order.swap16(self.sec_hdr_count),
            sec_strtab_index: order.swap16(self.sec_strtab_index),
        }
    }
}

/// Section header. Equivalent to `Elf64_Shdr` in `elf.h`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
#[allow(missing_docs)]
pub struct SectionHdr {
    pub name_offset: u32,
    pub sec_type: u32,
    pub flags: u64,
    pub virt_addr: u64,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub info: u32,
    pub addr_align: u64,
    pub entry_size: u64,
}

impl Record for SectionHdr {
    fn swap(self, order: ByteOrder) -> Self {
        Self {
            name_offset: order.swap32(self.name_offset),
            sec_type: order.swap32(self.sec_type),
            flags: order.swap64(self.flags),
            virt_addr: order.swap64(self.virt_addr),
            offset: order.swap64(self.offset),
            size: order.swap64(self.size),
            link: order.swap32(self.link),
            info: order.swap32(self.info),
            addr_align: order.swap64(self.addr_align),
            entry_size: order.swap64(self.entry_size),
        }
    }
}

/// Program header. Equivalent to `Elf64_Phdr` in `elf.h`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
#[allow(missing_docs)]
pub struct ProgramHdr {
    pub seg_type: u32,
    pub flags: u32,
    pub offset: u64,
    pub virt_addr: u64,
    pub phys_addr: u64,
    pub file_size: u64,
    pub mem_size: u64,
    pub align: u64,
}

impl Record for ProgramHdr {
    fn swap(self, order: ByteOrder) -> Self {
        Self {
            seg_type: order.swap32(self.seg_type),
            flags: order.swap32(self.flags),
            offset: order.swap64(self.offset),
            virt_addr: order.swap64(self.virt_addr),
            phys_addr: order.swap64(self.phys_addr),
            file_size: order.swap64(self.file_size),
            mem_size: order.swap64(self.mem_size),
            align: order.swap64(self.align),
        }
    }
}

/// Symbol table entry. Equivalent to `Elf64_Sym` in `elf.h`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
#[allow(missing_docs)]
pub struct Sym {
    pub name_offset: u32,
    pub info: u8,
    pub other: u8,
    pub shndx: u16,
    pub value: u64,
    pub size: u64,
}

impl Record for Sym {
    fn swap(self, order: ByteOrder) -> Self {
        Self {
            name_offset: order.swap32(self.name_offset),
            info: self.info,
            other: self.other,
            shndx: order.swap16(self.shndx),
            value: order.swap64(self.value),
            size: order.swap64(self.size),
        }
    }
}

#[cfg(test)]
mod tests {
    use memoffset::offset_of;

    use super::*;

    #[test]
    fn record_sizes() {
        assert_eq!(mem::size_of::<FileIdent>(), EI_NIDENT);
        assert_eq!(FILE_HDR_SIZE, 64);
        assert_eq!(PROGRAM_HDR_SIZE, 56);
        assert_eq!(SECTION_HDR_SIZE, 64);
        assert_eq!(SYM_SIZE, 24);
    }

    #[test]
    fn field_offsets() {
        assert_eq!(offset_of!(FileHdr, filety), 16);
        assert_eq!(offset_of!(FileHdr, entry_addr), 24);
        assert_eq!(offset_of!(FileHdr, prog_hdr_offset), 32);
        assert_eq!(offset_of!(FileHdr, sec_hdr_offset), 40);
        assert_eq!(offset_of!(FileHdr, hdr_size), 52);
        assert_eq!(offset_of!(FileHdr, prog_hdr_count), 56);
        assert_eq!(offset_of!(FileHdr, sec_strtab_index), 62);

        assert_eq!(offset_of!(ProgramHdr, offset), 8);
        assert_eq!(offset_of!(ProgramHdr, file_size), 32);
        assert_eq!(offset_of!(ProgramHdr, align), 48);

        assert_eq!(offset_of!(SectionHdr, link), 40);
        assert_eq!(offset_of!(SectionHdr, entry_size), 56);

        assert_eq!(offset_of!(Sym, info), 4);
        assert_eq!(offset_of!(Sym, shndx), 6);
        assert_eq!(offset_of!(Sym, value), 8);
    }

    #[test]
    fn big_endian_symbol() {
        let bytes = [
            0x00, 0x00, 0x00, 0x2a, // name
            0x12, // info
            0x02, // other
            0x00, 0x05, // shndx
            0x00, 0x00, 0x00, 0x00, 0x00, 0x40, 0x10, 0x00, // value
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, // size
        ];
        let sym = Sym::read(&bytes, ByteOrder::Big).unwrap();
        assert_eq!(sym.name_offset, 42);
        assert_eq!(sym.info, 0x12);
        assert_eq!(sym.other, 2);
        assert_eq!(sym.shndx, 5);
        assert_eq!(sym.value, 0x40_1000);
        assert_eq!(sym.size, 16);

        let mut out = Vec::new();
        sym.write(ByteOrder::Big, &mut out);
        assert_eq!(out, bytes);
    }

    #[test]
    fn short_input_is_rejected() {
        assert!(ProgramHdr::read(&[0; PROGRAM_HDR_SIZE - 1], ByteOrder::Little).is_none());
        assert!(ProgramHdr::read(&[0; PROGRAM_HDR_SIZE + 8], ByteOrder::Little).is_some());
    }
}
