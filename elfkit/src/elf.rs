//! This module contains the in-memory model of an ELF64 file. The
//! structures contained in this file are intended to be consumed
//! idiomatically, and keep the fields of the on-disk records. Two
//! things are not kept: flag bits outside the named flags and masks
//! are dropped, and the identifier padding is written back as zeroes.
//!
//! Values outside the enumerations known here are preserved in an
//! `Other` variant rather than rejected, since real toolchains emit
//! plenty of OS- and processor-specific types.
//!
//! # References
//!
//! - [ELF-64 Object File Format v1.5 Draft
//! 2](https://uclibc.org/docs/elf-64-gen.pdf).
//! - [System V ABI, chapter 4](https://www.sco.com/developers/gabi/latest/ch4.intro.html).

use bitflags::bitflags;
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};

pub mod raw;

/// Byte order of every multi-byte field in a file, taken from the
/// data encoding byte of the identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ByteOrder {
    /// Two's complement, least significant byte first.
    Little = 1,
    /// Two's complement, most significant byte first.
    Big = 2,
}

impl ByteOrder {
    /// Swap `value` between this byte order and native order.
    #[inline]
    pub fn swap16(self, value: u16) -> u16 {
        match self {
            Self::Little => u16::from_le(value),
            Self::Big => u16::from_be(value),
        }
    }

    /// Swap `value` between this byte order and native order.
    #[inline]
    pub fn swap32(self, value: u32) -> u32 {
        match self {
            Self::Little => u32::from_le(value),
            Self::Big => u32::from_be(value),
        }
    }

    /// Swap `value` between this byte order and native order.
    #[inline]
    pub fn swap64(self, value: u64) -> u64 {
        match self {
            Self::Little => u64::from_le(value),
            Self::Big => u64::from_be(value),
        }
    }
}

/// Word size of a file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Class {
    /// Invalid class.
    None = 0,
    /// 32-bit objects.
    Elf32 = 1,
    /// 64-bit objects.
    Elf64 = 2,
    /// Unknown class, value copied literally.
    #[num_enum(catch_all)]
    Other(u8),
}

/// The identifier at the very start of every ELF file, minus the
/// magic number, which is checked during parsing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    /// Word size. Always [`Class::Elf64`] for a parsed file.
    pub class: Class,
    /// Byte order of the rest of the file.
    pub data: ByteOrder,
    /// Identifier version, normally [`raw::EV_CURRENT`].
    pub version: u8,
    /// Operating system and ABI the file targets.
    pub osabi: u8,
    /// ABI version.
    pub abi_version: u8,
}

/// What type of ELF file is this?
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum FileType {
    /// Unknown file type.
    None = 0,
    /// Relocatable file.
    Rel = 1,
    /// Executable file.
    Exec = 2,
    /// Shared object.
    Dyn = 3,
    /// Core dump file.
    Core = 4,
    /// OS- or processor-specific type, value copied literally.
    #[num_enum(catch_all)]
    Other(u16),
}

/// The ELF file header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// File identifier.
    pub ident: Ident,
    /// What type of ELF file is this?
    pub filety: FileType,
    /// Instruction set the file targets, e.g. [`raw::EM_X86_64`].
    pub machine: u16,
    /// Object file version.
    pub version: u32,
    /// Virtual address execution starts at, or zero.
    pub entry_addr: u64,
    /// File offset of the program header table.
    pub prog_hdr_offset: u64,
    /// File offset of the section header table.
    pub sec_hdr_offset: u64,
    /// Processor-specific flags.
    pub flags: u32,
    /// Size of this header in bytes.
    pub hdr_size: u16,
    /// Size of one program header table entry.
    pub prog_hdr_size: u16,
    /// Number of program header table entries.
    pub prog_hdr_count: u16,
    /// Size of one section header table entry.
    pub sec_hdr_size: u16,
    /// Number of section header table entries.
    pub sec_hdr_count: u16,
    /// Index of the section holding section names, or
    /// [`raw::SHN_UNDEF`] if there is none.
    pub sec_strtab_index: u16,
}

impl Header {
    /// Build a header from a native-order raw header whose identifier
    /// has already been validated to use `data`.
    pub fn from_raw(hdr: &raw::FileHdr, data: ByteOrder) -> Self {
        Self {
            ident: Ident {
                class: Class::from(hdr.ident.class),
                data,
                version: hdr.ident.version,
                osabi: hdr.ident.osabi,
                abi_version: hdr.ident.abi_version,
            },
            filety: FileType::from(hdr.filety),
            machine: hdr.machine,
            version: hdr.version,
            entry_addr: hdr.entry_addr,
            prog_hdr_offset: hdr.prog_hdr_offset,
            sec_hdr_offset: hdr.sec_hdr_offset,
            flags: hdr.flags,
            hdr_size: hdr.hdr_size,
            prog_hdr_size: hdr.prog_hdr_size,
            prog_hdr_count: hdr.prog_hdr_count,
            sec_hdr_size: hdr.sec_hdr_size,
            sec_hdr_count: hdr.sec_hdr_count,
            sec_strtab_index: hdr.sec_strtab_index,
        }
    }

    /// Convert this header back into a native-order raw header.
    pub fn to_raw(&self) -> raw::FileHdr {
        raw::FileHdr {
            ident: raw::FileIdent {
                magic: raw::MAGIC,
                class: self.ident.class.into(),
                data: self.ident.data.into(),
                version: self.ident.version,
                osabi: self.ident.osabi,
                abi_version: self.ident.abi_version,
                pad: [0; 7],
            },
            filety: self.filety.into(),
            machine: self.machine,
            version: self.version,
            entry_addr: self.entry_addr,
            prog_hdr_offset: self.prog_hdr_offset,
            sec_hdr_offset: self.sec_hdr_offset,
            flags: self.flags,
            hdr_size: self.hdr_size,
            prog_hdr_size: self.prog_hdr_size,
            prog_hdr_count: self.prog_hdr_count,
            sec_hdr_size: self.sec_hdr_size,
            sec_hdr_count: self.sec_hdr_count,
            sec_strtab_index: self.sec_strtab_index,
        }
    }
}

/// What type of segment is this?
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum SegmentType {
    /// Undefined.
    Null = 0,
    /// Loadable segment, mapped into memory.
    Load = 1,
    /// Dynamic linking information.
    Dynamic = 2,
    /// Specifies the location and size to a null-terminated path of a
    /// dynamic interpreter.
    Interp = 3,
    /// Specifies the location of notes.
    Note = 4,
    /// Reserved.
    Shlib = 5,
    /// Specifies the location and size of the program header table.
    Phdr = 6,
    /// Thread-local storage template.
    Tls = 7,
    /// Location of `.eh_frame_hdr`.
    GnuEhFrame = 0x6474_e550,
    /// Stack executability. Carries no data.
    GnuStack = 0x6474_e551,
    /// Region made read-only after relocation.
    GnuRelro = 0x6474_e552,
    /// Location of `.note.gnu.property`.
    GnuProperty = 0x6474_e553,
    /// Any other type, value copied literally.
    #[num_enum(catch_all)]
    Other(u32),
}

impl SegmentType {
    /// Is this type in the range reserved for processor-specific
    /// semantics?
    pub fn is_processor_specific(self) -> bool {
        (0x7000_0000..=0x7fff_ffff).contains(&u32::from(self))
    }
}

#[rustfmt::skip]
bitflags! {
    /// Flags for segments.
    pub struct SegmentFlags: u32 {
        /// Executable
        const EXEC = 1;
        /// Writable
        const WRITE = 2;
        /// Readable
        const READ = 4;
        /// All bits in this mask are reserved for OS-specific
        /// semantics.
        const MASK_OS = 0x0FF0_0000;
        /// All bits in this mask are reserved for processor-specific
        /// semantics.
        const MASK_PROC = 0xF000_0000;
    }
}

/// An ELF segment, representing a runtime memory region. Equivalent
/// to one program header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// What type of segment is this?
    pub seg_type: SegmentType,
    /// Flags related to segments, typically a subset of the typical
    /// RWX.
    pub flags: SegmentFlags,
    /// Offset of this segment in the file.
    pub offset: u64,
    /// Virtual address of this segment.
    pub virt_addr: u64,
    /// Physical address of this segment. Unused on most platforms.
    pub phys_addr: u64,
    /// Size of this segment in the file.
    pub file_size: u64,
    /// Size of this segment at runtime. The difference, if any,
    /// between `mem_size` and [`Self::file_size`] is filled with
    /// zeroes.
    pub mem_size: u64,
    /// Alignment of this segment. Zero and one are both equivalent to
    /// no alignment constraints.
    pub align: u64,
}

impl From<raw::ProgramHdr> for Segment {
    fn from(hdr: raw::ProgramHdr) -> Self {
        Self {
            seg_type: SegmentType::from(hdr.seg_type),
            flags: SegmentFlags::from_bits_truncate(hdr.flags),
            offset: hdr.offset,
            virt_addr: hdr.virt_addr,
            phys_addr: hdr.phys_addr,
            file_size: hdr.file_size,
            mem_size: hdr.mem_size,
            align: hdr.align,
        }
    }
}

impl From<Segment> for raw::ProgramHdr {
    fn from(seg: Segment) -> Self {
        Self {
            seg_type: seg.seg_type.into(),
            flags: seg.flags.bits(),
            offset: seg.offset,
            virt_addr: seg.virt_addr,
            phys_addr: seg.phys_addr,
            file_size: seg.file_size,
            mem_size: seg.mem_size,
            align: seg.align,
        }
    }
}

/// What type of section is this?
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum SectionType {
    /// Inactive.
    Null = 0,
    /// Program data; the interpretation depends on the type of file.
    ProgBits = 1,
    /// Symbol table.
    SymTab = 2,
    /// String table.
    StrTab = 3,
    /// Relocation entries with addends.
    Rela = 4,
    /// Symbol hash table for dynamic linking.
    Hash = 5,
    /// Information for dynamic linking.
    Dynamic = 6,
    /// Notes.
    Note = 7,
    /// Occupies no space in the file, but is otherwise equivalent to
    /// [`Self::ProgBits`].
    NoBits = 8,
    /// Relocation entries without addends.
    Rel = 9,
    /// Reserved.
    ShLib = 10,
    /// Dynamic linking symbols.
    DynSym = 11,
    /// Array of constructors.
    InitArray = 14,
    /// Array of destructors.
    FiniArray = 15,
    /// Array of pre-constructors.
    PreinitArray = 16,
    /// Section group.
    Group = 17,
    /// Extended section indices for a symbol table.
    SymTabShndx = 18,
    /// Any other type, value copied literally.
    #[num_enum(catch_all)]
    Other(u32),
}

impl SectionType {
    /// Is this type in the range reserved for OS-specific semantics?
    pub fn is_os_specific(self) -> bool {
        (0x6000_0000..=0x6fff_ffff).contains(&u32::from(self))
    }

    /// Is this type in the range reserved for processor-specific
    /// semantics?
    pub fn is_processor_specific(self) -> bool {
        (0x7000_0000..=0x7fff_ffff).contains(&u32::from(self))
    }

    /// Is this type in the range reserved for applications?
    pub fn is_user(self) -> bool {
        u32::from(self) >= 0x8000_0000
    }
}

#[rustfmt::skip]
bitflags! {
    /// Section flags.
    pub struct SectionFlags: u64 {
        /// Writable at runtime.
        const WRITE = 0x1;
        /// Occupies memory during runtime.
        const ALLOC = 0x2;
        /// Contains executable instructions.
        const EXEC_INSTR = 0x4;
        /// Might be merged.
        const MERGE = 0x10;
        /// Contains null-terminated strings.
        const STRINGS = 0x20;
        /// `info` holds a section index.
        const INFO_LINK = 0x40;
        /// Preserve order after combining.
        const LINK_ORDER = 0x80;
        /// Needs OS-specific handling.
        const OS_NONCONFORMING = 0x100;
        /// Member of a section group.
        const GROUP = 0x200;
        /// Holds thread-local data.
        const TLS = 0x400;
        /// Holds compressed data.
        const COMPRESSED = 0x800;
        /// All bits in this mask are reserved for OS-specific
        /// semantics.
        const MASK_OS = 0x0FF0_0000;
        /// All bits in this mask are reserved for processor-specific
        /// semantics.
        const MASK_PROC = 0xF000_0000;
    }
}

/// An ELF section. Equivalent to one section header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Section {
    /// Offset of this section's name in the section name string
    /// table.
    pub name_offset: u32,
    /// What type of section is this?
    pub sec_type: SectionType,
    /// Flags relating to this section.
    pub flags: SectionFlags,
    /// The virtual address of this section.
    pub virt_addr: u64,
    /// The offset of this section into the file.
    pub offset: u64,
    /// The size of this section in bytes. A [`SectionType::NoBits`]
    /// section takes up no space in the file, whatever its size.
    pub size: u64,
    /// The interpretation of `link` depends on the section type. For
    /// symbol tables it is the index of the associated string table.
    pub link: u32,
    /// The interpretation of `info` depends on the section type.
    pub info: u32,
    /// The alignment of this section. Zero and one both refer to no
    /// alignment.
    pub addr_align: u64,
    /// For fixed-size entry tables, this contains the size in bytes
    /// of each entry.
    pub ent_size: u64,
}

impl From<raw::SectionHdr> for Section {
    fn from(hdr: raw::SectionHdr) -> Self {
        Self {
            name_offset: hdr.name_offset,
            sec_type: SectionType::from(hdr.sec_type),
            flags: SectionFlags::from_bits_truncate(hdr.flags),
            virt_addr: hdr.virt_addr,
            offset: hdr.offset,
            size: hdr.size,
            link: hdr.link,
            info: hdr.info,
            addr_align: hdr.addr_align,
            ent_size: hdr.entry_size,
        }
    }
}

impl From<Section> for raw::SectionHdr {
    fn from(sec: Section) -> Self {
        Self {
            name_offset: sec.name_offset,
            sec_type: sec.sec_type.into(),
            flags: sec.flags.bits(),
            virt_addr: sec.virt_addr,
            offset: sec.offset,
            size: sec.size,
            link: sec.link,
            info: sec.info,
            addr_align: sec.addr_align,
            entry_size: sec.ent_size,
        }
    }
}

/// Symbol binding, the upper four bits of a symbol's `info` byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SymbolBinding {
    /// Not visible outside the object file.
    Local = 0,
    /// Visible to all object files.
    Global = 1,
    /// Like [`Self::Global`], with lower precedence.
    Weak = 2,
    /// OS- or processor-specific binding, value copied literally.
    #[num_enum(catch_all)]
    Other(u8),
}

impl SymbolBinding {
    /// Is this binding reserved for OS-specific semantics?
    pub fn is_os_specific(self) -> bool {
        (10..=12).contains(&u8::from(self))
    }

    /// Is this binding reserved for processor-specific semantics?
    pub fn is_processor_specific(self) -> bool {
        (13..=15).contains(&u8::from(self))
    }
}

/// Symbol type, the lower four bits of a symbol's `info` byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SymbolType {
    /// Not specified.
    NoType = 0,
    /// Data object, e.g. a variable.
    Object = 1,
    /// Function or other executable code.
    Func = 2,
    /// A section, mostly used for relocations.
    Section = 3,
    /// Source file name.
    File = 4,
    /// Uninitialized common block.
    Common = 5,
    /// Thread-local storage entity.
    Tls = 6,
    /// OS- or processor-specific type, value copied literally.
    #[num_enum(catch_all)]
    Other(u8),
}

impl SymbolType {
    /// Is this type reserved for OS-specific semantics?
    pub fn is_os_specific(self) -> bool {
        (10..=12).contains(&u8::from(self))
    }

    /// Is this type reserved for processor-specific semantics?
    pub fn is_processor_specific(self) -> bool {
        (13..=15).contains(&u8::from(self))
    }
}

/// Symbol visibility, the lower two bits of a symbol's `other` byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum Visibility {
    /// Visibility follows the binding.
    Default = 0,
    /// Processor-specific hidden class.
    Internal = 1,
    /// Not visible to other components.
    Hidden = 2,
    /// Visible, but not preemptible.
    Protected = 3,
}

impl Visibility {
    /// Extract the visibility from a symbol's `other` byte.
    pub fn from_other(other: u8) -> Self {
        match other & 0x3 {
            0 => Self::Default,
            1 => Self::Internal,
            2 => Self::Hidden,
            _ => Self::Protected,
        }
    }
}

/// Pack a binding and a type into a symbol's `info` byte.
pub fn symbol_info(binding: SymbolBinding, sym_type: SymbolType) -> u8 {
    (u8::from(binding) << 4) | (u8::from(sym_type) & 0xf)
}

/// Where a symbol is defined, decoded from its section index.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SectionRef {
    /// Undefined; to be resolved by the linker.
    Undefined,
    /// Absolute value, unaffected by relocation.
    Absolute,
    /// Unallocated common block.
    Common,
    /// Some other index in the reserved range, value copied
    /// literally.
    Reserved(u16),
    /// Index into the section header table.
    Index(u16),
}

/// An entry in a symbol table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    /// Offset of this symbol's name in the string table linked from
    /// the symbol table, or zero if it has no name.
    pub name_offset: u32,
    /// Binding and type, see [`Self::binding`] and
    /// [`Self::sym_type`].
    pub info: u8,
    /// Visibility, see [`Self::visibility`].
    pub other: u8,
    /// Index of the section this symbol is defined in.
    pub shndx: u16,
    /// Virtual address in executables and shared objects, offset into
    /// the defining section in relocatable files.
    pub value: u64,
    /// Size of the associated object in bytes, or zero if unknown.
    pub size: u64,
}

impl Symbol {
    /// The binding packed in [`Self::info`].
    pub fn binding(&self) -> SymbolBinding {
        SymbolBinding::from(self.info >> 4)
    }

    /// The type packed in [`Self::info`].
    pub fn sym_type(&self) -> SymbolType {
        SymbolType::from(self.info & 0xf)
    }

    /// The visibility packed in [`Self::other`].
    pub fn visibility(&self) -> Visibility {
        Visibility::from_other(self.other)
    }

    /// Classify [`Self::shndx`].
    pub fn section(&self) -> SectionRef {
        match self.shndx {
            raw::SHN_UNDEF => SectionRef::Undefined,
            raw::SHN_ABS => SectionRef::Absolute,
            raw::SHN_COMMON => SectionRef::Common,
            idx if idx >= raw::SHN_LORESERVE => SectionRef::Reserved(idx),
            idx => SectionRef::Index(idx),
        }
    }
}

impl From<raw::Sym> for Symbol {
    fn from(sym: raw::Sym) -> Self {
        Self {
            name_offset: sym.name_offset,
            info: sym.info,
            other: sym.other,
            shndx: sym.shndx,
            value: sym.value,
            size: sym.size,
        }
    }
}

impl From<Symbol> for raw::Sym {
    fn from(sym: Symbol) -> Self {
        Self {
            name_offset: sym.name_offset,
            info: sym.info,
            other: sym.other,
            shndx: sym.shndx,
            value: sym.value,
            size: sym.size,
        }
    }
}

/// A parsed ELF file: the header plus both header tables, in file
/// order. Built in one go by [`Elf::parse`] and never modified
/// afterwards.
///
/// The offsets stored here only mean something together with the
/// bytes the file was parsed from; see [`crate::read::Reader`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Elf {
    header: Header,
    segments: Vec<Segment>,
    sections: Vec<Section>,
}

impl Elf {
    pub(crate) fn new(header: Header, segments: Vec<Segment>, sections: Vec<Section>) -> Self {
        Self {
            header,
            segments,
            sections,
        }
    }

    /// The file header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Program headers, in file order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Section headers, in file order. Indices into this slice are
    /// what symbols and `link` fields refer to.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Byte order of the file.
    pub fn byte_order(&self) -> ByteOrder {
        self.header.ident.data
    }
}
