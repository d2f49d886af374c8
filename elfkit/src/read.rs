//! Parsing ELF64 files from a byte buffer, and looking things up in
//! them afterwards.
//!
//! [`Elf::parse`] decodes the header and both header tables in one go.
//! Everything else (names, string tables, symbols) is decoded on
//! demand by a [`Reader`], which pairs the parsed [`Elf`] with the
//! bytes it came from. Nothing is cached; every lookup goes back to
//! the buffer.

use std::borrow::Cow;

use log::trace;

use crate::elf::raw::{self, Record};
use crate::elf::{ByteOrder, Elf, Header, Section, SectionType, Segment, Symbol};
use crate::Error;

impl Elf {
    /// Parse the header, program headers and section headers of an
    /// ELF64 file.
    ///
    /// # Errors
    ///
    /// This will return an error if the identifier is not that of a
    /// 64-bit ELF file with a known byte order, or if the header or
    /// any entry of either header table extends past the end of
    /// `data`.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let ident_bytes = data.get(..raw::EI_NIDENT).ok_or(Error::TruncatedHeader)?;
        let ident = bytemuck::pod_read_unaligned::<raw::FileIdent>(ident_bytes);

        if ident.class != raw::ELFCLASS64 {
            return Err(Error::UnsupportedClass(ident.class));
        }
        let order = ByteOrder::try_from(ident.data)
            .map_err(|_| Error::UnknownDataEncoding(ident.data))?;
        if ident.magic != raw::MAGIC {
            return Err(Error::BadMagic(ident.magic));
        }

        let file_hdr = raw::FileHdr::read(data, order).ok_or(Error::TruncatedHeader)?;
        let header = Header::from_raw(&file_hdr, order);
        trace!(
            "{:?} file, {:?} endian, {} segments at {:#x}, {} sections at {:#x}",
            header.filety,
            order,
            header.prog_hdr_count,
            header.prog_hdr_offset,
            header.sec_hdr_count,
            header.sec_hdr_offset
        );

        let segments = (0..header.prog_hdr_count)
            .map(|i| {
                table_entry(data, header.prog_hdr_offset, header.prog_hdr_size, i)
                    .and_then(|bytes| raw::ProgramHdr::read(bytes, order))
                    .map(Segment::from)
                    .ok_or(Error::TruncatedProgramHeader(i))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let sections = (0..header.sec_hdr_count)
            .map(|i| {
                table_entry(data, header.sec_hdr_offset, header.sec_hdr_size, i)
                    .and_then(|bytes| raw::SectionHdr::read(bytes, order))
                    .map(Section::from)
                    .ok_or(Error::TruncatedSectionHeader(i))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(header, segments, sections))
    }
}

/// The bytes of entry `index` of a header table, or `None` if they
/// are not all inside `data`.
fn table_entry(data: &[u8], table_offset: u64, entry_size: u16, index: u16) -> Option<&[u8]> {
    let start = u64::from(index)
        .checked_mul(u64::from(entry_size))?
        .checked_add(table_offset)?;
    let end = start.checked_add(u64::from(entry_size))?;
    data.get(usize::try_from(start).ok()?..usize::try_from(end).ok()?)
}

/// Lookups over a parsed [`Elf`] and the buffer it was parsed from.
///
/// The reader only borrows both. The buffer must be the one the file
/// was parsed from, as every offset in the [`Elf`] is relative to it.
#[derive(Copy, Clone, Debug)]
pub struct Reader<'a> {
    elf: &'a Elf,
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    /// Create a reader over `elf`, which was parsed from `data`.
    pub fn new(elf: &'a Elf, data: &'a [u8]) -> Self {
        Self { elf, data }
    }

    /// The parsed file.
    pub fn elf(&self) -> &'a Elf {
        self.elf
    }

    /// The raw bytes of the file.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The section header at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] if there is no such section.
    pub fn section(&self, index: usize) -> Result<&'a Section, Error> {
        self.elf
            .sections()
            .get(index)
            .ok_or(Error::InvalidIndex(index))
    }

    fn section_of_type(&self, index: usize, types: &[SectionType]) -> Result<&'a Section, Error> {
        let section = self.section(index)?;
        if types.contains(&section.sec_type) {
            Ok(section)
        } else {
            Err(Error::WrongSectionType {
                index,
                found: section.sec_type,
            })
        }
    }

    /// The bytes a section occupies in the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OffsetOutOfBounds`] if the section extends past
    /// the end of the buffer.
    pub fn section_data(&self, section: &Section) -> Result<&'a [u8], Error> {
        let end = section
            .offset
            .checked_add(section.size)
            .ok_or(Error::OffsetOutOfBounds(section.offset))?;
        usize::try_from(section.offset)
            .ok()
            .zip(usize::try_from(end).ok())
            .and_then(|(start, end)| self.data.get(start..end))
            .ok_or(Error::OffsetOutOfBounds(end))
    }

    /// Read the null-terminated string at byte `offset` of string
    /// table `section`.
    ///
    /// The string may run past the end of the section; only the end
    /// of the buffer bounds it.
    ///
    /// # Errors
    ///
    /// This will return an error if `section` does not exist or is not
    /// a string table, if the offset lies outside the buffer, or if no
    /// null byte follows it.
    pub fn string(&self, section: usize, offset: u32) -> Result<Cow<'a, str>, Error> {
        let strtab = self.section_of_type(section, &[SectionType::StrTab])?;
        let start = strtab
            .offset
            .checked_add(u64::from(offset))
            .ok_or(Error::OffsetOutOfBounds(strtab.offset))?;
        let rest = usize::try_from(start)
            .ok()
            .and_then(|start| self.data.get(start..))
            .filter(|rest| !rest.is_empty())
            .ok_or(Error::OffsetOutOfBounds(start))?;
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::MalformedStringTable(section))?;
        Ok(String::from_utf8_lossy(&rest[..len]))
    }

    /// Decode every string in string table `section`, in order.
    ///
    /// The table must start and end with a null byte. Adjacent null
    /// bytes give empty strings. A table that is a single null byte
    /// holds no strings.
    ///
    /// # Errors
    ///
    /// This will return an error if `section` does not exist, is not a
    /// string table, lies outside the buffer or is missing either of
    /// its null bytes.
    pub fn string_table(&self, section: usize) -> Result<Vec<Cow<'a, str>>, Error> {
        let strtab = self.section_of_type(section, &[SectionType::StrTab])?;
        let bytes = self.section_data(strtab)?;
        if bytes == b"\0" {
            return Ok(Vec::new());
        }
        let inner = bytes
            .strip_prefix(b"\0")
            .and_then(|bytes| bytes.strip_suffix(b"\0"))
            .ok_or(Error::MalformedStringTable(section))?;
        Ok(inner.split(|&b| b == 0).map(String::from_utf8_lossy).collect())
    }

    /// The name of section `index`. Empty if the file has no section
    /// name string table.
    ///
    /// # Errors
    ///
    /// This will return an error if `index` is out of range, or if the
    /// name cannot be read from the section name string table.
    pub fn section_name(&self, index: usize) -> Result<Cow<'a, str>, Error> {
        let section = self.section(index)?;
        match self.elf.header().sec_strtab_index {
            raw::SHN_UNDEF => Ok(Cow::Borrowed("")),
            strtab => self.string(usize::from(strtab), section.name_offset),
        }
    }

    /// Index of the first section called `name`. Sections whose name
    /// cannot be read, or is empty, never match.
    pub fn section_index_by_name(&self, name: &str) -> Option<usize> {
        (0..self.elf.sections().len()).find(|&index| {
            matches!(self.section_name(index), Ok(found) if !found.is_empty() && found == name)
        })
    }

    /// Like [`Self::section_index_by_name`], but a miss is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no section is called `name`.
    pub fn find_section(&self, name: &str) -> Result<usize, Error> {
        self.section_index_by_name(name)
            .ok_or_else(|| Error::NotFound(name.to_owned()))
    }

    /// Decode every entry of symbol table `section`.
    ///
    /// # Errors
    ///
    /// This will return an error if `section` does not exist, is not a
    /// symbol table, has an entry size too small for a symbol, or lies
    /// outside the buffer.
    pub fn symbol_table(&self, section: usize) -> Result<Vec<Symbol>, Error> {
        let symtab = self.section_of_type(section, &[SectionType::SymTab, SectionType::DynSym])?;
        let bad_entry_size = Error::BadEntrySize {
            index: section,
            entry_size: symtab.ent_size,
        };
        let stride = usize::try_from(symtab.ent_size)
            .ok()
            .filter(|&stride| stride >= raw::SYM_SIZE)
            .ok_or_else(|| bad_entry_size.clone())?;
        let bytes = self.section_data(symtab)?;
        let order = self.elf.byte_order();

        trace!(
            "symbol table {} holds {} entries of {} bytes",
            section,
            bytes.len() / stride,
            stride
        );

        bytes
            .chunks_exact(stride)
            .map(|entry| raw::Sym::read(entry, order).map(Symbol::from))
            .collect::<Option<Vec<_>>>()
            .ok_or(bad_entry_size)
    }

    /// Decode the `.symtab` section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no `.symtab`, or any
    /// error of [`Self::symbol_table`].
    pub fn symbols(&self) -> Result<Vec<Symbol>, Error> {
        self.symbol_table(self.find_section(".symtab")?)
    }

    /// Decode the `.dynsym` section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no `.dynsym`, or any
    /// error of [`Self::symbol_table`].
    pub fn dynamic_symbols(&self) -> Result<Vec<Symbol>, Error> {
        self.symbol_table(self.find_section(".dynsym")?)
    }

    /// The name of `symbol`, which belongs to symbol table `section`,
    /// read from the string table that section links to.
    ///
    /// # Errors
    ///
    /// This will return an error if `section` is not a symbol table,
    /// or any error of [`Self::string`].
    pub fn symbol_name(&self, section: usize, symbol: &Symbol) -> Result<Cow<'a, str>, Error> {
        let symtab = self.section_of_type(section, &[SectionType::SymTab, SectionType::DynSym])?;
        self.string(symtab.link as usize, symbol.name_offset)
    }
}
