//! Errors returned while parsing a file or looking things up in it.

use thiserror::Error;

use crate::elf::SectionType;

/// Everything that can go wrong while reading an ELF file. None of
/// these are fatal; the caller decides what to do about them.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// The file is not a 64-bit ELF file.
    #[error("unsupported ELF class {0}, only 64-bit files are supported")]
    UnsupportedClass(u8),
    /// The data encoding byte is neither little nor big endian.
    #[error("unknown data encoding {0:#x}")]
    UnknownDataEncoding(u8),
    /// The file does not start with `\x7fELF`.
    #[error("bad magic number {0:02x?}")]
    BadMagic([u8; 4]),
    /// The buffer is too short to hold the file header.
    #[error("file header is truncated")]
    TruncatedHeader,
    /// Program header `n` lies (partly) outside the buffer.
    #[error("program header {0} is truncated")]
    TruncatedProgramHeader(u16),
    /// Section header `n` lies (partly) outside the buffer.
    #[error("section header {0} is truncated")]
    TruncatedSectionHeader(u16),
    /// A section index is out of range of the section header table.
    #[error("section index {0} is out of range")]
    InvalidIndex(usize),
    /// A section is not of the type the operation needs.
    #[error("section {index} has the wrong type {found:?}")]
    WrongSectionType {
        /// Index of the offending section.
        index: usize,
        /// The type it actually has.
        found: SectionType,
    },
    /// A string table does not start and end with a null byte, or a
    /// string in it is not terminated.
    #[error("string table in section {0} is malformed")]
    MalformedStringTable(usize),
    /// A computed file offset lies outside the buffer.
    #[error("offset {0:#x} is out of bounds")]
    OffsetOutOfBounds(u64),
    /// A symbol table's entry size is zero or too small to hold a
    /// symbol.
    #[error("section {index} has unusable entry size {entry_size}")]
    BadEntrySize {
        /// Index of the offending section.
        index: usize,
        /// The entry size it declares.
        entry_size: u64,
    },
    /// No section has the requested name.
    #[error("no section named {0:?}")]
    NotFound(String),
}
