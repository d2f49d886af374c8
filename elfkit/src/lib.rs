//! # ELF toolkit (`elfkit`)
//!
//! `elfkit` reads and writes ELF64 files. It is deliberately small:
//!
//! - [`elf`] holds the in-memory model of a file (header, segments,
//!   sections, symbols) and, in [`elf::raw`], the on-disk records.
//! - [`read`] parses a byte buffer into an [`Elf`] and offers lookups
//!   of section names, string tables and symbol tables through a
//!   [`Reader`].
//! - [`write`] synthesizes a minimal single-segment x86-64 Linux
//!   executable from a blob of machine code.
//!
//! Both byte orders are read; only little-endian files are written.
//! 32-bit files, relocations and dynamic linking are not supported.
//!
//! ```
//! use elfkit::{write, Elf};
//!
//! // mov $60, %rax; mov $33, %rdi; syscall
//! let code = [
//!     0x48, 0xc7, 0xc0, 0x3c, 0x00, 0x00, 0x00,
//!     0x48, 0xc7, 0xc7, 0x21, 0x00, 0x00, 0x00,
//!     0x0f, 0x05,
//! ];
//! let bytes = write::synthesize(0x40_1000, 0x40_1000, &code);
//! let elf = Elf::parse(&bytes).unwrap();
//! assert_eq!(elf.header().entry_addr, 0x40_1000);
//! assert_eq!(elf.segments()[0].file_size, code.len() as u64);
//! ```

#![warn(clippy::pedantic, missing_docs)]
#![allow(
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::module_name_repetitions
)]

pub mod elf;
mod error;
pub mod read;
pub mod write;

pub use self::elf::Elf;
pub use self::error::Error;
pub use self::read::Reader;
