//! Human-readable listing of everything [`Reader`] can decode.

use std::{fmt::Debug, io};

use elfkit::{
    elf::{
        FileType, Header, Section, SectionType, Segment, SegmentType, Symbol, SymbolBinding,
        SymbolType,
    },
    Reader,
};
use log::warn;

/// Write the header, program headers and section headers of the file
/// behind `reader` to `out`, along with the contents of string and
/// symbol tables.
///
/// A table that fails to decode is reported inline and the listing
/// carries on with the next section.
pub fn print(reader: &Reader<'_>, out: &mut impl io::Write) -> io::Result<()> {
    let elf = reader.elf();

    print_header(elf.header(), out)?;

    writeln!(out, "program headers: {}", elf.segments().len())?;
    for (index, segment) in elf.segments().iter().enumerate() {
        writeln!(out, "index: {index}")?;
        print_segment(segment, out)?;
    }
    writeln!(out)?;

    writeln!(out, "section headers: {}", elf.sections().len())?;
    for (index, section) in elf.sections().iter().enumerate() {
        writeln!(out, "index: {index}")?;
        match reader.section_name(index) {
            Ok(name) if name.is_empty() => {}
            Ok(name) => writeln!(out, "name: {name}")?,
            Err(err) => report(out, index, &err)?,
        }
        print_section(reader, index, section, out)?;
    }

    Ok(())
}

fn print_header(header: &Header, out: &mut impl io::Write) -> io::Result<()> {
    let ident = &header.ident;
    writeln!(out, "class: {:?}", ident.class)?;
    writeln!(out, "data: {:?}", ident.data)?;
    writeln!(out, "ident version: {}", ident.version)?;
    writeln!(out, "os abi: {}", ident.osabi)?;
    writeln!(out, "abi version: {}", ident.abi_version)?;
    writeln!(out, "type: {}", name(header.filety))?;
    writeln!(out, "machine: {:#x}", header.machine)?;
    writeln!(out, "version: {}", header.version)?;
    writeln!(out, "entry: {:#x}", header.entry_addr)?;
    writeln!(out, "flags: {:#x}", header.flags)?;
    writeln!(out, "header size: {}", header.hdr_size)?;
    writeln!(out, "program header offset: {:#x}", header.prog_hdr_offset)?;
    writeln!(out, "program header count: {}", header.prog_hdr_count)?;
    writeln!(out, "program header size: {}", header.prog_hdr_size)?;
    writeln!(out, "section header offset: {:#x}", header.sec_hdr_offset)?;
    writeln!(out, "section header count: {}", header.sec_hdr_count)?;
    writeln!(out, "section header size: {}", header.sec_hdr_size)?;
    writeln!(out, "section name table: {}", header.sec_strtab_index)?;
    writeln!(out)
}

fn print_segment(segment: &Segment, out: &mut impl io::Write) -> io::Result<()> {
    writeln!(out, "type: {}", name(segment.seg_type))?;
    writeln!(out, "flags: {:?}", segment.flags)?;
    writeln!(out, "offset: {:#x}", segment.offset)?;
    writeln!(out, "virtual addr: {:#x}", segment.virt_addr)?;
    writeln!(out, "physical addr: {:#x}", segment.phys_addr)?;
    writeln!(out, "file size: {}", segment.file_size)?;
    writeln!(out, "memory size: {}", segment.mem_size)?;
    writeln!(out, "align: {:#x}", segment.align)?;
    writeln!(out)
}

fn print_section(
    reader: &Reader<'_>,
    index: usize,
    section: &Section,
    out: &mut impl io::Write,
) -> io::Result<()> {
    writeln!(out, "type: {}", name(section.sec_type))?;
    writeln!(out, "flags: {:?}", section.flags)?;
    writeln!(out, "addr: {:#x}", section.virt_addr)?;
    writeln!(out, "offset: {:#x}", section.offset)?;
    writeln!(out, "size: {}", section.size)?;
    writeln!(out, "link: {}", section.link)?;
    writeln!(out, "info: {}", section.info)?;
    writeln!(out, "addr align: {:#x}", section.addr_align)?;
    writeln!(out, "ent size: {}", section.ent_size)?;

    match section.sec_type {
        SectionType::StrTab => match reader.string_table(index) {
            Ok(strings) if strings.is_empty() => writeln!(out, "strings: none")?,
            Ok(strings) => {
                writeln!(out, "strings:")?;
                for string in strings {
                    writeln!(out, "  - {string:?}")?;
                }
            }
            Err(err) => report(out, index, &err)?,
        },
        SectionType::SymTab | SectionType::DynSym => match reader.symbol_table(index) {
            Ok(symbols) if symbols.is_empty() => writeln!(out, "symbols: none")?,
            Ok(symbols) => {
                writeln!(out, "symbols:")?;
                for (i, symbol) in symbols.iter().enumerate() {
                    print_symbol(reader, index, i, symbol, out)?;
                }
            }
            Err(err) => report(out, index, &err)?,
        },
        _ => {}
    }

    writeln!(out)
}

fn print_symbol(
    reader: &Reader<'_>,
    table: usize,
    index: usize,
    symbol: &Symbol,
    out: &mut impl io::Write,
) -> io::Result<()> {
    writeln!(out, "  - index: {index}")?;
    match reader.symbol_name(table, symbol) {
        Ok(name) => writeln!(out, "    name: {name}")?,
        Err(err) => {
            warn!("symbol {index} of section {table}: {err}");
            writeln!(out, "    name: <{err}>")?;
        }
    }
    writeln!(out, "    type: {}", name(symbol.sym_type()))?;
    writeln!(out, "    binding: {}", name(symbol.binding()))?;
    writeln!(out, "    visibility: {:?}", symbol.visibility())?;
    writeln!(out, "    section: {:?}", symbol.section())?;
    writeln!(out, "    value: {:#x}", symbol.value)?;
    writeln!(out, "    size: {}", symbol.size)
}

fn report(out: &mut impl io::Write, index: usize, err: &elfkit::Error) -> io::Result<()> {
    warn!("section {index}: {err}");
    writeln!(out, "error: {err}")
}

/// A kind whose values outside the known set are kept in an `Other`
/// variant.
trait Kind: Debug {
    fn unnamed(&self) -> Option<u64>;
}

macro_rules! impl_kind {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Kind for $ty {
                fn unnamed(&self) -> Option<u64> {
                    match *self {
                        Self::Other(raw) => Some(u64::from(raw)),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_kind!(FileType, SegmentType, SectionType, SymbolBinding, SymbolType);

/// The variant name of `kind`, or its value in hex if it has none.
fn name(kind: impl Kind) -> String {
    match kind.unnamed() {
        Some(raw) => format!("{raw:#x}"),
        None => format!("{kind:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elfkit::{
        elf::{
            raw::{self, Record},
            ByteOrder, Class, Ident, SectionFlags,
        },
        write, Elf,
    };

    fn listing(data: &[u8]) -> String {
        let elf = Elf::parse(data).unwrap();
        let mut out = Vec::new();
        print(&Reader::new(&elf, data), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    /// A relocatable file with no segments: a null section, a section
    /// name table, and `.bogus`, a string table without a trailing
    /// null byte.
    fn sections_only() -> Vec<u8> {
        const NAMES: &[u8] = b"\0.shstrtab\0.bogus\0";
        const BOGUS: &[u8] = b"\0abc";
        let names_offset = raw::FILE_HDR_SIZE as u64;
        let bogus_offset = names_offset + NAMES.len() as u64;
        let sec_hdr_offset = 0x80;

        let header = Header {
            ident: Ident {
                class: Class::Elf64,
                data: ByteOrder::Little,
                version: 1,
                osabi: 0,
                abi_version: 0,
            },
            filety: FileType::Rel,
            machine: raw::EM_X86_64,
            version: raw::EV_CURRENT,
            entry_addr: 0,
            prog_hdr_offset: 0,
            sec_hdr_offset,
            flags: 0,
            hdr_size: raw::FILE_HDR_SIZE as u16,
            prog_hdr_size: 0,
            prog_hdr_count: 0,
            sec_hdr_size: raw::SECTION_HDR_SIZE as u16,
            sec_hdr_count: 3,
            sec_strtab_index: 1,
        };
        let strtab = |name_offset, offset, size| Section {
            name_offset,
            sec_type: SectionType::StrTab,
            flags: SectionFlags::empty(),
            virt_addr: 0,
            offset,
            size,
            link: 0,
            info: 0,
            addr_align: 1,
            ent_size: 0,
        };
        let null = Section {
            sec_type: SectionType::Null,
            ..strtab(0, 0, 0)
        };

        let mut data = Vec::new();
        header.to_raw().write(ByteOrder::Little, &mut data);
        data.extend_from_slice(NAMES);
        data.extend_from_slice(BOGUS);
        data.resize(sec_hdr_offset as usize, 0);
        for section in [
            null,
            strtab(1, names_offset, NAMES.len() as u64),
            strtab(11, bogus_offset, BOGUS.len() as u64),
        ] {
            raw::SectionHdr::from(section).write(ByteOrder::Little, &mut data);
        }
        data
    }

    #[test]
    fn enum_names() {
        assert_eq!(name(SegmentType::Load), "Load");
        assert_eq!(name(SegmentType::GnuStack), "GnuStack");
        assert_eq!(name(SegmentType::Other(0x7000_0001)), "0x70000001");
        assert_eq!(name(SymbolBinding::Other(13)), "0xd");
        assert_eq!(name(FileType::Exec), "Exec");
        assert_eq!(name(SectionType::Other(0x6fff_fff6)), "0x6ffffff6");
        assert_eq!(name(SymbolType::Other(10)), "0xa");
    }

    #[test]
    fn executable() {
        let text = listing(&write::synthesize(0x40_1000, 0x40_1004, &[0x90; 8]));

        assert!(text.starts_with("class: Elf64\ndata: Little\n"));
        assert!(text.contains("type: Exec\n"));
        assert!(text.contains("entry: 0x401004\n"));
        assert!(text.contains(
            "program headers: 1\n\
             index: 0\n\
             type: Load\n\
             flags: EXEC | WRITE | READ\n\
             offset: 0x1000\n\
             virtual addr: 0x401000\n"
        ));
        assert!(text.contains("file size: 8\n"));
        assert!(text.ends_with("section headers: 0\n"));
    }

    #[test]
    fn sections() {
        let text = listing(&sections_only());

        assert!(text.contains("program headers: 0\n"));
        assert!(text.contains("section headers: 3\n"));
        assert!(text.contains(
            "index: 1\n\
             name: .shstrtab\n\
             type: StrTab\n"
        ));
        assert!(text.contains("strings:\n  - \".shstrtab\"\n  - \".bogus\"\n"));
        // the malformed table is reported and the listing still ends
        assert!(text.contains("name: .bogus\n"));
        assert!(text.contains("error: string table in section 2 is malformed\n"));
        assert!(text.ends_with("\n\n"));
    }
}
