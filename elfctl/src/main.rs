use std::{fs, io, path::PathBuf};

use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use elfkit::{write, Elf, Reader};
use log::{debug, info, warn};

mod dump;
mod syslog;

#[derive(Clone, Debug, Parser)]
#[clap(rename_all = "snake_case", version, about)]
enum Arguments {
    /// Print the headers, sections and symbols of an ELF file
    Read(ReadOptions),
    /// Write a minimal x86-64 Linux executable
    Write(WriteOptions),
}

#[derive(Clone, Debug, Parser)]
struct LogOptions {
    /// Log filter: a level, `target=level` pairs, or both, separated by
    /// commas (e.g. `info,elfkit::read=trace`)
    #[clap(long, env = "ELFCTL_LOG", default_value = "warn")]
    log: String,
}

#[derive(Clone, Debug, Parser)]
struct ReadOptions {
    #[clap(flatten)]
    log: LogOptions,

    /// The file to read
    file: PathBuf,
}

#[derive(Clone, Debug, Parser)]
struct WriteOptions {
    #[clap(flatten)]
    log: LogOptions,

    /// Where to put the executable
    #[clap(short, long, default_value = "output.elf")]
    output: PathBuf,

    /// Virtual address the code is loaded at
    #[clap(long, default_value = "0x401000", value_parser = parse_addr)]
    addr: u64,

    /// Entry point (defaults to the load address)
    #[clap(long, value_parser = parse_addr)]
    entry: Option<u64>,

    /// Raw machine code to embed instead of the built-in program, which
    /// exits with status 33
    #[clap(long)]
    code: Option<PathBuf>,
}

/// `exit(33)` via the Linux x86-64 syscall ABI.
const EXIT_33: [u8; 16] = [
    0x48, 0xc7, 0xc0, 0x3c, 0x00, 0x00, 0x00, // mov $60, %rax
    0x48, 0xc7, 0xc7, 0x21, 0x00, 0x00, 0x00, // mov $33, %rdi
    0x0f, 0x05, // syscall
];

fn parse_addr(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|err| format!("invalid address {s:?}: {err}"))
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let args = Arguments::parse();

    match args {
        Arguments::Read(opts) => {
            syslog::init_logging(&opts.log.log)?;
            dump_file(&opts)?;
        }
        Arguments::Write(opts) => {
            syslog::init_logging(&opts.log.log)?;
            write_executable(&opts)?;
        }
    }

    Ok(())
}

fn dump_file(opts: &ReadOptions) -> eyre::Result<()> {
    let path = opts.file.display();
    let data = fs::read(&opts.file).wrap_err_with(|| format!("failed to read {path}"))?;
    let elf = Elf::parse(&data).wrap_err_with(|| format!("failed to parse {path}"))?;
    info!(
        "{path}: {} segments, {} sections",
        elf.segments().len(),
        elf.sections().len()
    );

    let reader = Reader::new(&elf, &data);
    dump::print(&reader, &mut io::stdout().lock())?;

    Ok(())
}

fn write_executable(opts: &WriteOptions) -> eyre::Result<()> {
    if opts.addr % write::PAGE_SIZE != 0 {
        warn!(
            "load address {:#x} is not page aligned, the kernel will refuse to map it",
            opts.addr
        );
    }

    let code = match &opts.code {
        Some(path) => {
            fs::read(path).wrap_err_with(|| format!("failed to read {}", path.display()))?
        }
        None => EXIT_33.to_vec(),
    };
    let entry = opts.entry.unwrap_or(opts.addr);
    debug!("{} bytes of code at {:#x}, entry {entry:#x}", code.len(), opts.addr);

    let bytes = write::synthesize(opts.addr, entry, &code);
    let path = opts.output.display();
    fs::write(&opts.output, &bytes).wrap_err_with(|| format!("failed to write {path}"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(&opts.output, fs::Permissions::from_mode(0o755))
            .wrap_err_with(|| format!("failed to make {path} executable"))?;
    }

    info!("wrote {} bytes to {path}", bytes.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses() {
        assert_eq!(parse_addr("0x401000"), Ok(0x40_1000));
        assert_eq!(parse_addr("0X40_1000"), Ok(0x40_1000));
        assert_eq!(parse_addr("4198400"), Ok(0x40_1000));
        assert!(parse_addr("0xgg").is_err());
        assert!(parse_addr("").is_err());
    }

    #[test]
    fn write_options() {
        let Arguments::Write(opts) =
            Arguments::try_parse_from(["elfctl", "write", "--entry", "0x401004"]).unwrap()
        else {
            panic!("expected the write subcommand");
        };
        assert_eq!(opts.output, PathBuf::from("output.elf"));
        assert_eq!(opts.addr, 0x40_1000);
        assert_eq!(opts.entry, Some(0x40_1004));
        assert!(opts.code.is_none());
    }

    #[test]
    fn read_requires_a_file() {
        assert!(Arguments::try_parse_from(["elfctl", "read"]).is_err());
    }

    #[test]
    fn arguments() {
        use clap::CommandFactory;
        Arguments::command().debug_assert();
    }
}
