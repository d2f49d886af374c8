//! A [`log`] backend that writes coloured lines to stderr.
//!
//! Lines look like `[    0.004] [info] elfctl: message`, with the time
//! counted from [`init_logging`]. What gets through is decided by a
//! filter string such as `warn,elfkit::read=trace`: a bare level sets
//! the default, `target=level` overrides it for a module and its
//! children. The most specific target wins.

use std::{
    io::{self, IsTerminal, Write},
    time::Instant,
};

use color_eyre::eyre::{self, eyre, WrapErr};
use log::{Level, LevelFilter, Log, Metadata, Record};
use owo_colors::OwoColorize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    default: LevelFilter,
    directives: Vec<(String, LevelFilter)>,
}

impl Filter {
    pub fn parse(directives: &str) -> eyre::Result<Self> {
        let mut filter = Filter {
            default: LevelFilter::Warn,
            directives: Vec::new(),
        };

        for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.split_once('=') {
                Some((target, level)) => {
                    let target = target.trim();
                    if target.is_empty() {
                        return Err(eyre!("missing target in log directive {directive:?}"));
                    }
                    let level = parse_level(level)?;
                    filter.directives.push((target.to_owned(), level));
                }
                None => filter.default = parse_level(directive)?,
            }
        }

        // longest first, so the first match is the most specific
        filter
            .directives
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));

        Ok(filter)
    }

    pub fn level_for(&self, target: &str) -> LevelFilter {
        self.directives
            .iter()
            .find(|(prefix, _)| {
                target
                    .strip_prefix(prefix.as_str())
                    .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
            })
            .map_or(self.default, |&(_, level)| level)
    }

    pub fn max_level(&self) -> LevelFilter {
        self.directives
            .iter()
            .map(|&(_, level)| level)
            .fold(self.default, Ord::max)
    }
}

fn parse_level(level: &str) -> eyre::Result<LevelFilter> {
    level
        .trim()
        .parse()
        .wrap_err_with(|| format!("invalid log level {level:?}"))
}

struct Logger {
    filter: Filter,
    start: Instant,
    colour: bool,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter.level_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.start.elapsed();
        let (sec, ms) = (elapsed.as_secs(), elapsed.subsec_millis());
        let label = format!("[{}]", label(record.level()));

        let mut stderr = io::stderr().lock();
        // nowhere to report a failure to log
        let _ = if self.colour {
            writeln!(
                stderr,
                "{}{:>5}.{:03}{} {} {}{} {}",
                "[".white().dimmed(),
                sec.white().dimmed(),
                ms.white().dimmed(),
                "]".white().dimmed(),
                paint(record.level(), &label),
                record.target().white().dimmed(),
                ":".white().bold(),
                record.args()
            )
        } else {
            writeln!(
                stderr,
                "[{sec:>5}.{ms:03}] {label} {}: {}",
                record.target(),
                record.args()
            )
        };
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

fn label(level: Level) -> &'static str {
    match level {
        Level::Error => "crit",
        Level::Warn => "warn",
        Level::Info => "info",
        Level::Debug => "debug",
        Level::Trace => "trace",
    }
}

fn paint(level: Level, label: &str) -> String {
    match level {
        Level::Error => label.red().bold().to_string(),
        Level::Warn => label.yellow().bold().to_string(),
        Level::Info => label.green().bold().to_string(),
        Level::Debug => label.blue().bold().to_string(),
        Level::Trace => label.magenta().to_string(),
    }
}

/// Install the logger. `directives` is parsed as a [`Filter`].
pub fn init_logging(directives: &str) -> eyre::Result<()> {
    let filter = Filter::parse(directives)?;
    log::set_max_level(filter.max_level());
    log::set_boxed_logger(Box::new(Logger {
        filter,
        start: Instant::now(),
        colour: io::stderr().is_terminal(),
    }))?;
    Ok(())
}
