//! Plumbing shared by the `bfinterp`, `bfcomp` and `bfjit` front ends.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{App, Arg, ArgMatches, ErrorKind};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Error, Result};
use crate::settings::{EofBehavior, Settings};
use crate::source::InstructionSource;

/// Logs go to stderr; stdout belongs to the program being run.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Options every front end accepts.
pub fn with_common_args<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app.arg(
        Arg::with_name("eof")
            .long("eof")
            .help("What ',' stores once input is exhausted")
            .takes_value(true)
            .possible_values(EofBehavior::NAMES)
            .default_value("unchanged"),
    )
    .arg(
        Arg::with_name("verbose")
            .short("v")
            .help("Log what is going on to stderr"),
    )
}

/// Options for front ends that build a fixed-size tape.
pub fn with_tape_args<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app.arg(
        Arg::with_name("tape_size")
            .long("tape-size")
            .help("Size of tape")
            .takes_value(true)
            .empty_values(false)
            .value_name("bytes"),
    )
}

/// Parses `args`; `--help` and `--version` print and exit, anything else wrong is a usage error.
pub fn get_matches<'a, I, T>(app: App<'a, '_>, args: I) -> Result<ArgMatches<'a>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    app.get_matches_from_safe(args).map_err(|e| {
        let kind = e.kind;
        match kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => e.exit(),
            _ => Error::Usage(e.message),
        }
    })
}

/// Builds [Settings] from the parsed options; `$CC` and friends fill in the rest.
pub fn settings(matches: &ArgMatches) -> Result<Settings> {
    let mut settings = Settings::default();

    if let Some(eof) = matches.value_of("eof") {
        settings.eof = eof.parse().map_err(Error::Usage)?;
    }
    if let Some(size) = matches.value_of("tape_size") {
        settings.tape_size = match size.parse::<usize>() {
            Ok(size) if size > 0 && size <= i32::MAX as usize => size,
            _ => return Err(Error::Usage(format!("invalid tape size '{}'", size))),
        };
    }
    if matches.is_present("keep_c") {
        settings.keep_c = true;
    }

    Ok(settings)
}

/// The path given for the positional argument `name`.
pub fn path_arg(matches: &ArgMatches, name: &str) -> Result<PathBuf> {
    matches
        .value_of_os(name)
        .map(PathBuf::from)
        .ok_or_else(|| Error::Usage(format!("missing {}", name)))
}

pub fn open_source(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| Error::SourceUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a whole program into memory.
pub fn read_program(path: &Path) -> Result<Vec<u8>> {
    let mut source = InstructionSource::new(open_source(path)?);
    Ok(source.drain()?.to_vec())
}

/// Prints `err` and returns the status to exit with.
pub fn report(err: &Error) -> i32 {
    debug!(code = err.exit_code(), "run failed");
    eprintln!("error: {}", err);
    err.exit_code()
}
