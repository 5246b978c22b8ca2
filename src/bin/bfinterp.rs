use std::env;
use std::io::{self, BufWriter};
use std::process;

use clap::{App, Arg};
use tracing::info;

use bfkit::{cli, Interpreter, Result};

fn main() {
    process::exit(match run() {
        Ok(()) => 0,
        Err(err) => cli::report(&err),
    });
}

fn run() -> Result<()> {
    let app = App::new("bfinterp")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs a Brainfuck program while reading it")
        .arg(
            Arg::with_name("FILENAME")
                .help("Program to run")
                .required(true)
                .index(1),
        );
    let matches = cli::get_matches(cli::with_common_args(app), env::args_os())?;
    cli::init_logging(matches.is_present("verbose"));
    let settings = cli::settings(&matches)?;

    let path = cli::path_arg(&matches, "FILENAME")?;
    let file = cli::open_source(&path)?;
    info!(path = %path.display(), eof = %settings.eof, "interpreting");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut output = BufWriter::new(stdout.lock());

    Interpreter::new(file)
        .with_eof(settings.eof)
        .run(&mut input, &mut output)
}
