use std::env;
use std::io::{self, BufWriter};
use std::process;

use clap::{App, Arg};
use tracing::info;

use bfkit::codegen::Recorder;
use bfkit::{cli, compile_stream, CompiledProgram, Result};

fn main() {
    process::exit(match run() {
        Ok(()) => 0,
        Err(err) => cli::report(&err),
    });
}

fn run() -> Result<()> {
    let app = App::new("bfjit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compiles a Brainfuck program to basic blocks and runs it in-process")
        .arg(
            Arg::with_name("FILENAME")
                .help("Program to run")
                .required(true)
                .index(1),
        );
    let app = cli::with_tape_args(cli::with_common_args(app));
    let matches = cli::get_matches(app, env::args_os())?;
    cli::init_logging(matches.is_present("verbose"));
    let settings = cli::settings(&matches)?;

    let path = cli::path_arg(&matches, "FILENAME")?;
    let file = cli::open_source(&path)?;
    let cfg = compile_stream(file, Recorder::new(), &settings)?;
    let program = CompiledProgram::new(&cfg)?;
    info!(
        path = %path.display(),
        blocks = cfg.blocks().len(),
        tape_size = settings.tape_size,
        "running compiled program"
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut output = BufWriter::new(stdout.lock());
    program.run(&mut input, &mut output)
}
