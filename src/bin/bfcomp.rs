use std::env;
use std::fs;
use std::io::{self, Write};
use std::process;

use clap::{App, Arg, ArgGroup};
use tracing::info;

use bfkit::codegen::{CBackend, Recorder};
use bfkit::{cli, compile, Error, Result};

enum Action {
    Compile,
    EmitC,
    DumpCfg,
}

fn main() {
    process::exit(match run() {
        Ok(()) => 0,
        Err(err) => cli::report(&err),
    });
}

fn run() -> Result<()> {
    let app = App::new("bfcomp")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compiles a Brainfuck program to an executable")
        .arg(
            Arg::with_name("emit_c")
                .long("emit-c")
                .help("Write the generated C instead of an executable"),
        )
        .arg(
            Arg::with_name("dump_cfg")
                .long("dump-cfg")
                .help("Write the control-flow graph; for debugging"),
        )
        .group(ArgGroup::with_name("actions").args(&["emit_c", "dump_cfg"]))
        .arg(
            Arg::with_name("keep_c")
                .long("keep-c")
                .help("Keep the generated C next to the executable"),
        )
        .arg(
            Arg::with_name("FILENAME")
                .help("Source file to compile")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("OUTPUT")
                .help("Output file name ('-' for stdout with --emit-c or --dump-cfg)")
                .required(true)
                .index(2),
        );
    let app = cli::with_tape_args(cli::with_common_args(app));
    let matches = cli::get_matches(app, env::args_os())?;
    cli::init_logging(matches.is_present("verbose"));
    let settings = cli::settings(&matches)?;

    let action = if matches.is_present("dump_cfg") {
        Action::DumpCfg
    } else if matches.is_present("emit_c") {
        Action::EmitC
    } else {
        Action::Compile
    };

    let input = cli::path_arg(&matches, "FILENAME")?;
    let output = cli::path_arg(&matches, "OUTPUT")?;
    let code = cli::read_program(&input)?;
    info!(path = %input.display(), bytes = code.len(), "read program");

    match action {
        Action::DumpCfg => {
            let cfg = compile(&code, Recorder::new(), &settings)?;
            write_output(&output, cfg.to_string().as_bytes())
        }
        Action::EmitC => {
            let c = compile(&code, CBackend::new(), &settings)?;
            write_output(&output, c.as_str().as_bytes())
        }
        Action::Compile => {
            if output.as_os_str() == "-" {
                return Err(Error::Usage("an executable cannot go to stdout".to_string()));
            }
            let c = compile(&code, CBackend::new(), &settings)?;
            c.compile_to_executable(&output, &settings)?;
            Ok(())
        }
    }
}

fn write_output(path: &std::path::Path, contents: &[u8]) -> Result<()> {
    if path.as_os_str() == "-" {
        let stdout = io::stdout();
        let mut stdout = stdout.lock();
        stdout.write_all(contents)?;
        stdout.flush()?;
    } else {
        fs::write(path, contents)?;
    }
    Ok(())
}
