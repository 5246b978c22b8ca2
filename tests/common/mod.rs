#![allow(dead_code)]

use bfkit::codegen::Recorder;
use bfkit::{compile, CompiledProgram, EofBehavior, Interpreter, Result, Settings};

pub const HELLO_WORLD: &[u8] = b"++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";

/// Programs that terminate when `,` leaves the cell unchanged at end of input, with their input.
pub const CORPUS: &[(&[u8], &[u8])] = &[
    (b"", b""),
    (b"++++++++[>++++++++<-]>.", b""),
    (HELLO_WORLD, b""),
    (b",.,.,.", b"ABC"),
    (b"-.", b""),
    (b"+[-]+.", b""),
    (b"<<<+++.>>>.", b""),
    (b"this + is + a + comment.", b""),
    (b"+++[>+++[>+<-]<-]>>.", b""),
    (b",[.[-],]", b"echo"),
    (b"+++,.,.", b"z"),
    (b">,[>,]<[.<]", b"stressed"),
];

/// Walks `cells` to the left, then `cells` to the right of the start, printing on the way.
pub fn long_walk(cells: usize) -> Vec<u8> {
    let mut code = Vec::new();
    code.extend(std::iter::repeat(b'<').take(cells));
    code.extend_from_slice(b"+++.");
    code.extend(std::iter::repeat(b'>').take(2 * cells));
    code.extend_from_slice(b"++++.");
    code
}

pub fn interpret(code: &[u8], input: &[u8], eof: EofBehavior) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    Interpreter::new(code)
        .with_eof(eof)
        .run(&mut &input[..], &mut output)?;
    Ok(output)
}

pub fn compile_and_run(code: &[u8], input: &[u8], eof: EofBehavior) -> Result<Vec<u8>> {
    let settings = Settings {
        eof,
        ..Settings::default()
    };
    let cfg = compile(code, Recorder::new(), &settings)?;
    let program = CompiledProgram::new(&cfg)?;

    let mut output = Vec::new();
    program.run(&mut &input[..], &mut output)?;
    Ok(output)
}
