//! Executes a program one instruction at a time while it is still being read.

use std::io::{self, Read, Write};

use tracing::debug;

use crate::error::ParseErrorKind::*;
use crate::error::{ParseError, Result};
use crate::pairing::LoopTable;
use crate::settings::EofBehavior;
use crate::source::InstructionSource;
use crate::tape::Tape;

/// Result of a single [Interpreter::step].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Halted,
}

/// Streaming interpreter.
///
/// Instructions are pulled from the program stream only when they are about to run, except
/// that reaching a `[` for the first time reads ahead up to its `]`.
pub struct Interpreter<R: Read> {
    source: InstructionSource<R>,
    loops: LoopTable,
    tape: Tape,
    position: usize,
    eof: EofBehavior,
    executed: u64,
}

impl<R: Read> Interpreter<R> {
    pub fn new(program: R) -> Self {
        Interpreter {
            source: InstructionSource::new(program),
            loops: LoopTable::new(),
            tape: Tape::new(),
            position: 0,
            eof: EofBehavior::default(),
            executed: 0,
        }
    }

    pub fn with_eof(mut self, eof: EofBehavior) -> Self {
        self.eof = eof;
        self
    }

    /// Runs until the program ends. `output` is flushed before returning.
    pub fn run<I: Read, O: Write>(&mut self, input: &mut I, output: &mut O) -> Result<()> {
        let result = loop {
            match self.step(input, output) {
                Ok(Step::Continue) => {}
                Ok(Step::Halted) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        // whatever was printed before an error still goes out
        output.flush()?;

        debug!(
            executed = self.executed,
            buffered = self.source.len(),
            cells = self.tape.len(),
            "interpreter stopped"
        );
        result
    }

    /// Executes the instruction at the current position.
    pub fn step<I: Read, O: Write>(&mut self, input: &mut I, output: &mut O) -> Result<Step> {
        let instruction = match self.source.fetch(self.position)? {
            Some(instruction) => instruction,
            None => {
                if let Some(begin) = self.loops.innermost_open() {
                    return Err(
                        ParseError::new(UnmatchedOpenBracket, self.source.code(), begin).into(),
                    );
                }
                return Ok(Step::Halted);
            }
        };

        match instruction {
            b'+' => self.tape.increment(),
            b'-' => self.tape.decrement(),
            b'>' => self.tape.advance(),
            b'<' => self.tape.retreat(),
            b'.' => output.write_all(&[self.tape.read()])?,
            b',' => {
                output.flush()?;
                let value = match read_byte(input)? {
                    Some(byte) => byte,
                    None => self.eof.apply(self.tape.read()),
                };
                self.tape.write(value);
            }
            b'[' => {
                let end = self.loops.resolve(self.position, &mut self.source)?;
                if self.tape.read() == 0 {
                    self.position = end;
                }
            }
            b']' => {
                let begin = match self.loops.find_begin(self.position) {
                    Some(begin) => begin,
                    None => {
                        return Err(ParseError::new(
                            UnmatchedCloseBracket,
                            self.source.code(),
                            self.position,
                        )
                        .into())
                    }
                };
                if self.tape.read() != 0 {
                    self.position = begin;
                }
            }
            _ => {}
        }

        self.position += 1;
        self.executed += 1;
        Ok(Step::Continue)
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn loops(&self) -> &LoopTable {
        &self.loops
    }

    /// Position of the next instruction to execute.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Program bytes read so far.
    pub fn buffered(&self) -> &[u8] {
        self.source.code()
    }
}

/// Reads a single byte; `None` at end of input.
pub(crate) fn read_byte<I: Read>(input: &mut I) -> io::Result<Option<u8>> {
    let mut buffer = [0u8];
    loop {
        match input.read(&mut buffer) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buffer[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn run(program: &[u8], input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        Interpreter::new(program).run(&mut &input[..], &mut output)?;
        Ok(output)
    }

    #[test]
    fn multiplies_with_a_loop() {
        assert_eq!(run(b"++++++++[>++++++++<-]>.", b"").unwrap(), b"@");
    }

    #[test]
    fn echoes_input() {
        assert_eq!(run(b",.,.,.", b"ABC").unwrap(), b"ABC");
    }

    #[test]
    fn empty_program_halts_quietly() {
        assert_eq!(run(b"", b"").unwrap(), b"");
        assert_eq!(run(b"just a comment", b"").unwrap(), b"");
    }

    #[test]
    fn skips_loop_when_cell_is_zero() {
        assert_eq!(run(b"[.]+++.", b"").unwrap(), [3]);
    }

    #[test]
    fn eof_policy_is_applied() {
        let mut output = Vec::new();
        Interpreter::new(&b"+++,.,."[..])
            .with_eof(EofBehavior::Zero)
            .run(&mut &b"a"[..], &mut output)
            .unwrap();
        assert_eq!(output, [b'a', 0]);

        assert_eq!(run(b"+++,.", b"").unwrap(), [3]);
    }

    #[test]
    fn reads_program_lazily() {
        let mut interpreter = Interpreter::new(&b"+.[-]>"[..]);
        let mut output = Vec::new();
        let mut input = io::empty();

        interpreter.step(&mut input, &mut output).unwrap();
        assert_eq!(interpreter.buffered(), b"+");
        interpreter.step(&mut input, &mut output).unwrap();
        assert_eq!(interpreter.buffered(), b"+.");

        // the loop is resolved before it runs
        interpreter.step(&mut input, &mut output).unwrap();
        assert_eq!(interpreter.buffered(), b"+.[-]");
        assert_eq!(interpreter.position(), 3);
    }

    #[test]
    fn unmatched_brackets_fail() {
        match run(b"[", b"") {
            Err(Error::Parse(e)) => assert_eq!(e.kind(), UnmatchedOpenBracket),
            other => panic!("unexpected {:?}", other),
        }
        match run(b"+]", b"") {
            Err(Error::Parse(e)) => {
                assert_eq!(e.kind(), UnmatchedCloseBracket);
                assert_eq!(e.position(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn output_before_an_error_is_kept() {
        let mut output = Vec::new();
        let result = Interpreter::new(&b"+.]"[..]).run(&mut io::empty(), &mut output);
        assert!(result.is_err());
        assert_eq!(output, [1]);
    }
}
