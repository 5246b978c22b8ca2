//! Translates a whole program into basic blocks, one instruction at a time.

use std::io::Read;

use tracing::{debug, trace};

use crate::codegen::{Backend, Operation, Signature};
use crate::error::Result;
use crate::pairing::LoopStack;
use crate::settings::{EofBehavior, Settings};
use crate::source::InstructionSource;

pub const TAPE_NAME: &str = "tape";
pub const INDEX_NAME: &str = "cursor";

/// The three blocks every loop is built from.
#[derive(Debug, Clone, Copy)]
struct Skeleton<K> {
    /// Checks the current cell.
    test: K,
    /// Entered while the cell is non-zero.
    body: K,
    /// Where control goes once the cell is zero.
    after: K,
}

/// Drives a [Backend] through a single pass over the program.
pub struct BlockCompiler<B: Backend> {
    backend: B,
    getchar: B::Function,
    putchar: B::Function,
    eof: EofBehavior,
    current: B::Block,
    loops: LoopStack<Skeleton<B::Block>>,
    blocks: usize,
}

impl<B: Backend> BlockCompiler<B> {
    /// Declares the I/O functions and the memory, and opens the entry block.
    pub fn new(mut backend: B, settings: &Settings) -> Result<Self> {
        let getchar = backend.declare_extern("getchar", Signature::GETCHAR)?;
        let putchar = backend.declare_extern("putchar", Signature::PUTCHAR)?;
        backend.declare_tape(TAPE_NAME, settings.tape_size)?;
        backend.declare_index(INDEX_NAME, (settings.tape_size / 2) as i64)?;
        let current = backend.new_block();

        Ok(BlockCompiler {
            backend,
            getchar,
            putchar,
            eof: settings.eof,
            current,
            loops: LoopStack::new(),
            blocks: 1,
        })
    }

    /// Compiles every byte of `code` and hands the finished graph to the backend.
    pub fn compile(mut self, code: &[u8]) -> Result<B::Output> {
        for position in 0..code.len() {
            self.compile_instruction(code, position)?;
        }
        self.loops.finish(code)?;

        self.backend.end_with_return(self.current)?;
        debug!(
            instructions = code.len(),
            blocks = self.blocks,
            "compiled program"
        );
        Ok(self.backend.finish()?)
    }

    fn compile_instruction(&mut self, code: &[u8], position: usize) -> Result<()> {
        let current = self.current;
        match code[position] {
            b'>' => self.backend.append(current, Operation::MoveIndex(1))?,
            b'<' => self.backend.append(current, Operation::MoveIndex(-1))?,
            b'+' => self.backend.append(current, Operation::AddCell(1))?,
            b'-' => self.backend.append(current, Operation::AddCell(255))?,
            b'.' => self
                .backend
                .append(current, Operation::Output(self.putchar))?,
            b',' => self
                .backend
                .append(current, Operation::Input(self.getchar, self.eof))?,
            b'[' => {
                let test = self.backend.new_block();
                let body = self.backend.new_block();
                let after = self.backend.new_block();
                self.blocks += 3;

                self.backend.end_with_jump(current, test)?;
                self.backend.end_with_branch_if_zero(test, after, body)?;

                self.loops.push(position, Skeleton { test, body, after });
                self.current = body;
            }
            b']' => {
                let (begin, skeleton) = self.loops.pop(position, code)?;
                trace!(begin, end = position, body = ?skeleton.body, "closing loop");
                self.backend.end_with_jump(current, skeleton.test)?;
                self.current = skeleton.after;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Compiles a fully buffered program with `backend`.
pub fn compile<B: Backend>(code: &[u8], backend: B, settings: &Settings) -> Result<B::Output> {
    BlockCompiler::new(backend, settings)?.compile(code)
}

/// Reads `program` to its end, then compiles it with `backend`.
pub fn compile_stream<R: Read, B: Backend>(
    program: R,
    backend: B,
    settings: &Settings,
) -> Result<B::Output> {
    let mut source = InstructionSource::new(program);
    let code = source.drain()?;
    compile(code, backend, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::recorder::Terminator;
    use crate::codegen::{BlockId, ExternId, Recorder};
    use crate::error::{Error, ParseErrorKind};

    fn record(code: &[u8]) -> Result<crate::codegen::ControlFlowGraph> {
        let settings = Settings {
            tape_size: 16,
            ..Settings::default()
        };
        compile(code, Recorder::new(), &settings)
    }

    #[test]
    fn straight_line_code_stays_in_the_entry_block() {
        let cfg = record(b"+>-<.,x").unwrap();
        assert_eq!(cfg.blocks().len(), 1);
        assert_eq!(cfg.tape_size(), 16);
        assert_eq!(cfg.initial_index(), 8);

        let entry = cfg.block(BlockId(0));
        assert_eq!(
            entry.operations(),
            &[
                Operation::AddCell(1),
                Operation::MoveIndex(1),
                Operation::AddCell(255),
                Operation::MoveIndex(-1),
                Operation::Output(ExternId(1)),
                Operation::Input(ExternId(0), EofBehavior::Unchanged),
            ]
        );
        assert_eq!(entry.terminator(), Some(Terminator::Return));
    }

    #[test]
    fn loop_becomes_test_body_after() {
        let cfg = record(b"+[-]").unwrap();
        let blocks = cfg.blocks();
        assert_eq!(blocks.len(), 4);

        // entry -> test
        assert_eq!(blocks[0].operations(), &[Operation::AddCell(1)]);
        assert_eq!(blocks[0].terminator(), Some(Terminator::Jump(BlockId(1))));
        // test: zero -> after, otherwise -> body
        assert!(blocks[1].operations().is_empty());
        assert_eq!(
            blocks[1].terminator(),
            Some(Terminator::BranchIfZero {
                on_zero: BlockId(3),
                on_nonzero: BlockId(2)
            })
        );
        // body jumps back to the test
        assert_eq!(blocks[2].operations(), &[Operation::AddCell(255)]);
        assert_eq!(blocks[2].terminator(), Some(Terminator::Jump(BlockId(1))));
        // after: the rest of the program
        assert_eq!(blocks[3].terminator(), Some(Terminator::Return));
    }

    #[test]
    fn nested_loops_close_innermost_first() {
        let cfg = record(b"[[]]").unwrap();
        let blocks = cfg.blocks();
        assert_eq!(blocks.len(), 7);
        // inner body jumps to inner test, inner after jumps to outer test
        assert_eq!(blocks[5].terminator(), Some(Terminator::Jump(BlockId(4))));
        assert_eq!(blocks[6].terminator(), Some(Terminator::Jump(BlockId(1))));
        assert_eq!(blocks[3].terminator(), Some(Terminator::Return));
    }

    #[test]
    fn unmatched_brackets_fail() {
        match record(b"+[") {
            Err(Error::Parse(e)) => {
                assert_eq!(e.kind(), ParseErrorKind::UnmatchedOpenBracket);
                assert_eq!(e.position(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
        match record(b"]") {
            Err(Error::Parse(e)) => assert_eq!(e.kind(), ParseErrorKind::UnmatchedCloseBracket),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn compiles_from_a_stream() {
        let cfg = compile_stream(&b"+."[..], Recorder::new(), &Settings::default()).unwrap();
        assert_eq!(cfg.blocks()[0].operations().len(), 2);
    }
}
