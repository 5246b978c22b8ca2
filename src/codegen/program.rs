//! Turns a recorded [ControlFlowGraph] into something that can be called directly.
//!
//! The blocks are flattened into a list of [Bytecode] with resolved branch offsets (a form of
//! [threaded code]) and run over a fixed-size tape, the same shape of memory the C backend
//! declares.
//!
//! [threaded code]: https://en.wikipedia.org/wiki/Threaded_code

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};

use tracing::debug;

use super::recorder::{BlockId, ControlFlowGraph, ExternId, Terminator};
use super::Operation;
use crate::error::{BackendError, Error, Result};
use crate::interpreter::read_byte;
use crate::settings::EofBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bytecode {
    ChangeVal(u8),
    ChangeAddr(i32),
    PutChar,
    GetChar(EofBehavior),
    BranchIfZero(BranchTarget, BranchTarget),
    BranchTo(BranchTarget),
    Return,
}

/// Offset from the beginning of a program to a specific instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchTarget(pub usize);

/// A compiled program that runs in the current process.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    code: Vec<Bytecode>,
    tape_size: usize,
    initial_index: i64,
}

impl CompiledProgram {
    /// Fails if the graph calls anything but `getchar` for input and `putchar` for output.
    pub fn new(cfg: &ControlFlowGraph) -> std::result::Result<Self, BackendError> {
        let code = flatten(cfg)?;
        debug!(
            blocks = cfg.blocks().len(),
            instructions = code.len(),
            "flattened control-flow graph"
        );

        Ok(CompiledProgram {
            code,
            tape_size: cfg.tape_size(),
            initial_index: cfg.initial_index(),
        })
    }

    pub fn code(&self) -> &[Bytecode] {
        &self.code
    }

    /// Runs the program on a fresh, zeroed tape. `output` is flushed before returning.
    pub fn run<I: Read, O: Write>(&self, input: &mut I, output: &mut O) -> Result<()> {
        let result = self.execute(input, output);
        output.flush()?;
        result
    }

    fn execute<I: Read, O: Write>(&self, input: &mut I, output: &mut O) -> Result<()> {
        use Bytecode::*;

        let mut tape = vec![0u8; self.tape_size];
        let mut index = self.initial_index;
        let mut pc = 0;

        while pc < self.code.len() {
            pc = match self.code[pc] {
                ChangeVal(delta) => {
                    let cell = cell(&mut tape, index)?;
                    *cell = cell.wrapping_add(delta);
                    pc + 1
                }
                ChangeAddr(delta) => {
                    index += i64::from(delta);
                    pc + 1
                }
                PutChar => {
                    output.write_all(&[*cell(&mut tape, index)?])?;
                    pc + 1
                }
                GetChar(eof) => {
                    output.flush()?;
                    let read = read_byte(input)?;
                    let cell = cell(&mut tape, index)?;
                    *cell = match read {
                        Some(byte) => byte,
                        None => eof.apply(*cell),
                    };
                    pc + 1
                }
                BranchIfZero(on_zero, on_nonzero) => {
                    if *cell(&mut tape, index)? == 0 {
                        on_zero.0
                    } else {
                        on_nonzero.0
                    }
                }
                BranchTo(target) => target.0,
                Return => return Ok(()),
            }
        }

        Ok(())
    }
}

fn cell(tape: &mut [u8], index: i64) -> Result<&mut u8> {
    if index < 0 {
        return Err(Error::TapeOverflow { index });
    }
    tape.get_mut(index as usize)
        .ok_or(Error::TapeOverflow { index })
}

/// Lays the blocks out in order, then patches in the branch targets.
fn flatten(cfg: &ControlFlowGraph) -> std::result::Result<Vec<Bytecode>, BackendError> {
    let mut block_starts: HashMap<BlockId, BranchTarget> = HashMap::new();
    let mut code = Vec::new();

    // First pass: emit code, leave branch targets as labels
    let mut pending = Vec::new();
    for block in cfg.blocks() {
        block_starts.insert(block.label(), BranchTarget(code.len()));

        for &operation in block.operations() {
            code.push(match operation {
                Operation::MoveIndex(delta) => Bytecode::ChangeAddr(delta),
                Operation::AddCell(delta) => Bytecode::ChangeVal(delta),
                Operation::Output(f) => {
                    expect_extern(cfg, f, "putchar")?;
                    Bytecode::PutChar
                }
                Operation::Input(f, eof) => {
                    expect_extern(cfg, f, "getchar")?;
                    Bytecode::GetChar(eof)
                }
            });
        }

        match block.terminator() {
            Some(terminator) => {
                pending.push((code.len(), terminator));
                code.push(Bytecode::Return);
            }
            None => {
                return Err(BackendError::new(format!(
                    "block L{} has no terminator",
                    block.label().0
                )))
            }
        }
    }

    // Second pass: patch in branch targets
    let target = |label: BlockId| {
        block_starts
            .get(&label)
            .copied()
            .ok_or_else(|| BackendError::new(format!("unknown branch target L{}", label.0)))
    };
    for (i, terminator) in pending {
        code[i] = match terminator {
            Terminator::Jump(label) => Bytecode::BranchTo(target(label)?),
            Terminator::BranchIfZero {
                on_zero,
                on_nonzero,
            } => Bytecode::BranchIfZero(target(on_zero)?, target(on_nonzero)?),
            Terminator::Return => Bytecode::Return,
        };
    }

    Ok(code)
}

fn expect_extern(
    cfg: &ControlFlowGraph,
    f: ExternId,
    name: &str,
) -> std::result::Result<(), BackendError> {
    let declared = &cfg.extern_fn(f).name;
    if declared == name {
        Ok(())
    } else {
        Err(BackendError::new(format!(
            "cannot call {} in place of {}",
            declared, name
        )))
    }
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Bytecode::*;
        match self {
            ChangeVal(amount) => write!(f, "[bp] <- [bp] + #{}", amount),
            ChangeAddr(amount) => write!(f, "bp <- bp + #{}", amount),
            PutChar => write!(f, "putchar [bp]"),
            GetChar(eof) => write!(f, "getchar [bp] (eof: {})", eof),
            BranchIfZero(zero, nonzero) => write!(f, "beq {}, {}", zero.0, nonzero.0),
            BranchTo(target) => write!(f, "b {}", target.0),
            Return => write!(f, "ret"),
        }
    }
}
