//! The code-generation backends the block compiler drives.
//!
//! The compiler only talks to the [Backend] trait. [Recorder] keeps the control-flow graph as a
//! value (for tests, dumps, and [CompiledProgram]); [c_codegen::CBackend] turns it into C and
//! from there into an executable.

pub mod c_codegen;
pub mod program;
pub mod recorder;

pub use self::c_codegen::{CBackend, CSource};
pub use self::program::CompiledProgram;
pub use self::recorder::{BlockId, ControlFlowGraph, ExternId, Recorder};

use std::fmt;

use crate::error::BackendError;
use crate::settings::EofBehavior;

/// Value types that cross the boundary to external functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Void,
}

/// Signature of an externally defined function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub params: &'static [ValueType],
    pub returns: ValueType,
}

impl Signature {
    /// `int getchar(void)`
    pub const GETCHAR: Signature = Signature {
        params: &[],
        returns: ValueType::Int,
    };

    /// `int putchar(int)`
    pub const PUTCHAR: Signature = Signature {
        params: &[ValueType::Int],
        returns: ValueType::Int,
    };
}

/// A straight-line operation inside a basic block. `F` names an external function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<F> {
    /// `index += delta`
    MoveIndex(i32),
    /// `tape[index] += delta`, wrapping
    AddCell(u8),
    /// `output(tape[index])`
    Output(F),
    /// `tape[index] = input()`, with the given policy at end of input
    Input(F, EofBehavior),
}

/// What the block compiler needs from a code generator.
///
/// Blocks must be terminated exactly once; operations may only be appended before that.
pub trait Backend {
    type Block: Copy + fmt::Debug;
    type Function: Copy + fmt::Debug;
    /// What the finished graph is handed over as.
    type Output;

    fn declare_extern(
        &mut self,
        name: &str,
        signature: Signature,
    ) -> Result<Self::Function, BackendError>;

    /// Declares the global array of `size` byte cells.
    fn declare_tape(&mut self, name: &str, size: usize) -> Result<(), BackendError>;

    /// Declares the integer index into the tape and its starting value.
    fn declare_index(&mut self, name: &str, initial: i64) -> Result<(), BackendError>;

    /// Creates a new, empty block. The first block created is the entry point.
    fn new_block(&mut self) -> Self::Block;

    fn append(
        &mut self,
        block: Self::Block,
        operation: Operation<Self::Function>,
    ) -> Result<(), BackendError>;

    fn end_with_jump(
        &mut self,
        block: Self::Block,
        target: Self::Block,
    ) -> Result<(), BackendError>;

    /// Branches to `on_zero` when the current cell is zero, to `on_nonzero` otherwise.
    fn end_with_branch_if_zero(
        &mut self,
        block: Self::Block,
        on_zero: Self::Block,
        on_nonzero: Self::Block,
    ) -> Result<(), BackendError>;

    fn end_with_return(&mut self, block: Self::Block) -> Result<(), BackendError>;

    /// Takes ownership of the finished graph.
    fn finish(self) -> Result<Self::Output, BackendError>;
}
