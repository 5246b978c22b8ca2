//! A backend that only writes down what it is asked to build.

use std::fmt;

use tracing::trace;

use super::{Backend, Operation, Signature};
use crate::error::BackendError;

/// Label of a recorded block; also its index in [ControlFlowGraph::blocks].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlockId(pub usize);

/// Handle to a declared external function; its index in [ControlFlowGraph::externs].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct ExternId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Jump(BlockId),
    BranchIfZero { on_zero: BlockId, on_nonzero: BlockId },
    Return,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extern {
    pub name: String,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    label: BlockId,
    operations: Vec<Operation<ExternId>>,
    terminator: Option<Terminator>,
}

impl BasicBlock {
    pub fn label(&self) -> BlockId {
        self.label
    }

    pub fn operations(&self) -> &[Operation<ExternId>] {
        &self.operations
    }

    /// Always `Some` in a finished [ControlFlowGraph].
    pub fn terminator(&self) -> Option<Terminator> {
        self.terminator
    }
}

/// Everything a [Recorder] was asked to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFlowGraph {
    externs: Vec<Extern>,
    tape: (String, usize),
    index: (String, i64),
    blocks: Vec<BasicBlock>,
}

impl ControlFlowGraph {
    pub fn externs(&self) -> &[Extern] {
        &self.externs
    }

    pub fn extern_fn(&self, id: ExternId) -> &Extern {
        &self.externs[id.0]
    }

    /// Number of cells in the tape.
    pub fn tape_size(&self) -> usize {
        self.tape.1
    }

    /// Starting value of the tape index.
    pub fn initial_index(&self) -> i64 {
        self.index.1
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }
}

/// Builds a [ControlFlowGraph].
#[derive(Debug, Default)]
pub struct Recorder {
    externs: Vec<Extern>,
    tape: Option<(String, usize)>,
    index: Option<(String, i64)>,
    blocks: Vec<BasicBlock>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn open_block(&mut self, block: BlockId) -> Result<&mut BasicBlock, BackendError> {
        let recorded = self
            .blocks
            .get_mut(block.0)
            .ok_or_else(|| BackendError::new(format!("unknown block L{}", block.0)))?;

        if recorded.terminator.is_some() {
            return Err(BackendError::new(format!(
                "block L{} is already terminated",
                block.0
            )));
        }
        Ok(recorded)
    }

    fn check_target(&self, target: BlockId) -> Result<(), BackendError> {
        if target.0 < self.blocks.len() {
            Ok(())
        } else {
            Err(BackendError::new(format!("unknown branch target L{}", target.0)))
        }
    }

    fn terminate(&mut self, block: BlockId, terminator: Terminator) -> Result<(), BackendError> {
        trace!(block = block.0, ?terminator, "terminating block");
        self.open_block(block)?.terminator = Some(terminator);
        Ok(())
    }
}

impl Backend for Recorder {
    type Block = BlockId;
    type Function = ExternId;
    type Output = ControlFlowGraph;

    fn declare_extern(
        &mut self,
        name: &str,
        signature: Signature,
    ) -> Result<ExternId, BackendError> {
        if self.externs.iter().any(|e| e.name == name) {
            return Err(BackendError::new(format!("{} declared twice", name)));
        }
        self.externs.push(Extern {
            name: name.to_string(),
            signature,
        });
        Ok(ExternId(self.externs.len() - 1))
    }

    fn declare_tape(&mut self, name: &str, size: usize) -> Result<(), BackendError> {
        if size == 0 {
            return Err(BackendError::new("the tape needs at least one cell"));
        }
        self.tape = Some((name.to_string(), size));
        Ok(())
    }

    fn declare_index(&mut self, name: &str, initial: i64) -> Result<(), BackendError> {
        self.index = Some((name.to_string(), initial));
        Ok(())
    }

    fn new_block(&mut self) -> BlockId {
        let label = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock {
            label,
            operations: Vec::new(),
            terminator: None,
        });
        label
    }

    fn append(
        &mut self,
        block: BlockId,
        operation: Operation<ExternId>,
    ) -> Result<(), BackendError> {
        if let Operation::Output(f) | Operation::Input(f, _) = operation {
            if f.0 >= self.externs.len() {
                return Err(BackendError::new(format!("unknown function #{}", f.0)));
            }
        }
        self.open_block(block)?.operations.push(operation);
        Ok(())
    }

    fn end_with_jump(&mut self, block: BlockId, target: BlockId) -> Result<(), BackendError> {
        self.check_target(target)?;
        self.terminate(block, Terminator::Jump(target))
    }

    fn end_with_branch_if_zero(
        &mut self,
        block: BlockId,
        on_zero: BlockId,
        on_nonzero: BlockId,
    ) -> Result<(), BackendError> {
        self.check_target(on_zero)?;
        self.check_target(on_nonzero)?;
        self.terminate(
            block,
            Terminator::BranchIfZero {
                on_zero,
                on_nonzero,
            },
        )
    }

    fn end_with_return(&mut self, block: BlockId) -> Result<(), BackendError> {
        self.terminate(block, Terminator::Return)
    }

    fn finish(self) -> Result<ControlFlowGraph, BackendError> {
        let tape = self
            .tape
            .ok_or_else(|| BackendError::new("no tape was declared"))?;
        let index = self
            .index
            .ok_or_else(|| BackendError::new("no tape index was declared"))?;

        if self.blocks.is_empty() {
            return Err(BackendError::new("no entry block"));
        }
        if let Some(block) = self.blocks.iter().find(|b| b.terminator.is_none()) {
            return Err(BackendError::new(format!(
                "block L{} was never terminated",
                block.label.0
            )));
        }

        Ok(ControlFlowGraph {
            externs: self.externs,
            tape,
            index,
            blocks: self.blocks,
        })
    }
}

/// Pseudo-assembly listing, one block after the other.
impl fmt::Display for ControlFlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for e in &self.externs {
            writeln!(f, "extern {}/{}", e.name, e.signature.params.len())?;
        }
        writeln!(f, "global {}[{}]", self.tape.0, self.tape.1)?;
        writeln!(f, "local {} = {}", self.index.0, self.index.1)?;

        for block in &self.blocks {
            writeln!(f, "L{}:", block.label.0)?;
            for op in &block.operations {
                match *op {
                    Operation::MoveIndex(delta) => writeln!(f, "\tadd\tp, p, #{}", delta)?,
                    Operation::AddCell(delta) => {
                        writeln!(f, "\tadd\t[p], [p], #{}", delta as i8)?
                    }
                    Operation::Output(id) => {
                        writeln!(f, "\tcall\t{}, [p]", self.extern_fn(id).name)?
                    }
                    Operation::Input(id, eof) => writeln!(
                        f,
                        "\tcall\t{} -> [p]\t; eof: {}",
                        self.extern_fn(id).name,
                        eof
                    )?,
                }
            }
            match block.terminator {
                Some(Terminator::Jump(BlockId(n))) => writeln!(f, "\tb\tL{}", n)?,
                Some(Terminator::BranchIfZero {
                    on_zero: BlockId(z),
                    on_nonzero: BlockId(n),
                }) => writeln!(f, "\tbeq\t[p], L{}, L{}", z, n)?,
                Some(Terminator::Return) => writeln!(f, "\tret")?,
                None => writeln!(f, "\t; unterminated")?,
            }
        }
        Ok(())
    }
}
