//! Emits the control-flow graph as C and builds it with the system C compiler.

use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::{Backend, Operation, Signature};
use crate::error::{BackendError, TAPE_OVERFLOW_STATUS};
use crate::settings::{EofBehavior, Settings};

/// Functions the generated code can call; they all come from `<stdio.h>`.
const KNOWN_EXTERNS: &[(&str, Signature)] = &[
    ("getchar", Signature::GETCHAR),
    ("putchar", Signature::PUTCHAR),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CBlock(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CFunction(usize);

#[derive(Debug, Default)]
struct Block {
    body: String,
    terminated: bool,
}

/// Backend that writes one labelled section of `main` per block.
#[derive(Debug, Default)]
pub struct CBackend {
    externs: Vec<String>,
    tape: Option<(String, usize)>,
    index: Option<(String, i64)>,
    blocks: Vec<Block>,
}

/// Generated C translation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSource(String);

impl CBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn names(&self) -> Result<(&str, &str), BackendError> {
        match (&self.tape, &self.index) {
            (Some((tape, _)), Some((index, _))) => Ok((tape.as_str(), index.as_str())),
            _ => Err(BackendError::new(
                "the tape and its index must be declared before code is added",
            )),
        }
    }

    fn open_block(&mut self, block: CBlock) -> Result<&mut Block, BackendError> {
        match self.blocks.get_mut(block.0) {
            Some(b) if !b.terminated => Ok(b),
            Some(_) => Err(BackendError::new(format!(
                "block b{} is already terminated",
                block.0
            ))),
            None => Err(BackendError::new(format!("unknown block b{}", block.0))),
        }
    }

    fn push_line(&mut self, block: CBlock, line: String) -> Result<(), BackendError> {
        let b = self.open_block(block)?;
        b.body.push_str("    ");
        b.body.push_str(&line);
        b.body.push('\n');
        Ok(())
    }

    fn function_name(&self, f: CFunction) -> Result<&str, BackendError> {
        self.externs
            .get(f.0)
            .map(String::as_str)
            .ok_or_else(|| BackendError::new(format!("unknown function #{}", f.0)))
    }

    fn check_target(&self, target: CBlock) -> Result<(), BackendError> {
        if target.0 < self.blocks.len() {
            Ok(())
        } else {
            Err(BackendError::new(format!("unknown branch target b{}", target.0)))
        }
    }

    fn terminate(&mut self, block: CBlock, line: String) -> Result<(), BackendError> {
        self.push_line(block, line)?;
        self.blocks[block.0].terminated = true;
        Ok(())
    }
}

impl Backend for CBackend {
    type Block = CBlock;
    type Function = CFunction;
    type Output = CSource;

    fn declare_extern(
        &mut self,
        name: &str,
        signature: Signature,
    ) -> Result<CFunction, BackendError> {
        match KNOWN_EXTERNS.iter().find(|(known, _)| *known == name) {
            Some((_, known)) if *known == signature => {}
            Some(_) => {
                return Err(BackendError::new(format!(
                    "{} declared with the wrong signature",
                    name
                )))
            }
            None => return Err(BackendError::new(format!("{} is not available", name))),
        }
        self.externs.push(name.to_string());
        Ok(CFunction(self.externs.len() - 1))
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

    fn new_block(&mut self) -> CBlock {
        self.blocks.push(Block::default());
        CBlock(self.blocks.len() - 1)
    }

    fn append(
        &mut self,
        block: CBlock,
        operation: Operation<CFunction>,
    ) -> Result<(), BackendError> {
        let (tape, index) = self.names()?;
        let cell = format!("*{}_at({})", tape, index);

        let line = match operation {
            Operation::MoveIndex(delta) if delta < 0 => format!("{} -= {};", index, -delta),
            Operation::MoveIndex(delta) => format!("{} += {};", index, delta),
            Operation::AddCell(delta) => format!("{} += {};", cell, delta),
            Operation::Output(f) => format!("{}({});", self.function_name(f)?, cell),
            Operation::Input(f, eof) => {
                let call = format!("int c = {}();", self.function_name(f)?);
                let store = match eof {
                    EofBehavior::Unchanged => {
                        format!("if (c != EOF) {} = (unsigned char)c;", cell)
                    }
                    EofBehavior::Zero => format!("{} = c == EOF ? 0 : (unsigned char)c;", cell),
                    EofBehavior::Max => format!("{} = (unsigned char)c;", cell),
                };
                format!("{{ {} {} }}", call, store)
            }
        };
        self.push_line(block, line)
    }

    fn end_with_jump(&mut self, block: CBlock, target: CBlock) -> Result<(), BackendError> {
        self.check_target(target)?;
        self.terminate(block, format!("goto b{};", target.0))
    }

    fn end_with_branch_if_zero(
        &mut self,
        block: CBlock,
        on_zero: CBlock,
        on_nonzero: CBlock,
    ) -> Result<(), BackendError> {
        self.check_target(on_zero)?;
        self.check_target(on_nonzero)?;
        let (tape, index) = self.names()?;
        let line = format!(
            "if (*{}_at({}) == 0) goto b{}; else goto b{};",
            tape, index, on_zero.0, on_nonzero.0
        );
        self.terminate(block, line)
    }

    fn end_with_return(&mut self, block: CBlock) -> Result<(), BackendError> {
        self.terminate(block, "return 0;".to_string())
    }

    fn finish(self) -> Result<CSource, BackendError> {
        let (tape, size) = self
            .tape
            .as_ref()
            .ok_or_else(|| BackendError::new("no tape was declared"))?;
        let (index, initial) = self
            .index
            .as_ref()
            .ok_or_else(|| BackendError::new("no tape index was declared"))?;
        if self.blocks.is_empty() {
            return Err(BackendError::new("no entry block"));
        }

        let mut output = String::new();
        macro_rules! push_c {
            ($($arg:tt)*) => {
                writeln!(output, $($arg)*).map_err(|e| BackendError::new(e.to_string()))?
            };
        }

        push_c!("#include <stdio.h>");
        push_c!("#include <stdlib.h>");
        push_c!("");
        push_c!("static unsigned char {}[{}];", tape, size);
        push_c!("");
        push_c!("static unsigned char *{}_at(long i)", tape);
        push_c!("{{");
        push_c!("    if (i < 0 || i >= {}) {{", size);
        push_c!("        fflush(stdout);");
        push_c!(
            "        fprintf(stderr, \"error: cell index %ld is outside of the tape\\n\", i);"
        );
        push_c!("        exit({});", TAPE_OVERFLOW_STATUS);
        push_c!("    }}");
        push_c!("    return &{}[i];", tape);
        push_c!("}}");
        push_c!("");
        push_c!("int main(void)");
        push_c!("{{");
        push_c!("    long {} = {};", index, initial);
        for (i, block) in self.blocks.iter().enumerate() {
            if !block.terminated {
                return Err(BackendError::new(format!("block b{} was never terminated", i)));
            }
            // https://stackoverflow.com/questions/18496282/why-do-i-get-a-label-can-only-be-part-of-a-statement-and-a-declaration-is-not-a
            push_c!("b{}: ;", i);
            output.push_str(&block.body);
        }
        push_c!("}}");

        Ok(CSource(output))
    }
}

impl CSource {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds an executable at `out_path` with `settings.cc`.
    pub fn compile_to_executable(
        &self,
        out_path: &Path,
        settings: &Settings,
    ) -> Result<(), BackendError> {
        if settings.keep_c {
            let c_path = out_path.with_extension("c");
            fs::write(&c_path, self.as_str()).map_err(|e| {
                BackendError::new(format!("could not write {}: {}", c_path.display(), e))
            })?;
            debug!(path = %c_path.display(), "kept generated C");
        }

        info!(cc = %settings.cc, output = %out_path.display(), "compiling");
        let mut child = Command::new(&settings.cc)
            .arg("-x")
            .arg("c")
            .arg("-o")
            .arg(out_path)
            .arg("-") // Standard input
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| BackendError::new(format!("could not run {}: {}", settings.cc, e)))?;

        // stdin is dropped before waiting so the compiler sees the end of its input
        let fed = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(self.as_str().as_bytes()),
            None => Ok(()),
        };
        let status = child
            .wait()
            .map_err(|e| BackendError::new(format!("{} did not finish: {}", settings.cc, e)))?;
        fed.map_err(|e| BackendError::new(format!("could not feed {}: {}", settings.cc, e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(BackendError::new(format!("{} exited with {}", settings.cc, status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_stdio_functions_are_available() {
        let mut backend = CBackend::new();
        assert!(backend.declare_extern("putchar", Signature::PUTCHAR).is_ok());
        assert!(backend.declare_extern("getchar", Signature::PUTCHAR).is_err());
        assert!(backend.declare_extern("system", Signature::PUTCHAR).is_err());
    }

    #[test]
    fn code_needs_declared_memory() {
        let mut backend = CBackend::new();
        let entry = backend.new_block();
        assert!(backend.append(entry, Operation::AddCell(1)).is_err());
    }

    #[test]
    fn renders_blocks_as_labels() {
        let mut backend = CBackend::new();
        let getchar = backend.declare_extern("getchar", Signature::GETCHAR).unwrap();
        backend.declare_tape("tape", 16).unwrap();
        backend.declare_index("cursor", 8).unwrap();
        let entry = backend.new_block();
        let exit = backend.new_block();
        backend.append(entry, Operation::MoveIndex(-2)).unwrap();
        backend
            .append(entry, Operation::Input(getchar, EofBehavior::Zero))
            .unwrap();
        backend.end_with_branch_if_zero(entry, exit, entry).unwrap();
        backend.end_with_return(exit).unwrap();

        let source = backend.finish().unwrap();
        assert_eq!(
            source.as_str(),
            r#"#include <stdio.h>
#include <stdlib.h>

static unsigned char tape[16];

static unsigned char *tape_at(long i)
{
    if (i < 0 || i >= 16) {
        fflush(stdout);
        fprintf(stderr, "error: cell index %ld is outside of the tape\n", i);
        exit(71);
    }
    return &tape[i];
}

int main(void)
{
    long cursor = 8;
b0: ;
    cursor -= 2;
    { int c = getchar(); *tape_at(cursor) = c == EOF ? 0 : (unsigned char)c; }
    if (*tape_at(cursor) == 0) goto b1; else goto b0;
b1: ;
    return 0;
}
"#
        );
    }
}
