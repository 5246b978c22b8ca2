//! Two ways of running Brainfuck.
//!
//! The [Interpreter] executes a program while it is still being read, pairing brackets only
//! when it has to. The [compiler] walks a fully read program once and builds a control-flow
//! graph through a [codegen::Backend], which either becomes a C executable or a
//! [CompiledProgram] that runs in-process.

pub mod cli;
pub mod codegen;
pub mod compiler;
mod error;
pub mod interpreter;
pub mod pairing;
pub mod settings;
pub mod source;
pub mod tape;

pub use crate::codegen::CompiledProgram;
pub use crate::compiler::{compile, compile_stream};
pub use crate::error::{BackendError, Error, ParseError, ParseErrorKind, Result};
pub use crate::interpreter::Interpreter;
pub use crate::pairing::{LazyResolver, LoopPair, ResolvePairing, StackResolver};
pub use crate::settings::{EofBehavior, Settings};
pub use crate::tape::Tape;
