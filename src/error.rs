use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use unicode_width::UnicodeWidthStr;

pub type Result<T> = std::result::Result<T, Error>;

/// Status of a program that walked off its fixed-size tape, in-process or as an executable.
pub const TAPE_OVERFLOW_STATUS: i32 = 71;

/// Everything that can stop a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("{0}")]
    Usage(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cell index {index} is outside of the tape")]
    TapeOverflow { index: i64 },
}

impl Error {
    /// The process status a front end exits with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_) => 64,
            Error::Parse(_) => 65,
            Error::SourceUnreadable { .. } => 66,
            Error::Backend(_) => 70,
            Error::TapeOverflow { .. } => TAPE_OVERFLOW_STATUS,
            Error::Io(_) => 74,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnmatchedOpenBracket,
    UnmatchedCloseBracket,
}
use ParseErrorKind::*;

/// A bracket that has no partner, with enough context to point at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    position: usize,
    line: Vec<u8>,
    linenum: usize,
    offset: usize,
}

impl ParseError {
    /// `code` is every instruction byte read so far; `position` indexes the offending bracket.
    pub fn new(kind: ParseErrorKind, code: &[u8], position: usize) -> Self {
        let (line, linenum, offset) = find_line(code, position);
        Self {
            kind,
            position,
            line: line.into(),
            linenum,
            offset,
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// Instruction index of the offending bracket.
    pub fn position(&self) -> usize {
        self.position
    }

    /// 1-based line of the offending bracket.
    pub fn line(&self) -> usize {
        self.linenum + 1
    }

    /// 1-based column (in bytes) of the offending bracket.
    pub fn column(&self) -> usize {
        self.offset + 1
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let line = String::from_utf8_lossy(&self.line);
        // the offset counts bytes; lossy decoding may not keep them all
        let prefix = String::from_utf8_lossy(&self.line[..self.offset]);
        let width = UnicodeWidthStr::width(&prefix[..]);

        match self.kind {
            UnmatchedOpenBracket => {
                writeln!(f, "reached end of program with unterminated loop")?;
                write!(f, "loop started at {}:{}", self.line(), self.column())?;
            }
            UnmatchedCloseBracket => {
                write!(
                    f,
                    "] found at {}:{} when not in a loop",
                    self.line(),
                    self.column()
                )?;
            }
        };
        writeln!(f, " (instruction {})", self.position)?;

        writeln!(f, "{}", line)?;
        write!(f, "{}^", " ".repeat(width))?;

        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// The code-generation backend refused the graph it was given.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("backend failure: {0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        BackendError(message.into())
    }
}

fn find_line(code: &[u8], i: usize) -> (&[u8], usize, usize) {
    let offset = code[0..i].iter().rev().take_while(|x| **x != b'\n').count();
    let end = i + code[i..].iter().take_while(|x| **x != b'\n').count();
    let linenum = code[0..(i - offset)]
        .iter()
        .filter(|x| **x == b'\n')
        .count();
    (&code[(i - offset)..end], linenum, offset)
}
