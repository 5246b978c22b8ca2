//! Pairing of `[` with `]`.
//!
//! Two strategies solve the same problem. [LoopStack] is the eager one: it sees the brackets in
//! order and keeps the open ones on a stack, which is all the block compiler needs because it
//! has the whole program up front. [LoopTable] is the incremental one used by the interpreter:
//! it is keyed by position, remembers every pair it has found, and only reads further into the
//! instruction stream when a specific `[` needs its partner. [ResolvePairing] puts both behind
//! one interface.

use std::collections::HashMap;
use std::io::Read;

use tracing::{debug, trace};

use crate::error::ParseErrorKind::*;
use crate::error::{ParseError, Result};
use crate::source::InstructionSource;

/// A matched `[` (at `begin`) and `]` (at `end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopPair {
    pub begin: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    begin: usize,
    /// `None` while the matching `]` has not been read.
    end: Option<usize>,
}

/// Position-keyed memo of loop pairs, filled in lazily.
///
/// Entries are never removed. The open entries always nest: the most recently opened one is the
/// first to be closed.
#[derive(Debug, Default)]
pub struct LoopTable {
    entries: Vec<Entry>,
    by_begin: HashMap<usize, usize>,
    by_end: HashMap<usize, usize>,
    open: Vec<usize>,
}

impl LoopTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an entry for the `[` at `begin`, unless there already is one.
    pub fn open(&mut self, begin: usize) {
        if self.by_begin.contains_key(&begin) {
            return;
        }

        trace!(begin, "opening loop entry");
        let index = self.entries.len();
        self.entries.push(Entry { begin, end: None });
        self.by_begin.insert(begin, index);
        self.open.push(index);
    }

    /// Closes the innermost open entry with the `]` at `end`, returning its begin position.
    ///
    /// `code` is only used to describe the error when nothing is open.
    pub fn close(&mut self, end: usize, code: &[u8]) -> std::result::Result<usize, ParseError> {
        let index = match self.open.pop() {
            Some(index) => index,
            None => return Err(ParseError::new(UnmatchedCloseBracket, code, end)),
        };

        let entry = &mut self.entries[index];
        entry.end = Some(end);
        self.by_end.insert(end, index);
        trace!(begin = entry.begin, end, "closed loop entry");
        Ok(entry.begin)
    }

    /// Finds the `]` for the `[` at `begin`, reading ahead in `source` as far as needed.
    ///
    /// Everything read on the way stays buffered in `source`, and every bracket seen on the way
    /// is recorded, so later lookups inside the loop body need no further reading.
    pub fn resolve<R: Read>(
        &mut self,
        begin: usize,
        source: &mut InstructionSource<R>,
    ) -> Result<usize> {
        if let Some(end) = self.end_of(begin) {
            return Ok(end);
        }

        self.open(begin);
        let start = source.len();
        while self.end_of(begin).is_none() {
            match source.next_instruction()? {
                Some(b'[') => self.open(source.len() - 1),
                Some(b']') => {
                    self.close(source.len() - 1, source.code())?;
                }
                Some(_) => {}
                None => {
                    let innermost = self.innermost_open().unwrap_or(begin);
                    let err = ParseError::new(UnmatchedOpenBracket, source.code(), innermost);
                    return Err(err.into());
                }
            }
        }

        debug!(
            begin,
            read_ahead = source.len() - start,
            "resolved loop by reading ahead"
        );
        Ok(self.find_jump(begin))
    }

    /// The `]` position of the closed entry starting at `begin`.
    ///
    /// # Panics
    ///
    /// If there is no closed entry for `begin`; callers resolve the entry first.
    pub fn find_jump(&self, begin: usize) -> usize {
        match self.by_begin.get(&begin).map(|&i| self.entries[i].end) {
            Some(Some(end)) => end,
            Some(None) => panic!("loop at {} is still open", begin),
            None => panic!("no loop entry starts at {}", begin),
        }
    }

    /// The `[` position of the entry closed by the `]` at `end`, if any.
    pub fn find_begin(&self, end: usize) -> Option<usize> {
        self.by_end.get(&end).map(|&i| self.entries[i].begin)
    }

    /// The `]` position for `begin`, if the entry exists and is closed.
    pub fn end_of(&self, begin: usize) -> Option<usize> {
        self.by_begin
            .get(&begin)
            .and_then(|&i| self.entries[i].end)
    }

    pub fn innermost_open(&self) -> Option<usize> {
        self.open.last().map(|&i| self.entries[i].begin)
    }

    pub fn is_fully_closed(&self) -> bool {
        self.open.is_empty()
    }

    /// Every closed pair, ordered by `begin`.
    pub fn pairs(&self) -> Vec<LoopPair> {
        let mut pairs: Vec<LoopPair> = self
            .entries
            .iter()
            .filter_map(|entry| {
                entry.end.map(|end| LoopPair {
                    begin: entry.begin,
                    end,
                })
            })
            .collect();
        pairs.sort();
        pairs
    }
}

/// Stack of open loops, each carrying whatever the caller needs when the loop closes.
#[derive(Debug)]
pub struct LoopStack<T> {
    stack: Vec<(usize, T)>,
}

impl<T> LoopStack<T> {
    pub fn new() -> Self {
        LoopStack { stack: Vec::new() }
    }

    pub fn push(&mut self, begin: usize, payload: T) {
        self.stack.push((begin, payload));
    }

    /// Pops the innermost loop for the `]` at `end`.
    pub fn pop(&mut self, end: usize, code: &[u8]) -> std::result::Result<(usize, T), ParseError> {
        self.stack
            .pop()
            .ok_or_else(|| ParseError::new(UnmatchedCloseBracket, code, end))
    }

    /// Checks that every loop was closed once `code` has been fully walked.
    pub fn finish(&self, code: &[u8]) -> std::result::Result<(), ParseError> {
        match self.stack.last() {
            Some(&(begin, _)) => Err(ParseError::new(UnmatchedOpenBracket, code, begin)),
            None => Ok(()),
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl<T> Default for LoopStack<T> {
    fn default() -> Self {
        LoopStack::new()
    }
}

/// Pairs up every bracket of a program.
pub trait ResolvePairing {
    /// Returns every pair, ordered by `begin`, or the first unmatched bracket.
    fn resolve_pairing(&self, code: &[u8]) -> Result<Vec<LoopPair>>;
}

/// Single pass over the whole program with a [LoopStack].
#[derive(Debug, Clone, Copy, Default)]
pub struct StackResolver;

/// Walks the program the way the interpreter does, resolving each `[` through a [LoopTable].
#[derive(Debug, Clone, Copy, Default)]
pub struct LazyResolver;

impl ResolvePairing for StackResolver {
    fn resolve_pairing(&self, code: &[u8]) -> Result<Vec<LoopPair>> {
        let mut stack = LoopStack::new();
        let mut pairs = Vec::new();

        for (position, &byte) in code.iter().enumerate() {
            match byte {
                b'[' => stack.push(position, ()),
                b']' => {
                    let (begin, ()) = stack.pop(position, code)?;
                    pairs.push(LoopPair {
                        begin,
                        end: position,
                    });
                }
                _ => {}
            }
        }
        stack.finish(code)?;

        pairs.sort();
        Ok(pairs)
    }
}

impl ResolvePairing for LazyResolver {
    fn resolve_pairing(&self, code: &[u8]) -> Result<Vec<LoopPair>> {
        let mut source = InstructionSource::new(code);
        let mut table = LoopTable::new();
        let mut position = 0;

        while let Some(byte) = source.fetch(position)? {
            match byte {
                b'[' => {
                    table.resolve(position, &mut source)?;
                }
                b']' => {
                    if table.find_begin(position).is_none() {
                        return Err(
                            ParseError::new(UnmatchedCloseBracket, source.code(), position).into(),
                        );
                    }
                }
                _ => {}
            }
            position += 1;
        }

        Ok(table.pairs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_reads_only_as_far_as_needed() {
        let mut source = InstructionSource::new(&b"[[-]>]+++"[..]);
        let mut table = LoopTable::new();

        assert_eq!(source.next_instruction().unwrap(), Some(b'['));
        assert_eq!(table.resolve(0, &mut source).unwrap(), 5);
        assert_eq!(source.len(), 6);

        // the nested loop was recorded on the way
        assert_eq!(table.end_of(1), Some(3));
        assert_eq!(table.find_begin(3), Some(1));
        assert_eq!(table.find_begin(5), Some(0));
        assert!(table.is_fully_closed());

        // resolving again is a lookup
        assert_eq!(table.resolve(1, &mut source).unwrap(), 3);
        assert_eq!(source.len(), 6);
    }

    #[test]
    fn resolve_reports_innermost_unclosed_loop() {
        let mut source = InstructionSource::new(&b"[+[-[]"[..]);
        let mut table = LoopTable::new();
        source.next_instruction().unwrap();

        match table.resolve(0, &mut source) {
            Err(crate::Error::Parse(err)) => {
                assert_eq!(err.kind(), UnmatchedOpenBracket);
                assert_eq!(err.position(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn open_is_idempotent() {
        let mut table = LoopTable::new();
        table.open(4);
        table.open(4);
        assert_eq!(table.innermost_open(), Some(4));
        assert_eq!(table.close(9, b"").unwrap(), 4);
        assert!(table.is_fully_closed());
        assert_eq!(table.find_jump(4), 9);
    }

    #[test]
    fn close_without_open_entry_fails() {
        let mut table = LoopTable::new();
        let err = table.close(0, b"]").unwrap_err();
        assert_eq!(err.kind(), UnmatchedCloseBracket);
    }

    #[test]
    #[should_panic(expected = "no loop entry starts at 3")]
    fn find_jump_without_entry_is_a_defect() {
        LoopTable::new().find_jump(3);
    }

    #[test]
    fn loop_stack_hands_back_payloads() {
        let mut stack = LoopStack::new();
        stack.push(0, "outer");
        stack.push(2, "inner");
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.pop(3, b"").unwrap(), (2, "inner"));
        assert_eq!(
            stack.finish(b"[ [").unwrap_err().kind(),
            UnmatchedOpenBracket
        );
        assert_eq!(stack.pop(4, b"").unwrap(), (0, "outer"));
        assert!(stack.finish(b"").is_ok());
    }
}
