//! Lazily pulls program text out of a byte stream.

use std::io::{self, BufReader, Bytes, Read};

/// An instruction buffer backed by a stream.
///
/// Bytes are appended in the order they are read and never move afterwards, so a position is a
/// stable key for the rest of the run. Every byte is kept, including the ones that are not
/// instructions.
pub struct InstructionSource<R: Read> {
    stream: Bytes<BufReader<R>>,
    code: Vec<u8>,
    exhausted: bool,
}

impl<R: Read> InstructionSource<R> {
    pub fn new(stream: R) -> Self {
        InstructionSource {
            stream: BufReader::new(stream).bytes(),
            code: Vec::new(),
            exhausted: false,
        }
    }

    /// Reads one more byte and appends it to the buffer.
    ///
    /// `Ok(None)` is the end of the program; it is returned for every call once the stream is
    /// exhausted.
    pub fn next_instruction(&mut self) -> io::Result<Option<u8>> {
        if self.exhausted {
            return Ok(None);
        }

        match self.stream.next() {
            Some(byte) => {
                let byte = byte?;
                self.code.push(byte);
                Ok(Some(byte))
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    /// Returns the instruction at `position`, reading from the stream if it has not been
    /// buffered yet. `Ok(None)` means the program ends before `position`.
    pub fn fetch(&mut self, position: usize) -> io::Result<Option<u8>> {
        while self.code.len() <= position {
            if self.next_instruction()?.is_none() {
                return Ok(None);
            }
        }
        Ok(Some(self.code[position]))
    }

    /// Reads the stream to its end.
    pub fn drain(&mut self) -> io::Result<&[u8]> {
        while self.next_instruction()?.is_some() {}
        Ok(&self.code)
    }

    /// Everything buffered so far.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Number of buffered bytes; also the position the next byte read will get.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}
