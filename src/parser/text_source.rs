//! Character source abstraction underneath the tokenizers.
//!
//! All supported formats are ASCII-oriented text, so sources hand out bytes.
//! The stream backing a source is owned by it and released when the source
//! is dropped, on every exit path.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

// =#========================================================================#=
// TEXT SOURCE (Trait)
// =#========================================================================#=
/// Byte-level access with one-byte lookahead, as required by the tokenizers.
///
/// Abstracts over in-memory buffers and (in the future) incrementally
/// buffered file reading; the tokenizer layer is written against this trait
/// only.
pub trait TextSource {
    /// Peek at the current byte without consuming it; `None` at end of input.
    fn peek(&self) -> Option<u8>;

    /// Consume and return the current byte; `None` at end of input.
    fn next_byte(&mut self) -> Option<u8>;

    /// The current byte offset, for error reporting.
    fn position(&self) -> usize;

    /// A slice of up to `k` bytes from the current position, without
    /// consuming or allocating.
    fn peek_slice(&self, k: usize) -> &[u8];

    /// Whether the end of input has been reached.
    fn is_eof(&self) -> bool;
}

// =#========================================================================#=
// IN MEMORY TEXT SOURCE
// =#========================================================================#=
/// A text source that owns its whole input in memory.
pub struct InMemoryTextSource {
    input: Vec<u8>,
    pos: usize,
}

impl InMemoryTextSource {
    /// Creates a source from an owned byte vector.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { input: bytes, pos: 0 }
    }

    /// Creates a source by reading `reader` to its end.
    ///
    /// The reader is consumed and dropped here, so the underlying stream is
    /// closed before parsing begins.
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::from_vec(bytes))
    }

    /// Creates a source from the contents of a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::from_reader(File::open(path)?)
    }
}

impl TextSource for InMemoryTextSource {
    #[inline(always)]
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    #[inline(always)]
    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    #[inline]
    fn position(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    fn peek_slice(&self, k: usize) -> &[u8] {
        let end = (self.pos + k).min(self.input.len());
        &self.input[self.pos..end]
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }
}
