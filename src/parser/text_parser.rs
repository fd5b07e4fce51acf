//! Byte-by-byte parsing primitives shared by all tokenizers.
//!
//! [TextParser] provides the peek, consume, and pattern-matching operations
//! the Newick scanner and the Nexus command readers are built on: quote-aware
//! label reading (doubled-delimiter escape), nested bracket comments,
//! case-insensitive keyword matching, and context extraction for error
//! reporting. It operates on any [TextSource] and assumes ASCII encoding.

use crate::error::StreamError;
use crate::parser::text_source::{InMemoryTextSource, TextSource};

/// Characters treated as whitespace in all supported formats
fn is_whitespace(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b'\n' || b == b'\r'
}

// =#========================================================================#=
// TEXT PARSER
// =#========================================================================#=
/// A byte-by-byte parser for ASCII text with peeking, consuming, and
/// case-insensitive matching.
///
/// # Example
/// ```
/// use phylostream::parser::TextParser;
///
/// let mut parser = TextParser::for_str("BEGIN TAXA;");
/// parser.skip_whitespace();
/// assert!(parser.consume_if_word("BEGIN"));
/// parser.skip_whitespace();
/// assert!(parser.peek_is_word("TAXA"));
/// ```
pub struct TextParser {
    source: Box<dyn TextSource>,
}

impl TextParser {
    /// Creates a parser over any text source.
    pub fn new(source: Box<dyn TextSource>) -> Self {
        Self { source }
    }

    /// Creates a parser over a copy of the given string.
    pub fn for_str(input: &str) -> Self {
        Self::new(Box::new(InMemoryTextSource::from_vec(input.as_bytes().to_vec())))
    }

    /// Creates a parser over an owned byte vector.
    pub fn for_bytes(input: Vec<u8>) -> Self {
        Self::new(Box::new(InMemoryTextSource::from_vec(input)))
    }

    /// Peeks at the current byte without consuming it; `None` at end of input.
    #[inline(always)]
    pub fn peek(&self) -> Option<u8> {
        self.source.peek()
    }

    /// Consumes and returns the current byte; `None` at end of input.
    #[inline(always)]
    pub fn next(&mut self) -> Option<u8> {
        self.source.next_byte()
    }

    /// Whether the end of input has been reached.
    pub fn is_eof(&self) -> bool {
        self.source.is_eof()
    }

    /// The current byte offset in the input.
    pub fn position(&self) -> usize {
        self.source.position()
    }

    /// Returns up to `k` bytes from the current position as a string, for
    /// error context. Invalid UTF-8 is replaced.
    pub fn context_as_string(&self, k: usize) -> String {
        String::from_utf8_lossy(self.source.peek_slice(k)).into_owned()
    }

    /// Skips (consumes) all consecutive whitespace characters.
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.next();
            } else {
                break;
            }
        }
    }

    /// Checks whether the current byte matches `ch`, case-insensitively.
    pub fn peek_is(&self, ch: u8) -> bool {
        match self.peek() {
            Some(b) => b.eq_ignore_ascii_case(&ch),
            None => false,
        }
    }

    /// Checks whether the next bytes match `word`, case-insensitively,
    /// without consuming anything.
    pub fn peek_is_word(&self, word: &str) -> bool {
        let sequence = word.as_bytes();
        let context = self.source.peek_slice(sequence.len());
        context.len() == sequence.len() && context.eq_ignore_ascii_case(sequence)
    }

    /// Consumes the current byte if it matches `ch` (case-insensitive).
    ///
    /// # Returns
    /// `true` if the byte was matched and consumed.
    pub fn consume_if(&mut self, ch: u8) -> bool {
        if self.peek_is(ch) {
            self.next();
            true
        } else {
            false
        }
    }

    /// Consumes the next bytes if they match `word` (case-insensitive).
    ///
    /// # Returns
    /// `true` if the word was matched and consumed.
    pub fn consume_if_word(&mut self, word: &str) -> bool {
        if !self.peek_is_word(word) {
            return false;
        }
        for _ in 0..word.len() {
            self.next();
        }
        true
    }

    /// Consumes bytes up to and including `target`, returning the text
    /// before it.
    ///
    /// # Returns
    /// * `Some(text)` - the consumed text, target excluded but consumed
    /// * `None` - end of input reached before the target
    pub fn read_until(&mut self, target: u8) -> Option<String> {
        let mut text = String::new();
        while let Some(b) = self.next() {
            if b == target {
                return Some(text);
            }
            text.push(b as char);
        }
        None
    }

    /// Reads a label that is either quoted (single quotes, doubled-quote
    /// escape) or unquoted (ends at any of `delimiters`). Underscores in
    /// unquoted labels read as spaces; quoting keeps them literal.
    ///
    /// # Errors
    /// Returns an error if a quoted label is not closed before end of input.
    pub fn read_label(&mut self, delimiters: &[u8]) -> Result<String, StreamError> {
        if self.peek() == Some(b'\'') {
            self.read_delimited(b'\'')
        } else {
            Ok(self.read_unquoted(delimiters, true))
        }
    }

    /// Reads a delimited name, assuming the parser is positioned at the
    /// opening delimiter. A doubled delimiter inside the name is an escaped
    /// literal delimiter (`'AB''C'` reads as `AB'C`).
    ///
    /// # Errors
    /// Returns UnexpectedEof if the closing delimiter is missing.
    pub fn read_delimited(&mut self, delimiter: u8) -> Result<String, StreamError> {
        self.next(); // opening delimiter

        let mut name = String::new();
        loop {
            match self.next() {
                Some(b) if b == delimiter => {
                    if self.peek() == Some(delimiter) {
                        name.push(delimiter as char);
                        self.next();
                    } else {
                        return Ok(name);
                    }
                }
                Some(b) => name.push(b as char),
                None => return Err(StreamError::unexpected_eof(self)),
            }
        }
    }

    /// Reads an unquoted name until any of `delimiters` or whitespace.
    ///
    /// When `underscore_to_space` is set, underscores are translated to
    /// literal spaces (the Newick convention for free names).
    pub fn read_unquoted(&mut self, delimiters: &[u8], underscore_to_space: bool) -> String {
        let mut name = String::new();
        while let Some(b) = self.peek() {
            if delimiters.contains(&b) || is_whitespace(b) {
                break;
            }
            if underscore_to_space && b == b'_' {
                name.push(' ');
            } else {
                name.push(b as char);
            }
            self.next();
        }
        name
    }

    /// Reads the body of a bracket comment, assuming the parser is
    /// positioned at the opening `[`. Nested brackets are supported to
    /// arbitrary depth by counting; the returned text excludes the outermost
    /// bracket pair but keeps inner ones.
    ///
    /// # Errors
    /// Returns UnclosedComment if end of input is reached while brackets
    /// remain open.
    pub fn read_comment_text(&mut self) -> Result<String, StreamError> {
        self.next(); // opening '['

        let mut text = String::new();
        let mut depth = 1usize;
        loop {
            match self.next() {
                Some(b'[') => {
                    depth += 1;
                    text.push('[');
                }
                Some(b']') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(text);
                    }
                    text.push(']');
                }
                Some(b) => text.push(b as char),
                None => return Err(StreamError::unclosed_comment(self)),
            }
        }
    }
}
