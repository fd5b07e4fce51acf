//! Character-level tokenizer for the Newick grammar.
//!
//! [NewickScanner] turns raw characters into a one-token-lookahead stream of
//! [NewickToken]s. It knows nothing about trees: structural validity is the
//! event reader's concern, lexical validity is handled here.

use crate::error::StreamError;
use crate::parser::text_parser::TextParser;

/// Characters that terminate a free (undelimited) Newick name
const NAME_DELIMITERS: &[u8] = b"(),:;[]{}'\"=";

// =#========================================================================#=
// NEWICK TOKEN
// =#========================================================================#=
/// One lexical token of the Newick grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum NewickToken {
    /// `(` - opens a subtree
    SubtreeStart,
    /// `)` - closes a subtree
    SubtreeEnd,
    /// `,` - separates sibling elements
    ElementSeparator,
    /// A node name; `delimited` records whether it was quoted
    Name { text: String, delimited: bool },
    /// A branch length following a `:` separator
    Length(f64),
    /// `;` - ends one tree
    TerminalSymbol,
    /// A bracket comment that is not a recognized directive
    Comment(String),
    /// The `[&r]` hot comment marking the following tree as rooted
    RootedCommand,
    /// The `[&u]` hot comment marking the following tree as unrooted
    UnrootedCommand,
}

// =#========================================================================#=
// NEWICK SCANNER
// =#========================================================================#=
/// Tokenizer with one-token lookahead (`peek`, `next`).
///
/// The scanner borrows the [TextParser] per call rather than owning it, so
/// the Nexus reader can lend its own parser while scanning the Newick string
/// embedded in a `TREE` command.
///
/// Behavior:
/// - A `:` sets the `branch_length_expected` flag; the next token must then
///   parse as a numeric length (comments may intervene), otherwise a
///   MalformedSyntax error carries the stream location.
/// - Delimited names (`'` or `"`) treat a doubled delimiter as an escaped
///   literal (`'AB''C'` reads as `AB'C`); free names end at structural
///   symbols or whitespace and translate `_` to a space.
/// - Comments nest to arbitrary depth; a body equal to `&r`/`&u` (trimmed,
///   case-insensitive) becomes a rooted/unrooted directive token.
/// - In single-tree mode the scanner stops supplying tokens after the first
///   terminal symbol; sequence mode scans multi-tree streams.
///
/// # Example
/// ```
/// use phylostream::newick::scanner::{NewickScanner, NewickToken};
/// use phylostream::parser::TextParser;
///
/// let mut parser = TextParser::for_str("(A:1.0);");
/// let mut scanner = NewickScanner::new(false);
/// assert_eq!(scanner.next(&mut parser).unwrap(), Some(NewickToken::SubtreeStart));
/// assert_eq!(
///     scanner.next(&mut parser).unwrap(),
///     Some(NewickToken::Name { text: "A".to_string(), delimited: false })
/// );
/// assert_eq!(scanner.next(&mut parser).unwrap(), Some(NewickToken::Length(1.0)));
/// ```
#[derive(Debug)]
pub struct NewickScanner {
    lookahead: Option<NewickToken>,
    branch_length_expected: bool,
    single_tree: bool,
    finished: bool,
}

impl NewickScanner {
    /// Creates a scanner; `single_tree` selects single-tree mode.
    pub fn new(single_tree: bool) -> Self {
        Self {
            lookahead: None,
            branch_length_expected: false,
            single_tree,
            finished: false,
        }
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self, parser: &mut TextParser) -> Result<Option<&NewickToken>, StreamError> {
        if self.lookahead.is_none() {
            self.lookahead = self.scan(parser)?;
        }
        Ok(self.lookahead.as_ref())
    }

    /// Consumes and returns the next token; `None` at end of the stream
    /// (or after the first tree in single-tree mode).
    pub fn next(&mut self, parser: &mut TextParser) -> Result<Option<NewickToken>, StreamError> {
        if let Some(token) = self.lookahead.take() {
            return Ok(Some(token));
        }
        self.scan(parser)
    }

    /// Scans one token from the input.
    fn scan(&mut self, parser: &mut TextParser) -> Result<Option<NewickToken>, StreamError> {
        loop {
            if self.finished {
                return Ok(None);
            }
            parser.skip_whitespace();

            let Some(b) = parser.peek() else {
                if self.branch_length_expected {
                    return Err(StreamError::unexpected_eof(parser));
                }
                return Ok(None);
            };

            match b {
                b'[' => {
                    let body = parser.read_comment_text()?;
                    let trimmed = body.trim();
                    if trimmed.eq_ignore_ascii_case("&r") {
                        return Ok(Some(NewickToken::RootedCommand));
                    }
                    if trimmed.eq_ignore_ascii_case("&u") {
                        return Ok(Some(NewickToken::UnrootedCommand));
                    }
                    return Ok(Some(NewickToken::Comment(body)));
                }
                b':' => {
                    // The separator itself is not a token; it arms length parsing
                    parser.next();
                    self.branch_length_expected = true;
                    continue;
                }
                _ => {}
            }

            if self.branch_length_expected {
                return self.scan_length(parser).map(Some);
            }

            return match b {
                b'(' => {
                    parser.next();
                    Ok(Some(NewickToken::SubtreeStart))
                }
                b')' => {
                    parser.next();
                    Ok(Some(NewickToken::SubtreeEnd))
                }
                b',' => {
                    parser.next();
                    Ok(Some(NewickToken::ElementSeparator))
                }
                b';' => {
                    parser.next();
                    if self.single_tree {
                        self.finished = true;
                    }
                    Ok(Some(NewickToken::TerminalSymbol))
                }
                b'\'' | b'"' => {
                    let text = parser.read_delimited(b)?;
                    Ok(Some(NewickToken::Name { text, delimited: true }))
                }
                _ => {
                    let text = parser.read_unquoted(NAME_DELIMITERS, true);
                    if text.is_empty() {
                        return Err(StreamError::malformed_syntax(
                            parser,
                            format!("unexpected character '{}'", b as char),
                        ));
                    }
                    Ok(Some(NewickToken::Name { text, delimited: false }))
                }
            };
        }
    }

    /// Scans the numeric branch length armed by a preceding `:`.
    fn scan_length(&mut self, parser: &mut TextParser) -> Result<NewickToken, StreamError> {
        let mut number = String::new();
        while let Some(b) = parser.peek() {
            if b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E') {
                number.push(b as char);
                parser.next();
            } else {
                break;
            }
        }

        let value: f64 = number.parse().map_err(|_| {
            StreamError::malformed_syntax(parser, format!("invalid branch length: '{number}'"))
        })?;
        self.branch_length_expected = false;
        Ok(NewickToken::Length(value))
    }
}
