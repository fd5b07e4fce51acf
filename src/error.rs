//! Error types shared by all readers, writers, and translators.
//!
//! This module provides [StreamError] and [StreamErrorKind] for representing
//! and reporting errors that occur while reading or writing phylogenetic
//! documents. Reader-side errors carry the byte position and a short excerpt
//! of the input following the offending location.

use crate::event::{ContentCategory, TopologyKind};
use crate::parser::text_parser::TextParser;
use std::error::Error;
use std::fmt;

/// Default length of input excerpt attached to reader-side errors
const DEFAULT_CONTEXT_LENGTH: usize = 50;

// =#========================================================================#=
// STREAM ERROR KIND
// =#========================================================================#=
/// The kinds of errors raised by readers, writers, translators, and adapters.
///
/// Each kind corresponds to one failure class:
/// - [Io](StreamErrorKind::Io) - an underlying I/O failure, wrapped with its message
/// - [MalformedSyntax](StreamErrorKind::MalformedSyntax) - a reader hit an invalid
///   token or structure; fatal to the current parse
/// - [UnexpectedEof](StreamErrorKind::UnexpectedEof) - input ended inside an element
/// - [UnclosedComment](StreamErrorKind::UnclosedComment) - a `[` without matching `]`
/// - [IllegalEvent](StreamErrorKind::IllegalEvent) - an event the nesting grammar
///   forbids in the current state; fatal for that read or write
/// - [InvalidObjectData](StreamErrorKind::InvalidObjectData) - a translator could not
///   parse a representation; recoverable at the call site
/// - [InconsistentAdapterData](StreamErrorKind::InconsistentAdapterData) - a data
///   adapter referenced an element that was never declared; a contract violation
///   in the caller-supplied adapter
/// - [UnknownId](StreamErrorKind::UnknownId) - an ID passed to an adapter that its
///   enumerator never produced
/// - [UnsupportedFormatFeature](StreamErrorKind::UnsupportedFormatFeature) - a
///   construct this implementation deliberately does not handle
#[derive(PartialEq, Debug, Clone)]
pub enum StreamErrorKind {
    Io(String),
    MalformedSyntax(String),
    UnexpectedEof,
    UnclosedComment,
    IllegalEvent {
        category: ContentCategory,
        topology: TopologyKind,
        parent: Option<ContentCategory>,
    },
    InvalidObjectData(String),
    InconsistentAdapterData(String),
    UnknownId(String),
    UnsupportedFormatFeature(String),
}

// =#========================================================================#=
// STREAM ERROR
// =#========================================================================#=
/// Error with contextual information (position and surrounding bytes where known).
///
/// Writer- and adapter-side errors have no input position; their `position`
/// is zero and `context` is empty.
#[derive(Debug)]
pub struct StreamError {
    kind: StreamErrorKind,
    position: usize,
    context: String,
}

impl StreamError {
    /// Create a StreamError from an error kind and the current parser state.
    pub fn from_parser(kind: StreamErrorKind, parser: &TextParser) -> Self {
        Self {
            kind,
            position: parser.position(),
            context: parser.context_as_string(DEFAULT_CONTEXT_LENGTH),
        }
    }

    /// Create a StreamError without parser context (writer/adapter side).
    pub fn new(kind: StreamErrorKind) -> Self {
        Self { kind, position: 0, context: String::new() }
    }

    /// Convenience constructor for MalformedSyntax at the current parser position.
    pub fn malformed_syntax(parser: &TextParser, msg: impl Into<String>) -> Self {
        Self::from_parser(StreamErrorKind::MalformedSyntax(msg.into()), parser)
    }

    /// Convenience constructor for UnexpectedEof at the current parser position.
    pub fn unexpected_eof(parser: &TextParser) -> Self {
        Self::from_parser(StreamErrorKind::UnexpectedEof, parser)
    }

    /// Convenience constructor for UnclosedComment at the current parser position.
    pub fn unclosed_comment(parser: &TextParser) -> Self {
        Self::from_parser(StreamErrorKind::UnclosedComment, parser)
    }

    /// Convenience constructor for IllegalEvent, carrying the offending event
    /// shape and the category currently open on the grammar stack.
    pub fn illegal_event(
        category: ContentCategory,
        topology: TopologyKind,
        parent: Option<ContentCategory>,
    ) -> Self {
        Self::new(StreamErrorKind::IllegalEvent { category, topology, parent })
    }

    /// Convenience constructor for InvalidObjectData.
    pub fn invalid_object_data(msg: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::InvalidObjectData(msg.into()))
    }

    /// Convenience constructor for InconsistentAdapterData.
    pub fn inconsistent_adapter_data(msg: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::InconsistentAdapterData(msg.into()))
    }

    /// Convenience constructor for UnknownId.
    pub fn unknown_id(id: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::UnknownId(id.into()))
    }

    /// Convenience constructor for UnsupportedFormatFeature.
    pub fn unsupported_feature(msg: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::UnsupportedFormatFeature(msg.into()))
    }

    /// Get the error kind
    pub fn kind(&self) -> &StreamErrorKind {
        &self.kind
    }

    /// Get the input position where the error occurred (0 if not applicable)
    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Main error message
        match &self.kind {
            StreamErrorKind::Io(msg) => write!(f, "IO error - {msg}")?,
            StreamErrorKind::MalformedSyntax(msg) => write!(f, "Malformed syntax: {msg}")?,
            StreamErrorKind::UnexpectedEof => write!(f, "Unexpected end of input")?,
            StreamErrorKind::UnclosedComment => write!(f, "Unclosed comment")?,
            StreamErrorKind::IllegalEvent { category, topology, parent } => {
                write!(f, "Illegal event {category:?} ({topology:?})")?;
                match parent {
                    Some(parent) => write!(f, " under open element {parent:?}")?,
                    None => write!(f, " at document level")?,
                }
            }
            StreamErrorKind::InvalidObjectData(msg) => write!(f, "Invalid object data: {msg}")?,
            StreamErrorKind::InconsistentAdapterData(msg) => {
                write!(f, "Inconsistent adapter data: {msg}")?
            }
            StreamErrorKind::UnknownId(id) => {
                write!(f, "ID '{id}' was not declared by the data source")?
            }
            StreamErrorKind::UnsupportedFormatFeature(msg) => {
                write!(f, "Unsupported format feature: {msg}")?
            }
        }

        // Additional position information, if the error came from a parser
        if self.position > 0 || !self.context.is_empty() {
            write!(f, " at position {}", self.position)?;
        }
        if !self.context.is_empty() {
            write!(f, "\n  Context (next {} bytes): {}", self.context.len(), self.context)?;
        }

        Ok(())
    }
}

impl Error for StreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError {
            kind: StreamErrorKind::Io(err.to_string()),
            position: 0,
            context: String::new(),
        }
    }
}
