//! Reading and writing the Newick tree format.
//!
//! Newick encodes one tree per string as nested parentheses with optional
//! node names and branch lengths, terminated by `;`. This module provides the
//! tokenizer ([scanner](crate::newick::scanner)), the pull event reader
//! ([NewickEventReader]), and the writer ([NewickEventWriter]), plus quick
//! helpers for the common whole-input cases.
//!
//! Supported beyond the core grammar: nested bracket comments, `[&r]`/`[&u]`
//! rooting directives, NHX annotations on nodes, and (behind a parameter)
//! extended-Newick hybrid node tags.

pub mod event_reader;
pub mod event_writer;
pub mod scanner;

pub use event_reader::NewickEventReader;
pub use event_writer::NewickEventWriter;

use crate::adapter::StoredDocument;
use crate::error::StreamError;
use crate::event::{Event, EventReader};
use crate::params::ReadWriteParameterMap;

/// Reads all events of a Newick string into a vector.
///
/// # Errors
/// Any reader error; the events produced before the error are lost.
///
/// # Example
/// ```
/// use phylostream::event::ContentCategory;
/// use phylostream::newick::read_newick_events;
///
/// let events = read_newick_events("(A:1.0,B:2.0)C;")?;
/// assert_eq!(events.first().unwrap().category(), ContentCategory::Document);
/// # Ok::<(), phylostream::StreamError>(())
/// ```
pub fn read_newick_events(input: &str) -> Result<Vec<Event>, StreamError> {
    let mut reader = NewickEventReader::from_str(input);
    let mut events = Vec::new();
    while let Some(event) = reader.next()? {
        events.push(event);
    }
    Ok(events)
}

/// Loads a Newick string into a [StoredDocument].
///
/// # Errors
/// Any reader error.
pub fn read_newick_document(
    input: &str,
    params: ReadWriteParameterMap,
) -> Result<StoredDocument, StreamError> {
    let mut reader = NewickEventReader::new(crate::parser::TextParser::for_str(input), params);
    StoredDocument::from_reader(&mut reader)
}

/// Writes all trees of a document as Newick strings.
///
/// # Errors
/// Any writer error.
pub fn write_newick_string(document: &StoredDocument) -> Result<String, StreamError> {
    let mut out = Vec::new();
    NewickEventWriter::new().write_document(document, &mut out)?;
    String::from_utf8(out)
        .map_err(|_| StreamError::invalid_object_data("writer produced non-UTF-8 output"))
}
