//! Reading and writing the Nexus file format.
//!
//! Nexus wraps phylogenetic data in `BEGIN <block>; ... END;` blocks of
//! `;`-terminated commands. The reader maps blocks to container elements
//! (TAXA to an OtuList, CHARACTERS/DATA to an Alignment, TREES to a
//! TreeNetworkGroup) and understands DIMENSIONS, TAXLABELS, FORMAT, MATRIX
//! (interleaved included), TRANSLATE, TREE, CHARSET, TAXSET, TREESET, and
//! the all-block TITLE and LINK commands; anything else surfaces as
//! UnknownCommand events rather than an error.

pub mod commands;
pub mod context;
pub mod defs;
pub mod event_reader;
pub mod event_writer;
pub mod sets;

pub use defs::NexusBlock;
pub use event_reader::NexusEventReader;
pub use event_writer::NexusEventWriter;

use crate::adapter::StoredDocument;
use crate::error::StreamError;
use crate::event::{Event, EventReader};
use crate::params::ReadWriteParameterMap;

/// Reads all events of a Nexus string into a vector.
///
/// # Errors
/// Any reader error; the events produced before the error are lost.
pub fn read_nexus_events(input: &str) -> Result<Vec<Event>, StreamError> {
    let mut reader = NexusEventReader::from_str(input);
    let mut events = Vec::new();
    while let Some(event) = reader.next()? {
        events.push(event);
    }
    Ok(events)
}

/// Loads a Nexus string into a [StoredDocument].
///
/// # Errors
/// Any reader error.
///
/// # Example
/// ```
/// use phylostream::nexus::read_nexus_document;
/// use phylostream::ReadWriteParameterMap;
///
/// let input = "#NEXUS\nBEGIN TAXA; DIMENSIONS NTAX=2; TAXLABELS Kea Kaka; END;";
/// let document = read_nexus_document(input, ReadWriteParameterMap::default())?;
/// assert_eq!(document.stored_otu_lists().len(), 1);
/// # Ok::<(), phylostream::StreamError>(())
/// ```
pub fn read_nexus_document(
    input: &str,
    params: ReadWriteParameterMap,
) -> Result<StoredDocument, StreamError> {
    let mut reader = NexusEventReader::new(crate::parser::TextParser::for_str(input), params);
    StoredDocument::from_reader(&mut reader)
}

/// Writes a document as a Nexus string.
///
/// # Errors
/// Any writer error.
pub fn write_nexus_string(
    document: &StoredDocument,
    params: ReadWriteParameterMap,
) -> Result<String, StreamError> {
    let mut out = Vec::new();
    NexusEventWriter::new(params).write_document(document, &mut out)?;
    String::from_utf8(out)
        .map_err(|_| StreamError::invalid_object_data("writer produced non-UTF-8 output"))
}
