//! Phylostream is an event-based streaming library for reading and writing
//! phylogenetic file formats.
//!
//! Instead of loading files into one fixed object model, readers emit a
//! format-independent stream of [Event](crate::event::Event)s and writers
//! pull events from application-defined data adapters. Application code
//! written against the event vocabulary works unchanged across formats.
//! Core functionality provided:
//! - Event model: a closed set of content categories with Start/End/Sole
//!   topology, validated against a nesting grammar shared by readers and
//!   writers. See [crate::event].
//! - Newick: a tokenizer and pull event reader/writer for Newick tree
//!   strings, including nested comments, `[&r]`/`[&u]` rooting directives,
//!   NHX annotations, and optional extended-Newick hybrid tags.
//!   See [crate::newick].
//! - Nexus: a command-reader framework covering TAXA, CHARACTERS/DATA
//!   (interleaved matrices included), TREES, and SETS blocks; unrecognized
//!   commands surface as events rather than errors. See [crate::nexus].
//! - Data adapters: writers never see your data model; implement the traits
//!   in [crate::adapter] (or use the in-memory `Stored*` types) and any
//!   writer can serialize it.
//! - Object translation: typed metadata values converted to and from text
//!   by datatype identifier. See [crate::translate].
//!
//! Limitations:
//! - Text formats only (no XML-based formats)
//! - Single-threaded, synchronous processing
//! - ASCII input assumed by the tokenizer layer
//!
//! # Usage patterns
//! Data can be processed in two main ways:
//! 1. Quick access functions read whole inputs into events or an in-memory
//!    document. See [crate::newick] and [crate::nexus] documentation.
//! 2. Construct a reader yourself and pull events one at a time for
//!    streaming access to inputs of any size.
//!
//! ## Example Event Streaming
//!
//! Pull events from a Newick string:
//! ```
//! use phylostream::event::{ContentCategory, EventReader};
//! use phylostream::newick::NewickEventReader;
//!
//! let mut reader = NewickEventReader::from_str("((A:0.1,B:0.2):0.3,C:0.4);");
//! let mut leaves = 0;
//! while let Some(event) = reader.next()? {
//!     if event.category() == ContentCategory::Node && event.label().is_some() {
//!         leaves += 1;
//!     }
//! }
//! assert_eq!(leaves, 3);
//! # Ok::<(), phylostream::StreamError>(())
//! ```
//!
//! ## Example Document Round Trip
//!
//! Load a Nexus file into an in-memory document and write it back:
//! ```no_run
//! use phylostream::adapter::StoredDocument;
//! use phylostream::nexus::{NexusEventReader, NexusEventWriter};
//! use phylostream::ReadWriteParameterMap;
//!
//! let params = ReadWriteParameterMap::default();
//! let mut reader = NexusEventReader::from_file("alignment.nex", params.clone())?;
//! let document = StoredDocument::from_reader(&mut reader)?;
//!
//! let mut out = Vec::new();
//! NexusEventWriter::new(params).write_document(&document, &mut out)?;
//! # Ok::<(), phylostream::StreamError>(())
//! ```

pub mod adapter;
pub mod error;
pub mod event;
pub mod ids;
pub mod newick;
pub mod nexus;
pub mod params;
pub mod parser;
pub mod translate;

pub use crate::error::{StreamError, StreamErrorKind};
pub use crate::params::ReadWriteParameterMap;

// ============================================================================
// Quick Newick API
// ============================================================================
/// Reads all events of a Newick string using default settings.
///
/// See [`newick::read_newick_events`] for full documentation.
pub fn read_newick_events(input: &str) -> Result<Vec<event::Event>, StreamError> {
    newick::read_newick_events(input)
}

// ============================================================================
// Quick Nexus API
// ============================================================================
/// Reads all events of a Nexus string using default settings.
///
/// See [`nexus::read_nexus_events`] for full documentation.
pub fn read_nexus_events(input: &str) -> Result<Vec<event::Event>, StreamError> {
    nexus::read_nexus_events(input)
}

/// Loads a Nexus string into an in-memory document using default settings.
///
/// See [`nexus::read_nexus_document`] for full documentation of this
/// convenience function.
pub fn read_nexus_document(input: &str) -> Result<adapter::StoredDocument, StreamError> {
    nexus::read_nexus_document(input, ReadWriteParameterMap::default())
}
