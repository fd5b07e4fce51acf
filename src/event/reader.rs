//! The pull interface every event reader exposes.

use crate::error::StreamError;
use crate::event::Event;

/// Pull-based access to a validated event stream.
///
/// Readers produce events on demand: nothing beyond a small lookahead buffer
/// is parsed before the application asks for it, so arbitrarily large inputs
/// can be processed in bounded memory. Every event handed out has already
/// passed the nesting grammar.
///
/// A reader instance is exclusively owned by its calling thread for its
/// lifetime; there is no internal synchronization.
///
/// # Example
/// ```no_run
/// use phylostream::event::EventReader;
/// use phylostream::newick::NewickEventReader;
///
/// let mut reader = NewickEventReader::from_str("(A:1.0,B:2.0)C;");
/// while let Some(event) = reader.next()? {
///     println!("{:?} {:?}", event.category(), event.topology());
/// }
/// # Ok::<(), phylostream::StreamError>(())
/// ```
pub trait EventReader {
    /// Returns whether another event is available.
    ///
    /// # Errors
    /// Returns an error if producing the next event required parsing input
    /// and that parsing failed.
    fn has_next(&mut self) -> Result<bool, StreamError>;

    /// Returns the next event without consuming it.
    ///
    /// Repeated calls return the same event until [next](EventReader::next)
    /// is called.
    fn peek(&mut self) -> Result<Option<&Event>, StreamError>;

    /// Consumes and returns the next event.
    ///
    /// # Errors
    /// Returns MalformedSyntax (with input position) if the input violates
    /// the format grammar, or an I/O error from the underlying stream.
    /// Returns `Ok(None)` once the document end event has been consumed.
    fn next(&mut self) -> Result<Option<Event>, StreamError>;
}
