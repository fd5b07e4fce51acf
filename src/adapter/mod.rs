//! The data-adapter contract between applications and writers.
//!
//! Writers never see an application's data model. Instead the application
//! implements the adapter traits in this module over its own structures, and
//! the writer pulls events through them: first the element IDs (to plan
//! declarations, translation tables, and interleaving), then the content of
//! each element on demand. Enumeration must be stable: two passes over the
//! same adapter see the same IDs in the same order.
//!
//! Ready-made adapter implementations over owned event buffers live in
//! [store](crate::adapter::store), together with a receiver that collects
//! events back into such buffers.

pub mod store;

pub use store::{
    CollectingReceiver, StoredDocument, StoredMatrix, StoredObjectList, StoredTreeNetwork,
    StoredTreeNetworkGroup,
};

use crate::error::StreamError;
use crate::event::Event;

// =#========================================================================#=
// EVENT RECEIVER
// =#========================================================================#=
/// Consumer of events pushed by adapters during writing.
///
/// [add](EventReceiver::add) returns `Ok(false)` to request a cooperative
/// early exit: the producer stops pushing further events for the current
/// element and returns normally. This is not an error condition; writers use
/// it to take only the slice of a sequence they need for one interleaved
/// block.
pub trait EventReceiver {
    /// Accepts one event.
    ///
    /// # Returns
    /// * `Ok(true)` - continue pushing events
    /// * `Ok(false)` - stop pushing; the element's remaining events are not
    ///   wanted
    ///
    /// # Errors
    /// Returns IllegalEvent if the event violates the nesting grammar, or
    /// any error of the underlying output.
    fn add(&mut self, event: Event) -> Result<bool, StreamError>;
}

// =#========================================================================#=
// OBJECT LIST ADAPTER
// =#========================================================================#=
/// Access to an identified, ordered list of elements (an OTU list, or the
/// sequences of a matrix).
///
/// Writers make two kinds of passes: ID passes via
/// [id_iterator](ObjectListAdapter::id_iterator) to plan output, and content
/// passes via [start_event](ObjectListAdapter::start_event) and
/// [write_content](ObjectListAdapter::write_content) for each planned ID.
/// Implementations must enumerate the same IDs in the same order on every
/// pass, and must reject IDs they never enumerated with
/// [UnknownId](crate::error::StreamErrorKind::UnknownId).
pub trait ObjectListAdapter {
    /// The ID of the list element itself.
    fn list_id(&self) -> &str;

    /// The display label of the list, if any.
    fn list_label(&self) -> Option<&str>;

    /// Number of elements in the list.
    fn count(&self) -> u64;

    /// Lazily enumerates the element IDs in their defined order.
    fn id_iterator(&self) -> Box<dyn Iterator<Item = String> + '_>;

    /// Produces the start event (ID, label, links) for one element.
    ///
    /// # Errors
    /// Returns UnknownId if `id` was never produced by
    /// [id_iterator](ObjectListAdapter::id_iterator).
    fn start_event(&self, id: &str) -> Result<Event, StreamError>;

    /// Pushes the nested content events of one element, excluding its start
    /// and end events.
    ///
    /// # Errors
    /// Returns UnknownId for a foreign `id`, or any error of the receiver.
    fn write_content(
        &self,
        receiver: &mut dyn EventReceiver,
        id: &str,
    ) -> Result<(), StreamError>;
}

// =#========================================================================#=
// MATRIX DATA ADAPTER
// =#========================================================================#=
/// Access to a character matrix. The list elements are its sequences.
pub trait MatrixDataAdapter: ObjectListAdapter {
    /// Number of columns, when all sequences share one length. `None` means
    /// the matrix is ragged or the count is not known up front.
    fn column_count(&self) -> Option<u64>;

    /// The ID of the OTU list this matrix links, if any.
    fn linked_otu_list_id(&self) -> Option<&str>;

    /// Length of one sequence in tokens.
    ///
    /// # Errors
    /// Returns UnknownId for a foreign `id`.
    fn sequence_length(&self, id: &str) -> Result<u64, StreamError>;

    /// Pushes the tokens of the column interval `[first, last)` of one
    /// sequence as SequenceTokens events, respecting the receiver's early
    /// exit.
    ///
    /// # Errors
    /// Returns UnknownId for a foreign `id`, InconsistentAdapterData if the
    /// interval exceeds the sequence, or any error of the receiver.
    fn write_sequence_tokens(
        &self,
        receiver: &mut dyn EventReceiver,
        id: &str,
        first: u64,
        last: u64,
    ) -> Result<(), StreamError>;
}

// =#========================================================================#=
// TREE/NETWORK DATA ADAPTER
// =#========================================================================#=
/// Access to one phylogenetic tree or network.
///
/// Topology is carried by the edge events: a writer reconstructs parent and
/// child relations from the EdgeInfo payloads and reports
/// [InconsistentAdapterData](crate::error::StreamErrorKind::InconsistentAdapterData)
/// when an edge references a node that was never enumerated.
pub trait TreeNetworkDataAdapter {
    /// The ID of the tree or network element.
    fn id(&self) -> &str;

    /// The display label, if any.
    fn label(&self) -> Option<&str>;

    /// Whether this phylogeny is a tree (as opposed to a network).
    fn is_tree(&self) -> bool;

    /// The ID of the OTU list the nodes link, if any.
    fn linked_otu_list_id(&self) -> Option<&str>;

    /// Lazily enumerates the node IDs.
    fn node_ids(&self) -> Box<dyn Iterator<Item = String> + '_>;

    /// Produces the start event of one node.
    ///
    /// # Errors
    /// Returns UnknownId for a foreign `id`.
    fn node_start_event(&self, id: &str) -> Result<Event, StreamError>;

    /// Pushes the nested content events of one node.
    fn write_node_content(
        &self,
        receiver: &mut dyn EventReceiver,
        id: &str,
    ) -> Result<(), StreamError>;

    /// Lazily enumerates the edge IDs, root edges included.
    fn edge_ids(&self) -> Box<dyn Iterator<Item = String> + '_>;

    /// Produces the start event of one edge, carrying its EdgeInfo payload.
    ///
    /// # Errors
    /// Returns UnknownId for a foreign `id`.
    fn edge_start_event(&self, id: &str) -> Result<Event, StreamError>;

    /// Pushes the nested content events of one edge.
    fn write_edge_content(
        &self,
        receiver: &mut dyn EventReceiver,
        id: &str,
    ) -> Result<(), StreamError>;
}

// =#========================================================================#=
// TREE/NETWORK GROUP ADAPTER
// =#========================================================================#=
/// Access to a group of trees and networks sharing one OTU list link.
pub trait TreeNetworkGroupAdapter {
    /// The ID of the group element.
    fn id(&self) -> &str;

    /// The display label, if any.
    fn label(&self) -> Option<&str>;

    /// The ID of the OTU list this group links, if any.
    fn linked_otu_list_id(&self) -> Option<&str>;

    /// The trees and networks of this group, in their defined order.
    fn tree_networks(&self) -> Vec<&dyn TreeNetworkDataAdapter>;
}

// =#========================================================================#=
// DOCUMENT DATA ADAPTER
// =#========================================================================#=
/// Access to a whole document: the root the writers are handed.
pub trait DocumentDataAdapter {
    /// The OTU lists of the document, in their defined order.
    fn otu_lists(&self) -> Vec<&dyn ObjectListAdapter>;

    /// The character matrices of the document, in their defined order.
    fn matrices(&self) -> Vec<&dyn MatrixDataAdapter>;

    /// The tree/network groups of the document, in their defined order.
    fn tree_network_groups(&self) -> Vec<&dyn TreeNetworkGroupAdapter>;
}
