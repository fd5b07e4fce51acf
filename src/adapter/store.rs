//! Ready-made adapter implementations over owned event buffers.
//!
//! The `Stored*` types implement the adapter traits over plain vectors, so a
//! whole document can be loaded from any [EventReader] with
//! [StoredDocument::from_reader] and handed to any writer. Applications with
//! their own data model implement the traits directly instead.

use crate::adapter::{
    DocumentDataAdapter, EventReceiver, MatrixDataAdapter, ObjectListAdapter,
    TreeNetworkDataAdapter, TreeNetworkGroupAdapter,
};
use crate::error::StreamError;
use crate::event::{ContentCategory, Event, EventPayload, TopologyKind};
use crate::event::reader::EventReader;
use std::collections::HashMap;

// =#========================================================================#=
// COLLECTING RECEIVER
// =#========================================================================#=
/// Receiver that collects pushed events into a vector.
///
/// An optional capacity turns it into an early-exit receiver: once the limit
/// is reached, [add](EventReceiver::add) returns `Ok(false)` and drops
/// further events.
#[derive(Debug, Default)]
pub struct CollectingReceiver {
    events: Vec<Event>,
    limit: Option<usize>,
}

impl CollectingReceiver {
    /// Creates an unbounded collecting receiver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a receiver that requests an early exit after `limit` events.
    pub fn with_limit(limit: usize) -> Self {
        Self { events: Vec::new(), limit: Some(limit) }
    }

    /// The events collected so far.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Consumes the receiver, returning the collected events.
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl EventReceiver for CollectingReceiver {
    fn add(&mut self, event: Event) -> Result<bool, StreamError> {
        if let Some(limit) = self.limit {
            if self.events.len() >= limit {
                return Ok(false);
            }
        }
        self.events.push(event);
        Ok(match self.limit {
            Some(limit) => self.events.len() < limit,
            None => true,
        })
    }
}

// =#========================================================================#=
// STORED OBJECT LIST
// =#========================================================================#=
/// One stored list element: its start event plus nested content events.
#[derive(Debug, Clone)]
struct StoredEntry {
    start: Event,
    content: Vec<Event>,
}

/// [ObjectListAdapter] over an owned, ordered element buffer.
#[derive(Debug, Default)]
pub struct StoredObjectList {
    id: String,
    label: Option<String>,
    entries: Vec<StoredEntry>,
    index: HashMap<String, usize>,
}

impl StoredObjectList {
    /// Creates an empty list with the given identity.
    pub fn new(id: impl Into<String>, label: Option<String>) -> Self {
        Self {
            id: id.into(),
            label,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Appends one element. `start` must carry an ID; duplicate IDs replace
    /// the earlier element's content.
    pub fn push(&mut self, start: Event, content: Vec<Event>) {
        let Some(id) = start.id().map(str::to_string) else {
            log::warn!("dropping list element without an ID");
            return;
        };
        match self.index.get(&id) {
            Some(&i) => self.entries[i] = StoredEntry { start, content },
            None => {
                self.index.insert(id, self.entries.len());
                self.entries.push(StoredEntry { start, content });
            }
        }
    }

    /// Convenience for building OTU lists by hand.
    pub fn push_otu(&mut self, id: impl Into<String>, label: impl Into<String>) {
        let start = Event::start(ContentCategory::Otu, id).with_label(label);
        self.push(start, Vec::new());
    }
}

impl ObjectListAdapter for StoredObjectList {
    fn list_id(&self) -> &str {
        &self.id
    }

    fn list_label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn count(&self) -> u64 {
        self.entries.len() as u64
    }

    fn id_iterator(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(
            self.entries
                .iter()
                .filter_map(|entry| entry.start.id().map(str::to_string)),
        )
    }

    fn start_event(&self, id: &str) -> Result<Event, StreamError> {
        match self.index.get(id) {
            Some(&i) => Ok(self.entries[i].start.clone()),
            None => Err(StreamError::unknown_id(id)),
        }
    }

    fn write_content(
        &self,
        receiver: &mut dyn EventReceiver,
        id: &str,
    ) -> Result<(), StreamError> {
        let Some(&i) = self.index.get(id) else {
            return Err(StreamError::unknown_id(id));
        };
        for event in &self.entries[i].content {
            if !receiver.add(event.clone())? {
                return Ok(());
            }
        }
        Ok(())
    }
}

// =#========================================================================#=
// STORED MATRIX
// =#========================================================================#=
/// One stored sequence: start event, token row, and nested content events.
#[derive(Debug, Clone)]
struct StoredSequence {
    start: Event,
    tokens: Vec<String>,
    content: Vec<Event>,
}

/// [MatrixDataAdapter] over owned sequence buffers.
#[derive(Debug, Default)]
pub struct StoredMatrix {
    id: String,
    label: Option<String>,
    linked_otu_list_id: Option<String>,
    sequences: Vec<StoredSequence>,
    index: HashMap<String, usize>,
}

impl StoredMatrix {
    /// Creates an empty matrix with the given identity.
    pub fn new(
        id: impl Into<String>,
        label: Option<String>,
        linked_otu_list_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label,
            linked_otu_list_id,
            sequences: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Appends a sequence built from its parts.
    pub fn push_sequence(
        &mut self,
        id: impl Into<String>,
        label: impl Into<String>,
        linked_otu_id: Option<String>,
        tokens: Vec<String>,
    ) {
        let id = id.into();
        let mut start = Event::start(ContentCategory::Sequence, id.clone()).with_label(label);
        if let Some(otu) = linked_otu_id {
            start = start.with_linked_id(otu);
        }
        self.index.insert(id, self.sequences.len());
        self.sequences.push(StoredSequence { start, tokens, content: Vec::new() });
    }

    /// Begins or resumes the sequence of a start event; returns its index.
    /// Resumption by ID is how interleaved input accumulates one row.
    fn begin_sequence(&mut self, start: Event) -> Option<usize> {
        let id = start.id()?.to_string();
        match self.index.get(&id) {
            Some(&i) => Some(i),
            None => {
                self.index.insert(id, self.sequences.len());
                self.sequences.push(StoredSequence {
                    start,
                    tokens: Vec::new(),
                    content: Vec::new(),
                });
                Some(self.sequences.len() - 1)
            }
        }
    }

    /// The token row of one sequence.
    pub fn tokens(&self, id: &str) -> Option<&[String]> {
        self.index.get(id).map(|&i| self.sequences[i].tokens.as_slice())
    }
}

impl ObjectListAdapter for StoredMatrix {
    fn list_id(&self) -> &str {
        &self.id
    }

    fn list_label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn count(&self) -> u64 {
        self.sequences.len() as u64
    }

    fn id_iterator(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(
            self.sequences
                .iter()
                .filter_map(|seq| seq.start.id().map(str::to_string)),
        )
    }

    fn start_event(&self, id: &str) -> Result<Event, StreamError> {
        match self.index.get(id) {
            Some(&i) => Ok(self.sequences[i].start.clone()),
            None => Err(StreamError::unknown_id(id)),
        }
    }

    fn write_content(
        &self,
        receiver: &mut dyn EventReceiver,
        id: &str,
    ) -> Result<(), StreamError> {
        let Some(&i) = self.index.get(id) else {
            return Err(StreamError::unknown_id(id));
        };
        let sequence = &self.sequences[i];
        if !sequence.tokens.is_empty() {
            let tokens = Event::sole(ContentCategory::SequenceTokens)
                .with_payload(EventPayload::Tokens(sequence.tokens.clone()));
            if !receiver.add(tokens)? {
                return Ok(());
            }
        }
        for event in &sequence.content {
            if !receiver.add(event.clone())? {
                return Ok(());
            }
        }
        Ok(())
    }
}

impl MatrixDataAdapter for StoredMatrix {
    fn column_count(&self) -> Option<u64> {
        let mut lengths = self.sequences.iter().map(|seq| seq.tokens.len() as u64);
        let first = lengths.next()?;
        if lengths.all(|len| len == first) {
            Some(first)
        } else {
            None
        }
    }

    fn linked_otu_list_id(&self) -> Option<&str> {
        self.linked_otu_list_id.as_deref()
    }

    fn sequence_length(&self, id: &str) -> Result<u64, StreamError> {
        match self.index.get(id) {
            Some(&i) => Ok(self.sequences[i].tokens.len() as u64),
            None => Err(StreamError::unknown_id(id)),
        }
    }

    fn write_sequence_tokens(
        &self,
        receiver: &mut dyn EventReceiver,
        id: &str,
        first: u64,
        last: u64,
    ) -> Result<(), StreamError> {
        let Some(&i) = self.index.get(id) else {
            return Err(StreamError::unknown_id(id));
        };
        let tokens = &self.sequences[i].tokens;
        if first > last || last as usize > tokens.len() {
            return Err(StreamError::inconsistent_adapter_data(format!(
                "interval [{first}, {last}) exceeds sequence '{id}' of length {}",
                tokens.len()
            )));
        }
        let slice = tokens[first as usize..last as usize].to_vec();
        if !slice.is_empty() {
            receiver.add(
                Event::sole(ContentCategory::SequenceTokens)
                    .with_payload(EventPayload::Tokens(slice)),
            )?;
        }
        Ok(())
    }
}

// =#========================================================================#=
// STORED TREE/NETWORK
// =#========================================================================#=
/// [TreeNetworkDataAdapter] over owned node and edge buffers.
#[derive(Debug, Default)]
pub struct StoredTreeNetwork {
    id: String,
    label: Option<String>,
    is_tree: bool,
    linked_otu_list_id: Option<String>,
    nodes: Vec<StoredEntry>,
    node_index: HashMap<String, usize>,
    edges: Vec<StoredEntry>,
    edge_index: HashMap<String, usize>,
}

impl StoredTreeNetwork {
    /// Creates an empty phylogeny with the given identity.
    pub fn new(id: impl Into<String>, label: Option<String>, is_tree: bool) -> Self {
        Self {
            id: id.into(),
            label,
            is_tree,
            linked_otu_list_id: None,
            nodes: Vec::new(),
            node_index: HashMap::new(),
            edges: Vec::new(),
            edge_index: HashMap::new(),
        }
    }

    /// Appends a node built from its parts.
    pub fn push_node(&mut self, id: impl Into<String>, label: Option<String>) {
        let id = id.into();
        let mut start = Event::start(ContentCategory::Node, id.clone());
        if let Some(label) = label {
            start = start.with_label(label);
        }
        self.node_index.insert(id, self.nodes.len());
        self.nodes.push(StoredEntry { start, content: Vec::new() });
    }

    /// Appends an edge built from its parts; `source: None` makes it a root
    /// edge.
    pub fn push_edge(
        &mut self,
        id: impl Into<String>,
        source: Option<String>,
        target: impl Into<String>,
        length: Option<f64>,
    ) {
        let id = id.into();
        let category = if source.is_some() {
            ContentCategory::Edge
        } else {
            ContentCategory::RootEdge
        };
        let start = Event::start(category, id.clone()).with_payload(EventPayload::EdgeInfo {
            source,
            target: target.into(),
            length,
        });
        self.edge_index.insert(id, self.edges.len());
        self.edges.push(StoredEntry { start, content: Vec::new() });
    }

    fn push_node_event(&mut self, start: Event, content: Vec<Event>) {
        if let Some(id) = start.id().map(str::to_string) {
            self.node_index.insert(id, self.nodes.len());
            self.nodes.push(StoredEntry { start, content });
        }
    }

    fn push_edge_event(&mut self, start: Event, content: Vec<Event>) {
        if let Some(id) = start.id().map(str::to_string) {
            self.edge_index.insert(id, self.edges.len());
            self.edges.push(StoredEntry { start, content });
        }
    }
}

impl TreeNetworkDataAdapter for StoredTreeNetwork {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn is_tree(&self) -> bool {
        self.is_tree
    }

    fn linked_otu_list_id(&self) -> Option<&str> {
        self.linked_otu_list_id.as_deref()
    }

    fn node_ids(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(
            self.nodes
                .iter()
                .filter_map(|node| node.start.id().map(str::to_string)),
        )
    }

    fn node_start_event(&self, id: &str) -> Result<Event, StreamError> {
        match self.node_index.get(id) {
            Some(&i) => Ok(self.nodes[i].start.clone()),
            None => Err(StreamError::unknown_id(id)),
        }
    }

    fn write_node_content(
        &self,
        receiver: &mut dyn EventReceiver,
        id: &str,
    ) -> Result<(), StreamError> {
        let Some(&i) = self.node_index.get(id) else {
            return Err(StreamError::unknown_id(id));
        };
        for event in &self.nodes[i].content {
            if !receiver.add(event.clone())? {
                return Ok(());
            }
        }
        Ok(())
    }

    fn edge_ids(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(
            self.edges
                .iter()
                .filter_map(|edge| edge.start.id().map(str::to_string)),
        )
    }

    fn edge_start_event(&self, id: &str) -> Result<Event, StreamError> {
        match self.edge_index.get(id) {
            Some(&i) => Ok(self.edges[i].start.clone()),
            None => Err(StreamError::unknown_id(id)),
        }
    }

    fn write_edge_content(
        &self,
        receiver: &mut dyn EventReceiver,
        id: &str,
    ) -> Result<(), StreamError> {
        let Some(&i) = self.edge_index.get(id) else {
            return Err(StreamError::unknown_id(id));
        };
        for event in &self.edges[i].content {
            if !receiver.add(event.clone())? {
                return Ok(());
            }
        }
        Ok(())
    }
}

// =#========================================================================#=
// STORED TREE/NETWORK GROUP
// =#========================================================================#=
/// [TreeNetworkGroupAdapter] over owned phylogenies.
#[derive(Debug, Default)]
pub struct StoredTreeNetworkGroup {
    id: String,
    label: Option<String>,
    linked_otu_list_id: Option<String>,
    tree_networks: Vec<StoredTreeNetwork>,
}

impl StoredTreeNetworkGroup {
    /// Creates an empty group with the given identity.
    pub fn new(
        id: impl Into<String>,
        label: Option<String>,
        linked_otu_list_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label,
            linked_otu_list_id,
            tree_networks: Vec::new(),
        }
    }

    /// Appends one phylogeny.
    pub fn push(&mut self, tree_network: StoredTreeNetwork) {
        self.tree_networks.push(tree_network);
    }
}

impl TreeNetworkGroupAdapter for StoredTreeNetworkGroup {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn linked_otu_list_id(&self) -> Option<&str> {
        self.linked_otu_list_id.as_deref()
    }

    fn tree_networks(&self) -> Vec<&dyn TreeNetworkDataAdapter> {
        self.tree_networks
            .iter()
            .map(|tree| tree as &dyn TreeNetworkDataAdapter)
            .collect()
    }
}

// =#========================================================================#=
// STORED DOCUMENT
// =#========================================================================#=
/// [DocumentDataAdapter] over owned buffers; loadable from any reader.
#[derive(Default)]
pub struct StoredDocument {
    otu_lists: Vec<StoredObjectList>,
    matrices: Vec<StoredMatrix>,
    tree_network_groups: Vec<StoredTreeNetworkGroup>,
}

impl StoredDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a whole document by draining an event reader.
    ///
    /// Interleaved sequence parts arriving under the same ID are concatenated
    /// into one row. Element kinds the store does not model (sets, token set
    /// definitions, metadata outside nodes and edges) are skipped.
    ///
    /// # Errors
    /// Any error of the underlying reader.
    pub fn from_reader<R: EventReader>(reader: &mut R) -> Result<Self, StreamError> {
        let mut document = StoredDocument::new();
        let mut open_sequence: Option<usize> = None;

        while let Some(event) = reader.next()? {
            match (event.category(), event.topology()) {
                (ContentCategory::Document, _) => {}
                (ContentCategory::Comment, _) => {}

                (ContentCategory::OtuList, TopologyKind::Start) => {
                    document.otu_lists.push(StoredObjectList::new(
                        event.id().unwrap_or_default(),
                        event.label().map(str::to_string),
                    ));
                }
                (ContentCategory::OtuList, TopologyKind::End) => {}
                (ContentCategory::Otu, TopologyKind::Start) => {
                    let content = collect_until_end(reader, ContentCategory::Otu)?;
                    if let Some(list) = document.otu_lists.last_mut() {
                        list.push(event, content);
                    }
                }

                (ContentCategory::Alignment, TopologyKind::Start) => {
                    document.matrices.push(StoredMatrix::new(
                        event.id().unwrap_or_default(),
                        event.label().map(str::to_string),
                        event.linked_id().map(str::to_string),
                    ));
                }
                (ContentCategory::Alignment, TopologyKind::End) => {}
                (ContentCategory::Sequence, TopologyKind::Start) => {
                    if let Some(matrix) = document.matrices.last_mut() {
                        open_sequence = matrix.begin_sequence(event);
                    }
                }
                (ContentCategory::Sequence, TopologyKind::End) => {
                    open_sequence = None;
                }
                (ContentCategory::SequenceTokens, _) => {
                    if let (Some(i), Some(matrix)) = (open_sequence, document.matrices.last_mut()) {
                        if let EventPayload::Tokens(tokens) = event.payload() {
                            matrix.sequences[i].tokens.extend(tokens.iter().cloned());
                        }
                    }
                }
                (ContentCategory::SingleSequenceToken, _) => {
                    if let (Some(i), Some(matrix)) = (open_sequence, document.matrices.last_mut()) {
                        if let EventPayload::Token(token) = event.payload() {
                            matrix.sequences[i].tokens.push(token.clone());
                        }
                    }
                }

                (ContentCategory::TreeNetworkGroup, TopologyKind::Start) => {
                    document.tree_network_groups.push(StoredTreeNetworkGroup::new(
                        event.id().unwrap_or_default(),
                        event.label().map(str::to_string),
                        event.linked_id().map(str::to_string),
                    ));
                }
                (ContentCategory::TreeNetworkGroup, TopologyKind::End) => {}
                (ContentCategory::Tree, TopologyKind::Start)
                | (ContentCategory::Network, TopologyKind::Start) => {
                    let is_tree = event.category() == ContentCategory::Tree;
                    let tree = load_tree_network(reader, event, is_tree)?;
                    if let Some(group) = document.tree_network_groups.last_mut() {
                        group.push(tree);
                    }
                }

                // Element kinds the store does not model
                (category, TopologyKind::Start) => {
                    log::debug!("skipping unmodeled element {category:?}");
                    collect_until_end(reader, category)?;
                }
                _ => {}
            }
        }

        Ok(document)
    }

    /// The loaded OTU lists.
    pub fn stored_otu_lists(&self) -> &[StoredObjectList] {
        &self.otu_lists
    }

    /// The loaded matrices.
    pub fn stored_matrices(&self) -> &[StoredMatrix] {
        &self.matrices
    }

    /// The loaded tree/network groups.
    pub fn stored_tree_network_groups(&self) -> &[StoredTreeNetworkGroup] {
        &self.tree_network_groups
    }

    /// Adds an OTU list.
    pub fn push_otu_list(&mut self, list: StoredObjectList) {
        self.otu_lists.push(list);
    }

    /// Adds a matrix.
    pub fn push_matrix(&mut self, matrix: StoredMatrix) {
        self.matrices.push(matrix);
    }

    /// Adds a tree/network group.
    pub fn push_tree_network_group(&mut self, group: StoredTreeNetworkGroup) {
        self.tree_network_groups.push(group);
    }
}

impl DocumentDataAdapter for StoredDocument {
    fn otu_lists(&self) -> Vec<&dyn ObjectListAdapter> {
        self.otu_lists
            .iter()
            .map(|list| list as &dyn ObjectListAdapter)
            .collect()
    }

    fn matrices(&self) -> Vec<&dyn MatrixDataAdapter> {
        self.matrices
            .iter()
            .map(|matrix| matrix as &dyn MatrixDataAdapter)
            .collect()
    }

    fn tree_network_groups(&self) -> Vec<&dyn TreeNetworkGroupAdapter> {
        self.tree_network_groups
            .iter()
            .map(|group| group as &dyn TreeNetworkGroupAdapter)
            .collect()
    }
}

/// Collects the events strictly inside an open element, consuming its
/// matching end event. Same-category nesting is tracked by depth.
fn collect_until_end<R: EventReader>(
    reader: &mut R,
    category: ContentCategory,
) -> Result<Vec<Event>, StreamError> {
    let mut events = Vec::new();
    let mut depth = 1usize;
    while let Some(event) = reader.next()? {
        if event.category() == category {
            match event.topology() {
                TopologyKind::Start => depth += 1,
                TopologyKind::End => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(events);
                    }
                }
                TopologyKind::Sole => {}
            }
        }
        events.push(event);
    }
    Ok(events)
}

/// Loads one tree or network subtree into a [StoredTreeNetwork].
fn load_tree_network<R: EventReader>(
    reader: &mut R,
    start: Event,
    is_tree: bool,
) -> Result<StoredTreeNetwork, StreamError> {
    let close_category = start.category();
    let mut tree = StoredTreeNetwork::new(
        start.id().unwrap_or_default(),
        start.label().map(str::to_string),
        is_tree,
    );
    tree.linked_otu_list_id = start.linked_id().map(str::to_string);

    while let Some(event) = reader.next()? {
        match (event.category(), event.topology()) {
            (category, TopologyKind::End) if category == close_category => break,
            (ContentCategory::Node, TopologyKind::Start) => {
                let content = collect_until_end(reader, ContentCategory::Node)?;
                tree.push_node_event(event, content);
            }
            (ContentCategory::Edge, TopologyKind::Start) => {
                let content = collect_until_end(reader, ContentCategory::Edge)?;
                tree.push_edge_event(event, content);
            }
            (ContentCategory::RootEdge, TopologyKind::Start) => {
                let content = collect_until_end(reader, ContentCategory::RootEdge)?;
                tree.push_edge_event(event, content);
            }
            (category, TopologyKind::Start) => {
                collect_until_end(reader, category)?;
            }
            _ => {}
        }
    }

    Ok(tree)
}
