//! Pull event reader for Newick input.
//!
//! [NewickEventReader] assembles validated events from the token stream of a
//! [NewickScanner]. The tree-assembly core lives in [NewickTreeParser], which
//! is shared with the Nexus reader: a `TREE` command there is a Newick string
//! scanned in single-tree mode.

use crate::error::StreamError;
use crate::event::{ContentCategory, Event, EventPayload, GrammarChecker};
use crate::event::reader::EventReader;
use crate::ids::IdManager;
use crate::newick::scanner::{NewickScanner, NewickToken};
use crate::params::ReadWriteParameterMap;
use crate::parser::text_parser::TextParser;
use crate::parser::text_source::InMemoryTextSource;
use std::collections::{HashMap, VecDeque};
use std::io::Read;
use std::path::Path;

/// Prefix of the hot comment carrying New Hampshire eXtended annotations
const NHX_PREFIX: &str = "&&NHX:";

// =#========================================================================#=
// LABEL RESOLVER
// =#========================================================================#=
/// A resolved reference from a Newick name token to a declared OTU.
/// `id` is `None` for translation entries whose taxon was never declared.
#[derive(Debug, Clone)]
pub(crate) struct OtuReference {
    pub id: Option<String>,
    pub label: String,
}

/// Resolves Newick name tokens against previously declared OTUs.
///
/// Standalone Newick input has no OTU declarations, so names stay verbatim.
/// Inside a Nexus TREES block, names may be TRANSLATE keys, 1-based taxon
/// indices, or verbatim taxon labels; the Nexus reader pre-computes one map
/// covering all accepted key forms.
#[derive(Debug, Default)]
pub(crate) enum NewickLabelResolver {
    /// Names are taken verbatim; no OTU linking happens.
    #[default]
    Verbatim,
    /// Names are looked up in a key -> OTU map; unmatched names stay verbatim.
    Translation(HashMap<String, OtuReference>),
}

impl NewickLabelResolver {
    fn resolve(&self, name: &str) -> Option<&OtuReference> {
        match self {
            NewickLabelResolver::Verbatim => None,
            NewickLabelResolver::Translation(map) => map.get(name),
        }
    }
}

// =#========================================================================#=
// TREE PARSER (event assembly)
// =#========================================================================#=
/// Progress report of one [NewickTreeParser::advance] call.
#[derive(Debug, PartialEq)]
pub(crate) enum TreeProgress {
    /// Events may have been queued; the tree is not complete yet.
    InProgress,
    /// The terminal symbol was consumed and the tree's end event queued.
    TreeFinished,
    /// The token stream ended before any tree content appeared.
    StreamEnd,
}

/// A node whose own tokens have been read but whose place in the topology
/// is not fixed yet.
#[derive(Debug, Default)]
struct PendingNode {
    label: Option<String>,
    length: Option<f64>,
    children: Vec<ChildInfo>,
    /// Metadata events (from NHX hot comments) nested inside this node
    meta: Vec<Event>,
}

/// A finalized child node awaiting its parent edge.
#[derive(Debug)]
struct ChildInfo {
    id: String,
    length: Option<f64>,
}

/// Assembles the events of one phylogeny from Newick tokens.
///
/// The parser keeps a stack of open subtrees (one child list per unclosed
/// `(`) and a pending node whose name/length tokens are still arriving.
/// Nodes are emitted as soon as they are complete: leaves when their tokens
/// end, internal nodes when their subtree closes, followed by the edges to
/// their already-emitted children. The terminal symbol emits an optional
/// root edge and the tree end event.
pub(crate) struct NewickTreeParser {
    scanner: NewickScanner,
    /// Label for the tree start event (set for Nexus `TREE <name> = ...`)
    tree_label: Option<String>,
    /// ID assigned to the tree element when its start event was emitted
    tree_id: Option<String>,
    started: bool,
    finished: bool,
    node_stack: Vec<Vec<ChildInfo>>,
    pending: Option<PendingNode>,
    rooted: Option<bool>,
    /// Extended Newick: hybrid tag -> ID of the first node carrying it
    hybrid_tags: HashMap<String, String>,
}

impl NewickTreeParser {
    /// Creates a parser for one tree; `single_tree` bounds the scanner at
    /// the first terminal symbol (Nexus embedding).
    pub(crate) fn new(tree_label: Option<String>, single_tree: bool) -> Self {
        Self {
            scanner: NewickScanner::new(single_tree),
            tree_label,
            tree_id: None,
            started: false,
            finished: false,
            node_stack: Vec::new(),
            pending: None,
            rooted: None,
            hybrid_tags: HashMap::new(),
        }
    }

    /// The ID assigned to the tree element, once its start event was emitted.
    pub(crate) fn tree_id(&self) -> Option<&str> {
        self.tree_id.as_deref()
    }

    /// The label the tree was constructed with.
    pub(crate) fn tree_label(&self) -> Option<&str> {
        self.tree_label.as_deref()
    }

    /// Consumes tokens until at least one event is queued, the tree ends,
    /// or the stream ends.
    pub(crate) fn advance(
        &mut self,
        parser: &mut TextParser,
        ids: &mut IdManager,
        resolver: &NewickLabelResolver,
        params: &ReadWriteParameterMap,
        queue: &mut VecDeque<Event>,
    ) -> Result<TreeProgress, StreamError> {
        if self.finished {
            return Ok(TreeProgress::TreeFinished);
        }

        loop {
            let Some(token) = self.scanner.next(parser)? else {
                if self.started {
                    return Err(StreamError::unexpected_eof(parser));
                }
                return Ok(TreeProgress::StreamEnd);
            };

            match token {
                NewickToken::RootedCommand => self.rooted = Some(true),
                NewickToken::UnrootedCommand => self.rooted = Some(false),
                NewickToken::Comment(text) => self.handle_comment(text, params, queue),
                NewickToken::SubtreeStart => {
                    self.ensure_started(ids, params, queue);
                    if self.pending.is_some() {
                        return Err(StreamError::malformed_syntax(
                            parser,
                            "subtree may not follow a node name or length",
                        ));
                    }
                    self.node_stack.push(Vec::new());
                }
                NewickToken::Name { text, .. } => {
                    self.ensure_started(ids, params, queue);
                    match &mut self.pending {
                        // A name directly after ')' labels the internal node
                        Some(pending) if !pending.children.is_empty() && pending.label.is_none() => {
                            pending.label = Some(text);
                        }
                        Some(_) => {
                            return Err(StreamError::malformed_syntax(
                                parser,
                                format!("unexpected name '{text}'; missing separator?"),
                            ));
                        }
                        None => {
                            self.pending = Some(PendingNode {
                                label: Some(text),
                                ..PendingNode::default()
                            });
                        }
                    }
                }
                NewickToken::Length(value) => {
                    self.ensure_started(ids, params, queue);
                    let pending = self.pending.get_or_insert_with(PendingNode::default);
                    if pending.length.is_some() {
                        return Err(StreamError::malformed_syntax(
                            parser,
                            "node carries two branch lengths",
                        ));
                    }
                    pending.length = Some(value);
                }
                NewickToken::ElementSeparator => {
                    if self.node_stack.is_empty() {
                        return Err(StreamError::malformed_syntax(
                            parser,
                            "element separator outside any subtree",
                        ));
                    }
                    let child = self.finalize_pending(ids, resolver, params, queue)?;
                    if let Some(level) = self.node_stack.last_mut() {
                        level.push(child);
                    }
                }
                NewickToken::SubtreeEnd => {
                    if self.node_stack.is_empty() {
                        return Err(StreamError::malformed_syntax(parser, "unmatched ')'"));
                    }
                    let child = self.finalize_pending(ids, resolver, params, queue)?;
                    let mut children = self.node_stack.pop().unwrap_or_default();
                    children.push(child);
                    self.pending = Some(PendingNode {
                        children,
                        ..PendingNode::default()
                    });
                }
                NewickToken::TerminalSymbol => {
                    if !self.node_stack.is_empty() {
                        return Err(StreamError::malformed_syntax(
                            parser,
                            "tree ended with unclosed subtree",
                        ));
                    }
                    self.ensure_started(ids, params, queue);
                    self.finish_tree(parser, ids, resolver, params, queue)?;
                    return Ok(TreeProgress::TreeFinished);
                }
            }

            if !queue.is_empty() {
                return Ok(TreeProgress::InProgress);
            }
        }
    }

    /// Emits the tree (or network) start event once, before any node events.
    fn ensure_started(
        &mut self,
        ids: &mut IdManager,
        params: &ReadWriteParameterMap,
        queue: &mut VecDeque<Event>,
    ) {
        if self.started {
            return;
        }
        self.started = true;

        let category = self.phylogeny_category(params);
        let id = ids.create_id("tree");
        self.tree_id = Some(id.clone());
        let mut event = Event::start(category, id);
        if let Some(label) = &self.tree_label {
            event = event.with_label(label.clone());
        }
        queue.push_back(event);
    }

    fn phylogeny_category(&self, params: &ReadWriteParameterMap) -> ContentCategory {
        if params.consider_phylogeny_as_network() {
            ContentCategory::Network
        } else {
            ContentCategory::Tree
        }
    }

    /// Routes a comment either into the pending node's metadata (NHX) or
    /// into the queue as Comment events, chunked at the configured maximum.
    fn handle_comment(
        &mut self,
        text: String,
        params: &ReadWriteParameterMap,
        queue: &mut VecDeque<Event>,
    ) {
        if let Some(nhx) = text.strip_prefix(NHX_PREFIX) {
            if let Some(pending) = &mut self.pending {
                for pair in nhx.split(':') {
                    let (key, value) = match pair.split_once('=') {
                        Some((key, value)) => (key, Some(value.to_string())),
                        None => (pair, None),
                    };
                    pending.meta.push(
                        Event::start(ContentCategory::LiteralMeta, String::new())
                            .with_payload(EventPayload::Literal {
                                predicate: key.to_string(),
                                datatype: Some("xsd:string".to_string()),
                                value: value.clone(),
                            }),
                    );
                    pending.meta.push(
                        Event::sole(ContentCategory::LiteralMetaContent).with_payload(
                            EventPayload::Literal {
                                predicate: key.to_string(),
                                datatype: Some("xsd:string".to_string()),
                                value,
                            },
                        ),
                    );
                    pending.meta.push(Event::end(ContentCategory::LiteralMeta));
                }
                return;
            }
        }

        chunk_comment(&text, params.max_comment_length(), queue);
    }

    /// Turns the pending node into events (node start, metadata, node end,
    /// one edge per child) and returns its child record for the parent.
    fn finalize_pending(
        &mut self,
        ids: &mut IdManager,
        resolver: &NewickLabelResolver,
        params: &ReadWriteParameterMap,
        queue: &mut VecDeque<Event>,
    ) -> Result<ChildInfo, StreamError> {
        let pending = self.pending.take().unwrap_or_default();
        let node_id = ids.create_id("n");

        let mut label = pending.label.clone();
        let mut linked_id: Option<String> = None;

        // Extended Newick: "name#tag" links later tag occurrences to the
        // node that introduced the tag
        if params.expect_extended_newick() {
            if let Some(raw) = &pending.label {
                if let Some((name, tag)) = raw.split_once('#') {
                    label = if name.is_empty() { None } else { Some(name.to_string()) };
                    match self.hybrid_tags.get(tag) {
                        Some(first) => linked_id = Some(first.clone()),
                        None => {
                            self.hybrid_tags.insert(tag.to_string(), node_id.clone());
                        }
                    }
                }
            }
        }

        // OTU resolution (Nexus TRANSLATE keys, indices, or labels)
        if linked_id.is_none() {
            if let Some(otu) = label.as_deref().and_then(|name| resolver.resolve(name)) {
                linked_id = otu.id.clone();
                if params.use_otu_label_as_node_label() {
                    label = Some(otu.label.clone());
                }
            }
        }

        let mut start = Event::start(ContentCategory::Node, node_id.clone());
        if let Some(label) = label {
            start = start.with_label(label);
        }
        if let Some(linked) = linked_id {
            start = start.with_linked_id(linked);
        }
        queue.push_back(start);
        for meta in pending.meta {
            let meta = if meta.category() == ContentCategory::LiteralMeta
                && meta.topology() == crate::event::TopologyKind::Start
            {
                meta.with_id(ids.create_id("meta"))
            } else {
                meta
            };
            queue.push_back(meta);
        }
        queue.push_back(Event::end(ContentCategory::Node));

        for child in pending.children {
            let edge_id = ids.create_id("e");
            queue.push_back(
                Event::start(ContentCategory::Edge, edge_id).with_payload(EventPayload::EdgeInfo {
                    source: Some(node_id.clone()),
                    target: child.id,
                    length: child.length,
                }),
            );
            queue.push_back(Event::end(ContentCategory::Edge));
        }

        Ok(ChildInfo { id: node_id, length: pending.length })
    }

    /// Emits the root node, its root edge where one is modeled, and the
    /// tree end event.
    fn finish_tree(
        &mut self,
        _parser: &mut TextParser,
        ids: &mut IdManager,
        resolver: &NewickLabelResolver,
        params: &ReadWriteParameterMap,
        queue: &mut VecDeque<Event>,
    ) -> Result<(), StreamError> {
        if self.pending.is_some() {
            let root = self.finalize_pending(ids, resolver, params, queue)?;

            // A root edge exists when the root carries a length or the
            // stream declared the tree rooted via the &r directive
            if root.length.is_some() || self.rooted == Some(true) {
                let edge_id = ids.create_id("e");
                queue.push_back(
                    Event::start(ContentCategory::RootEdge, edge_id).with_payload(
                        EventPayload::EdgeInfo {
                            source: None,
                            target: root.id,
                            length: root.length,
                        },
                    ),
                );
                queue.push_back(Event::end(ContentCategory::RootEdge));
            }
        }

        queue.push_back(Event::end(self.phylogeny_category(params)));
        self.finished = true;
        Ok(())
    }
}

/// Queues a comment as one or more Comment events, splitting at `max_length`
/// with the `continued` flag set on every chunk but the last.
pub(crate) fn chunk_comment(text: &str, max_length: usize, queue: &mut VecDeque<Event>) {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_length {
        queue.push_back(Event::comment(text, false));
        return;
    }
    let mut start = 0;
    while start < chars.len() {
        let end = (start + max_length).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        queue.push_back(Event::comment(chunk, end < chars.len()));
        start = end;
    }
}

// =#========================================================================#=
// NEWICK EVENT READER
// =#========================================================================#=
/// Reader state: which part of the document framing has been emitted.
#[derive(Debug, PartialEq)]
enum ReaderState {
    BeforeDocument,
    InDocument,
    Finished,
}

/// Pull event reader over a stream of Newick trees.
///
/// Emits `Document` and `TreeNetworkGroup` framing around one `Tree` (or
/// `Network`, per the parameter map) element per Newick string in the input.
///
/// # Example
/// ```
/// use phylostream::event::{ContentCategory, EventReader};
/// use phylostream::newick::NewickEventReader;
///
/// let mut reader = NewickEventReader::from_str("(A:1.0,B:2.0)C;");
/// let first = reader.next()?.unwrap();
/// assert_eq!(first.category(), ContentCategory::Document);
/// # Ok::<(), phylostream::StreamError>(())
/// ```
pub struct NewickEventReader {
    parser: TextParser,
    params: ReadWriteParameterMap,
    queue: VecDeque<Event>,
    grammar: GrammarChecker,
    ids: IdManager,
    resolver: NewickLabelResolver,
    tree_parser: Option<NewickTreeParser>,
    state: ReaderState,
}

impl NewickEventReader {
    /// Creates a reader over an already-constructed [TextParser].
    pub fn new(parser: TextParser, params: ReadWriteParameterMap) -> Self {
        Self {
            parser,
            params,
            queue: VecDeque::new(),
            grammar: GrammarChecker::new(),
            ids: IdManager::new(),
            resolver: NewickLabelResolver::Verbatim,
            tree_parser: None,
            state: ReaderState::BeforeDocument,
        }
    }

    /// Creates a reader over a string, with default parameters.
    pub fn from_str(input: &str) -> Self {
        Self::new(TextParser::for_str(input), ReadWriteParameterMap::default())
    }

    /// Creates a reader that consumes `reader` up front.
    pub fn from_reader<R: Read>(
        reader: R,
        params: ReadWriteParameterMap,
    ) -> Result<Self, StreamError> {
        let source = InMemoryTextSource::from_reader(reader)?;
        Ok(Self::new(TextParser::new(Box::new(source)), params))
    }

    /// Creates a reader over the contents of a file.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        params: ReadWriteParameterMap,
    ) -> Result<Self, StreamError> {
        let source = InMemoryTextSource::from_file(path)?;
        Ok(Self::new(TextParser::new(Box::new(source)), params))
    }

    /// Parses input until at least one event is queued or the document ends.
    fn fill_queue(&mut self) -> Result<(), StreamError> {
        while self.queue.is_empty() && self.state != ReaderState::Finished {
            match self.state {
                ReaderState::BeforeDocument => {
                    log::debug!("starting Newick document");
                    self.queue
                        .push_back(Event::start(ContentCategory::Document, self.ids.create_id("document")));
                    self.queue.push_back(Event::start(
                        ContentCategory::TreeNetworkGroup,
                        self.ids.create_id("tng"),
                    ));
                    self.state = ReaderState::InDocument;
                }
                ReaderState::InDocument => match &mut self.tree_parser {
                    Some(tree_parser) => {
                        let progress = tree_parser.advance(
                            &mut self.parser,
                            &mut self.ids,
                            &self.resolver,
                            &self.params,
                            &mut self.queue,
                        )?;
                        match progress {
                            TreeProgress::TreeFinished | TreeProgress::StreamEnd => {
                                self.tree_parser = None;
                            }
                            TreeProgress::InProgress => {}
                        }
                    }
                    None => {
                        self.parser.skip_whitespace();
                        if self.parser.is_eof() {
                            self.queue.push_back(Event::end(ContentCategory::TreeNetworkGroup));
                            self.queue.push_back(Event::end(ContentCategory::Document));
                            self.state = ReaderState::Finished;
                        } else {
                            // Each tree gets a fresh single-tree scanner
                            self.tree_parser = Some(NewickTreeParser::new(None, true));
                        }
                    }
                },
                ReaderState::Finished => break,
            }
        }
        Ok(())
    }
}

impl EventReader for NewickEventReader {
    fn has_next(&mut self) -> Result<bool, StreamError> {
        self.fill_queue()?;
        Ok(!self.queue.is_empty())
    }

    fn peek(&mut self) -> Result<Option<&Event>, StreamError> {
        self.fill_queue()?;
        Ok(self.queue.front())
    }

    fn next(&mut self) -> Result<Option<Event>, StreamError> {
        self.fill_queue()?;
        match self.queue.pop_front() {
            Some(event) => {
                self.grammar.accept(&event)?;
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }
}
