//! The format-independent event model.
//!
//! Every reader in this crate emits, and every writer accepts, the same
//! vocabulary of [Event]s: a content category (what kind of element), a
//! topology kind (whether the event opens, closes, or stands alone), optional
//! identity fields, and a variant-specific payload. Application code written
//! against this vocabulary is decoupled from the concrete file format.
//!
//! The nesting rules that make an event sequence valid live in
//! [grammar](crate::event::grammar); the pull interface readers expose lives
//! in [reader](crate::event::reader).

pub mod grammar;
pub mod reader;

pub use grammar::GrammarChecker;
pub use reader::EventReader;

// =#========================================================================#=
// CONTENT CATEGORY
// =#========================================================================#=
/// The semantic kind of a data element in the event grammar.
///
/// This is a closed set: formats may leave categories unused, but may not
/// invent new ones. Unrecognized format constructs surface as
/// [UnknownCommand](ContentCategory::UnknownCommand) events instead.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ContentCategory {
    Document,
    OtuList,
    Otu,
    Alignment,
    CharacterDefinition,
    Sequence,
    SequenceTokens,
    SingleSequenceToken,
    TreeNetworkGroup,
    Network,
    Tree,
    Node,
    Edge,
    RootEdge,
    TokenSetDefinition,
    SingleTokenDefinition,
    CharacterSet,
    CharacterSetInterval,
    SetElement,
    OtuSet,
    SequenceSet,
    TreeNetworkSet,
    NodeEdgeSet,
    ResourceMeta,
    LiteralMeta,
    LiteralMetaContent,
    Comment,
    UnknownCommand,
}

// =#========================================================================#=
// TOPOLOGY KIND
// =#========================================================================#=
/// Whether an event opens an element, closes one, or stands alone.
///
/// Every `Start` is matched by exactly one `End` of the same category at the
/// same stack depth; `Sole` events bound no children.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TopologyKind {
    Start,
    End,
    Sole,
}

// =#========================================================================#=
// EVENT PAYLOAD
// =#========================================================================#=
/// Variant-specific data carried by an [Event].
///
/// Most events carry no payload beyond their identity fields; the variants
/// here cover the categories that do.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// No additional data
    None,
    /// A run of sequence tokens (SequenceTokens)
    Tokens(Vec<String>),
    /// A single token (SingleSequenceToken, SingleTokenDefinition)
    Token(String),
    /// A 0-based half-open column interval `[first, last)` (CharacterSetInterval)
    Interval { first: u64, last: u64 },
    /// Edge endpoints and optional branch length (Edge, RootEdge).
    /// A root edge has no source node.
    EdgeInfo {
        source: Option<String>,
        target: String,
        length: Option<f64>,
    },
    /// Comment text; `continued` marks a chunk of a comment split because it
    /// exceeded the configured maximum length (Comment)
    CommentText { text: String, continued: bool },
    /// A literal metadata annotation: predicate key, optional datatype
    /// identifier, and textual value (LiteralMeta, LiteralMetaContent)
    Literal {
        predicate: String,
        datatype: Option<String>,
        value: Option<String>,
    },
    /// A resource metadata annotation: relation and reference (ResourceMeta)
    Resource { rel: String, href: String },
    /// Raw text of an element the grammar does not model (UnknownCommand)
    Text(String),
}

// =#========================================================================#=
// EVENT
// =#========================================================================#=
/// One element of a validated event stream.
///
/// An event is a single tagged value rather than a class hierarchy: the
/// [ContentCategory] discriminates what it describes, [TopologyKind] how it
/// nests, and the optional fields carry identity where the category has one.
///
/// - `id` - document-wide unique identifier of the element (where it has one)
/// - `label` - display label as found in (or destined for) the file
/// - `linked_id` - reference to another element's ID (e.g. a node linking its
///   OTU, a set linking the list it selects from)
/// - `terminated` - meaningful on `End` events only; `false` marks a *part
///   end*: a logically identical element with the same ID may resume in a
///   later start event (interleaved formats)
///
/// Events are transient and single-use on the read side; writers treat them
/// as values pulled from the application's data adapters.
///
/// # Example
/// ```
/// use phylostream::event::{Event, ContentCategory, TopologyKind};
///
/// let otu = Event::start(ContentCategory::Otu, "otu3").with_label("Kakapo");
/// assert_eq!(otu.category(), ContentCategory::Otu);
/// assert_eq!(otu.label(), Some("Kakapo"));
///
/// let end = Event::end(ContentCategory::Otu);
/// assert_eq!(end.topology(), TopologyKind::End);
/// assert!(end.is_terminated());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    category: ContentCategory,
    topology: TopologyKind,
    id: Option<String>,
    label: Option<String>,
    linked_id: Option<String>,
    terminated: bool,
    payload: EventPayload,
}

impl Event {
    /// Creates a Start event for an element with the given ID.
    pub fn start(category: ContentCategory, id: impl Into<String>) -> Self {
        Self {
            category,
            topology: TopologyKind::Start,
            id: Some(id.into()),
            label: None,
            linked_id: None,
            terminated: true,
            payload: EventPayload::None,
        }
    }

    /// Creates a Start event for an element without identity (e.g. an
    /// UnknownCommand wrapper).
    pub fn start_unidentified(category: ContentCategory) -> Self {
        Self {
            category,
            topology: TopologyKind::Start,
            id: None,
            label: None,
            linked_id: None,
            terminated: true,
            payload: EventPayload::None,
        }
    }

    /// Creates an End event closing the innermost open element of `category`.
    pub fn end(category: ContentCategory) -> Self {
        Self {
            category,
            topology: TopologyKind::End,
            id: None,
            label: None,
            linked_id: None,
            terminated: true,
            payload: EventPayload::None,
        }
    }

    /// Creates a part-end event: the element is closed for now, but an
    /// element with the same ID may resume later in the stream.
    pub fn part_end(category: ContentCategory) -> Self {
        let mut event = Self::end(category);
        event.terminated = false;
        event
    }

    /// Creates a standalone event that bounds no children.
    pub fn sole(category: ContentCategory) -> Self {
        Self {
            category,
            topology: TopologyKind::Sole,
            id: None,
            label: None,
            linked_id: None,
            terminated: true,
            payload: EventPayload::None,
        }
    }

    /// Creates a Comment event (always Sole).
    ///
    /// # Arguments
    /// * `text` - The comment text, without the enclosing brackets
    /// * `continued` - Whether this chunk is followed by more of the same comment
    pub fn comment(text: impl Into<String>, continued: bool) -> Self {
        Self::sole(ContentCategory::Comment)
            .with_payload(EventPayload::CommentText { text: text.into(), continued })
    }

    /// Sets the element ID, returning the event for chaining.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the display label, returning the event for chaining.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the reference to another element's ID, returning the event for chaining.
    pub fn with_linked_id(mut self, linked_id: impl Into<String>) -> Self {
        self.linked_id = Some(linked_id.into());
        self
    }

    /// Sets the payload, returning the event for chaining.
    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = payload;
        self
    }

    /// The content category of this event.
    pub fn category(&self) -> ContentCategory {
        self.category
    }

    /// The topology kind of this event.
    pub fn topology(&self) -> TopologyKind {
        self.topology
    }

    /// The element ID, if the category carries one.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The display label, if present.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The referenced element ID, if present.
    pub fn linked_id(&self) -> Option<&str> {
        self.linked_id.as_deref()
    }

    /// Whether an End event terminates its element for good.
    ///
    /// Returns `false` only for part-end events; Start and Sole events
    /// always report `true`.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// The variant-specific payload.
    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }
}
