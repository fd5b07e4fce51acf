//! The nesting grammar all readers and writers obey.
//!
//! A single static table maps every parent category to the child categories
//! legal directly beneath it. [GrammarChecker] applies that table against an
//! explicit stack of open categories; readers run every event they are about
//! to hand out through a checker, and writers run every event they receive.
//! The table is the single source of truth for format-independent validity.

use crate::error::StreamError;
use crate::event::{ContentCategory, Event, TopologyKind};
use once_cell::sync::Lazy;
use std::collections::HashMap;

use ContentCategory::*;

/// Child categories legal at document level (no open element).
const TOP_LEVEL: &[ContentCategory] = &[Document];

/// The parent -> allowed-children table.
///
/// Comment is legal under every open category and is therefore listed in
/// every entry. Categories absent as keys admit no children at all (their
/// events are Sole, or Start/End pairs enclosing nothing).
static ALLOWED_CHILDREN: Lazy<HashMap<ContentCategory, &'static [ContentCategory]>> =
    Lazy::new(|| {
        let mut table: HashMap<ContentCategory, &'static [ContentCategory]> = HashMap::new();
        table.insert(
            Document,
            &[
                OtuList, Alignment, TreeNetworkGroup, OtuSet, SequenceSet, TreeNetworkSet,
                CharacterSet, ResourceMeta, LiteralMeta, Comment, UnknownCommand,
            ],
        );
        table.insert(OtuList, &[Otu, ResourceMeta, LiteralMeta, Comment, UnknownCommand]);
        table.insert(Otu, &[ResourceMeta, LiteralMeta, Comment]);
        table.insert(
            Alignment,
            &[
                CharacterDefinition, TokenSetDefinition, Sequence, ResourceMeta, LiteralMeta,
                Comment, UnknownCommand,
            ],
        );
        table.insert(CharacterDefinition, &[ResourceMeta, LiteralMeta, Comment]);
        table.insert(
            Sequence,
            &[SequenceTokens, SingleSequenceToken, ResourceMeta, LiteralMeta, Comment],
        );
        table.insert(SingleSequenceToken, &[ResourceMeta, LiteralMeta, Comment]);
        table.insert(
            TokenSetDefinition,
            &[SingleTokenDefinition, ResourceMeta, LiteralMeta, Comment],
        );
        table.insert(SingleTokenDefinition, &[ResourceMeta, LiteralMeta, Comment]);
        table.insert(
            TreeNetworkGroup,
            &[Tree, Network, NodeEdgeSet, ResourceMeta, LiteralMeta, Comment, UnknownCommand],
        );
        table.insert(
            Tree,
            &[Node, Edge, RootEdge, NodeEdgeSet, ResourceMeta, LiteralMeta, Comment],
        );
        table.insert(
            Network,
            &[Node, Edge, RootEdge, NodeEdgeSet, ResourceMeta, LiteralMeta, Comment],
        );
        table.insert(Node, &[ResourceMeta, LiteralMeta, Comment]);
        table.insert(Edge, &[ResourceMeta, LiteralMeta, Comment]);
        table.insert(RootEdge, &[ResourceMeta, LiteralMeta, Comment]);
        table.insert(
            CharacterSet,
            &[CharacterSetInterval, SetElement, ResourceMeta, LiteralMeta, Comment],
        );
        table.insert(OtuSet, &[SetElement, ResourceMeta, LiteralMeta, Comment]);
        table.insert(SequenceSet, &[SetElement, ResourceMeta, LiteralMeta, Comment]);
        table.insert(TreeNetworkSet, &[SetElement, ResourceMeta, LiteralMeta, Comment]);
        table.insert(NodeEdgeSet, &[SetElement, ResourceMeta, LiteralMeta, Comment]);
        table.insert(ResourceMeta, &[ResourceMeta, LiteralMeta, Comment]);
        table.insert(LiteralMeta, &[LiteralMetaContent, Comment]);
        table
    });

/// Returns the child categories legal directly beneath `parent`,
/// where `None` means document level.
pub fn allowed_children(parent: Option<ContentCategory>) -> &'static [ContentCategory] {
    match parent {
        None => TOP_LEVEL,
        Some(parent) => ALLOWED_CHILDREN.get(&parent).copied().unwrap_or(&[]),
    }
}

// =#========================================================================#=
// GRAMMAR CHECKER
// =#========================================================================#=
/// Validates an event sequence against the nesting grammar.
///
/// The checker keeps an explicit stack of open categories. Each incoming
/// event is checked against the top of the stack; Start events push their
/// category, End events must match and pop it. A violation raises
/// [StreamErrorKind::IllegalEvent](crate::error::StreamErrorKind::IllegalEvent)
/// carrying the offending event shape and the current stack top.
///
/// Both readers and writers use this type, so an event sequence one reader
/// produces is by construction acceptable to every writer.
#[derive(Debug, Default)]
pub struct GrammarChecker {
    stack: Vec<ContentCategory>,
}

impl GrammarChecker {
    /// Creates a checker with an empty stack (document level).
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Checks one event against the grammar, updating the open-element stack.
    ///
    /// # Errors
    /// Returns an IllegalEvent error if the event is not legal in the
    /// current state. The stack is left unchanged on error.
    pub fn accept(&mut self, event: &Event) -> Result<(), StreamError> {
        let parent = self.stack.last().copied();
        match event.topology() {
            TopologyKind::Start | TopologyKind::Sole => {
                if !allowed_children(parent).contains(&event.category()) {
                    return Err(StreamError::illegal_event(
                        event.category(),
                        event.topology(),
                        parent,
                    ));
                }
                if event.topology() == TopologyKind::Start {
                    self.stack.push(event.category());
                }
            }
            TopologyKind::End => {
                if parent != Some(event.category()) {
                    return Err(StreamError::illegal_event(
                        event.category(),
                        TopologyKind::End,
                        parent,
                    ));
                }
                self.stack.pop();
            }
        }
        Ok(())
    }

    /// The category currently open, or `None` at document level.
    pub fn current(&self) -> Option<ContentCategory> {
        self.stack.last().copied()
    }

    /// Current nesting depth (number of open elements).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether all opened elements have been closed again.
    pub fn is_complete(&self) -> bool {
        self.stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_is_only_top_level_category() {
        assert_eq!(allowed_children(None), &[Document]);
    }

    #[test]
    fn start_end_must_match() {
        let mut checker = GrammarChecker::new();
        checker.accept(&Event::start(Document, "doc0")).unwrap();
        checker.accept(&Event::start(OtuList, "otus0")).unwrap();
        // Closing Document while OtuList is open is illegal
        assert!(checker.accept(&Event::end(Document)).is_err());
        // Correct order works
        checker.accept(&Event::end(OtuList)).unwrap();
        checker.accept(&Event::end(Document)).unwrap();
        assert!(checker.is_complete());
    }

    #[test]
    fn sole_events_do_not_open_elements() {
        let mut checker = GrammarChecker::new();
        checker.accept(&Event::start(Document, "doc0")).unwrap();
        checker.accept(&Event::comment("a comment", false)).unwrap();
        assert_eq!(checker.depth(), 1);
    }
}
