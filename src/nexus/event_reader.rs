//! Pull event reader for Nexus input.
//!
//! [NexusEventReader] handles the `#NEXUS` header and the
//! `BEGIN <block>; ... END;` framing, and hands each command inside a block
//! to a [CommandReader](crate::nexus::commands::CommandReader) from the
//! registry. Blocks map to container elements (TAXA to an OtuList,
//! CHARACTERS/DATA to an Alignment, TREES to a TreeNetworkGroup); container
//! start events are emitted lazily so a TITLE command can still name them.

use crate::error::StreamError;
use crate::event::{ContentCategory, Event, GrammarChecker};
use crate::event::reader::EventReader;
use crate::ids::IdManager;
use crate::nexus::commands::{
    self, CommandContext, CommandReader, UnknownCommandReader,
};
use crate::nexus::context::NexusDocumentContext;
use crate::nexus::defs::{NexusBlock, NEXUS_HEADER, WORD_DELIMITERS};
use crate::params::ReadWriteParameterMap;
use crate::parser::text_parser::TextParser;
use crate::parser::text_source::InMemoryTextSource;
use std::collections::VecDeque;
use std::io::Read;
use std::path::Path;

/// Reader state: which part of the file framing comes next.
#[derive(Debug, PartialEq)]
enum ReaderState {
    Header,
    TopLevel,
    InBlock,
    Finished,
}

// =#========================================================================#=
// NEXUS EVENT READER
// =#========================================================================#=
/// Pull event reader over one Nexus file.
///
/// # Example
/// ```
/// use phylostream::event::{ContentCategory, EventReader};
/// use phylostream::nexus::NexusEventReader;
///
/// let input = "#NEXUS\nBEGIN TAXA; DIMENSIONS NTAX=2; TAXLABELS Kea Kaka; END;";
/// let mut reader = NexusEventReader::from_str(input);
/// let first = reader.next()?.unwrap();
/// assert_eq!(first.category(), ContentCategory::Document);
/// # Ok::<(), phylostream::StreamError>(())
/// ```
pub struct NexusEventReader {
    parser: TextParser,
    params: ReadWriteParameterMap,
    queue: VecDeque<Event>,
    grammar: GrammarChecker,
    ids: IdManager,
    context: NexusDocumentContext,
    state: ReaderState,
    block: Option<NexusBlock>,
    command: Option<Box<dyn CommandReader>>,
}

impl NexusEventReader {
    /// Creates a reader over an already-constructed [TextParser].
    pub fn new(parser: TextParser, params: ReadWriteParameterMap) -> Self {
        Self {
            parser,
            params,
            queue: VecDeque::new(),
            grammar: GrammarChecker::new(),
            ids: IdManager::new(),
            context: NexusDocumentContext::new(),
            state: ReaderState::Header,
            block: None,
            command: None,
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
                ReaderState::Header => self.read_header()?,
                ReaderState::TopLevel => self.read_block_start()?,
                ReaderState::InBlock => self.read_block_content()?,
                ReaderState::Finished => break,
            }
        }
        Ok(())
    }

    fn read_header(&mut self) -> Result<(), StreamError> {
        self.queue
            .push_back(Event::start(ContentCategory::Document, self.ids.create_id("document")));
        self.skip_separators()?;
        if !self.parser.consume_if_word(NEXUS_HEADER) {
            return Err(StreamError::malformed_syntax(
                &self.parser,
                format!("missing {NEXUS_HEADER} header"),
            ));
        }
        log::debug!("starting Nexus document");
        self.state = ReaderState::TopLevel;
        Ok(())
    }

    fn read_block_start(&mut self) -> Result<(), StreamError> {
        self.skip_separators()?;
        if self.parser.is_eof() {
            self.queue.push_back(Event::end(ContentCategory::Document));
            self.state = ReaderState::Finished;
            return Ok(());
        }

        if !self.parser.consume_if_word("BEGIN") {
            return Err(StreamError::malformed_syntax(
                &self.parser,
                "expected BEGIN between blocks",
            ));
        }
        self.skip_separators()?;
        let name = self.parser.read_unquoted(WORD_DELIMITERS, false);
        self.skip_separators()?;
        if name.is_empty() || !self.parser.consume_if(b';') {
            return Err(StreamError::malformed_syntax(&self.parser, "malformed BEGIN command"));
        }

        let block = NexusBlock::from_name(&name);
        if let NexusBlock::Unknown(name) = &block {
            log::debug!("entering unknown block {name}");
        }
        self.context.reset_block_state();
        self.block = Some(block);
        self.state = ReaderState::InBlock;
        Ok(())
    }

    fn read_block_content(&mut self) -> Result<(), StreamError> {
        let block = self.block.clone().unwrap_or(NexusBlock::Unknown(String::new()));

        // A command in progress consumes input before anything else
        if let Some(command) = &mut self.command {
            let mut cc = CommandContext {
                parser: &mut self.parser,
                params: &self.params,
                ids: &mut self.ids,
                context: &mut self.context,
                queue: &mut self.queue,
                block,
            };
            if command.advance(&mut cc)? {
                self.command = None;
            }
            return Ok(());
        }

        self.skip_separators()?;
        if self.parser.is_eof() {
            return Err(StreamError::unexpected_eof(&self.parser));
        }

        let word = self.parser.read_unquoted(WORD_DELIMITERS, false);
        if word.is_empty() {
            return Err(StreamError::malformed_syntax(&self.parser, "expected a command"));
        }

        if word.eq_ignore_ascii_case("END") || word.eq_ignore_ascii_case("ENDBLOCK") {
            self.skip_separators()?;
            if !self.parser.consume_if(b';') {
                return Err(StreamError::malformed_syntax(&self.parser, "unterminated END command"));
            }
            self.close_block(&block);
            self.block = None;
            self.state = ReaderState::TopLevel;
            return Ok(());
        }

        self.command = Some(
            commands::create_command_reader(&block, &word)
                .unwrap_or_else(|| Box::new(UnknownCommandReader::new(word))),
        );
        Ok(())
    }

    /// Closes the block's container element. Containers whose start was never
    /// triggered by a command are still emitted, so every block maps to one
    /// complete element.
    fn close_block(&mut self, block: &NexusBlock) {
        let mut cc = CommandContext {
            parser: &mut self.parser,
            params: &self.params,
            ids: &mut self.ids,
            context: &mut self.context,
            queue: &mut self.queue,
            block: block.clone(),
        };
        match block {
            NexusBlock::Taxa => {
                commands::ensure_otu_list(&mut cc);
                cc.queue.push_back(Event::end(ContentCategory::OtuList));
                cc.context.otu_list_open = false;
            }
            NexusBlock::Characters | NexusBlock::Data => {
                commands::ensure_alignment(&mut cc);
                cc.queue.push_back(Event::end(ContentCategory::Alignment));
                cc.context.alignment_open = false;
                cc.context.sequences_by_label.clear();
                cc.context.sequence_order.clear();
            }
            NexusBlock::Trees => {
                commands::ensure_tree_group(&mut cc);
                cc.queue.push_back(Event::end(ContentCategory::TreeNetworkGroup));
                cc.context.tree_group_open = false;
            }
            NexusBlock::Sets | NexusBlock::Unknown(_) => {}
        }
    }

    /// Skips whitespace and comments between commands, queuing the comments.
    fn skip_separators(&mut self) -> Result<(), StreamError> {
        let mut cc = CommandContext {
            parser: &mut self.parser,
            params: &self.params,
            ids: &mut self.ids,
            context: &mut self.context,
            queue: &mut self.queue,
            block: self.block.clone().unwrap_or(NexusBlock::Unknown(String::new())),
        };
        commands::skip_separators(&mut cc)
    }
}

impl EventReader for NexusEventReader {
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
