//! The Nexus command-reader framework and the built-in commands.
//!
//! The event reader hands every command to a [CommandReader] looked up in
//! the compile-time registry [create_command_reader]. A command reader
//! consumes input through the shared [CommandContext], queues events, and
//! reports when it has consumed its terminating `;`. Commands that are a
//! sequence of `key[=value]` pairs share the [KeyValueCommandReader] driver
//! and implement only a [KeyValueHook].

use crate::error::StreamError;
use crate::event::{ContentCategory, Event, EventPayload};
use crate::ids::IdManager;
use crate::newick::event_reader::{chunk_comment, NewickTreeParser, OtuReference, TreeProgress};
use crate::nexus::context::NexusDocumentContext;
use crate::nexus::defs::{NexusBlock, WORD_DELIMITERS};
use crate::nexus::sets;
use crate::params::ReadWriteParameterMap;
use crate::parser::text_parser::TextParser;
use std::collections::{HashMap, VecDeque};

// =#========================================================================#=
// COMMAND CONTEXT
// =#========================================================================#=
/// Everything a command reader may touch: the parser, the shared document
/// state, the ID source, and the outgoing event queue.
pub(crate) struct CommandContext<'a> {
    pub parser: &'a mut TextParser,
    pub params: &'a ReadWriteParameterMap,
    pub ids: &'a mut IdManager,
    pub context: &'a mut NexusDocumentContext,
    pub queue: &'a mut VecDeque<Event>,
    pub block: NexusBlock,
}

/// Skips whitespace and bracket comments, queuing the comments as events.
pub(crate) fn skip_separators(cc: &mut CommandContext) -> Result<(), StreamError> {
    loop {
        cc.parser.skip_whitespace();
        if cc.parser.peek() == Some(b'[') {
            let text = cc.parser.read_comment_text()?;
            chunk_comment(&text, cc.params.max_comment_length(), cc.queue);
        } else {
            return Ok(());
        }
    }
}

/// Emits the OtuList start event once per TAXA block.
pub(crate) fn ensure_otu_list(cc: &mut CommandContext) {
    if cc.context.otu_list_open {
        return;
    }
    let id = cc.ids.create_id("otus");
    let mut event = Event::start(ContentCategory::OtuList, id.clone());
    if let Some(title) = &cc.context.block_title {
        event = event.with_label(title.clone());
        cc.context
            .blocks_by_title
            .insert((ContentCategory::OtuList, title.clone()), id.clone());
    }
    cc.queue.push_back(event);
    cc.context.otu_list_id = Some(id);
    cc.context.otu_list_open = true;
}

/// Emits the Alignment start event once per CHARACTERS/DATA block; deferred
/// so DIMENSIONS can run first.
pub(crate) fn ensure_alignment(cc: &mut CommandContext) {
    if cc.context.alignment_open {
        return;
    }
    let id = cc.ids.create_id("matrix");
    let mut event = Event::start(ContentCategory::Alignment, id.clone());
    if let Some(title) = &cc.context.block_title {
        event = event.with_label(title.clone());
        cc.context
            .blocks_by_title
            .insert((ContentCategory::Alignment, title.clone()), id.clone());
    }
    if let Some(otus) = cc.context.linked_otu_list() {
        event = event.with_linked_id(otus);
    }
    cc.queue.push_back(event);
    cc.context.alignment_id = Some(id);
    cc.context.alignment_open = true;
}

/// Emits the TreeNetworkGroup start event once per TREES block.
pub(crate) fn ensure_tree_group(cc: &mut CommandContext) {
    if cc.context.tree_group_open {
        return;
    }
    let id = cc.ids.create_id("tng");
    let mut event = Event::start(ContentCategory::TreeNetworkGroup, id.clone());
    if let Some(title) = &cc.context.block_title {
        event = event.with_label(title.clone());
        cc.context
            .blocks_by_title
            .insert((ContentCategory::TreeNetworkGroup, title.clone()), id.clone());
    }
    if let Some(otus) = cc.context.linked_otu_list() {
        event = event.with_linked_id(otus);
    }
    cc.queue.push_back(event);
    cc.context.tree_group_id = Some(id);
    cc.context.tree_group_open = true;
}

// =#========================================================================#=
// COMMAND READER (Trait + Registry)
// =#========================================================================#=
/// One Nexus command in progress.
pub(crate) trait CommandReader {
    /// Consumes more of the command, queuing events as they become
    /// available.
    ///
    /// # Returns
    /// `true` once the terminating `;` has been consumed.
    fn advance(&mut self, cc: &mut CommandContext) -> Result<bool, StreamError>;
}

/// Looks up the reader for a command, given the block it appears in.
///
/// TITLE and LINK are valid in every block; anything not registered is
/// `None` and surfaces as an UnknownCommand event.
pub(crate) fn create_command_reader(
    block: &NexusBlock,
    command: &str,
) -> Option<Box<dyn CommandReader>> {
    let command = command.to_ascii_uppercase();

    // Wildcard commands valid in all blocks
    match command.as_str() {
        "TITLE" => return Some(Box::new(TitleReader)),
        "LINK" => return Some(Box::new(KeyValueCommandReader::new(LinkHook))),
        _ => {}
    }

    match (block, command.as_str()) {
        (NexusBlock::Taxa, "DIMENSIONS") => {
            Some(Box::new(KeyValueCommandReader::new(DimensionsHook)))
        }
        (NexusBlock::Taxa, "TAXLABELS") => Some(Box::new(TaxLabelsReader)),

        (NexusBlock::Characters | NexusBlock::Data, "DIMENSIONS") => {
            Some(Box::new(KeyValueCommandReader::new(DimensionsHook)))
        }
        (NexusBlock::Characters | NexusBlock::Data, "FORMAT") => {
            Some(Box::new(KeyValueCommandReader::new(FormatHook::default())))
        }
        (NexusBlock::Characters | NexusBlock::Data, "MATRIX") => {
            Some(Box::new(MatrixReader))
        }
        (NexusBlock::Data, "TAXLABELS") => Some(Box::new(TaxLabelsReader)),

        (NexusBlock::Trees, "TRANSLATE") => Some(Box::new(TranslateReader)),
        (NexusBlock::Trees, "TREE") => Some(Box::new(TreeReader::default())),

        (NexusBlock::Sets, "CHARSET") => Some(Box::new(SetReader::new(SetKind::Characters))),
        (NexusBlock::Sets, "TAXSET") => Some(Box::new(SetReader::new(SetKind::Otus))),
        (NexusBlock::Sets, "TREESET") => Some(Box::new(SetReader::new(SetKind::Trees))),

        _ => None,
    }
}

// =#========================================================================#=
// KEY-VALUE FRAMEWORK
// =#========================================================================#=
/// Per-command behavior plugged into the [KeyValueCommandReader] driver.
pub(crate) trait KeyValueHook {
    /// Called for each `key[=value]` pair in order of appearance.
    fn on_pair(
        &mut self,
        key: &str,
        value: Option<&str>,
        cc: &mut CommandContext,
    ) -> Result<(), StreamError>;

    /// Called once after the terminator was consumed; deferred events (for
    /// example an element start whose shape depends on all keys) are queued
    /// here.
    fn on_end(&mut self, cc: &mut CommandContext) -> Result<(), StreamError> {
        let _ = cc;
        Ok(())
    }
}

/// Driver for commands that consist of `key[=value]` pairs up to `;`.
///
/// The terminator is consumed exactly once, then the hook's
/// [on_end](KeyValueHook::on_end) runs.
pub(crate) struct KeyValueCommandReader<H: KeyValueHook> {
    hook: H,
}

impl<H: KeyValueHook> KeyValueCommandReader<H> {
    pub(crate) fn new(hook: H) -> Self {
        Self { hook }
    }
}

impl<H: KeyValueHook> CommandReader for KeyValueCommandReader<H> {
    fn advance(&mut self, cc: &mut CommandContext) -> Result<bool, StreamError> {
        loop {
            skip_separators(cc)?;
            if cc.parser.consume_if(b';') {
                self.hook.on_end(cc)?;
                return Ok(true);
            }
            if cc.parser.is_eof() {
                return Err(StreamError::unexpected_eof(cc.parser));
            }

            let key = cc.parser.read_label(WORD_DELIMITERS)?;
            if key.is_empty() {
                return Err(StreamError::malformed_syntax(
                    cc.parser,
                    "expected a key in command",
                ));
            }
            skip_separators(cc)?;
            let value = if cc.parser.consume_if(b'=') {
                skip_separators(cc)?;
                Some(read_value(cc.parser)?)
            } else {
                None
            };
            self.hook.on_pair(&key, value.as_deref(), cc)?;
        }
    }
}

/// Reads one value token: quoted (either quote style) or a bare word.
/// Underscores in bare words read as spaces, matching label reading, so a
/// LINK target spelled the way its TITLE was spelled always matches.
fn read_value(parser: &mut TextParser) -> Result<String, StreamError> {
    match parser.peek() {
        Some(b @ (b'\'' | b'"')) => parser.read_delimited(b),
        _ => Ok(parser.read_unquoted(WORD_DELIMITERS, true)),
    }
}

// =#========================================================================#=
// GENERAL COMMANDS (TITLE, LINK, unknown)
// =#========================================================================#=
/// `TITLE <name>;` names the block's element. Effective only before the
/// element start has been emitted.
struct TitleReader;

impl CommandReader for TitleReader {
    fn advance(&mut self, cc: &mut CommandContext) -> Result<bool, StreamError> {
        skip_separators(cc)?;
        let title = cc.parser.read_label(WORD_DELIMITERS)?;
        skip_separators(cc)?;
        if !cc.parser.consume_if(b';') {
            return Err(StreamError::malformed_syntax(cc.parser, "unterminated TITLE command"));
        }
        let late = match cc.block {
            NexusBlock::Taxa => cc.context.otu_list_open,
            NexusBlock::Characters | NexusBlock::Data => cc.context.alignment_open,
            NexusBlock::Trees => cc.context.tree_group_open,
            _ => false,
        };
        if late {
            log::debug!("TITLE '{title}' arrived after the block element started; ignored");
        } else {
            cc.context.block_title = Some(title);
        }
        Ok(true)
    }
}

/// `LINK <kind> = <title>;` records the cross-block link for this block.
struct LinkHook;

impl KeyValueHook for LinkHook {
    fn on_pair(
        &mut self,
        key: &str,
        value: Option<&str>,
        cc: &mut CommandContext,
    ) -> Result<(), StreamError> {
        if let Some(value) = value {
            log::debug!("LINK {key} = {value}");
            cc.context.current_link = Some(value.to_string());
        }
        Ok(())
    }
}

/// Fallback for commands no reader is registered for: the raw command text
/// is carried in one UnknownCommand event.
pub(crate) struct UnknownCommandReader {
    name: String,
}

impl UnknownCommandReader {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl CommandReader for UnknownCommandReader {
    fn advance(&mut self, cc: &mut CommandContext) -> Result<bool, StreamError> {
        let mut raw = String::new();
        loop {
            match cc.parser.peek() {
                None => return Err(StreamError::unexpected_eof(cc.parser)),
                Some(b';') => {
                    cc.parser.next();
                    break;
                }
                Some(b @ (b'\'' | b'"')) => {
                    // Keep quoted content intact so a ';' inside it does not
                    // end the command
                    let text = cc.parser.read_delimited(b)?;
                    raw.push(b as char);
                    raw.push_str(&text);
                    raw.push(b as char);
                }
                Some(b'[') => {
                    // Comments surface as events here like everywhere else,
                    // and a ';' inside one does not end the command
                    let text = cc.parser.read_comment_text()?;
                    chunk_comment(&text, cc.params.max_comment_length(), cc.queue);
                }
                Some(b) => {
                    raw.push(b as char);
                    cc.parser.next();
                }
            }
        }
        cc.queue.push_back(
            Event::sole(ContentCategory::UnknownCommand)
                .with_label(self.name.clone())
                .with_payload(EventPayload::Text(raw.trim().to_string())),
        );
        Ok(true)
    }
}

// =#========================================================================#=
// TAXA / DIMENSIONS COMMANDS
// =#========================================================================#=
/// `DIMENSIONS [NEWTAXA] NTAX=n [NCHAR=m];` in TAXA and character blocks.
struct DimensionsHook;

impl KeyValueHook for DimensionsHook {
    fn on_pair(
        &mut self,
        key: &str,
        value: Option<&str>,
        cc: &mut CommandContext,
    ) -> Result<(), StreamError> {
        match key.to_ascii_uppercase().as_str() {
            "NTAX" => cc.context.taxa_count = Some(parse_count(value, key, cc.parser)?),
            "NCHAR" => cc.context.character_count = Some(parse_count(value, key, cc.parser)?),
            "NEWTAXA" => {}
            other => log::debug!("ignoring DIMENSIONS key {other}"),
        }
        Ok(())
    }

    fn on_end(&mut self, cc: &mut CommandContext) -> Result<(), StreamError> {
        // The alignment start is deferred until its shape is declared
        if cc.block.is_character_block() {
            ensure_alignment(cc);
        }
        Ok(())
    }
}

fn parse_count(
    value: Option<&str>,
    key: &str,
    parser: &TextParser,
) -> Result<u64, StreamError> {
    let Some(value) = value else {
        return Err(StreamError::malformed_syntax(parser, format!("{key} requires a value")));
    };
    value
        .parse::<u64>()
        .map_err(|_| StreamError::malformed_syntax(parser, format!("invalid {key}: '{value}'")))
}

/// `TAXLABELS name1 name2 ...;` declares the OTUs.
struct TaxLabelsReader;

impl CommandReader for TaxLabelsReader {
    fn advance(&mut self, cc: &mut CommandContext) -> Result<bool, StreamError> {
        ensure_otu_list(cc);
        loop {
            skip_separators(cc)?;
            if cc.parser.consume_if(b';') {
                return Ok(true);
            }
            if cc.parser.is_eof() {
                return Err(StreamError::unexpected_eof(cc.parser));
            }

            let label = cc.parser.read_label(WORD_DELIMITERS)?;
            if label.is_empty() {
                return Err(StreamError::malformed_syntax(cc.parser, "expected a taxon label"));
            }
            let id = cc.ids.create_id("otu");
            cc.context.otu_order.push((id.clone(), label.clone()));
            cc.context.otus_by_label.insert(label.clone(), id.clone());
            cc.queue
                .push_back(Event::start(ContentCategory::Otu, id).with_label(label));
            cc.queue.push_back(Event::end(ContentCategory::Otu));
        }
    }
}

// =#========================================================================#=
// CHARACTERS / DATA COMMANDS
// =#========================================================================#=
/// `FORMAT DATATYPE=DNA SYMBOLS="ACGT" MISSING=? GAP=- [INTERLEAVE] ...;`
#[derive(Default)]
struct FormatHook {
    datatype: Option<String>,
    symbols: Vec<String>,
    missing: Option<String>,
    gap: Option<String>,
}

impl KeyValueHook for FormatHook {
    fn on_pair(
        &mut self,
        key: &str,
        value: Option<&str>,
        cc: &mut CommandContext,
    ) -> Result<(), StreamError> {
        match key.to_ascii_uppercase().as_str() {
            "DATATYPE" => self.datatype = value.map(str::to_string),
            "SYMBOLS" => {
                if let Some(value) = value {
                    self.symbols.extend(
                        value
                            .chars()
                            .filter(|c| !c.is_whitespace())
                            .map(|c| c.to_string()),
                    );
                }
            }
            "MISSING" => self.missing = value.map(str::to_string),
            "GAP" => self.gap = value.map(str::to_string),
            "INTERLEAVE" => cc.context.interleaved = true,
            "TOKENS" => cc.context.tokens_format = true,
            "NOTOKENS" => cc.context.tokens_format = false,
            other => log::debug!("ignoring FORMAT key {other}"),
        }
        Ok(())
    }

    fn on_end(&mut self, cc: &mut CommandContext) -> Result<(), StreamError> {
        ensure_alignment(cc);
        if self.datatype.is_none()
            && self.symbols.is_empty()
            && self.missing.is_none()
            && self.gap.is_none()
        {
            return Ok(());
        }

        let id = cc.ids.create_id("tokenset");
        let mut start = Event::start(ContentCategory::TokenSetDefinition, id);
        if let Some(datatype) = &self.datatype {
            start = start.with_label(datatype.clone());
        }
        cc.queue.push_back(start);
        for symbol in &self.symbols {
            cc.queue.push_back(
                Event::sole(ContentCategory::SingleTokenDefinition)
                    .with_payload(EventPayload::Token(symbol.clone())),
            );
        }
        if let Some(missing) = &self.missing {
            cc.queue.push_back(
                Event::sole(ContentCategory::SingleTokenDefinition)
                    .with_label("missing")
                    .with_payload(EventPayload::Token(missing.clone())),
            );
        }
        if let Some(gap) = &self.gap {
            cc.queue.push_back(
                Event::sole(ContentCategory::SingleTokenDefinition)
                    .with_label("gap")
                    .with_payload(EventPayload::Token(gap.clone())),
            );
        }
        cc.queue.push_back(Event::end(ContentCategory::TokenSetDefinition));
        Ok(())
    }
}

/// `MATRIX <row>*;` where a row is a sequence name followed by tokens.
///
/// One advance call consumes one row, so large matrices stream row by row.
/// In interleaved matrices a row ends at the line break and the same
/// sequence name resumes in later blocks: the Sequence events reuse the ID
/// first assigned to the name and every page ends with a part end. Which
/// page is the last one is only known at the matrix terminator, so each row
/// is then resumed once more and closed with a terminated end.
struct MatrixReader;

impl CommandReader for MatrixReader {
    fn advance(&mut self, cc: &mut CommandContext) -> Result<bool, StreamError> {
        ensure_alignment(cc);
        skip_separators(cc)?;
        if cc.parser.consume_if(b';') {
            if cc.context.interleaved {
                terminate_interleaved_rows(cc);
            }
            return Ok(true);
        }
        if cc.parser.is_eof() {
            return Err(StreamError::unexpected_eof(cc.parser));
        }

        let label = cc.parser.read_label(WORD_DELIMITERS)?;
        if label.is_empty() {
            return Err(StreamError::malformed_syntax(cc.parser, "expected a sequence name"));
        }

        let sequence_id = match cc.context.sequences_by_label.get(&label) {
            Some(id) => id.clone(),
            None => {
                let id = cc.ids.create_id("seq");
                cc.context.sequences_by_label.insert(label.clone(), id.clone());
                cc.context.sequence_order.push((id.clone(), label.clone()));
                id
            }
        };
        let mut start = Event::start(ContentCategory::Sequence, sequence_id).with_label(label.clone());
        if let Some(otu_id) = cc.context.otus_by_label.get(&label) {
            start = start.with_linked_id(otu_id.clone());
        }
        cc.queue.push_back(start);

        let tokens = read_row_tokens(cc)?;
        for chunk in tokens.chunks(cc.params.max_tokens_per_line()) {
            cc.queue.push_back(
                Event::sole(ContentCategory::SequenceTokens)
                    .with_payload(EventPayload::Tokens(chunk.to_vec())),
            );
        }

        if cc.context.interleaved {
            cc.queue.push_back(Event::part_end(ContentCategory::Sequence));
        } else {
            cc.queue.push_back(Event::end(ContentCategory::Sequence));
        }
        Ok(false)
    }
}

/// Positively terminates every interleaved row once no further page can
/// follow: each sequence is resumed under its ID and closed with a
/// terminated end.
fn terminate_interleaved_rows(cc: &mut CommandContext) {
    for (id, label) in std::mem::take(&mut cc.context.sequence_order) {
        let mut start = Event::start(ContentCategory::Sequence, id).with_label(label.clone());
        if let Some(otu_id) = cc.context.otus_by_label.get(&label) {
            start = start.with_linked_id(otu_id.clone());
        }
        cc.queue.push_back(start);
        cc.queue.push_back(Event::end(ContentCategory::Sequence));
    }
}

/// Reads the tokens of one matrix row.
///
/// Interleaved rows end at the line break; non-interleaved rows end when
/// NCHAR tokens were read, or at the line break when NCHAR is unknown.
fn read_row_tokens(cc: &mut CommandContext) -> Result<Vec<String>, StreamError> {
    let stop_at_newline = cc.context.interleaved || cc.context.character_count.is_none();
    let target = if cc.context.interleaved { None } else { cc.context.character_count };
    let mut tokens = Vec::new();

    loop {
        while matches!(cc.parser.peek(), Some(b' ' | b'\t' | b'\r')) {
            cc.parser.next();
        }
        match cc.parser.peek() {
            None | Some(b';') => break,
            Some(b'\n') => {
                if stop_at_newline && !tokens.is_empty() {
                    break;
                }
                cc.parser.next();
            }
            Some(b'[') => {
                let text = cc.parser.read_comment_text()?;
                chunk_comment(&text, cc.params.max_comment_length(), cc.queue);
            }
            Some(_) if cc.context.tokens_format => {
                let word = cc.parser.read_label(WORD_DELIMITERS)?;
                if word.is_empty() {
                    return Err(StreamError::malformed_syntax(cc.parser, "invalid matrix token"));
                }
                tokens.push(word);
            }
            Some(b) => {
                cc.parser.next();
                tokens.push((b as char).to_string());
            }
        }
        if let Some(target) = target {
            if tokens.len() as u64 >= target {
                break;
            }
        }
    }
    Ok(tokens)
}

// =#========================================================================#=
// TREES COMMANDS
// =#========================================================================#=
/// `TRANSLATE key1 name1, key2 name2, ...;`
struct TranslateReader;

impl CommandReader for TranslateReader {
    fn advance(&mut self, cc: &mut CommandContext) -> Result<bool, StreamError> {
        ensure_tree_group(cc);
        loop {
            skip_separators(cc)?;
            if cc.parser.consume_if(b';') {
                return Ok(true);
            }
            if cc.parser.is_eof() {
                return Err(StreamError::unexpected_eof(cc.parser));
            }

            let key = cc.parser.read_label(WORD_DELIMITERS)?;
            skip_separators(cc)?;
            let name = cc.parser.read_label(WORD_DELIMITERS)?;
            if key.is_empty() || name.is_empty() {
                return Err(StreamError::malformed_syntax(
                    cc.parser,
                    "TRANSLATE requires key/name pairs",
                ));
            }

            let otu_id = cc.context.otus_by_label.get(&name).cloned();
            if otu_id.is_none() && !cc.context.otu_order.is_empty() {
                log::warn!("TRANSLATE name '{name}' does not match any declared taxon");
            }
            cc.context
                .translation
                .insert(key, OtuReference { id: otu_id, label: name });

            skip_separators(cc)?;
            cc.parser.consume_if(b',');
        }
    }
}

/// `TREE [*] name = [&R] <newick>;` delegates to the Newick layer with the
/// block's translation table; the Newick terminal symbol is the command
/// terminator.
#[derive(Default)]
struct TreeReader {
    tree_parser: Option<NewickTreeParser>,
    resolver: Option<crate::newick::event_reader::NewickLabelResolver>,
}

impl CommandReader for TreeReader {
    fn advance(&mut self, cc: &mut CommandContext) -> Result<bool, StreamError> {
        if self.tree_parser.is_none() {
            ensure_tree_group(cc);
            skip_separators(cc)?;
            cc.parser.consume_if(b'*');
            skip_separators(cc)?;
            let name = cc.parser.read_label(WORD_DELIMITERS)?;
            if name.is_empty() {
                return Err(StreamError::malformed_syntax(cc.parser, "expected a tree name"));
            }
            skip_separators(cc)?;
            if !cc.parser.consume_if(b'=') {
                return Err(StreamError::malformed_syntax(
                    cc.parser,
                    "expected '=' after the tree name",
                ));
            }
            self.resolver = Some(cc.context.newick_resolver());
            self.tree_parser = Some(NewickTreeParser::new(Some(name), true));
        }

        let (Some(tree_parser), Some(resolver)) = (&mut self.tree_parser, &self.resolver) else {
            return Ok(true);
        };
        match tree_parser.advance(cc.parser, cc.ids, resolver, cc.params, cc.queue)? {
            TreeProgress::InProgress => Ok(false),
            TreeProgress::StreamEnd => Err(StreamError::unexpected_eof(cc.parser)),
            TreeProgress::TreeFinished => {
                if let (Some(id), Some(name)) = (tree_parser.tree_id(), tree_parser.tree_label()) {
                    cc.context.tree_order.push(id.to_string());
                    cc.context.trees_by_label.insert(name.to_string(), id.to_string());
                }
                Ok(true)
            }
        }
    }
}

// =#========================================================================#=
// SETS COMMANDS
// =#========================================================================#=
/// Which element kind a SETS command selects over.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SetKind {
    Characters,
    Otus,
    Trees,
}

/// `CHARSET|TAXSET|TREESET name [(VECTOR|STANDARD)] = items;`
struct SetReader {
    kind: SetKind,
}

impl SetReader {
    fn new(kind: SetKind) -> Self {
        Self { kind }
    }
}

impl CommandReader for SetReader {
    fn advance(&mut self, cc: &mut CommandContext) -> Result<bool, StreamError> {
        skip_separators(cc)?;
        let name = cc.parser.read_label(WORD_DELIMITERS)?;
        if name.is_empty() {
            return Err(StreamError::malformed_syntax(cc.parser, "expected a set name"));
        }

        skip_separators(cc)?;
        let mut vector = false;
        if cc.parser.consume_if(b'(') {
            skip_separators(cc)?;
            let encoding = cc.parser.read_unquoted(WORD_DELIMITERS, false);
            vector = encoding.eq_ignore_ascii_case("VECTOR");
            if !vector && !encoding.eq_ignore_ascii_case("STANDARD") {
                return Err(StreamError::malformed_syntax(
                    cc.parser,
                    format!("unknown set encoding: '{encoding}'"),
                ));
            }
            skip_separators(cc)?;
            if !cc.parser.consume_if(b')') {
                return Err(StreamError::malformed_syntax(cc.parser, "unclosed set encoding"));
            }
        }

        skip_separators(cc)?;
        if !cc.parser.consume_if(b'=') {
            return Err(StreamError::malformed_syntax(cc.parser, "expected '=' in set command"));
        }

        // Items up to the terminator
        let mut items: Vec<String> = Vec::new();
        loop {
            skip_separators(cc)?;
            if cc.parser.consume_if(b';') {
                break;
            }
            if cc.parser.is_eof() {
                return Err(StreamError::unexpected_eof(cc.parser));
            }
            let mut item = cc.parser.read_label(WORD_DELIMITERS)?;
            if item.is_empty() {
                return Err(StreamError::malformed_syntax(cc.parser, "invalid set item"));
            }
            // A step suffix ('a-b\k') is split off by the word delimiters;
            // reattach it so the interval parser sees one token
            if cc.parser.consume_if(b'\\') {
                let step = cc.parser.read_unquoted(WORD_DELIMITERS, false);
                item.push('\\');
                item.push_str(&step);
            }
            items.push(item);
        }

        match self.kind {
            SetKind::Characters => self.emit_character_set(cc, &name, vector, &items),
            SetKind::Otus | SetKind::Trees => self.emit_element_set(cc, &name, vector, &items),
        }?;
        Ok(true)
    }
}

impl SetReader {
    fn emit_character_set(
        &self,
        cc: &mut CommandContext,
        name: &str,
        vector: bool,
        items: &[String],
    ) -> Result<(), StreamError> {
        let intervals = if vector {
            sets::vector_to_intervals(&items.concat())?
        } else {
            sets::standard_to_intervals(
                items,
                cc.context.character_count,
                &cc.context.named_character_sets,
            )?
        };

        let id = cc.ids.create_id("charset");
        let mut start = Event::start(ContentCategory::CharacterSet, id).with_label(name);
        if let Some(matrix) = &cc.context.alignment_id {
            start = start.with_linked_id(matrix.clone());
        }
        cc.queue.push_back(start);
        for &(first, last) in &intervals {
            cc.queue.push_back(
                Event::sole(ContentCategory::CharacterSetInterval)
                    .with_payload(EventPayload::Interval { first, last }),
            );
        }
        cc.queue.push_back(Event::end(ContentCategory::CharacterSet));

        cc.context
            .named_character_sets
            .insert(name.to_ascii_uppercase(), intervals);
        Ok(())
    }

    fn emit_element_set(
        &self,
        cc: &mut CommandContext,
        name: &str,
        vector: bool,
        items: &[String],
    ) -> Result<(), StreamError> {
        let (category, order, by_label, named, linked): (
            ContentCategory,
            Vec<String>,
            &HashMap<String, String>,
            &HashMap<String, Vec<String>>,
            Option<String>,
        ) = match self.kind {
            SetKind::Otus => (
                ContentCategory::OtuSet,
                cc.context.otu_order.iter().map(|(id, _)| id.clone()).collect(),
                &cc.context.otus_by_label,
                &cc.context.named_otu_sets,
                cc.context.otu_list_id.clone(),
            ),
            SetKind::Trees => (
                ContentCategory::TreeNetworkSet,
                cc.context.tree_order.clone(),
                &cc.context.trees_by_label,
                &cc.context.named_tree_sets,
                cc.context.tree_group_id.clone(),
            ),
            SetKind::Characters => unreachable!("character sets take the interval path"),
        };

        let mut element_ids: Vec<String> = Vec::new();
        if vector {
            let intervals = sets::vector_to_intervals(&items.concat())?;
            element_ids.extend(sets::intervals_to_ids(&intervals, &order)?);
        } else {
            for item in items {
                if let Some(id) = by_label.get(item) {
                    element_ids.push(id.clone());
                } else if let Some(referenced) = named.get(&item.to_ascii_uppercase()) {
                    element_ids.extend(referenced.iter().cloned());
                } else {
                    let intervals = sets::standard_to_intervals(
                        std::slice::from_ref(item),
                        Some(order.len() as u64),
                        &HashMap::new(),
                    )?;
                    element_ids.extend(sets::intervals_to_ids(&intervals, &order)?);
                }
            }
        }

        let id = cc.ids.create_id("set");
        let mut start = Event::start(category, id).with_label(name);
        if let Some(linked) = linked {
            start = start.with_linked_id(linked);
        }
        cc.queue.push_back(start);
        for element in &element_ids {
            cc.queue.push_back(
                Event::sole(ContentCategory::SetElement).with_linked_id(element.clone()),
            );
        }
        cc.queue.push_back(Event::end(category));

        let named_sets = match self.kind {
            SetKind::Otus => &mut cc.context.named_otu_sets,
            SetKind::Trees => &mut cc.context.named_tree_sets,
            SetKind::Characters => unreachable!("character sets take the interval path"),
        };
        named_sets.insert(name.to_ascii_uppercase(), element_ids);
        Ok(())
    }
}
