//! Per-document scratch state shared between Nexus command readers.

use crate::event::ContentCategory;
use crate::newick::event_reader::{NewickLabelResolver, OtuReference};
use std::collections::HashMap;

/// Strongly-typed per-document state the Nexus command readers accumulate
/// and consult.
///
/// One instance lives for the duration of one read; every field is owned
/// here rather than scattered across command readers, because commands in
/// later blocks (TREE, CHARSET, TAXSET) resolve names declared by earlier
/// ones (TAXLABELS, TRANSLATE, DIMENSIONS).
#[derive(Debug, Default)]
pub struct NexusDocumentContext {
    /// ID of the OTU list opened by the TAXA block
    pub otu_list_id: Option<String>,
    /// Whether the OtuList start event has been emitted and not yet closed
    pub otu_list_open: bool,
    /// `(OTU ID, label)` in declaration order; index lookups are 1-based in
    /// the file
    pub otu_order: Vec<(String, String)>,
    /// Taxon label -> OTU ID
    pub otus_by_label: HashMap<String, String>,

    /// ID of the alignment opened by the current CHARACTERS/DATA block
    pub alignment_id: Option<String>,
    /// Whether the Alignment start event has been emitted and not yet closed
    pub alignment_open: bool,
    /// Declared NTAX, where a DIMENSIONS command gave one
    pub taxa_count: Option<u64>,
    /// Declared NCHAR; the `.` position in character sets resolves to this
    pub character_count: Option<u64>,
    /// Whether the current matrix is interleaved (FORMAT INTERLEAVE)
    pub interleaved: bool,
    /// Whether tokens are whitespace-separated words (FORMAT TOKENS) rather
    /// than single characters
    pub tokens_format: bool,
    /// Sequence label -> sequence ID; interleaved rows resume through this
    pub sequences_by_label: HashMap<String, String>,
    /// `(sequence ID, label)` in row declaration order; interleaved rows are
    /// positively terminated in this order when the matrix ends
    pub sequence_order: Vec<(String, String)>,

    /// ID of the group opened by the current TREES block
    pub tree_group_id: Option<String>,
    /// Whether the TreeNetworkGroup start event has been emitted and not yet
    /// closed
    pub tree_group_open: bool,
    /// TRANSLATE key -> OTU reference for the current TREES block
    pub translation: HashMap<String, OtuReference>,
    /// Tree IDs in declaration order
    pub tree_order: Vec<String>,
    /// Tree name -> tree ID
    pub trees_by_label: HashMap<String, String>,

    /// Named CHARSETs (upper-cased name -> 0-based half-open intervals),
    /// kept for expansion of set references
    pub named_character_sets: HashMap<String, Vec<(u64, u64)>>,
    /// Named TAXSETs (upper-cased name -> OTU IDs)
    pub named_otu_sets: HashMap<String, Vec<String>>,
    /// Named TREESETs (upper-cased name -> tree IDs)
    pub named_tree_sets: HashMap<String, Vec<String>>,

    /// TITLE of the current block, if one was given
    pub block_title: Option<String>,
    /// `(container category, TITLE)` -> element ID for every titled block
    /// opened so far; LINK targets resolve through this
    pub blocks_by_title: HashMap<(ContentCategory, String), String>,
    /// Block title named by the current block's LINK command
    pub current_link: Option<String>,
}

impl NexusDocumentContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the state that is scoped to one block.
    pub fn reset_block_state(&mut self) {
        self.interleaved = false;
        self.tokens_format = false;
        self.block_title = None;
        self.current_link = None;
    }

    /// The OTU list the current block refers to: the LINK target when it
    /// names a titled TAXA block, otherwise the most recently opened list.
    pub fn linked_otu_list(&self) -> Option<String> {
        if let Some(title) = &self.current_link {
            let key = (ContentCategory::OtuList, title.clone());
            if let Some(id) = self.blocks_by_title.get(&key) {
                return Some(id.clone());
            }
            log::warn!("LINK target '{title}' does not name a titled TAXA block");
        }
        self.otu_list_id.clone()
    }

    /// Builds the name resolver for Newick strings inside TREE commands:
    /// TRANSLATE keys, 1-based taxon indices, and verbatim taxon labels all
    /// resolve to their OTU.
    pub fn newick_resolver(&self) -> NewickLabelResolver {
        if self.translation.is_empty() && self.otu_order.is_empty() {
            return NewickLabelResolver::Verbatim;
        }

        let mut map = self.translation.clone();
        for (index, (otu_id, label)) in self.otu_order.iter().enumerate() {
            map.entry((index + 1).to_string()).or_insert_with(|| OtuReference {
                id: Some(otu_id.clone()),
                label: label.clone(),
            });
        }
        for (label, otu_id) in &self.otus_by_label {
            map.entry(label.clone()).or_insert_with(|| OtuReference {
                id: Some(otu_id.clone()),
                label: label.clone(),
            });
        }
        NewickLabelResolver::Translation(map)
    }
}
