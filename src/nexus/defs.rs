//! Nexus block names, keywords, and shared delimiter sets.

/// The mandatory file header
pub const NEXUS_HEADER: &str = "#NEXUS";

/// Terminates every Nexus command
pub const COMMAND_TERMINATOR: u8 = b';';

/// Characters that terminate an unquoted Nexus word
pub const WORD_DELIMITERS: &[u8] = b";=,()[]{}'\"\\/";

// =#========================================================================#=
// NEXUS BLOCK
// =#========================================================================#=
/// The Nexus blocks this reader understands; anything else is carried as
/// [Unknown](NexusBlock::Unknown) and its commands surface as UnknownCommand
/// events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NexusBlock {
    Taxa,
    Characters,
    /// DATA is CHARACTERS with implied NEWTAXA; both map to an Alignment
    Data,
    Trees,
    Sets,
    Unknown(String),
}

impl NexusBlock {
    /// Parses a block name (case-insensitive) into its variant.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "taxa" => NexusBlock::Taxa,
            "characters" => NexusBlock::Characters,
            "data" => NexusBlock::Data,
            "trees" => NexusBlock::Trees,
            "sets" => NexusBlock::Sets,
            _ => NexusBlock::Unknown(name.to_string()),
        }
    }

    /// Whether this block declares a character matrix.
    pub fn is_character_block(&self) -> bool {
        matches!(self, NexusBlock::Characters | NexusBlock::Data)
    }
}
