//! Reader/writer configuration.
//!
//! Every reader and writer takes a [ReadWriteParameterMap] at construction.
//! It is a typed struct rather than a string-keyed map, so option names are
//! checked at compile time and unrecognized options cannot exist; every
//! option has the documented default below.

/// Default maximum comment length before a comment is split into chunks
const DEFAULT_MAX_COMMENT_LENGTH: usize = 1024;

/// Default maximum number of sequence tokens grouped into one event or line
const DEFAULT_MAX_TOKENS_PER_LINE: usize = 64;

/// Named, typed configuration passed into every reader and writer.
///
/// # Options and defaults
/// * `expect_extended_newick` (false) - enable the extended-Newick `#type`
///   hybridization syntax; later occurrences of a `#tag` link back to the
///   first node carrying it
/// * `use_otu_label_as_node_label` (false) - label nodes that resolve to an
///   OTU with the OTU's label instead of the name written in the tree text
/// * `max_comment_length` (1024) - comments longer than this are emitted as
///   several Comment events with the `continued` flag set on all but the last
/// * `max_tokens_per_line` (64) - chunk size for SequenceTokens events and
///   for matrix rows written by the Nexus writer
/// * `consider_phylogeny_as_network` (false) - emit Network instead of Tree
///   events for phylogenies whose format leaves the distinction ambiguous
///
/// # Example
/// ```
/// use phylostream::ReadWriteParameterMap;
///
/// let params = ReadWriteParameterMap::new()
///     .with_expect_extended_newick(true)
///     .with_max_comment_length(256);
/// assert!(params.expect_extended_newick());
/// ```
#[derive(Debug, Clone)]
pub struct ReadWriteParameterMap {
    expect_extended_newick: bool,
    use_otu_label_as_node_label: bool,
    max_comment_length: usize,
    max_tokens_per_line: usize,
    consider_phylogeny_as_network: bool,
}

impl Default for ReadWriteParameterMap {
    fn default() -> Self {
        Self {
            expect_extended_newick: false,
            use_otu_label_as_node_label: false,
            max_comment_length: DEFAULT_MAX_COMMENT_LENGTH,
            max_tokens_per_line: DEFAULT_MAX_TOKENS_PER_LINE,
            consider_phylogeny_as_network: false,
        }
    }
}

impl ReadWriteParameterMap {
    /// Creates a parameter map with all options at their defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables extended-Newick hybridization syntax.
    pub fn with_expect_extended_newick(mut self, value: bool) -> Self {
        self.expect_extended_newick = value;
        self
    }

    /// Enables or disables substituting the linked OTU's label for the node
    /// name written in the tree text.
    pub fn with_use_otu_label_as_node_label(mut self, value: bool) -> Self {
        self.use_otu_label_as_node_label = value;
        self
    }

    /// Sets the comment chunking threshold (minimum 1).
    pub fn with_max_comment_length(mut self, value: usize) -> Self {
        self.max_comment_length = value.max(1);
        self
    }

    /// Sets the sequence-token chunk size (minimum 1).
    pub fn with_max_tokens_per_line(mut self, value: usize) -> Self {
        self.max_tokens_per_line = value.max(1);
        self
    }

    /// Treat ambiguous phylogenies as networks rather than trees.
    pub fn with_consider_phylogeny_as_network(mut self, value: bool) -> Self {
        self.consider_phylogeny_as_network = value;
        self
    }

    pub fn expect_extended_newick(&self) -> bool {
        self.expect_extended_newick
    }

    pub fn use_otu_label_as_node_label(&self) -> bool {
        self.use_otu_label_as_node_label
    }

    pub fn max_comment_length(&self) -> usize {
        self.max_comment_length
    }

    pub fn max_tokens_per_line(&self) -> usize {
        self.max_tokens_per_line
    }

    pub fn consider_phylogeny_as_network(&self) -> bool {
        self.consider_phylogeny_as_network
    }
}
