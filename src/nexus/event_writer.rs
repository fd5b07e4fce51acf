//! Nexus file writer over the data-adapter contract.
//!
//! [NexusEventWriter] produces a `#NEXUS` file with TAXA, CHARACTERS, and
//! TREES blocks from a [DocumentDataAdapter]. Adapter access is two-phase:
//! ID enumerations first (DIMENSIONS, TRANSLATE, interleaving layout), then
//! the content of each element. Labels pass through a
//! [LabelEditingReporter] so the emitted names stay unique per category.

use crate::adapter::{
    CollectingReceiver, DocumentDataAdapter, MatrixDataAdapter, ObjectListAdapter,
    TreeNetworkGroupAdapter,
};
use crate::error::StreamError;
use crate::event::{ContentCategory, EventPayload};
use crate::ids::LabelEditingReporter;
use crate::newick::event_writer::serialize_tree;
use crate::params::ReadWriteParameterMap;
use crate::parser::utils::escape_label;
use std::collections::HashMap;
use std::io::Write;

// =#========================================================================#=
// NEXUS EVENT WRITER
// =#========================================================================#=
/// Writer producing one Nexus file from a document adapter.
///
/// # Format Structure
/// - `#NEXUS` header
/// - one TAXA block per OTU list
/// - one CHARACTERS block per matrix, interleaved when rows exceed
///   `max_tokens_per_line`
/// - one TREES block per tree/network group, with a TRANSLATE table when
///   an OTU list exists
///
/// # Example
/// ```no_run
/// use phylostream::adapter::StoredDocument;
/// use phylostream::nexus::NexusEventWriter;
/// use phylostream::ReadWriteParameterMap;
///
/// let document = StoredDocument::new();
/// let writer = NexusEventWriter::new(ReadWriteParameterMap::default());
/// let mut out = Vec::new();
/// writer.write_document(&document, &mut out)?;
/// # Ok::<(), phylostream::StreamError>(())
/// ```
pub struct NexusEventWriter {
    params: ReadWriteParameterMap,
}

impl NexusEventWriter {
    /// Creates a writer with the given parameters.
    pub fn new(params: ReadWriteParameterMap) -> Self {
        Self { params }
    }

    /// Writes the whole document.
    ///
    /// # Errors
    /// Returns InconsistentAdapterData or UnknownId for adapter contract
    /// violations, and Io for output failures.
    pub fn write_document<W: Write>(
        &self,
        document: &dyn DocumentDataAdapter,
        out: &mut W,
    ) -> Result<(), StreamError> {
        writeln!(out, "#NEXUS")?;

        let mut labels = LabelEditingReporter::new(None);
        // Emitted taxon labels, reused by matrix rows and TRANSLATE
        let mut otu_labels = TaxonLabels::default();

        for list in document.otu_lists() {
            self.taxa_block(list, &mut labels, &mut otu_labels, out)?;
        }
        for matrix in document.matrices() {
            self.characters_block(matrix, &mut labels, &otu_labels, out)?;
        }
        for group in document.tree_network_groups() {
            self.trees_block(group, &mut labels, &otu_labels, out)?;
        }
        Ok(())
    }

    /// Writes one TAXA block and records the emitted taxon labels.
    fn taxa_block<W: Write>(
        &self,
        list: &dyn ObjectListAdapter,
        labels: &mut LabelEditingReporter,
        otu_labels: &mut TaxonLabels,
        out: &mut W,
    ) -> Result<(), StreamError> {
        writeln!(out, "BEGIN TAXA;")?;
        if let Some(title) = list.list_label() {
            writeln!(out, "\tTITLE {};", escape_label(title))?;
        }
        writeln!(out, "\tDIMENSIONS NTAX={};", list.count())?;

        write!(out, "\tTAXLABELS")?;
        for id in list.id_iterator() {
            let start = list.start_event(&id)?;
            let requested = start.label().unwrap_or(&id);
            let label = labels.request(ContentCategory::Otu, id.clone(), requested);
            write!(out, " {}", escape_label(&label))?;
            otu_labels.order.push(id.clone());
            otu_labels.labels.insert(id, label);
        }
        writeln!(out, ";")?;
        writeln!(out, "END;")?;
        Ok(())
    }

    /// Writes one CHARACTERS block, interleaving wide matrices.
    fn characters_block<W: Write>(
        &self,
        matrix: &dyn MatrixDataAdapter,
        labels: &mut LabelEditingReporter,
        otu_labels: &TaxonLabels,
        out: &mut W,
    ) -> Result<(), StreamError> {
        // First pass: IDs, row labels, and the column count
        let sequence_ids: Vec<String> = matrix.id_iterator().collect();
        let mut row_labels: Vec<String> = Vec::with_capacity(sequence_ids.len());
        for id in &sequence_ids {
            let start = matrix.start_event(id)?;
            let requested = start
                .label()
                .map(str::to_string)
                .or_else(|| {
                    start
                        .linked_id()
                        .and_then(|otu| otu_labels.labels.get(otu).cloned())
                })
                .unwrap_or_else(|| id.clone());
            let unique = labels.request(ContentCategory::Sequence, id.clone(), &requested);
            row_labels.push(escape_label(&unique));
        }

        let column_count = match matrix.column_count() {
            Some(count) => count,
            None => {
                // Ragged matrix: pad the declaration to the longest row
                let mut longest = 0;
                for id in &sequence_ids {
                    longest = longest.max(matrix.sequence_length(id)?);
                }
                log::warn!(
                    "matrix '{}' is not aligned; declaring NCHAR={longest}",
                    matrix.list_id()
                );
                longest
            }
        };
        let interleave = column_count as usize > self.params.max_tokens_per_line();

        writeln!(out, "BEGIN CHARACTERS;")?;
        if let Some(title) = matrix.list_label() {
            writeln!(out, "\tTITLE {};", escape_label(title))?;
        }
        writeln!(out, "\tDIMENSIONS NTAX={} NCHAR={};", matrix.count(), column_count)?;
        if interleave {
            writeln!(out, "\tFORMAT INTERLEAVE;")?;
        }
        writeln!(out, "\tMATRIX")?;

        let label_width = row_labels.iter().map(String::len).max().unwrap_or(0);
        let window = if interleave {
            self.params.max_tokens_per_line() as u64
        } else {
            column_count.max(1)
        };

        let mut first_column = 0;
        loop {
            for (id, label) in sequence_ids.iter().zip(&row_labels) {
                let last_column = (first_column + window)
                    .min(column_count)
                    .min(matrix.sequence_length(id)?);
                let tokens = if first_column < last_column {
                    collect_sequence_tokens(matrix, id, first_column, last_column)?
                } else {
                    Vec::new()
                };
                writeln!(out, "\t\t{label:<label_width$} {}", join_tokens(&tokens))?;
            }
            first_column += window;
            if first_column >= column_count {
                break;
            }
            writeln!(out)?;
        }

        writeln!(out, "\t;")?;
        writeln!(out, "END;")?;
        Ok(())
    }

    /// Writes one TREES block with a TRANSLATE table when taxa exist.
    fn trees_block<W: Write>(
        &self,
        group: &dyn TreeNetworkGroupAdapter,
        labels: &mut LabelEditingReporter,
        otu_labels: &TaxonLabels,
        out: &mut W,
    ) -> Result<(), StreamError> {
        writeln!(out, "BEGIN TREES;")?;
        if let Some(title) = group.label() {
            writeln!(out, "\tTITLE {};", escape_label(title))?;
        }

        // TRANSLATE assigns 1-based keys in OTU enumeration order
        let mut translate: HashMap<String, String> = HashMap::new();
        if !otu_labels.order.is_empty() {
            writeln!(out, "\tTRANSLATE")?;
            for (i, otu_id) in otu_labels.order.iter().enumerate() {
                let Some(label) = otu_labels.labels.get(otu_id) else { continue };
                let key = (i + 1).to_string();
                let separator = if i + 1 < otu_labels.order.len() { "," } else { "" };
                writeln!(out, "\t\t{key} {}{separator}", escape_label(label))?;
                translate.insert(otu_id.clone(), key);
            }
            writeln!(out, "\t;")?;
        }

        for tree in group.tree_networks() {
            if !tree.is_tree() {
                log::warn!("Nexus TREES blocks cannot represent network '{}'; skipping it", tree.id());
                continue;
            }
            let requested = tree.label().unwrap_or(tree.id());
            let name = labels.request(ContentCategory::Tree, tree.id().to_string(), requested);
            let newick = serialize_tree(tree, labels, Some(&translate))?;
            writeln!(out, "\tTREE {} = {newick}", escape_label(&name))?;
        }

        writeln!(out, "END;")?;
        Ok(())
    }
}

/// Taxon labels as emitted into the TAXA block, in enumeration order.
#[derive(Default)]
struct TaxonLabels {
    order: Vec<String>,
    labels: HashMap<String, String>,
}

/// Pulls one column window of a sequence through a receiver and flattens
/// the token payloads.
fn collect_sequence_tokens(
    matrix: &dyn MatrixDataAdapter,
    id: &str,
    first: u64,
    last: u64,
) -> Result<Vec<String>, StreamError> {
    let mut receiver = CollectingReceiver::new();
    matrix.write_sequence_tokens(&mut receiver, id, first, last)?;
    let mut tokens = Vec::new();
    for event in receiver.into_events() {
        if let EventPayload::Tokens(chunk) = event.payload() {
            tokens.extend(chunk.iter().cloned());
        }
    }
    Ok(tokens)
}

/// Joins a token row: single-character tokens concatenate, longer tokens
/// stay whitespace-separated.
fn join_tokens(tokens: &[String]) -> String {
    if tokens.iter().all(|token| token.chars().count() == 1) {
        tokens.concat()
    } else {
        tokens.join(" ")
    }
}
