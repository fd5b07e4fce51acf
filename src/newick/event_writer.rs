//! Event-based Newick output.
//!
//! [NewickEventWriter] serializes the tree/network groups of a
//! [DocumentDataAdapter], one Newick string per tree. The topology is
//! reconstructed from the adapter's edge events; the text serializer is
//! shared with the Nexus writer's TREES block.

use crate::adapter::{DocumentDataAdapter, TreeNetworkDataAdapter};
use crate::error::StreamError;
use crate::event::{ContentCategory, EventPayload};
use crate::ids::LabelEditingReporter;
use crate::parser::utils::escape_label;
use std::collections::{HashMap, HashSet};
use std::io::Write;

// =#========================================================================#=
// TOPOLOGY RECONSTRUCTION
// =#========================================================================#=
/// Parent/child structure recovered from an adapter's edge events.
struct Topology {
    root: String,
    root_length: Option<f64>,
    children: HashMap<String, Vec<(String, Option<f64>)>>,
}

/// Rebuilds the rooted topology of a phylogeny from its edge events.
///
/// # Errors
/// Returns InconsistentAdapterData if an edge references a node the adapter
/// never enumerated, a node has more than one parent, or no unique root
/// exists.
fn build_topology(tree: &dyn TreeNetworkDataAdapter) -> Result<Topology, StreamError> {
    let nodes: HashSet<String> = tree.node_ids().collect();
    if nodes.is_empty() {
        return Err(StreamError::inconsistent_adapter_data(format!(
            "phylogeny '{}' has no nodes",
            tree.id()
        )));
    }

    let mut children: HashMap<String, Vec<(String, Option<f64>)>> = HashMap::new();
    let mut parents: HashMap<String, usize> = HashMap::new();
    let mut root_edge: Option<(String, Option<f64>)> = None;

    for edge_id in tree.edge_ids() {
        let start = tree.edge_start_event(&edge_id)?;
        let EventPayload::EdgeInfo { source, target, length } = start.payload() else {
            return Err(StreamError::inconsistent_adapter_data(format!(
                "edge '{edge_id}' carries no edge payload"
            )));
        };
        if !nodes.contains(target) {
            return Err(StreamError::inconsistent_adapter_data(format!(
                "edge '{edge_id}' targets undeclared node '{target}'"
            )));
        }
        match source {
            Some(source) => {
                if !nodes.contains(source) {
                    return Err(StreamError::inconsistent_adapter_data(format!(
                        "edge '{edge_id}' leaves undeclared node '{source}'"
                    )));
                }
                children
                    .entry(source.clone())
                    .or_default()
                    .push((target.clone(), *length));
                *parents.entry(target.clone()).or_insert(0) += 1;
            }
            None => root_edge = Some((target.clone(), *length)),
        }
    }

    if let Some((node, count)) = parents.iter().find(|&(_, &count)| count > 1) {
        return Err(StreamError::inconsistent_adapter_data(format!(
            "node '{node}' has {count} parents"
        )));
    }

    let (root, root_length) = match root_edge {
        Some((root, length)) => (root, length),
        None => {
            let mut roots = nodes.iter().filter(|node| !parents.contains_key(*node));
            let first = roots.next();
            let second = roots.next();
            match (first, second) {
                (Some(root), None) => (root.clone(), None),
                _ => {
                    return Err(StreamError::inconsistent_adapter_data(format!(
                        "phylogeny '{}' has no unique root",
                        tree.id()
                    )));
                }
            }
        }
    };

    Ok(Topology { root, root_length, children })
}

// =#========================================================================#=
// TREE SERIALIZATION
// =#========================================================================#=
/// Serializes one phylogeny to a Newick string including the terminal `;`.
///
/// `translate` substitutes node names: a node whose linked OTU ID appears in
/// the map is written as the mapped token instead of its label (the Nexus
/// TRANSLATE convention). Labels pass through the reporter so the emitted
/// names stay unique, then through Newick escaping.
pub(crate) fn serialize_tree(
    tree: &dyn TreeNetworkDataAdapter,
    labels: &mut LabelEditingReporter,
    translate: Option<&HashMap<String, String>>,
) -> Result<String, StreamError> {
    let topology = build_topology(tree)?;
    let mut out = String::new();
    let mut visited = HashSet::new();
    write_subtree(
        &mut out,
        tree,
        &topology,
        &topology.root,
        topology.root_length,
        labels,
        translate,
        &mut visited,
    )?;
    out.push(';');
    Ok(out)
}

/// Writes one node and its subtree in depth-first order.
#[allow(clippy::too_many_arguments)]
fn write_subtree(
    out: &mut String,
    tree: &dyn TreeNetworkDataAdapter,
    topology: &Topology,
    node_id: &str,
    length: Option<f64>,
    labels: &mut LabelEditingReporter,
    translate: Option<&HashMap<String, String>>,
    visited: &mut HashSet<String>,
) -> Result<(), StreamError> {
    if !visited.insert(node_id.to_string()) {
        return Err(StreamError::inconsistent_adapter_data(format!(
            "edges of phylogeny '{}' form a cycle through node '{node_id}'",
            tree.id()
        )));
    }

    if let Some(children) = topology.children.get(node_id) {
        if !children.is_empty() {
            out.push('(');
            for (i, (child, child_length)) in children.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_subtree(
                    out, tree, topology, child, *child_length, labels, translate, visited,
                )?;
            }
            out.push(')');
        }
    }

    let start = tree.node_start_event(node_id)?;
    let translated = translate
        .zip(start.linked_id())
        .and_then(|(map, otu)| map.get(otu).cloned());
    match translated {
        Some(token) => out.push_str(&token),
        None => {
            if let Some(label) = start.label() {
                let unique = labels.request(ContentCategory::Node, node_id, label);
                out.push_str(&escape_label(&unique));
            }
        }
    }

    if let Some(length) = length {
        out.push(':');
        out.push_str(&length.to_string());
    }
    Ok(())
}

// =#========================================================================#=
// NEWICK EVENT WRITER
// =#========================================================================#=
/// Writer emitting one Newick string per tree of a document.
///
/// Newick carries trees only: OTU lists, matrices, and networks present in
/// the document cannot be represented and are skipped with a warning.
///
/// # Example
/// ```no_run
/// use phylostream::adapter::StoredDocument;
/// use phylostream::newick::NewickEventWriter;
///
/// let document = StoredDocument::new();
/// let writer = NewickEventWriter::new();
/// let mut out = Vec::new();
/// writer.write_document(&document, &mut out)?;
/// # Ok::<(), phylostream::StreamError>(())
/// ```
#[derive(Debug, Default)]
pub struct NewickEventWriter;

impl NewickEventWriter {
    /// Creates a writer.
    pub fn new() -> Self {
        Self
    }

    /// Writes all trees of the document, one per line.
    ///
    /// # Errors
    /// Returns InconsistentAdapterData for topology defects reported by the
    /// adapters, or Io for output failures.
    pub fn write_document<W: Write>(
        &self,
        document: &dyn DocumentDataAdapter,
        out: &mut W,
    ) -> Result<(), StreamError> {
        if !document.otu_lists().is_empty() {
            log::warn!("Newick output cannot represent OTU lists; skipping them");
        }
        if !document.matrices().is_empty() {
            log::warn!("Newick output cannot represent character matrices; skipping them");
        }

        let mut labels = LabelEditingReporter::new(None);
        for group in document.tree_network_groups() {
            for tree in group.tree_networks() {
                if !tree.is_tree() {
                    log::warn!(
                        "Newick output cannot represent network '{}'; skipping it",
                        tree.id()
                    );
                    continue;
                }
                let text = serialize_tree(tree, &mut labels, None)?;
                writeln!(out, "{text}")?;
            }
        }
        Ok(())
    }
}
