//! Document-wide ID generation and format-legal label assignment.
//!
//! Every reader and writer session owns an [IdManager] that issues fresh,
//! never-reused element IDs, and writers additionally own a
//! [LabelEditingReporter] that keeps the labels actually emitted into a file
//! unique per content category even when source labels collide after
//! truncation or escaping.

use crate::event::ContentCategory;
use std::collections::{HashMap, HashSet};

// =#========================================================================#=
// ID MANAGER
// =#========================================================================#=
/// Issues monotonically fresh identifiers scoped to one read or write session.
///
/// IDs combine a category-specific prefix with a counter shared across all
/// prefixes, so no two IDs from the same manager are ever equal regardless
/// of prefix.
///
/// # Example
/// ```
/// use phylostream::ids::IdManager;
///
/// let mut ids = IdManager::new();
/// let a = ids.create_id("node");
/// let b = ids.create_id("node");
/// let c = ids.create_id("otu");
/// assert_ne!(a, b);
/// assert_ne!(b, c);
/// ```
#[derive(Debug, Default)]
pub struct IdManager {
    counter: u64,
}

impl IdManager {
    /// Creates a manager starting at zero.
    pub fn new() -> Self {
        Self { counter: 0 }
    }

    /// Returns a fresh ID of the form `<prefix><n>`.
    ///
    /// The counter is shared across prefixes, so uniqueness holds for the
    /// whole session, not just per prefix.
    pub fn create_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}{}", self.counter);
        self.counter += 1;
        id
    }
}

// =#========================================================================#=
// LABEL EDITING REPORTER
// =#========================================================================#=
/// Tracks which format-legal labels have already been emitted, per content
/// category, and edits requested labels until they are unique.
///
/// Writers cannot always emit source labels verbatim: formats impose length
/// limits, and two distinct elements may carry the same display label. This
/// reporter solves the resulting injective-mapping problem incrementally:
/// each request is truncated to the configured maximum, then disambiguated
/// with a numeric suffix if the result was already issued to a *different*
/// element. Requests repeated for the same element ID return the label
/// assigned the first time.
///
/// # Example
/// ```
/// use phylostream::event::ContentCategory;
/// use phylostream::ids::LabelEditingReporter;
///
/// let mut labels = LabelEditingReporter::new(None);
/// let first = labels.request(ContentCategory::Otu, "otu0", "Kea");
/// let clash = labels.request(ContentCategory::Otu, "otu1", "Kea");
/// assert_eq!(first, "Kea");
/// assert_eq!(clash, "Kea_2");
/// // Same ID again: same answer
/// assert_eq!(labels.request(ContentCategory::Otu, "otu1", "Kea"), "Kea_2");
/// ```
#[derive(Debug, Default)]
pub struct LabelEditingReporter {
    max_length: Option<usize>,
    assigned: HashMap<(ContentCategory, String), String>,
    used: HashMap<ContentCategory, HashSet<String>>,
}

impl LabelEditingReporter {
    /// Creates a reporter, optionally with a format-imposed maximum label length.
    pub fn new(max_length: Option<usize>) -> Self {
        Self {
            max_length,
            assigned: HashMap::new(),
            used: HashMap::new(),
        }
    }

    /// Returns the unique edited label for the element `id` of `category`
    /// whose source label is `requested`.
    ///
    /// The first call for an ID fixes its label; later calls return the same
    /// string. Distinct IDs never receive the same label within a category.
    pub fn request(
        &mut self,
        category: ContentCategory,
        id: impl Into<String>,
        requested: &str,
    ) -> String {
        let key = (category, id.into());
        if let Some(existing) = self.assigned.get(&key) {
            return existing.clone();
        }

        let used = self.used.entry(category).or_default();
        let base = self.max_length.map_or_else(
            || requested.to_string(),
            |max| requested.chars().take(max).collect(),
        );

        let mut candidate = if base.is_empty() { "unnamed".to_string() } else { base.clone() };
        let mut suffix = 2usize;
        while used.contains(&candidate) {
            let tail = format!("_{suffix}");
            // Retruncate the base so candidate + suffix stays within the limit
            candidate = match self.max_length {
                Some(max) if base.len() + tail.len() > max => {
                    let keep = max.saturating_sub(tail.len());
                    format!("{}{tail}", base.chars().take(keep).collect::<String>())
                }
                _ => format!("{base}{tail}"),
            };
            suffix += 1;
        }

        used.insert(candidate.clone());
        self.assigned.insert(key, candidate.clone());
        candidate
    }

    /// Returns the label already assigned to `id`, if any.
    pub fn assigned_label(&self, category: ContentCategory, id: &str) -> Option<&str> {
        self.assigned
            .get(&(category, id.to_string()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_then_disambiguation() {
        let mut labels = LabelEditingReporter::new(Some(6));
        let a = labels.request(ContentCategory::Otu, "a", "Albatross");
        let b = labels.request(ContentCategory::Otu, "b", "Albatros");
        assert_eq!(a, "Albatr");
        // Same truncation would collide, so the second gets a suffix within the limit
        assert_eq!(b, "Alba_2");
        assert_eq!(b.len(), 6);
    }

    #[test]
    fn categories_are_independent() {
        let mut labels = LabelEditingReporter::new(None);
        let otu = labels.request(ContentCategory::Otu, "x", "Kiwi");
        let node = labels.request(ContentCategory::Node, "y", "Kiwi");
        assert_eq!(otu, node);
    }
}
