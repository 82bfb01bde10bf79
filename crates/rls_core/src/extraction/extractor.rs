//! Tagged-markup walk producing the unit hierarchy.
//!
//! Expected input structure (produced by the PDF-to-XHTML step):
//!
//! ```xml
//! <document>
//!   <section data-page="1">
//!     <p data-sync="paragraph" id="par0001">
//!       <span data-sync="sentence">
//!         <span data-sync="word">Hi</span>
//!         <span data-sync="word">there.</span>
//!       </span>
//!     </p>
//!   </section>
//! </document>
//! ```
//!
//! Syncable nodes carry `data-sync` with the level name, an optional stable
//! `id`, and an optional `data-readable="false"` flag. Nodes without an id
//! get a deterministic positional one, so re-extraction of the same document
//! yields identical identifiers.

use std::collections::HashSet;

use crate::models::{SyncUnit, UnitLevel};

use super::exclusions::ExclusionRules;

/// Attribute naming the hierarchy level of a syncable node.
const SYNC_ATTR: &str = "data-sync";
/// Attribute flagging a node (and its subtree) as non-readable.
const READABLE_ATTR: &str = "data-readable";
/// Attribute carrying the 1-based page index on an ancestor element.
const PAGE_ATTR: &str = "data-page";

/// Result of an extraction pass.
///
/// Extraction never fails hard: a malformed document produces an empty unit
/// list and the reason lands in `diagnostics`.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    /// Extracted units in document order.
    pub units: Vec<SyncUnit>,
    /// Units that matched an exclusion pattern and were dropped.
    pub excluded: usize,
    /// Human-readable problems encountered during the walk.
    pub diagnostics: Vec<String>,
}

impl ExtractionReport {
    /// Whether the walk produced any usable hierarchy.
    pub fn is_usable(&self) -> bool {
        !self.units.is_empty()
    }
}

/// Extract syncable units from tagged markup.
pub fn extract_units(markup: &str, rules: &ExclusionRules) -> ExtractionReport {
    let doc = match roxmltree::Document::parse(markup) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!("Document markup failed to parse: {}", e);
            return ExtractionReport {
                diagnostics: vec![format!("Markup parse error: {}", e)],
                ..Default::default()
            };
        }
    };

    let mut walker = Walker {
        rules,
        units: Vec::new(),
        excluded: 0,
        diagnostics: Vec::new(),
        seen_ids: HashSet::new(),
        paragraph_count: 0,
    };
    walker.walk(doc.root_element(), 1, None);

    tracing::debug!(
        "Extracted {} units ({} excluded, {} diagnostics)",
        walker.units.len(),
        walker.excluded,
        walker.diagnostics.len()
    );

    ExtractionReport {
        units: walker.units,
        excluded: walker.excluded,
        diagnostics: walker.diagnostics,
    }
}

/// Enclosing syncable unit during the walk.
struct Enclosing {
    id: String,
    level: UnitLevel,
    /// Per-parent child counter used for positional ids.
    child_count: usize,
}

struct Walker<'a> {
    rules: &'a ExclusionRules,
    units: Vec<SyncUnit>,
    excluded: usize,
    diagnostics: Vec<String>,
    seen_ids: HashSet<String>,
    paragraph_count: usize,
}

impl Walker<'_> {
    /// Recursive descent over non-sync structure, dispatching to
    /// `visit_unit` when a tagged node is found.
    fn walk(&mut self, node: roxmltree::Node, page: u32, parent: Option<&mut Enclosing>) {
        let mut parent = parent;
        for child in node.children().filter(|n| n.is_element()) {
            let page = child
                .attribute(PAGE_ATTR)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(page);

            if child.attribute(READABLE_ATTR) == Some("false") {
                continue;
            }

            match child.attribute(SYNC_ATTR) {
                Some(tag) => match parse_level(tag) {
                    Some(level) => {
                        self.visit_unit(child, level, page, parent.as_deref_mut());
                    }
                    None => {
                        self.diagnostics.push(format!(
                            "Unknown {} level '{}' on <{}>",
                            SYNC_ATTR,
                            tag,
                            child.tag_name().name()
                        ));
                    }
                },
                None => self.walk(child, page, parent.as_deref_mut()),
            }
        }
    }

    fn visit_unit(
        &mut self,
        node: roxmltree::Node,
        level: UnitLevel,
        page: u32,
        parent: Option<&mut Enclosing>,
    ) {
        // Nesting check: a sentence needs a paragraph, a word a sentence.
        let expected_parent = level.coarser();
        let parent_matches = match (&parent, expected_parent) {
            (None, None) => true,
            (Some(p), Some(expected)) => p.level == expected,
            _ => false,
        };
        if !parent_matches {
            self.diagnostics.push(format!(
                "Orphaned {} unit at page {} (wrong enclosing level); subtree skipped",
                level, page
            ));
            return;
        }

        // Every tagged node consumes a positional slot, whether or not it
        // survives the exclusion and duplicate checks: later positional ids
        // must not depend on the active rule set.
        let (ordinal, parent_id) = match parent {
            Some(p) => {
                p.child_count += 1;
                (p.child_count, Some(p.id.clone()))
            }
            None => {
                self.paragraph_count += 1;
                (self.paragraph_count, None)
            }
        };

        let id = match node.attribute("id") {
            Some(id) => id.to_string(),
            None => positional_id(level, parent_id.as_deref(), ordinal),
        };

        if !self.seen_ids.insert(id.clone()) {
            self.diagnostics
                .push(format!("Duplicate unit id '{}'; later unit skipped", id));
            return;
        }

        let text = collect_text(node);
        if self.rules.is_excluded(&id, &text) {
            tracing::trace!("Unit '{}' excluded by pattern", id);
            self.excluded += 1;
            return;
        }

        self.units
            .push(SyncUnit::new(id.clone(), level, parent_id, text, page));

        if level.finer().is_some() {
            let mut enclosing = Enclosing {
                id,
                level,
                child_count: 0,
            };
            self.walk(node, page, Some(&mut enclosing));
        }
    }
}

/// Deterministic positional id for a node that carries none.
fn positional_id(level: UnitLevel, parent_id: Option<&str>, ordinal: usize) -> String {
    match (level, parent_id) {
        (UnitLevel::Paragraph, _) => format!("par{:04}", ordinal),
        (UnitLevel::Sentence, Some(parent)) => format!("{}-sen{:03}", parent, ordinal),
        (UnitLevel::Word, Some(parent)) => format!("{}-wrd{:03}", parent, ordinal),
        // The nesting check guarantees a parent below paragraph level.
        (level, None) => format!("{}{:04}", level, ordinal),
    }
}

fn parse_level(tag: &str) -> Option<UnitLevel> {
    match tag.trim().to_ascii_lowercase().as_str() {
        "paragraph" | "p" => Some(UnitLevel::Paragraph),
        "sentence" | "s" => Some(UnitLevel::Sentence),
        "word" | "w" => Some(UnitLevel::Word),
        _ => None,
    }
}

/// Concatenated, whitespace-normalized text content of a subtree.
fn collect_text(node: roxmltree::Node) -> String {
    let mut out = String::new();
    for desc in node.descendants().filter(|n| n.is_text()) {
        if let Some(text) = desc.text() {
            for word in text.split_whitespace() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(word);
            }
        }
    }
    out
}
