//! Syncable unit and the document hierarchy.
//!
//! A `SyncUnit` is one addressable span of document text at a given level.
//! The `UnitHierarchy` preserves document order (the extractor's output
//! order) and indexes parent/child relations for the rest of the engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::enums::UnitLevel;

/// One syncable span of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncUnit {
    /// Stable identifier, unique within a document. Encodes document
    /// position so it doubles as an ordering fallback.
    pub id: String,
    /// Hierarchy level.
    pub level: UnitLevel,
    /// Identifier of the enclosing unit at the next-coarser level.
    /// `None` for top-level paragraphs.
    pub parent_id: Option<String>,
    /// Literal text content. Immutable after extraction.
    pub text: String,
    /// 1-based page/section index.
    pub page_number: u32,
}

impl SyncUnit {
    /// Create a new unit.
    pub fn new(
        id: impl Into<String>,
        level: UnitLevel,
        parent_id: Option<String>,
        text: impl Into<String>,
        page_number: u32,
    ) -> Self {
        Self {
            id: id.into(),
            level,
            parent_id,
            text: text.into(),
            page_number,
        }
    }

    /// Character count of the trimmed text.
    pub fn trimmed_len(&self) -> usize {
        self.text.trim().chars().count()
    }

    /// Proportional weight for subdivision. A unit with empty text still
    /// gets weight 1 so the total can never collapse to zero.
    pub fn weight(&self) -> usize {
        self.trimmed_len().max(1)
    }
}

/// Errors that make a unit list unusable as a hierarchy.
#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    /// Two units share an identifier.
    #[error("Duplicate unit id '{0}'")]
    DuplicateId(String),

    /// A unit references a parent that does not exist.
    #[error("Unit '{child}' references missing parent '{parent}'")]
    MissingParent { child: String, parent: String },

    /// A unit's parent is not exactly one level coarser.
    #[error("Unit '{child}' ({child_level}) has parent '{parent}' ({parent_level}), expected a {expected} parent")]
    LevelMismatch {
        child: String,
        child_level: UnitLevel,
        parent: String,
        parent_level: UnitLevel,
        expected: UnitLevel,
    },
}

/// Ordered unit list with id and parent/child indexes.
///
/// Immutable once built; the Timing Store holds it behind an `Arc` and every
/// other component reads relations through it.
#[derive(Debug, Default)]
pub struct UnitHierarchy {
    units: Vec<SyncUnit>,
    index: HashMap<String, usize>,
    children: HashMap<String, Vec<usize>>,
}

impl UnitHierarchy {
    /// Build a hierarchy from units in document order.
    ///
    /// Validates the two structural invariants that are hard failures:
    /// id uniqueness and parent-one-level-coarser.
    pub fn from_units(units: Vec<SyncUnit>) -> Result<Self, HierarchyError> {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(units.len());
        for (i, unit) in units.iter().enumerate() {
            if index.insert(unit.id.clone(), i).is_some() {
                return Err(HierarchyError::DuplicateId(unit.id.clone()));
            }
        }

        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, unit) in units.iter().enumerate() {
            if let Some(parent_id) = &unit.parent_id {
                let parent_idx =
                    *index
                        .get(parent_id)
                        .ok_or_else(|| HierarchyError::MissingParent {
                            child: unit.id.clone(),
                            parent: parent_id.clone(),
                        })?;
                let parent = &units[parent_idx];
                let expected = parent.level.finer();
                if expected != Some(unit.level) {
                    return Err(HierarchyError::LevelMismatch {
                        child: unit.id.clone(),
                        child_level: unit.level,
                        parent: parent_id.clone(),
                        parent_level: parent.level,
                        expected: unit.level.coarser().unwrap_or(unit.level),
                    });
                }
                children.entry(parent_id.clone()).or_default().push(i);
            }
        }

        Ok(Self {
            units,
            index,
            children,
        })
    }

    /// All units in document order.
    pub fn units(&self) -> &[SyncUnit] {
        &self.units
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the hierarchy is empty.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Look up a unit by id.
    pub fn get(&self, id: &str) -> Option<&SyncUnit> {
        self.index.get(id).map(|&i| &self.units[i])
    }

    /// Document position of a unit.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Direct children of a unit, in document order.
    pub fn children_of(&self, id: &str) -> Vec<&SyncUnit> {
        self.children
            .get(id)
            .map(|ids| ids.iter().map(|&i| &self.units[i]).collect())
            .unwrap_or_default()
    }

    /// Parent of a unit, if any.
    pub fn parent_of(&self, id: &str) -> Option<&SyncUnit> {
        self.get(id)
            .and_then(|u| u.parent_id.as_deref())
            .and_then(|p| self.get(p))
    }

    /// All descendants of a unit (children, grandchildren), document order
    /// within each generation.
    pub fn descendants_of(&self, id: &str) -> Vec<&SyncUnit> {
        let mut out = Vec::new();
        let mut queue: Vec<&SyncUnit> = self.children_of(id);
        while let Some(unit) = queue.pop() {
            queue.extend(self.children_of(&unit.id));
            out.push(unit);
        }
        out
    }

    /// Siblings of a unit: same parent, same level, document order,
    /// excluding the unit itself.
    pub fn siblings_of(&self, id: &str) -> Vec<&SyncUnit> {
        let Some(unit) = self.get(id) else {
            return Vec::new();
        };
        self.units
            .iter()
            .filter(|u| u.level == unit.level && u.parent_id == unit.parent_id && u.id != unit.id)
            .collect()
    }

    /// Units at a given level, in document order.
    pub fn at_level(&self, level: UnitLevel) -> impl Iterator<Item = &SyncUnit> {
        self.units.iter().filter(move |u| u.level == level)
    }

    /// Units at a given level on a given page, in document order.
    pub fn page_units(&self, page: u32, level: UnitLevel) -> Vec<&SyncUnit> {
        self.units
            .iter()
            .filter(|u| u.level == level && u.page_number == page)
            .collect()
    }

    /// Fingerprint of the ordered id list.
    ///
    /// Stable across re-extraction of the same document, so persisted sync
    /// blocks can detect that they are being reloaded against a different
    /// document.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for unit in &self.units {
            hasher.update(unit.id.as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_units() -> Vec<SyncUnit> {
        vec![
            SyncUnit::new("par0001", UnitLevel::Paragraph, None, "Hi there. Bye.", 1),
            SyncUnit::new(
                "par0001-sen001",
                UnitLevel::Sentence,
                Some("par0001".into()),
                "Hi there.",
                1,
            ),
            SyncUnit::new(
                "par0001-sen001-wrd001",
                UnitLevel::Word,
                Some("par0001-sen001".into()),
                "Hi",
                1,
            ),
            SyncUnit::new(
                "par0001-sen001-wrd002",
                UnitLevel::Word,
                Some("par0001-sen001".into()),
                "there.",
                1,
            ),
            SyncUnit::new(
                "par0001-sen002",
                UnitLevel::Sentence,
                Some("par0001".into()),
                "Bye.",
                1,
            ),
        ]
    }

    #[test]
    fn builds_indexes() {
        let h = UnitHierarchy::from_units(make_units()).unwrap();
        assert_eq!(h.len(), 5);
        assert_eq!(h.children_of("par0001").len(), 2);
        assert_eq!(h.children_of("par0001-sen001").len(), 2);
        assert_eq!(h.parent_of("par0001-sen001").unwrap().id, "par0001");
        assert_eq!(h.position("par0001"), Some(0));
    }

    #[test]
    fn descendants_cover_all_generations() {
        let h = UnitHierarchy::from_units(make_units()).unwrap();
        let mut ids: Vec<&str> = h
            .descendants_of("par0001")
            .iter()
            .map(|u| u.id.as_str())
            .collect();
        ids.sort();
        assert_eq!(
            ids,
            vec![
                "par0001-sen001",
                "par0001-sen001-wrd001",
                "par0001-sen001-wrd002",
                "par0001-sen002",
            ]
        );
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut units = make_units();
        units.push(SyncUnit::new("par0001", UnitLevel::Paragraph, None, "dup", 1));
        let err = UnitHierarchy::from_units(units).unwrap_err();
        assert!(matches!(err, HierarchyError::DuplicateId(id) if id == "par0001"));
    }

    #[test]
    fn parent_must_be_one_level_coarser() {
        let units = vec![
            SyncUnit::new("p1", UnitLevel::Paragraph, None, "text", 1),
            SyncUnit::new("w1", UnitLevel::Word, Some("p1".into()), "text", 1),
        ];
        assert!(matches!(
            UnitHierarchy::from_units(units),
            Err(HierarchyError::LevelMismatch { .. })
        ));
    }

    #[test]
    fn fingerprint_tracks_id_set() {
        let h1 = UnitHierarchy::from_units(make_units()).unwrap();
        let h1_again = UnitHierarchy::from_units(make_units()).unwrap();
        assert_eq!(h1.fingerprint(), h1_again.fingerprint());

        let mut renamed = make_units();
        renamed[4].id = "par0001-sen003".to_string();
        let h2 = UnitHierarchy::from_units(renamed).unwrap();
        assert_ne!(h1.fingerprint(), h2.fingerprint());
    }
}
