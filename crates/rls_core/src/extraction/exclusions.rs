//! Exclusion pattern rules.
//!
//! Units whose identifier or text matches any pattern never enter the
//! hierarchy and therefore can never receive a timing entry. The pattern
//! set is configuration data owned here (config `[extraction]` section),
//! not logic scattered per editing surface.

use regex::Regex;

/// Compiled exclusion pattern set.
#[derive(Debug, Default)]
pub struct ExclusionRules {
    patterns: Vec<Regex>,
}

/// Default patterns covering the usual non-narratable furniture:
/// tables of contents, navigation, running headers/footers, and bare
/// page-number units.
pub const DEFAULT_EXCLUSION_PATTERNS: &[&str] = &[
    r"(?i)\btoc\b",
    r"(?i)table[-_ ]of[-_ ]contents",
    r"(?i)^nav",
    r"(?i)\b(header|footer)\b",
    r"(?i)\bpage[-_ ]?num(ber)?s?\b",
    r"^\s*\d+\s*$",
];

/// The default pattern set as owned strings, for seeding configuration.
pub fn exclusion_defaults() -> Vec<String> {
    DEFAULT_EXCLUSION_PATTERNS
        .iter()
        .map(|p| p.to_string())
        .collect()
}

impl ExclusionRules {
    /// Compile rules from pattern strings.
    ///
    /// Fails on the first invalid pattern so a bad config line is caught at
    /// load time rather than silently dropped.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// The built-in default rule set.
    pub fn default_rules() -> Self {
        Self::from_patterns(DEFAULT_EXCLUSION_PATTERNS)
            .expect("built-in exclusion patterns are valid")
    }

    /// Empty rule set (nothing excluded).
    pub fn none() -> Self {
        Self::default()
    }

    /// Number of compiled patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the rule set is empty.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a unit with this id and text should be excluded.
    pub fn is_excluded(&self, unit_id: &str, text: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.is_match(unit_id) || p.is_match(text))
    }
}
