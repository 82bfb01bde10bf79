//! Document Unit Extractor.
//!
//! Walks an already-tagged markup document (the output of the upstream
//! PDF-to-XHTML step) into an ordered list of syncable units. The extractor
//! never parses arbitrary markup beyond this tagged structure, and it fails
//! soft: malformed input yields an empty unit list plus diagnostics.

mod exclusions;
mod extractor;

pub use exclusions::{exclusion_defaults, ExclusionRules, DEFAULT_EXCLUSION_PATTERNS};
pub use extractor::{extract_units, ExtractionReport};
