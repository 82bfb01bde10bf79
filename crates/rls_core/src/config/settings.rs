//! Settings struct with TOML-based sections.
//!
//! Each section maps to one TOML table and can be updated independently.

use serde::{Deserialize, Serialize};

use crate::extraction::ExclusionRules;
use crate::models::AlignmentMode;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Working directories.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Unit extraction configuration.
    #[serde(default)]
    pub extraction: ExtractionSettings,

    /// Manual editing session guards.
    #[serde(default)]
    pub session: SessionSettings,

    /// Silence snapping parameters.
    #[serde(default)]
    pub snapping: SnapSettings,

    /// Automatic alignment configuration.
    #[serde(default)]
    pub alignment: AlignmentSettings,
}

/// Identifies one settings section for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Logging,
    Extraction,
    Session,
    Snapping,
    Alignment,
}

impl ConfigSection {
    /// TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Extraction => "extraction",
            ConfigSection::Session => "session",
            ConfigSection::Snapping => "snapping",
            ConfigSection::Alignment => "alignment",
        }
    }

    /// All sections, in file order.
    pub fn all() -> &'static [ConfigSection] {
        &[
            ConfigSection::Paths,
            ConfigSection::Logging,
            ConfigSection::Extraction,
            ConfigSection::Session,
            ConfigSection::Snapping,
            ConfigSection::Alignment,
        ]
    }
}

/// Working directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder for persisted sync block manifests.
    #[serde(default = "default_blocks_folder")]
    pub blocks_folder: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Last opened document path.
    #[serde(default)]
    pub last_document_path: String,

    /// Last opened audio path.
    #[serde(default)]
    pub last_audio_path: String,
}

fn default_blocks_folder() -> String {
    "sync_blocks".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            blocks_folder: default_blocks_folder(),
            logs_folder: default_logs_folder(),
            last_document_path: String::new(),
            last_audio_path: String::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level when RUST_LOG is unset (trace/debug/info/warn/error).
    #[serde(default = "default_log_level")]
    pub default_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            default_level: default_log_level(),
        }
    }
}

/// Unit extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSettings {
    /// Regex patterns excluding non-narratable units (TOC, navigation,
    /// headers/footers, page numbers) by id or text.
    #[serde(default = "default_exclusion_patterns")]
    pub exclusion_patterns: Vec<String>,
}

fn default_exclusion_patterns() -> Vec<String> {
    crate::extraction::exclusion_defaults()
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            exclusion_patterns: default_exclusion_patterns(),
        }
    }
}

impl ExtractionSettings {
    /// Compile the configured patterns.
    pub fn rules(&self) -> Result<ExclusionRules, regex::Error> {
        ExclusionRules::from_patterns(&self.exclusion_patterns)
    }
}

/// Manual editing session guards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// A press-and-hold shorter than this is treated as accidental.
    #[serde(default = "default_min_hold_ms")]
    pub min_hold_ms: u64,

    /// Minimum gap since the previous accepted mark (key-bounce debounce).
    #[serde(default = "default_min_sync_interval_ms")]
    pub min_sync_interval_ms: u64,

    /// Maximum undo depth (oldest snapshots drop off).
    #[serde(default = "default_undo_depth")]
    pub undo_depth: usize,

    /// Propagate accepted sentence marks down to word level.
    #[serde(default = "default_true")]
    pub propagate_words: bool,
}

fn default_min_hold_ms() -> u64 {
    150
}

fn default_min_sync_interval_ms() -> u64 {
    300
}

fn default_undo_depth() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            min_hold_ms: default_min_hold_ms(),
            min_sync_interval_ms: default_min_sync_interval_ms(),
            undo_depth: default_undo_depth(),
            propagate_words: true,
        }
    }
}

/// Silence snapping parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapSettings {
    /// Search window on each side of the target, in milliseconds.
    #[serde(default = "default_snap_window_ms")]
    pub window_ms: u32,

    /// Absolute amplitude below which a sample counts as silence.
    #[serde(default = "default_amplitude_threshold")]
    pub amplitude_threshold: f32,
}

fn default_snap_window_ms() -> u32 {
    100
}

fn default_amplitude_threshold() -> f32 {
    0.1
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            window_ms: default_snap_window_ms(),
            amplitude_threshold: default_amplitude_threshold(),
        }
    }
}

/// Automatic alignment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentSettings {
    /// Language hint passed to the alignment service.
    #[serde(default = "default_language")]
    pub language: String,

    /// Preferred strategy when both are available.
    #[serde(default)]
    pub default_mode: AlignmentMode,

    /// Sibling interval overlap tolerated without a warning, in ms.
    #[serde(default = "default_overlap_tolerance_ms")]
    pub sibling_overlap_tolerance_ms: u32,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_overlap_tolerance_ms() -> u32 {
    5
}

impl Default for AlignmentSettings {
    fn default() -> Self {
        Self {
            language: default_language(),
            default_mode: AlignmentMode::default(),
            sibling_overlap_tolerance_ms: default_overlap_tolerance_ms(),
        }
    }
}
