//! Engine configuration.
//!
//! TOML-backed settings split into sections that can be updated atomically
//! and independently. Thresholds that tune the editing feel (hold/debounce
//! guards, snap window, overlap tolerance) live here rather than as
//! constants scattered through the session code.

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AlignmentSettings, ConfigSection, ExtractionSettings, LoggingSettings, PathSettings,
    SessionSettings, Settings, SnapSettings,
};
