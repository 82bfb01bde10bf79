//! Config manager for loading, saving, and atomic section updates.
//!
//! Writes go to a temp file first and are renamed into place; section
//! updates re-read the on-disk document and replace only the target table
//! so unrelated sections keep their formatting.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid exclusion pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages engine configuration on disk.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Create a manager for the given config file path.
    ///
    /// Does not touch the disk; call `load()` or `load_or_create()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    /// The config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Current in-memory settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mutable access to the in-memory settings.
    ///
    /// Changes only reach disk through `save()` or `update_section()`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file; error if the file does not exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }
        let content = fs::read_to_string(&self.config_path)?;
        let settings: Settings = toml::from_str(&content)?;
        // Surface a bad exclusion pattern at load time, not first use.
        settings.extraction.rules()?;
        self.settings = settings;
        Ok(())
    }

    /// Load config, creating the file with defaults if it is missing.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            self.load()
        } else {
            self.settings = Settings::default();
            self.save()
        }
    }

    /// Ensure configured directories exist.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        for dir in [
            &self.settings.paths.blocks_folder,
            &self.settings.paths.logs_folder,
        ] {
            let path = PathBuf::from(dir);
            if !path.exists() {
                fs::create_dir_all(&path)?;
            }
        }
        Ok(())
    }

    /// Folder where sync block manifests are persisted.
    pub fn blocks_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.blocks_folder)
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let mut output = String::new();
        output.push_str("# Readalong Studio configuration\n");
        output.push_str("# Auto-generated; unknown keys are dropped on rewrite.\n");
        for section in ConfigSection::all() {
            output.push('\n');
            output.push_str(&format!("[{}]\n", section.table_name()));
            output.push_str(&self.section_toml(*section)?);
        }
        self.atomic_write(&output)?;
        Ok(())
    }

    /// Update a single section atomically.
    ///
    /// Re-reads the file from disk, replaces only the target table, and
    /// writes back, so concurrent in-memory edits to other sections never
    /// leak to disk.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current.is_empty() {
            DocumentMut::new()
        } else {
            current.parse()?
        };

        let section_doc: DocumentMut = self.section_toml(section)?.parse()?;
        doc[section.table_name()] = Item::Table(section_doc.as_table().clone());

        self.atomic_write(&doc.to_string())?;
        Ok(())
    }

    /// Serialize one section's current in-memory values.
    fn section_toml(&self, section: ConfigSection) -> ConfigResult<String> {
        let toml = match section {
            ConfigSection::Paths => toml::to_string_pretty(&self.settings.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&self.settings.logging)?,
            ConfigSection::Extraction => toml::to_string_pretty(&self.settings.extraction)?,
            ConfigSection::Session => toml::to_string_pretty(&self.settings.session)?,
            ConfigSection::Snapping => toml::to_string_pretty(&self.settings.snapping)?,
            ConfigSection::Alignment => toml::to_string_pretty(&self.settings.alignment)?,
        };
        Ok(toml)
    }

    /// Write content to the config file via temp file + rename.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.config_path.with_extension("toml.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.config_path)?;
        Ok(())
    }
}
