//! Converter configuration.
//!
//! Handles loading, validating, and merging `yw-cnv.toml`. Stock defaults
//! are overridden by an optional user file, either found in a directory
//! ([`load_config`]) or named explicitly ([`load_config_file`]).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [files]
//! extension = ".yw7"        # Project file extension (case-insensitive)
//! lock_suffix = ".lock"     # Lock marker written by yWriter next to the project
//! backup_suffix = ".bak"    # Backup kept while a project is rewritten
//!
//! [xml]
//! cdata_tags = []           # Extra element names always written as CDATA
//!
//! [fields]                  # Custom fields the reader picks up per entity
//! project = ["Field_LanguageCode", "Field_CountryCode"]
//! chapter = []
//! scene = ["Field_SceneArcs", "Field_SceneStyle"]
//! character = []
//! location = []
//! item = []
//! project_note = []
//!
//! [splitter]
//! part_marker = "#"         # Line prefix that starts a new part
//! chapter_marker = "##"     # Line prefix that starts a new chapter
//! scene_marker = "###"      # Line prefix that starts a new scene
//! desc_separator = "|"      # Separates title and description after a marker
//! clip_title = 20           # Characters kept from the parent title
//! warning = "(!)"           # Prefix marking fields of a split scene
//!
//! [locale]
//! language = "en"           # Used when a project has no language code
//! country = "US"
//!
//! [log]
//! level = "warn"            # Default filter when RUST_LOG is not set
//!
//! [messages]                # User-facing texts, see MessageCatalog
//! new_scene = "New Scene"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::messages::MessageCatalog;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "yw-cnv.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Converter configuration loaded from `yw-cnv.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Project file naming (extension, lock and backup suffixes).
    pub files: FilesConfig,
    /// Serialization settings.
    pub xml: XmlConfig,
    /// Registered custom field names per entity kind.
    pub fields: FieldsConfig,
    /// Inline divider markers for splitting imported scenes.
    pub splitter: SplitterConfig,
    /// Fallback locale for projects with multilingual markup.
    pub locale: LocaleConfig,
    /// Logging defaults for the CLI.
    pub log: LogConfig,
    /// User-facing message texts.
    pub messages: MessageCatalog,
}

impl ConverterConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("files.extension", &self.files.extension),
            ("files.lock_suffix", &self.files.lock_suffix),
            ("files.backup_suffix", &self.files.backup_suffix),
            ("splitter.part_marker", &self.splitter.part_marker),
            ("splitter.chapter_marker", &self.splitter.chapter_marker),
            ("splitter.scene_marker", &self.splitter.scene_marker),
            ("splitter.desc_separator", &self.splitter.desc_separator),
            ("locale.language", &self.locale.language),
            ("locale.country", &self.locale.country),
        ];
        for (key, value) in required {
            if value.is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.files.lock_suffix == self.files.backup_suffix {
            return Err(ConfigError::Validation(
                "files.lock_suffix and files.backup_suffix must differ".into(),
            ));
        }
        let s = &self.splitter;
        if s.part_marker == s.chapter_marker
            || s.chapter_marker == s.scene_marker
            || s.part_marker == s.scene_marker
        {
            return Err(ConfigError::Validation(
                "splitter markers must be distinct".into(),
            ));
        }
        if s.clip_title == 0 {
            return Err(ConfigError::Validation(
                "splitter.clip_title must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    pub extension: String,
    pub lock_suffix: String,
    pub backup_suffix: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            extension: ".yw7".into(),
            lock_suffix: ".lock".into(),
            backup_suffix: ".bak".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct XmlConfig {
    /// Added to the built-in CDATA element names.
    pub cdata_tags: Vec<String>,
}

/// Custom field names (`Fields/<name>`) read into each entity's `kw_var`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldsConfig {
    pub project: Vec<String>,
    pub chapter: Vec<String>,
    pub scene: Vec<String>,
    pub character: Vec<String>,
    pub location: Vec<String>,
    pub item: Vec<String>,
    pub project_note: Vec<String>,
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            project: vec!["Field_LanguageCode".into(), "Field_CountryCode".into()],
            chapter: Vec::new(),
            scene: vec!["Field_SceneArcs".into(), "Field_SceneStyle".into()],
            character: Vec::new(),
            location: Vec::new(),
            item: Vec::new(),
            project_note: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitterConfig {
    pub part_marker: String,
    pub chapter_marker: String,
    pub scene_marker: String,
    pub desc_separator: String,
    /// Number of characters kept from the parent title of a split scene.
    pub clip_title: usize,
    pub warning: String,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            part_marker: "#".into(),
            chapter_marker: "##".into(),
            scene_marker: "###".into(),
            desc_separator: "|".into(),
            clip_title: 20,
            warning: "(!)".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocaleConfig {
    pub language: String,
    pub country: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language: "en".into(),
            country: "US".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// A `tracing` filter directive, e.g. `"info"` or `"yw_cnv=debug"`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ConverterConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ConverterConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ConverterConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `yw-cnv.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<ConverterConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILE_NAME))
}

/// Load config from an explicit file path. A missing file yields the defaults.
pub fn load_config_file(path: &Path) -> Result<ConverterConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `yw-cnv.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r####"# yw-cnv Configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as yw-cnv.toml in the working directory, or pass it
# explicitly with --config.

# ---------------------------------------------------------------------------
# Project files
# ---------------------------------------------------------------------------
[files]
# Extension of yWriter 7 project files (compared case-insensitively).
extension = ".yw7"
# yWriter creates <project>.yw7.lock while a project is open.
# Reading and writing refuse to touch a locked project.
lock_suffix = ".lock"
# The previous project file is renamed to <project>.yw7.bak before writing.
backup_suffix = ".bak"

# ---------------------------------------------------------------------------
# XML output
# ---------------------------------------------------------------------------
[xml]
# Element names written as CDATA in addition to the built-in ones.
# Names found as CDATA in a project file are added automatically.
cdata_tags = []

# ---------------------------------------------------------------------------
# Custom fields
# ---------------------------------------------------------------------------
# Names of <Fields> children picked up per entity kind. Other custom
# fields are kept in the file but not loaded.
[fields]
project = ["Field_LanguageCode", "Field_CountryCode"]
chapter = []
scene = ["Field_SceneArcs", "Field_SceneStyle"]
character = []
location = []
item = []
project_note = []

# ---------------------------------------------------------------------------
# Scene splitting
# ---------------------------------------------------------------------------
# Lines starting with a marker split imported scenes. The rest of the line
# is "title|description".
[splitter]
part_marker = "#"
chapter_marker = "##"
scene_marker = "###"
desc_separator = "|"
# Characters of the parent title kept in the title of a new scene.
clip_title = 20
# Prefix added to the description and plot fields of a split scene.
warning = "(!)"

# ---------------------------------------------------------------------------
# Locale
# ---------------------------------------------------------------------------
# Written to projects that use [lang=xx] markup but have no locale set.
[locale]
language = "en"
country = "US"

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
# Default tracing filter. The RUST_LOG environment variable takes precedence.
[log]
level = "warn"

# ---------------------------------------------------------------------------
# Messages
# ---------------------------------------------------------------------------
# User-facing texts. {path} is replaced by the file concerned.
[messages]
not_found = "File not found: \"{path}\"."
locked = "yWriter seems to be open. Please close first."
cannot_process = "Can not process file: \"{path}\"."
cannot_overwrite = "Cannot overwrite file: \"{path}\"."
cannot_write = "Cannot write file: \"{path}\"."
unsupported_format = "File type is not supported: \"{path}\"."
new_scene = "New Scene"
new_chapter = "New Chapter"
new_part = "New Part"
"####
}
