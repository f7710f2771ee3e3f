//! Layout configuration and the TOML collection file

use crate::collect::{OnMalformed, SelectionMode};
use crate::error::{LayoutError, Result};
use crate::types::FILENAME_FIELD;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Characters that can never be delimiters: path separators and characters
/// that are not portable in file names.
pub const RESERVED_DELIMITERS: &[char] = &['/', '\\', ':', '*', '?', '<', '>', '"', '|'];

pub const DEFAULT_FIELD_DELIMITER: char = '$';
pub const DEFAULT_FIELD_NAME_DELIMITER: char = '=';

/// Which grammar a layout uses to read metadata out of paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// `value$value$filename` files directly under the root.
    Flat,
    /// `value/value/filename`, one field per directory level.
    Hierarchical,
    /// `name=value$name=value$filename` files directly under the root.
    NamedFlat,
    /// `name=value/name=value/filename`, one field per directory level.
    NamedHierarchical,
}

impl LayoutKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Hierarchical => "hierarchical",
            Self::NamedFlat => "named_flat",
            Self::NamedHierarchical => "named_hierarchical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "flat" => Some(Self::Flat),
            "hierarchical" => Some(Self::Hierarchical),
            "named_flat" => Some(Self::NamedFlat),
            "named_hierarchical" => Some(Self::NamedHierarchical),
            _ => None,
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Self::NamedFlat | Self::NamedHierarchical)
    }
}

/// Immutable configuration owned by a [`Layout`](crate::Layout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Directory the layout is rooted at
    pub root_dir: PathBuf,
    /// Positional field names, or the allow-list for named layouts
    #[serde(default)]
    pub fields: Vec<String>,
    /// Separator between sibling fields in one file name
    #[serde(default = "default_field_delimiter")]
    pub field_delimiter: char,
    /// Separator between a field's name and its value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name_delimiter: Option<char>,
}

fn default_field_delimiter() -> char {
    DEFAULT_FIELD_DELIMITER
}

impl LayoutConfig {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            fields: Vec::new(),
            field_delimiter: DEFAULT_FIELD_DELIMITER,
            field_name_delimiter: None,
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_field_delimiter(mut self, delimiter: char) -> Self {
        self.field_delimiter = delimiter;
        self
    }

    pub fn with_field_name_delimiter(mut self, delimiter: char) -> Self {
        self.field_name_delimiter = Some(delimiter);
        self
    }

    /// Field-name delimiter, falling back to the default `=`.
    pub fn name_delimiter(&self) -> char {
        self.field_name_delimiter
            .unwrap_or(DEFAULT_FIELD_NAME_DELIMITER)
    }

    /// Reject structurally invalid configurations.
    ///
    /// Collisions between delimiters and characters inside field values are
    /// not detected; choosing non-colliding delimiters is up to the caller.
    pub fn validate(&self, kind: LayoutKind) -> Result<()> {
        match kind {
            LayoutKind::Flat => check_delimiter("field_delimiter", self.field_delimiter)?,
            LayoutKind::Hierarchical => {}
            LayoutKind::NamedFlat => {
                check_delimiter("field_delimiter", self.field_delimiter)?;
                check_delimiter("field_name_delimiter", self.name_delimiter())?;
                if self.field_delimiter == self.name_delimiter() {
                    return Err(LayoutError::Config(format!(
                        "field_delimiter and field_name_delimiter must differ (both '{}')",
                        self.field_delimiter
                    )));
                }
            }
            LayoutKind::NamedHierarchical => {
                check_delimiter("field_name_delimiter", self.name_delimiter())?
            }
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.is_empty() {
                return Err(LayoutError::Config("field names must not be empty".to_string()));
            }
            if field == FILENAME_FIELD {
                return Err(LayoutError::Config(format!(
                    "'{FILENAME_FIELD}' is reserved and cannot be declared as a field"
                )));
            }
            if !seen.insert(field.as_str()) {
                return Err(LayoutError::Config(format!("duplicate field name '{field}'")));
            }
        }

        Ok(())
    }
}

fn check_delimiter(name: &str, delimiter: char) -> Result<()> {
    if RESERVED_DELIMITERS.contains(&delimiter) {
        return Err(LayoutError::Config(format!(
            "'{delimiter}' is not allowed as {name}; choose a character outside {RESERVED_DELIMITERS:?}"
        )));
    }
    if delimiter.is_whitespace() || delimiter.is_control() {
        return Err(LayoutError::Config(format!(
            "{name} must be a visible character, got {delimiter:?}"
        )));
    }
    Ok(())
}

/// Expand a leading `~` to the home directory.
pub fn expand_root_dir(path: &Path) -> PathBuf {
    if path.starts_with("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(path.strip_prefix("~").unwrap_or(path));
        }
    }
    path.to_path_buf()
}

/// Validate that `path` exists and is a directory.
pub fn validate_root_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(LayoutError::RootNotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(LayoutError::RootNotDirectory(path.to_path_buf()));
    }
    Ok(())
}

// ============================================================================
// Collection file
// ============================================================================

/// A layout plus collection settings, stored as TOML.
///
/// ```toml
/// kind = "flat"
/// root_dir = "~/datasets/books"
/// fields = ["genre", "year"]
/// field_delimiter = "$"
/// selection_mode = "all"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFile {
    pub kind: LayoutKind,

    #[serde(flatten)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub selection_mode: SelectionMode,

    #[serde(default)]
    pub on_malformed: OnMalformed,
}

impl CollectionFile {
    pub fn new(kind: LayoutKind, layout: LayoutConfig) -> Self {
        Self {
            kind,
            layout,
            selection_mode: SelectionMode::default(),
            on_malformed: OnMalformed::default(),
        }
    }

    /// Load a collection file from TOML
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut file: CollectionFile =
            toml::from_str(content).map_err(|e| LayoutError::Config(e.to_string()))?;
        file.layout.root_dir = expand_root_dir(&file.layout.root_dir);
        file.layout.validate(file.kind)?;
        Ok(file)
    }

    /// Save a collection file as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| LayoutError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
