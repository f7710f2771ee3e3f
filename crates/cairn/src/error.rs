//! Error types for layout discovery and collection

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by fallible selectors and augmenters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Cairn error type
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Root directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Root is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    #[error("Malformed path '{path}': {reason}")]
    MalformedPath { path: String, reason: String },

    #[error("Missing field '{0}' needed to build a path")]
    MissingField(String),

    #[error("Selector failed: {0}")]
    Selector(#[source] BoxError),

    #[error("Augmenter failed: {0}")]
    Augmenter(#[source] BoxError),

    #[error("Pattern error: {0}")]
    Pattern(String),

    #[error("Unknown index field: {0}")]
    UnknownIndexField(String),

    #[error("Column '{0}' is both a metadata field and an added column")]
    ColumnConflict(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl LayoutError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        LayoutError::MalformedPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by a path that does not fit the layout grammar.
    pub fn is_malformed_path(&self) -> bool {
        matches!(self, LayoutError::MalformedPath { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, LayoutError>;
