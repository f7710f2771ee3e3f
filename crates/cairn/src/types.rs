//! Core value types flowing through the collection loop.

use crate::error::{LayoutError, Result};
use crate::grammar::{self, SEGMENT_SEPARATOR};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Reserved metadata key holding the final path segment (or final flat token).
pub const FILENAME_FIELD: &str = "filename";

// ============================================================================
// Metadata
// ============================================================================

/// Field values parsed from a path, in the order they were encountered.
///
/// Values are always strings. Casting is left to selectors and augmenters,
/// see [`Metadata::get_parsed`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    fields: IndexMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Parse a field with [`FromStr`].
    ///
    /// Returns `None` when the field is missing or does not parse.
    pub fn get_parsed<T: FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|value| value.parse().ok())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Insert or overwrite a field, returning the previous value.
    ///
    /// Overwriting keeps the field's original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(name.into(), value.into())
    }

    /// Remove a field, keeping the order of the remaining ones.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.shift_remove(name)
    }

    /// Builder form of [`Metadata::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Union with `other`; fields present in both take `other`'s value.
    pub fn merge(mut self, other: Metadata) -> Self {
        self.fields.extend(other.fields);
        self
    }

    pub fn filename(&self) -> Option<&str> {
        self.get(FILENAME_FIELD)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Metadata {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl IntoIterator for Metadata {
    type Item = (String, String);
    type IntoIter = indexmap::map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

// ============================================================================
// Discovered paths
// ============================================================================

/// A file found by [`Layout::discover`](crate::Layout::discover).
///
/// Holds both the root-prefixed path and the path relative to the root.
/// The relative form always uses `/` as its separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DiscoveredPath {
    path: PathBuf,
    relative: String,
}

impl DiscoveredPath {
    /// Build from a root and a `/`-separated relative path.
    pub fn new(root: impl AsRef<Path>, relative: impl Into<String>) -> Self {
        let relative = relative.into();
        let mut path = root.as_ref().to_path_buf();
        for segment in grammar::split_path(&relative) {
            path.push(segment);
        }
        Self { path, relative }
    }

    /// Build from a full path under `root`.
    ///
    /// Fails with `MalformedPath` when `full` is not inside `root` or its
    /// relative part is not valid UTF-8.
    pub fn from_full_path(root: &Path, full: PathBuf) -> Result<Self> {
        let stripped = full.strip_prefix(root).map_err(|_| {
            LayoutError::malformed(&full.to_string_lossy(), "not under the layout root")
        })?;
        let relative = grammar::normalize_relative(stripped).ok_or_else(|| {
            LayoutError::malformed(&stripped.to_string_lossy(), "path is not valid UTF-8")
        })?;
        Ok(Self {
            path: full,
            relative,
        })
    }

    /// The path prefixed by the layout's root directory.
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }

    /// The path relative to the root, `/`-separated.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Final segment of the relative path.
    pub fn file_name(&self) -> &str {
        self.relative
            .rsplit(SEGMENT_SEPARATOR)
            .next()
            .unwrap_or(&self.relative)
    }

    /// Extension of the final segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// Number of directory levels between the root and the file.
    pub fn depth(&self) -> usize {
        self.relative.matches(SEGMENT_SEPARATOR).count()
    }
}

impl fmt::Display for DiscoveredPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

// ============================================================================
// Entries
// ============================================================================

/// One emitted result of the collection loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub path: DiscoveredPath,
    pub metadata: Metadata,
}

impl Entry {
    pub fn into_parts(self) -> (PathBuf, Metadata) {
        (self.path.into_path_buf(), self.metadata)
    }
}
