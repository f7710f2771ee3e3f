//! Layouts: the four grammars that map a directory tree to metadata.
//!
//! Every layout offers the same two operations:
//!
//! - [`Layout::discover`] walks the root and yields files in ascending name
//!   order, sorting siblings at each directory level before descending.
//! - [`Layout::parse`] turns one relative path into a [`Metadata`] record,
//!   always including the reserved `filename` field.
//!
//! ```text
//! Flat               planetary$1965$dune.pdf
//! Hierarchical       planetary/1965/dune.pdf
//! NamedFlat          genre=planetary$year=1965$dune.pdf
//! NamedHierarchical  genre=planetary/year=1965/dune.pdf
//! ```
//!
//! Named layouts take field names from the path. A non-empty `fields` list
//! acts as an allow-list for them; an empty one accepts any name.

use crate::config::{validate_root_dir, LayoutConfig, LayoutKind};
use crate::error::{LayoutError, Result};
use crate::grammar;
use crate::types::{DiscoveredPath, Metadata, FILENAME_FIELD};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A directory layout with its configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    Flat(LayoutConfig),
    Hierarchical(LayoutConfig),
    NamedFlat(LayoutConfig),
    NamedHierarchical(LayoutConfig),
}

impl Layout {
    /// Build a layout, validating the configuration and the root directory.
    pub fn new(kind: LayoutKind, config: LayoutConfig) -> Result<Self> {
        config.validate(kind)?;
        validate_root_dir(&config.root_dir)?;

        Ok(match kind {
            LayoutKind::Flat => Layout::Flat(config),
            LayoutKind::Hierarchical => Layout::Hierarchical(config),
            LayoutKind::NamedFlat => Layout::NamedFlat(config),
            LayoutKind::NamedHierarchical => Layout::NamedHierarchical(config),
        })
    }

    pub fn flat<I, S>(root_dir: impl Into<PathBuf>, fields: I, field_delimiter: char) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = LayoutConfig::new(root_dir)
            .with_fields(fields)
            .with_field_delimiter(field_delimiter);
        Self::new(LayoutKind::Flat, config)
    }

    pub fn hierarchical<I, S>(root_dir: impl Into<PathBuf>, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = LayoutConfig::new(root_dir).with_fields(fields);
        Self::new(LayoutKind::Hierarchical, config)
    }

    pub fn named_flat(
        root_dir: impl Into<PathBuf>,
        field_delimiter: char,
        field_name_delimiter: char,
    ) -> Result<Self> {
        let config = LayoutConfig::new(root_dir)
            .with_field_delimiter(field_delimiter)
            .with_field_name_delimiter(field_name_delimiter);
        Self::new(LayoutKind::NamedFlat, config)
    }

    pub fn named_hierarchical(
        root_dir: impl Into<PathBuf>,
        field_name_delimiter: char,
    ) -> Result<Self> {
        let config = LayoutConfig::new(root_dir).with_field_name_delimiter(field_name_delimiter);
        Self::new(LayoutKind::NamedHierarchical, config)
    }

    pub fn kind(&self) -> LayoutKind {
        match self {
            Layout::Flat(_) => LayoutKind::Flat,
            Layout::Hierarchical(_) => LayoutKind::Hierarchical,
            Layout::NamedFlat(_) => LayoutKind::NamedFlat,
            Layout::NamedHierarchical(_) => LayoutKind::NamedHierarchical,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        match self {
            Layout::Flat(config)
            | Layout::Hierarchical(config)
            | Layout::NamedFlat(config)
            | Layout::NamedHierarchical(config) => config,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.config().root_dir
    }

    /// Walk the root directory and yield every file the layout covers.
    ///
    /// Flat layouts only look at the root itself; hierarchical layouts
    /// descend into every directory. Each call starts a fresh traversal.
    /// Symbolic links are not followed.
    pub fn discover(&self) -> Discover {
        let root = self.root_dir().to_path_buf();
        let walker = WalkDir::new(&root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();
        let walker = match self {
            Layout::Flat(_) | Layout::NamedFlat(_) => walker.max_depth(1),
            Layout::Hierarchical(_) | Layout::NamedHierarchical(_) => walker,
        };

        Discover {
            root,
            walker: walker.into_iter(),
        }
    }

    /// Parse a discovered file's metadata from its relative path.
    pub fn parse(&self, path: &DiscoveredPath) -> Result<Metadata> {
        self.parse_relative(path.relative())
    }

    /// Parse a `/`-separated path relative to the root.
    pub fn parse_relative(&self, relative: &str) -> Result<Metadata> {
        match self {
            Layout::Flat(config) => parse_flat(config, relative),
            Layout::Hierarchical(config) => parse_hierarchical(config, relative),
            Layout::NamedFlat(config) => parse_named_flat(config, relative),
            Layout::NamedHierarchical(config) => parse_named_hierarchical(config, relative),
        }
    }

    /// Rebuild the relative path a record was parsed from.
    ///
    /// Flat layouts need every declared field. Hierarchical layouts write the
    /// leading declared fields the record has, so shallow files round-trip.
    /// Named layouts write every field except `filename` in record order.
    pub fn format(&self, metadata: &Metadata) -> Result<String> {
        let filename = metadata
            .filename()
            .ok_or_else(|| LayoutError::MissingField(FILENAME_FIELD.to_string()))?;

        match self {
            Layout::Flat(config) => {
                let mut tokens = positional_values(config, metadata)?;
                tokens.push(filename);
                Ok(grammar::join_tokens(&tokens, config.field_delimiter))
            }
            Layout::Hierarchical(config) => {
                let mut segments = leading_values(config, metadata)?;
                segments.push(filename);
                Ok(grammar::join_segments(&segments))
            }
            Layout::NamedFlat(config) => {
                let mut tokens = named_tokens(config, metadata);
                tokens.push(filename.to_string());
                Ok(grammar::join_tokens(&tokens, config.field_delimiter))
            }
            Layout::NamedHierarchical(config) => {
                let mut segments = named_tokens(config, metadata);
                segments.push(filename.to_string());
                Ok(grammar::join_segments(&segments))
            }
        }
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// Lazy, sorted traversal returned by [`Layout::discover`].
///
/// Traversal errors are yielded in place; iteration may continue past them.
pub struct Discover {
    root: PathBuf,
    walker: walkdir::IntoIter,
}

impl Iterator for Discover {
    type Item = Result<DiscoveredPath>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(err.into())),
            };

            if !entry.file_type().is_file() {
                continue;
            }

            return Some(DiscoveredPath::from_full_path(&self.root, entry.into_path()));
        }
    }
}

impl std::fmt::Debug for Discover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discover").field("root", &self.root).finish()
    }
}

// ============================================================================
// Parsing
// ============================================================================

fn single_segment<'p>(relative: &'p str) -> Result<&'p str> {
    if relative.contains(grammar::SEGMENT_SEPARATOR) {
        return Err(LayoutError::malformed(
            relative,
            "flat layouts expect a file directly under the root",
        ));
    }
    Ok(relative)
}

fn parse_flat(config: &LayoutConfig, relative: &str) -> Result<Metadata> {
    let name = single_segment(relative)?;
    let tokens = grammar::split_segment(name, config.field_delimiter);
    let expected = config.fields.len() + 1;
    if tokens.len() != expected {
        return Err(LayoutError::malformed(
            relative,
            format!(
                "expected {} tokens separated by '{}', found {}",
                expected,
                config.field_delimiter,
                tokens.len()
            ),
        ));
    }

    let (filename, values) = tokens.split_last().unwrap_or((&name, &[]));
    let mut metadata: Metadata = config.fields.iter().cloned().zip(values.iter().copied()).collect();
    metadata.insert(FILENAME_FIELD, *filename);
    Ok(metadata)
}

/// Files above the deepest level get the leading fields only. Files below it
/// are malformed, since their extra directories would be lost.
fn parse_hierarchical(config: &LayoutConfig, relative: &str) -> Result<Metadata> {
    let segments = grammar::split_path(relative);
    let (filename, dirs) = segments.split_last().unwrap_or((&relative, &[]));
    if dirs.len() > config.fields.len() {
        return Err(LayoutError::malformed(
            relative,
            format!(
                "at most {} directory levels expected, found {}",
                config.fields.len(),
                dirs.len()
            ),
        ));
    }

    let mut metadata: Metadata = config.fields.iter().cloned().zip(dirs.iter().copied()).collect();
    metadata.insert(FILENAME_FIELD, *filename);
    Ok(metadata)
}

fn parse_named_flat(config: &LayoutConfig, relative: &str) -> Result<Metadata> {
    let name = single_segment(relative)?;
    let tokens = grammar::split_segment(name, config.field_delimiter);
    let (filename, named) = tokens.split_last().unwrap_or((&name, &[]));
    parse_named_tokens(config, relative, named, filename)
}

fn parse_named_hierarchical(config: &LayoutConfig, relative: &str) -> Result<Metadata> {
    let segments = grammar::split_path(relative);
    let (filename, dirs) = segments.split_last().unwrap_or((&relative, &[]));
    parse_named_tokens(config, relative, dirs, filename)
}

fn parse_named_tokens(
    config: &LayoutConfig,
    relative: &str,
    tokens: &[&str],
    filename: &str,
) -> Result<Metadata> {
    let delimiter = config.name_delimiter();
    let mut seen = HashSet::with_capacity(tokens.len());
    let mut metadata = Metadata::new();

    for token in tokens {
        let (name, value) = grammar::split_named_token(token, delimiter).ok_or_else(|| {
            LayoutError::malformed(
                relative,
                format!("token '{token}' has no '{delimiter}' between name and value"),
            )
        })?;

        if name.is_empty() {
            return Err(LayoutError::malformed(
                relative,
                format!("token '{token}' has an empty field name"),
            ));
        }
        if name == FILENAME_FIELD {
            return Err(LayoutError::malformed(
                relative,
                format!("'{FILENAME_FIELD}' is reserved and cannot appear in a path"),
            ));
        }
        if !config.fields.is_empty() && !config.fields.iter().any(|f| f == name) {
            return Err(LayoutError::malformed(
                relative,
                format!("field '{name}' is not one of {:?}", config.fields),
            ));
        }
        if !seen.insert(name) {
            return Err(LayoutError::malformed(
                relative,
                format!("field '{name}' appears more than once"),
            ));
        }

        metadata.insert(name, value);
    }

    metadata.insert(FILENAME_FIELD, filename);
    Ok(metadata)
}

// ============================================================================
// Formatting
// ============================================================================

fn positional_values<'m>(config: &LayoutConfig, metadata: &'m Metadata) -> Result<Vec<&'m str>> {
    config
        .fields
        .iter()
        .map(|field| {
            metadata
                .get(field)
                .ok_or_else(|| LayoutError::MissingField(field.clone()))
        })
        .collect()
}

/// Values of the longest run of leading fields present in `metadata`.
///
/// A field present after a missing one cannot be placed in a path.
fn leading_values<'m>(config: &LayoutConfig, metadata: &'m Metadata) -> Result<Vec<&'m str>> {
    let values: Vec<&str> = config
        .fields
        .iter()
        .map_while(|field| metadata.get(field))
        .collect();
    if let Some(gap) = config.fields[values.len()..]
        .iter()
        .find(|field| metadata.contains_key(field))
    {
        let missing = &config.fields[values.len()];
        return Err(LayoutError::MissingField(format!("{missing} (needed before {gap})")));
    }
    Ok(values)
}

fn named_tokens(config: &LayoutConfig, metadata: &Metadata) -> Vec<String> {
    let delimiter = config.name_delimiter();
    metadata
        .iter()
        .filter(|(name, _)| *name != FILENAME_FIELD)
        .map(|(name, value)| grammar::join_named_token(name, value, delimiter))
        .collect()
}
