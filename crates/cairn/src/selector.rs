//! Selector pipelines: predicates over paths or metadata.
//!
//! A pipeline reduces its selectors to one decision under a [`SelectionMode`].
//! Evaluation short-circuits, so later selectors never run once the outcome
//! is known. An empty pipeline always selects, in both modes.

use crate::error::{BoxError, LayoutError, Result};
use crate::patterns;
use crate::types::{DiscoveredPath, Metadata};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the selectors of one pipeline combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Every selector must accept (AND)
    #[default]
    All,
    /// At least one selector must accept (OR)
    Any,
}

impl SelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(Self::All),
            "any" => Some(Self::Any),
            _ => None,
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A boxed, possibly fallible predicate over `T`.
pub type SelectorFn<'a, T> = Box<dyn Fn(&T) -> std::result::Result<bool, BoxError> + 'a>;

/// Ordered selectors over one kind of input.
pub struct SelectorPipeline<'a, T> {
    selectors: Vec<SelectorFn<'a, T>>,
}

/// Selectors over discovered paths.
pub type PathSelectors<'a> = SelectorPipeline<'a, DiscoveredPath>;
/// Selectors over parsed metadata.
pub type MetadataSelectors<'a> = SelectorPipeline<'a, Metadata>;

impl<'a, T> SelectorPipeline<'a, T> {
    pub fn new() -> Self {
        Self {
            selectors: Vec::new(),
        }
    }

    pub fn push<F>(&mut self, selector: F)
    where
        F: Fn(&T) -> bool + 'a,
    {
        self.selectors.push(Box::new(move |item| Ok(selector(item))));
    }

    /// Add a selector whose errors abort evaluation.
    pub fn try_push<F>(&mut self, selector: F)
    where
        F: Fn(&T) -> std::result::Result<bool, BoxError> + 'a,
    {
        self.selectors.push(Box::new(selector));
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Decide whether `item` is selected.
    ///
    /// A selector error is returned as [`LayoutError::Selector`] and stops
    /// evaluation of the remaining selectors.
    pub fn evaluate(&self, item: &T, mode: SelectionMode) -> Result<bool> {
        if self.selectors.is_empty() {
            return Ok(true);
        }

        for selector in &self.selectors {
            let selected = selector(item).map_err(LayoutError::Selector)?;
            match mode {
                SelectionMode::All if !selected => return Ok(false),
                SelectionMode::Any if selected => return Ok(true),
                _ => {}
            }
        }

        Ok(mode == SelectionMode::All)
    }
}

impl<T> Default for SelectorPipeline<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SelectorPipeline<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorPipeline")
            .field("selectors", &self.selectors.len())
            .finish()
    }
}

// ============================================================================
// Ready-made path selectors
// ============================================================================

/// Accepts everything.
pub fn always<T>(_: &T) -> bool {
    true
}

/// Accepts files whose extension equals `ext` (case-insensitive, no dot).
pub fn extension(ext: impl Into<String>) -> impl Fn(&DiscoveredPath) -> bool {
    let ext = ext.into();
    let ext = ext.trim_start_matches('.').to_string();
    move |path| {
        path.extension()
            .map_or(false, |candidate| candidate.eq_ignore_ascii_case(&ext))
    }
}

/// Accepts files whose relative path matches a glob pattern.
///
/// Patterns without a `/` match at any depth.
pub fn glob(pattern: &str) -> Result<impl Fn(&DiscoveredPath) -> bool> {
    let matcher = patterns::build_matcher(pattern)?;
    Ok(move |path: &DiscoveredPath| matcher.is_match(path.relative()))
}

// ============================================================================
// Ready-made metadata selectors
// ============================================================================

pub fn has_field(name: impl Into<String>) -> impl Fn(&Metadata) -> bool {
    let name = name.into();
    move |meta| meta.contains_key(&name)
}

pub fn field_equals(
    name: impl Into<String>,
    value: impl Into<String>,
) -> impl Fn(&Metadata) -> bool {
    let name = name.into();
    let value = value.into();
    move |meta| meta.get(&name) == Some(value.as_str())
}

pub fn field_in<I, S>(name: impl Into<String>, values: I) -> impl Fn(&Metadata) -> bool
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let name = name.into();
    let values: Vec<String> = values.into_iter().map(Into::into).collect();
    move |meta| {
        meta.get(&name)
            .map_or(false, |value| values.iter().any(|v| v == value))
    }
}

/// Casts a field with [`FromStr`] and tests it.
///
/// Missing or unparsable values are not selected.
pub fn field_parsed<T, P>(name: impl Into<String>, predicate: P) -> impl Fn(&Metadata) -> bool
where
    T: FromStr,
    P: Fn(T) -> bool,
{
    let name = name.into();
    move |meta| meta.get_parsed::<T>(&name).map_or(false, &predicate)
}
