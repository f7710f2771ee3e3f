//! Augmenter pipelines: metadata transformations applied after parsing.
//!
//! Every augmenter takes the incoming record by value and returns the record
//! for the next stage. It must return the union of what it received and its
//! own changes; returning a fresh record drops every upstream field. Use
//! [`merging`] for augmenters that only compute new fields.

use crate::error::{BoxError, LayoutError, Result};
use crate::types::{DiscoveredPath, Metadata};
use chrono::{DateTime, Local};
use std::fmt::{self, Write as _};
use std::fs;
use std::time::SystemTime;

/// Default timestamp format used by [`file_stats`].
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub const FILE_SIZE_FIELD: &str = "file_size";
pub const FILE_LAST_ACCESS_FIELD: &str = "file_last_access";
pub const FILE_LAST_MODIFICATION_FIELD: &str = "file_last_modification";
pub const FILE_LAST_CHANGE_FIELD: &str = "file_last_change";

/// A boxed, possibly fallible augmenter.
pub type AugmenterFn<'a> =
    Box<dyn Fn(&DiscoveredPath, Metadata) -> std::result::Result<Metadata, BoxError> + 'a>;

/// Augmenters applied in insertion order.
#[derive(Default)]
pub struct AugmenterPipeline<'a> {
    augmenters: Vec<AugmenterFn<'a>>,
}

impl<'a> AugmenterPipeline<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F>(&mut self, augmenter: F)
    where
        F: Fn(&DiscoveredPath, Metadata) -> Metadata + 'a,
    {
        self.augmenters
            .push(Box::new(move |path, meta| Ok(augmenter(path, meta))));
    }

    /// Add an augmenter whose errors abort the collection.
    pub fn try_push<F>(&mut self, augmenter: F)
    where
        F: Fn(&DiscoveredPath, Metadata) -> std::result::Result<Metadata, BoxError> + 'a,
    {
        self.augmenters.push(Box::new(augmenter));
    }

    pub fn len(&self) -> usize {
        self.augmenters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.augmenters.is_empty()
    }

    /// Thread `metadata` through every augmenter.
    pub fn apply(&self, path: &DiscoveredPath, metadata: Metadata) -> Result<Metadata> {
        self.augmenters
            .iter()
            .try_fold(metadata, |meta, augmenter| {
                augmenter(path, meta).map_err(LayoutError::Augmenter)
            })
    }
}

impl fmt::Debug for AugmenterPipeline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AugmenterPipeline")
            .field("augmenters", &self.augmenters.len())
            .finish()
    }
}

// ============================================================================
// Ready-made augmenters
// ============================================================================

/// Returns the record unchanged.
pub fn identity(_: &DiscoveredPath, metadata: Metadata) -> Metadata {
    metadata
}

/// Adapt an augmenter that only computes new fields.
///
/// Its output is merged over the incoming record, so upstream fields survive.
pub fn merging<F>(compute: F) -> impl Fn(&DiscoveredPath, Metadata) -> Metadata
where
    F: Fn(&DiscoveredPath, &Metadata) -> Metadata,
{
    move |path: &DiscoveredPath, metadata: Metadata| {
        let extra = compute(path, &metadata);
        metadata.merge(extra)
    }
}

/// Sets `key` to a constant value.
pub fn insert(
    key: impl Into<String>,
    value: impl Into<String>,
) -> impl Fn(&DiscoveredPath, Metadata) -> Metadata {
    let key = key.into();
    let value = value.into();
    move |_: &DiscoveredPath, metadata: Metadata| metadata.with(key.clone(), value.clone())
}

/// Drops `key` if present.
pub fn remove(key: impl Into<String>) -> impl Fn(&DiscoveredPath, Metadata) -> Metadata {
    let key = key.into();
    move |_: &DiscoveredPath, mut metadata: Metadata| {
        metadata.remove(&key);
        metadata
    }
}

/// Adds file size and access/modification/change times from a stat call.
pub fn file_stats(
) -> impl Fn(&DiscoveredPath, Metadata) -> std::result::Result<Metadata, BoxError> {
    file_stats_with_format(DEFAULT_TIME_FORMAT)
}

/// [`file_stats`] with a custom `chrono` format string for timestamps.
pub fn file_stats_with_format(
    time_format: impl Into<String>,
) -> impl Fn(&DiscoveredPath, Metadata) -> std::result::Result<Metadata, BoxError> {
    let time_format = time_format.into();
    move |path: &DiscoveredPath, mut metadata: Metadata| -> std::result::Result<Metadata, BoxError> {
        let stats = fs::metadata(path.as_path())?;
        let render = |time: SystemTime| -> std::result::Result<String, BoxError> {
            let mut out = String::new();
            write!(out, "{}", DateTime::<Local>::from(time).format(&time_format))
                .map_err(|_| format!("invalid time format '{time_format}'"))?;
            Ok(out)
        };

        metadata.insert(FILE_SIZE_FIELD, stats.len().to_string());
        metadata.insert(FILE_LAST_ACCESS_FIELD, render(stats.accessed()?)?);
        metadata.insert(FILE_LAST_MODIFICATION_FIELD, render(stats.modified()?)?);
        metadata.insert(FILE_LAST_CHANGE_FIELD, render(changed_at(&stats)?)?);
        Ok(metadata)
    }
}

/// Inode change time on Unix; creation time elsewhere.
fn changed_at(stats: &fs::Metadata) -> std::io::Result<SystemTime> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        use std::time::{Duration, UNIX_EPOCH};
        let secs = stats.ctime();
        let nanos = stats.ctime_nsec().clamp(0, 999_999_999) as u32;
        let time = if secs >= 0 {
            UNIX_EPOCH + Duration::new(secs as u64, nanos)
        } else {
            UNIX_EPOCH - Duration::new(secs.unsigned_abs(), 0)
        };
        Ok(time)
    }

    #[cfg(not(unix))]
    {
        stats.created().or_else(|_| stats.modified())
    }
}
