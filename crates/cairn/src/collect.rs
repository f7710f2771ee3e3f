//! The collection loop: discover → path filter → parse → metadata filter →
//! augment → emit.
//!
//! [`Collect`] is a pull-based iterator. Each call to `next` walks just far
//! enough to produce one entry, so a consumer can stop at any time. Paths
//! rejected by a path selector are never parsed. The first error ends the
//! sequence; entries already yielded stay valid.

use crate::augment::AugmenterPipeline;
use crate::error::{BoxError, LayoutError, Result};
use crate::layout::{Discover, Layout};
use crate::selector::{MetadataSelectors, PathSelectors};
use crate::types::{DiscoveredPath, Entry, Metadata};
use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;
use tracing::{debug, info, warn};

pub use crate::selector::SelectionMode;

/// What to do with a path the layout cannot parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnMalformed {
    /// Stop the collection with the parse error
    #[default]
    Fail,
    /// Log a warning, count the path and move on
    Skip,
}

/// Selectors, augmenters and modes for one collection.
#[derive(Debug, Default)]
pub struct Collector<'a> {
    path_selectors: PathSelectors<'a>,
    metadata_selectors: MetadataSelectors<'a>,
    augmenters: AugmenterPipeline<'a>,
    selection_mode: SelectionMode,
    on_malformed: OnMalformed,
}

impl<'a> Collector<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&DiscoveredPath) -> bool + 'a,
    {
        self.path_selectors.push(selector);
        self
    }

    pub fn try_path_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&DiscoveredPath) -> std::result::Result<bool, BoxError> + 'a,
    {
        self.path_selectors.try_push(selector);
        self
    }

    pub fn metadata_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&Metadata) -> bool + 'a,
    {
        self.metadata_selectors.push(selector);
        self
    }

    pub fn try_metadata_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(&Metadata) -> std::result::Result<bool, BoxError> + 'a,
    {
        self.metadata_selectors.try_push(selector);
        self
    }

    pub fn augmenter<F>(mut self, augmenter: F) -> Self
    where
        F: Fn(&DiscoveredPath, Metadata) -> Metadata + 'a,
    {
        self.augmenters.push(augmenter);
        self
    }

    pub fn try_augmenter<F>(mut self, augmenter: F) -> Self
    where
        F: Fn(&DiscoveredPath, Metadata) -> std::result::Result<Metadata, BoxError> + 'a,
    {
        self.augmenters.try_push(augmenter);
        self
    }

    /// Combination rule shared by the path and metadata selectors.
    pub fn selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection_mode = mode;
        self
    }

    pub fn on_malformed(mut self, policy: OnMalformed) -> Self {
        self.on_malformed = policy;
        self
    }

    pub fn path_selectors_mut(&mut self) -> &mut PathSelectors<'a> {
        &mut self.path_selectors
    }

    pub fn metadata_selectors_mut(&mut self) -> &mut MetadataSelectors<'a> {
        &mut self.metadata_selectors
    }

    pub fn augmenters_mut(&mut self) -> &mut AugmenterPipeline<'a> {
        &mut self.augmenters
    }

    /// Start a fresh collection over `layout`.
    pub fn collect<'c>(&'c self, layout: &'c Layout) -> Collect<'c, 'a> {
        debug!(
            root = %layout.root_dir().display(),
            kind = layout.kind().as_str(),
            mode = %self.selection_mode,
            path_selectors = self.path_selectors.len(),
            metadata_selectors = self.metadata_selectors.len(),
            augmenters = self.augmenters.len(),
            "Starting collection"
        );

        Collect {
            layout,
            collector: self,
            paths: layout.discover(),
            stats: CollectStats::default(),
            finished: false,
        }
    }
}

impl Layout {
    /// Collect `(path, metadata)` entries using `collector`.
    pub fn collect<'c, 'a>(&'c self, collector: &'c Collector<'a>) -> Collect<'c, 'a> {
        collector.collect(self)
    }
}

/// Outcome counters for one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectStats {
    /// Files yielded by discovery
    pub discovered: u64,
    /// Rejected by the path selectors
    pub discarded_by_path: u64,
    /// Handed to the layout's parser
    pub parsed: u64,
    /// Unparsable paths skipped under `OnMalformed::Skip`
    pub skipped_malformed: u64,
    /// Rejected by the metadata selectors
    pub discarded_by_metadata: u64,
    /// Entries yielded to the caller
    pub emitted: u64,
}

/// Iterator returned by [`Collector::collect`].
pub struct Collect<'c, 'a> {
    layout: &'c Layout,
    collector: &'c Collector<'a>,
    paths: Discover,
    stats: CollectStats,
    finished: bool,
}

impl Collect<'_, '_> {
    /// Counters for everything processed so far.
    pub fn stats(&self) -> CollectStats {
        self.stats
    }

    fn skips(&self, err: &LayoutError) -> bool {
        err.is_malformed_path() && self.collector.on_malformed == OnMalformed::Skip
    }

    fn advance(&mut self) -> Result<Option<Entry>> {
        let collector = self.collector;
        let mode = collector.selection_mode;

        while let Some(path) = self.paths.next() {
            self.stats.discovered += 1;
            let path = match path {
                Ok(path) => path,
                Err(err) if self.skips(&err) => {
                    self.stats.skipped_malformed += 1;
                    warn!(error = %err, "Skipping undecodable path");
                    continue;
                }
                Err(err) => return Err(err),
            };

            if !collector.path_selectors.evaluate(&path, mode)? {
                self.stats.discarded_by_path += 1;
                debug!(path = path.relative(), "Discarded by path selectors");
                continue;
            }

            self.stats.parsed += 1;
            let metadata = match self.layout.parse(&path) {
                Ok(metadata) => metadata,
                Err(err) if self.skips(&err) => {
                    self.stats.skipped_malformed += 1;
                    warn!(path = path.relative(), error = %err, "Skipping malformed path");
                    continue;
                }
                Err(err) => return Err(err),
            };

            if !collector.metadata_selectors.evaluate(&metadata, mode)? {
                self.stats.discarded_by_metadata += 1;
                debug!(path = path.relative(), "Discarded by metadata selectors");
                continue;
            }

            let metadata = collector.augmenters.apply(&path, metadata)?;
            self.stats.emitted += 1;
            return Ok(Some(Entry { path, metadata }));
        }

        Ok(None)
    }
}

impl Iterator for Collect<'_, '_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.advance() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.finished = true;
                info!(
                    root = %self.layout.root_dir().display(),
                    discovered = self.stats.discovered,
                    emitted = self.stats.emitted,
                    discarded_by_path = self.stats.discarded_by_path,
                    discarded_by_metadata = self.stats.discarded_by_metadata,
                    skipped_malformed = self.stats.skipped_malformed,
                    "Collection complete"
                );
                None
            }
            Err(err) => {
                self.finished = true;
                warn!(root = %self.layout.root_dir().display(), error = %err, "Collection aborted");
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for Collect<'_, '_> {}

impl std::fmt::Debug for Collect<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collect")
            .field("root", &self.layout.root_dir())
            .field("stats", &self.stats)
            .field("finished", &self.finished)
            .finish()
    }
}
