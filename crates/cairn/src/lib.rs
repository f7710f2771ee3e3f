//! Cairn - Dataset Discovery from Directory Layouts
//!
//! Cairn finds the files of a dataset and reads the metadata encoded in
//! their paths. Whatever the directory organization, the result is the same
//! ordered sequence of `(path, metadata)` entries.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────┐   ┌───────────┐   ┌───────────┐
//! │ discover │──▶│   path    │──▶│  parse  │──▶│ metadata  │──▶│  augment  │──▶ Entry
//! │ (sorted) │   │ selectors │   │(Layout) │   │ selectors │   │           │
//! └──────────┘   └───────────┘   └─────────┘   └───────────┘   └───────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Layout**: one of four path grammars (flat or hierarchical, positional
//!   or named fields)
//! - **Selector**: predicate over a path or a parsed record
//! - **Augmenter**: record transformation applied after parsing
//! - **Collector**: the selectors, augmenters and modes of one collection
//!
//! # Example
//!
//! ```no_run
//! use cairn::{selector, Collector, Layout};
//!
//! let layout = Layout::flat("/data/books", ["genre", "year"], '$')?;
//! let collector = Collector::new()
//!     .path_selector(selector::extension("pdf"))
//!     .metadata_selector(selector::field_parsed("year", |year: i32| year < 2000));
//!
//! for entry in layout.collect(&collector) {
//!     let entry = entry?;
//!     println!("{} {:?}", entry.path, entry.metadata);
//! }
//! # Ok::<(), cairn::LayoutError>(())
//! ```

pub mod augment;
pub mod collect;
pub mod config;
pub mod error;
pub mod grammar;
pub mod index;
pub mod layout;
pub mod patterns;
pub mod selector;
pub mod types;

// Re-exports for convenience
pub use augment::AugmenterPipeline;
pub use collect::{Collect, CollectStats, Collector, OnMalformed};
pub use config::{CollectionFile, LayoutConfig, LayoutKind};
pub use error::{BoxError, LayoutError, Result};
pub use index::{IndexOptions, IndexTable};
pub use layout::{Discover, Layout};
pub use selector::{SelectionMode, SelectorPipeline};
pub use types::{DiscoveredPath, Entry, Metadata, FILENAME_FIELD};
