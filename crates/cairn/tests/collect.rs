//! End-to-end collection tests over real directory trees.

use cairn::augment::{self, FILE_LAST_MODIFICATION_FIELD, FILE_SIZE_FIELD};
use cairn::selector;
use cairn::{
    Collector, Entry, IndexOptions, IndexTable, Layout, LayoutError, Metadata, OnMalformed,
    SelectionMode,
};
use filetime::{set_file_mtime, FileTime};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A dataset root in a temp directory
struct TestEnv {
    /// Temp directory (cleaned up on drop)
    _temp: TempDir,
    pub root: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path().join("books");
        fs::create_dir_all(&root).expect("Failed to create root dir");
        Self { _temp: temp, root }
    }

    fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok();
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    fn write_files(&self, names: &[&str]) {
        for name in names {
            self.write_file(name, "");
        }
    }
}

fn relatives(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.path.relative()).collect()
}

fn collect_all(layout: &Layout, collector: &Collector<'_>) -> Vec<Entry> {
    layout
        .collect(collector)
        .collect::<cairn::Result<Vec<_>>>()
        .unwrap()
}

fn flat_books() -> (TestEnv, Layout) {
    let env = TestEnv::new();
    env.write_files(&[
        "planetary$1965$dune.pdf",
        "dystopian$1949$1984.pdf",
        "planetary$2011$the_martian.pdf",
        "dystopian$1932$brave_new_world.pdf",
    ]);
    let layout = Layout::flat(&env.root, ["genre", "year"], '$').unwrap();
    (env, layout)
}

// ============================================================================
// Flat layouts
// ============================================================================

#[test]
fn test_flat_collects_in_name_order() {
    let (env, layout) = flat_books();
    let entries = collect_all(&layout, &Collector::new());

    assert_eq!(
        relatives(&entries),
        vec![
            "dystopian$1932$brave_new_world.pdf",
            "dystopian$1949$1984.pdf",
            "planetary$1965$dune.pdf",
            "planetary$2011$the_martian.pdf",
        ]
    );
    assert_eq!(
        entries[1].metadata,
        Metadata::from([("genre", "dystopian"), ("year", "1949"), ("filename", "1984.pdf")])
    );
    assert_eq!(entries[1].path.as_path(), env.root.join("dystopian$1949$1984.pdf"));
}

#[test]
fn test_flat_ignores_subdirectories() {
    let (env, layout) = flat_books();
    env.write_file("archive/planetary$1951$foundation.pdf", "");

    let entries = collect_all(&layout, &Collector::new());
    assert_eq!(entries.len(), 4);
    assert!(entries.iter().all(|e| e.path.depth() == 0));
}

#[test]
fn test_malformed_path_stops_collection() {
    let (env, layout) = flat_books();
    env.write_file("notes.txt", "");

    let collector = Collector::new();
    let mut collect = layout.collect(&collector);
    let mut ok = 0;
    let err = loop {
        match collect.next() {
            Some(Ok(_)) => ok += 1,
            Some(Err(err)) => break err,
            None => panic!("expected a malformed path error"),
        }
    };

    // "notes.txt" sorts after both dystopian entries
    assert_eq!(ok, 2);
    assert!(err.is_malformed_path(), "got {err:?}");
    assert!(collect.next().is_none());
    assert!(collect.next().is_none());
}

#[test]
fn test_skip_malformed_counts_skipped_paths() {
    let (env, layout) = flat_books();
    env.write_file("notes.txt", "");
    env.write_file("too$many$tokens$here.pdf", "");

    let collector = Collector::new().on_malformed(OnMalformed::Skip);
    let mut collect = layout.collect(&collector);
    let entries: Vec<_> = collect.by_ref().collect::<cairn::Result<_>>().unwrap();

    assert_eq!(entries.len(), 4);
    let stats = collect.stats();
    assert_eq!(stats.discovered, 6);
    assert_eq!(stats.skipped_malformed, 2);
    assert_eq!(stats.emitted, 4);
}

#[test]
fn test_path_selector_prevents_parsing() {
    let (env, layout) = flat_books();
    env.write_file("README", "");

    let collector = Collector::new().path_selector(selector::extension("pdf"));
    let mut collect = layout.collect(&collector);
    let entries: Vec<_> = collect.by_ref().collect::<cairn::Result<_>>().unwrap();

    assert_eq!(entries.len(), 4);
    let stats = collect.stats();
    assert_eq!(stats.discarded_by_path, 1);
    assert_eq!(stats.parsed, 4);
}

#[test]
fn test_metadata_selector_with_cast() {
    let (_env, layout) = flat_books();
    let collector =
        Collector::new().metadata_selector(selector::field_parsed("year", |year: i32| year < 2000));

    let entries = collect_all(&layout, &collector);
    let titles: Vec<_> = entries.iter().filter_map(|e| e.metadata.filename()).collect();
    assert_eq!(titles, vec!["brave_new_world.pdf", "1984.pdf", "dune.pdf"]);
}

#[test]
fn test_all_and_any_modes() {
    let (_env, layout) = flat_books();
    let build = |mode| {
        Collector::new()
            .selection_mode(mode)
            .metadata_selector(selector::field_equals("genre", "planetary"))
            .metadata_selector(selector::field_equals("genre", "dystopian"))
    };

    // Mutually exclusive selectors under All select nothing
    let all = build(SelectionMode::All);
    assert!(collect_all(&layout, &all).is_empty());

    // Under Any they select the union, in discovery order
    let any = build(SelectionMode::Any);
    let union = collect_all(&layout, &any);

    let only = |genre: &str| {
        let collector = Collector::new().metadata_selector(selector::field_equals("genre", genre));
        collect_all(&layout, &collector)
    };
    let dystopian = only("dystopian");
    let planetary = only("planetary");
    assert_eq!(dystopian.len(), 2);
    assert_eq!(planetary.len(), 2);

    let expected: Vec<Entry> = dystopian.into_iter().chain(planetary).collect();
    assert_eq!(union, expected);
}

#[test]
fn test_any_over_overlapping_selectors_keeps_discovery_order() {
    let (_env, layout) = flat_books();
    let any = Collector::new()
        .selection_mode(SelectionMode::Any)
        .metadata_selector(selector::field_parsed("year", |year: i32| year > 1960))
        .metadata_selector(selector::field_equals("genre", "dystopian"));

    let all = collect_all(&layout, &Collector::new());
    let expected: Vec<&str> = all
        .iter()
        .filter(|e| {
            e.metadata.get_parsed::<i32>("year").map_or(false, |y| y > 1960)
                || e.metadata.get("genre") == Some("dystopian")
        })
        .map(|e| e.path.relative())
        .collect();

    let union = collect_all(&layout, &any);
    assert_eq!(relatives(&union), expected);
    assert_eq!(union.len(), 4);
}

#[test]
fn test_collection_is_lazy() {
    let (_env, layout) = flat_books();
    let parsed = Cell::new(0);
    let collector = Collector::new().metadata_selector(|_: &Metadata| {
        parsed.set(parsed.get() + 1);
        true
    });

    let mut collect = layout.collect(&collector);
    let first = collect.next().unwrap().unwrap();
    assert_eq!(first.metadata.get("year"), Some("1932"));
    assert_eq!(parsed.get(), 1);
    assert_eq!(collect.stats().discovered, 1);

    drop(collect);
    assert_eq!(parsed.get(), 1);
}

#[test]
fn test_repeated_collections_are_identical() {
    let (_env, layout) = flat_books();
    let collector = Collector::new().path_selector(selector::glob("*$19*").unwrap());

    let first = collect_all(&layout, &collector);
    let second = collect_all(&layout, &collector);
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_selector_error_ends_collection() {
    let (_env, layout) = flat_books();
    let collector = Collector::new().try_metadata_selector(|meta: &Metadata| {
        if meta.get("genre") == Some("planetary") {
            return Err("no planetary books allowed".into());
        }
        Ok(true)
    });

    let results: Vec<_> = layout.collect(&collector).collect();
    assert_eq!(results.len(), 3);
    assert!(results[..2].iter().all(|r| r.is_ok()));
    assert!(matches!(results[2], Err(LayoutError::Selector(_))));
}

// ============================================================================
// Hierarchical layouts
// ============================================================================

#[test]
fn test_hierarchical_depth_first_order() {
    let env = TestEnv::new();
    env.write_files(&[
        "planetary/2011/the_martian.txt",
        "planetary/1965/dune.txt",
        "dystopian/1949/1984.txt",
        "dystopian/1932/brave_new_world.txt",
    ]);
    let layout = Layout::hierarchical(&env.root, ["genre", "year"]).unwrap();

    let entries = collect_all(&layout, &Collector::new());
    assert_eq!(
        relatives(&entries),
        vec![
            "dystopian/1932/brave_new_world.txt",
            "dystopian/1949/1984.txt",
            "planetary/1965/dune.txt",
            "planetary/2011/the_martian.txt",
        ]
    );
    assert_eq!(
        entries[3].metadata,
        Metadata::from([
            ("genre", "planetary"),
            ("year", "2011"),
            ("filename", "the_martian.txt")
        ])
    );
}

#[test]
fn test_hierarchical_mixed_depths_in_pre_order() {
    let env = TestEnv::new();
    env.write_files(&[
        "planetary/README.txt",
        "planetary/2011/the_martian.txt",
        "index.txt",
        "planetary/1965/dune.txt",
        "dystopian/1949/1984.txt",
    ]);
    let layout = Layout::hierarchical(&env.root, ["genre", "year"]).unwrap();

    let collector = Collector::new();
    let first = collect_all(&layout, &collector);
    assert_eq!(
        relatives(&first),
        vec![
            "dystopian/1949/1984.txt",
            "index.txt",
            "planetary/1965/dune.txt",
            "planetary/2011/the_martian.txt",
            "planetary/README.txt",
        ]
    );

    // Files above the deepest level carry the leading fields only
    assert_eq!(first[1].metadata, Metadata::from([("filename", "index.txt")]));
    assert_eq!(
        first[4].metadata,
        Metadata::from([("genre", "planetary"), ("filename", "README.txt")])
    );

    let second = collect_all(&layout, &collector);
    assert_eq!(first, second);
}

#[test]
fn test_hierarchical_file_below_deepest_level() {
    let env = TestEnv::new();
    env.write_files(&["planetary/1965/dune.txt", "planetary/1965/extras/map.png"]);
    let layout = Layout::hierarchical(&env.root, ["genre", "year"]).unwrap();

    let collector = Collector::new();
    let results: Vec<_> = layout.collect(&collector).collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(&results[1], Err(err) if err.is_malformed_path()));

    let skipping = Collector::new().on_malformed(OnMalformed::Skip);
    let mut collect = layout.collect(&skipping);
    let entries: Vec<_> = collect.by_ref().collect::<cairn::Result<_>>().unwrap();
    assert_eq!(relatives(&entries), vec!["planetary/1965/dune.txt"]);
    assert_eq!(collect.stats().skipped_malformed, 1);
}

#[test]
fn test_named_hierarchical_with_dollar_delimiter() {
    let env = TestEnv::new();
    env.write_files(&[
        "genre$planetary/year$2011/the_martian.txt",
        "genre$planetary/year$1965/dune.txt",
        "genre$dystopian/year$1949/1984.txt",
    ]);
    let layout = Layout::named_hierarchical(&env.root, '$').unwrap();

    let entries = collect_all(&layout, &Collector::new());
    assert_eq!(
        relatives(&entries),
        vec![
            "genre$dystopian/year$1949/1984.txt",
            "genre$planetary/year$1965/dune.txt",
            "genre$planetary/year$2011/the_martian.txt",
        ]
    );
    assert_eq!(
        entries[0].metadata,
        Metadata::from([("genre", "dystopian"), ("year", "1949"), ("filename", "1984.txt")])
    );
}

#[test]
fn test_named_flat_collects_variable_fields() {
    let env = TestEnv::new();
    env.write_files(&[
        "genre=planetary$year=1965$dune.pdf",
        "genre=dystopian$1984.pdf",
    ]);
    let layout = Layout::named_flat(&env.root, '$', '=').unwrap();

    let entries = collect_all(&layout, &Collector::new());
    assert_eq!(entries.len(), 2);
    assert_eq!(
        entries[0].metadata,
        Metadata::from([("genre", "dystopian"), ("filename", "1984.pdf")])
    );
    assert_eq!(entries[1].metadata.get("year"), Some("1965"));
}

#[test]
fn test_empty_root_yields_nothing() {
    let env = TestEnv::new();
    let layout = Layout::hierarchical(&env.root, ["genre"]).unwrap();
    let collector = Collector::new();
    let mut collect = layout.collect(&collector);
    assert!(collect.next().is_none());
    assert_eq!(collect.stats().discovered, 0);
}

// ============================================================================
// Augmenters and index tables
// ============================================================================

#[test]
fn test_file_stats_augmenter() {
    let env = TestEnv::new();
    let path = env.write_file("planetary$1965$dune.pdf", "spice");
    set_file_mtime(&path, FileTime::from_unix_time(1_000_000_000, 0)).unwrap();

    let layout = Layout::flat(&env.root, ["genre", "year"], '$').unwrap();
    let collector = Collector::new().try_augmenter(augment::file_stats_with_format("%Y"));
    let entries = collect_all(&layout, &collector);

    let meta = &entries[0].metadata;
    assert_eq!(meta.get("genre"), Some("planetary"));
    assert_eq!(meta.get(FILE_SIZE_FIELD), Some("5"));
    // 2001-09-09 UTC, far from a year boundary in every time zone
    assert_eq!(meta.get(FILE_LAST_MODIFICATION_FIELD), Some("2001"));
}

#[test]
fn test_augmenters_run_in_order_after_selection() {
    let (_env, layout) = flat_books();
    let collector = Collector::new()
        .metadata_selector(selector::field_equals("genre", "planetary"))
        .augmenter(augment::insert("shelf", "A3"))
        .augmenter(augment::merging(|_, meta: &Metadata| {
            let shelf = meta.get("shelf").unwrap_or("?");
            Metadata::from([("location", format!("{shelf}/{}", meta.get("year").unwrap_or("?")))])
        }));

    let entries = collect_all(&layout, &collector);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].metadata.get("location"), Some("A3/1965"));
    assert_eq!(entries[0].metadata.get("genre"), Some("planetary"));
}

#[test]
fn test_index_table_from_collection() {
    let (env, layout) = flat_books();
    let options = IndexOptions {
        index_fields: vec!["year".to_string()],
        add_filepath: true,
    };
    let table = IndexTable::from_entries(layout.collect(&Collector::new()), &options).unwrap();

    assert_eq!(table.columns(), ["year", "genre", "filename", "filepath"]);
    assert_eq!(
        table.column("year").unwrap(),
        vec![Some("1932"), Some("1949"), Some("1965"), Some("2011")]
    );
    let first = env.root.join("dystopian$1932$brave_new_world.pdf");
    assert_eq!(
        table.column("filepath").unwrap()[0].map(Path::new),
        Some(first.as_path())
    );
}

#[cfg(unix)]
#[test]
fn test_non_utf8_name_is_malformed() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let (env, layout) = flat_books();
    fs::write(env.root.join(OsStr::from_bytes(b"planetary$1965$d\xfcne.pdf")), "").unwrap();

    let collector = Collector::new();
    let results: Vec<_> = layout.collect(&collector).collect();
    assert!(matches!(results.last(), Some(Err(err)) if err.is_malformed_path()));

    let skipping = Collector::new().on_malformed(OnMalformed::Skip);
    let mut collect = layout.collect(&skipping);
    let entries: Vec<_> = collect.by_ref().collect::<cairn::Result<_>>().unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(collect.stats().skipped_malformed, 1);
}
