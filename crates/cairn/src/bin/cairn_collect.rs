//! cairn-collect: print the entries of a dataset layout as JSON lines or CSV.

use anyhow::{bail, Context};
use cairn::augment;
use cairn::config::expand_root_dir;
use cairn::selector;
use cairn::{
    CollectionFile, Collector, Entry, IndexOptions, IndexTable, Layout, LayoutConfig, LayoutKind,
    Metadata, OnMalformed, SelectionMode,
};
use cairn_logging::{init_logging, LogConfig};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cairn-collect",
    about = "List dataset files with the metadata encoded in their paths"
)]
struct Args {
    /// Dataset root directory (overrides root_dir from --config)
    root: Option<PathBuf>,

    /// TOML collection file with kind, root_dir, fields and delimiters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Layout kind: flat, hierarchical, named_flat, named_hierarchical
    #[arg(short, long)]
    kind: Option<String>,

    /// Field name, in path order (repeatable)
    #[arg(short = 'f', long = "field")]
    fields: Vec<String>,

    /// Separator between fields in one file name
    #[arg(long)]
    field_delimiter: Option<char>,

    /// Separator between a field name and its value
    #[arg(long)]
    name_delimiter: Option<char>,

    /// Keep files whose relative path matches this glob (repeatable)
    #[arg(short, long = "glob")]
    globs: Vec<String>,

    /// Keep files with this extension (repeatable)
    #[arg(short, long = "ext")]
    extensions: Vec<String>,

    /// Keep records where name=value (repeatable)
    #[arg(short, long = "where")]
    conditions: Vec<String>,

    /// How selectors combine
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Skip files that do not match the layout instead of failing
    #[arg(long)]
    skip_malformed: bool,

    /// Add file size and timestamps to every record
    #[arg(long)]
    file_stats: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Jsonl)]
    format: Format,

    /// CSV only: columns to put first (repeatable)
    #[arg(long = "index-field")]
    index_fields: Vec<String>,

    /// CSV only: add a filepath column
    #[arg(long)]
    add_filepath: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Also append logs to the Cairn log directory
    #[arg(long)]
    log_file: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    All,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Jsonl,
    Csv,
}

#[derive(Serialize)]
struct EntryLine<'e> {
    path: String,
    relative: &'e str,
    metadata: &'e Metadata,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(LogConfig {
        app_name: "cairn-collect",
        verbose: args.verbose,
        log_to_file: args.log_file,
    })?;

    let settings = resolve_settings(&args)?;
    let layout = Layout::new(settings.kind, settings.layout.clone()).with_context(|| {
        format!(
            "Invalid {} layout at {}",
            settings.kind.as_str(),
            settings.layout.root_dir.display()
        )
    })?;
    let collector = build_collector(&args, &settings)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match args.format {
        Format::Jsonl => {
            for entry in layout.collect(&collector) {
                write_json_line(&mut out, &entry?)?;
            }
        }
        Format::Csv => {
            let options = IndexOptions {
                index_fields: args.index_fields.clone(),
                add_filepath: args.add_filepath,
            };
            let table = IndexTable::from_entries(layout.collect(&collector), &options)?;
            table.write_csv(&mut out)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Merge the optional collection file with command-line flags.
fn resolve_settings(args: &Args) -> anyhow::Result<CollectionFile> {
    let kind = args
        .kind
        .as_deref()
        .map(|kind| {
            LayoutKind::parse(kind).with_context(|| format!("Unknown layout kind '{kind}'"))
        })
        .transpose()?;

    let mut settings = match (&args.config, kind) {
        (Some(path), _) => CollectionFile::load(path)
            .with_context(|| format!("Failed to load collection file {}", path.display()))?,
        (None, Some(kind)) => CollectionFile::new(kind, LayoutConfig::new(".")),
        (None, None) => bail!("Either --config or --kind is required"),
    };

    if let Some(kind) = kind {
        settings.kind = kind;
    }
    if let Some(root) = &args.root {
        settings.layout.root_dir = expand_root_dir(root);
    }
    if !args.fields.is_empty() {
        settings.layout.fields = args.fields.clone();
    }
    if let Some(delimiter) = args.field_delimiter {
        settings.layout.field_delimiter = delimiter;
    }
    if let Some(delimiter) = args.name_delimiter {
        settings.layout.field_name_delimiter = Some(delimiter);
    }
    if let Some(mode) = args.mode {
        settings.selection_mode = match mode {
            ModeArg::All => SelectionMode::All,
            ModeArg::Any => SelectionMode::Any,
        };
    }
    if args.skip_malformed {
        settings.on_malformed = OnMalformed::Skip;
    }

    Ok(settings)
}

fn build_collector(args: &Args, settings: &CollectionFile) -> anyhow::Result<Collector<'static>> {
    let mut collector = Collector::new()
        .selection_mode(settings.selection_mode)
        .on_malformed(settings.on_malformed);

    for pattern in &args.globs {
        collector = collector.path_selector(selector::glob(pattern)?);
    }
    for ext in &args.extensions {
        collector = collector.path_selector(selector::extension(ext.clone()));
    }
    for condition in &args.conditions {
        let (name, value) = condition
            .split_once('=')
            .with_context(|| format!("Expected name=value, got '{condition}'"))?;
        let selected = selector::field_equals(name.to_string(), value.to_string());
        collector = collector.metadata_selector(selected);
    }
    if args.file_stats {
        collector = collector.try_augmenter(augment::file_stats());
    }

    Ok(collector)
}

fn write_json_line<W: Write>(out: &mut W, entry: &Entry) -> anyhow::Result<()> {
    let line = EntryLine {
        path: entry.path.as_path().to_string_lossy().into_owned(),
        relative: entry.path.relative(),
        metadata: &entry.metadata,
    };
    serde_json::to_writer(&mut *out, &line)?;
    out.write_all(b"\n")?;
    Ok(())
}
