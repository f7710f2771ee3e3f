//! Glob pattern normalization and matching for relative paths.

use crate::error::{LayoutError, Result};
use crate::grammar::SEGMENT_SEPARATOR;
use globset::{GlobBuilder, GlobMatcher};

/// Anchor a user glob to `/`-separated paths relative to the layout root.
///
/// A pattern without a directory part applies at every depth, so `*.pdf`
/// becomes `**/*.pdf`. Leading `./` and `/` are dropped. An empty pattern
/// is rejected rather than read as "everything".
pub fn normalize_glob_pattern(raw: &str) -> Result<String> {
    let mut pattern = raw.trim();
    loop {
        let stripped = pattern.trim_start_matches('/');
        let stripped = stripped.strip_prefix("./").unwrap_or(stripped);
        if stripped.len() == pattern.len() {
            break;
        }
        pattern = stripped;
    }

    if pattern.is_empty() {
        return Err(LayoutError::Pattern(format!(
            "'{raw}' is empty and would never select a file"
        )));
    }

    if pattern.contains(SEGMENT_SEPARATOR) {
        Ok(pattern.to_string())
    } else {
        Ok(format!("**{SEGMENT_SEPARATOR}{pattern}"))
    }
}

/// Build a case-insensitive matcher from a raw pattern.
///
/// `*` does not cross `/`, so `genre=*/*.txt` only matches one level deep.
pub fn build_matcher(raw_pattern: &str) -> Result<GlobMatcher> {
    let normalized = normalize_glob_pattern(raw_pattern)?;
    GlobBuilder::new(&normalized)
        .case_insensitive(true)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| LayoutError::Pattern(format!("{raw_pattern}: {e}")))
}
