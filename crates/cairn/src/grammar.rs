//! Path grammar: pure string helpers shared by every layout.
//!
//! Relative paths always use `/` between segments. A segment may hold several
//! tokens joined by the field delimiter, and a named token is `name` and
//! `value` joined by the field-name delimiter.

use std::path::{Component, Path};

/// Segment separator used by every relative path Cairn hands out.
pub const SEGMENT_SEPARATOR: char = '/';

/// Split a relative path into its segments.
pub fn split_path(relative: &str) -> Vec<&str> {
    relative.split(SEGMENT_SEPARATOR).collect()
}

/// Join segments back into a relative path.
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    join_with(segments, SEGMENT_SEPARATOR)
}

/// Split one segment into its tokens.
///
/// The caller checks the token count against the layout's fields.
pub fn split_segment(segment: &str, field_delimiter: char) -> Vec<&str> {
    segment.split(field_delimiter).collect()
}

/// Join tokens into one segment.
pub fn join_tokens<S: AsRef<str>>(tokens: &[S], field_delimiter: char) -> String {
    join_with(tokens, field_delimiter)
}

/// Split a named token on the first field-name delimiter.
///
/// Returns `None` when the delimiter is absent. Later delimiters stay in the
/// value, so `a=b=c` splits into `("a", "b=c")`.
pub fn split_named_token(token: &str, field_name_delimiter: char) -> Option<(&str, &str)> {
    token.split_once(field_name_delimiter)
}

/// Build a named token from a field name and value.
pub fn join_named_token(name: &str, value: &str, field_name_delimiter: char) -> String {
    let mut token = String::with_capacity(name.len() + value.len() + 1);
    token.push_str(name);
    token.push(field_name_delimiter);
    token.push_str(value);
    token
}

/// Render a relative filesystem path with `/` separators on every platform.
///
/// Only normal components are kept, so `./a/b` becomes `a/b`. Returns `None`
/// when a component is not valid UTF-8; metadata is never read from a lossy
/// rendering of a name.
pub fn normalize_relative(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        if let Component::Normal(part) = component {
            parts.push(part.to_str()?);
        }
    }
    Some(join_segments(&parts))
}

fn join_with<S: AsRef<str>>(parts: &[S], separator: char) -> String {
    let mut out = String::new();
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            out.push(separator);
        }
        out.push_str(part.as_ref());
    }
    out
}
