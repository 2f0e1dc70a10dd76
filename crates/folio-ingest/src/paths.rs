//! Path and string helpers shared by ingestion and the document cache.
//!
//! Logical document paths are `/`-separated strings relative to a staging or
//! canonical folder, without the `.html` extension (e.g. `topic/sub/page`).

use std::path::Path;

/// Ensure a non-empty folder path ends with `/`.
///
/// The empty string stays empty so it can be concatenated as "no sub-folder".
#[must_use]
pub fn pathize(folder: &str) -> String {
    if folder.is_empty() || folder.ends_with('/') {
        folder.to_owned()
    } else {
        format!("{folder}/")
    }
}

/// Remove every space from a logical path.
#[must_use]
pub fn strip_spaces(path: &str) -> String {
    path.replace(' ', "")
}

/// Cache key for a logical path: lower-cased with spaces removed.
#[must_use]
pub fn normalize_key(path: &str) -> String {
    strip_spaces(path).to_lowercase()
}

/// Strip a trailing `.html` suffix if present.
#[must_use]
pub fn strip_html_suffix(path: &str) -> &str {
    path.strip_suffix(".html").unwrap_or(path)
}

/// ASCII case-insensitive substring search starting at byte offset `from`.
///
/// Returns the byte index of the first match. Indices line up with the
/// original string because only ASCII letters are folded.
#[must_use]
pub fn find_ignore_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    if from > hay.len() {
        return None;
    }
    if pat.is_empty() {
        return Some(from);
    }
    if hay.len() - from < pat.len() {
        return None;
    }
    (from..=hay.len() - pat.len()).find(|&i| hay[i..i + pat.len()].eq_ignore_ascii_case(pat))
}

/// Sub-folder of a logical path, with a trailing `/`, or `""` at the top level.
///
/// A path whose only slash is at index 0 is treated as top-level.
#[must_use]
pub fn subfolder_of(logical_path: &str) -> String {
    match logical_path.rfind('/') {
        Some(i) if i >= 1 => pathize(&logical_path[..i]),
        _ => String::new(),
    }
}

/// Express `path` relative to `base` as a `/`-separated string.
///
/// Returns `None` if `path` is not under `base` or contains non-UTF-8 components.
#[must_use]
pub fn relative_slash(path: &Path, base: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}
