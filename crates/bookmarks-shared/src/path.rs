//! Path codec for the `/`-delimited bookmark hierarchy.
//!
//! A bookmark's `path` is the canonical path of its parent folder. A folder's
//! own canonical path is `folder_full_path(folder.path, folder.display_name)`.
//! The root `/` is virtual.

use crate::constants::{PATH_SEPARATOR, ROOT_PATH};

/// Split a full path into `(parent, leaf)` at the last separator.
///
/// Returns `None` if the input contains no separator. A separator at
/// position 0 yields the root as parent, so `"/A"` becomes `("/", "A")` and
/// `"/"` becomes `("/", "")`.
pub fn split_path(full: &str) -> Option<(&str, &str)> {
    let idx = full.rfind(PATH_SEPARATOR)?;
    let parent = if idx == 0 { ROOT_PATH } else { &full[..idx] };
    Some((parent, &full[idx + 1..]))
}

/// Synthesize the canonical path of a folder from its parent path and name.
///
/// The parent is normalized to end in exactly one separator and an accidental
/// leading `//` collapses to `/`.
pub fn folder_full_path(parent: &str, display_name: &str) -> String {
    let mut full = parent.to_string();
    if !full.ends_with(PATH_SEPARATOR) {
        full.push(PATH_SEPARATOR);
    }
    if full.starts_with("//") {
        full.replace_range(..2, ROOT_PATH);
    }
    full.push_str(display_name);
    full
}

/// `true` if `path` is the virtual root.
pub fn is_root(path: &str) -> bool {
    path == ROOT_PATH
}

/// `true` if `candidate` equals `prefix` or lies below it.
///
/// `"/A"` is within `"/A"` and `"/A/B"` but not within `"/AB"`.
pub fn is_within(candidate: &str, prefix: &str) -> bool {
    match candidate.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with(PATH_SEPARATOR),
        None => false,
    }
}

/// Replace the leading `old_prefix` of `path` with `new_prefix`.
///
/// Only the prefix is substituted; later occurrences of the same text stay
/// untouched. Returns `None` when `path` is not within `old_prefix`.
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if !is_within(path, old_prefix) {
        return None;
    }
    Some(format!("{}{}", new_prefix, &path[old_prefix.len()..]))
}

/// Shape check for paths arriving from callers.
///
/// A valid path is non-empty, starts with `/` and, unless it is the root,
/// has no trailing separator and no empty segments.
pub fn validate_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("empty path".to_string());
    }
    if !path.starts_with(PATH_SEPARATOR) {
        return Err(format!("path '{path}' must start with '/'"));
    }
    if is_root(path) {
        return Ok(());
    }
    if path.ends_with(PATH_SEPARATOR) {
        return Err(format!("path '{path}' must not end with '/'"));
    }
    if path[1..].split(PATH_SEPARATOR).any(str::is_empty) {
        return Err(format!("path '{path}' contains an empty segment"));
    }
    Ok(())
}

/// Check that `name` can be used as one path segment.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.contains(PATH_SEPARATOR) {
        return Err(format!("display name '{name}' must not contain '/'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_nested_path() {
        assert_eq!(split_path("/A/B/C"), Some(("/A/B", "C")));
    }

    #[test]
    fn split_below_root() {
        assert_eq!(split_path("/A"), Some(("/", "A")));
        assert_eq!(split_path("/"), Some(("/", "")));
    }

    #[test]
    fn split_without_separator() {
        assert_eq!(split_path("abc"), None);
        assert_eq!(split_path(""), None);
    }

    #[test]
    fn full_path_normalizes_parent() {
        assert_eq!(folder_full_path("/", "A"), "/A");
        assert_eq!(folder_full_path("/A", "B"), "/A/B");
        assert_eq!(folder_full_path("/A/", "B"), "/A/B");
        assert_eq!(folder_full_path("//", "A"), "/A");
    }

    #[test]
    fn within_respects_segment_boundary() {
        assert!(is_within("/A", "/A"));
        assert!(is_within("/A/B", "/A"));
        assert!(!is_within("/AB", "/A"));
        assert!(!is_within("/", "/A"));
    }

    #[test]
    fn rebase_only_touches_prefix() {
        assert_eq!(rebase("/A/x/A", "/A", "/Z").as_deref(), Some("/Z/x/A"));
        assert_eq!(rebase("/A", "/A", "/Z").as_deref(), Some("/Z"));
        assert_eq!(rebase("/AB", "/A", "/Z"), None);
    }

    #[test]
    fn validate_shapes() {
        assert!(validate_path("/").is_ok());
        assert!(validate_path("/A/B").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("A").is_err());
        assert!(validate_path("/A/").is_err());
        assert!(validate_path("/A//B").is_err());
    }

    #[test]
    fn names_are_single_segments() {
        assert!(validate_name("Äpfel").is_ok());
        assert!(validate_name("a b").is_ok());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("/").is_err());
    }
}
