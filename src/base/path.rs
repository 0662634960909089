//! Corpus path handling.
//!
//! Corpus paths are `/`-separated. An absolute path starts with `/`,
//! optionally preceded by a storage namespace (`local:/a/b.cdm.json`).
//! Folder paths always end in `/`.

use smol_str::SmolStr;

use crate::error::PathError;

/// The path of the corpus root folder.
pub const ROOT: &str = "/";

/// Split a namespace prefix (`local:`) from the rest of a path.
fn split_namespace(path: &str) -> (&str, &str) {
    match path.find(":/") {
        Some(pos) if !path[..pos].contains('/') => (&path[..=pos], &path[pos + 1..]),
        _ => ("", path),
    }
}

/// Check whether a path is absolute (rooted, with or without a namespace).
pub fn is_absolute(path: &str) -> bool {
    let (_, rest) = split_namespace(path);
    rest.starts_with('/')
}

/// Normalize an absolute path.
///
/// Collapses repeated separators and `.`/`..` segments. A trailing `/` is
/// kept, so folder paths stay folder paths.
pub fn normalize(path: &str) -> Result<SmolStr, PathError> {
    if path.trim().is_empty() {
        return Err(PathError::Empty);
    }

    let (namespace, rest) = split_namespace(path);
    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::EscapesRoot(path.to_string()));
                }
            }
            s => segments.push(s),
        }
    }

    let mut out = String::with_capacity(path.len() + 1);
    out.push_str(namespace);
    out.push('/');
    out.push_str(&segments.join("/"));
    if rest.ends_with('/') && !segments.is_empty() {
        out.push('/');
    }
    Ok(SmolStr::new(out))
}

/// Resolve `path` as seen from the folder at `folder`.
///
/// Absolute paths ignore `folder`. Relative paths are joined onto it.
pub fn resolve_relative(folder: &str, path: &str) -> Result<SmolStr, PathError> {
    if path.trim().is_empty() {
        return Err(PathError::Empty);
    }
    if is_absolute(path) {
        return normalize(path);
    }

    let mut joined = String::with_capacity(folder.len() + path.len() + 1);
    joined.push_str(folder);
    if !folder.ends_with('/') {
        joined.push('/');
    }
    joined.push_str(path);
    normalize(&joined)
}

/// Split a normalized document path into its folder path and file name.
pub fn split(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(pos) => (&path[..=pos], &path[pos + 1..]),
        None => (ROOT, path),
    }
}

/// The parent folder of a folder path, or `None` for a root.
pub fn parent_folder(folder: &str) -> Option<&str> {
    let trimmed = folder.strip_suffix('/')?;
    let pos = trimmed.rfind('/')?;
    Some(&folder[..=pos])
}
