//! Helpers for absolute slash-delimited tree paths.

use crate::error::{ModelError, Result};

pub const ROOT: &str = "/";

const REGEX_METACHARACTERS: &[char] = &[
    '\\', '.', '^', '$', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|',
];

/// Validates an absolute path, returning it without a trailing separator.
pub fn normalize(path: &str) -> Result<String> {
    let trimmed = path.trim();
    if !trimmed.starts_with('/') {
        return Err(ModelError::InvalidPath {
            path: path.to_string(),
            message: "paths must be absolute".to_string(),
        });
    }
    if trimmed == ROOT {
        return Ok(ROOT.to_string());
    }
    let body = trimmed.trim_end_matches('/');
    if body.split('/').skip(1).any(str::is_empty) {
        return Err(ModelError::InvalidPath {
            path: path.to_string(),
            message: "empty path segment".to_string(),
        });
    }
    Ok(body.to_string())
}

/// Path of the group containing `path`; `None` for the root group.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Final segment of a path (empty for the root group).
pub fn name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub fn join(group: &str, name: &str) -> String {
    if group == ROOT {
        format!("/{name}")
    } else {
        format!("{group}/{name}")
    }
}

/// Enclosing groups from nearest to the root.
pub fn ancestors(path: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut current = parent(path);
    while let Some(group) = current {
        groups.push(group);
        current = parent(group);
    }
    groups
}

/// True when a variable pattern names a single literal path rather than a regex.
pub fn is_exact_path(pattern: &str) -> bool {
    pattern.starts_with('/') && !pattern.contains(REGEX_METACHARACTERS)
}
