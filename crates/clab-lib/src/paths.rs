//! Lab path normalization
//!
//! Every cache and merge step keys labs by the string produced here, so
//! equivalent spellings of one topology file (relative, absolute, `file://`
//! URI, backslashes, trailing slashes, `.`/`..` segments) must collapse to
//! the same value. Normalization is lexical only; the filesystem is never
//! consulted.

use crate::models::LabPath;
use std::path::Path;
use url::Url;

/// Produce the canonical absolute key for a lab path
///
/// Relative inputs are resolved against `workspace_root`. When that is not
/// possible the input is returned unchanged.
pub fn normalize_lab_path(raw: &str, workspace_root: Option<&Path>) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return raw.to_string();
    }

    let candidate = file_uri_to_path(trimmed).unwrap_or_else(|| trimmed.replace('\\', "/"));

    let joined = if is_absolute(&candidate) {
        candidate
    } else if let Some(root) = workspace_root {
        let root = root.to_string_lossy().replace('\\', "/");
        if !is_absolute(&root) {
            return raw.to_string();
        }
        format!("{}/{}", root, candidate)
    } else {
        return raw.to_string();
    };

    clean(&joined)
}

/// Workspace-relative form of an absolute path, for display only
pub fn display_path(absolute: &str, workspace_root: Option<&Path>) -> String {
    let Some(root) = workspace_root else {
        return absolute.to_string();
    };
    if absolute.is_empty() {
        return String::new();
    }

    let root = normalize_lab_path(&root.to_string_lossy(), None);
    match pathdiff::diff_paths(absolute, &root) {
        Some(relative) if !relative.starts_with("..") && !relative.as_os_str().is_empty() => {
            relative.to_string_lossy().replace('\\', "/")
        }
        _ => absolute.to_string(),
    }
}

impl LabPath {
    /// Build a lab path from any raw spelling of a topology location
    pub fn resolve(raw: &str, workspace_root: Option<&Path>) -> Self {
        let absolute = normalize_lab_path(raw, workspace_root);
        let relative = display_path(&absolute, workspace_root);
        Self { absolute, relative }
    }
}

fn file_uri_to_path(raw: &str) -> Option<String> {
    if !raw.starts_with("file://") {
        return None;
    }
    let url = Url::parse(raw).ok()?;
    let path = url
        .to_file_path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| url.path().to_string());
    Some(path.replace('\\', "/"))
}

fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || drive_prefix(path).is_some()
}

/// `C:` style prefix of a Windows path written with forward slashes
fn drive_prefix(path: &str) -> Option<&str> {
    let bytes = path.as_bytes();
    if bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
    {
        Some(&path[..2])
    } else {
        None
    }
}

/// Collapse `.`/`..` and repeated or trailing separators
fn clean(path: &str) -> String {
    let (prefix, rest) = match drive_prefix(path) {
        Some(drive) => (drive, &path[drive.len()..]),
        None => ("", path),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    format!("{}/{}", prefix, segments.join("/"))
}
