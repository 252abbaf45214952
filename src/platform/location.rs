//! Conversion between `file://` URIs and filesystem paths

use std::path::{Path, PathBuf};

/// Convert a `file://` URI to a path
///
/// Accepts both `file:///path` and Rekordbox's `file://localhost/path`.
/// Windows drive paths (`/C:/...`) lose their leading slash.
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    let rest = uri
        .strip_prefix("file://localhost")
        .or_else(|| uri.strip_prefix("file://"))?;
    let decoded = urlencoding::decode(rest).ok()?;

    let path = match decoded.strip_prefix('/') {
        Some(stripped) if has_drive_prefix(stripped) => stripped.to_string(),
        _ => decoded.into_owned(),
    };
    Some(PathBuf::from(path))
}

/// Convert a path to a `file://` URI with `host` (empty or `localhost`)
pub fn path_to_uri(path: &Path, host: &str) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let mut uri = format!("file://{}", host);

    let mut segments = raw.split('/');
    if has_drive_prefix(&raw) {
        if let Some(drive) = segments.next() {
            uri.push('/');
            uri.push_str(drive);
        }
    } else if raw.starts_with('/') {
        // leading empty segment from the root slash
        segments.next();
    }

    for segment in segments {
        uri.push('/');
        uri.push_str(&urlencoding::encode(segment));
    }
    uri
}

/// Path of a stored location; anything but a `file://` URI is kept verbatim
pub fn location_to_path(raw: &str) -> PathBuf {
    uri_to_path(raw).unwrap_or_else(|| PathBuf::from(raw))
}

/// Location to store for `path`: `original` while it still names that path
pub fn stored_location(original: Option<&str>, path: &Path, host: &str) -> String {
    match original {
        Some(raw) if location_to_path(raw) == path => raw.to_string(),
        _ => path_to_uri(path, host),
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
