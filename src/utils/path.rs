//! Path and timestamp helpers shared by the metadata store and the tracker.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

/// Normalize a path to absolute, using canonicalize if the path exists.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

/// Render a path with forward slashes only.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Check a path's extension case-insensitively.
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Absolute path of the JSON asset that maskmaker derives from an FBX.
///
/// `masks/Hat.FBX` becomes `<cwd>/masks/Hat.json`. Paths without an FBX
/// extension are returned absolute but otherwise untouched.
pub fn json_from_source(source: &Path) -> PathBuf {
    let path = if has_extension(source, "fbx") {
        source.with_extension("json")
    } else {
        source.to_path_buf()
    };
    std::path::absolute(&path).unwrap_or(path)
}

/// Sibling of `source` with a lowercased file stem and a new extension.
pub fn lowercase_sibling(source: &Path, ext: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}.{ext}"))
}

/// Last modification time, `None` if the file is missing or unreadable.
pub fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Last modification time in float seconds since the epoch, `0.0` if unknown.
pub fn modtime_secs(path: &Path) -> f64 {
    modified(path)
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0.0, |d| d.as_secs_f64())
}
