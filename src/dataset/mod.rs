//! Dataset layout normalization and statistics.
//!
//! Everything in here is synchronous and reads straight from disk. Callers on an
//! async runtime are expected to wrap it in `spawn_blocking`.

pub mod classify;
pub mod service;
pub mod stats;
pub mod tree;

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;

pub use classify::RootClassifier;
pub use service::DatasetService;
pub use stats::aggregate;
pub use tree::build_tree;

/// extensions counted towards `total_images`
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".webp"];

/// entries starting with `.` are skipped by every walk and count
pub fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// lowercase extension including the dot, or an empty string when there is none
pub fn extension_of(path: &Path) -> String {
    match path.extension().map(|e| e.to_string_lossy().to_lowercase()) {
        Some(ext) if !ext.is_empty() => format!(".{ext}"),
        _ => String::new(),
    }
}

pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext)
}

/// true for a real directory; a symlink to one is not
pub fn is_plain_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.is_dir())
}

/// non-hidden real directory entry, the only kind that can be a class folder
pub fn is_class_dir(entry: &fs::DirEntry) -> io::Result<bool> {
    Ok(!is_hidden(&entry.file_name()) && entry.file_type()?.is_dir())
}
