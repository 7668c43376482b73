//! Recursive structure walk used for the dataset tree view.

use std::fs;
use std::io;
use std::path::Path;

use super::{is_hidden, is_plain_dir};
use crate::error::{DatasetError, Result};
use crate::models::DirectoryEntry;

/// Build the full tree under `root`, children sorted by name at every level.
///
/// Hidden entries are left out. A directory that can't be listed because of
/// permissions shows up with no children; any other I/O error aborts the walk.
/// Symlinks are reported as files and never followed.
pub fn build_tree(root: &Path) -> Result<DirectoryEntry> {
    if !is_plain_dir(root) {
        return Err(DatasetError::not_found(root));
    }
    walk_dir(root)
}

fn walk_dir(path: &Path) -> Result<DirectoryEntry> {
    let entries = match sorted_children(path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            tracing::warn!("Permission denied listing {:?}, emitting it empty", path);
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };

    let mut children = Vec::with_capacity(entries.len());
    for entry in entries {
        let child_path = entry.path();
        if entry.file_type()?.is_dir() {
            children.push(walk_dir(&child_path)?);
        } else {
            let size = entry.metadata()?.len();
            tracing::trace!("File {:?} ({} bytes)", child_path, size);
            children.push(DirectoryEntry::file(
                entry.file_name().to_string_lossy().into_owned(),
                child_path.to_string_lossy().into_owned(),
                size,
            ));
        }
    }

    Ok(DirectoryEntry::directory(
        entry_name(path),
        path.to_string_lossy().into_owned(),
        children,
    ))
}

fn sorted_children(path: &Path) -> io::Result<Vec<fs::DirEntry>> {
    let mut entries = fs::read_dir(path)?.collect::<io::Result<Vec<_>>>()?;
    entries.retain(|e| !is_hidden(&e.file_name()));
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

// roots like "." have no file_name, fall back to the whole path
fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
