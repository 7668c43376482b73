//! Per-class counting over the canonical dataset root.

use std::fs;
use std::path::Path;

use super::{extension_of, is_class_dir, is_hidden, is_image_extension, is_plain_dir};
use crate::error::{DatasetError, Result};
use crate::models::{ClassRecord, DatasetStats};

/// Count files per class directory directly under `root`.
///
/// Every non-hidden subdirectory counts towards `total_folders`, but only the ones
/// holding at least one file make it into `classes`. A class directory that
/// can't be read is logged and skipped. A missing `root` is an error.
/// Symlinks are never followed, neither as classes nor as class members.
pub fn aggregate(root: &Path) -> Result<DatasetStats> {
    if !is_plain_dir(root) {
        return Err(DatasetError::not_found(root));
    }

    let mut stats = DatasetStats {
        dataset_name: root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        ..DatasetStats::default()
    };

    tracing::debug!("Analyzing dataset at {:?}", root);

    for entry in fs::read_dir(root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {:?}: {}", root, e);
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name();

        match is_class_dir(&entry) {
            Ok(true) => {}
            Ok(false) => {
                tracing::trace!("Skipping {:?}, not a class directory", path);
                continue;
            }
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                continue;
            }
        }

        stats.total_folders += 1;
        let class_name = name.to_string_lossy().into_owned();

        let record = match count_class(&path, &class_name, &mut stats) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Error processing class {}: {}", class_name, e);
                continue;
            }
        };

        tracing::trace!("Class {}: {} files", record.name, record.count);
        if record.count > 0 {
            stats.classes.push(record);
        }
    }

    // stable, so ties keep directory order
    stats.classes.sort_by(|a, b| b.count.cmp(&a.count));

    tracing::debug!(
        "Dataset {}: {} folders, {} files, {} images, {} non-empty classes",
        stats.dataset_name,
        stats.total_folders,
        stats.total_files,
        stats.total_images,
        stats.classes.len()
    );

    Ok(stats)
}

// the global totals are only touched once the whole listing succeeded
fn count_class(path: &Path, class_name: &str, stats: &mut DatasetStats) -> Result<ClassRecord> {
    let mut files = Vec::new();
    let mut extensions = Vec::new();

    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let name = entry.file_name();
        if is_hidden(&name) || !entry.file_type()?.is_file() {
            continue;
        }
        extensions.push(extension_of(&entry.path()));
        files.push(name.to_string_lossy().into_owned());
    }

    for ext in extensions {
        if is_image_extension(&ext) {
            stats.total_images += 1;
        }
        *stats.file_types.entry(ext).or_insert(0) += 1;
    }
    stats.total_files += files.len();

    Ok(ClassRecord {
        name: class_name.to_string(),
        count: files.len(),
        files,
    })
}
