use std::fs;
use std::path::{Path, PathBuf};

use super::{is_class_dir, is_plain_dir};
use crate::error::{DatasetError, Result};

/// default number of class folders a directory needs before it counts as a dataset root
pub const DEFAULT_NESTED_CLASS_THRESHOLD: usize = 10;

/// Picks the directory inside an extracted archive that actually holds the class folders.
///
/// Archives are often zipped with a single wrapper folder (`caltech101/accordion/...`),
/// sometimes without (`accordion/...`). A directory is treated as the dataset root once it
/// has strictly more than `threshold` non-hidden subdirectories.
#[derive(Debug, Clone, Copy)]
pub struct RootClassifier {
    pub threshold: usize,
}

impl Default for RootClassifier {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_NESTED_CLASS_THRESHOLD,
        }
    }
}

impl RootClassifier {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn classify_root(&self, extract_path: &Path) -> Result<PathBuf> {
        if !is_plain_dir(extract_path) {
            return Err(DatasetError::not_found(extract_path));
        }

        let mut items = Vec::new();
        for entry in fs::read_dir(extract_path)? {
            items.push(entry?);
        }
        tracing::debug!("Classifying root {:?}: {} items", extract_path, items.len());

        // a lone wrapper directory wins if it looks like a dataset itself
        if let [only] = items.as_slice() {
            let nested_path = only.path();
            if only.file_type()?.is_dir() {
                let nested_class_count = count_class_dirs(&nested_path)?;
                tracing::debug!(
                    "Nested path {:?} has {} class directories",
                    nested_path,
                    nested_class_count
                );
                if nested_class_count > self.threshold {
                    tracing::debug!("Using nested path as dataset root: {:?}", nested_path);
                    return Ok(nested_path);
                }
            }
        }

        let mut top_class_count = 0;
        for item in &items {
            if is_class_dir(item)? {
                top_class_count += 1;
            }
        }

        if top_class_count > self.threshold {
            tracing::debug!("Using extract path as dataset root: {:?}", extract_path);
        } else {
            tracing::debug!(
                "Only {} class directories under {:?}, falling back to it as root",
                top_class_count,
                extract_path
            );
        }
        Ok(extract_path.to_path_buf())
    }
}

fn count_class_dirs(path: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(path)? {
        if is_class_dir(&entry?)? {
            count += 1;
        }
    }
    Ok(count)
}
