use std::fs;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::thread;

use uuid::Uuid;
use zip::ZipArchive;

use super::{aggregate, build_tree, is_class_dir, is_hidden, is_plain_dir, RootClassifier};
use crate::config::Config;
use crate::error::{DatasetError, Result};
use crate::models::{ClassDetails, ClassFile, DatasetReport, DatasetSummary};
use crate::utils::sanitize_filename;

/// only archive format accepted for uploads
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Entry point for everything that reads or writes datasets on disk.
///
/// Uploads are staged in `uploads_dir` and extracted to `datasets_dir/<stem>`.
/// Nothing is cached: every call re-reads the current on-disk state.
#[derive(Debug, Clone)]
pub struct DatasetService {
    uploads_dir: PathBuf,
    datasets_dir: PathBuf,
    classifier: RootClassifier,
}

impl DatasetService {
    pub fn new(uploads_dir: PathBuf, datasets_dir: PathBuf, classifier: RootClassifier) -> Self {
        Self {
            uploads_dir,
            datasets_dir,
            classifier,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.upload_dir.clone(),
            config.datasets_dir.clone(),
            RootClassifier::new(config.nested_class_threshold),
        )
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn datasets_dir(&self) -> &Path {
        &self.datasets_dir
    }

    /// create the scratch and dataset directories if they are missing
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.uploads_dir)?;
        fs::create_dir_all(&self.datasets_dir)?;
        Ok(())
    }

    /// Validate an upload filename and derive the dataset name from its stem.
    ///
    /// `Caltech101.ZIP` becomes `Caltech101`; anything not ending in `.zip` is rejected.
    pub fn dataset_name_for(filename: &str) -> Result<String> {
        let is_archive = Path::new(filename)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION));
        if !is_archive {
            return Err(DatasetError::UnsupportedFormat(format!(
                "only .{ARCHIVE_EXTENSION} files are allowed, got {filename:?}"
            )));
        }

        let sanitized = sanitize_filename(filename);
        Path::new(&sanitized)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| {
                DatasetError::UnsupportedFormat(format!("no usable dataset name in {filename:?}"))
            })
    }

    /// Stage, extract and analyze an uploaded archive.
    ///
    /// Any previous dataset with the same name is deleted first. The staged
    /// archive is removed whether or not extraction succeeds.
    pub fn process_upload(&self, filename: &str, bytes: &[u8]) -> Result<DatasetReport> {
        let dataset_name = Self::dataset_name_for(filename)?;

        fs::create_dir_all(&self.uploads_dir)?;
        let scratch = ScratchFile::write(&self.uploads_dir, &sanitize_filename(filename), bytes)?;
        tracing::debug!("Staged upload at {:?} ({} bytes)", scratch.path(), bytes.len());

        let extract_path = self.datasets_dir.join(&dataset_name);
        if extract_path.exists() {
            tracing::info!("Replacing existing dataset {}", dataset_name);
            fs::remove_dir_all(&extract_path)?;
        }
        fs::create_dir_all(&extract_path)?;

        if let Err(e) = extract_archive(scratch.path(), &extract_path) {
            tracing::error!("Failed to extract {}: {}", filename, e);
            if let Err(cleanup) = fs::remove_dir_all(&extract_path) {
                tracing::warn!("Failed to clean up {:?}: {}", extract_path, cleanup);
            }
            return Err(e);
        }
        tracing::debug!("Extracted {} to {:?}", filename, extract_path);

        let root = self.classifier.classify_root(&extract_path)?;
        self.analyze(dataset_name, &root)
    }

    /// Structure and stats for an existing dataset.
    pub fn describe(&self, name: &str) -> Result<DatasetReport> {
        let base_path = self.dataset_path(name)?;
        let root = self.classifier.classify_root(&base_path)?;
        tracing::debug!("Describing dataset {} from root {:?}", name, root);
        self.analyze(sanitize_filename(name), &root)
    }

    /// Stats for every dataset directory, sorted by name.
    ///
    /// A dataset that fails to classify or aggregate is logged and left out.
    pub fn list_all(&self) -> Result<Vec<DatasetSummary>> {
        if !self.datasets_dir.exists() {
            return Ok(Vec::new());
        }

        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.datasets_dir)? {
            let entry = entry?;
            if is_class_dir(&entry)? {
                dirs.push(entry);
            }
        }
        dirs.sort_by_key(|e| e.file_name());

        let mut datasets = Vec::with_capacity(dirs.len());
        for entry in dirs {
            let dataset_dir = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            let stats = self
                .classifier
                .classify_root(&dataset_dir)
                .and_then(|root| aggregate(&root));
            match stats {
                Ok(stats) => datasets.push(DatasetSummary {
                    name,
                    path: dataset_dir.to_string_lossy().into_owned(),
                    stats,
                }),
                Err(e) => tracing::warn!("Skipping dataset {}: {}", name, e),
            }
        }

        Ok(datasets)
    }

    /// Files of one class folder, sorted by name.
    pub fn class_details(&self, name: &str, class_name: &str) -> Result<ClassDetails> {
        let root = self.classifier.classify_root(&self.dataset_path(name)?)?;

        let class_segment = sanitize_filename(class_name);
        let class_path = root.join(&class_segment);
        if class_segment.is_empty() || !is_plain_dir(&class_path) {
            return Err(DatasetError::NotFound(format!("class {class_name:?} in {name}")));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&class_path)? {
            let entry = entry?;
            if is_hidden(&entry.file_name()) || !entry.file_type()?.is_file() {
                continue;
            }
            files.push(ClassFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: entry.metadata()?.len(),
                path: entry.path().to_string_lossy().into_owned(),
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(ClassDetails {
            class_name: class_segment,
            file_count: files.len(),
            files,
        })
    }

    /// Delete a dataset directory.
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.dataset_path(name)?;
        fs::remove_dir_all(&path)?;
        tracing::info!("Removed dataset {}", name);
        Ok(())
    }

    // resolve a request-supplied name under datasets_dir, refusing anything that could escape it
    fn dataset_path(&self, name: &str) -> Result<PathBuf> {
        let sanitized = sanitize_filename(name);
        if sanitized.is_empty() {
            return Err(DatasetError::NotFound(format!("dataset {name:?}")));
        }
        let path = self.datasets_dir.join(sanitized);
        if !is_plain_dir(&path) {
            return Err(DatasetError::NotFound(format!("dataset {name:?}")));
        }
        Ok(path)
    }

    // tree and stats read the same subtree, run them side by side
    fn analyze(&self, dataset_name: String, root: &Path) -> Result<DatasetReport> {
        let (structure, stats) = thread::scope(|s| {
            let walker = s.spawn(|| build_tree(root));
            let stats = aggregate(root);
            let structure = walker
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (structure, stats)
        });

        Ok(DatasetReport {
            dataset_name,
            structure: structure?,
            stats: stats?,
        })
    }
}

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

// entry by entry so symlinks and paths escaping `dest` never reach the disk
fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    tracing::debug!("Archive {:?} holds {} entries", archive_path, archive.len());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("Skipping archive entry with unsafe path: {}", entry.name());
            continue;
        };
        if entry.unix_mode().is_some_and(|mode| mode & S_IFMT == S_IFLNK) {
            tracing::warn!("Skipping symlink archive entry: {}", entry.name());
            continue;
        }

        let out_path = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
    }
    Ok(())
}

/// Staged upload that is deleted when dropped.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn write(dir: &Path, filename: &str, bytes: &[u8]) -> Result<Self> {
        let scratch = Self {
            path: dir.join(format!("{}-{}", Uuid::new_v4(), filename)),
        };
        fs::write(&scratch.path, bytes)?;
        Ok(scratch)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::trace!("Removed scratch upload {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove scratch upload {:?}: {}", self.path, e),
        }
    }
}
