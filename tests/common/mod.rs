//! Fixture builders shared by the integration tests

#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use dataset_explorer::dataset::{DatasetService, RootClassifier};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Write `contents` to `root/rel`, creating parent directories
pub fn touch(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Create `count` class folders named class_00.. under `root`, each holding `files` jpgs
pub fn make_classes(root: &Path, count: usize, files: usize) {
    for c in 0..count {
        let class_dir = root.join(format!("class_{c:02}"));
        fs::create_dir_all(&class_dir).unwrap();
        for f in 0..files {
            fs::write(class_dir.join(format!("img_{f}.jpg")), b"jpeg").unwrap();
        }
    }
}

/// Build an in-memory zip; names ending in `/` become directories
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, contents) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Service rooted at `base/uploads` and `base/datasets`
pub fn service_in(base: &Path) -> DatasetService {
    let service = DatasetService::new(
        base.join("uploads"),
        base.join("datasets"),
        RootClassifier::default(),
    );
    service.ensure_dirs().unwrap();
    service
}

/// Number of entries left in a directory
pub fn entry_count(dir: &Path) -> usize {
    fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// Drop all permissions on `dir`. Returns false when the listing still works
/// (running as root), in which case permissions are restored and the caller
/// should skip its assertions.
#[cfg(unix)]
pub fn lock_dir(dir: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(dir).is_ok() {
        unlock_dir(dir);
        return false;
    }
    true
}

#[cfg(unix)]
pub fn unlock_dir(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
}
