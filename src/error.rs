use std::path::Path;

/// failures surfaced by the dataset engine
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to extract archive: {0}")]
    Extraction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DatasetError {
    pub fn not_found(path: &Path) -> Self {
        DatasetError::NotFound(path.display().to_string())
    }
}

impl From<zip::result::ZipError> for DatasetError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            // io errors while unpacking are disk problems, not a bad archive
            zip::result::ZipError::Io(e) => DatasetError::Io(e),
            other => DatasetError::Extraction(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DatasetError>;
