use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// whether a tree node is a folder or a leaf
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// one node of the dataset structure tree
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
    pub path: String,
    /// bytes, files only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// sorted by name, directories only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DirectoryEntry>>,
}

impl DirectoryEntry {
    pub fn file(name: String, path: String, size: u64) -> Self {
        Self {
            name,
            kind: EntryKind::File,
            path,
            size: Some(size),
            children: None,
        }
    }

    pub fn directory(name: String, path: String, children: Vec<DirectoryEntry>) -> Self {
        Self {
            name,
            kind: EntryKind::Directory,
            path,
            size: None,
            children: Some(children),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn children(&self) -> &[DirectoryEntry] {
        self.children.as_deref().unwrap_or(&[])
    }
}

// boring stuff ahead

// a single class folder and its member files
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClassRecord {
    pub name: String,
    pub count: usize,
    pub files: Vec<String>,
}

// aggregate numbers for one dataset root
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetStats {
    pub total_folders: usize,
    pub total_files: usize,
    pub total_images: usize,
    pub classes: Vec<ClassRecord>,
    pub file_types: BTreeMap<String, usize>,
    pub dataset_name: String,
}

// structure + stats for a dataset, keyed by its upload name
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DatasetReport {
    pub dataset_name: String,
    pub structure: DirectoryEntry,
    pub stats: DatasetStats,
}

// entry in the dataset listing
#[derive(Serialize, Debug, Clone)]
pub struct DatasetSummary {
    pub name: String,
    pub path: String,
    pub stats: DatasetStats,
}

// a file inside a class folder
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    pub name: String,
    pub size: u64,
    pub path: String,
}

// response for the class details endpoint
#[derive(Serialize, Debug, Clone)]
pub struct ClassDetails {
    pub class_name: String,
    pub file_count: usize,
    pub files: Vec<ClassFile>,
}

// response for the upload endpoint
#[derive(Serialize, Debug)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub dataset_name: String,
    /// hex sha256 of the uploaded archive
    pub sha256: String,
    pub structure: DirectoryEntry,
    pub stats: DatasetStats,
}

// response for the dataset listing endpoint
#[derive(Serialize, Debug)]
pub struct DatasetListResponse {
    pub datasets: Vec<DatasetSummary>,
}

// response for the structure endpoint
#[derive(Serialize, Debug)]
pub struct StructureResponse {
    pub structure: DirectoryEntry,
    pub stats: DatasetStats,
}

// response for dataset deletion
#[derive(Serialize, Debug)]
pub struct DeleteResponse {
    pub success: bool,
    pub dataset_name: String,
}

// response after indexing a dataset for search
#[derive(Serialize, Debug)]
pub struct IndexResponse {
    pub success: bool,
    pub dataset_name: String,
    pub total_classes: usize,
    pub indexed_at: String,
}

#[derive(Serialize, Debug)]
pub struct IndexedResponse {
    pub indexed: bool,
}

// natural language question about a dataset
#[derive(Deserialize, Debug)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Deserialize, Debug)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize, Debug)]
pub struct SuggestResponse {
    pub suggestions: Vec<String>,
}

// class picked out of a query, with the reason it matched
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RelevantClass {
    pub name: String,
    pub count: usize,
    pub percentage: f64,
    pub reason: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SearchStats {
    pub total_classes: usize,
    pub total_images: usize,
    pub query_processed: bool,
}

// result of an llm search; `success` false carries `error`
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevant_classes: Option<Vec<RelevantClass>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_stats: Option<SearchStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            relevant_classes: None,
            dataset_stats: None,
            error: Some(error.into()),
        }
    }
}

// generic error response
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}
