use std::path::PathBuf;

use crate::dataset::classify::DEFAULT_NESTED_CLASS_THRESHOLD;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// scratch directory for uploaded archives
    pub upload_dir: PathBuf,
    /// one subdirectory per extracted dataset
    pub datasets_dir: PathBuf,
    /// json api address
    pub api_host: String,
    /// json api port
    pub api_port: u16,
    /// static dataset file server address
    pub files_host: String,
    /// static dataset file server port
    pub files_port: u16,
    /// maximum upload size in bytes
    pub max_upload_size: usize,
    /// number of tokio worker threads
    pub worker_threads: usize,
    /// class folders needed before a directory counts as the dataset root
    pub nested_class_threshold: usize,
    /// cors allowed origins (comma-separated)
    pub cors_origins: Vec<String>,
    /// rate limit: requests per minute
    pub rate_limit_per_minute: u64,
    /// gemini api key, search is disabled without it
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
}

impl Config {
    /// load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        // parse cors origins
        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8501,http://127.0.0.1:8501".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let google_api_key = std::env::var("GOOGLE_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        if google_api_key.is_none() {
            tracing::warn!("⚠️  No GOOGLE_API_KEY set, LLM search is disabled");
        }

        Self {
            upload_dir: std::env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "./uploads".to_string())
                .into(),
            datasets_dir: std::env::var("DATASETS_DIR")
                .unwrap_or_else(|_| "./datasets".to_string())
                .into(),
            api_host: std::env::var("API_HOST")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            api_port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            files_host: std::env::var("FILES_HOST")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            files_port: std::env::var("FILES_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8001),
            max_upload_size: std::env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2 * 1024 * 1024 * 1024), // 2GB default
            worker_threads: std::env::var("WORKER_THREADS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(8),
            nested_class_threshold: std::env::var("NESTED_CLASS_THRESHOLD")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(DEFAULT_NESTED_CLASS_THRESHOLD),
            cors_origins,
            rate_limit_per_minute: std::env::var("RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|r| r.parse().ok())
                .unwrap_or(60),
            google_api_key,
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
        }
    }
}
