//! Dataset explorer: upload zipped image-classification datasets, inspect their
//! class layout and statistics, and ask an LLM about them.

pub mod config;
pub mod dataset;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod search;
pub mod server;
pub mod state;
pub mod utils;

pub use error::{DatasetError, Result};
