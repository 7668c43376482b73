use std::sync::Arc;

use crate::dataset::DatasetService;
use crate::llm::GenerativeModel;
use crate::search::SearchIndex;

/// shared application state
pub struct AppState {
    pub service: DatasetService,
    /// datasets indexed for llm search, keyed by dataset name
    pub search: SearchIndex,
    /// `None` when no model is configured
    pub model: Option<Arc<dyn GenerativeModel>>,
}

impl AppState {
    /// create app state around a dataset service and an optional model
    pub fn new(service: DatasetService, model: Option<Arc<dyn GenerativeModel>>) -> Self {
        Self {
            service,
            search: SearchIndex::new(),
            model,
        }
    }
}
