use axum::{
    extract::{Path, Multipart, Query, State},
    http::StatusCode,
    response::Json,
};
use sha2::{Sha256, Digest};
use std::sync::Arc;

use crate::dataset::DatasetService;
use crate::error::DatasetError;
use crate::models::{
    ClassDetails, DatasetListResponse, DeleteResponse, ErrorResponse, IndexResponse,
    IndexedResponse, SearchRequest, SearchResponse, StructureResponse, SuggestQuery,
    SuggestResponse, UploadResponse,
};
use crate::llm::SearchError;
use crate::search;
use crate::state::AppState;
use crate::utils::sanitize_filename;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// map an engine error to a status code and json body
pub fn error_response(err: DatasetError) -> ApiError {
    let status = match &err {
        DatasetError::NotFound(_) => StatusCode::NOT_FOUND,
        DatasetError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
        DatasetError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DatasetError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::warn!("Request rejected: {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

// the engine is blocking, keep it off the async workers
async fn run_blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&DatasetService) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let service = state.service.clone();
    match tokio::task::spawn_blocking(move || f(&service)).await {
        Ok(result) => result.map_err(error_response),
        Err(e) => {
            tracing::error!("Blocking dataset task failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Dataset task failed: {}", e),
                }),
            ))
        }
    }
}

// service status and endpoint listing
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Dataset Explorer API",
        "status": "running",
        "endpoints": {
            "upload": "/api/upload",
            "datasets": "/api/datasets",
            "structure": "/api/dataset/{dataset_name}/structure",
            "class_details": "/api/dataset/{dataset_name}/class/{class_name}",
            "index": "/api/dataset/{dataset_name}/index",
            "search": "/api/dataset/{dataset_name}/search",
            "suggest": "/api/dataset/{dataset_name}/suggest?q=",
        },
    }))
}

// health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "dataset-explorer-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

// upload a zipped dataset via multipart form data, extract it and return its analysis
pub async fn upload_dataset(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    tracing::debug!("Processing dataset upload request");

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Failed to read multipart field: {}", e),
            }),
        )
    })? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            tracing::trace!("Skipping multipart field without filename");
            continue;
        };

        // reject non-archives before reading the body
        DatasetService::dataset_name_for(&filename).map_err(error_response)?;
        tracing::debug!("Receiving archive: {}", filename);

        let data = field.bytes().await.map_err(|e| {
            tracing::error!("Failed to read upload data for {}: {}", filename, e);
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Failed to read file data: {}", e),
                }),
            )
        })?;

        let sha256 = hex::encode(Sha256::digest(&data));
        tracing::debug!("Archive {} is {} bytes, sha256 {}", filename, data.len(), sha256);

        let upload_name = filename.clone();
        let report = run_blocking(&state, move |service| {
            service.process_upload(&upload_name, &data)
        })
        .await?;

        // the old index describes a dataset that no longer exists
        if state.search.remove(&report.dataset_name) {
            tracing::debug!("Evicted stale search index for {}", report.dataset_name);
        }

        tracing::info!(
            "✅ Uploaded dataset {}: {} classes, {} images",
            report.dataset_name,
            report.stats.classes.len(),
            report.stats.total_images
        );

        return Ok(Json(UploadResponse {
            success: true,
            message: "Dataset uploaded and extracted successfully".to_string(),
            dataset_name: report.dataset_name,
            sha256,
            structure: report.structure,
            stats: report.stats,
        }));
    }

    tracing::warn!("Upload request contained no file field");
    Err((
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "No file provided".to_string(),
        }),
    ))
}

// list all datasets with their stats
pub async fn list_datasets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DatasetListResponse>, ApiError> {
    let datasets = run_blocking(&state, |service| service.list_all()).await?;
    tracing::debug!("Found {} datasets", datasets.len());
    Ok(Json(DatasetListResponse { datasets }))
}

// structure tree and stats for a single dataset
pub async fn get_dataset_structure(
    State(state): State<Arc<AppState>>,
    Path(dataset_name): Path<String>,
) -> Result<Json<StructureResponse>, ApiError> {
    tracing::debug!("Getting structure for dataset: {}", dataset_name);
    let report = run_blocking(&state, move |service| service.describe(&dataset_name)).await?;
    Ok(Json(StructureResponse {
        structure: report.structure,
        stats: report.stats,
    }))
}

// files of one class
pub async fn get_class_details(
    State(state): State<Arc<AppState>>,
    Path((dataset_name, class_name)): Path<(String, String)>,
) -> Result<Json<ClassDetails>, ApiError> {
    tracing::debug!("Getting class {} of dataset {}", class_name, dataset_name);
    let details = run_blocking(&state, move |service| {
        service.class_details(&dataset_name, &class_name)
    })
    .await?;
    Ok(Json(details))
}

// delete a dataset and forget its search index
pub async fn delete_dataset(
    State(state): State<Arc<AppState>>,
    Path(dataset_name): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let name = dataset_name.clone();
    run_blocking(&state, move |service| service.remove(&name)).await?;

    let key = sanitize_filename(&dataset_name);
    state.search.remove(&key);
    tracing::info!("🗑️  Deleted dataset: {}", key);

    Ok(Json(DeleteResponse {
        success: true,
        dataset_name: key,
    }))
}

// build the search index entry for a dataset from fresh stats
pub async fn index_dataset(
    State(state): State<Arc<AppState>>,
    Path(dataset_name): Path<String>,
) -> Result<Json<IndexResponse>, ApiError> {
    let report = run_blocking(&state, move |service| service.describe(&dataset_name)).await?;
    let index = state.search.index(&report.dataset_name, &report.stats);

    Ok(Json(IndexResponse {
        success: true,
        dataset_name: index.dataset_name,
        total_classes: index.classes.len(),
        indexed_at: index.indexed_at.to_rfc3339(),
    }))
}

pub async fn dataset_indexed(
    State(state): State<Arc<AppState>>,
    Path(dataset_name): Path<String>,
) -> Json<IndexedResponse> {
    Json(IndexedResponse {
        indexed: state.search.is_indexed(&sanitize_filename(&dataset_name)),
    })
}

// answer a natural language question about an indexed dataset
pub async fn search_dataset(
    State(state): State<Arc<AppState>>,
    Path(dataset_name): Path<String>,
    Json(payload): Json<SearchRequest>,
) -> Json<SearchResponse> {
    let query = payload.query.trim();
    if query.is_empty() {
        return Json(SearchResponse::failure("Query must not be empty"));
    }

    let Some(model) = state.model.clone() else {
        tracing::warn!("Search requested but no model is configured");
        return Json(SearchResponse::failure(SearchError::NotConfigured.to_string()));
    };

    let key = sanitize_filename(&dataset_name);
    Json(search::search(&state.search, model.as_ref(), &key, query).await)
}

// class names matching a partial term
pub async fn suggest_classes(
    State(state): State<Arc<AppState>>,
    Path(dataset_name): Path<String>,
    Query(params): Query<SuggestQuery>,
) -> Json<SuggestResponse> {
    Json(SuggestResponse {
        suggestions: state
            .search
            .suggestions(&sanitize_filename(&dataset_name), &params.q),
    })
}
