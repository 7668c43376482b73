mod common;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{Request, StatusCode};
use axum::Json;
use std::sync::Arc;
use tower::util::ServiceExt;

use common::{make_classes, service_in, touch, zip_bytes};
use dataset_explorer::error::DatasetError;
use dataset_explorer::handlers::{
    dataset_indexed, delete_dataset, error_response, get_class_details, get_dataset_structure,
    health_check, index_dataset, list_datasets, root, search_dataset, suggest_classes,
};
use dataset_explorer::llm::{GenerativeModel, SearchError};
use dataset_explorer::models::{SearchRequest, SuggestQuery};
use dataset_explorer::server::build_api_routes;
use dataset_explorer::state::AppState;

struct CannedModel;

#[async_trait]
impl GenerativeModel for CannedModel {
    async fn generate(&self, _prompt: &str) -> Result<String, SearchError> {
        Ok("There are 12 classes.".to_string())
    }
}

fn state_in(base: &std::path::Path, model: Option<Arc<dyn GenerativeModel>>) -> Arc<AppState> {
    Arc::new(AppState::new(service_in(base), model))
}

fn multipart_request(filename: &str, data: &[u8]) -> Request<Body> {
    let boundary = "X-DATASET-BOUNDARY";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/zip\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let response = health_check().await;
    assert_eq!(response.0["status"], "healthy");
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let response = root().await;
    assert_eq!(response.0["status"], "running");
    assert_eq!(response.0["endpoints"]["upload"], "/api/upload");
}

#[test]
fn test_error_status_mapping() {
    let cases = [
        (DatasetError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (DatasetError::UnsupportedFormat("x".into()), StatusCode::BAD_REQUEST),
        (DatasetError::Extraction("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
        (
            DatasetError::Io(std::io::Error::new(std::io::ErrorKind::Other, "x")),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];
    for (err, status) in cases {
        let (got, body) = error_response(err);
        assert_eq!(got, status);
        assert!(!body.0.error.is_empty());
    }
}

#[tokio::test]
async fn test_list_datasets() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = state_in(temp_dir.path(), None);

    // Empty dir
    let response = list_datasets(State(state.clone())).await.unwrap();
    assert!(response.0.datasets.is_empty());

    // Add a dataset
    let datasets = state.service.datasets_dir().to_path_buf();
    touch(&datasets, "pets/cat/a.jpg", b"x");

    let response = list_datasets(State(state.clone())).await.unwrap();
    assert_eq!(response.0.datasets.len(), 1);
    assert_eq!(response.0.datasets[0].name, "pets");
    assert_eq!(response.0.datasets[0].stats.total_images, 1);
}

#[tokio::test]
async fn test_get_dataset_structure() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = state_in(temp_dir.path(), None);

    let result = get_dataset_structure(State(state.clone()), Path("missing".to_string())).await;
    assert_eq!(result.err().unwrap().0, StatusCode::NOT_FOUND);

    make_classes(&state.service.datasets_dir().join("caltech/101_ObjectCategories"), 12, 2);
    let response = get_dataset_structure(State(state.clone()), Path("caltech".to_string()))
        .await
        .unwrap();
    assert_eq!(response.0.structure.name, "101_ObjectCategories");
    assert_eq!(response.0.stats.total_folders, 12);
    assert_eq!(response.0.stats.total_files, 24);
}

#[tokio::test]
async fn test_get_class_details() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = state_in(temp_dir.path(), None);
    let datasets = state.service.datasets_dir().to_path_buf();
    touch(&datasets, "pets/cat/a.jpg", b"abc");

    let response = get_class_details(
        State(state.clone()),
        Path(("pets".to_string(), "cat".to_string())),
    )
    .await
    .unwrap();
    assert_eq!(response.0.file_count, 1);
    assert_eq!(response.0.files[0].size, 3);

    let result = get_class_details(
        State(state.clone()),
        Path(("pets".to_string(), "dog".to_string())),
    )
    .await;
    assert_eq!(result.err().unwrap().0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_dataset_evicts_index() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = state_in(temp_dir.path(), None);
    touch(state.service.datasets_dir(), "pets/cat/a.jpg", b"x");

    index_dataset(State(state.clone()), Path("pets".to_string())).await.unwrap();
    assert!(state.search.is_indexed("pets"));

    let response = delete_dataset(State(state.clone()), Path("pets".to_string())).await.unwrap();
    assert!(response.0.success);
    assert!(!state.service.datasets_dir().join("pets").exists());
    assert!(!state.search.is_indexed("pets"));

    let result = delete_dataset(State(state.clone()), Path("pets".to_string())).await;
    assert_eq!(result.err().unwrap().0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_index_then_suggest() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = state_in(temp_dir.path(), None);
    make_classes(state.service.datasets_dir().join("caltech").as_path(), 3, 1);

    let indexed = dataset_indexed(State(state.clone()), Path("caltech".to_string())).await;
    assert!(!indexed.0.indexed);

    let response = index_dataset(State(state.clone()), Path("caltech".to_string())).await.unwrap();
    assert!(response.0.success);
    assert_eq!(response.0.total_classes, 3);

    let indexed = dataset_indexed(State(state.clone()), Path("caltech".to_string())).await;
    assert!(indexed.0.indexed);

    let response = suggest_classes(
        State(state.clone()),
        Path("caltech".to_string()),
        Query(SuggestQuery { q: "CLASS_0".to_string() }),
    )
    .await;
    assert_eq!(response.0.suggestions, vec!["class_00", "class_01", "class_02"]);

    let result = index_dataset(State(state.clone()), Path("missing".to_string())).await;
    assert_eq!(result.err().unwrap().0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_dataset() {
    let temp_dir = tempfile::tempdir().unwrap();
    let model: Arc<dyn GenerativeModel> = Arc::new(CannedModel);
    let state = state_in(temp_dir.path(), Some(model));
    make_classes(state.service.datasets_dir().join("caltech").as_path(), 12, 1);

    let query = |q: &str| Json(SearchRequest { query: q.to_string() });

    // not indexed yet
    let response = search_dataset(State(state.clone()), Path("caltech".to_string()), query("hi")).await;
    assert!(!response.0.success);

    index_dataset(State(state.clone()), Path("caltech".to_string())).await.unwrap();

    let response = search_dataset(State(state.clone()), Path("caltech".to_string()), query("   ")).await;
    assert!(!response.0.success);

    let response =
        search_dataset(State(state.clone()), Path("caltech".to_string()), query("what is class_03?")).await;
    assert!(response.0.success);
    assert_eq!(response.0.response.as_deref(), Some("There are 12 classes."));
    assert_eq!(response.0.relevant_classes.unwrap()[0].name, "class_03");
}

#[tokio::test]
async fn test_search_without_model() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = state_in(temp_dir.path(), None);

    let response = search_dataset(
        State(state.clone()),
        Path("caltech".to_string()),
        Json(SearchRequest { query: "hello".to_string() }),
    )
    .await;
    assert!(!response.0.success);
    assert!(response.0.error.unwrap().contains("not configured"));
}

#[tokio::test]
async fn test_upload_through_router() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = state_in(temp_dir.path(), None);
    let app = build_api_routes(state.clone());

    let archive = zip_bytes(&[("cat/a.jpg", "1"), ("cat/b.txt", "2"), ("dog/", "")]);
    let response = app
        .clone()
        .oneshot(multipart_request("pets.zip", &archive))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["dataset_name"], "pets");
    assert_eq!(json["sha256"].as_str().unwrap().len(), 64);
    assert_eq!(json["stats"]["total_folders"], 2);
    assert_eq!(json["stats"]["total_images"], 1);
    assert_eq!(json["stats"]["file_types"][".txt"], 1);
    assert_eq!(json["structure"]["kind"], "directory");

    // a stale index is dropped on re-upload
    state.search.index("pets", &Default::default());
    let response = app
        .oneshot(multipart_request("pets.zip", &archive))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!state.search.is_indexed("pets"));
}

#[tokio::test]
async fn test_upload_rejections() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = state_in(temp_dir.path(), None);
    let app = build_api_routes(state.clone());

    let response = app
        .clone()
        .oneshot(multipart_request("foo.tar", b"tarball"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"]
        .as_str()
        .unwrap()
        .contains("unsupported format"));

    let response = app
        .clone()
        .oneshot(multipart_request("broken.zip", b"not a zip at all"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!state.service.datasets_dir().join("broken").exists());
    assert_eq!(common::entry_count(state.service.uploads_dir()), 0);
}

#[tokio::test]
async fn test_unknown_dataset_through_router() {
    let temp_dir = tempfile::tempdir().unwrap();
    let app = build_api_routes(state_in(temp_dir.path(), None));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/dataset/nope/structure")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
