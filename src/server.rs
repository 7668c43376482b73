use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::{
    services::ServeDir,
    trace::TraceLayer,
    compression::CompressionLayer,
    limit::RequestBodyLimitLayer,
    cors::{AllowOrigin, Any, CorsLayer},
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::handlers::{
    dataset_indexed, delete_dataset, get_class_details, get_dataset_structure, health_check,
    index_dataset, list_datasets, root, search_dataset, suggest_classes, upload_dataset,
};
use crate::middleware::{add_security_headers, no_store};
use crate::state::AppState;
use crate::utils::shutdown_signal;
use crate::config::Config;

/// static server for extracted dataset files, lets a dashboard show the images
pub fn build_files_router(datasets_dir: &Path) -> Router {
    tracing::debug!("Building files router for directory: {:?}", datasets_dir);
    Router::new()
        .fallback_service(ServeDir::new(datasets_dir))
        .layer(axum::middleware::from_fn(add_security_headers))
        .layer(CompressionLayer::new()
            .gzip(true)
            .br(true)
            .zstd(true)
        )
        .layer(TraceLayer::new_for_http())
}

/// api routes bound to state, without the network-facing layers
pub fn build_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .route("/api/upload", post(upload_dataset))
        .route("/api/datasets", get(list_datasets))
        .route("/api/dataset/:name", axum::routing::delete(delete_dataset))
        .route("/api/dataset/:name/structure", get(get_dataset_structure))
        .route("/api/dataset/:name/class/:class", get(get_class_details))
        .route("/api/dataset/:name/index", post(index_dataset))
        .route("/api/dataset/:name/indexed", get(dataset_indexed))
        .route("/api/dataset/:name/search", post(search_dataset))
        .route("/api/dataset/:name/suggest", get(suggest_classes))
        .layer(axum::middleware::from_fn(no_store))
        .with_state(state)
}

/// build the json api router
pub fn build_api_router(state: Arc<AppState>, config: &Config) -> Router {
    tracing::debug!("Building api router with max upload size: {} bytes", config.max_upload_size);

    // spread the per-minute budget evenly, allow short bursts
    let replenish_ms = (60_000 / config.rate_limit_per_minute.max(1)).max(1);
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(replenish_ms)
            .burst_size(5)
            .finish()
            .expect("rate limit period and burst size are non-zero"),
    );

    build_api_routes(state)
        .layer(axum::middleware::from_fn(add_security_headers))
        // multipart has its own 2MB default, the layer below is the real cap
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_size))
        .layer(GovernorLayer { config: governor_conf })
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Start both the api and file servers
pub async fn start_servers(
    api_app: Router,
    files_app: Router,
    api_addr: SocketAddr,
    files_addr: SocketAddr,
) -> std::io::Result<()> {
    tracing::info!("Starting servers...");

    // create listeners
    let api_listener = tokio::net::TcpListener::bind(api_addr).await?;
    let files_listener = tokio::net::TcpListener::bind(files_addr).await?;

    tracing::debug!("API listener bound to {}", api_addr);
    tracing::debug!("Files listener bound to {}", files_addr);

    // start servers
    let api_server = axum::serve(
        api_listener,
        api_app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .tcp_nodelay(true);

    let files_server = axum::serve(
        files_listener,
        files_app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .tcp_nodelay(true);

    // run servers
    tracing::info!("Servers running and ready to accept connections");
    let _ = tokio::join!(
        async {
            if let Err(e) = api_server.await {
                tracing::error!("API server error: {}", e);
            }
        },
        async {
            if let Err(e) = files_server.await {
                tracing::error!("Files server error: {}", e);
            }
        }
    );
    Ok(())
}

/// print startup banner with server info
pub fn print_startup_banner(config: &Config, search_enabled: bool) {
    tracing::info!("Dataset explorer starting...");
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    tracing::info!("🔌 API SERVER: http://{}:{}", config.api_host, config.api_port);
    tracing::info!("📡 DATASET FILES: http://{}:{}", config.files_host, config.files_port);
    tracing::info!("📁 Datasets in: {:?}", config.datasets_dir.canonicalize().unwrap_or(config.datasets_dir.clone()));
    tracing::info!("📥 Uploads staged in: {:?}", config.upload_dir);
    tracing::info!("🔎 LLM search: {}", if search_enabled { config.gemini_model.as_str() } else { "disabled" });
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
