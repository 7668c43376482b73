use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::net::SocketAddr;
use std::sync::Arc;

use dataset_explorer::config::Config;
use dataset_explorer::dataset::DatasetService;
use dataset_explorer::llm::{GeminiClient, GenerativeModel};
use dataset_explorer::state::AppState;
use dataset_explorer::server::{build_api_router, build_files_router, print_startup_banner, start_servers};

// use mimalloc as the global allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() {
    // load .env file if it exists (fails silently if not found)
    let _ = dotenvy::dotenv();

    // initialize tracing before config so its warnings show up
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // load configuration from environment variables
    let config = Config::from_env();

    // build tokio runtime with configured worker threads
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime");

    runtime.block_on(async {
        let service = DatasetService::from_config(&config);
        service.ensure_dirs().expect("Failed to create upload and dataset directories");

        let model = GeminiClient::from_config(&config)
            .map(|client| Arc::new(client) as Arc<dyn GenerativeModel>);
        let search_enabled = model.is_some();

        // create shared state
        let state = Arc::new(AppState::new(service, model));

        // build routers
        let api_app = build_api_router(state, &config);
        let files_app = build_files_router(&config.datasets_dir);

        // define addresses from config
        let api_addr = SocketAddr::from((
            config.api_host.parse::<std::net::IpAddr>()
                .expect("Invalid API_HOST"),
            config.api_port
        ));
        let files_addr = SocketAddr::from((
            config.files_host.parse::<std::net::IpAddr>()
                .expect("Invalid FILES_HOST"),
            config.files_port
        ));

        // print startup information
        print_startup_banner(&config, search_enabled);

        if let Err(e) = start_servers(api_app, files_app, api_addr, files_addr).await {
            tracing::error!("Failed to start servers: {}", e);
            std::process::exit(1);
        }
    });
}
