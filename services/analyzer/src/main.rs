mod config;
mod error;
mod routes_chat;
mod routes_models;
mod routes_runtime;
mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::routing::{delete, get, post};
use axum::Router;
use modelops::{
    DeviceMemory, DownloadManager, EdgeRuntime, HfFetcher, ModelCatalog, PythonWorkerRuntime, ResidencyManager,
    RetryPolicy, RuntimeSet,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;

    let catalog = match &cfg.catalog_path {
        Some(path) => ModelCatalog::from_json_file(&cfg.models_root, path)
            .with_context(|| format!("Failed to read model catalog {}", path.display()))?,
        None => ModelCatalog::builtin(&cfg.models_root),
    };
    if let Some(key) = &cfg.default_model {
        if catalog.get(key).is_err() {
            bail!("DEFAULT_MODEL {key} is not in the catalog");
        }
    }
    std::fs::create_dir_all(&cfg.models_root)
        .with_context(|| format!("Failed to create models root {}", cfg.models_root.display()))?;

    let retry = RetryPolicy::new(
        cfg.download_max_retries,
        Duration::from_millis(500),
        Duration::from_secs(30),
        2.0,
    );
    let fetcher = Arc::new(HfFetcher::new(cfg.hf_endpoint.clone(), cfg.hf_token.clone()));
    let downloads = Arc::new(DownloadManager::new(catalog.clone(), fetcher, retry));

    let runtimes = RuntimeSet::new(
        Arc::new(PythonWorkerRuntime::causal_lm(&cfg.worker_python, &cfg.worker_script)),
        Arc::new(PythonWorkerRuntime::multimodal(&cfg.worker_python, &cfg.worker_script)),
        Arc::new(EdgeRuntime::new(&cfg.edge_interpreter)),
    );
    let device = Arc::new(DeviceMemory::new(cfg.device_memory_mb, cfg.device_baseline_mb));
    let manager = ResidencyManager::new(catalog, downloads, runtimes, device);

    // awaited: the report is served on /runtime
    let warmup = match &cfg.default_model {
        Some(key) => Some(modelops::warm_up(&manager, key).await),
        None => None,
    };

    let app_state = Arc::new(AppState::new(cfg.clone(), manager.clone(), warmup));

    let app = Router::new()
        .route("/models/status", get(routes_models::get_status))
        .route("/models/download", post(routes_models::post_download))
        .route("/models/download/:key", delete(routes_models::delete_download))
        .route("/models/load", post(routes_models::post_load))
        .route("/models/unload", post(routes_models::post_unload))
        .route("/models/switch", post(routes_models::post_switch))
        .route("/models/generate", post(routes_chat::post_generate))
        .route("/analyze", post(routes_chat::post_analyze))
        .route("/compare", post(routes_chat::post_compare))
        .route("/insights", post(routes_chat::post_insights))
        .route("/runtime", get(routes_runtime::get_runtime))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = &cfg.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("analyzer listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    manager.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
