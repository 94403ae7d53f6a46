use std::net::SocketAddr;

use axum::Router;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes;
use crate::state::AppState;
use service::{catalog::CatalogService, runtime};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Open the record store described by `cfg` and assemble the router on top of it.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let store = runtime::open_store(&cfg.storage.data_dir, cfg.storage.lock_timeout_ms).await?;
    let state = AppState::new(CatalogService::new(store));
    Ok(routes::build_router(state, build_cors()))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("received Ctrl+C, draining connections");
    }
}

/// Public entry: build the app and serve until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;

    let addr: SocketAddr = cfg.bind_addr().parse()?;
    info!(%addr, data_dir = %cfg.storage.data_dir, "starting catalog server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
