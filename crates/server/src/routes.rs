pub mod apps;
pub mod legacy;
pub mod users;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use service::storage::metrics;

use crate::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Result<Json<Health>, ApiError> {
    let stats = state.catalog.stats().await?;
    Ok(Json(Health { status: "healthy", apps_count: stats.apps_count, users_count: stats.users_count }))
}

pub async fn metrics_text() -> (StatusCode, String) {
    match metrics::encode_metrics() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}")),
    }
}

/// Build the full application router: catalog API, legacy endpoints, health and metrics.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/api/apps", get(apps::list_apps).post(apps::create_app))
        .route(
            "/api/apps/:id",
            get(apps::get_app).put(apps::update_app).delete(apps::delete_app),
        )
        .route("/api/users", get(users::list_users).post(users::upsert_user))
        .route("/api/users/:id", get(users::get_user));

    let legacy_routes = Router::new()
        .route("/api/login", post(legacy::login))
        .route("/api/register", post(legacy::register))
        .route("/user-data", post(legacy::user_data))
        .route("/update-user", post(legacy::update_user))
        .route("/update-app-enabled", post(legacy::update_app_enabled));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .merge(api)
        .merge(legacy_routes)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
