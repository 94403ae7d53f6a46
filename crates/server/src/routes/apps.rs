use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use service::catalog::Record;

use crate::errors::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

#[derive(Serialize)]
pub struct AppListResponse {
    pub success: bool,
    pub apps: Vec<Record>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct AppResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub app: Record,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

pub async fn list_apps(State(state): State<AppState>) -> Result<Json<AppListResponse>, ApiError> {
    let apps = state.catalog.list_apps().await?;
    Ok(Json(AppListResponse { success: true, count: apps.len(), apps }))
}

pub async fn get_app(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AppResponse>, ApiError> {
    let app = state.catalog.get_app(&id).await?;
    Ok(Json(AppResponse { success: true, message: None, app }))
}

pub async fn create_app(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<Record>,
) -> Result<Json<AppResponse>, ApiError> {
    let app = state.catalog.create_app(payload).await?;
    Ok(Json(AppResponse { success: true, message: Some("App added"), app }))
}

pub async fn update_app(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<Record>,
) -> Result<Json<AppResponse>, ApiError> {
    let app = state.catalog.update_app(&id, patch).await?;
    Ok(Json(AppResponse { success: true, message: None, app }))
}

pub async fn delete_app(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.catalog.delete_app(&id).await?;
    Ok(Json(MessageResponse { success: true, message: "App deleted" }))
}
