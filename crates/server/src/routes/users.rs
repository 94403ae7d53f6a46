use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use service::catalog::{Record, UserDirectory};

use crate::errors::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

#[derive(Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: UserDirectory,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: Record,
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<UserListResponse>, ApiError> {
    let users = state.catalog.list_users().await?;
    Ok(Json(UserListResponse { success: true, users }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.catalog.get_user(&id).await?;
    Ok(Json(UserResponse { success: true, user }))
}

pub async fn upsert_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<Record>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.catalog.upsert_user(payload).await?;
    Ok(Json(UserResponse { success: true, user }))
}
