//! Endpoints kept for older clients: login-or-register, per-user app and robot
//! lists, and the enable toggle keyed by app id or name.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service::{
    catalog::{Record, UserData},
    errors::ServiceError,
};

use crate::errors::ApiError;
use crate::extract::JsonBody;
use crate::routes::users::UserResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailInput {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub apps: Vec<Value>,
    #[serde(default)]
    pub robots: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct AppEnabledInput {
    #[serde(default, alias = "id")]
    pub app_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub enabled: bool,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Serialize)]
pub struct AppEnabledResponse {
    pub success: bool,
    pub app: Record,
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CredentialsInput>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.catalog.login(&input.email, input.password.as_deref()).await?;
    Ok(Json(UserResponse { success: true, user }))
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CredentialsInput>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.catalog.register(&input.email, input.password.as_deref()).await?;
    Ok(Json(UserResponse { success: true, user }))
}

/// Tolerant read: a missing body, email or user yields empty lists.
pub async fn user_data(
    State(state): State<AppState>,
    input: Option<JsonBody<EmailInput>>,
) -> Result<Json<UserData>, ApiError> {
    let input = input.map(|JsonBody(i)| i).unwrap_or_default();
    let data = state.catalog.get_user_data(input.email.as_deref()).await?;
    Ok(Json(data))
}

pub async fn update_user(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<UpdateUserInput>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let data = UserData { apps: input.apps, robots: input.robots };
    state.catalog.update_user_data(&input.email, data).await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn update_app_enabled(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<AppEnabledInput>,
) -> Result<Json<AppEnabledResponse>, ApiError> {
    let key = input
        .app_id
        .or(input.name)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ServiceError::Validation("`app_id` or `name` is required".into()))?;
    let app = state.catalog.set_app_enabled(&key, input.enabled).await?;
    Ok(Json(AppEnabledResponse { success: true, app }))
}
