use axum::extract::FromRequest;

use crate::errors::ApiError;

/// `axum::Json` whose rejections render as a 400 `{"success":false,..}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
