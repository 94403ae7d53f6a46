use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ErrorBody;
use service::errors::ServiceError;
use tracing::{error, warn};

/// HTTP view of a `ServiceError`.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

/// Malformed or mistyped request bodies are client validation errors.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ServiceError::Validation(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Auth(_) => StatusCode::UNAUTHORIZED,
            ServiceError::LockTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::CorruptStore { .. } | ServiceError::StoreRead { .. } | ServiceError::StoreWrite { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            ServiceError::NotFound(msg) => capitalize(msg),
            ServiceError::Validation(msg) | ServiceError::Conflict(msg) | ServiceError::Auth(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = self.message();
        if self.0.is_infrastructure() {
            error!(error = %self.0, status = status.as_u16(), "store failure");
        } else {
            warn!(error = %self.0, status = status.as_u16(), "request rejected");
        }
        (status, Json(ErrorBody::new(msg))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_error_kind() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::not_found("app"), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::Auth("x".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::store_write("apps", "disk full"), StatusCode::INTERNAL_SERVER_ERROR),
            (ServiceError::LockTimeout { name: "apps".into(), waited_ms: 5 }, StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn not_found_message_reads_like_a_sentence() {
        assert_eq!(ApiError(ServiceError::not_found("app")).message(), "App not found");
    }
}
