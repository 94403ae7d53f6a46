use serde::{Deserialize, Serialize};

/// Body of `GET /health`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Health {
    pub status: &'static str,
    pub apps_count: usize,
    pub users_count: usize,
}

/// Uniform error body returned by the HTTP layer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { success: false, error: error.into() }
    }
}
