use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("collection `{name}` is corrupt: {source}")]
    CorruptStore {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot read collection `{name}`: {source}")]
    StoreRead {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write collection `{name}`: {reason}")]
    StoreWrite { name: String, reason: String },
    #[error("timed out after {waited_ms}ms waiting for lock on `{name}`")]
    LockTimeout { name: String, waited_ms: u64 },
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    pub fn store_write(name: &str, reason: impl std::fmt::Display) -> Self {
        Self::StoreWrite { name: name.to_string(), reason: reason.to_string() }
    }

    /// Infrastructure failures, as opposed to caller mistakes.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::CorruptStore { .. } | Self::StoreRead { .. } | Self::StoreWrite { .. } | Self::LockTimeout { .. }
        )
    }
}
