//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` so binary crates can prepare the store
//! directory through `service::runtime` without depending on `common`.

use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::storage::RecordStore;

/// Ensure the data directory exists and is writable.
pub async fn ensure_env(data_dir: &str) -> anyhow::Result<()> {
    common::env::ensure_data_dir(data_dir).await
}

/// Prepare the data directory and open a record store on it.
pub async fn open_store(data_dir: &str, lock_timeout_ms: u64) -> anyhow::Result<Arc<RecordStore>> {
    ensure_env(data_dir).await?;
    let store = RecordStore::new(PathBuf::from(data_dir), Duration::from_millis(lock_timeout_ms));
    Ok(Arc::new(store))
}
