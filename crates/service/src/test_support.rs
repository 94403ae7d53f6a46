#![cfg(test)]
use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::catalog::CatalogService;
use crate::storage::RecordStore;

/// Fresh, empty data directory under the system temp dir.
pub fn temp_data_dir(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}_{}", prefix, uuid::Uuid::new_v4()))
}

pub fn store_in(dir: PathBuf) -> Arc<RecordStore> {
    Arc::new(RecordStore::new(dir, Duration::from_secs(5)))
}

/// Catalog over an isolated store; returns the directory for cleanup.
pub fn catalog(prefix: &str) -> (CatalogService, PathBuf) {
    let dir = temp_data_dir(prefix);
    (CatalogService::new(store_in(dir.clone())), dir)
}

pub async fn cleanup(dir: &PathBuf) {
    let _ = tokio::fs::remove_dir_all(dir).await;
}
