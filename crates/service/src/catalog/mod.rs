//! Catalog operations over the app list and the user directory.
//!
//! `CatalogService` holds no state of its own: every call is either a plain
//! load or exactly one `RecordStore::with_lock` transaction.

pub mod apps;
pub mod domain;
pub mod users;

use std::sync::Arc;

use crate::errors::ServiceError;
use crate::storage::RecordStore;

pub use domain::{CatalogStats, Record, UserData, UserDirectory};

/// Collection holding the ordered app list.
pub const APPS: &str = "apps";
/// Collection holding the user map.
pub const USERS: &str = "users";

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<RecordStore>,
}

impl CatalogService {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Record counts for health reporting.
    pub async fn stats(&self) -> Result<CatalogStats, ServiceError> {
        let (apps, users) = tokio::try_join!(self.list_apps(), self.list_users())?;
        Ok(CatalogStats { apps_count: apps.len(), users_count: users.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{catalog, cleanup};
    use serde_json::json;

    #[tokio::test]
    async fn stats_count_both_collections() -> Result<(), anyhow::Error> {
        let (svc, dir) = catalog("catalog_stats");
        assert_eq!(svc.stats().await?, CatalogStats { apps_count: 0, users_count: 0 });

        svc.create_app(serde_json::from_value(json!({"id": "a"}))?).await?;
        svc.create_app(serde_json::from_value(json!({"id": "b"}))?).await?;
        svc.login("a@x.com", Some("pw")).await?;
        assert_eq!(svc.stats().await?, CatalogStats { apps_count: 2, users_count: 1 });

        cleanup(&dir).await;
        Ok(())
    }
}
