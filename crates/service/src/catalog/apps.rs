use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use super::domain::{now_iso, Record};
use super::{CatalogService, APPS};
use crate::errors::ServiceError;
use crate::storage::Outcome;

fn has_id(app: &Record, id: &str) -> bool {
    app.get("id").and_then(Value::as_str) == Some(id)
}

fn has_id_or_name(app: &Record, key: &str) -> bool {
    has_id(app, key) || app.get("name").and_then(Value::as_str) == Some(key)
}

impl CatalogService {
    /// All apps in insertion order.
    pub async fn list_apps(&self) -> Result<Vec<Record>, ServiceError> {
        self.store.load(APPS, Vec::new()).await
    }

    /// First app whose `id` equals `id`.
    pub async fn get_app(&self, id: &str) -> Result<Record, ServiceError> {
        self.list_apps()
            .await?
            .into_iter()
            .find(|app| has_id(app, id))
            .ok_or_else(|| ServiceError::not_found("app"))
    }

    /// Append an app, stamping `created_at`.
    ///
    /// A missing `id` is generated. Duplicate ids are accepted.
    #[instrument(skip(self, payload))]
    pub async fn create_app(&self, mut payload: Record) -> Result<Record, ServiceError> {
        match payload.get("id") {
            None | Some(Value::Null) => {
                payload.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
            }
            Some(Value::String(id)) if !id.is_empty() => {}
            Some(_) => return Err(ServiceError::Validation("app `id` must be a non-empty string".into())),
        }
        payload.insert("created_at".into(), Value::String(now_iso()));

        let app = self
            .store
            .with_lock(APPS, Vec::<Record>::new(), |apps| {
                apps.push(payload.clone());
                Ok(Outcome::Write(payload))
            })
            .await?;
        info!(app_id = ?app.get("id"), "app_created");
        Ok(app)
    }

    /// Shallow-merge `patch` into the first app matching `id` and stamp `updated_at`.
    ///
    /// `id` and `created_at` keep their stored values.
    #[instrument(skip(self, patch))]
    pub async fn update_app(&self, id: &str, patch: Record) -> Result<Record, ServiceError> {
        let app = self
            .store
            .with_lock(APPS, Vec::<Record>::new(), |apps| {
                let app = apps
                    .iter_mut()
                    .find(|app| has_id(app, id))
                    .ok_or_else(|| ServiceError::not_found("app"))?;
                for (key, value) in patch {
                    if key == "id" || key == "created_at" {
                        continue;
                    }
                    app.insert(key, value);
                }
                app.insert("updated_at".into(), Value::String(now_iso()));
                Ok(Outcome::Write(app.clone()))
            })
            .await?;
        info!("app_updated");
        Ok(app)
    }

    /// Remove every app matching `id`; returns how many were removed.
    #[instrument(skip(self))]
    pub async fn delete_app(&self, id: &str) -> Result<usize, ServiceError> {
        let removed = self
            .store
            .with_lock(APPS, Vec::<Record>::new(), |apps| {
                let before = apps.len();
                apps.retain(|app| !has_id(app, id));
                match before - apps.len() {
                    0 => Ok(Outcome::Keep(0)),
                    n => Ok(Outcome::Write(n)),
                }
            })
            .await?;
        info!(removed, "app_deleted");
        Ok(removed)
    }

    /// Set `enabled` on the first app whose `id` or `name` equals `id_or_name`.
    #[instrument(skip(self))]
    pub async fn set_app_enabled(&self, id_or_name: &str, enabled: bool) -> Result<Record, ServiceError> {
        self.store
            .with_lock(APPS, Vec::<Record>::new(), |apps| {
                let app = apps
                    .iter_mut()
                    .find(|app| has_id_or_name(app, id_or_name))
                    .ok_or_else(|| ServiceError::not_found("app"))?;
                app.insert("enabled".into(), Value::Bool(enabled));
                Ok(Outcome::Write(app.clone()))
            })
            .await
    }
}
